//! Structured observability hooks for the build lifecycle.
//!
//! Every build runs inside a `superagent.build` span; the emitters below log
//! the lifecycle events operators filter on (`event = "stage.finished"`, ...).

use tracing::{info, warn, Span};

/// Span tagged with the build id. Attach it with `Instrument::instrument`.
pub fn build_span(build_id: &str) -> Span {
    tracing::info_span!("superagent.build", build_id = %build_id)
}

/// Emit event: build started.
pub fn emit_build_started(build_id: &str, instruction: &str, language: &str) {
    info!(
        event = "build.started",
        build_id = %build_id,
        instruction = %instruction,
        language = %language,
    );
}

/// Emit event: one stage finished.
pub fn emit_stage_finished(build_id: &str, stage: &str, success: bool, duration_ms: u64) {
    info!(
        event = "stage.finished",
        build_id = %build_id,
        stage = %stage,
        success = success,
        duration_ms = duration_ms,
    );
}

/// Emit event: E2E quality gate evaluated.
pub fn emit_gate_evaluated(build_id: &str, coverage_percent: f64, critical_issues: usize, verdict: &str) {
    info!(
        event = "gate.evaluated",
        build_id = %build_id,
        coverage_percent = coverage_percent,
        critical_issues = critical_issues,
        verdict = %verdict,
    );
}

/// Emit event: build finished.
pub fn emit_build_finished(build_id: &str, duration_ms: u64, stages: usize, success: bool) {
    info!(
        event = "build.finished",
        build_id = %build_id,
        duration_ms = duration_ms,
        stages = stages,
        success = success,
    );
}

/// Emit event: workspace rolled back to a checkpoint.
pub fn emit_rollback(build_id: &str, checkpoint_id: &str) {
    warn!(event = "build.rollback", build_id = %build_id, checkpoint_id = %checkpoint_id);
}

/// Emit event: rollback failed (the error is swallowed by the caller).
pub fn emit_rollback_error(build_id: &str, checkpoint_id: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "build.rollback_error",
        build_id = %build_id,
        checkpoint_id = %checkpoint_id,
        error = %error,
    );
}
