//! SuperAgent Core Library
//!
//! Planning, generation, materialization and verification primitives used by
//! the build pipeline. The stage orchestration itself lives in
//! `superagent-build`.

pub mod checkpoint;
pub mod codegen;
pub mod config;
pub mod domain;
pub mod e2e;
pub mod llm;
pub mod materializer;
pub mod obs;
pub mod planner;
pub mod production;
pub mod prompts;
pub mod security;
pub mod telemetry;
pub mod verification;

pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore, FsCheckpointStore};
pub use codegen::{CodeGenerator, Generation};
pub use config::{LlmSettings, ProviderPreference, SuperAgentConfig};
pub use domain::{
    clean_code_fences, AppCategory, Architecture, BuildFlags, BuildRequest, FeatureChecklist,
    FileKind, GeneratedFile, Language, PlannedFile, ProjectType, Result, SuperAgentError,
};
pub use e2e::{
    default_launcher, BrowserLauncher, E2eError, E2eReport, E2eVerifier, PageDriver,
    StaticServer, UnavailableBrowser,
};
pub use llm::{
    select_client, CompletionClient, CompletionRequest, CompletionStream, GeminiClient,
    GroqClient, LlmError, ScriptedClient,
};
pub use materializer::{slugify, MaterializedProject, ProjectMaterializer};
pub use obs::{
    build_span, emit_build_finished, emit_build_started, emit_gate_evaluated, emit_rollback,
    emit_rollback_error, emit_stage_finished,
};
pub use planner::plan;
pub use production::ProductionOutputs;
pub use security::{PatternSecurityScanner, SecurityScanner, Severity, Threat};
pub use telemetry::init_tracing;
pub use verification::{CodeVerifier, HeuristicCodeVerifier, Verification};

/// SuperAgent version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
