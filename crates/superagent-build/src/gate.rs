//! E2E quality gate.

use serde::{Deserialize, Serialize};
use superagent_core::{E2eError, E2eReport};

/// Gate verdict for one verification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum GateVerdict {
    /// No critical issues and coverage at or above the minimum.
    Pass,

    /// No critical issues but coverage below the minimum. Logged, not fatal.
    Warn { coverage_percent: f64, minimum: f64 },

    /// The verifier itself errored; the build continues without E2E.
    Skipped { reason: String },

    /// The verifier ran and found critical issues. Ends the build.
    Block { critical_issues: Vec<String> },
}

impl GateVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateVerdict::Pass => "pass",
            GateVerdict::Warn { .. } => "warn",
            GateVerdict::Skipped { .. } => "skipped",
            GateVerdict::Block { .. } => "block",
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, GateVerdict::Block { .. })
    }

    /// Human-readable warning for non-fatal verdicts.
    pub fn warning(&self) -> Option<String> {
        match self {
            GateVerdict::Warn {
                coverage_percent,
                minimum,
            } => Some(format!(
                "E2E coverage {:.1}% is below the {:.0}% minimum",
                coverage_percent, minimum
            )),
            GateVerdict::Skipped { reason } => {
                Some(format!("E2E verification skipped: {}", reason))
            }
            GateVerdict::Pass | GateVerdict::Block { .. } => None,
        }
    }
}

/// Decides whether an E2E outcome blocks the build.
#[derive(Debug, Clone, Copy)]
pub struct E2eGate {
    min_coverage: f64,
}

impl E2eGate {
    pub fn new(min_coverage: f64) -> Self {
        Self { min_coverage }
    }

    /// Gate rule:
    /// - verifier error (any kind) => `Skipped`
    /// - critical issues => `Block`
    /// - coverage below the minimum => `Warn`
    /// - otherwise `Pass`
    pub fn evaluate(&self, outcome: &Result<E2eReport, E2eError>) -> GateVerdict {
        let report = match outcome {
            Ok(report) => report,
            Err(err) => {
                return GateVerdict::Skipped {
                    reason: err.to_string(),
                }
            }
        };

        if report.has_critical_issues() {
            GateVerdict::Block {
                critical_issues: report.critical_issues.clone(),
            }
        } else if report.coverage_percent < self.min_coverage {
            GateVerdict::Warn {
                coverage_percent: report.coverage_percent,
                minimum: self.min_coverage,
            }
        } else {
            GateVerdict::Pass
        }
    }
}

impl Default for E2eGate {
    fn default() -> Self {
        Self::new(70.0)
    }
}
