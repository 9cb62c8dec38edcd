//! Stage and build error types.

use std::time::Duration;

use superagent_core::SuperAgentError;

use crate::stage::BuildStage;

/// Why a single stage did not produce its outcome.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The stage ran and reported failure.
    #[error("{0}")]
    Failed(String),

    /// A tool the stage needs is missing or the host refused to run it.
    #[error("environment: {0}")]
    Environment(String),

    /// A subprocess exceeded its time budget.
    #[error("{program} timed out after {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },

    #[error(transparent)]
    Core(#[from] SuperAgentError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StageError {
    pub fn is_environmental(&self) -> bool {
        matches!(self, StageError::Environment(_) | StageError::Timeout { .. })
    }
}

/// Terminal failure of a build. Every variant triggers rollback.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Code generation failed: {0}")]
    CodeGeneration(String),

    #[error("Code generation produced no files")]
    NoFilesGenerated,

    #[error("File creation failed: {0}")]
    Materialization(String),

    #[error("E2E verification found critical issues: {}", .0.join("; "))]
    E2eGate(Vec<String>),
}

impl BuildError {
    /// Stage the failure belongs to.
    pub fn stage(&self) -> BuildStage {
        match self {
            BuildError::CodeGeneration(_) | BuildError::NoFilesGenerated => {
                BuildStage::CodeGeneration
            }
            BuildError::Materialization(_) => BuildStage::FileCreation,
            BuildError::E2eGate(_) => BuildStage::E2eVerification,
        }
    }

    /// Short, stable summary for the `failure_reason` field.
    pub fn failure_reason(&self) -> String {
        match self {
            BuildError::CodeGeneration(_) => "Code generation stage failed".to_string(),
            BuildError::NoFilesGenerated => "Code generation produced no files".to_string(),
            BuildError::Materialization(_) => "File creation stage failed".to_string(),
            BuildError::E2eGate(issues) => format!(
                "E2E quality gate failed with {} critical issue(s)",
                issues.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_e2e_reason_mentions_e2e() {
        let err = BuildError::E2eGate(vec!["no interactive elements found".into()]);
        assert!(err.failure_reason().contains("E2E"));
        assert!(err.to_string().contains("no interactive elements found"));
        assert_eq!(err.stage(), BuildStage::E2eVerification);
    }

    #[test]
    fn test_no_files_belongs_to_codegen() {
        assert_eq!(BuildError::NoFilesGenerated.stage(), BuildStage::CodeGeneration);
        assert!(BuildError::NoFilesGenerated.stage().is_gating());
    }

    #[test]
    fn test_timeout_display() {
        let err = StageError::Timeout {
            program: "npm".into(),
            after: Duration::from_secs(300),
        };
        assert_eq!(err.to_string(), "npm timed out after 300s");
        assert!(err.is_environmental());
        assert!(!StageError::Failed("exit 1".into()).is_environmental());
    }
}
