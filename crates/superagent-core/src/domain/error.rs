//! Domain-level error taxonomy for SuperAgent.

use crate::checkpoint::CheckpointError;
use crate::llm::LlmError;

/// SuperAgent domain errors.
#[derive(Debug, thiserror::Error)]
pub enum SuperAgentError {
    #[error("invalid build request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("generation error: {0}")]
    Generation(String),

    #[error("materialization error: {0}")]
    Materialization(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for SuperAgent domain operations.
pub type Result<T> = std::result::Result<T, SuperAgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SuperAgentError::InvalidRequest("instruction is empty".to_string());
        assert!(err.to_string().contains("invalid build request"));

        let err = SuperAgentError::Materialization("no files to write".to_string());
        assert!(err.to_string().contains("no files to write"));
    }

    #[test]
    fn test_llm_error_converts() {
        let err: SuperAgentError = LlmError::NotConfigured.into();
        assert!(err.to_string().starts_with("llm error"));
    }
}
