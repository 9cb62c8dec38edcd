//! Incoming build requests.

use serde::{Deserialize, Serialize};

use super::error::{Result, SuperAgentError};

fn default_language() -> String {
    "auto".to_string()
}

/// Feature toggles for a single build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildFlags {
    /// Take pre/post-build checkpoints and roll back on fatal failure.
    pub checkpoints: bool,

    /// Run the project's test suite after materialization.
    pub testing: bool,

    /// Run the security scanner over generated files.
    pub security_scan: bool,

    /// Force a multi-file layout regardless of the instruction.
    pub multi_file: bool,

    /// Write a dependency manifest and install it.
    pub install_dependencies: bool,

    /// Drive generated web apps in a headless browser.
    pub e2e: bool,
}

impl Default for BuildFlags {
    fn default() -> Self {
        Self {
            checkpoints: true,
            testing: true,
            security_scan: true,
            multi_file: false,
            install_dependencies: true,
            e2e: true,
        }
    }
}

/// A natural-language build request. Immutable for the duration of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub instruction: String,

    /// Target language hint (`auto` lets the planner choose).
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub flags: BuildFlags,
}

impl BuildRequest {
    pub fn new(instruction: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            language: language.into(),
            flags: BuildFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: BuildFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Reject requests that cannot produce anything useful.
    pub fn validate(&self) -> Result<()> {
        if self.instruction.trim().is_empty() {
            return Err(SuperAgentError::InvalidRequest(
                "instruction must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags() {
        let flags = BuildFlags::default();
        assert!(flags.checkpoints);
        assert!(flags.testing);
        assert!(flags.security_scan);
        assert!(!flags.multi_file);
        assert!(flags.install_dependencies);
        assert!(flags.e2e);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: BuildRequest =
            serde_json::from_str(r#"{"instruction": "todo app"}"#).unwrap();
        assert_eq!(req.language, "auto");
        assert_eq!(req.flags, BuildFlags::default());
    }

    #[test]
    fn test_partial_flags_keep_defaults() {
        let req: BuildRequest = serde_json::from_str(
            r#"{"instruction": "todo app", "flags": {"testing": false}}"#,
        )
        .unwrap();
        assert!(!req.flags.testing);
        assert!(req.flags.checkpoints);
    }

    #[test]
    fn test_validate_rejects_blank_instruction() {
        assert!(BuildRequest::new("  ", "html").validate().is_err());
        assert!(BuildRequest::new("landing page", "html").validate().is_ok());
    }
}
