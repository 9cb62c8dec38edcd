//! Environment-driven configuration.
//!
//! | Variable | Default |
//! |---|---|
//! | `GEMINI_API_KEY` / `GROQ_API_KEY` | unset |
//! | `SUPERAGENT_PROVIDER` | `auto` |
//! | `SUPERAGENT_GEMINI_MODEL` | `gemini-1.5-pro` |
//! | `SUPERAGENT_GROQ_MODEL` | `llama-3.3-70b-versatile` |
//! | `SUPERAGENT_OUTPUT_DIR` | `generated_apps` |
//! | `SUPERAGENT_LLM_TIMEOUT_SECS` | `120` |
//! | `SUPERAGENT_INSTALL_TIMEOUT_SECS` | `300` |
//! | `SUPERAGENT_TEST_TIMEOUT_SECS` | `300` |
//! | `SUPERAGENT_E2E_TIMEOUT_SECS` | `30` |
//! | `SUPERAGENT_MIN_E2E_COVERAGE` | `70` |
//! | `SUPERAGENT_MAX_CHECKPOINTS` | `20` |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Result, SuperAgentError};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GROQ_BASE_URL: &str = "https://api.groq.com";

/// Which backend to prefer when both have credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPreference {
    /// Quality provider if configured, otherwise the fast one.
    #[default]
    Auto,
    /// Gemini.
    Quality,
    /// Groq.
    Fast,
}

impl FromStr for ProviderPreference {
    type Err = SuperAgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "quality" | "gemini" => Ok(Self::Quality),
            "fast" | "groq" => Ok(Self::Fast),
            other => Err(SuperAgentError::Config(format!(
                "unknown provider preference '{}' (expected auto, quality or fast)",
                other
            ))),
        }
    }
}

/// LLM backend settings.
#[derive(Clone)]
pub struct LlmSettings {
    pub preference: ProviderPreference,
    pub gemini_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub gemini_model: String,
    pub groq_model: String,
    pub gemini_base_url: String,
    pub groq_base_url: String,
    pub timeout: Duration,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("LlmSettings")
            .field("preference", &self.preference)
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("groq_api_key", &redact(&self.groq_api_key))
            .field("gemini_model", &self.gemini_model)
            .field("groq_model", &self.groq_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("groq_base_url", &self.groq_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            preference: ProviderPreference::Auto,
            gemini_api_key: None,
            groq_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            groq_model: DEFAULT_GROQ_MODEL.to_string(),
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            groq_base_url: GROQ_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct SuperAgentConfig {
    pub llm: LlmSettings,

    /// Root under which project directories are created and checkpointed.
    pub output_dir: PathBuf,

    pub install_timeout: Duration,
    pub test_timeout: Duration,
    pub e2e_timeout: Duration,

    /// E2E coverage below this percentage logs a warning.
    pub min_e2e_coverage: f64,

    /// Checkpoints kept in the output directory; older ones are pruned.
    pub max_checkpoints: usize,
}

impl Default for SuperAgentConfig {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            output_dir: PathBuf::from("generated_apps"),
            install_timeout: Duration::from_secs(300),
            test_timeout: Duration::from_secs(300),
            e2e_timeout: Duration::from_secs(30),
            min_e2e_coverage: 70.0,
            max_checkpoints: 20,
        }
    }
}

impl SuperAgentConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let preference = match non_empty("SUPERAGENT_PROVIDER") {
            Some(value) => value.parse()?,
            None => ProviderPreference::Auto,
        };

        let llm = LlmSettings {
            preference,
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            groq_api_key: non_empty("GROQ_API_KEY"),
            gemini_model: non_empty("SUPERAGENT_GEMINI_MODEL")
                .unwrap_or(defaults.llm.gemini_model),
            groq_model: non_empty("SUPERAGENT_GROQ_MODEL").unwrap_or(defaults.llm.groq_model),
            gemini_base_url: non_empty("SUPERAGENT_GEMINI_BASE_URL")
                .unwrap_or(defaults.llm.gemini_base_url),
            groq_base_url: non_empty("SUPERAGENT_GROQ_BASE_URL")
                .unwrap_or(defaults.llm.groq_base_url),
            timeout: secs(&non_empty, "SUPERAGENT_LLM_TIMEOUT_SECS", defaults.llm.timeout)?,
        };

        let min_e2e_coverage = match non_empty("SUPERAGENT_MIN_E2E_COVERAGE") {
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                SuperAgentError::Config(format!(
                    "SUPERAGENT_MIN_E2E_COVERAGE must be a number, got '{}'",
                    raw
                ))
            })?,
            None => defaults.min_e2e_coverage,
        };

        let max_checkpoints = match non_empty("SUPERAGENT_MAX_CHECKPOINTS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    SuperAgentError::Config(format!(
                        "SUPERAGENT_MAX_CHECKPOINTS must be a positive whole number, got '{}'",
                        raw
                    ))
                })?,
            None => defaults.max_checkpoints,
        };

        Ok(Self {
            llm,
            output_dir: non_empty("SUPERAGENT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            install_timeout: secs(
                &non_empty,
                "SUPERAGENT_INSTALL_TIMEOUT_SECS",
                defaults.install_timeout,
            )?,
            test_timeout: secs(&non_empty, "SUPERAGENT_TEST_TIMEOUT_SECS", defaults.test_timeout)?,
            e2e_timeout: secs(&non_empty, "SUPERAGENT_E2E_TIMEOUT_SECS", defaults.e2e_timeout)?,
            min_e2e_coverage,
            max_checkpoints,
        })
    }
}

fn secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| {
                SuperAgentError::Config(format!("{} must be whole seconds, got '{}'", key, raw))
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = SuperAgentConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("generated_apps"));
        assert_eq!(config.llm.preference, ProviderPreference::Auto);
        assert_eq!(config.llm.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.e2e_timeout, Duration::from_secs(30));
        assert_eq!(config.min_e2e_coverage, 70.0);
        assert_eq!(config.max_checkpoints, 20);
        assert!(config.llm.gemini_api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = SuperAgentConfig::from_lookup(lookup(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("SUPERAGENT_PROVIDER", "fast"),
            ("SUPERAGENT_OUTPUT_DIR", "/tmp/apps"),
            ("SUPERAGENT_LLM_TIMEOUT_SECS", "15"),
            ("SUPERAGENT_MIN_E2E_COVERAGE", "85.5"),
            ("SUPERAGENT_MAX_CHECKPOINTS", "6"),
        ]))
        .unwrap();
        assert_eq!(config.llm.preference, ProviderPreference::Fast);
        assert_eq!(config.llm.groq_api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/apps"));
        assert_eq!(config.llm.timeout, Duration::from_secs(15));
        assert_eq!(config.min_e2e_coverage, 85.5);
        assert_eq!(config.max_checkpoints, 6);
    }

    #[test]
    fn test_zero_checkpoints_rejected() {
        for raw in ["0", "many"] {
            let err = SuperAgentConfig::from_lookup(lookup(&[("SUPERAGENT_MAX_CHECKPOINTS", raw)]))
                .unwrap_err();
            assert!(err.to_string().contains("SUPERAGENT_MAX_CHECKPOINTS"));
        }
    }

    #[test]
    fn test_blank_key_is_unset() {
        let config = SuperAgentConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap();
        assert!(config.llm.gemini_api_key.is_none());
    }

    #[test]
    fn test_invalid_timeout_is_config_error() {
        let err = SuperAgentConfig::from_lookup(lookup(&[("SUPERAGENT_E2E_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("SUPERAGENT_E2E_TIMEOUT_SECS"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!("claude".parse::<ProviderPreference>().is_err());
        assert_eq!("Gemini".parse::<ProviderPreference>().unwrap(), ProviderPreference::Quality);
    }

    #[test]
    fn test_debug_redacts_keys() {
        let settings = LlmSettings {
            gemini_api_key: Some("secret-key".into()),
            ..LlmSettings::default()
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
