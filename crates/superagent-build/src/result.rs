//! Stage envelopes and the aggregate build result.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use superagent_core::{Architecture, E2eReport, Threat};

use crate::error::StageError;
use crate::stage::BuildStage;

/// Uniform result envelope for one stage.
///
/// Stage-specific payload is flattened next to the common fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: BuildStage,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl StageResult {
    /// Successful stage with an object payload. Non-object payloads are
    /// stored under `"value"`.
    pub fn ok(stage: BuildStage, details: Value) -> Self {
        Self {
            stage,
            success: true,
            error: None,
            duration_ms: 0,
            details: into_map(details),
        }
    }

    /// Failed stage; `details` still carries the stage's empty defaults.
    pub fn failed(stage: BuildStage, error: &StageError, details: Value) -> Self {
        Self {
            stage,
            success: false,
            error: Some(error.to_string()),
            duration_ms: 0,
            details: into_map(details),
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }
}

/// Keys owned by the envelope itself.
const RESERVED: &[&str] = &["stage", "success", "error", "duration_ms"];

/// Flattened payload keys that collide with envelope fields are prefixed
/// with `detail_` so the serialized object never repeats a key.
fn into_map(details: Value) -> Map<String, Value> {
    let map = match details {
        Value::Object(map) => map,
        Value::Null => return Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            return map;
        }
    };
    map.into_iter()
        .map(|(key, value)| {
            if RESERVED.contains(&key.as_str()) {
                (format!("detail_{}", key), value)
            } else {
                (key, value)
            }
        })
        .collect()
}

/// A security finding attributed to a generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIssue {
    pub file: String,
    #[serde(flatten)]
    pub threat: Threat,
}

/// Aggregate outcome of one build, serialized once at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildResult {
    pub build_id: String,
    pub instruction: String,
    pub started_at: DateTime<Utc>,
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<String>,

    #[serde(default)]
    pub architecture: Option<Architecture>,
    #[serde(default)]
    pub stages: Vec<StageResult>,
    #[serde(default)]
    pub files_created: Vec<String>,
    #[serde(default)]
    pub project_dir: Option<PathBuf>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub dependencies_installed: Vec<String>,
    #[serde(default)]
    pub tests_passed: usize,
    #[serde(default)]
    pub security_issues: Vec<SecurityIssue>,

    /// Wall-clock seconds from pipeline entry.
    #[serde(default)]
    pub build_time: f64,

    #[serde(default)]
    pub checkpoint_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_after: Option<String>,

    #[serde(default)]
    pub e2e_results: Option<E2eReport>,
    #[serde(default)]
    pub e2e_skipped: bool,
    #[serde(default)]
    pub e2e_warning: Option<String>,

    #[serde(default)]
    pub verification_score: Option<f64>,
    #[serde(default)]
    pub production_files: Vec<String>,
}

impl BuildResult {
    /// Empty result at pipeline entry.
    pub fn new(build_id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            build_id: build_id.into(),
            instruction: instruction.into(),
            started_at: Utc::now(),
            success: false,
            error: None,
            failure_reason: None,
            rollback: None,
            architecture: None,
            stages: Vec::new(),
            files_created: Vec::new(),
            project_dir: None,
            preview_url: None,
            dependencies_installed: Vec::new(),
            tests_passed: 0,
            security_issues: Vec::new(),
            build_time: 0.0,
            checkpoint_before: None,
            checkpoint_after: None,
            e2e_results: None,
            e2e_skipped: false,
            e2e_warning: None,
            verification_score: None,
            production_files: Vec::new(),
        }
    }

    /// Result recorded for `stage`, if it ran.
    pub fn stage(&self, stage: BuildStage) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn reached(&self, stage: BuildStage) -> bool {
        self.stage(stage).is_some()
    }

    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.success).count()
    }

    /// Number of stages that failed.
    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|s| !s.success).count()
    }
}
