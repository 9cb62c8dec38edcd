//! Build stage catalogue.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stages of a build, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    /// Snapshot the workspace before anything is written.
    PreBuildCheckpoint,

    /// Classify the instruction into an [`Architecture`](superagent_core::Architecture).
    ArchitecturePlanning,

    /// Ask the model for every planned file.
    CodeGeneration,

    /// Write generated files into a fresh project directory.
    FileCreation,

    /// Write a dependency manifest and install it.
    DependencyInstall,

    /// Drive the generated web app in a headless browser.
    E2eVerification,

    /// Run the project's own test suite.
    Testing,

    /// Static security scan of generated sources.
    SecurityScan,

    /// Heuristic quality score of generated sources.
    CodeVerification,

    /// Dockerfile, CI workflow and README.
    ProductionOutputs,

    /// Snapshot the workspace after a successful build.
    PostBuildCheckpoint,
}

impl BuildStage {
    /// All stages in the order the pipeline runs them.
    pub const ALL: [BuildStage; 11] = [
        BuildStage::PreBuildCheckpoint,
        BuildStage::ArchitecturePlanning,
        BuildStage::CodeGeneration,
        BuildStage::FileCreation,
        BuildStage::DependencyInstall,
        BuildStage::E2eVerification,
        BuildStage::Testing,
        BuildStage::SecurityScan,
        BuildStage::CodeVerification,
        BuildStage::ProductionOutputs,
        BuildStage::PostBuildCheckpoint,
    ];

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuildStage::PreBuildCheckpoint => "pre_build_checkpoint",
            BuildStage::ArchitecturePlanning => "architecture_planning",
            BuildStage::CodeGeneration => "code_generation",
            BuildStage::FileCreation => "file_creation",
            BuildStage::DependencyInstall => "dependency_install",
            BuildStage::E2eVerification => "e2e_verification",
            BuildStage::Testing => "testing",
            BuildStage::SecurityScan => "security_scan",
            BuildStage::CodeVerification => "code_verification",
            BuildStage::ProductionOutputs => "production_outputs",
            BuildStage::PostBuildCheckpoint => "post_build_checkpoint",
        }
    }

    /// Whether a failure in this stage can end the build.
    ///
    /// E2E verification only ends the build when the verifier ran and
    /// reported critical issues; see [`E2eGate`](crate::gate::E2eGate).
    pub fn is_gating(&self) -> bool {
        matches!(
            self,
            BuildStage::CodeGeneration | BuildStage::FileCreation | BuildStage::E2eVerification
        )
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
