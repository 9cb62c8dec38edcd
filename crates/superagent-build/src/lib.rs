//! SuperAgent Build - staged build orchestration
//!
//! Provides the build pipeline that:
//! - Plans, generates and materializes a project from an instruction
//! - Installs dependencies and runs the project's tests through subprocesses
//! - Gates delivery on E2E verification and rolls back on fatal failure

pub mod error;
pub mod gate;
pub mod installer;
pub mod pipeline;
pub mod result;
pub mod runner;
pub mod stage;
pub mod testing;

// Re-export key types
pub use error::{BuildError, StageError};
pub use gate::{E2eGate, GateVerdict};
pub use installer::{DependencyInstaller, InstallOutcome};
pub use pipeline::{BuildPipeline, BuildServices, PipelineSettings, ROLLBACK_MESSAGE};
pub use result::{BuildResult, SecurityIssue, StageResult};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, RecordingRunner, TokioCommandRunner};
pub use stage::BuildStage;
pub use testing::{TestRunner, TestSummary};
