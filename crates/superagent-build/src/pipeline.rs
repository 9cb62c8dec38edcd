//! Build pipeline orchestration.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use superagent_core::{
    build_span, default_launcher, emit_build_finished, emit_build_started, emit_gate_evaluated,
    emit_rollback, emit_rollback_error, emit_stage_finished, plan, AppCategory, Architecture,
    BuildRequest, CheckpointStore, CodeGenerator, CodeVerifier, CompletionClient, E2eVerifier,
    FsCheckpointStore, Generation, HeuristicCodeVerifier, MaterializedProject,
    PatternSecurityScanner, ProductionOutputs, ProjectMaterializer, SecurityScanner,
    SuperAgentConfig, SuperAgentError,
};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::error::{BuildError, StageError};
use crate::gate::{E2eGate, GateVerdict};
use crate::installer::DependencyInstaller;
use crate::result::{BuildResult, SecurityIssue, StageResult};
use crate::runner::{CommandRunner, TokioCommandRunner};
use crate::stage::BuildStage;
use crate::testing::TestRunner;

/// Message recorded in `BuildResult::rollback` after a successful rollback.
pub const ROLLBACK_MESSAGE: &str = "Rolled back to pre-build checkpoint";

const DESCRIPTION_CHARS: usize = 60;

/// Collaborators the pipeline drives. Constructed once at startup and
/// shared by every build.
#[derive(Clone)]
pub struct BuildServices {
    pub generator: CodeGenerator,
    pub materializer: ProjectMaterializer,
    /// `None` disables checkpointing regardless of request flags.
    pub checkpoints: Option<Arc<dyn CheckpointStore>>,
    pub runner: Arc<dyn CommandRunner>,
    pub verifier: E2eVerifier,
    pub scanner: Arc<dyn SecurityScanner>,
    pub code_verifier: Arc<dyn CodeVerifier>,
    pub production: ProductionOutputs,
}

impl BuildServices {
    /// Default collaborators: filesystem checkpoints over the output
    /// directory, real subprocesses, and the compiled-in browser launcher.
    pub fn from_config(
        config: &SuperAgentConfig,
        client: Arc<dyn CompletionClient>,
    ) -> Result<Self, SuperAgentError> {
        let checkpoints =
            FsCheckpointStore::open(&config.output_dir)?.with_retention(config.max_checkpoints);
        Ok(Self {
            generator: CodeGenerator::new(client),
            materializer: ProjectMaterializer::new(&config.output_dir),
            checkpoints: Some(Arc::new(checkpoints)),
            runner: Arc::new(TokioCommandRunner),
            verifier: E2eVerifier::new(default_launcher(), config.e2e_timeout),
            scanner: Arc::new(PatternSecurityScanner::new()),
            code_verifier: Arc::new(HeuristicCodeVerifier),
            production: ProductionOutputs,
        })
    }

    pub fn output_dir(&self) -> PathBuf {
        self.materializer.output_dir().to_path_buf()
    }
}

/// Timeouts and thresholds for one pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub install_timeout: Duration,
    pub test_timeout: Duration,
    pub min_e2e_coverage: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&SuperAgentConfig::default())
    }
}

impl From<&SuperAgentConfig> for PipelineSettings {
    fn from(config: &SuperAgentConfig) -> Self {
        Self {
            install_timeout: config.install_timeout,
            test_timeout: config.test_timeout,
            min_e2e_coverage: config.min_e2e_coverage,
        }
    }
}

/// Sequential build orchestrator.
///
/// Stages run strictly in [`BuildStage::ALL`] order. Code generation, file
/// creation and a blocking E2E verdict end the build and roll the workspace
/// back to the pre-build checkpoint; every other stage records its failure
/// and the build continues.
pub struct BuildPipeline {
    services: BuildServices,
    installer: DependencyInstaller,
    tests: TestRunner,
    gate: E2eGate,
}

impl BuildPipeline {
    pub fn new(services: BuildServices, settings: PipelineSettings) -> Self {
        Self {
            installer: DependencyInstaller::new(services.runner.clone(), settings.install_timeout),
            tests: TestRunner::new(services.runner.clone(), settings.test_timeout),
            gate: E2eGate::new(settings.min_e2e_coverage),
            services,
        }
    }

    pub fn services(&self) -> &BuildServices {
        &self.services
    }

    /// Run one build. Never fails: terminal errors are reported through
    /// `success`, `error` and `failure_reason` on the result.
    pub async fn run(&self, request: BuildRequest) -> BuildResult {
        let build_id = Uuid::new_v4().to_string();
        let span = build_span(&build_id);
        self.execute(build_id, request).instrument(span).await
    }

    async fn execute(&self, build_id: String, request: BuildRequest) -> BuildResult {
        let start = Instant::now();
        emit_build_started(&build_id, &request.instruction, &request.language);

        let mut result = BuildResult::new(&build_id, &request.instruction);
        let checkpoints = if request.flags.checkpoints {
            self.services.checkpoints.as_deref()
        } else {
            None
        };

        if let Some(store) = checkpoints {
            let description = format!("Pre-build: {}", short(&request.instruction));
            result.checkpoint_before = self
                .checkpoint(&mut result, store, BuildStage::PreBuildCheckpoint, &description)
                .await;
        }

        match self.run_stages(&request, &mut result).await {
            Ok(()) => {
                result.success = true;
                if let Some(store) = checkpoints {
                    let description = format!("Post-build: {}", short(&request.instruction));
                    result.checkpoint_after = self
                        .checkpoint(&mut result, store, BuildStage::PostBuildCheckpoint, &description)
                        .await;
                }
            }
            Err(err) => self.fail(&mut result, checkpoints, err).await,
        }

        result.build_time = start.elapsed().as_secs_f64();
        emit_build_finished(
            &build_id,
            start.elapsed().as_millis() as u64,
            result.stages.len(),
            result.success,
        );
        result
    }

    async fn run_stages(
        &self,
        request: &BuildRequest,
        result: &mut BuildResult,
    ) -> Result<(), BuildError> {
        let instruction = request.instruction.as_str();
        let flags = &request.flags;

        let architecture = self.plan_stage(request, result);
        let generation = self.generate_stage(&architecture, instruction, result).await?;
        let project = self.materialize_stage(&generation, instruction, result).await?;

        if flags.install_dependencies {
            self.install_stage(&project, &architecture, result).await;
        }
        if flags.e2e && architecture.is_web() && project.preview_url.is_some() {
            self.e2e_stage(&project, &generation, instruction, result).await?;
        }
        if flags.testing {
            self.test_stage(&project, &architecture, result).await;
        }
        if flags.security_scan {
            self.security_stage(&generation, result).await;
        }
        self.verification_stage(&generation, instruction, result).await;
        self.production_stage(&project, &architecture, instruction, result).await;
        Ok(())
    }

    fn plan_stage(&self, request: &BuildRequest, result: &mut BuildResult) -> Architecture {
        let start = Instant::now();
        let architecture = plan(
            &request.instruction,
            &request.language,
            request.flags.multi_file,
        );
        let stage = StageResult::ok(
            BuildStage::ArchitecturePlanning,
            json!({
                "type": architecture.project_type.as_str(),
                "language": &architecture.language,
                "multi_file": architecture.multi_file,
                "wants_advanced": architecture.wants_advanced,
                "files": architecture.file_names(),
            }),
        );
        self.finish(result, stage, start);
        result.architecture = Some(architecture.clone());
        architecture
    }

    async fn generate_stage(
        &self,
        architecture: &Architecture,
        instruction: &str,
        result: &mut BuildResult,
    ) -> Result<Generation, BuildError> {
        let start = Instant::now();
        let stage = BuildStage::CodeGeneration;
        match self.services.generator.generate(architecture, instruction).await {
            Ok(generation) if generation.files.is_empty() => {
                let err = StageError::Failed("no files generated".to_string());
                self.finish(result, StageResult::failed(stage, &err, json!({ "files": [] })), start);
                Err(BuildError::NoFilesGenerated)
            }
            Ok(generation) => {
                let files: Vec<String> =
                    generation.files.iter().map(|f| f.file_name()).collect();
                let details = json!({
                    "files": files,
                    "features": generation.features.len(),
                    "provider": self.services.generator.client().provider(),
                });
                self.finish(result, StageResult::ok(stage, details), start);
                Ok(generation)
            }
            Err(e) => {
                let err = StageError::from(e);
                self.finish(result, StageResult::failed(stage, &err, json!({ "files": [] })), start);
                Err(BuildError::CodeGeneration(err.to_string()))
            }
        }
    }

    async fn materialize_stage(
        &self,
        generation: &Generation,
        instruction: &str,
        result: &mut BuildResult,
    ) -> Result<MaterializedProject, BuildError> {
        let start = Instant::now();
        let stage = BuildStage::FileCreation;
        match self
            .services
            .materializer
            .materialize(&generation.files, instruction)
            .await
        {
            Ok(project) => {
                let details = json!({
                    "project_dir": &project.project_dir,
                    "files_created": &project.files_created,
                    "preview_url": &project.preview_url,
                });
                self.finish(result, StageResult::ok(stage, details), start);
                result.files_created = project.files_created.clone();
                result.project_dir = Some(project.project_dir.clone());
                result.preview_url = project.preview_url.clone();
                Ok(project)
            }
            Err(e) => {
                let err = StageError::from(e);
                self.finish(result, StageResult::failed(stage, &err, json!({})), start);
                Err(BuildError::Materialization(err.to_string()))
            }
        }
    }

    async fn install_stage(
        &self,
        project: &MaterializedProject,
        architecture: &Architecture,
        result: &mut BuildResult,
    ) {
        let start = Instant::now();
        let stage = BuildStage::DependencyInstall;
        let outcome = match self.installer.install(&project.project_dir, architecture).await {
            Ok(outcome) => {
                let details = json!({
                    "installed": &outcome.installed,
                    "manifest": &outcome.manifest,
                    "manifest_written": outcome.manifest_written,
                });
                result.dependencies_installed = outcome.installed;
                StageResult::ok(stage, details)
            }
            Err(err) => {
                warn!(error = %err, "dependency install failed; continuing");
                StageResult::failed(stage, &err, json!({ "installed": [] }))
            }
        };
        self.finish(result, outcome, start);
    }

    async fn e2e_stage(
        &self,
        project: &MaterializedProject,
        generation: &Generation,
        instruction: &str,
        result: &mut BuildResult,
    ) -> Result<(), BuildError> {
        let start = Instant::now();
        let stage = BuildStage::E2eVerification;
        let category = AppCategory::classify(instruction);
        let outcome = self
            .services
            .verifier
            .verify(&project.project_dir, category, &generation.features)
            .await;
        let verdict = self.gate.evaluate(&outcome);

        let (coverage, critical) = outcome
            .as_ref()
            .map(|r| (r.coverage_percent, r.critical_issues.len()))
            .unwrap_or((0.0, 0));
        emit_gate_evaluated(&result.build_id, coverage, critical, verdict.as_str());

        let stage_result = match outcome {
            Ok(report) => {
                let details = json!({ "report": &report });
                result.e2e_results = Some(report);
                if verdict.is_blocking() {
                    let err = StageError::Failed(format!("{} critical issue(s)", critical));
                    StageResult::failed(stage, &err, details)
                } else {
                    StageResult::ok(stage, details)
                }
            }
            Err(e) => {
                result.e2e_skipped = true;
                let err = if e.is_environmental() {
                    StageError::Environment(e.to_string())
                } else {
                    StageError::Failed(e.to_string())
                };
                StageResult::failed(stage, &err, json!({ "skipped": true }))
            }
        };
        self.finish(result, stage_result, start);

        result.e2e_warning = verdict.warning();
        if let Some(warning) = &result.e2e_warning {
            warn!(warning = %warning, "e2e gate warning");
        }
        match verdict {
            GateVerdict::Block { critical_issues } => Err(BuildError::E2eGate(critical_issues)),
            _ => Ok(()),
        }
    }

    async fn test_stage(
        &self,
        project: &MaterializedProject,
        architecture: &Architecture,
        result: &mut BuildResult,
    ) {
        let start = Instant::now();
        let stage = BuildStage::Testing;
        let outcome = match self.tests.run(&project.project_dir, architecture).await {
            Ok(summary) => {
                result.tests_passed = summary.passed;
                let details = serde_json::to_value(&summary).unwrap_or_default();
                if summary.failed > 0 {
                    let err = StageError::Failed(format!("{} test(s) failed", summary.failed));
                    StageResult::failed(stage, &err, details)
                } else {
                    StageResult::ok(stage, details)
                }
            }
            Err(err) => {
                warn!(error = %err, "test run failed; continuing");
                result.tests_passed = 0;
                StageResult::failed(stage, &err, json!({ "passed": 0, "failed": 0 }))
            }
        };
        self.finish(result, outcome, start);
    }

    async fn security_stage(&self, generation: &Generation, result: &mut BuildResult) {
        let start = Instant::now();
        let mut issues = Vec::new();
        for file in &generation.files {
            let file_name = file.file_name();
            for threat in self.services.scanner.scan_code(&file.code, &file.language).await {
                issues.push(SecurityIssue {
                    file: file_name.clone(),
                    threat,
                });
            }
        }

        let highest = issues.iter().map(|i| i.threat.severity).max();
        if !issues.is_empty() {
            info!(issues = issues.len(), "security findings recorded");
        }
        let details = json!({
            "issues": issues.len(),
            "highest_severity": highest,
            "files_scanned": generation.files.len(),
        });
        result.security_issues = issues;
        self.finish(result, StageResult::ok(BuildStage::SecurityScan, details), start);
    }

    async fn verification_stage(
        &self,
        generation: &Generation,
        instruction: &str,
        result: &mut BuildResult,
    ) {
        let start = Instant::now();
        let mut scores = BTreeMap::new();
        let mut issues = Vec::new();
        for file in &generation.files {
            let file_name = file.file_name();
            let verification = self
                .services
                .code_verifier
                .verify_code(&file.code, &file.language, instruction)
                .await;
            issues.extend(
                verification
                    .issues
                    .into_iter()
                    .map(|issue| format!("{}: {}", file_name, issue)),
            );
            scores.insert(file_name, verification.score);
        }

        let score = if scores.is_empty() {
            0.0
        } else {
            scores.values().sum::<f64>() / scores.len() as f64
        };
        result.verification_score = Some(score);
        let details = json!({ "score": score, "files": scores, "issues": issues });
        self.finish(result, StageResult::ok(BuildStage::CodeVerification, details), start);
    }

    async fn production_stage(
        &self,
        project: &MaterializedProject,
        architecture: &Architecture,
        instruction: &str,
        result: &mut BuildResult,
    ) {
        let start = Instant::now();
        let stage = BuildStage::ProductionOutputs;
        let outcome = match self
            .services
            .production
            .write(&project.project_dir, architecture, instruction)
            .await
        {
            Ok(files) => {
                let details = json!({ "files": &files });
                result.production_files = files;
                StageResult::ok(stage, details)
            }
            Err(e) => {
                let err = StageError::from(e);
                warn!(error = %err, "production outputs failed; continuing");
                StageResult::failed(stage, &err, json!({ "files": [] }))
            }
        };
        self.finish(result, outcome, start);
    }

    async fn checkpoint(
        &self,
        result: &mut BuildResult,
        store: &dyn CheckpointStore,
        stage: BuildStage,
        description: &str,
    ) -> Option<String> {
        let start = Instant::now();
        match store.create_checkpoint(description).await {
            Ok(checkpoint) => {
                let details = json!({
                    "checkpoint_id": &checkpoint.checkpoint_id,
                    "file_count": checkpoint.file_count,
                });
                self.finish(result, StageResult::ok(stage, details), start);
                Some(checkpoint.checkpoint_id)
            }
            Err(e) => {
                let err = StageError::Core(e.into());
                warn!(stage = %stage, error = %err, "checkpoint failed; continuing without it");
                self.finish(result, StageResult::failed(stage, &err, Value::Null), start);
                None
            }
        }
    }

    async fn fail(
        &self,
        result: &mut BuildResult,
        checkpoints: Option<&dyn CheckpointStore>,
        err: BuildError,
    ) {
        error!(stage = %err.stage(), error = %err, "build failed");
        result.success = false;
        result.error = Some(err.to_string());
        result.failure_reason = Some(err.failure_reason());

        let (Some(store), Some(checkpoint_id)) = (checkpoints, result.checkpoint_before.clone())
        else {
            return;
        };
        match store.rollback_to_checkpoint(&checkpoint_id).await {
            Ok(()) => {
                emit_rollback(&result.build_id, &checkpoint_id);
                result.rollback = Some(ROLLBACK_MESSAGE.to_string());
            }
            Err(e) => emit_rollback_error(&result.build_id, &checkpoint_id, &e),
        }
    }

    fn finish(&self, result: &mut BuildResult, stage: StageResult, start: Instant) {
        let duration_ms = start.elapsed().as_millis() as u64;
        emit_stage_finished(&result.build_id, stage.stage.name(), stage.success, duration_ms);
        result.stages.push(stage.with_duration(duration_ms));
    }
}

fn short(instruction: &str) -> String {
    let trimmed = instruction.trim();
    if trimmed.chars().count() <= DESCRIPTION_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(DESCRIPTION_CHARS).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superagent_core::ScriptedClient;

    #[test]
    fn test_short_description() {
        assert_eq!(short("  todo app "), "todo app");
        let long = "a".repeat(100);
        assert_eq!(short(&long).len(), DESCRIPTION_CHARS + 3);
    }

    #[test]
    fn test_settings_from_config() {
        let config = SuperAgentConfig {
            min_e2e_coverage: 85.0,
            ..SuperAgentConfig::default()
        };
        let settings = PipelineSettings::from(&config);
        assert_eq!(settings.min_e2e_coverage, 85.0);
        assert_eq!(settings.install_timeout, config.install_timeout);
    }

    #[test]
    fn test_services_from_config_open_checkpoints_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = SuperAgentConfig {
            output_dir: dir.path().join("apps"),
            ..SuperAgentConfig::default()
        };
        let services =
            BuildServices::from_config(&config, Arc::new(ScriptedClient::always("x"))).unwrap();
        assert!(services.checkpoints.is_some());
        assert_eq!(services.output_dir(), dir.path().join("apps"));
        assert!(dir.path().join("apps").join(".superagent").is_dir());
    }

    #[tokio::test]
    async fn test_services_from_config_apply_checkpoint_retention() {
        let dir = tempfile::tempdir().unwrap();
        let config = SuperAgentConfig {
            output_dir: dir.path().to_path_buf(),
            max_checkpoints: 2,
            ..SuperAgentConfig::default()
        };
        let services =
            BuildServices::from_config(&config, Arc::new(ScriptedClient::always("x"))).unwrap();
        let store = services.checkpoints.unwrap();
        for n in 0..4 {
            store.create_checkpoint(&format!("build {}", n)).await.unwrap();
        }
        let listed = store.list_checkpoints().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].description, "build 3");
    }
}
