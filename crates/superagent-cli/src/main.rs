//! SuperAgent CLI
//!
//! The `superagent` command turns a natural-language instruction into a
//! generated, verified project.
//!
//! ## Commands
//!
//! - `build`: Run the full build pipeline
//! - `plan`: Show the architecture plan for an instruction
//! - `checkpoints`: List workspace checkpoints
//! - `rollback`: Restore the workspace to a checkpoint

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};

use superagent_build::{BuildPipeline, BuildResult, BuildServices, PipelineSettings};
use superagent_core::{
    planner, select_client, BuildFlags, BuildRequest, CheckpointStore, FsCheckpointStore,
    ProviderPreference, SuperAgentConfig,
};

#[derive(Parser)]
#[command(name = "superagent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Natural-language application builder", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Directory projects and checkpoints are written to
    #[arg(long, global = true, env = "SUPERAGENT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan, generate, install, verify and package a project
    Build {
        /// What to build
        instruction: String,

        #[command(flatten)]
        options: BuildOptions,

        /// LLM provider preference (auto, quality, fast)
        #[arg(long)]
        provider: Option<ProviderPreference>,

        /// Print the full build result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the architecture plan for an instruction without generating
    Plan {
        /// What to build
        instruction: String,

        /// Target language (auto lets the planner choose)
        #[arg(short, long, default_value = "auto")]
        language: String,

        /// Force a multi-file layout
        #[arg(long)]
        multi_file: bool,
    },

    /// List checkpoints of the output directory
    Checkpoints,

    /// Restore the output directory to a checkpoint
    Rollback {
        /// Checkpoint ID
        id: String,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
struct BuildOptions {
    /// Target language (auto lets the planner choose)
    #[arg(short, long, default_value = "auto")]
    language: String,

    /// Force a multi-file layout
    #[arg(long)]
    multi_file: bool,

    /// Skip pre/post-build checkpoints and rollback
    #[arg(long)]
    no_checkpoints: bool,

    /// Skip the project's test suite
    #[arg(long)]
    no_tests: bool,

    /// Skip the security scan
    #[arg(long)]
    no_security: bool,

    /// Skip dependency installation
    #[arg(long)]
    no_install: bool,

    /// Skip E2E browser verification
    #[arg(long)]
    no_e2e: bool,
}

impl BuildOptions {
    fn flags(&self) -> BuildFlags {
        BuildFlags {
            checkpoints: !self.no_checkpoints,
            testing: !self.no_tests,
            security_scan: !self.no_security,
            multi_file: self.multi_file,
            install_dependencies: !self.no_install,
            e2e: !self.no_e2e,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    superagent_core::init_tracing(cli.log_json, level);

    let mut config = SuperAgentConfig::from_env().context("Invalid configuration")?;
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }

    match cli.command {
        Commands::Build {
            instruction,
            options,
            provider,
            json,
        } => {
            if let Some(provider) = provider {
                config.llm.preference = provider;
            }
            cmd_build(&config, &instruction, &options, json).await
        }
        Commands::Plan {
            instruction,
            language,
            multi_file,
        } => cmd_plan(&instruction, &language, multi_file),
        Commands::Checkpoints => cmd_checkpoints(&config).await,
        Commands::Rollback { id } => cmd_rollback(&config, &id).await,
    }
}

async fn cmd_build(
    config: &SuperAgentConfig,
    instruction: &str,
    options: &BuildOptions,
    json: bool,
) -> Result<()> {
    let request = BuildRequest::new(instruction, options.language.as_str())
        .with_flags(options.flags());
    request.validate()?;

    let client = select_client(&config.llm).context("No LLM provider configured")?;
    let services = BuildServices::from_config(config, client)
        .context("Failed to prepare build services")?;
    let pipeline = BuildPipeline::new(services, PipelineSettings::from(config));

    info!(output_dir = %config.output_dir.display(), "starting build");
    let result = pipeline.run(request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_summary(&result));
    }

    if !result.success {
        anyhow::bail!(
            "Build failed: {}",
            result.failure_reason.as_deref().unwrap_or("unknown reason")
        );
    }
    Ok(())
}

fn cmd_plan(instruction: &str, language: &str, multi_file: bool) -> Result<()> {
    let architecture = planner::plan(instruction, language, multi_file);
    println!("{}", serde_json::to_string_pretty(&architecture)?);
    Ok(())
}

fn open_store(config: &SuperAgentConfig) -> Result<Arc<dyn CheckpointStore>> {
    let store = FsCheckpointStore::open(&config.output_dir).with_context(|| {
        format!(
            "Failed to open checkpoint store in {}",
            config.output_dir.display()
        )
    })?;
    Ok(Arc::new(store.with_retention(config.max_checkpoints)))
}

async fn cmd_checkpoints(config: &SuperAgentConfig) -> Result<()> {
    let store = open_store(config)?;
    let checkpoints = store.list_checkpoints().await?;
    if checkpoints.is_empty() {
        println!("No checkpoints in {}", config.output_dir.display());
        return Ok(());
    }
    for cp in checkpoints {
        println!(
            "{}  {}  {} files  {}",
            cp.checkpoint_id,
            cp.created_at.format("%Y-%m-%d %H:%M:%S"),
            cp.file_count,
            cp.description
        );
    }
    Ok(())
}

async fn cmd_rollback(config: &SuperAgentConfig, id: &str) -> Result<()> {
    let store = open_store(config)?;
    store
        .rollback_to_checkpoint(id)
        .await
        .with_context(|| format!("Failed to roll back to {}", id))?;
    println!("Rolled back {} to {}", config.output_dir.display(), id);
    Ok(())
}

fn render_summary(result: &BuildResult) -> String {
    let mut out = Vec::new();
    out.push(format!("Build ID: {}", result.build_id));
    out.push(format!(
        "Status: {}",
        if result.success { "✓ PASSED" } else { "✗ FAILED" }
    ));
    out.push(format!("Duration: {:.1}s", result.build_time));
    out.push(String::new());

    for stage in &result.stages {
        let status = if stage.success { "✓" } else { "✗" };
        let mut line = format!("  {} {} ({}ms)", status, stage.stage, stage.duration_ms);
        if let Some(error) = &stage.error {
            line.push_str(&format!(": {}", error));
        }
        out.push(line);
    }
    out.push(String::new());

    if let Some(dir) = &result.project_dir {
        out.push(format!("Project: {}", dir.display()));
    }
    if !result.files_created.is_empty() {
        out.push(format!("Files: {}", result.files_created.join(", ")));
    }
    if let Some(url) = &result.preview_url {
        out.push(format!("Preview: {}", url));
    }
    if let Some(report) = &result.e2e_results {
        out.push(format!(
            "E2E: {}/{} checks passed ({:.0}% coverage)",
            report.passed, report.total, report.coverage_percent
        ));
    }
    if let Some(warning) = &result.e2e_warning {
        out.push(format!("Warning: {}", warning));
    }
    if !result.security_issues.is_empty() {
        out.push(format!("Security findings: {}", result.security_issues.len()));
    }
    if let Some(score) = result.verification_score {
        out.push(format!("Verification score: {:.0}", score));
    }
    if let Some(error) = &result.error {
        out.push(format!("Error: {}", error));
    }
    if let Some(rollback) = &result.rollback {
        out.push(rollback.clone());
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use superagent_build::{BuildStage, StageResult};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("superagent").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn test_build_flags_default_on() {
        let cli = parse(&["build", "todo app"]);
        let Commands::Build { options, json, .. } = cli.command else {
            panic!("expected build");
        };
        assert_eq!(options.flags(), BuildFlags::default());
        assert_eq!(options.language, "auto");
        assert!(!json);
    }

    #[test]
    fn test_build_opt_outs() {
        let cli = parse(&[
            "build",
            "rest api",
            "--language",
            "python",
            "--multi-file",
            "--no-checkpoints",
            "--no-tests",
            "--no-security",
            "--no-install",
            "--no-e2e",
            "--json",
            "--provider",
            "fast",
        ]);
        let Commands::Build {
            options,
            provider,
            json,
            ..
        } = cli.command
        else {
            panic!("expected build");
        };
        let flags = options.flags();
        assert!(flags.multi_file);
        assert!(!flags.checkpoints);
        assert!(!flags.testing);
        assert!(!flags.security_scan);
        assert!(!flags.install_dependencies);
        assert!(!flags.e2e);
        assert!(json);
        assert_eq!(provider, Some(ProviderPreference::Fast));
        assert_eq!(options.language, "python");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(Cli::try_parse_from(["superagent", "build", "x", "--provider", "claude"]).is_err());
    }

    #[test]
    fn test_rollback_requires_id() {
        assert!(Cli::try_parse_from(["superagent", "rollback"]).is_err());
        let cli = parse(&["--output-dir", "/tmp/apps", "rollback", "cp_1"]);
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/apps")));
    }

    #[test]
    fn test_render_summary_failure() {
        let mut result = BuildResult::new("b-1", "calculator");
        result.stages.push(StageResult::ok(
            BuildStage::ArchitecturePlanning,
            serde_json::Value::Null,
        ));
        result.error = Some("E2E verification found critical issues: x".into());
        result.rollback = Some(superagent_build::ROLLBACK_MESSAGE.into());

        let text = render_summary(&result);
        assert!(text.contains("✗ FAILED"));
        assert!(text.contains("architecture_planning"));
        assert!(text.contains("Rolled back to pre-build checkpoint"));
    }

    #[tokio::test]
    async fn test_checkpoints_and_rollback_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = SuperAgentConfig {
            output_dir: dir.path().to_path_buf(),
            ..SuperAgentConfig::default()
        };
        std::fs::write(dir.path().join("keep.txt"), "v1").unwrap();
        let store = open_store(&config).unwrap();
        let cp = store.create_checkpoint("manual").await.unwrap();
        std::fs::write(dir.path().join("keep.txt"), "v2").unwrap();

        cmd_checkpoints(&config).await.unwrap();
        cmd_rollback(&config, &cp.checkpoint_id).await.unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("keep.txt")).unwrap(), "v1");
        assert!(cmd_rollback(&config, "cp_missing").await.is_err());
    }
}
