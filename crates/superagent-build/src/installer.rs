//! Dependency manifests and installation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use superagent_core::{slugify, Architecture, FileKind, Language};
use tracing::{debug, info};

use crate::error::StageError;
use crate::runner::{CommandRunner, CommandSpec};

/// What the install stage did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Manifest used, relative to the project directory.
    pub manifest: Option<String>,

    /// Whether the manifest was written by this stage.
    pub manifest_written: bool,

    /// Packages declared in the manifest.
    pub installed: Vec<String>,
}

/// Writes `requirements.txt` / `package.json` and runs the package manager.
pub struct DependencyInstaller {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl DependencyInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Install dependencies for the project. Languages without a package
    /// manager return an empty outcome.
    pub async fn install(
        &self,
        project_dir: &Path,
        architecture: &Architecture,
    ) -> Result<InstallOutcome, StageError> {
        match Language::of(&architecture.language) {
            Language::Python => self.install_python(project_dir, architecture).await,
            lang if lang.is_node() => self.install_node(project_dir, architecture, lang).await,
            other => {
                debug!(language = other.as_str(), "no package manager; skipping install");
                Ok(InstallOutcome::default())
            }
        }
    }

    async fn install_python(
        &self,
        project_dir: &Path,
        architecture: &Architecture,
    ) -> Result<InstallOutcome, StageError> {
        let manifest = project_dir.join("requirements.txt");
        let written = if tokio::fs::try_exists(&manifest).await? {
            false
        } else {
            tokio::fs::write(&manifest, python_requirements(architecture).join("\n") + "\n")
                .await?;
            true
        };

        let content = tokio::fs::read_to_string(&manifest).await?;
        let installed = parse_requirements(&content);

        let spec = CommandSpec::new(
            "pip",
            ["install", "-r", "requirements.txt"],
            project_dir,
            self.timeout,
        );
        self.run_checked(&spec).await?;

        info!(packages = installed.len(), "python dependencies installed");
        Ok(InstallOutcome {
            manifest: Some("requirements.txt".to_string()),
            manifest_written: written,
            installed,
        })
    }

    async fn install_node(
        &self,
        project_dir: &Path,
        architecture: &Architecture,
        language: Language,
    ) -> Result<InstallOutcome, StageError> {
        let manifest = project_dir.join("package.json");
        let written = if tokio::fs::try_exists(&manifest).await? {
            false
        } else {
            let package = package_json(architecture, project_dir, language);
            let rendered = serde_json::to_string_pretty(&package)
                .map_err(|e| StageError::Failed(format!("cannot render package.json: {}", e)))?;
            tokio::fs::write(&manifest, rendered + "\n").await?;
            true
        };

        let content = tokio::fs::read_to_string(&manifest).await?;
        let installed = parse_package_json(&content)?;

        let spec = CommandSpec::new("npm", ["install"], project_dir, self.timeout);
        self.run_checked(&spec).await?;

        info!(packages = installed.len(), "node dependencies installed");
        Ok(InstallOutcome {
            manifest: Some("package.json".to_string()),
            manifest_written: written,
            installed,
        })
    }

    async fn run_checked(&self, spec: &CommandSpec) -> Result<(), StageError> {
        let output = self.runner.run(spec).await?;
        if output.success() {
            Ok(())
        } else {
            Err(StageError::Failed(format!(
                "`{}` exited with code {}: {}",
                spec.display(),
                output.exit_code,
                output.error_tail(400)
            )))
        }
    }
}

/// Requirements for a Python project.
pub fn python_requirements(architecture: &Architecture) -> Vec<&'static str> {
    let mut packages = vec!["pytest"];
    if architecture.needs_api {
        packages.extend(["fastapi", "uvicorn"]);
    }
    if architecture.needs_database {
        packages.push("sqlalchemy");
    }
    packages
}

/// `package.json` for a Node project.
pub fn package_json(architecture: &Architecture, project_dir: &Path, language: Language) -> Value {
    let name = project_dir
        .file_name()
        .map(|n| slugify(&n.to_string_lossy()).replace('_', "-"))
        .unwrap_or_else(|| "app".to_string());

    let entry = architecture
        .files_to_create
        .iter()
        .find(|f| matches!(f.kind, FileKind::Entry | FileKind::Main))
        .map(|f| f.file_name(&architecture.language))
        .unwrap_or_else(|| format!("main.{}", language_extension(language)));

    let start = match language {
        Language::TypeScript => format!("ts-node {}", entry),
        _ => format!("node {}", entry),
    };

    let mut dependencies = serde_json::Map::new();
    if architecture.needs_api {
        dependencies.insert("express".into(), json!("^4.18.2"));
    }

    let mut dev_dependencies = serde_json::Map::new();
    dev_dependencies.insert("jest".into(), json!("^29.7.0"));
    if language == Language::TypeScript {
        dev_dependencies.insert("typescript".into(), json!("^5.4.0"));
        dev_dependencies.insert("ts-node".into(), json!("^10.9.2"));
        dev_dependencies.insert("ts-jest".into(), json!("^29.1.2"));
    }

    json!({
        "name": name,
        "version": "1.0.0",
        "private": true,
        "main": entry,
        "scripts": {
            "start": start,
            "test": "jest",
        },
        "dependencies": dependencies,
        "devDependencies": dev_dependencies,
    })
}

fn language_extension(language: Language) -> &'static str {
    match language {
        Language::TypeScript => "ts",
        _ => "js",
    }
}

/// Package names from a requirements file, without version pins or extras.
pub fn parse_requirements(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .map(|line| {
            line.split(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~' | '[' | ';' | ' '))
                .next()
                .unwrap_or(line)
                .to_string()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Dependency and dev-dependency names from a `package.json`.
pub fn parse_package_json(content: &str) -> Result<Vec<String>, StageError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| StageError::Failed(format!("invalid package.json: {}", e)))?;
    let mut names = Vec::new();
    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = value.get(section).and_then(Value::as_object) {
            names.extend(deps.keys().cloned());
        }
    }
    Ok(names)
}
