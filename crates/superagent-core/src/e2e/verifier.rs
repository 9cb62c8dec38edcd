use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::checks::run_checks;
use super::{BrowserLauncher, E2eError, E2eReport, StaticServer};
use crate::domain::AppCategory;

const SOURCE_EXTENSIONS: &[&str] = &["html", "css", "js", "ts"];

/// Serves a project, opens it in a browser and runs the category checks.
#[derive(Clone)]
pub struct E2eVerifier {
    launcher: Arc<dyn BrowserLauncher>,
    timeout: Duration,
}

impl E2eVerifier {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, timeout: Duration) -> Self {
        Self { launcher, timeout }
    }

    /// Verify the app in `project_dir`.
    ///
    /// The preview server is always shut down before this returns.
    pub async fn verify(
        &self,
        project_dir: &Path,
        category: AppCategory,
        required_features: &[String],
    ) -> Result<E2eReport, E2eError> {
        let entry = entry_point(project_dir).await?;
        let sources = read_sources(project_dir).await;

        let server = StaticServer::start(project_dir).await?;
        let url = server.url(&entry);
        let outcome = tokio::time::timeout(
            self.timeout,
            self.drive(&url, category, required_features, &sources),
        )
        .await;
        server.shutdown().await;

        let report = outcome.map_err(|_| E2eError::Timeout(self.timeout.as_secs()))??;
        info!(
            category = category.as_str(),
            success = report.success,
            coverage = report.coverage_percent,
            "e2e verification finished"
        );
        Ok(report)
    }

    async fn drive(
        &self,
        url: &str,
        category: AppCategory,
        required_features: &[String],
        sources: &str,
    ) -> Result<E2eReport, E2eError> {
        let mut page = self.launcher.open(url, self.timeout).await?;
        let result = run_checks(page.as_mut(), category, required_features, sources).await;
        if let Err(e) = page.close().await {
            warn!(error = %e, "failed to close page");
        }
        result
    }
}

/// `index.html` if present, otherwise the first HTML file by name.
async fn entry_point(project_dir: &Path) -> Result<String, E2eError> {
    if tokio::fs::try_exists(project_dir.join("index.html"))
        .await
        .unwrap_or(false)
    {
        return Ok("index.html".to_string());
    }
    let mut html = Vec::new();
    let mut entries = tokio::fs::read_dir(project_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".html") {
            html.push(name);
        }
    }
    html.sort();
    html.into_iter()
        .next()
        .ok_or_else(|| E2eError::NoEntryPoint(project_dir.display().to_string()))
}

/// Concatenated front-end sources, used for feature coverage.
async fn read_sources(project_dir: &Path) -> String {
    let mut out = String::new();
    let Ok(mut entries) = tokio::fs::read_dir(project_dir).await else {
        return out;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let wanted = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e));
        if wanted {
            if let Ok(text) = tokio::fs::read_to_string(&path).await {
                out.push_str(&text);
                out.push('\n');
            }
        }
    }
    out
}
