//! End-to-end verification of generated web apps.
//!
//! The project directory is served on an ephemeral local port, opened in a
//! headless browser through the [`BrowserLauncher`] seam, and exercised by
//! the check routine for its [`AppCategory`](crate::domain::AppCategory).

mod checks;
#[cfg(feature = "browser")]
mod chromium;
mod driver;
mod server;
mod verifier;

use serde::{Deserialize, Serialize};

pub use checks::{run_checks, CheckLog};
#[cfg(feature = "browser")]
pub use chromium::ChromiumLauncher;
pub use driver::{default_launcher, BrowserLauncher, PageDriver, UnavailableBrowser};
pub use server::StaticServer;
pub use verifier::E2eVerifier;

use crate::domain::AppCategory;

/// Errors that stop a verification run before it produces a report.
#[derive(Debug, thiserror::Error)]
pub enum E2eError {
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("preview server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("page error: {0}")]
    Page(String),

    #[error("no html entry point in {0}")]
    NoEntryPoint(String),

    #[error("e2e run timed out after {0}s")]
    Timeout(u64),
}

impl E2eError {
    /// Failures caused by the host environment rather than the generated app.
    pub fn is_environmental(&self) -> bool {
        matches!(
            self,
            E2eError::BrowserUnavailable(_) | E2eError::Server(_) | E2eError::Timeout(_)
        )
    }
}

/// Outcome of one verification run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct E2eReport {
    pub app_category: Option<AppCategory>,
    pub success: bool,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
    pub coverage_percent: f64,
    pub passed_tests: Vec<String>,
    pub failed_tests: Vec<String>,
    pub critical_issues: Vec<String>,
}

impl E2eReport {
    pub fn has_critical_issues(&self) -> bool {
        !self.critical_issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environmental_classification() {
        assert!(E2eError::BrowserUnavailable("no chrome".into()).is_environmental());
        assert!(E2eError::Timeout(30).is_environmental());
        assert!(!E2eError::Page("script crashed".into()).is_environmental());
        assert!(!E2eError::NoEntryPoint("/tmp/x".into()).is_environmental());
    }
}
