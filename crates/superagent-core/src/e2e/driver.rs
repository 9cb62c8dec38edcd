use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::E2eError;

/// Minimal page automation surface used by the check routines.
///
/// Lookups are forgiving: generated apps label controls inconsistently, so
/// text and hint matching try several candidates before giving up.
#[async_trait]
pub trait PageDriver: Send {
    /// Number of elements matching a CSS selector.
    async fn count(&mut self, selector: &str) -> Result<usize, E2eError>;

    /// Click the first button-like element whose trimmed text (or value)
    /// equals one of `labels`. Returns whether anything was clicked.
    async fn click_text(&mut self, labels: &[&str]) -> Result<bool, E2eError>;

    /// Click the first element matching `selector`.
    async fn click_selector(&mut self, selector: &str) -> Result<bool, E2eError>;

    /// Fill the first text input whose placeholder, name, id or aria-label
    /// contains one of `hints` (case-insensitive). Empty `hints` picks the
    /// first text input. Returns whether an input was filled.
    async fn fill(&mut self, hints: &[&str], value: &str) -> Result<bool, E2eError>;

    /// Dispatch a key press to the focused element.
    async fn press_key(&mut self, key: &str) -> Result<(), E2eError>;

    /// Visible text (or input value) of the first element matching `selector`.
    async fn text(&mut self, selector: &str) -> Result<Option<String>, E2eError>;

    /// Visible text of the whole page.
    async fn body_text(&mut self) -> Result<String, E2eError>;

    async fn close(self: Box<Self>) -> Result<(), E2eError>;
}

/// Opens pages in some browser.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self, url: &str, timeout: Duration) -> Result<Box<dyn PageDriver>, E2eError>;
}

/// Launcher used when no browser backend is compiled in.
#[derive(Debug, Clone, Default)]
pub struct UnavailableBrowser {
    reason: Option<String>,
}

impl UnavailableBrowser {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
impl BrowserLauncher for UnavailableBrowser {
    async fn open(&self, _url: &str, _timeout: Duration) -> Result<Box<dyn PageDriver>, E2eError> {
        Err(E2eError::BrowserUnavailable(self.reason.clone().unwrap_or_else(|| {
            "built without the `browser` feature".to_string()
        })))
    }
}

/// The launcher for this build: Chromium when the `browser` feature is on.
pub fn default_launcher() -> Arc<dyn BrowserLauncher> {
    #[cfg(feature = "browser")]
    {
        Arc::new(super::chromium::ChromiumLauncher::default())
    }
    #[cfg(not(feature = "browser"))]
    {
        Arc::new(UnavailableBrowser::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_browser_is_environmental() {
        let err = UnavailableBrowser::new("chrome not found")
            .open("http://127.0.0.1:1/", Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(err.is_environmental());
        assert!(err.to_string().contains("chrome not found"));
    }
}
