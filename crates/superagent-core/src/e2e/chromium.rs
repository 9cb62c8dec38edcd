//! Headless Chromium backend (`browser` feature).
//!
//! Interactions run as small scripts evaluated in the page; each returns a
//! JSON-encoded string so results decode uniformly.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BrowserLauncher, E2eError, PageDriver};

/// Pause after interactions so page scripts can update the DOM.
const SETTLE: Duration = Duration::from_millis(150);

/// Launches a fresh headless Chromium per page.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    executable: Option<std::path::PathBuf>,
}

impl ChromiumLauncher {
    pub fn with_executable(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            executable: Some(path.into()),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn open(&self, url: &str, timeout: Duration) -> Result<Box<dyn PageDriver>, E2eError> {
        let mut builder = BrowserConfig::builder().request_timeout(timeout);
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(E2eError::BrowserUnavailable)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| E2eError::BrowserUnavailable(e.to_string()))?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page(url).await {
            Ok(page) => page,
            Err(e) => {
                let driver = ChromiumPage {
                    browser,
                    page: None,
                    events,
                };
                let _ = Box::new(driver).close().await;
                return Err(E2eError::Page(e.to_string()));
            }
        };
        if let Err(e) = page.wait_for_navigation().await {
            warn!(error = %e, "navigation did not settle");
        }
        debug!(url, "page opened");

        Ok(Box::new(ChromiumPage {
            browser,
            page: Some(page),
            events,
        }))
    }
}

struct ChromiumPage {
    browser: Browser,
    page: Option<Page>,
    events: JoinHandle<()>,
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn js_list(values: &[&str]) -> String {
    serde_json::Value::from(values.iter().map(|v| v.to_string()).collect::<Vec<_>>()).to_string()
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page, E2eError> {
        self.page
            .as_ref()
            .ok_or_else(|| E2eError::Page("page is closed".to_string()))
    }
}

async fn eval<T: serde::de::DeserializeOwned>(page: &Page, body: &str) -> Result<T, E2eError> {
    let script = format!("(() => JSON.stringify((() => {{ {body} }})()))()");
    let raw: String = page
        .evaluate(script)
        .await
        .map_err(|e| E2eError::Page(e.to_string()))?
        .into_value()
        .map_err(|e| E2eError::Page(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| E2eError::Page(e.to_string()))
}

async fn settle() {
    tokio::time::sleep(SETTLE).await;
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn count(&mut self, selector: &str) -> Result<usize, E2eError> {
        let sel = js_string(selector);
        let script = format!("return document.querySelectorAll({sel}).length;");
        eval(self.page()?, &script).await
    }

    async fn click_text(&mut self, labels: &[&str]) -> Result<bool, E2eError> {
        let labels = js_list(labels);
        let script = format!(
            "const labels = {labels};
             const els = [...document.querySelectorAll('button, input[type=button], input[type=submit], [role=button]')];
             for (const label of labels) {{
               const el = els.find(e => (e.innerText || e.value || '').trim() === label);
               if (el) {{ el.click(); return true; }}
             }}
             return false;"
        );
        let clicked = eval(self.page()?, &script).await?;
        settle().await;
        Ok(clicked)
    }

    async fn click_selector(&mut self, selector: &str) -> Result<bool, E2eError> {
        let sel = js_string(selector);
        let script = format!(
            "const el = document.querySelector({sel});
             if (!el) return false;
             el.click();
             return true;"
        );
        let clicked = eval(self.page()?, &script).await?;
        settle().await;
        Ok(clicked)
    }

    async fn fill(&mut self, hints: &[&str], value: &str) -> Result<bool, E2eError> {
        let hints = js_list(hints);
        let value = js_string(value);
        let script = format!(
            "const hints = {hints}.map(h => h.toLowerCase());
             const inputs = [...document.querySelectorAll('input:not([type=hidden]):not([type=checkbox]):not([type=radio]):not([type=button]):not([type=submit]), textarea')];
             const describe = e => [e.placeholder, e.name, e.id, e.getAttribute('aria-label')].join(' ').toLowerCase();
             const el = hints.length === 0 ? inputs[0] : inputs.find(e => hints.some(h => describe(e).includes(h)));
             if (!el) return false;
             el.focus();
             el.value = {value};
             el.dispatchEvent(new Event('input', {{ bubbles: true }}));
             el.dispatchEvent(new Event('change', {{ bubbles: true }}));
             return true;"
        );
        eval(self.page()?, &script).await
    }

    async fn press_key(&mut self, key: &str) -> Result<(), E2eError> {
        let key = js_string(key);
        let script = format!(
            "const target = document.activeElement || document.body;
             for (const type of ['keydown', 'keypress', 'keyup']) {{
               target.dispatchEvent(new KeyboardEvent(type, {{ key: {key}, bubbles: true }}));
             }}
             if ({key} === 'Enter' && target.form) target.form.requestSubmit();
             return true;"
        );
        let _: bool = eval(self.page()?, &script).await?;
        settle().await;
        Ok(())
    }

    async fn text(&mut self, selector: &str) -> Result<Option<String>, E2eError> {
        let sel = js_string(selector);
        let script = format!(
            "const el = document.querySelector({sel});
             if (!el) return null;
             const value = ('value' in el && typeof el.value === 'string') ? el.value : el.innerText;
             return value ?? '';"
        );
        eval(self.page()?, &script).await
    }

    async fn body_text(&mut self) -> Result<String, E2eError> {
        eval(
            self.page()?,
            "return document.body ? document.body.innerText : '';",
        )
        .await
    }

    async fn close(mut self: Box<Self>) -> Result<(), E2eError> {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| E2eError::BrowserUnavailable(e.to_string()));
        let _ = self.browser.wait().await;
        self.events.abort();
        result
    }
}
