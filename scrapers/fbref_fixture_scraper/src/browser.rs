use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::{ffi::OsStr, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::{config::BrowserConfig, error::FixtureError};

const OUTER_HTML_FN: &str = "function() { return this.outerHTML; }";

/// Page primitives the extractor needs from a browser.
pub trait PageDriver {
    fn navigate(&self, url: &str) -> Result<(), FixtureError>;

    fn title(&self) -> Result<String, FixtureError>;

    /// Blocks until an element with `element_id` exists or `timeout` passes.
    fn wait_for_element(&self, element_id: &str, timeout: Duration) -> Result<(), FixtureError>;

    /// Rendered `outerHTML` of the element, read from the live DOM.
    fn outer_html(&self, element_id: &str) -> Result<String, FixtureError>;
}

/// An owned browser session. `close` must be idempotent.
pub trait BrowserSession: PageDriver {
    fn close(&mut self);
}

pub fn id_selector(element_id: &str) -> String {
    format!("[id=\"{}\"]", element_id.replace('"', "\\\""))
}

/// A Chrome process with a single tab. Closing is idempotent and also
/// happens on drop.
pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

impl ChromeSession {
    pub fn open(config: &BrowserConfig) -> Result<Self, FixtureError> {
        let args = config.launch_args();
        let arg_refs: Vec<&OsStr> = args.iter().map(OsStr::new).collect();

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(!config.disable_sandbox)
            .window_size(Some(config.window_size))
            .path(config.chrome_path.clone())
            .idle_browser_timeout(Duration::from_secs(config.idle_timeout_secs))
            .args(arg_refs)
            .build()
            .map_err(|e| FixtureError::Launch(format!("invalid launch options: {}", e)))?;

        info!("Launching Chrome (headless: {})", config.headless);
        let browser = Browser::new(options).map_err(|e| FixtureError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| FixtureError::Launch(format!("failed to open tab: {}", e)))?;

        if let Some(user_agent) = &config.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(|e| FixtureError::Launch(format!("failed to set user agent: {}", e)))?;
        }

        Ok(Self {
            browser: Some(browser),
            tab: Some(tab),
        })
    }

    pub fn is_open(&self) -> bool {
        self.browser.is_some()
    }

    /// Releases the browser process. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(tab) = self.tab.take() {
            if let Err(e) = tab.close(false) {
                debug!("Ignoring tab close error: {}", e);
            }
        }
        if let Some(browser) = self.browser.take() {
            drop(browser);
            info!("Browser session closed");
        }
    }

    fn tab(&self, url: &str) -> Result<&Arc<Tab>, FixtureError> {
        self.tab.as_ref().ok_or_else(|| FixtureError::Navigation {
            url: url.to_string(),
            message: "browser session is closed".to_string(),
        })
    }

    fn current_url(&self) -> String {
        self.tab.as_ref().map(|tab| tab.get_url()).unwrap_or_default()
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Browser session dropped without explicit close");
        }
        self.close();
    }
}

impl BrowserSession for ChromeSession {
    fn close(&mut self) {
        ChromeSession::close(self);
    }
}

impl PageDriver for ChromeSession {
    fn navigate(&self, url: &str) -> Result<(), FixtureError> {
        info!("Navigating to {}", url);
        self.tab(url)?
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| FixtureError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn title(&self) -> Result<String, FixtureError> {
        let url = self.current_url();
        let tab = self.tab.as_ref().ok_or_else(|| FixtureError::PageTitle {
            url: url.clone(),
            message: "browser session is closed".to_string(),
        })?;
        tab.get_title().map_err(|e| FixtureError::PageTitle {
            url,
            message: e.to_string(),
        })
    }

    fn wait_for_element(&self, element_id: &str, timeout: Duration) -> Result<(), FixtureError> {
        self.tab(&self.current_url())?
            .wait_for_element_with_custom_timeout(&id_selector(element_id), timeout)
            .map(|_| ())
            .map_err(|e| {
                debug!("Wait for #{} failed: {}", element_id, e);
                FixtureError::ElementNotFound {
                    element_id: element_id.to_string(),
                    timeout,
                }
            })
    }

    fn outer_html(&self, element_id: &str) -> Result<String, FixtureError> {
        let tab = self.tab(&self.current_url())?;
        let element = tab
            .find_element(&id_selector(element_id))
            .map_err(|e| FixtureError::Script(format!("element #{} disappeared: {}", element_id, e)))?;
        let result = element
            .call_js_fn(OUTER_HTML_FN, vec![], false)
            .map_err(|e| FixtureError::Script(e.to_string()))?;

        match result.value {
            Some(Value::String(html)) => Ok(html),
            other => Err(FixtureError::Script(format!(
                "outerHTML returned {:?} instead of a string",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_selector_quotes_id() {
        assert_eq!(id_selector("sched_2024-2025_9_1"), "[id=\"sched_2024-2025_9_1\"]");
        assert_eq!(id_selector("a\"b"), "[id=\"a\\\"b\"]");
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = ChromeSession {
            browser: None,
            tab: None,
        };
        session.close();
        session.close();
        BrowserSession::close(&mut session);
        assert!(!session.is_open());

        assert!(matches!(session.title(), Err(FixtureError::PageTitle { .. })));
        assert!(matches!(
            session.navigate("https://fbref.com"),
            Err(FixtureError::Navigation { .. })
        ));
        assert!(matches!(
            session.outer_html("sched_2024-2025_9_1"),
            Err(FixtureError::Navigation { .. })
        ));
    }
}
