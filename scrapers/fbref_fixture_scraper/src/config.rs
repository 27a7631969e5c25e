use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, time::Duration};

/// Launch settings for the Chrome session.
///
/// The defaults disable the sandbox, `/dev/shm` usage, GPU acceleration and
/// software rasterization so the browser starts reliably inside containers
/// and other constrained environments. `hide_automation` strips the
/// `navigator.webdriver` marker that challenge pages look for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowserConfig {
    pub headless: bool,
    /// `--no-sandbox`
    pub disable_sandbox: bool,
    /// `--disable-dev-shm-usage`
    pub disable_dev_shm_usage: bool,
    /// `--disable-gpu`
    pub disable_gpu: bool,
    /// `--disable-software-rasterizer`
    pub disable_software_rasterizer: bool,
    /// `--disable-blink-features=AutomationControlled`
    pub hide_automation: bool,
    /// Browser binary to launch. Falls back to the system Chrome when unset.
    pub chrome_path: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub window_size: (u32, u32),
    pub idle_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            disable_sandbox: true,
            disable_dev_shm_usage: true,
            disable_gpu: true,
            disable_software_rasterizer: true,
            hide_automation: true,
            chrome_path: None,
            user_agent: None,
            window_size: (1920, 1080),
            idle_timeout_secs: 120,
        }
    }
}

impl BrowserConfig {
    /// Extra command line flags passed to Chrome, in a stable order.
    /// `disable_sandbox` goes through the launcher's own sandbox switch.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.disable_dev_shm_usage {
            args.push("--disable-dev-shm-usage".to_string());
        }
        if self.disable_gpu {
            args.push("--disable-gpu".to_string());
        }
        if self.disable_software_rasterizer {
            args.push("--disable-software-rasterizer".to_string());
        }
        if self.hide_automation {
            args.push("--disable-blink-features=AutomationControlled".to_string());
        }
        args
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeConfig {
    /// Lowercase title fragments shown by the interstitial page.
    pub markers: Vec<String>,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            markers: vec!["momento".to_string(), "just a moment".to_string()],
            poll_interval_secs: 2,
            timeout_secs: 60,
        }
    }
}

impl ChallengeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionConfig {
    pub base_url: String,
    pub competition_id: u32,
    pub competition_slug: String,
    pub element_timeout_secs: u64,
    pub data_dir: PathBuf,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fbref.com".to_string(),
            competition_id: 9,
            competition_slug: "Premier-League".to_string(),
            element_timeout_secs: 30,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl ExtractionConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScraperConfig {
    pub browser: BrowserConfig,
    pub challenge: ChallengeConfig,
    pub extraction: ExtractionConfig,
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn parse_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = env::var("FBREF_BASE_URL") {
            config.extraction.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Ok(data_dir) = env::var("FBREF_DATA_DIR") {
            config.extraction.data_dir = PathBuf::from(data_dir);
        }
        if let Some(secs) = parse_var("FBREF_ELEMENT_TIMEOUT_SECS") {
            config.extraction.element_timeout_secs = secs;
        }
        if let Some(secs) = parse_var("FBREF_CHALLENGE_TIMEOUT_SECS") {
            config.challenge.timeout_secs = secs;
        }
        if let Some(secs) = parse_var::<u64>("FBREF_CHALLENGE_POLL_SECS") {
            if secs > 0 {
                config.challenge.poll_interval_secs = secs;
            }
        }
        if let Some(headless) = parse_flag("FBREF_HEADLESS") {
            config.browser.headless = headless;
        }
        if let Ok(path) = env::var("FBREF_CHROME_PATH") {
            config.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Ok(user_agent) = env::var("FBREF_USER_AGENT") {
            config.browser.user_agent = Some(user_agent);
        }

        config
    }
}
