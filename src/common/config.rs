//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// The application under test
    #[serde(default)]
    pub target: TargetConfig,

    /// Account used by the login scenarios
    #[serde(default)]
    pub credentials: Credentials,

    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Scheduling and account generation
    #[serde(default)]
    pub runner: RunnerSettings,
}

/// Where the catalog application is served
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Root URL; scenario routes such as `/login` are resolved against it
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

/// Fixed login for an account that already exists in the application
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Credentials {
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_password")]
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: default_email(),
            password: default_password(),
        }
    }
}

fn default_email() -> String {
    "peter@abv.bg".to_string()
}
fn default_password() -> String {
    "123456".to_string()
}

/// Browser launch settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserSettings {
    /// Chrome/Chromium executable; a bare name is looked up on PATH.
    /// When unset the browser is auto-detected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,

    /// Run without a visible window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Pass `--no-sandbox` (needed in most containers)
    #[serde(default)]
    pub no_sandbox: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            no_sandbox: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}

/// Timeout settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Timeouts {
    /// Upper bound for a single fill/click and for auto-waiting expectations
    #[serde(default = "default_action_ms")]
    pub action_ms: u64,

    /// Upper bound for a page load
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,

    /// How long to wait for an expected dialog after the triggering click
    #[serde(default = "default_dialog_ms")]
    pub dialog_ms: u64,

    /// Interval between polls of an auto-waiting expectation
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Connectivity preflight timeout
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,

    /// Browser process startup timeout
    #[serde(default = "default_launch_secs")]
    pub launch_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: default_action_ms(),
            navigation_ms: default_navigation_ms(),
            dialog_ms: default_dialog_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            connect_secs: default_connect_secs(),
            launch_secs: default_launch_secs(),
        }
    }
}

fn default_action_ms() -> u64 {
    5_000
}
fn default_navigation_ms() -> u64 {
    15_000
}
fn default_dialog_ms() -> u64 {
    5_000
}
fn default_poll_interval_ms() -> u64 {
    50
}
fn default_connect_secs() -> u64 {
    5
}
fn default_launch_secs() -> u64 {
    30
}

impl Timeouts {
    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn dialog(&self) -> Duration {
        Duration::from_millis(self.dialog_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn launch(&self) -> Duration {
        Duration::from_secs(self.launch_secs)
    }
}

/// Scheduling and generated-account settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunnerSettings {
    /// Scenarios executed concurrently, each in its own browser
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Extra attempts for scenarios that failed on a timeout or browser error
    #[serde(default)]
    pub retries: u32,

    /// Local-part prefix of generated registration emails
    #[serde(default = "default_email_prefix")]
    pub email_prefix: String,

    /// Domain of generated registration emails
    #[serde(default = "default_email_domain")]
    pub email_domain: String,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            retries: 0,
            email_prefix: default_email_prefix(),
            email_domain: default_email_domain(),
        }
    }
}

fn default_jobs() -> usize {
    4
}
fn default_email_prefix() -> String {
    "new_user".to_string()
}
fn default_email_domain() -> String {
    "abv.bg".to_string()
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default config file is
    /// used when present, otherwise the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path: Option<PathBuf> = match explicit {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::Config(format!(
                        "Config file '{}' does not exist",
                        p.display()
                    )));
                }
                Some(p.to_path_buf())
            }
            None => config_path().filter(|p| p.exists()),
        };

        let config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration");
                let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Internal(e.to_string()))
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.target.base_url).map_err(|e| {
            Error::Config(format!("Invalid base_url '{}': {}", self.target.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.runner.jobs == 0 {
            return Err(Error::Config("runner.jobs must be at least 1".to_string()));
        }
        if self.runner.email_domain.is_empty() {
            return Err(Error::Config("runner.email_domain must not be empty".to_string()));
        }
        Ok(())
    }
}
