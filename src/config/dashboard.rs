// src/config/dashboard.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::display::{DisplayClock, DisplayLocale};

pub const ENV_CONFIG_PATH: &str = "CLOUD_WATCHER_CONFIG";
pub const ENV_API_URL: &str = "CLOUD_WATCHER_API_URL";
pub const ENV_POLL_MS: &str = "CLOUD_WATCHER_POLL_MS";
pub const ENV_TIMEZONE: &str = "CLOUD_WATCHER_TIMEZONE";
pub const ENV_LOCALE: &str = "CLOUD_WATCHER_LOCALE";
pub const ENV_PREFS: &str = "CLOUD_WATCHER_PREFS";

pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_timezone() -> String {
    "Africa/Algiers".to_string()
}
fn default_locale() -> String {
    "fr-FR".to_string()
}
fn default_prefs_path() -> PathBuf {
    PathBuf::from("state/preferences.json")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Scan poll cadence.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Number of recent articles the advisor sees; backend default when absent.
    #[serde(default)]
    pub chat_context_limit: Option<u32>,
    /// IANA name of the display timezone.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Where the theme preference is persisted.
    #[serde(default = "default_prefs_path")]
    pub prefs_path: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            chat_context_limit: None,
            timezone: default_timezone(),
            locale: default_locale(),
            prefs_path: default_prefs_path(),
        }
    }
}

impl DashboardConfig {
    /// Load from a TOML or JSON file (picked by extension, TOML otherwise).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let cfg: DashboardConfig = if is_json {
            serde_json::from_str(&data)
                .with_context(|| format!("parsing JSON config {}", path.display()))?
        } else {
            toml::from_str(&data)
                .with_context(|| format!("parsing TOML config {}", path.display()))?
        };
        cfg.sanitized()
    }

    /// Resolution order:
    /// 1) $CLOUD_WATCHER_CONFIG
    /// 2) config/dashboard.toml
    /// 3) built-in defaults
    ///
    /// Env overrides are applied on top in every case.
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };
        base.with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(url) = env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        if let Ok(raw) = env::var(ENV_POLL_MS) {
            self.poll_interval_ms = raw
                .trim()
                .parse()
                .map_err(|_| anyhow!("{ENV_POLL_MS} must be an integer, got {raw:?}"))?;
        }
        if let Ok(tz) = env::var(ENV_TIMEZONE) {
            self.timezone = tz.trim().to_string();
        }
        if let Ok(locale) = env::var(ENV_LOCALE) {
            self.locale = locale.trim().to_string();
        }
        if let Ok(prefs) = env::var(ENV_PREFS) {
            self.prefs_path = PathBuf::from(prefs);
        }
        self.sanitized()
    }

    fn sanitized(mut self) -> Result<Self> {
        if self.poll_interval_ms == 0 {
            self.poll_interval_ms = default_poll_interval_ms();
        }
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = default_connect_timeout_secs();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }
        while self.api_base_url.ends_with('/') {
            self.api_base_url.pop();
        }
        if self.api_base_url.is_empty() {
            bail!("api_base_url must not be empty");
        }
        // Fail at load time rather than at first render.
        self.display_clock()?;
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn display_clock(&self) -> Result<DisplayClock> {
        let tz: chrono_tz::Tz = self
            .timezone
            .parse()
            .map_err(|e| anyhow!("unknown display timezone {:?}: {e}", self.timezone))?;
        let locale: DisplayLocale = self.locale.parse().map_err(|e: String| anyhow!(e))?;
        Ok(DisplayClock::new(tz, locale))
    }
}
