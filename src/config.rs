//! Client configuration: a TOML file plus environment overrides.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::drive::DEFAULT_QUOTA_BYTES;

const ENV_BASE_URL: &str = "CLOUD_DRIVE_URL";
const ENV_QUOTA: &str = "CLOUD_DRIVE_QUOTA_BYTES";

/// Settings for talking to the storage backend and pacing the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Base URL of the storage web service.
    pub base_url: String,
    /// Storage quota per account, in bytes.
    pub quota_bytes: u64,
    /// Whole-request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// TCP connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// Where downloaded files are written. `~` is expanded.
    pub download_dir: String,
    /// Seconds before another OTP may be requested.
    pub resend_cooldown_secs: u64,
    /// Pause after a successful OTP check before entering the dashboard.
    pub otp_redirect_delay_ms: u64,
    /// Pause between a successful login and the OTP prompt.
    pub login_transition_delay_ms: u64,
    /// Pause after an upload completes before the listing refreshes.
    pub upload_settle_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            quota_bytes: DEFAULT_QUOTA_BYTES,
            request_timeout_secs: 300,
            connect_timeout_secs: 30,
            download_dir: "~/Downloads".to_string(),
            resend_cooldown_secs: 60,
            otp_redirect_delay_ms: 1500,
            login_transition_delay_ms: 1000,
            upload_settle_delay_ms: 1000,
        }
    }
}

impl Config {
    /// Default config file location, e.g. `~/.config/cloud-drive/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "cloud-drive").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path` (or the default location), then apply environment
    /// overrides. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut config = match path {
            Some(ref p) if p.exists() => {
                debug!(path = %p.display(), "Loading config");
                Self::from_file(p)?
            }
            Some(ref p) => {
                info!(path = %p.display(), "No config file, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var(ENV_BASE_URL) {
            info!("{ENV_BASE_URL} set, using {url}");
            self.base_url = url;
        }
        if let Ok(raw) = env::var(ENV_QUOTA) {
            match raw.trim().parse() {
                Ok(quota) => self.quota_bytes = quota,
                Err(e) => warn!("Invalid {ENV_QUOTA} value '{raw}': {e}"),
            }
        }
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base_url '{}'", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("base_url must use http or https, got '{}'", url.scheme());
        }
        if self.quota_bytes == 0 {
            bail!("quota_bytes must be greater than zero");
        }
        if self.resend_cooldown_secs == 0 {
            bail!("resend_cooldown_secs must be greater than zero");
        }
        Ok(())
    }

    /// Write this config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn resend_cooldown(&self) -> Duration {
        Duration::from_secs(self.resend_cooldown_secs)
    }

    pub fn otp_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.otp_redirect_delay_ms)
    }

    pub fn login_transition_delay(&self) -> Duration {
        Duration::from_millis(self.login_transition_delay_ms)
    }

    pub fn upload_settle_delay(&self) -> Duration {
        Duration::from_millis(self.upload_settle_delay_ms)
    }
}

/// JSON Schema of the config file, pretty-printed.
pub fn schema_json() -> Result<String> {
    let schema = schemars::schema_for!(Config);
    serde_json::to_string_pretty(&schema).context("Failed to render config schema")
}
