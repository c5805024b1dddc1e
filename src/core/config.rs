//! Layered configuration: typed TOML sections merged with environment
//! overrides.
//!
//! A missing config file is not an error; defaults plus environment
//! variables are enough to run. Validation of the credential-bearing
//! sections happens at the entry points that actually need them, so
//! read-only commands keep working on a bare checkout.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{PsnError, Result};

/// Default device-status endpoint of the vendor cloud API.
pub const DEFAULT_API_URL: &str = "https://apia.coolkit.cn/v2/device/thing";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device-status probe settings.
    pub probe: ProbeConfig,
    /// Debounce engine settings.
    pub engine: EngineConfig,
    /// Telegram delivery settings.
    pub telegram: TelegramConfig,
    /// Foreground watch loop settings.
    pub watch: WatchConfig,
    /// Filesystem locations for durable data.
    pub paths: PathsConfig,
}

/// Settings for the cloud device-status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Endpoint receiving the device-status POST.
    pub api_url: String,
    /// Vendor device identifier to query.
    pub device_id: String,
    /// Bearer token for the vendor API.
    pub access_token: String,
    /// Hard timeout for the outbound call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            device_id: String::new(),
            access_token: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Settings for the debounce engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum continuous-offline duration before an outage is reported.
    pub confirmation_delay_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confirmation_delay_secs: 600,
        }
    }
}

/// Settings for Telegram delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token used against the Bot API.
    pub bot_token: String,
    /// Chats receiving outage/restore notifications.
    pub power_chat_ids: Vec<String>,
    /// Chat receiving draft lifecycle notifications, if any.
    pub debug_chat_id: Option<String>,
    /// Whether draft lifecycle notifications are sent at all.
    pub track_draft: bool,
}

/// Settings for the foreground watch loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between consecutive monitoring cycles.
    pub interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Filesystem locations for durable data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Single-slot persisted state record.
    pub state_file: PathBuf,
    /// SQLite event history.
    pub events_db: PathBuf,
    /// JSONL event history.
    pub events_jsonl: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(".power_status"),
            events_db: PathBuf::from("power_monitor.db"),
            events_jsonl: PathBuf::from("power_events.jsonl"),
        }
    }
}

impl Config {
    /// Load configuration: file (if any), then environment overrides.
    ///
    /// An explicit `path` that does not exist is an error; the default
    /// lookup silently falls back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(PsnError::MissingConfig {
                        path: explicit.to_path_buf(),
                    });
                }
                Self::from_file(explicit)?
            }
            None => {
                let default_path = Path::new("power_sentinel.toml");
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PsnError::io(path, e))?;
        Ok(toml::from_str(&text)?)
    }

    /// Apply environment overrides from a lookup function.
    ///
    /// Recognized keys: `EWELINK_DEVICE_ID`, `EWELINK_ACCESS_TOKEN`,
    /// `TELEGRAM_BOT_TOKEN`, `POWER_CHAT_IDS` (comma-separated),
    /// `DEBUG_CHAT_ID`, `TRACK_POWER_DRAFT`.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(device_id) = get("EWELINK_DEVICE_ID") {
            self.probe.device_id = device_id;
        }
        if let Some(token) = get("EWELINK_ACCESS_TOKEN") {
            self.probe.access_token = token;
        }
        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(ids) = get("POWER_CHAT_IDS") {
            self.telegram.power_chat_ids = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(chat_id) = get("DEBUG_CHAT_ID") {
            self.telegram.debug_chat_id = Some(chat_id);
        }
        if let Some(flag) = get("TRACK_POWER_DRAFT") {
            self.telegram.track_draft = is_truthy(&flag);
        }
    }

    /// Validate the sections a monitoring cycle depends on.
    pub fn validate_for_cycle(&self) -> Result<()> {
        if self.probe.device_id.is_empty() {
            return Err(invalid("probe.device_id is empty"));
        }
        if self.probe.access_token.is_empty() {
            return Err(invalid("probe.access_token is empty"));
        }
        if self.probe.timeout_secs == 0 {
            return Err(invalid("probe.timeout_secs must be positive"));
        }
        if self.engine.confirmation_delay_secs < 0 {
            return Err(invalid("engine.confirmation_delay_secs must not be negative"));
        }
        if self.telegram.bot_token.is_empty() {
            return Err(invalid("telegram.bot_token is empty"));
        }
        if self.telegram.power_chat_ids.is_empty() {
            return Err(invalid("telegram.power_chat_ids is empty"));
        }
        Ok(())
    }

    /// Copy with credential material masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.probe.access_token = mask(&copy.probe.access_token);
        copy.telegram.bot_token = mask(&copy.telegram.bot_token);
        copy
    }
}

fn invalid(details: &str) -> PsnError {
    PsnError::InvalidConfig {
        details: details.to_string(),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}***")
}
