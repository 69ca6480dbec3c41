//! Client configuration
//!
//! Loaded from TOML, falls back to defaults if no config file exists.
//! Environment variables override the file.

use hive_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8787/api";

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Control-plane HTTP settings.
    pub api: ApiConfig,
    /// Event stream settings.
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every path is resolved against, e.g. `http://host:8787/api`.
    pub base_url: String,
    /// Per-request timeout for commands and queries. Does not apply to the event stream.
    /// 0 disables it.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventsConfig {
    /// Delay before re-opening a dropped event stream.
    pub reconnect_delay_ms: u64,
    /// TCP connect timeout for the event stream and commands. 0 disables it.
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 3000,
            connect_timeout_secs: 10,
        }
    }
}

impl EventsConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.connect_timeout_secs)
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        non_zero_secs(self.timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl ClientConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Strict variant of [`ClientConfig::load`]: a present but invalid file is an error.
    pub fn try_load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply `HIVE_API_URL` and `HIVE_TIMEOUT_SECS`.
    pub fn with_env(self) -> Self {
        self.with_overrides(
            std::env::var("HIVE_API_URL").ok(),
            std::env::var("HIVE_TIMEOUT_SECS").ok(),
        )
    }

    fn with_overrides(mut self, base_url: Option<String>, timeout_secs: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(raw) = timeout_secs {
            match raw.parse() {
                Ok(secs) => self.api.timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid HIVE_TIMEOUT_SECS={}", raw),
            }
        }
        self
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
