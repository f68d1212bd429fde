use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::command::MAX_DELAY_SECS;
use crate::error::{BotError, FetchResult};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub webex: WebexConfig,
    #[serde(default)]
    pub position: PositionConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebexConfig {
    /// Full header value, e.g. "Bearer abc123"
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_webex_base_url")]
    pub base_url: String,
    /// Part of the room title to monitor. Prompted for when absent.
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PositionConfig {
    #[serde(default = "default_position_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocoderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_geocoder_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

fn default_webex_base_url() -> String {
    "https://webexapis.com/v1".to_string()
}

fn default_position_url() -> String {
    "http://api.open-notify.org/iss-now.json".to_string()
}

fn default_geocoder_base_url() -> String {
    "https://us1.locationiq.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_interval_secs() -> u64 {
    1
}

fn default_cooldown_secs() -> u64 {
    5
}

fn default_max_delay_secs() -> u64 {
    MAX_DELAY_SECS
}

impl Default for WebexConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: default_webex_base_url(),
            room: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            url: default_position_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_geocoder_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            cooldown_secs: default_cooldown_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Config {
    /// Load from a TOML file. A missing file yields the defaults.
    /// Environment overrides are applied afterwards in both cases.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)?
        } else {
            info!("No config file at {}, using defaults", path.display());
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// WEBEX_TOKEN and LOCATIONIQ_API_KEY win over the file when set and non-empty.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("WEBEX_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.webex.token = token.trim().to_string();
        }
        if let Some(key) = lookup("LOCATIONIQ_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.geocoder.api_key = key.trim().to_string();
        }
    }

    /// The reverse-geocoding key. Its absence is fatal and never retried.
    pub fn geocoder_api_key(&self) -> FetchResult<&str> {
        let key = self.geocoder.api_key.trim();
        if key.is_empty() {
            return Err(BotError::config(
                "No geocoding API key. Set LOCATIONIQ_API_KEY or [geocoder] api_key.",
            ));
        }
        Ok(key)
    }
}
