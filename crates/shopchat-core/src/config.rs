//! Widget engine configuration.

use crate::anchor::AnchorPolicy;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Streaming assistant endpoint (POST).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Connect timeout for the streaming request, ms.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub anchor: AnchorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorConfig {
    #[serde(default)]
    pub policy: AnchorPolicy,
    /// Recomputation is coalesced to at most once per frame.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Poll cadence while waiting for the reference element to appear.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Poll attempts before giving up on the reference element.
    #[serde(default = "default_poll_budget")]
    pub poll_budget: u32,
}

fn default_endpoint() -> String {
    "http://localhost:3000/api/assistant/stream".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_poll_interval_ms() -> u64 {
    400
}

fn default_poll_budget() -> u32 {
    25
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_timeout_ms: default_connect_timeout_ms(),
            anchor: AnchorConfig::default(),
        }
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            policy: AnchorPolicy::default(),
            frame_interval_ms: default_frame_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_budget: default_poll_budget(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from the default location (config/default.toml) or fall
    /// back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = std::path::PathBuf::from("config/default.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        Ok(Config::default())
    }
}
