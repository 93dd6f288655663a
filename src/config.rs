//! Configuration loading and management.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity.
    pub server: ServerConfig,
    /// Network listen configuration.
    pub listen: ListenConfig,
    /// Video channels, in index order.
    #[serde(rename = "channel")]
    pub channels: Vec<ChannelConfig>,
    /// Lock behavior.
    #[serde(default)]
    pub lock: LockConfig,
    /// DATA command storage.
    #[serde(default)]
    pub data: DataConfig,
    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name used in log output (e.g., "caspar-1").
    pub name: String,
}

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:5250").
    pub address: SocketAddr,
}

/// One video channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Video format name (e.g., "PAL", "720p50", "1080i50").
    pub video_mode: String,
}

/// Channel lock behavior.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LockConfig {
    /// Override phrase accepted by `LOCK <ch> CLEAR`. When unset, CLEAR
    /// requires no phrase.
    pub clear_phrase: Option<String>,
}

/// DATA command storage location.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Directory for stored data files.
    pub path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { path: "data".to_string() }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Initial log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;

        if config.channels.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one [[channel]] block is required".to_string(),
            ));
        }

        Ok(config)
    }
}
