//! Configuration loading for the boardsync CLI.
//!
//! Configuration is loaded from an optional TOML file. When `--config` is not
//! given, `boardsync.toml` in the platform config directory is used if it
//! exists. Command-line flags override file values.

use boardsync_core::ReconnectPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Game server.
    #[serde(default)]
    pub server: ServerConfig,
    /// Local player identity.
    #[serde(default)]
    pub player: PlayerConfig,
    /// Reconnect backoff.
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

/// Game server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// WebSocket URL (default: ws://localhost:3005/ws).
    #[serde(default = "default_url")]
    pub url: String,
}

/// Local player configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerConfig {
    /// Numeric user id assigned by the game service.
    pub user_id: Option<u64>,
    /// Display name.
    pub username: Option<String>,
}

fn default_url() -> String {
    "ws://localhost:3005/ws".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `path` if given, else the default location if that file exists,
    /// else built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }
}

/// `boardsync.toml` in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "boardsync", "boardsync")
        .map(|dirs| dirs.config_dir().join("boardsync.toml"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
