//! Server configuration.

use serde::{Deserialize, Serialize};
use tracing::info;
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub error: ErrorConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Name logged at startup.
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            name: default_name(),
        }
    }
}

fn default_port() -> u16 {
    8080
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_name() -> String {
    "puddle-vis".to_string()
}

/// Board dimensions in cells.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoardConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_width() -> u32 {
    12
}
fn default_height() -> u32 {
    8
}

/// Volume error applied when droplets split.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ErrorConfig {
    /// Standard deviation of the split error. 0 disables it.
    #[serde(default)]
    pub split_error_stdev: f64,
    /// Fixed RNG seed; random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[board]\nwidth = 20\n").unwrap();
        assert_eq!(config.board.width, 20);
        assert_eq!(config.board.height, 8);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.error.split_error_stdev, 0.0);
        assert_eq!(config.error.seed, None);
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let config: Config = toml::from_str(&text).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.board.width, 12);
    }
}
