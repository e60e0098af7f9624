//! Application configuration
//!
//! Optional TOML config file for defaults that are tedious to repeat on the
//! command line. Flags always override file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default baud rate for the analyzer's serial link.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default polling interval in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 10;

/// Default serial read timeout in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Serial port path; auto-detected when absent
    pub port: Option<String>,
    /// Baud rate
    pub baud_rate: u32,
    /// Polling interval in milliseconds
    pub tick_interval_ms: u64,
    /// Serial read timeout in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.tick_interval_ms, 10);
        assert!(config.port.is_none());
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.toml");
        fs::write(&path, "port = \"/dev/ttyACM1\"\nbaud_rate = 921600\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.port.as_deref(), Some("/dev/ttyACM1"));
        assert_eq!(config.baud_rate, 921_600);
        // Unset fields keep their defaults.
        assert_eq!(config.read_timeout_ms, 100);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.toml");
        fs::write(&path, "bahd_rate = 9600\n").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }
}
