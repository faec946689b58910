//! Configuration for the tether bridge
//!
//! Built-in defaults, overlaid by `~/.config/tether/config.toml` when
//! present, overlaid by environment variables. All file fields are optional;
//! the file is a partial overlay, not a full schema.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Default listening port for device connections
pub const DEFAULT_PORT: u16 = 8765;

/// Default deadline for a freshly accepted connection to send its handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for a dispatched command to produce a reply
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the device listener binds
    pub port: u16,

    /// How long a new connection may take to send its handshake
    pub handshake_timeout: Duration,

    /// How long a dispatched command may take to produce a reply
    pub command_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// `[server]` section of the config file
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Port for device connections
    pub port: Option<u16>,

    /// Handshake deadline in milliseconds
    pub handshake_timeout_ms: Option<u64>,

    /// Command reply deadline in milliseconds
    pub command_timeout_ms: Option<u64>,
}

impl Config {
    /// Load configuration from the default file location and environment
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be read or parsed
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path().as_deref())
    }

    /// Load configuration from an explicit file path and environment
    ///
    /// A `None` or missing path is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be read or parsed
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = path {
            if path.exists() {
                let raw = std::fs::read_to_string(path)?;
                let file: ConfigFile = toml::from_str(&raw)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
                config.apply_file(&file);
                tracing::debug!(path = %path.display(), "loaded config file");
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Overlay values from a parsed config file
    fn apply_file(&mut self, file: &ConfigFile) {
        if let Some(port) = file.server.port {
            self.port = port;
        }
        if let Some(ms) = file.server.handshake_timeout_ms {
            self.handshake_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.server.command_timeout_ms {
            self.command_timeout = Duration::from_millis(ms);
        }
    }

    /// Overlay values from environment variables
    ///
    /// `TETHER_PORT` is handled by the CLI layer; only the timeouts are
    /// env-only knobs.
    fn apply_env(&mut self) {
        if let Some(ms) = env_u64("TETHER_HANDSHAKE_TIMEOUT_MS") {
            self.handshake_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("TETHER_COMMAND_TIMEOUT_MS") {
            self.command_timeout = Duration::from_millis(ms);
        }
    }
}

/// Parse a u64 environment variable, ignoring unset or malformed values
fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Default config file location (`~/.config/tether/config.toml`)
fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("tether").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8765);
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.command_timeout, Duration::from_secs(10));
    }

    #[test]
    fn file_overlay_is_partial() {
        let file: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 9000
            handshake_timeout_ms = 250
            "#,
        )
        .unwrap();

        let mut config = Config::default();
        config.apply_file(&file);

        assert_eq!(config.port, 9000);
        assert_eq!(config.handshake_timeout, Duration::from_millis(250));
        // Untouched fields keep their defaults
        assert_eq!(config.command_timeout, Duration::from_secs(10));
    }

    #[test]
    fn empty_file_keeps_defaults() {
        let file: ConfigFile = toml::from_str("").unwrap();
        let mut config = Config::default();
        config.apply_file(&file);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn missing_path_is_not_an_error() {
        let config = Config::load_from(Some(Path::new("/nonexistent/tether/config.toml"))).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
