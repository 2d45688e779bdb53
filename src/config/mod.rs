//! Configuration management for mongoscan
//!
//! Configuration is loaded from a TOML file and then overridden by
//! command-line arguments.
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::scan::ScanOptions;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Scan behavior configuration
    #[serde(default)]
    pub scan: ScanConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// MongoDB connection URI
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Number of connection attempts before giving up
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Application name reported to the server
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

/// Scan behavior configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Log progress every N documents (0 disables)
    #[serde(default)]
    pub progress_interval: u64,

    /// Documents per getMore round trip (driver default when unset)
    #[serde(default)]
    pub batch_size: Option<u32>,

    /// Reapply the sort order when a lost cursor is rebuilt
    #[serde(default = "default_true")]
    pub reapply_sort_on_resume: bool,

    /// Count the recovered document towards progress reports
    #[serde(default = "default_true")]
    pub progress_on_resume: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_app_name() -> String {
    "mongoscan".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            timeout: default_timeout(),
            retry_attempts: default_retry_attempts(),
            app_name: default_app_name(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            progress_interval: 0,
            batch_size: None,
            reapply_sort_on_resume: default_true(),
            progress_on_resume: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.display().to_string()),
            _ => ConfigError::InvalidFormat(format!("{}: {}", path.display(), e)),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Load configuration from an explicit path, or the default location
    ///
    /// A missing file at the default location yields defaults; a missing
    /// explicit file is an error.
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mongoscan")
            .join("config.toml")
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.connection.uri.trim().is_empty() {
            return Err(invalid("connection.uri", "").into());
        }
        if self.connection.timeout == 0 {
            return Err(invalid("connection.timeout", "0").into());
        }
        if self.connection.retry_attempts == 0 {
            return Err(invalid("connection.retry_attempts", "0").into());
        }
        if self.scan.batch_size == Some(0) {
            return Err(invalid("scan.batch_size", "0").into());
        }
        Ok(())
    }

    /// Get connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.timeout)
    }

    /// Scan options derived from the `[scan]` section
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            progress_interval: self.scan.progress_interval,
            reapply_sort_on_resume: self.scan.reapply_sort_on_resume,
            progress_on_resume: self.scan.progress_on_resume,
            batch_size: self.scan.batch_size,
        }
    }
}

fn invalid(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.uri, "mongodb://localhost:27017");
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.scan.reapply_sort_on_resume);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [scan]
            progress_interval = 500
            reapply_sort_on_resume = false

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.scan.progress_interval, 500);
        assert!(!config.scan.reapply_sort_on_resume);
        assert!(config.scan.progress_on_resume);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.connection.timeout, 30);
    }

    #[test]
    fn test_scan_options_from_config() {
        let mut config = Config::default();
        config.scan.progress_interval = 100;
        config.scan.batch_size = Some(250);
        config.scan.progress_on_resume = false;

        let options = config.scan_options();
        assert_eq!(options.progress_interval, 100);
        assert_eq!(options.batch_size, Some(250));
        assert!(options.reapply_sort_on_resume);
        assert!(!options.progress_on_resume);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scan.batch_size = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.connection.timeout = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[scan\nprogress_interval = 1").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error: Invalid config format"));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load_from_file(Some(Path::new("/nonexistent/mongoscan.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_connection_timeout() {
        let config = Config::default();
        assert_eq!(config.connection_timeout(), Duration::from_secs(30));
    }
}
