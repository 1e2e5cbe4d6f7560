//! Application configuration
//!
//! Loaded from a YAML file whose sections supply the command-line defaults:
//!
//! ```yaml
//! ping:
//!   count: 4
//!   size: 32
//!   timeout: 2s
//! scanner:
//!   threads: 10
//!   timeout: 1s
//! history:
//!   enabled: true
//!   limit: 10
//! logging:
//!   level: warn
//! thresholds:
//!   loss_pct: 5.0
//!   avg_ms: 100.0
//! ```
//!
//! Every field is optional.

use crate::probe::request::{DEFAULT_COUNT, DEFAULT_PACKET_SIZE, DEFAULT_TIMEOUT};
use crate::stats::Thresholds;
use crate::sweep::config::{DEFAULT_CONCURRENCY, DEFAULT_HOST_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Directory under the home directory that holds history, logs and config
pub const APP_DIR_NAME: &str = ".pingsweep";
/// Default configuration file name inside [`APP_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.yaml";
/// Default number of history records listed
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Single-host probe defaults
    pub ping: PingSection,
    /// Sweep defaults
    pub scanner: ScannerSection,
    /// History persistence
    pub history: HistorySection,
    /// Log output
    pub logging: LoggingSection,
    /// Warning limits
    pub thresholds: Thresholds,
}

/// Single-host probe defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PingSection {
    /// Echo requests per run (default: 4)
    pub count: u32,
    /// Payload size in bytes (default: 32)
    pub size: u32,
    /// Per-reply wait (default: 2s)
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PingSection {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            size: DEFAULT_PACKET_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Sweep defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSection {
    /// Concurrent probes (default: 10)
    pub threads: usize,
    /// Per-host reply wait (default: 1s)
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            threads: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_HOST_TIMEOUT,
        }
    }
}

/// History persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Save statistics after each single-host run (default: true)
    pub enabled: bool,
    /// Records listed by `--history` (default: 10)
    pub limit: usize,
    /// History file (default: `~/.pingsweep/history.jsonl`)
    pub path: Option<PathBuf>,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: DEFAULT_HISTORY_LIMIT,
            path: None,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Console level when no `-v` is given (default: "warn")
    pub level: String,
    /// Append INFO and above to this file (default: `~/.pingsweep/pingsweep.log`,
    /// `null` disables it)
    pub path: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            path: app_file_path(crate::log::LOG_FILE_NAME),
        }
    }
}

impl AppConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Load configuration, falling back to defaults when the file is absent
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ping.count == 0 {
            return Err(ConfigError::ValidationError(
                "ping.count must be greater than 0".to_string(),
            ));
        }
        if self.ping.size == 0 {
            return Err(ConfigError::ValidationError(
                "ping.size must be greater than 0".to_string(),
            ));
        }
        if self.ping.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "ping.timeout must be greater than 0".to_string(),
            ));
        }
        if self.scanner.threads == 0 {
            return Err(ConfigError::ValidationError(
                "scanner.threads must be at least 1".to_string(),
            ));
        }
        if self.scanner.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "scanner.timeout must be greater than 0".to_string(),
            ));
        }
        if self.thresholds.loss_pct < 0.0 || self.thresholds.avg_ms < 0.0 {
            return Err(ConfigError::ValidationError(
                "thresholds must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// History file, honoring `history.path`
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history
            .path
            .clone()
            .or_else(|| app_file_path(crate::history::HISTORY_FILE_NAME))
    }
}

/// `~/.pingsweep`, if a home directory is known
pub fn app_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR_NAME))
}

/// A file inside [`app_dir`]
pub fn app_file_path(name: &str) -> Option<PathBuf> {
    app_dir().map(|dir| dir.join(name))
}

/// Default configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    app_file_path(CONFIG_FILE_NAME)
}
