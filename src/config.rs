//! BenchLink configuration

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SIZE_LIST, MAX_TRANSFER_SIZE};

/// Default configuration constants
///
/// This module centralizes all default values used throughout BenchLink.
/// By collecting these constants in one place, we ensure consistency
/// and make it easier to adjust defaults for different test rigs.
pub mod defaults {

    /// Wait timeout for completion signals in milliseconds (0 = unbounded)
    ///
    /// The unbounded active spin is deliberate: it keeps the measured
    /// device timestamps free of scheduler wait jitter. A non-zero value
    /// turns a stalled transfer into an error instead of a hang.
    pub const WAIT_TIMEOUT_MS: u64 = 0;

    /// Default log level
    pub const fn default_log_level() -> &'static str {
        "info"
    }

    /// Enable host-side timing statistics collection (default: false)
    ///
    /// Disable in production benchmarks to avoid measurement overhead.
    pub const ENABLE_STATS: bool = false;
}

/// BenchLink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Measurement configuration
    pub measure: MeasureConfig,

    /// Logging configuration
    pub log: LogConfig,
}

/// Measurement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureConfig {
    /// Benchmark transfer sizes in bytes
    ///
    /// An empty list selects the built-in default table. The list is
    /// sorted ascending before use either way.
    #[serde(default)]
    pub sizes: Vec<u64>,

    /// Completion-wait timeout in milliseconds (0 = wait forever)
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

fn default_wait_timeout_ms() -> u64 {
    defaults::WAIT_TIMEOUT_MS
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable host-side timing statistics collection
    #[serde(default = "default_enable_stats")]
    pub enable_stats: bool,
}

fn default_log_level() -> String {
    defaults::default_log_level().to_string()
}

fn default_enable_stats() -> bool {
    defaults::ENABLE_STATS
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            measure: MeasureConfig {
                sizes: vec![],
                wait_timeout_ms: default_wait_timeout_ms(),
            },
            log: LogConfig {
                level: default_log_level(),
                enable_stats: default_enable_stats(),
            },
        }
    }
}

impl BenchConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("Failed to read config file: {}", e)))?;

        let config: BenchConfig = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializeError(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, contents)
            .map_err(|e| ConfigError::WriteError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Effective benchmark size list: configured sizes, or the default table
    pub fn effective_sizes(&self) -> Vec<u64> {
        if self.measure.sizes.is_empty() {
            DEFAULT_SIZE_LIST.to_vec()
        } else {
            self.measure.sizes.clone()
        }
    }

    /// Effective wait timeout (`None` = unbounded)
    pub fn wait_timeout(&self) -> Option<std::time::Duration> {
        if self.measure.wait_timeout_ms == 0 {
            None
        } else {
            Some(std::time::Duration::from_millis(self.measure.wait_timeout_ms))
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), ConfigError> {
        // Validate transfer sizes
        for &size in &self.measure.sizes {
            if size == 0 || size > MAX_TRANSFER_SIZE {
                return Err(ConfigError::ValidationError(format!(
                    "Transfer size must be between 1 and {} bytes, got {}",
                    MAX_TRANSFER_SIZE, size
                )));
            }
        }

        // Validate log level
        match self.log.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}",
                    self.log.level
                )));
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),

    #[error("Failed to write config: {0}")]
    WriteError(String),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}
