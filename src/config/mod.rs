use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::observability::tracing::LogFormat;

/// Which built-in action table and priority ranking to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Desktop,
    Mobile,
}

/// Policy engine configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "flowpolicy")]
#[command(about = "Resolve permitted workflow actions for a task context")]
pub struct Config {
    /// Path to a rule table YAML file (built-in table when not set)
    #[arg(long, env = "FLOWPOLICY_TABLE_PATH")]
    pub table_path: Option<PathBuf>,

    /// Built-in table and priority ranking
    #[arg(long, value_enum, default_value = "desktop", env = "FLOWPOLICY_PROFILE")]
    pub profile: Profile,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", env = "FLOWPOLICY_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Maximum number of cached entries
    #[arg(long, default_value = "200", env = "FLOWPOLICY_CACHE_CAPACITY")]
    pub cache_capacity: usize,

    /// TTL applied when a caller does not give one, in seconds
    #[arg(long, default_value = "600", env = "FLOWPOLICY_DEFAULT_TTL_SECS")]
    pub default_ttl_secs: u64,

    /// Interval between expiry sweeps, in seconds
    #[arg(long, default_value = "120", env = "FLOWPOLICY_SWEEP_INTERVAL_SECS")]
    pub sweep_interval_secs: u64,

    /// Store cached values in encoded form
    #[arg(long, default_value = "true", action = clap::ArgAction::Set, env = "FLOWPOLICY_COMPRESS")]
    pub compress: bool,
}

impl Config {
    /// Get default TTL as Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Get sweep interval as Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            capacity: self.cache_capacity,
            default_ttl: self.default_ttl(),
            sweep_interval: self.sweep_interval(),
            compress: self.compress,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            table_path: None,
            profile: Profile::Desktop,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            cache_capacity: 200,
            default_ttl_secs: 600,
            sweep_interval_secs: 120,
            compress: true,
        }
    }
}

/// Settings of a [`PolicyCache`](crate::cache::PolicyCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries (at least 1)
    pub capacity: usize,
    /// TTL applied when `set` is called without one
    pub default_ttl: Duration,
    /// Interval of the background expiry sweep
    pub sweep_interval: Duration,
    /// Store values in encoded form (applied by `PolicyEngine::create`)
    pub compress: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: 100,
            default_ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
            compress: false,
        }
    }
}

impl CacheConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}
