//! Configuration management for rendezvous
//!
//! Handles loading configuration from files and environment variables,
//! and provides validation for all configuration settings.

use crate::RendezvousError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RendezvousConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Radius around the midpoint in meters
    #[serde(default = "default_radius_meters")]
    pub default_radius_meters: u32,
    /// Maximum number of venues returned
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Suggestions are skipped for shorter queries
    #[serde(default = "default_suggestion_min_query_len")]
    pub suggestion_min_query_len: usize,
}

/// In-memory search cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live in minutes
    #[serde(default = "default_cache_ttl")]
    pub ttl_minutes: u64,
    /// Maximum number of cached searches
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    /// Background expiry sweep interval in minutes
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_minutes: u64,
}

/// Provider call retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt for transient errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Search history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_max_items")]
    pub max_items: usize,
    /// Directory holding the durable key-value store
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_radius_meters() -> u32 {
    1500
}

fn default_max_results() -> usize {
    20
}

fn default_suggestion_min_query_len() -> usize {
    3
}

fn default_cache_ttl() -> u64 {
    30
}

fn default_cache_max_entries() -> usize {
    50
}

fn default_sweep_interval() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_history_max_items() -> usize {
    20
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("rendezvous"))
        .unwrap_or_else(|| PathBuf::from(".rendezvous"))
        .to_string_lossy()
        .into_owned()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_meters: default_radius_meters(),
            max_results: default_max_results(),
            suggestion_min_query_len: default_suggestion_min_query_len(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
            sweep_interval_minutes: default_sweep_interval(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_items: default_history_max_items(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl RendezvousConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    ///
    /// Environment overrides use the `RENDEZVOUS_` prefix and `__` between
    /// section and key, e.g. `RENDEZVOUS_CACHE__TTL_MINUTES=5`.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("RENDEZVOUS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: RendezvousConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rendezvous").join("config.toml"))
    }

    /// Directory of the durable history store
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.history.data_dir)
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.search.default_radius_meters == 0 {
            self.search.default_radius_meters = default_radius_meters();
        }
        if self.search.max_results == 0 {
            self.search.max_results = default_max_results();
        }
        if self.cache.ttl_minutes == 0 {
            self.cache.ttl_minutes = default_cache_ttl();
        }
        if self.cache.max_entries == 0 {
            self.cache.max_entries = default_cache_max_entries();
        }
        if self.cache.sweep_interval_minutes == 0 {
            self.cache.sweep_interval_minutes = default_sweep_interval();
        }
        if self.history.max_items == 0 {
            self.history.max_items = default_history_max_items();
        }
        if self.history.data_dir.is_empty() {
            self.history.data_dir = default_data_dir();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.search.default_radius_meters > 50_000 {
            return Err(RendezvousError::config("Search radius cannot exceed 50000 meters").into());
        }

        if self.search.max_results > 60 {
            return Err(RendezvousError::config("Maximum results cannot exceed 60").into());
        }

        if self.cache.ttl_minutes > 24 * 60 {
            return Err(RendezvousError::config("Cache TTL cannot exceed 1440 minutes (1 day)").into());
        }

        if self.cache.sweep_interval_minutes > 24 * 60 {
            return Err(RendezvousError::config(
                "Cache sweep interval cannot exceed 1440 minutes (1 day)",
            )
            .into());
        }

        if self.cache.max_entries > 10_000 {
            return Err(RendezvousError::config("Cache max entries cannot exceed 10000").into());
        }

        if self.retry.max_retries > 10 {
            return Err(RendezvousError::config("Max retries cannot exceed 10").into());
        }

        if !self.retry.backoff_factor.is_finite() || self.retry.backoff_factor < 1.0 {
            return Err(RendezvousError::config("Backoff factor must be a finite number >= 1.0").into());
        }

        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(RendezvousError::config(
                "Retry max delay cannot be smaller than the base delay",
            )
            .into());
        }

        if self.history.max_items > 1000 {
            return Err(RendezvousError::config("History size cannot exceed 1000 items").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(RendezvousError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "compact"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(RendezvousError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        Ok(())
    }

    /// Create the data directory if it doesn't exist
    pub fn ensure_data_dir(&self) -> Result<PathBuf> {
        let dir = self.data_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        Ok(dir)
    }
}
