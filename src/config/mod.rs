//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod rollup;
mod storage;

pub use rollup::{RetryConfig, RollupConfig};
pub use storage::{SqliteConfig, StorageConfig, StorageType, SQLITE_MEMORY_PATH};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "sales-rollup.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "SALES_ROLLUP_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "SALES_ROLLUP";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "SALES_ROLLUP_LOG";

use serde::Deserialize;

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Rollup engine configuration.
    pub rollup: RollupConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `DEFAULT_CONFIG_FILE` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rollup.max_concurrent_keys == 0 {
            return Err(ConfigError::Invalid(
                "rollup.max_concurrent_keys must be at least 1".to_string(),
            ));
        }
        if self.rollup.checkpoint_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "rollup.checkpoint_batch_size must be at least 1".to_string(),
            ));
        }
        if self.storage.sqlite.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "storage.sqlite.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Create config for testing: in-memory stores, no retry delays.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig {
                storage_type: StorageType::Memory,
                ..Default::default()
            },
            rollup: RollupConfig {
                retry: RetryConfig::none(),
                ..Default::default()
            },
        }
    }
}
