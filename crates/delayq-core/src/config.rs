use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration, deserializable from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DelayqConfig {
    pub storage: StorageConfig,
    pub consumer: ConsumerConfig,
}

/// Where the local RocksDB store lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

/// Consumer loop settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Longest interval between two range queries. Each poll also fetches
    /// everything that falls due before the next one.
    pub poll_period_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

impl ConsumerConfig {
    /// Default poll period: 1 second.
    pub const DEFAULT_POLL_PERIOD_MS: u64 = 1_000;

    pub fn with_poll_period(poll_period: Duration) -> Self {
        Self {
            poll_period_ms: u64::try_from(poll_period.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_period_ms: Self::DEFAULT_POLL_PERIOD_MS,
        }
    }
}

impl DelayqConfig {
    /// Read, parse and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.consumer.poll_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "consumer.poll_period_ms must be greater than 0".to_string(),
            ));
        }
        if self.storage.data_dir.is_empty() {
            return Err(ConfigError::Invalid(
                "storage.data_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
