//! # Rangeflow Configuration System
//!
//! Layered configuration for the range executor, loaded through the `config` crate:
//! compiled defaults, then `config/rangeflow.toml`, then
//! `config/rangeflow.{environment}.toml`, then `RANGEFLOW__*` environment variables,
//! then `DATABASE_URL`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rangeflow_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let block_size = manager.config().execution.block_size;
//! let workers = manager.config().worker_parallelism();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::execution::{DEFAULT_BLOCK_SIZE, MIN_PARALLELISM, WORKER_BLOCK_RETRY_LIMIT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `rangeflow.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RangeflowConfig {
    /// Database connection and pooling configuration
    pub database: DatabaseConfig,

    /// Partitioning, block and retry settings
    pub execution: ExecutionConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

impl RangeflowConfig {
    /// Validate cross-field constraints after loading
    pub fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.execution.validate()?;
        if let Some(parallelism) = self.execution.parallelism {
            if parallelism > self.database.max_connections as usize {
                return Err(ConfigurationError::invalid_value(
                    "execution.parallelism",
                    parallelism.to_string(),
                    format!(
                        "each worker holds one connection; raise database.max_connections to at least {parallelism}"
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Worker count for a run: the effective parallelism, never more than the pool holds
    pub fn worker_parallelism(&self) -> usize {
        self.execution
            .effective_parallelism()
            .min(self.database.max_connections as usize)
            .max(MIN_PARALLELISM)
    }
}

/// Database connection and pooling configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// Upper bound of the pool; each worker holds one connection for its whole partition
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/rangeflow_development".to_string(),
            max_connections: 16,
            acquire_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "url",
                "database configuration",
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "at least one connection is required",
            ));
        }
        Ok(())
    }
}

/// Partitioning, block and retry settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Maximum number of keys committed in one transaction
    pub block_size: i64,
    /// Retry budget for each block while a worker drives its partition
    pub worker_retry_limit: u32,
    /// Number of parallel workers; hardware parallelism when unset
    pub parallelism: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            worker_retry_limit: WORKER_BLOCK_RETRY_LIMIT,
            parallelism: None,
        }
    }
}

impl ExecutionConfig {
    /// Configured parallelism, or the number of hardware execution units, never below 1
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(MIN_PARALLELISM)
            })
            .max(MIN_PARALLELISM)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.block_size < 1 {
            return Err(ConfigurationError::invalid_value(
                "execution.block_size",
                self.block_size.to_string(),
                "block size must be at least 1",
            ));
        }
        if self.parallelism == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "execution.parallelism",
                "0",
                "parallelism must be at least 1 when set",
            ));
        }
        Ok(())
    }
}

/// Log output settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive overriding the environment default
    pub level: Option<String>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}
