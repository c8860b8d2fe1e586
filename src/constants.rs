//! # System Constants
//!
//! Defaults and names that define the operational boundaries of the range executor.

use serde::{Deserialize, Serialize};

/// Execution defaults shared by the coordinator, workers and block executor
pub mod execution {
    /// Maximum number of keys covered by one commit block
    pub const DEFAULT_BLOCK_SIZE: i64 = 100;

    /// Retry budget for a block when the caller does not specify one
    pub const DEFAULT_BLOCK_RETRY_LIMIT: u32 = 3;

    /// Retry budget used by a worker while driving a full partition
    pub const WORKER_BLOCK_RETRY_LIMIT: u32 = 10;

    /// Initial value of the progress counter
    pub const DEFAULT_PROGRESS_INITIAL: u64 = 0;

    /// Lower bound on the number of parallel workers
    pub const MIN_PARALLELISM: usize = 1;
}

/// Environment variable names
pub mod env_vars {
    /// Primary environment selector
    pub const RANGEFLOW_ENV: &str = "RANGEFLOW_ENV";

    /// Fallback environment selector
    pub const APP_ENV: &str = "APP_ENV";

    /// Overrides `database.url`
    pub const DATABASE_URL: &str = "DATABASE_URL";

    /// Directory holding `rangeflow*.toml` files
    pub const RANGEFLOW_CONFIG_DIR: &str = "RANGEFLOW_CONFIG_DIR";

    /// Prefix for nested config overrides, e.g. `RANGEFLOW__EXECUTION__BLOCK_SIZE`
    pub const CONFIG_PREFIX: &str = "RANGEFLOW";
}

pub mod system {
    /// Version compatibility marker
    pub const RANGEFLOW_CORE_VERSION: &str = "0.1.0";

    /// Default environment when none is set
    pub const DEFAULT_ENVIRONMENT: &str = "development";

    /// Default configuration directory, relative to the working directory
    pub const DEFAULT_CONFIG_DIR: &str = "config";

    /// Base name of configuration files
    pub const CONFIG_FILE_STEM: &str = "rangeflow";
}

/// Final status of a single block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Committed,
    RetryScheduled,
    Exhausted,
    Failed,
}

impl std::fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockStatus::Committed => write!(f, "committed"),
            BlockStatus::RetryScheduled => write!(f, "retry_scheduled"),
            BlockStatus::Exhausted => write!(f, "exhausted"),
            BlockStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle status of a range worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Started,
    Completed,
    CompletedWithExhaustedBlocks,
    Cancelled,
    Failed,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Started => write!(f, "started"),
            WorkerStatus::Completed => write!(f, "completed"),
            WorkerStatus::CompletedWithExhaustedBlocks => {
                write!(f, "completed_with_exhausted_blocks")
            }
            WorkerStatus::Cancelled => write!(f, "cancelled"),
            WorkerStatus::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_matches_serde_names() {
        assert_eq!(BlockStatus::RetryScheduled.to_string(), "retry_scheduled");
        assert_eq!(
            serde_json::to_string(&BlockStatus::RetryScheduled).unwrap(),
            "\"retry_scheduled\""
        );
        assert_eq!(
            WorkerStatus::CompletedWithExhaustedBlocks.to_string(),
            "completed_with_exhausted_blocks"
        );
    }

    #[test]
    fn test_retry_budgets_are_distinct() {
        assert!(execution::WORKER_BLOCK_RETRY_LIMIT > execution::DEFAULT_BLOCK_RETRY_LIMIT);
    }
}
