//! Error types for the range executor.
//!
//! [`RangeflowError`] covers everything that can go wrong around a run (configuration,
//! key-set validation, database setup, worker failures). [`BlockError`] is the narrower
//! type produced while processing a single block, already classified as transient or
//! fatal so the retry loop can decide what to do with it.

use crate::execution::error_classifier::{classify_sqlx_error, ErrorCategory};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeflowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Invalid key range: {0}")]
    InvalidKeyRange(String),
    #[error("Key set is empty, nothing to dispatch")]
    EmptyKeySet,
    #[error("Coordinator already has workers in flight; join before dispatching again")]
    AlreadyDispatched,
    #[error("Worker {worker_id} panicked: {reason}")]
    WorkerPanicked { worker_id: usize, reason: String },
    #[error("Session error: {0}")]
    SessionError(String),
}

impl From<sqlx::Error> for RangeflowError {
    fn from(err: sqlx::Error) -> Self {
        RangeflowError::DatabaseError(err.to_string())
    }
}

impl From<config::ConfigError> for RangeflowError {
    fn from(err: config::ConfigError) -> Self {
        RangeflowError::ConfigurationError(err.to_string())
    }
}

impl From<serde_json::Error> for RangeflowError {
    fn from(error: serde_json::Error) -> Self {
        RangeflowError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, RangeflowError>;

/// A failure raised while executing or committing one block
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// Operational or connectivity failure; the block may be retried
    #[error("Transient failure: {message}")]
    Transient { message: String },
    /// Anything else; the block is abandoned and the failure propagated
    #[error("Fatal failure: {message}")]
    Fatal { message: String },
}

impl BlockError {
    pub fn transient(message: impl Into<String>) -> Self {
        BlockError::Transient {
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        BlockError::Fatal {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, BlockError::Transient { .. })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BlockError::Transient { .. } => ErrorCategory::Transient,
            BlockError::Fatal { .. } => ErrorCategory::Fatal,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            BlockError::Transient { message } | BlockError::Fatal { message } => message,
        }
    }

    /// Same message, never retried
    pub fn into_fatal(self) -> Self {
        match self {
            BlockError::Transient { message } | BlockError::Fatal { message } => {
                BlockError::Fatal { message }
            }
        }
    }
}

impl From<sqlx::Error> for BlockError {
    fn from(err: sqlx::Error) -> Self {
        match classify_sqlx_error(&err) {
            ErrorCategory::Transient => BlockError::transient(err.to_string()),
            ErrorCategory::Fatal => BlockError::fatal(err.to_string()),
        }
    }
}

pub type BlockResult<T> = std::result::Result<T, BlockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_error_classification_helpers() {
        let transient = BlockError::transient("connection reset");
        assert!(transient.is_transient());
        assert_eq!(transient.category(), ErrorCategory::Transient);
        assert_eq!(transient.message(), "connection reset");

        let fatal = BlockError::fatal("duplicate key");
        assert!(!fatal.is_transient());
        assert_eq!(fatal.to_string(), "Fatal failure: duplicate key");
    }

    #[test]
    fn test_into_fatal_keeps_message() {
        let err = BlockError::transient("server closed the connection").into_fatal();
        assert_eq!(err, BlockError::fatal("server closed the connection"));
        assert_eq!(
            BlockError::fatal("duplicate key").into_fatal(),
            BlockError::fatal("duplicate key")
        );
    }

    #[test]
    fn test_sqlx_io_error_converts_to_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err: BlockError = sqlx::Error::Io(io).into();
        assert!(err.is_transient());
    }

    #[test]
    fn test_sqlx_row_not_found_converts_to_fatal() {
        let err: BlockError = sqlx::Error::RowNotFound.into();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_worker_panic_display() {
        let err = RangeflowError::WorkerPanicked {
            worker_id: 2,
            reason: "task 7 panicked".to_string(),
        };
        assert_eq!(err.to_string(), "Worker 2 panicked: task 7 panicked");
    }
}
