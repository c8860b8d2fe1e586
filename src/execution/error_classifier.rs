//! # Block Failure Classification
//!
//! Decides whether a failure raised while opening or committing a block's transaction
//! is worth retrying. Errors from the operation itself are never retried.
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────────┐     ┌─────────────────┐
//! │  sqlx::Error    │────▶│ classify_sqlx_error │────▶│ ErrorCategory   │
//! │                 │     │ (+ SQLSTATE codes)  │     │ Transient/Fatal │
//! └─────────────────┘     └─────────────────────┘     └─────────────────┘
//! ```
//!
//! Transient failures are operational or connectivity problems: the socket went away,
//! the pool could not hand out a connection, the server is restarting, a deadlock or
//! serialization conflict forced a rollback. Everything else (constraint violations,
//! bad SQL, decode errors) is fatal: retrying the same block would fail the same way.

use crate::database::error_codes::PgErrorCode;
use serde::{Deserialize, Serialize};

/// Retry eligibility of a block failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// May succeed if the identical block is attempted again
    Transient,
    /// Will not succeed on retry; abandon the block and surface the error
    Fatal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Transient => write!(f, "Transient"),
            ErrorCategory::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Classify a sqlx error raised by a block's `BEGIN` or `COMMIT`
pub fn classify_sqlx_error(err: &sqlx::Error) -> ErrorCategory {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => ErrorCategory::Transient,
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => classify_sqlstate(&code),
            None => ErrorCategory::Fatal,
        },
        _ => ErrorCategory::Fatal,
    }
}

/// The connection that raised `err` can no longer be used and must be replaced
///
/// Narrower than [`ErrorCategory::Transient`]: a deadlock is transient but leaves the
/// connection healthy, while a reset socket or a terminated backend does not.
pub fn is_connection_loss(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| {
            PgErrorCode::is_connection_exception(&code) || PgErrorCode::is_server_unavailable(&code)
        }),
        _ => false,
    }
}

/// Classify a raw SQLSTATE code
pub fn classify_sqlstate(code: &str) -> ErrorCategory {
    if PgErrorCode::is_operational(code) {
        ErrorCategory::Transient
    } else {
        ErrorCategory::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_errors_are_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        assert_eq!(
            classify_sqlx_error(&sqlx::Error::Io(io)),
            ErrorCategory::Transient
        );
        assert_eq!(
            classify_sqlx_error(&sqlx::Error::PoolTimedOut),
            ErrorCategory::Transient
        );
        assert_eq!(
            classify_sqlx_error(&sqlx::Error::PoolClosed),
            ErrorCategory::Transient
        );
        assert_eq!(
            classify_sqlx_error(&sqlx::Error::Protocol("unexpected message".to_string())),
            ErrorCategory::Transient
        );
    }

    #[test]
    fn test_programming_errors_are_fatal() {
        assert_eq!(
            classify_sqlx_error(&sqlx::Error::RowNotFound),
            ErrorCategory::Fatal
        );
        assert_eq!(
            classify_sqlx_error(&sqlx::Error::ColumnNotFound("missing".to_string())),
            ErrorCategory::Fatal
        );
    }

    #[test]
    fn test_sqlstate_classification() {
        assert_eq!(classify_sqlstate("40P01"), ErrorCategory::Transient);
        assert_eq!(classify_sqlstate("08006"), ErrorCategory::Transient);
        assert_eq!(classify_sqlstate("23505"), ErrorCategory::Fatal);
        assert_eq!(classify_sqlstate("42P01"), ErrorCategory::Fatal);
    }

    #[test]
    fn test_connection_loss_is_narrower_than_transient() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(is_connection_loss(&sqlx::Error::Io(reset)));
        assert!(is_connection_loss(&sqlx::Error::Protocol(
            "unexpected end of stream".to_string()
        )));
        // the pool, not the held connection, failed
        assert!(!is_connection_loss(&sqlx::Error::PoolTimedOut));
        assert!(!is_connection_loss(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Transient.to_string(), "Transient");
        assert_eq!(ErrorCategory::Fatal.to_string(), "Fatal");
    }
}
