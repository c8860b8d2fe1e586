//! PostgreSQL Error Codes
//!
//! SQLSTATE constants used to decide whether a failed block can be retried.
//!
//! ## SQLSTATE Format
//!
//! - 5-character codes representing error classes and conditions
//! - First 2 characters: error class
//! - Last 3 characters: specific condition
//!
//! ## Reference
//!
//! Full list: <https://www.postgresql.org/docs/current/errcodes-appendix.html>

/// PostgreSQL SQLSTATE error codes
///
/// Only codes the executor acts on are included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PgErrorCode;

impl PgErrorCode {
    // =========================================================================
    // Class 08 — Connection Exception
    // =========================================================================

    /// Connection exception class prefix - Class 08
    ///
    /// Covers connection failures, rejected connections and protocol violations
    /// detected by the server.
    pub const CONNECTION_EXCEPTION_CLASS: &'static str = "08";

    // =========================================================================
    // Class 40 — Transaction Rollback
    // =========================================================================

    /// Serialization failure - Code 40001
    ///
    /// Occurs in SERIALIZABLE isolation level when a transaction cannot be
    /// serialized with concurrent transactions. Should be retried.
    pub const SERIALIZATION_FAILURE: &'static str = "40001";

    /// Deadlock detected - Code 40P01
    ///
    /// Two workers touching overlapping rows through secondary effects can
    /// deadlock; one transaction is rolled back to break it.
    pub const DEADLOCK_DETECTED: &'static str = "40P01";

    // =========================================================================
    // Class 53 — Insufficient Resources
    // =========================================================================

    /// Insufficient resources class prefix - Class 53
    ///
    /// Disk full, out of memory, too many connections.
    pub const INSUFFICIENT_RESOURCES_CLASS: &'static str = "53";

    // =========================================================================
    // Class 55 — Object Not In Prerequisite State
    // =========================================================================

    /// Lock not available - Code 55P03
    ///
    /// Raised by `NOWAIT` locks and `lock_timeout`.
    pub const LOCK_NOT_AVAILABLE: &'static str = "55P03";

    // =========================================================================
    // Class 57 — Operator Intervention
    // =========================================================================

    /// Query canceled - Code 57014
    ///
    /// Occurs when a query is canceled by user request or `statement_timeout`.
    pub const QUERY_CANCELED: &'static str = "57014";

    /// Admin shutdown - Code 57P01
    pub const ADMIN_SHUTDOWN: &'static str = "57P01";

    /// Crash shutdown - Code 57P02
    pub const CRASH_SHUTDOWN: &'static str = "57P02";

    /// Cannot connect now - Code 57P03
    ///
    /// Server is starting up or in recovery.
    pub const CANNOT_CONNECT_NOW: &'static str = "57P03";

    // =========================================================================
    // Helper Methods
    // =========================================================================

    /// Check if the error is retryable at the transaction level (serialization failure or deadlock)
    #[inline]
    pub fn is_retryable_transaction_error(code: &str) -> bool {
        code == Self::SERIALIZATION_FAILURE || code == Self::DEADLOCK_DETECTED
    }

    /// Check if the error code belongs to the connection exception class
    #[inline]
    pub fn is_connection_exception(code: &str) -> bool {
        code.starts_with(Self::CONNECTION_EXCEPTION_CLASS)
    }

    /// Check if the server is shutting down, restarting, or refusing connections
    #[inline]
    pub fn is_server_unavailable(code: &str) -> bool {
        matches!(
            code,
            Self::ADMIN_SHUTDOWN | Self::CRASH_SHUTDOWN | Self::CANNOT_CONNECT_NOW
        )
    }

    /// Check if the code describes an operational condition that usually clears up on its own
    ///
    /// This is the SQLSTATE half of transient classification: connection
    /// exceptions, transaction rollbacks forced by concurrency, resource
    /// exhaustion, lock timeouts, statement timeouts and server restarts.
    pub fn is_operational(code: &str) -> bool {
        Self::is_connection_exception(code)
            || Self::is_retryable_transaction_error(code)
            || code.starts_with(Self::INSUFFICIENT_RESOURCES_CLASS)
            || code == Self::LOCK_NOT_AVAILABLE
            || code == Self::QUERY_CANCELED
            || Self::is_server_unavailable(code)
    }
}
