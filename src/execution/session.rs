//! Session seams between the executor and the database.
//!
//! A [`SessionFactory`] is consumed, not implemented, by the executor: each worker calls
//! it exactly once and keeps the resulting [`BlockSession`] to itself for the whole
//! partition. The Postgres implementations live in [`crate::database::session`].

use crate::error::{BlockResult, Result};
use async_trait::async_trait;

/// One dedicated database session, owned by exactly one worker
///
/// Transaction control belongs to the block executor alone: operations run between
/// `begin` and `commit`/`rollback` and must never commit or roll back themselves.
#[async_trait]
pub trait BlockSession: Send + 'static {
    /// Open the transaction for one block attempt
    async fn begin(&mut self) -> BlockResult<()>;

    /// Commit the current block's transaction
    async fn commit(&mut self) -> BlockResult<()>;

    /// Discard everything done since `begin`
    async fn rollback(&mut self) -> BlockResult<()>;

    /// Release the session once the worker has exhausted its partition
    async fn close(self) -> Result<()>;
}

/// Produces a fresh, ready-to-use session per worker
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    type Session: BlockSession;

    async fn create_session(&self) -> Result<Self::Session>;

    /// Most sessions that can be open at once, when the backend has a limit
    ///
    /// The coordinator never starts more workers than this, since a worker holds its
    /// session for its whole partition.
    fn max_sessions(&self) -> Option<usize> {
        None
    }
}
