//! Postgres sessions for range workers.
//!
//! Each [`PgSession`] holds one pooled connection for the lifetime of a worker and
//! drives transactions with explicit `BEGIN`/`COMMIT`/`ROLLBACK` statements, so the
//! block executor stays in control of transaction boundaries while operations issue
//! statements on the same connection.
//!
//! When a statement fails because the connection itself is gone (reset socket,
//! terminated backend), the session marks it broken and swaps in a fresh connection
//! from the pool before the next `BEGIN`. The worker keeps the same session throughout.

use crate::error::{BlockError, BlockResult, RangeflowError, Result};
use crate::execution::error_classifier::is_connection_loss;
use crate::execution::session::{BlockSession, SessionFactory};
use crate::execution::target::BlockSelection;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgConnection;
use sqlx::{Executor, PgPool, Postgres};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PgSessionFactory {
    pool: PgPool,
}

impl PgSessionFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionFactory for PgSessionFactory {
    type Session = PgSession;

    async fn create_session(&self) -> Result<PgSession> {
        let connection = self
            .pool
            .acquire()
            .await
            .map_err(|e| RangeflowError::SessionError(e.to_string()))?;
        Ok(PgSession {
            pool: self.pool.clone(),
            connection,
            in_transaction: false,
            broken: false,
        })
    }

    fn max_sessions(&self) -> Option<usize> {
        Some(self.pool.options().get_max_connections() as usize)
    }
}

/// One dedicated pooled connection, replaced from the pool if it is lost
#[derive(Debug)]
pub struct PgSession {
    pool: PgPool,
    connection: PoolConnection<Postgres>,
    in_transaction: bool,
    broken: bool,
}

impl PgSession {
    /// Connection for operations to run statements on
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.connection
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// The held connection was lost and is replaced on the next `begin`
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Keys of the block that currently exist, ascending
    pub async fn fetch_block(&mut self, selection: &BlockSelection) -> BlockResult<Vec<i64>> {
        let (low, high) = selection.bounds();
        let keys: std::result::Result<Vec<i64>, sqlx::Error> =
            sqlx::query_scalar(&selection.key_select_statement())
                .bind(low)
                .bind(high)
                .fetch_all(&mut *self.connection)
                .await;
        keys.map_err(|e| self.note_failure(e))
    }

    async fn run(&mut self, statement: &'static str) -> BlockResult<()> {
        match (&mut *self.connection).execute(statement).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.note_failure(e)),
        }
    }

    fn note_failure(&mut self, err: sqlx::Error) -> BlockError {
        if is_connection_loss(&err) {
            self.broken = true;
        }
        err.into()
    }

    /// Swap the lost connection for a fresh one; an exhausted pool is a transient failure
    async fn reconnect(&mut self) -> BlockResult<()> {
        let fresh = self.pool.acquire().await?;
        let lost = std::mem::replace(&mut self.connection, fresh);
        // Detached so the pool never hands the dead socket out again
        drop(lost.detach());
        self.broken = false;
        self.in_transaction = false;
        warn!("🔌 SESSION: Replaced lost connection from the pool");
        Ok(())
    }
}

#[async_trait]
impl BlockSession for PgSession {
    async fn begin(&mut self) -> BlockResult<()> {
        if self.broken {
            self.reconnect().await?;
        }
        self.run("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> BlockResult<()> {
        // A failed COMMIT leaves no open transaction either way
        self.in_transaction = false;
        self.run("COMMIT").await
    }

    async fn rollback(&mut self) -> BlockResult<()> {
        self.in_transaction = false;
        // The server aborted the transaction along with the lost connection
        if self.broken {
            return Ok(());
        }
        self.run("ROLLBACK").await
    }

    async fn close(mut self) -> Result<()> {
        if self.broken {
            debug!("Detaching lost connection instead of returning it to the pool");
            drop(self.connection.detach());
            return Ok(());
        }
        if self.in_transaction {
            (&mut *self.connection).execute("ROLLBACK").await?;
        }
        // Dropping the PoolConnection returns it to the pool
        drop(self.connection);
        Ok(())
    }
}
