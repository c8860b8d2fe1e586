//! # Block Retry Executor
//!
//! Runs one block through the caller's operation inside its own transaction and
//! commits it, retrying transient transaction failures up to a bounded budget.
//!
//! ## Protocol
//!
//! ```text
//! attempt += 1
//! begin ─▶ operation(session, block) ─▶ commit ─▶ progress += 1 ─▶ Committed
//!   │              │                      │
//!   │          any error ─▶ fatal         │
//!   └──────────────┴──── error ───────────┘
//!                        │
//!                     rollback
//!                        │
//!          fatal ◀───────┼───────▶ transient
//!            │                        │
//!       Err(BlockError)    attempt <= budget ? retry : Exhausted
//! ```
//!
//! Only `begin` and `commit` failures are classified. An error from the operation
//! itself is always fatal for the block, whatever its category.
//!
//! A block is never partially committed: every failed attempt is rolled back before
//! the executor retries or gives up, and the progress counter moves exactly once per
//! committed block no matter how many attempts it took.

use crate::constants::execution::DEFAULT_BLOCK_RETRY_LIMIT;
use crate::constants::BlockStatus;
use crate::error::{BlockError, BlockResult};
use crate::execution::operation::BlockOperation;
use crate::execution::progress::ProgressCounter;
use crate::execution::session::BlockSession;
use crate::execution::target::BlockSelection;
use crate::logging::log_block_operation;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A worker's session bound to the operation it applies
///
/// Built once per worker and handed to the block executor for every block, so the
/// session is never shared with another worker.
pub struct WorkerContext<S, O> {
    session: S,
    operation: Arc<O>,
}

impl<S, O> WorkerContext<S, O>
where
    S: BlockSession,
    O: BlockOperation<S>,
{
    pub fn new(session: S, operation: Arc<O>) -> Self {
        Self { session, operation }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn operation(&self) -> &O {
        &self.operation
    }

    /// Give the session back so the worker can close it
    pub fn into_session(self) -> S {
        self.session
    }
}

/// How a block finished when it did not fail fatally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Committed after `attempts` tries
    Committed { attempts: u32 },
    /// Every attempt failed transiently; nothing was committed
    Exhausted { attempts: u32, last_error: BlockError },
}

impl BlockOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, BlockOutcome::Committed { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            BlockOutcome::Committed { attempts } | BlockOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Executes blocks with bounded retry and reports commits to the shared progress counter
#[derive(Debug, Clone)]
pub struct BlockRetryExecutor {
    worker_id: usize,
    retry_limit: u32,
    progress: Arc<ProgressCounter>,
}

impl BlockRetryExecutor {
    /// Executor with the default retry budget
    pub fn new(worker_id: usize, progress: Arc<ProgressCounter>) -> Self {
        Self::with_retry_limit(worker_id, DEFAULT_BLOCK_RETRY_LIMIT, progress)
    }

    /// `retry_limit` is the number of retries after the first attempt
    pub fn with_retry_limit(
        worker_id: usize,
        retry_limit: u32,
        progress: Arc<ProgressCounter>,
    ) -> Self {
        Self {
            worker_id,
            retry_limit,
            progress,
        }
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Run one block to commit, exhaustion, or fatal failure
    ///
    /// Exhaustion is not an error: the block is reported as
    /// [`BlockOutcome::Exhausted`] and the caller decides whether to carry on. Fatal
    /// failures are returned as `Err` after the transaction has been rolled back.
    pub async fn execute<S, O>(
        &self,
        context: &mut WorkerContext<S, O>,
        selection: &BlockSelection,
    ) -> BlockResult<BlockOutcome>
    where
        S: BlockSession,
        O: BlockOperation<S>,
    {
        let block = selection.range();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let failure = match self.attempt(context, selection).await {
                Ok(()) => {
                    self.progress.increment();
                    log_block_operation(
                        self.worker_id,
                        block,
                        attempts,
                        &BlockStatus::Committed.to_string(),
                        None,
                    );
                    debug!(
                        worker_id = self.worker_id,
                        block = %block,
                        percentile = self.progress.percentile(),
                        "📈 PROGRESS: {}%",
                        self.progress.percentile()
                    );
                    return Ok(BlockOutcome::Committed { attempts });
                }
                Err(failure) => failure,
            };

            self.rollback(context, selection).await;

            if !failure.is_transient() {
                error!(
                    worker_id = self.worker_id,
                    block = %block,
                    attempt = attempts,
                    operation = context.operation().name(),
                    error = %failure,
                    "❌ BLOCK: Fatal failure, abandoning block"
                );
                log_block_operation(
                    self.worker_id,
                    block,
                    attempts,
                    &BlockStatus::Failed.to_string(),
                    Some(failure.message()),
                );
                return Err(failure);
            }

            if attempts > self.retry_limit {
                warn!(
                    worker_id = self.worker_id,
                    block = %block,
                    attempts = attempts,
                    retry_limit = self.retry_limit,
                    error = %failure,
                    "⚠️ BLOCK: Retry budget exhausted, block left uncommitted"
                );
                log_block_operation(
                    self.worker_id,
                    block,
                    attempts,
                    &BlockStatus::Exhausted.to_string(),
                    Some(failure.message()),
                );
                return Ok(BlockOutcome::Exhausted {
                    attempts,
                    last_error: failure,
                });
            }

            warn!(
                worker_id = self.worker_id,
                block = %block,
                attempt = attempts,
                retry_limit = self.retry_limit,
                error = %failure,
                "🔁 BLOCK: Transient failure, retrying"
            );
            log_block_operation(
                self.worker_id,
                block,
                attempts,
                &BlockStatus::RetryScheduled.to_string(),
                Some(failure.message()),
            );
        }
    }

    async fn attempt<S, O>(
        &self,
        context: &mut WorkerContext<S, O>,
        selection: &BlockSelection,
    ) -> BlockResult<()>
    where
        S: BlockSession,
        O: BlockOperation<S>,
    {
        let WorkerContext { session, operation } = context;
        session.begin().await?;
        operation
            .execute(session, selection)
            .await
            .map_err(BlockError::into_fatal)?;
        session.commit().await
    }

    /// A failed rollback does not change how the original failure is classified
    async fn rollback<S, O>(&self, context: &mut WorkerContext<S, O>, selection: &BlockSelection)
    where
        S: BlockSession,
        O: BlockOperation<S>,
    {
        if let Err(rollback_error) = context.session.rollback().await {
            warn!(
                worker_id = self.worker_id,
                block = %selection.range(),
                error = %rollback_error,
                "⚠️ BLOCK: Rollback failed"
            );
        }
    }
}
