//! # Range Worker
//!
//! Owns one partition of the key space. A worker acquires its own session, walks its
//! partition block by block in ascending key order, and hands each block to a
//! [`BlockRetryExecutor`] using the worker retry budget.
//!
//! A block that exhausts its retries, or fails fatally, does not stop the worker: it
//! is recorded in the [`WorkerReport`] and the worker moves on to the next block. The
//! only things that end a worker early are failing to acquire a session and
//! cancellation, which is checked between blocks and never interrupts a block in
//! flight.

use crate::constants::WorkerStatus;
use crate::error::{RangeflowError, Result};
use crate::execution::block_executor::{BlockOutcome, BlockRetryExecutor, WorkerContext};
use crate::execution::key_range::KeyRange;
use crate::execution::operation::BlockOperation;
use crate::execution::progress::ProgressCounter;
use crate::execution::session::{BlockSession, SessionFactory};
use crate::execution::target::{BlockSelection, TargetEntity};
use crate::logging::log_worker_operation;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Everything one worker needs; built by the coordinator, one per partition
pub struct ExecutionTask<F, O> {
    pub partition: KeyRange,
    pub entity: Arc<TargetEntity>,
    pub operation: Arc<O>,
    pub session_factory: Arc<F>,
    pub block_size: i64,
    pub retry_limit: u32,
}

impl<F, O> Clone for ExecutionTask<F, O> {
    fn clone(&self) -> Self {
        Self {
            partition: self.partition,
            entity: Arc::clone(&self.entity),
            operation: Arc::clone(&self.operation),
            session_factory: Arc::clone(&self.session_factory),
            block_size: self.block_size,
            retry_limit: self.retry_limit,
        }
    }
}

/// A block abandoned after a fatal failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFailure {
    pub block: KeyRange,
    pub reason: String,
}

/// What a worker did with its partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub partition: KeyRange,
    pub blocks_total: u64,
    pub blocks_committed: u64,
    /// Blocks whose retry budget ran out; left uncommitted
    pub exhausted_blocks: Vec<KeyRange>,
    /// Blocks abandoned on a non-transient failure
    pub failed_blocks: Vec<BlockFailure>,
    /// Blocks never attempted because the run was cancelled
    pub skipped_blocks: u64,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl WorkerReport {
    fn new(worker_id: usize, partition: KeyRange, blocks_total: u64) -> Self {
        Self {
            worker_id,
            partition,
            blocks_total,
            blocks_committed: 0,
            exhausted_blocks: Vec::new(),
            failed_blocks: Vec::new(),
            skipped_blocks: 0,
            cancelled: false,
            elapsed_ms: 0,
        }
    }

    /// Every block of the partition committed
    pub fn is_complete(&self) -> bool {
        self.blocks_committed == self.blocks_total
    }

    pub fn status(&self) -> WorkerStatus {
        if !self.failed_blocks.is_empty() {
            WorkerStatus::Failed
        } else if self.cancelled {
            WorkerStatus::Cancelled
        } else if !self.exhausted_blocks.is_empty() {
            WorkerStatus::CompletedWithExhaustedBlocks
        } else {
            WorkerStatus::Completed
        }
    }
}

/// Drives one partition to completion
pub struct RangeWorker<F, O> {
    worker_id: usize,
    task: ExecutionTask<F, O>,
    progress: Arc<ProgressCounter>,
    cancel: CancellationToken,
}

impl<F, O> RangeWorker<F, O>
where
    F: SessionFactory,
    O: BlockOperation<F::Session>,
{
    pub fn new(
        worker_id: usize,
        task: ExecutionTask<F, O>,
        progress: Arc<ProgressCounter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            worker_id,
            task,
            progress,
            cancel,
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn partition(&self) -> KeyRange {
        self.task.partition
    }

    /// Process every block of the partition in ascending order
    ///
    /// Returns `Err` only when the worker could not start (no session, invalid
    /// block size). Per-block problems are reported in the [`WorkerReport`].
    #[instrument(skip(self), fields(worker_id = self.worker_id, partition = %self.task.partition))]
    pub async fn run(self) -> Result<WorkerReport> {
        let started = Instant::now();
        let partition = self.task.partition;
        let mut blocks = partition.blocks(self.task.block_size)?;
        let mut report = WorkerReport::new(
            self.worker_id,
            partition,
            partition.block_count(self.task.block_size),
        );

        log_worker_operation(
            self.worker_id,
            partition,
            &WorkerStatus::Started.to_string(),
            None,
        );

        let session = self
            .task
            .session_factory
            .create_session()
            .await
            .map_err(|e| {
                RangeflowError::SessionError(format!(
                    "worker {} could not acquire a session: {e}",
                    self.worker_id
                ))
            })?;
        let mut context = WorkerContext::new(session, Arc::clone(&self.task.operation));
        let executor = BlockRetryExecutor::with_retry_limit(
            self.worker_id,
            self.task.retry_limit,
            Arc::clone(&self.progress),
        );

        while let Some(block) = blocks.next() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                report.skipped_blocks = 1 + blocks.by_ref().count() as u64;
                info!(
                    worker_id = self.worker_id,
                    skipped_blocks = report.skipped_blocks,
                    "🛑 WORKER: Cancelled between blocks"
                );
                break;
            }

            let selection = BlockSelection::new(Arc::clone(&self.task.entity), block);
            match executor.execute(&mut context, &selection).await {
                Ok(BlockOutcome::Committed { .. }) => report.blocks_committed += 1,
                Ok(BlockOutcome::Exhausted { .. }) => report.exhausted_blocks.push(block),
                Err(failure) => report.failed_blocks.push(BlockFailure {
                    block,
                    reason: failure.to_string(),
                }),
            }
        }

        if let Err(e) = context.into_session().close().await {
            warn!(
                worker_id = self.worker_id,
                error = %e,
                "⚠️ WORKER: Failed to close session cleanly"
            );
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        let details = format!(
            "{}/{} blocks committed, {} exhausted, {} failed",
            report.blocks_committed,
            report.blocks_total,
            report.exhausted_blocks.len(),
            report.failed_blocks.len()
        );
        log_worker_operation(
            self.worker_id,
            partition,
            &report.status().to_string(),
            Some(&details),
        );

        Ok(report)
    }
}
