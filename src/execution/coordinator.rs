//! # Execution Coordinator
//!
//! Entry point for a run. The coordinator sorts the key set, cuts it into one
//! partition per available worker, sets the number of blocks those partitions hold as
//! the total on the shared [`ProgressCounter`] and spawns a [`RangeWorker`] for each. [`ExecutionCoordinator::join`]
//! waits for every worker, captures the final progress, resets the counter and
//! returns one [`WorkerOutcome`] per worker.
//!
//! ```text
//! keys ──▶ sort/dedup ──▶ partition_keys(P) ──▶ set_total(Σ partition blocks)
//!                                                        │
//!                         ┌──────────────┬───────────────┼──────────────┐
//!                         ▼              ▼               ▼              ▼
//!                     worker 0       worker 1   ...  worker P-1    (tokio tasks)
//!                         │              │               │
//!                         └──── progress.increment() per committed block
//!                                                        │
//! join() ◀──────────────────── outcomes ─────────────────┘
//! ```

use crate::config::ExecutionConfig;
use crate::error::{RangeflowError, Result};
use crate::execution::key_range::{partition_keys, prepare_keys, total_block_count, KeyRange};
use crate::execution::operation::BlockOperation;
use crate::execution::progress::{ProgressCounter, ProgressSnapshot};
use crate::execution::range_worker::{ExecutionTask, RangeWorker, WorkerReport};
use crate::execution::session::SessionFactory;
use crate::execution::target::TargetEntity;
use crate::logging::log_error;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Result of one worker, as seen by the coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerOutcome {
    pub worker_id: usize,
    pub partition: KeyRange,
    pub result: Result<WorkerReport>,
}

impl WorkerOutcome {
    /// The worker could not run, panicked, or abandoned a block on a fatal error
    pub fn is_failed(&self) -> bool {
        match &self.result {
            Ok(report) => !report.failed_blocks.is_empty(),
            Err(_) => true,
        }
    }

    pub fn report(&self) -> Option<&WorkerReport> {
        self.result.as_ref().ok()
    }
}

/// Everything `join` learned about a run
#[derive(Debug, Clone, PartialEq)]
pub struct JoinResult {
    pub run_id: Option<Uuid>,
    pub outcomes: Vec<WorkerOutcome>,
    /// Progress captured just before the counter was reset
    pub final_progress: ProgressSnapshot,
}

impl JoinResult {
    fn empty() -> Self {
        Self {
            run_id: None,
            outcomes: Vec::new(),
            final_progress: ProgressSnapshot {
                value: 0,
                total: 0,
                percentile: 0,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_outcomes(&self.outcomes, self.final_progress)
    }
}

/// Aggregate view of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub workers: usize,
    pub blocks_total: u64,
    pub blocks_committed: u64,
    pub exhausted_blocks: Vec<KeyRange>,
    pub failed_blocks: usize,
    pub skipped_blocks: u64,
    pub failed_workers: Vec<usize>,
    pub cancelled_workers: Vec<usize>,
    pub final_progress: ProgressSnapshot,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[WorkerOutcome], final_progress: ProgressSnapshot) -> Self {
        let mut summary = Self {
            workers: outcomes.len(),
            blocks_total: 0,
            blocks_committed: 0,
            exhausted_blocks: Vec::new(),
            failed_blocks: 0,
            skipped_blocks: 0,
            failed_workers: Vec::new(),
            cancelled_workers: Vec::new(),
            final_progress,
        };

        for outcome in outcomes {
            if outcome.is_failed() {
                summary.failed_workers.push(outcome.worker_id);
            }
            if let Some(report) = outcome.report() {
                summary.blocks_total += report.blocks_total;
                summary.blocks_committed += report.blocks_committed;
                summary
                    .exhausted_blocks
                    .extend(report.exhausted_blocks.iter().copied());
                summary.failed_blocks += report.failed_blocks.len();
                summary.skipped_blocks += report.skipped_blocks;
                if report.cancelled {
                    summary.cancelled_workers.push(outcome.worker_id);
                }
            }
        }

        summary
    }

    /// Every worker ran to the end and every block committed
    pub fn is_complete(&self) -> bool {
        self.failed_workers.is_empty()
            && self.cancelled_workers.is_empty()
            && self.exhausted_blocks.is_empty()
            && self.blocks_committed == self.blocks_total
    }
}

struct PendingWorker {
    worker_id: usize,
    partition: KeyRange,
    handle: JoinHandle<Result<WorkerReport>>,
    joined: bool,
}

struct ActiveRun {
    run_id: Uuid,
    workers: Vec<PendingWorker>,
}

/// Puts workers not yet joined back into the coordinator if `join` is dropped early
struct RunGuard<'a> {
    slot: &'a Mutex<Option<ActiveRun>>,
    run: Option<ActiveRun>,
}

impl RunGuard<'_> {
    fn workers_mut(&mut self) -> &mut [PendingWorker] {
        match self.run.as_mut() {
            Some(run) => &mut run.workers,
            None => &mut [],
        }
    }

    /// Every worker was collected; nothing to put back
    fn disarm(mut self) {
        self.run = None;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let Some(mut run) = self.run.take() else {
            return;
        };
        run.workers.retain(|pending| !pending.joined);
        if run.workers.is_empty() {
            return;
        }
        warn!(
            run_id = %run.run_id,
            pending = run.workers.len(),
            "⚠️ COORDINATOR: Join abandoned, workers kept for the next join"
        );
        *self.slot.lock() = Some(run);
    }
}

/// Partitions a key set across parallel workers and collects their outcomes
pub struct ExecutionCoordinator<F: SessionFactory> {
    keys: Vec<i64>,
    entity: Arc<TargetEntity>,
    session_factory: Arc<F>,
    settings: ExecutionConfig,
    progress: Arc<ProgressCounter>,
    cancel: Mutex<CancellationToken>,
    active: Mutex<Option<ActiveRun>>,
}

impl<F: SessionFactory> ExecutionCoordinator<F> {
    /// Keys need not be sorted or contiguous; they are sorted and de-duplicated here
    pub fn new(
        keys: Vec<i64>,
        entity: TargetEntity,
        session_factory: F,
        settings: ExecutionConfig,
    ) -> Self {
        Self {
            keys: prepare_keys(keys),
            entity: Arc::new(entity),
            session_factory: Arc::new(session_factory),
            settings,
            progress: Arc::new(ProgressCounter::default()),
            cancel: Mutex::new(CancellationToken::new()),
            active: Mutex::new(None),
        }
    }

    /// Share an externally owned progress counter with this coordinator's workers
    pub fn with_progress(mut self, progress: Arc<ProgressCounter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> Arc<ProgressCounter> {
        Arc::clone(&self.progress)
    }

    pub fn progress_snapshot(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    pub fn keys(&self) -> &[i64] {
        &self.keys
    }

    pub fn settings(&self) -> &ExecutionConfig {
        &self.settings
    }

    /// Partitions this coordinator would dispatch
    pub fn plan(&self) -> Result<Vec<KeyRange>> {
        partition_keys(&self.keys, self.worker_parallelism())
    }

    /// Configured parallelism, limited to the sessions the factory can hand out
    pub fn worker_parallelism(&self) -> usize {
        let requested = self.settings.effective_parallelism();
        match self.session_factory.max_sessions() {
            Some(limit) if requested > limit => {
                warn!(
                    requested = requested,
                    max_sessions = limit,
                    "⚠️ COORDINATOR: Parallelism exceeds available sessions, clamping"
                );
                limit.max(1)
            }
            _ => requested,
        }
    }

    /// Workers dispatched and not yet joined
    pub fn pending_workers(&self) -> usize {
        self.active
            .lock()
            .as_ref()
            .map_or(0, |run| run.workers.len())
    }

    /// Start one worker per partition; returns the number of workers spawned
    ///
    /// Must be called from within a Tokio runtime. An empty key set is rejected before
    /// anything is spawned, and a second dispatch is rejected until the first has been
    /// joined, since both would share the progress total.
    #[instrument(skip(self, operation), fields(keys = self.keys.len()))]
    pub fn dispatch<O>(&self, operation: Arc<O>) -> Result<usize>
    where
        O: BlockOperation<F::Session>,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            RangeflowError::ConfigurationError(format!("dispatch requires a Tokio runtime: {e}"))
        })?;

        let mut active = self.active.lock();
        if active.is_some() {
            return Err(RangeflowError::AlreadyDispatched);
        }

        if self.settings.block_size < 1 {
            return Err(RangeflowError::ValidationError(format!(
                "block size must be at least 1, got {}",
                self.settings.block_size
            )));
        }
        let parallelism = self.worker_parallelism();
        let partitions = partition_keys(&self.keys, parallelism)?;

        let total_blocks = total_block_count(&partitions, self.settings.block_size);
        self.progress.set_total(total_blocks);

        let cancel = {
            let mut token = self.cancel.lock();
            *token = CancellationToken::new();
            token.clone()
        };

        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            keys = self.keys.len(),
            partitions = partitions.len(),
            parallelism = parallelism,
            block_size = self.settings.block_size,
            total_blocks = total_blocks,
            table = self.entity.table(),
            "🚀 COORDINATOR: Dispatching workers"
        );

        let workers = partitions
            .into_iter()
            .enumerate()
            .map(|(worker_id, partition)| {
                let task = ExecutionTask {
                    partition,
                    entity: Arc::clone(&self.entity),
                    operation: Arc::clone(&operation),
                    session_factory: Arc::clone(&self.session_factory),
                    block_size: self.settings.block_size,
                    retry_limit: self.settings.worker_retry_limit,
                };
                let worker =
                    RangeWorker::new(worker_id, task, Arc::clone(&self.progress), cancel.clone());
                PendingWorker {
                    worker_id,
                    partition,
                    handle: runtime.spawn(worker.run()),
                    joined: false,
                }
            })
            .collect::<Vec<_>>();

        let spawned = workers.len();
        *active = Some(ActiveRun { run_id, workers });
        Ok(spawned)
    }

    /// Ask running workers to stop after their current block
    pub fn cancel(&self) {
        let token = self.cancel.lock();
        if !token.is_cancelled() {
            warn!("🛑 COORDINATOR: Cancellation requested");
            token.cancel();
        }
    }

    /// Wait for every dispatched worker, then reset the progress counter
    ///
    /// Returns an empty result immediately when nothing is in flight. If the returned
    /// future is dropped before it completes (a timeout, a `select!`), workers it had
    /// not yet collected stay with the coordinator and keep running. The next `join`
    /// waits for them and only then resets the counter. Outcomes already collected by
    /// the dropped future are lost.
    pub async fn join(&self) -> JoinResult {
        let Some(run) = self.active.lock().take() else {
            return JoinResult::empty();
        };
        let run_id = run.run_id;
        let mut guard = RunGuard {
            slot: &self.active,
            run: Some(run),
        };

        let handles = guard.workers_mut().iter_mut().map(|pending| async move {
            let result = match (&mut pending.handle).await {
                Ok(result) => result,
                Err(join_error) => Err(RangeflowError::WorkerPanicked {
                    worker_id: pending.worker_id,
                    reason: join_error.to_string(),
                }),
            };
            pending.joined = true;
            WorkerOutcome {
                worker_id: pending.worker_id,
                partition: pending.partition,
                result,
            }
        });
        let outcomes = futures::future::join_all(handles).await;
        guard.disarm();

        let final_progress = self.progress.snapshot();
        self.progress.reset();

        for outcome in outcomes.iter().filter(|o| o.is_failed()) {
            match &outcome.result {
                Err(e) => log_error(
                    "coordinator",
                    "join",
                    &e.to_string(),
                    Some(&format!(
                        "run {} worker {} partition {}",
                        run_id, outcome.worker_id, outcome.partition
                    )),
                ),
                Ok(report) => error!(
                    run_id = %run_id,
                    worker_id = outcome.worker_id,
                    partition = %outcome.partition,
                    failed_blocks = report.failed_blocks.len(),
                    "❌ COORDINATOR: Worker abandoned blocks on fatal errors"
                ),
            }
        }
        info!(
            run_id = %run_id,
            workers = outcomes.len(),
            committed = final_progress.value,
            total = final_progress.total,
            percentile = final_progress.percentile,
            "🏁 COORDINATOR: All workers joined"
        );

        JoinResult {
            run_id: Some(run_id),
            outcomes,
            final_progress,
        }
    }
}
