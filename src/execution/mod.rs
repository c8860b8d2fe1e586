//! # Range-Partitioned Execution
//!
//! Splits a table's integer key space into contiguous half-open ranges, hands each
//! range to its own worker, and commits the rows of each range in fixed-size blocks.
//!
//! ## Components
//!
//! - [`key_range`] - half-open [`KeyRange`] values, block iteration and partitioning
//! - [`progress`] - lock-free committed-block counter shared by all workers
//! - [`block_executor`] - one block, one transaction, bounded transient retries
//! - [`range_worker`] - drives one partition through its blocks on a dedicated session
//! - [`coordinator`] - partitions keys, spawns workers and joins their outcomes
//! - [`session`] / [`operation`] - the seams callers plug a database and a row operation into
//! - [`error_classifier`] - transient versus fatal classification of database errors

pub mod block_executor;
pub mod coordinator;
pub mod error_classifier;
pub mod key_range;
pub mod operation;
pub mod progress;
pub mod range_worker;
pub mod session;
pub mod target;

pub use block_executor::{BlockOutcome, BlockRetryExecutor, WorkerContext};
pub use coordinator::{ExecutionCoordinator, JoinResult, RunSummary, WorkerOutcome};
pub use error_classifier::{
    classify_sqlstate, classify_sqlx_error, is_connection_loss, ErrorCategory,
};
pub use key_range::{partition_keys, prepare_keys, total_block_count, BlockIter, KeyRange};
pub use operation::BlockOperation;
pub use progress::{ProgressCounter, ProgressSnapshot};
pub use range_worker::{BlockFailure, ExecutionTask, RangeWorker, WorkerReport};
pub use session::{BlockSession, SessionFactory};
pub use target::{BlockSelection, TargetEntity};
