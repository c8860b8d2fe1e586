#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Rangeflow Core
//!
//! Parallel, range-partitioned batch execution over the rows of a PostgreSQL table.
//!
//! ## Overview
//!
//! A run takes the full set of integer keys of a table, splits the key space into one
//! contiguous partition per available worker, and has each worker walk its partition in
//! fixed-size blocks. Every block is committed in its own transaction, transient
//! failures are retried a bounded number of times, and a single lock-free counter
//! tracks committed blocks against the expected total.
//!
//! ## Module Organization
//!
//! - [`execution`] - partitioning, block retry, workers, coordinator and progress
//! - [`database`] - SQLx-backed sessions, key listing and statement operations
//! - [`config`] - layered configuration
//! - [`error`] - run-level and block-level error types
//! - [`logging`] - structured logging setup
//! - [`constants`] - defaults and status enums
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rangeflow_core::config::ConfigManager;
//! use rangeflow_core::database::{DatabaseConnection, SqlStatementOperation};
//! use rangeflow_core::execution::{ExecutionCoordinator, TargetEntity};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let db = DatabaseConnection::connect(&manager.config().database).await?;
//!
//! let entity = TargetEntity::new("events", "id")?;
//! let keys = db.load_keys(&entity).await?;
//! let coordinator = ExecutionCoordinator::new(
//!     keys,
//!     entity,
//!     db.session_factory(),
//!     manager.config().execution.clone(),
//! );
//!
//! let operation = SqlStatementOperation::new("DELETE FROM events WHERE id >= $1 AND id < $2")?;
//! coordinator.dispatch(Arc::new(operation))?;
//! let summary = coordinator.join().await.summary();
//! assert!(summary.is_complete());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod execution;
pub mod logging;

pub use config::{
    ConfigManager, ConfigurationError, DatabaseConfig, ExecutionConfig, LoggingConfig,
    RangeflowConfig,
};
pub use constants::{system, BlockStatus, WorkerStatus};
pub use database::{DatabaseConnection, PgSession, PgSessionFactory, SqlStatementOperation};
pub use error::{BlockError, BlockResult, RangeflowError, Result};
pub use execution::{
    BlockOperation, BlockOutcome, BlockRetryExecutor, BlockSelection, BlockSession,
    ExecutionCoordinator, JoinResult, KeyRange, ProgressCounter, ProgressSnapshot, RangeWorker,
    RunSummary, SessionFactory, TargetEntity, WorkerOutcome, WorkerReport,
};
