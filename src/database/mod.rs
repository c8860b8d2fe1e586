//! # Database Operations
//!
//! PostgreSQL adapters for the range executor, built on SQLx.
//!
//! ## Key Components
//!
//! - [`connection`] - pooled connection, health check and key listing
//! - [`session`] - one dedicated connection per worker with explicit transaction control
//! - [`statement_operation`] - runs a parameterized statement against each block
//! - [`error_codes`] - SQLSTATE constants used to classify failures
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use rangeflow_core::config::DatabaseConfig;
//! use rangeflow_core::database::{DatabaseConnection, SqlStatementOperation};
//! use rangeflow_core::execution::{ExecutionCoordinator, TargetEntity};
//! use rangeflow_core::config::ExecutionConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::connect(&DatabaseConfig::default()).await?;
//! let entity = TargetEntity::new("accounts", "id")?;
//! let keys = db.load_keys(&entity).await?;
//!
//! let coordinator =
//!     ExecutionCoordinator::new(keys, entity, db.session_factory(), ExecutionConfig::default());
//! let operation = SqlStatementOperation::new(
//!     "UPDATE accounts SET archived = true WHERE id >= $1 AND id < $2",
//! )?;
//! coordinator.dispatch(Arc::new(operation))?;
//! let result = coordinator.join().await;
//! println!("{:?}", result.summary());
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error_codes;
pub mod session;
pub mod statement_operation;

pub use connection::DatabaseConnection;
pub use error_codes::PgErrorCode;
pub use session::{PgSession, PgSessionFactory};
pub use statement_operation::SqlStatementOperation;
