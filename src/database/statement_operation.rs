//! A [`BlockOperation`] that runs one parameterized SQL statement per block.
//!
//! The statement receives the block's inclusive lower bound as `$1` and exclusive
//! upper bound as `$2`, e.g.
//!
//! ```sql
//! UPDATE accounts SET archived = true WHERE id >= $1 AND id < $2
//! ```

use crate::database::session::PgSession;
use crate::error::{BlockResult, RangeflowError, Result};
use crate::execution::operation::BlockOperation;
use crate::execution::target::BlockSelection;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug)]
pub struct SqlStatementOperation {
    statement: String,
    rows_affected: AtomicU64,
}

impl SqlStatementOperation {
    /// Rejects statements that do not reference both `$1` and `$2`
    pub fn new(statement: impl Into<String>) -> Result<Self> {
        let statement = statement.into();
        if statement.trim().is_empty() {
            return Err(RangeflowError::ValidationError(
                "statement must not be empty".to_string(),
            ));
        }
        for placeholder in ["$1", "$2"] {
            if !statement.contains(placeholder) {
                return Err(RangeflowError::ValidationError(format!(
                    "statement must bind the block bounds as $1 and $2, missing {placeholder}"
                )));
            }
        }
        Ok(Self {
            statement,
            rows_affected: AtomicU64::new(0),
        })
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Rows affected across all attempts, including ones later rolled back
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BlockOperation<PgSession> for SqlStatementOperation {
    async fn execute(&self, session: &mut PgSession, selection: &BlockSelection) -> BlockResult<()> {
        let (low, high) = selection.bounds();
        let result = sqlx::query(&self.statement)
            .bind(low)
            .bind(high)
            .execute(session.connection())
            .await?;

        self.rows_affected
            .fetch_add(result.rows_affected(), Ordering::Relaxed);
        debug!(
            block = %selection.range(),
            rows = result.rows_affected(),
            "Statement applied"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "sql_statement"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_requires_both_bounds() {
        assert!(SqlStatementOperation::new(
            "UPDATE accounts SET archived = true WHERE id >= $1 AND id < $2"
        )
        .is_ok());

        let missing_upper = SqlStatementOperation::new("DELETE FROM accounts WHERE id >= $1");
        assert!(matches!(
            missing_upper,
            Err(RangeflowError::ValidationError(msg)) if msg.contains("$2")
        ));

        assert!(SqlStatementOperation::new("   ").is_err());
    }

    #[test]
    fn test_rows_affected_starts_at_zero() {
        let op = SqlStatementOperation::new("DELETE FROM t WHERE id >= $1 AND id < $2").unwrap();
        assert_eq!(op.rows_affected(), 0);
        assert_eq!(op.name(), "sql_statement");
    }
}
