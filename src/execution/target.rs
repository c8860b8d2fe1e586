//! Target table description and per-block row selection.

use crate::error::{RangeflowError, Result};
use crate::execution::key_range::KeyRange;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identifies the table being processed and its integer key column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEntity {
    table: String,
    key_column: String,
}

impl TargetEntity {
    /// `table` may carry a single `schema.` prefix; both names are validated
    pub fn new(table: impl Into<String>, key_column: impl Into<String>) -> Result<Self> {
        let table = table.into();
        let key_column = key_column.into();

        let mut parts = table.split('.');
        let valid_table = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) => is_identifier(name),
            (Some(schema), Some(name), None) => is_identifier(schema) && is_identifier(name),
            _ => false,
        };
        if !valid_table {
            return Err(RangeflowError::ValidationError(format!(
                "invalid table name '{table}'"
            )));
        }
        if !is_identifier(&key_column) {
            return Err(RangeflowError::ValidationError(format!(
                "invalid key column '{key_column}'"
            )));
        }

        Ok(Self { table, key_column })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Quoted, schema-qualified table name
    pub fn quoted_table(&self) -> String {
        self.table
            .split('.')
            .map(quote_identifier)
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn quoted_key_column(&self) -> String {
        quote_identifier(&self.key_column)
    }

    /// Query returning every key of the table in ascending order, widened to `bigint`
    pub fn key_listing_statement(&self) -> String {
        format!(
            "SELECT {key}::bigint FROM {table} ORDER BY {key}",
            key = self.quoted_key_column(),
            table = self.quoted_table()
        )
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

/// The rows of one block: the target entity restricted to a key range
///
/// Operations receive this instead of a pre-built query so they can select, update
/// or delete with the same half-open predicate. `$1` binds the inclusive lower bound
/// and `$2` the exclusive upper bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSelection {
    entity: Arc<TargetEntity>,
    range: KeyRange,
}

impl BlockSelection {
    pub fn new(entity: Arc<TargetEntity>, range: KeyRange) -> Self {
        Self { entity, range }
    }

    pub fn entity(&self) -> &TargetEntity {
        &self.entity
    }

    pub fn range(&self) -> KeyRange {
        self.range
    }

    /// `(lower, upper)` values for `$1` and `$2`
    pub fn bounds(&self) -> (i64, i64) {
        (self.range.min(), self.range.max())
    }

    /// `"key" >= $1 AND "key" < $2`
    pub fn predicate(&self) -> String {
        let key = self.entity.quoted_key_column();
        format!("{key} >= $1 AND {key} < $2")
    }

    /// Full `SELECT *` over the block, ordered by key
    pub fn select_statement(&self) -> String {
        format!(
            "SELECT * FROM {} WHERE {} ORDER BY {}",
            self.entity.quoted_table(),
            self.predicate(),
            self.entity.quoted_key_column()
        )
    }

    /// Keys present in the block, ascending, widened to `bigint`
    pub fn key_select_statement(&self) -> String {
        let key = self.entity.quoted_key_column();
        format!(
            "SELECT {key}::bigint FROM {} WHERE {} ORDER BY {key}",
            self.entity.quoted_table(),
            self.predicate()
        )
    }
}
