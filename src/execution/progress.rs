//! # Progress Counter
//!
//! The one piece of state shared by every worker in a run. Workers hold an
//! `Arc<ProgressCounter>` handed to them at dispatch time and bump it once per
//! committed block; callers poll [`ProgressCounter::percentile`] for display.
//!
//! `total` follows a single-writer discipline: the coordinator sets it before any
//! worker starts and resets it after all workers have joined.

use crate::constants::execution::DEFAULT_PROGRESS_INITIAL;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Count of committed blocks against the expected block total
#[derive(Debug)]
pub struct ProgressCounter {
    value: AtomicU64,
    total: AtomicU64,
    initial: u64,
}

/// Point-in-time view of a [`ProgressCounter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub value: u64,
    pub total: u64,
    pub percentile: u8,
}

impl ProgressCounter {
    pub fn new(initial: u64) -> Self {
        Self {
            value: AtomicU64::new(initial),
            total: AtomicU64::new(0),
            initial,
        }
    }

    /// Record one committed block
    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::AcqRel);
    }

    /// Current count; advisory while workers are running
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    pub fn initial(&self) -> u64 {
        self.initial
    }

    /// Set the denominator; call before any worker starts incrementing
    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Release);
    }

    /// `floor(value / total * 100)`, or 0 while no total is set
    ///
    /// The total counts every block the workers will run, so a run reaches 100 only
    /// when every block committed. The cap guards a counter shared across runs or
    /// started from a non-zero `initial`.
    pub fn percentile(&self) -> u8 {
        Self::compute_percentile(self.value(), self.total())
    }

    /// Restore `value` to `initial` and clear `total`; call only after all workers have joined
    pub fn reset(&self) {
        self.value.store(self.initial, Ordering::Release);
        self.total.store(0, Ordering::Release);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let value = self.value();
        let total = self.total();
        ProgressSnapshot {
            value,
            total,
            percentile: Self::compute_percentile(value, total),
        }
    }

    fn compute_percentile(value: u64, total: u64) -> u8 {
        if total == 0 {
            return 0;
        }
        let percent = (u128::from(value) * 100) / u128::from(total);
        percent.min(100) as u8
    }
}

impl Default for ProgressCounter {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INITIAL)
    }
}
