#![allow(dead_code)]

pub mod strategies;

use async_trait::async_trait;
use parking_lot::Mutex;
use rangeflow_core::error::{BlockError, BlockResult, RangeflowError, Result};
use rangeflow_core::execution::{
    BlockOperation, BlockSelection, BlockSession, KeyRange, SessionFactory, TargetEntity,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// What the fake database saw, shared by every session a factory hands out
#[derive(Debug, Default)]
pub struct MockDatabase {
    committed: Mutex<Vec<KeyRange>>,
    commit_failures: Mutex<HashMap<i64, VecDeque<BlockError>>>,
    commit_attempts: Mutex<HashMap<i64, u32>>,
    sessions_created: AtomicUsize,
    sessions_closed: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl MockDatabase {
    /// Commits tried for the block starting at `block_min`, failed ones included
    pub fn commit_attempts_for(&self, block_min: i64) -> u32 {
        self.commit_attempts
            .lock()
            .get(&block_min)
            .copied()
            .unwrap_or(0)
    }

    /// Committed blocks sorted by lower bound
    pub fn committed_blocks(&self) -> Vec<KeyRange> {
        let mut blocks = self.committed.lock().clone();
        blocks.sort_by_key(|b| b.min());
        blocks
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockSessionFactory {
    pub database: Arc<MockDatabase>,
    refuse_sessions: bool,
    max_sessions: Option<usize>,
}

impl MockSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose every `create_session` call fails
    pub fn refusing() -> Self {
        Self {
            refuse_sessions: true,
            ..Self::default()
        }
    }

    /// Factory backed by a pool of at most `limit` sessions
    pub fn with_max_sessions(mut self, limit: usize) -> Self {
        self.max_sessions = Some(limit);
        self
    }

    /// Fail the next `count` commits of the block starting at `block_min` transiently
    pub fn fail_commits(self, block_min: i64, count: usize) -> Self {
        self.fail_commits_with(
            block_min,
            (0..count).map(|i| BlockError::transient(format!("serialization failure #{i}"))),
        )
    }

    /// Fail the next commit of the block starting at `block_min` with a fatal error
    pub fn fail_commit_fatally(self, block_min: i64) -> Self {
        self.fail_commits_with(
            block_min,
            std::iter::once(BlockError::fatal("deferred constraint violated")),
        )
    }

    fn fail_commits_with(
        self,
        block_min: i64,
        errors: impl IntoIterator<Item = BlockError>,
    ) -> Self {
        self.database
            .commit_failures
            .lock()
            .entry(block_min)
            .or_default()
            .extend(errors);
        self
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    type Session = MockSession;

    async fn create_session(&self) -> Result<MockSession> {
        if self.refuse_sessions {
            return Err(RangeflowError::DatabaseError(
                "too many connections".to_string(),
            ));
        }
        self.database.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            database: Arc::clone(&self.database),
            staged: Vec::new(),
        })
    }

    fn max_sessions(&self) -> Option<usize> {
        self.max_sessions
    }
}

/// Stages blocks touched by the operation and publishes them on commit
#[derive(Debug)]
pub struct MockSession {
    database: Arc<MockDatabase>,
    staged: Vec<KeyRange>,
}

impl MockSession {
    pub fn stage(&mut self, block: KeyRange) {
        self.staged.push(block);
    }
}

#[async_trait]
impl BlockSession for MockSession {
    async fn begin(&mut self) -> BlockResult<()> {
        self.staged.clear();
        Ok(())
    }

    async fn commit(&mut self) -> BlockResult<()> {
        if let Some(block_min) = self.staged.first().map(KeyRange::min) {
            *self
                .database
                .commit_attempts
                .lock()
                .entry(block_min)
                .or_default() += 1;
            let scripted = self
                .database
                .commit_failures
                .lock()
                .get_mut(&block_min)
                .and_then(VecDeque::pop_front);
            if let Some(error) = scripted {
                return Err(error);
            }
        }
        self.database.committed.lock().append(&mut self.staged);
        Ok(())
    }

    async fn rollback(&mut self) -> BlockResult<()> {
        self.staged.clear();
        self.database.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.database.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Operation with per-block scripted errors, keyed by block lower bound
#[derive(Default)]
pub struct ScriptedOperation {
    failures: Mutex<HashMap<i64, VecDeque<BlockError>>>,
    attempts: Mutex<HashMap<i64, u32>>,
    panic_on: Option<i64>,
    pause_at: Option<(i64, Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedOperation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the block starting at `block_min` once with a fatal error
    pub fn fail_fatally(self, block_min: i64) -> Self {
        self.fail_with(
            block_min,
            std::iter::once(BlockError::fatal("violates check constraint")),
        )
    }

    /// Return a connectivity-class error from the block starting at `block_min`
    pub fn fail_with_transient_error(self, block_min: i64, count: usize) -> Self {
        self.fail_with(
            block_min,
            (0..count).map(|_| BlockError::transient("server closed the connection")),
        )
    }

    fn fail_with(self, block_min: i64, errors: impl IntoIterator<Item = BlockError>) -> Self {
        self.failures
            .lock()
            .entry(block_min)
            .or_default()
            .extend(errors);
        self
    }

    pub fn panic_on(mut self, block_min: i64) -> Self {
        self.panic_on = Some(block_min);
        self
    }

    /// Signal `reached` when the block starting at `block_min` begins, then wait for `resume`
    pub fn pause_at(mut self, block_min: i64, reached: Arc<Notify>, resume: Arc<Notify>) -> Self {
        self.pause_at = Some((block_min, reached, resume));
        self
    }

    pub fn attempts_for(&self, block_min: i64) -> u32 {
        self.attempts.lock().get(&block_min).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.lock().values().sum()
    }
}

#[async_trait]
impl BlockOperation<MockSession> for ScriptedOperation {
    async fn execute(&self, session: &mut MockSession, selection: &BlockSelection) -> BlockResult<()> {
        let block = selection.range();
        *self.attempts.lock().entry(block.min()).or_default() += 1;

        if self.panic_on == Some(block.min()) {
            panic!("operation blew up on {block}");
        }
        if let Some((at, reached, resume)) = &self.pause_at {
            if *at == block.min() {
                reached.notify_one();
                resume.notified().await;
            }
        }

        let scripted = self
            .failures
            .lock()
            .get_mut(&block.min())
            .and_then(VecDeque::pop_front);
        if let Some(error) = scripted {
            return Err(error);
        }

        session.stage(block);
        Ok(())
    }
}

pub fn entity() -> TargetEntity {
    TargetEntity::new("events", "id").expect("valid identifiers")
}

/// `1..=n` in shuffled order, to check the coordinator sorts its input
pub fn shuffled_keys(n: i64) -> Vec<i64> {
    let mut keys: Vec<i64> = (1..=n).collect();
    let len = keys.len();
    for i in 0..len {
        keys.swap(i, (i * 7919 + 13) % len);
    }
    keys
}
