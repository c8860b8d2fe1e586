//! The caller-supplied row operation.

use crate::execution::session::BlockSession;
use crate::execution::target::BlockSelection;
use crate::error::BlockResult;
use async_trait::async_trait;

/// Work applied to the rows of one block
///
/// Implementations receive the worker's session and the block's row selection. They
/// run inside a transaction opened by the block executor and must not commit or
/// roll back. Any [`crate::error::BlockError`] returned here abandons the block after
/// a rollback, whatever its category; only commit failures are retried.
#[async_trait]
pub trait BlockOperation<S: BlockSession>: Send + Sync + 'static {
    async fn execute(&self, session: &mut S, selection: &BlockSelection) -> BlockResult<()>;

    /// Short name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
