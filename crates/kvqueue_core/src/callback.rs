//! Completion callbacks.

use crate::error::{AsyncError, AsyncResult};
use crate::op::AsyncOp;

/// The result of executing one operation, as seen by its callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutcome {
    /// The store operation succeeded.
    Success,
    /// Remove or search found no such key. Not an error: the transaction
    /// still commits.
    NotFound,
    /// The operation failed and its transaction is rolled back.
    Failed(AsyncError),
}

impl OpOutcome {
    /// Converts a store-level result into an outcome.
    pub(crate) fn from_result(result: AsyncResult<()>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(AsyncError::NotFound) => Self::NotFound,
            Err(err) => Self::Failed(err),
        }
    }

    /// Returns true for [`OpOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true for [`OpOutcome::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns true if the outcome permits committing the transaction.
    #[must_use]
    pub fn allows_commit(&self) -> bool {
        matches!(self, Self::Success | Self::NotFound)
    }

    /// Returns the error of a failed outcome.
    #[must_use]
    pub fn error(&self) -> Option<&AsyncError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Receives the completion of an operation.
///
/// `notify` runs on the worker thread, with the descriptor still WORKING and
/// the operation's transaction still open. Returning `Ok(())` lets a
/// successful (or not-found) operation commit; returning an error forces a
/// rollback. It is called exactly once per execution.
///
/// `flags` is reserved and currently always 0.
///
/// A callback must not flush or shut down the pool that runs it. `flush`
/// called from a worker of the same pool returns `InvalidArgument`.
///
/// Closures with the matching signature implement this trait:
///
/// ```rust
/// use kvqueue_core::{AsyncCallback, AsyncOp, AsyncResult, OpOutcome};
/// use std::sync::Arc;
///
/// let cb: Arc<dyn AsyncCallback> = Arc::new(|op: &AsyncOp, outcome: &OpOutcome, _flags: u32| -> AsyncResult<()> {
///     println!("op {} finished: {:?}", op.id(), outcome);
///     Ok(())
/// });
/// ```
pub trait AsyncCallback: Send + Sync {
    /// Called once when the operation has executed.
    ///
    /// # Errors
    ///
    /// Any error causes the transaction to roll back.
    fn notify(&self, op: &AsyncOp, outcome: &OpOutcome, flags: u32) -> AsyncResult<()>;
}

impl<F> AsyncCallback for F
where
    F: Fn(&AsyncOp, &OpOutcome, u32) -> AsyncResult<()> + Send + Sync,
{
    fn notify(&self, op: &AsyncOp, outcome: &OpOutcome, flags: u32) -> AsyncResult<()> {
        self(op, outcome, flags)
    }
}
