//! Transactional execution of a single descriptor.

use crate::cache::CursorCache;
use crate::callback::OpOutcome;
use crate::error::{AsyncError, AsyncResult};
use crate::op::{AsyncOp, OpKind, OpState};
use crate::stats::AsyncStats;
use kvqueue_store::{StoreCursor, StoreSession};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, warn};

/// Runs one WORKING descriptor inside its own transaction.
///
/// The bracket is: begin, resolve the cursor, apply the operation, notify
/// the callback, then commit if the outcome was success or not-found and the
/// callback returned `Ok`, otherwise roll back. Whatever happens, the
/// descriptor ends FREE with its key and value cleared and the cursor reset.
pub(crate) fn execute<S: StoreSession>(
    session: &mut S,
    cache: &mut CursorCache<S::Cursor>,
    op: &AsyncOp,
    stats: &AsyncStats,
) -> OpOutcome {
    debug_assert_eq!(op.state(), OpState::Working);
    let (kind, key, value) = op.request();
    let signature = op.target().signature();

    let (txn, outcome) = match session.begin() {
        Ok(txn) => {
            let result = cache.acquire(session, op.target()).and_then(|(cursor, lookup)| {
                stats.record_lookup(lookup);
                apply(cursor, op, kind, &key, value.as_deref())
            });
            (Some(txn), OpOutcome::from_result(result))
        }
        Err(err) => (None, OpOutcome::Failed(err.into())),
    };
    if kind == OpKind::Search && !outcome.is_success() {
        op.record_result(None);
    }
    stats.record_outcome(&outcome);

    let verdict = notify(op, &outcome);
    if verdict.is_err() {
        stats.record_callback_error();
    }

    if let Some(txn) = txn {
        if outcome.allows_commit() && verdict.is_ok() {
            match session.commit(txn) {
                Ok(()) => stats.record_commit(),
                Err(err) => {
                    warn!(op = op.id(), error = %err, "commit failed");
                    stats.record_resolve_error();
                }
            }
        } else {
            match session.rollback(txn) {
                Ok(()) => stats.record_rollback(),
                Err(err) => {
                    warn!(op = op.id(), error = %err, "rollback failed");
                    stats.record_resolve_error();
                }
            }
        }
    }

    op.clear_request();
    cache.reset(signature);
    if let Err(err) = op.transition(OpState::Working, OpState::Free) {
        error!(op = op.id(), error = %err, "descriptor left WORKING; forcing FREE");
        stats.record_fatal();
        op.force_free();
    }
    debug!(op = op.id(), %kind, ?outcome, "operation complete");
    outcome
}

/// Gives up on a claimed descriptor after a fatal error.
///
/// The callback runs once with the fatal outcome unless it already ran, and
/// the descriptor is forced back to FREE so it is never leaked.
pub(crate) fn abandon(op: &AsyncOp, err: AsyncError, stats: &AsyncStats) {
    error!(op = op.id(), error = %err, "abandoning operation");
    stats.record_fatal();
    cancel(op, err, stats);
}

/// Returns a descriptor that will never execute to FREE, reporting `err` to
/// its callback if the callback has not run yet.
pub(crate) fn cancel(op: &AsyncOp, err: AsyncError, stats: &AsyncStats) {
    if op.kind() == OpKind::Search {
        op.record_result(None);
    }
    if notify(op, &OpOutcome::Failed(err)).is_err() {
        stats.record_callback_error();
    }
    op.clear_request();
    op.force_free();
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "(non-string panic)".to_string())
}

fn apply<C: StoreCursor>(
    cursor: &mut C,
    op: &AsyncOp,
    kind: OpKind,
    key: &[u8],
    value: Option<&[u8]>,
) -> AsyncResult<()> {
    cursor.set_key(key);
    if kind.needs_value() {
        let value = value
            .ok_or_else(|| AsyncError::invalid_argument(format!("{kind} without a value")))?;
        cursor.set_value(value);
    }
    match kind {
        OpKind::Insert | OpKind::Update => cursor.insert()?,
        OpKind::Remove => cursor.remove()?,
        OpKind::Search => {
            cursor.search()?;
            let found = cursor.get_value()?;
            op.record_result(Some(found));
        }
    }
    Ok(())
}

/// Invokes the callback at most once per execution, containing panics.
fn notify(op: &AsyncOp, outcome: &OpOutcome) -> AsyncResult<()> {
    let Some(callback) = op.callback() else {
        return Ok(());
    };
    if !op.mark_notified() {
        return Ok(());
    }
    match panic::catch_unwind(AssertUnwindSafe(|| callback.notify(op, outcome, 0))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            debug!(op = op.id(), error = %err, "callback requested rollback");
            Err(err)
        }
        Err(payload) => {
            let message = panic_message(&*payload);
            error!(op = op.id(), panic = %message, "callback panicked");
            Err(AsyncError::callback(format!("callback panicked: {message}")))
        }
    }
}
