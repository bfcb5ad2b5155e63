//! The worker loop.

use crate::barrier::BarrierStep;
use crate::cache::CursorCache;
use crate::error::AsyncError;
use crate::executor;
use crate::op::OpState;
use crate::queue::{QueueEntry, Shared, SharedState};
use kvqueue_store::StoreSession;
use parking_lot::MutexGuard;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

thread_local! {
    /// Pool whose worker loop runs on this thread, if any.
    static WORKER_OF: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Returns true when called on one of `pool_id`'s worker threads.
pub(crate) fn is_worker_of(pool_id: u64) -> bool {
    WORKER_OF.with(|current| current.get() == Some(pool_id))
}

/// Runs one worker until the pool stops or the worker hits a fatal panic.
///
/// The worker holds the pool lock only while it inspects the queue and the
/// barrier. Execution, cursor opens and callbacks run with the lock released.
pub(crate) fn run<S: StoreSession>(
    shared: &Shared,
    pool_id: u64,
    index: usize,
    mut session: S,
) {
    WORKER_OF.with(|current| current.set(Some(pool_id)));
    let mut cache = CursorCache::new();
    debug!(worker = index, "worker started");

    let mut guard = shared.state.lock();
    while shared.is_running() {
        if guard.flush.is_flushing() {
            let participants = guard.live_workers;
            let step = guard.flush.join(participants);
            await_barrier(shared, &mut guard, step, index);
            continue;
        }

        let Some(entry) = guard.queue.pop() else {
            shared.work_ready.wait_for(&mut guard, shared.config.idle_wait);
            continue;
        };
        shared.stats.set_queue_depth(guard.queue.ops_len());

        match entry {
            QueueEntry::Flush => {
                if !guard.flush.in_progress() {
                    error!(worker = index, "flush sentinel claimed with no flush pending");
                    shared.stats.record_fatal();
                    continue;
                }
                let participants = guard.live_workers;
                let step = guard.flush.trigger(participants);
                debug!(worker = index, participants, "flush barrier opened");
                shared.work_ready.notify_all();
                await_barrier(shared, &mut guard, step, index);
            }
            QueueEntry::Op(op) => {
                if let Err(err) = op.transition(OpState::Enqueued, OpState::Working) {
                    MutexGuard::unlocked(&mut guard, || {
                        executor::abandon(&op, err, &shared.stats);
                    });
                    continue;
                }

                let result = MutexGuard::unlocked(&mut guard, || {
                    panic::catch_unwind(AssertUnwindSafe(|| {
                        executor::execute(&mut session, &mut cache, &op, &shared.stats)
                    }))
                });
                if let Err(payload) = result {
                    let message = executor::panic_message(&*payload);
                    let err = AsyncError::fatal(format!("worker {index} panicked: {message}"));
                    MutexGuard::unlocked(&mut guard, || {
                        executor::abandon(&op, err, &shared.stats);
                    });
                    break;
                }
            }
        }
    }

    guard.live_workers -= 1;
    let participants = guard.live_workers;
    if let Some(rendezvous) = guard.flush.recheck(participants) {
        debug!(worker = index, rendezvous, "flush barrier completed by departure");
        shared.flush_cond.notify_all();
    }
    drop(guard);

    let cursors = cache.len();
    let failures = cache.close_all();
    debug!(worker = index, cursors, failures, "worker stopped");
}

/// Waits out the barrier step returned by a trigger or join.
fn await_barrier(
    shared: &Shared,
    guard: &mut MutexGuard<'_, SharedState>,
    step: BarrierStep,
    index: usize,
) {
    match step {
        BarrierStep::Released { rendezvous } => {
            debug!(worker = index, rendezvous, "flush barrier complete");
            MutexGuard::unlocked(guard, || {
                shared.flush_cond.notify_all();
            });
        }
        BarrierStep::Wait { generation } => {
            while guard.flush.generation() == generation && shared.is_running() {
                shared.flush_cond.wait_for(guard, shared.config.flush_wait);
            }
        }
    }
}
