//! Dispatch queue and the state shared between the pool and its workers.

use crate::barrier::FlushState;
use crate::config::AsyncConfig;
use crate::op::AsyncOp;
use crate::stats::AsyncStats;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One slot in the dispatch queue.
pub(crate) enum QueueEntry {
    /// A submitted descriptor, ENQUEUED.
    Op(Arc<AsyncOp>),
    /// The flush sentinel. Never executed.
    Flush,
}

/// FIFO of queued entries.
///
/// `ops_len` excludes the sentinel so a pending flush never counts toward
/// the capacity limit.
#[derive(Default)]
pub(crate) struct DispatchQueue {
    entries: VecDeque<QueueEntry>,
    ops: usize,
}

impl DispatchQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_op(&mut self, op: Arc<AsyncOp>) {
        self.entries.push_back(QueueEntry::Op(op));
        self.ops += 1;
    }

    pub(crate) fn push_flush(&mut self) {
        self.entries.push_back(QueueEntry::Flush);
    }

    pub(crate) fn pop(&mut self) -> Option<QueueEntry> {
        let entry = self.entries.pop_front()?;
        if matches!(entry, QueueEntry::Op(_)) {
            self.ops -= 1;
        }
        Some(entry)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn ops_len(&self) -> usize {
        self.ops
    }

    /// Drops a sentinel that is still queued. Returns true if one was.
    pub(crate) fn remove_flush(&mut self) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| matches!(entry, QueueEntry::Op(_)));
        self.entries.len() != before
    }

    /// Removes every queued descriptor, dropping any sentinel.
    pub(crate) fn drain_ops(&mut self) -> Vec<Arc<AsyncOp>> {
        self.ops = 0;
        self.entries
            .drain(..)
            .filter_map(|entry| match entry {
                QueueEntry::Op(op) => Some(op),
                QueueEntry::Flush => None,
            })
            .collect()
    }
}

/// Everything guarded by the pool lock.
pub(crate) struct SharedState {
    pub(crate) queue: DispatchQueue,
    pub(crate) flush: FlushState,
    /// Workers still taking part in barriers.
    pub(crate) live_workers: usize,
}

/// State shared by the pool handle and every worker thread.
pub(crate) struct Shared {
    pub(crate) state: Mutex<SharedState>,
    /// Signalled when work is queued or a barrier opens.
    pub(crate) work_ready: Condvar,
    /// Signalled when a barrier completes or a flush slot frees up.
    pub(crate) flush_cond: Condvar,
    running: AtomicBool,
    pub(crate) stats: AsyncStats,
    pub(crate) config: AsyncConfig,
}

impl Shared {
    pub(crate) fn new(config: AsyncConfig) -> Self {
        Self {
            state: Mutex::new(SharedState {
                queue: DispatchQueue::new(),
                flush: FlushState::new(),
                live_workers: 0,
            }),
            work_ready: Condvar::new(),
            flush_cond: Condvar::new(),
            running: AtomicBool::new(true),
            stats: AsyncStats::new(),
            config,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Clears the running flag. Returns false if it was already clear.
    pub(crate) fn stop(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{OpKind, OpRequest};
    use crate::target::OpTarget;

    fn op(id: u64) -> Arc<AsyncOp> {
        let target = OpTarget::new("t", "").unwrap();
        let request = OpRequest::new(OpKind::Search, b"k", None).unwrap();
        Arc::new(AsyncOp::new(id, 1, target, None, request))
    }

    #[test]
    fn fifo_with_sentinel_in_order() {
        let mut queue = DispatchQueue::new();
        queue.push_op(op(1));
        queue.push_flush();
        queue.push_op(op(2));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.ops_len(), 2);

        assert!(matches!(queue.pop(), Some(QueueEntry::Op(op)) if op.id() == 1));
        assert!(matches!(queue.pop(), Some(QueueEntry::Flush)));
        assert_eq!(queue.ops_len(), 1);
        assert!(matches!(queue.pop(), Some(QueueEntry::Op(op)) if op.id() == 2));
        assert!(queue.pop().is_none());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn drain_skips_sentinel() {
        let mut queue = DispatchQueue::new();
        queue.push_op(op(1));
        queue.push_flush();
        queue.push_op(op(2));

        let drained: Vec<u64> = queue.drain_ops().iter().map(|op| op.id()).collect();
        assert_eq!(drained, vec![1, 2]);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.ops_len(), 0);
    }

    #[test]
    fn abandoned_sentinel_removed() {
        let mut queue = DispatchQueue::new();
        queue.push_flush();
        queue.push_op(op(1));
        assert!(queue.remove_flush());
        assert!(!queue.remove_flush());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.ops_len(), 1);
    }

    #[test]
    fn stop_is_one_shot() {
        let shared = Shared::new(AsyncConfig::default());
        assert!(shared.is_running());
        assert!(shared.stop());
        assert!(!shared.stop());
        assert!(!shared.is_running());
    }
}
