//! Flush barrier state.
//!
//! A flush moves through three phases:
//!
//! 1. **Requested**: the requester has enqueued the sentinel
//!    (`in_progress`).
//! 2. **Flushing**: a worker claimed the sentinel and opened a rendezvous;
//!    every other worker joins it between claims.
//! 3. **Complete**: the last participant arrived; the generation advances,
//!    waiting workers resume and the requester may return.
//!
//! All methods are called with the pool lock held.

/// What a worker does after touching the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BarrierStep {
    /// Wait until the generation moves past `generation`.
    Wait { generation: u64 },
    /// This worker completed the barrier.
    Released { rendezvous: usize },
}

#[derive(Debug, Default)]
pub(crate) struct FlushState {
    in_progress: bool,
    flushing: bool,
    complete: bool,
    rendezvous: usize,
    generation: u64,
}

impl FlushState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub(crate) fn is_flushing(&self) -> bool {
        self.flushing
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Marks a flush as requested. Returns false if one already is.
    pub(crate) fn request(&mut self) -> bool {
        if self.in_progress {
            return false;
        }
        self.in_progress = true;
        self.complete = false;
        true
    }

    /// Opens the rendezvous on behalf of the worker that claimed the sentinel.
    pub(crate) fn trigger(&mut self, participants: usize) -> BarrierStep {
        debug_assert!(self.in_progress && !self.flushing);
        self.flushing = true;
        self.rendezvous = 1;
        self.settle(participants)
    }

    /// Counts one more worker into the open rendezvous.
    pub(crate) fn join(&mut self, participants: usize) -> BarrierStep {
        debug_assert!(self.flushing);
        self.rendezvous += 1;
        self.settle(participants)
    }

    /// Re-evaluates the rendezvous after a worker left the pool.
    ///
    /// Returns the rendezvous count if the departure completed the barrier.
    pub(crate) fn recheck(&mut self, participants: usize) -> Option<usize> {
        if !self.flushing {
            return None;
        }
        match self.settle(participants) {
            BarrierStep::Released { rendezvous } => Some(rendezvous),
            BarrierStep::Wait { .. } => None,
        }
    }

    /// Consumes a completed flush for the requester.
    pub(crate) fn take_complete(&mut self) -> Option<usize> {
        if !self.complete {
            return None;
        }
        self.complete = false;
        self.in_progress = false;
        Some(self.rendezvous)
    }

    /// Drops a flush that can no longer complete.
    pub(crate) fn abandon(&mut self) {
        if self.flushing {
            self.generation += 1;
        }
        self.in_progress = false;
        self.flushing = false;
        self.complete = false;
    }

    fn settle(&mut self, participants: usize) -> BarrierStep {
        if self.rendezvous >= participants {
            self.flushing = false;
            self.complete = true;
            self.generation += 1;
            BarrierStep::Released {
                rendezvous: self.rendezvous,
            }
        } else {
            BarrierStep::Wait {
                generation: self.generation,
            }
        }
    }
}
