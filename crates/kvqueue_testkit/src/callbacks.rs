//! Callbacks that capture completions for later assertions.

use kvqueue_core::{AsyncCallback, AsyncError, AsyncOp, AsyncResult, OpKind, OpOutcome, OpState};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// One observed callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Descriptor ID.
    pub op_id: u64,
    /// Operation kind at completion.
    pub kind: OpKind,
    /// Outcome passed to the callback.
    pub outcome: OpOutcome,
    /// Value found by a search, if any.
    pub found: Option<Vec<u8>>,
    /// Descriptor state seen from inside the callback.
    pub state: OpState,
    /// Name of the thread the callback ran on.
    pub worker: String,
}

/// A callback that records every completion in arrival order.
///
/// Built with [`RecordingCallback::rejecting`] it also returns an error from
/// every notification, forcing each transaction to roll back.
#[derive(Debug, Default)]
pub struct RecordingCallback {
    completions: Mutex<Vec<Completion>>,
    arrived: Condvar,
    reject: bool,
}

impl RecordingCallback {
    /// Creates a callback that accepts every outcome.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a callback that rejects every outcome.
    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            reject: true,
            ..Self::default()
        })
    }

    /// Returns this callback as a trait object for submission.
    pub fn handle(self: &Arc<Self>) -> Arc<dyn AsyncCallback> {
        Arc::clone(self) as Arc<dyn AsyncCallback>
    }

    /// Returns a copy of every completion so far.
    pub fn completions(&self) -> Vec<Completion> {
        self.completions.lock().clone()
    }

    /// Returns the number of completions so far.
    pub fn len(&self) -> usize {
        self.completions.lock().len()
    }

    /// Returns true if nothing has completed yet.
    pub fn is_empty(&self) -> bool {
        self.completions.lock().is_empty()
    }

    /// Returns the outcomes in arrival order.
    pub fn outcomes(&self) -> Vec<OpOutcome> {
        self.completions
            .lock()
            .iter()
            .map(|c| c.outcome.clone())
            .collect()
    }

    /// Groups descriptor IDs by the worker that completed them.
    pub fn by_worker(&self) -> BTreeMap<String, Vec<u64>> {
        let mut grouped: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for completion in self.completions.lock().iter() {
            grouped
                .entry(completion.worker.clone())
                .or_default()
                .push(completion.op_id);
        }
        grouped
    }

    /// Waits until at least `count` completions arrived or `timeout` passed.
    ///
    /// Returns true if the count was reached.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut completions = self.completions.lock();
        while completions.len() < count {
            if self.arrived.wait_until(&mut completions, deadline).timed_out() {
                return completions.len() >= count;
            }
        }
        true
    }
}

impl AsyncCallback for RecordingCallback {
    fn notify(&self, op: &AsyncOp, outcome: &OpOutcome, _flags: u32) -> AsyncResult<()> {
        let kind = op.kind();
        let found = match kind {
            OpKind::Search => op.get_value().ok(),
            _ => None,
        };
        let completion = Completion {
            op_id: op.id(),
            kind,
            outcome: outcome.clone(),
            found,
            state: op.state(),
            worker: thread::current().name().unwrap_or("unnamed").to_string(),
        };
        self.completions.lock().push(completion);
        self.arrived.notify_all();

        if self.reject {
            Err(AsyncError::callback("rejected by recording callback"))
        } else {
            Ok(())
        }
    }
}
