//! Operation descriptors.

use crate::callback::AsyncCallback;
use crate::error::{AsyncError, AsyncResult};
use crate::target::OpTarget;
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Kind of single-key operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpKind {
    /// Insert a key, overwriting unless the target disables overwrite.
    Insert = 0,
    /// Update a key (same store call as insert).
    Update = 1,
    /// Remove a key.
    Remove = 2,
    /// Look up a key and keep its value on the descriptor.
    Search = 3,
}

impl OpKind {
    /// All kinds, in discriminant order.
    pub const ALL: [OpKind; 4] = [Self::Insert, Self::Update, Self::Remove, Self::Search];

    /// Returns true if the kind carries a value.
    #[must_use]
    pub const fn needs_value(self) -> bool {
        matches!(self, Self::Insert | Self::Update)
    }

    /// Returns the lowercase name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Search => "search",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for OpKind {
    type Error = AsyncError;

    fn try_from(raw: u8) -> AsyncResult<Self> {
        Self::ALL
            .get(usize::from(raw))
            .copied()
            .ok_or_else(|| AsyncError::invalid_argument(format!("unknown operation kind {raw}")))
    }
}

impl FromStr for OpKind {
    type Err = AsyncError;

    fn from_str(s: &str) -> AsyncResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AsyncError::invalid_argument(format!("unknown operation kind {s:?}")))
    }
}

/// Lifecycle state of a descriptor.
///
/// The only legal cycle is `Free → Enqueued → Working → Free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpState {
    /// Not submitted; owned by the submitter.
    Free = 0,
    /// Waiting in the dispatch queue; owned by the queue.
    Enqueued = 1,
    /// Claimed by a worker; owned exclusively by that worker.
    Working = 2,
}

impl OpState {
    /// Returns true if `self → next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: OpState) -> bool {
        matches!(
            (self, next),
            (Self::Free, Self::Enqueued) | (Self::Enqueued, Self::Working) | (Self::Working, Self::Free)
        )
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Free,
            1 => Self::Enqueued,
            _ => Self::Working,
        }
    }
}

impl fmt::Display for OpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Free => "FREE",
            Self::Enqueued => "ENQUEUED",
            Self::Working => "WORKING",
        })
    }
}

/// A validated submission: kind, key and (for insert/update) value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpRequest {
    kind: OpKind,
    key: Vec<u8>,
    value: Option<Vec<u8>>,
}

impl OpRequest {
    pub(crate) fn new(kind: OpKind, key: &[u8], value: Option<&[u8]>) -> AsyncResult<Self> {
        let value = match (kind.needs_value(), value) {
            (true, None) => {
                return Err(AsyncError::invalid_argument(format!(
                    "{kind} requires a value"
                )))
            }
            (true, Some(v)) => Some(v.to_vec()),
            (false, _) => None,
        };
        Ok(Self {
            kind,
            key: key.to_vec(),
            value,
        })
    }
}

#[derive(Debug)]
struct OpPayload {
    kind: OpKind,
    key: Option<Vec<u8>>,
    value: Option<Vec<u8>>,
    found: Option<Vec<u8>>,
    executed: bool,
    notified: bool,
}

impl OpPayload {
    fn from_request(request: OpRequest) -> Self {
        Self {
            kind: request.kind,
            key: Some(request.key),
            value: request.value,
            found: None,
            executed: false,
            notified: false,
        }
    }
}

/// A single queued key/value operation.
///
/// Descriptors are handed out by [`crate::AsyncPool::submit`] as
/// `Arc<AsyncOp>`. The submitter may inspect the state at any time, read the
/// search result with [`AsyncOp::get_value`] once the operation has run, and
/// reuse a FREE descriptor with [`crate::AsyncPool::resubmit`].
///
/// # Ownership
///
/// Mutation rights follow the state: the submitter while FREE, the queue while
/// ENQUEUED, the claiming worker while WORKING. State changes are
/// compare-and-swap, so an out-of-order transition is detected rather than
/// silently applied.
pub struct AsyncOp {
    id: u64,
    pool_id: u64,
    target: OpTarget,
    callback: Option<Arc<dyn AsyncCallback>>,
    state: AtomicU8,
    payload: Mutex<OpPayload>,
}

impl AsyncOp {
    pub(crate) fn new(
        id: u64,
        pool_id: u64,
        target: OpTarget,
        callback: Option<Arc<dyn AsyncCallback>>,
        request: OpRequest,
    ) -> Self {
        Self {
            id,
            pool_id,
            target,
            callback,
            state: AtomicU8::new(OpState::Free as u8),
            payload: Mutex::new(OpPayload::from_request(request)),
        }
    }

    /// Returns the pool-unique descriptor ID.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the resource this descriptor runs against.
    #[must_use]
    pub fn target(&self) -> &OpTarget {
        &self.target
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> OpState {
        OpState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Returns the operation kind of the latest submission.
    #[must_use]
    pub fn kind(&self) -> OpKind {
        self.payload.lock().kind
    }

    /// Returns the key, or `None` once the operation has executed.
    #[must_use]
    pub fn key(&self) -> Option<Vec<u8>> {
        self.payload.lock().key.clone()
    }

    /// Returns the submitted value, or `None` once the operation has executed.
    #[must_use]
    pub fn value(&self) -> Option<Vec<u8>> {
        self.payload.lock().value.clone()
    }

    /// Returns the value found by a completed search.
    ///
    /// Valid from inside the completion callback and at any time after it.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the descriptor is not a search or has not run yet
    /// - `NotFound` if the search found no such key
    pub fn get_value(&self) -> AsyncResult<Vec<u8>> {
        let payload = self.payload.lock();
        if payload.kind != OpKind::Search {
            return Err(AsyncError::invalid_argument(format!(
                "get_value is only valid on search operations, not {}",
                payload.kind
            )));
        }
        if !payload.executed {
            return Err(AsyncError::invalid_argument("search has not completed"));
        }
        payload.found.clone().ok_or(AsyncError::NotFound)
    }

    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    pub(crate) fn callback(&self) -> Option<&Arc<dyn AsyncCallback>> {
        self.callback.as_ref()
    }

    /// Moves the descriptor from `from` to `to`.
    pub(crate) fn transition(&self, from: OpState, to: OpState) -> AsyncResult<()> {
        if !from.can_transition_to(to) {
            return Err(AsyncError::fatal(format!(
                "op {}: illegal transition {from} -> {to}",
                self.id
            )));
        }
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| {
                AsyncError::fatal(format!(
                    "op {}: expected {from} for {from} -> {to}, found {}",
                    self.id,
                    OpState::from_raw(actual)
                ))
            })
    }

    /// Returns the descriptor to FREE whatever its current state.
    ///
    /// Only used on paths where the normal transition cannot be made.
    pub(crate) fn force_free(&self) {
        self.state.store(OpState::Free as u8, Ordering::Release);
    }

    /// Loads a new request. Caller must own the descriptor (FREE).
    pub(crate) fn load(&self, request: OpRequest) {
        *self.payload.lock() = OpPayload::from_request(request);
    }

    /// Returns kind, key and value for execution.
    pub(crate) fn request(&self) -> (OpKind, Vec<u8>, Option<Vec<u8>>) {
        let payload = self.payload.lock();
        (
            payload.kind,
            payload.key.clone().unwrap_or_default(),
            payload.value.clone(),
        )
    }

    pub(crate) fn record_result(&self, found: Option<Vec<u8>>) {
        let mut payload = self.payload.lock();
        payload.found = found;
        payload.executed = true;
    }

    /// Marks the callback as invoked; returns false if it already was.
    pub(crate) fn mark_notified(&self) -> bool {
        let mut payload = self.payload.lock();
        !std::mem::replace(&mut payload.notified, true)
    }

    /// Clears the key and value so a stale request cannot be replayed.
    pub(crate) fn clear_request(&self) {
        let mut payload = self.payload.lock();
        payload.key = None;
        payload.value = None;
    }
}

impl fmt::Debug for AsyncOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncOp")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("kind", &self.kind())
            .field("target", &self.target)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
