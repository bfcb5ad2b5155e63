//! Per-worker cursor cache.
//!
//! Each worker keeps the cursors it opens, keyed by the target's
//! [`Signature`], and reuses them for the rest of its life. The set of distinct
//! signatures is bounded by the application's schema rather than by load, so
//! there is no eviction and lookup is a linear scan.

use crate::error::{AsyncError, AsyncResult};
use crate::target::{OpTarget, Signature};
use kvqueue_store::{StoreCursor, StoreSession};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Whether a lookup reused a cached cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheLookup {
    Hit,
    Miss,
}

struct CachedCursor<C> {
    signature: Signature,
    cursor: C,
}

/// Cursors owned by one worker.
pub(crate) struct CursorCache<C: StoreCursor> {
    entries: VecDeque<CachedCursor<C>>,
}

impl<C: StoreCursor> CursorCache<C> {
    pub(crate) fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the cursor for `target`, opening and caching one on a miss.
    ///
    /// New cursors go to the head of the list.
    pub(crate) fn acquire<'a, S>(
        &'a mut self,
        session: &mut S,
        target: &OpTarget,
    ) -> AsyncResult<(&'a mut C, CacheLookup)>
    where
        S: StoreSession<Cursor = C>,
    {
        let signature = target.signature();
        if let Some(idx) = self.position(signature) {
            return Ok((&mut self.entries[idx].cursor, CacheLookup::Hit));
        }

        let cursor = session
            .open_cursor(target.uri(), target.config())
            .map_err(|source| AsyncError::resource_unavailable(target.uri(), source))?;
        debug!(uri = target.uri(), %signature, "cached new cursor");
        self.entries.push_front(CachedCursor { signature, cursor });
        Ok((&mut self.entries[0].cursor, CacheLookup::Miss))
    }

    /// Resets the cached cursor for `signature`, if any.
    pub(crate) fn reset(&mut self, signature: Signature) {
        if let Some(idx) = self.position(signature) {
            if let Err(err) = self.entries[idx].cursor.reset() {
                warn!(%signature, error = %err, "cursor reset failed");
            }
        }
    }

    /// Closes every cached cursor; returns how many failed to close.
    ///
    /// A failure is logged and does not stop the remaining closes.
    pub(crate) fn close_all(&mut self) -> usize {
        let mut failures = 0;
        for entry in self.entries.drain(..) {
            if let Err(err) = entry.cursor.close() {
                warn!(signature = %entry.signature, error = %err, "cursor close failed");
                failures += 1;
            }
        }
        failures
    }

    fn position(&self, signature: Signature) -> Option<usize> {
        self.entries.iter().position(|e| e.signature == signature)
    }
}

impl<C: StoreCursor> Drop for CursorCache<C> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            self.close_all();
        }
    }
}
