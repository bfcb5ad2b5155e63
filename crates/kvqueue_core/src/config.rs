//! Async pool configuration.

use crate::error::{AsyncError, AsyncResult};
use std::time::Duration;

/// Fewest worker threads a pool may run.
pub const MIN_WORKERS: usize = 1;
/// Most worker threads a pool may run.
pub const MAX_WORKERS: usize = 20;
/// Smallest allowed queue capacity.
pub const MIN_OPS: usize = 10;
/// Largest allowed queue capacity.
pub const MAX_OPS: usize = 4096;

/// Configuration for an [`crate::AsyncPool`].
#[derive(Debug, Clone)]
pub struct AsyncConfig {
    /// Number of worker threads.
    pub workers: usize,

    /// Maximum number of operations waiting in the queue.
    pub ops_max: usize,

    /// How long an idle worker sleeps before re-checking for shutdown.
    /// Submissions wake idle workers immediately.
    pub idle_wait: Duration,

    /// How long a barrier participant sleeps before re-checking for shutdown.
    pub flush_wait: Duration,

    /// Whether `shutdown` flushes queued work before stopping the workers.
    pub drain_on_shutdown: bool,
}

impl Default for AsyncConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            ops_max: 1024,
            idle_wait: Duration::from_millis(100),
            flush_wait: Duration::from_millis(10),
            drain_on_shutdown: true,
        }
    }
}

impl AsyncConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub const fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the queue capacity.
    #[must_use]
    pub const fn ops_max(mut self, ops_max: usize) -> Self {
        self.ops_max = ops_max;
        self
    }

    /// Sets the idle wait timeout.
    #[must_use]
    pub const fn idle_wait(mut self, wait: Duration) -> Self {
        self.idle_wait = wait;
        self
    }

    /// Sets the barrier wait timeout.
    #[must_use]
    pub const fn flush_wait(mut self, wait: Duration) -> Self {
        self.flush_wait = wait;
        self
    }

    /// Sets whether shutdown drains queued work first.
    #[must_use]
    pub const fn drain_on_shutdown(mut self, value: bool) -> Self {
        self.drain_on_shutdown = value;
        self
    }

    /// Checks every setting against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` naming the first setting out of range.
    pub fn validate(&self) -> AsyncResult<()> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.workers) {
            return Err(AsyncError::invalid_argument(format!(
                "workers must be in {MIN_WORKERS}..={MAX_WORKERS}, got {}",
                self.workers
            )));
        }
        if !(MIN_OPS..=MAX_OPS).contains(&self.ops_max) {
            return Err(AsyncError::invalid_argument(format!(
                "ops_max must be in {MIN_OPS}..={MAX_OPS}, got {}",
                self.ops_max
            )));
        }
        if self.idle_wait.is_zero() || self.flush_wait.is_zero() {
            return Err(AsyncError::invalid_argument(
                "idle_wait and flush_wait must be non-zero",
            ));
        }
        Ok(())
    }
}
