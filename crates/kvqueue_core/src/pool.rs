//! The async operation pool.

use crate::callback::AsyncCallback;
use crate::config::AsyncConfig;
use crate::error::{AsyncError, AsyncResult};
use crate::executor;
use crate::op::{AsyncOp, OpKind, OpRequest, OpState};
use crate::queue::Shared;
use crate::stats::StatsSnapshot;
use crate::target::OpTarget;
use crate::worker;
use kvqueue_store::StoreEngine;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// A fixed pool of workers executing queued single-key operations.
///
/// Submissions return immediately with an `Arc<AsyncOp>`; the operation runs
/// later on one of the workers, in its own transaction, and its callback (if
/// any) is told the outcome before the transaction commits or rolls back.
///
/// Operations are claimed in submission order. With more than one worker,
/// completions may interleave across workers.
///
/// # Example
///
/// ```rust
/// use kvqueue_core::{AsyncConfig, AsyncPool, OpKind};
/// use kvqueue_store::InMemoryEngine;
/// use std::sync::Arc;
///
/// let engine = Arc::new(InMemoryEngine::new());
/// engine.create_table("users").unwrap();
/// let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(1)).unwrap();
///
/// let users = pool.target("users", "").unwrap();
/// pool.submit(&users, OpKind::Insert, b"alice", Some(b"admin"), None).unwrap();
/// pool.flush().unwrap();
///
/// assert_eq!(engine.get("users", b"alice").unwrap(), Some(b"admin".to_vec()));
/// ```
pub struct AsyncPool<E: StoreEngine> {
    engine: Arc<E>,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    pool_id: u64,
    next_op_id: AtomicU64,
}

impl<E: StoreEngine> AsyncPool<E> {
    /// Starts a pool of `config.workers` threads, each with its own session.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the configuration is out of range
    /// - `Store` if the engine cannot open a session
    /// - `Fatal` if a worker thread cannot be spawned
    pub fn new(engine: Arc<E>, config: AsyncConfig) -> AsyncResult<Self> {
        config.validate()?;

        let sessions = (0..config.workers)
            .map(|_| engine.open_session())
            .collect::<Result<Vec<_>, _>>()?;

        let pool_id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(Shared::new(config.clone()));
        shared.state.lock().live_workers = config.workers;

        let mut workers = Vec::with_capacity(config.workers);
        for (index, session) in sessions.into_iter().enumerate() {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("kvqueue-worker-{index}"))
                .spawn(move || worker::run(&worker_shared, pool_id, index, session));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    shared.stop();
                    {
                        let _guard = shared.state.lock();
                        shared.work_ready.notify_all();
                    }
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(AsyncError::fatal(format!(
                        "failed to spawn worker {index}: {err}"
                    )));
                }
            }
        }

        info!(
            pool = pool_id,
            workers = config.workers,
            ops_max = config.ops_max,
            "async pool started"
        );
        Ok(Self {
            engine,
            shared,
            workers: Mutex::new(workers),
            pool_id,
            next_op_id: AtomicU64::new(1),
        })
    }

    /// Builds a target for `uri` opened with `config`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `uri` is empty.
    pub fn target(&self, uri: &str, config: &str) -> AsyncResult<OpTarget> {
        OpTarget::new(uri, config)
    }

    /// Queues an operation and returns its descriptor.
    ///
    /// `value` is required for insert and update and ignored otherwise.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if a required value is missing or the pool is shut down
    /// - `Busy` if `ops_max` operations are already queued
    pub fn submit(
        &self,
        target: &OpTarget,
        kind: OpKind,
        key: &[u8],
        value: Option<&[u8]>,
        callback: Option<Arc<dyn AsyncCallback>>,
    ) -> AsyncResult<Arc<AsyncOp>> {
        let request = OpRequest::new(kind, key, value)?;
        let id = self.next_op_id.fetch_add(1, Ordering::Relaxed);
        let op = Arc::new(AsyncOp::new(
            id,
            self.pool_id,
            target.clone(),
            callback,
            request,
        ));
        self.enqueue(&op, kind, None)?;
        Ok(op)
    }

    /// Queues a new operation on a FREE descriptor, keeping its target and
    /// callback.
    ///
    /// A descriptor must not be resubmitted from two threads at once.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the descriptor is not FREE, belongs to another
    ///   pool, or a required value is missing
    /// - `Busy` if `ops_max` operations are already queued
    pub fn resubmit(
        &self,
        op: &Arc<AsyncOp>,
        kind: OpKind,
        key: &[u8],
        value: Option<&[u8]>,
    ) -> AsyncResult<()> {
        if op.pool_id() != self.pool_id {
            return Err(AsyncError::invalid_argument(format!(
                "op {} belongs to another pool",
                op.id()
            )));
        }
        let state = op.state();
        if state != OpState::Free {
            return Err(AsyncError::invalid_argument(format!(
                "op {} is {state}, not FREE",
                op.id()
            )));
        }
        let request = OpRequest::new(kind, key, value)?;
        self.enqueue(op, kind, Some(request))
    }

    /// Queues an insert.
    ///
    /// # Errors
    ///
    /// See [`AsyncPool::submit`].
    pub fn insert(
        &self,
        target: &OpTarget,
        key: &[u8],
        value: &[u8],
        callback: Option<Arc<dyn AsyncCallback>>,
    ) -> AsyncResult<Arc<AsyncOp>> {
        self.submit(target, OpKind::Insert, key, Some(value), callback)
    }

    /// Queues an update.
    ///
    /// # Errors
    ///
    /// See [`AsyncPool::submit`].
    pub fn update(
        &self,
        target: &OpTarget,
        key: &[u8],
        value: &[u8],
        callback: Option<Arc<dyn AsyncCallback>>,
    ) -> AsyncResult<Arc<AsyncOp>> {
        self.submit(target, OpKind::Update, key, Some(value), callback)
    }

    /// Queues a remove.
    ///
    /// # Errors
    ///
    /// See [`AsyncPool::submit`].
    pub fn remove(
        &self,
        target: &OpTarget,
        key: &[u8],
        callback: Option<Arc<dyn AsyncCallback>>,
    ) -> AsyncResult<Arc<AsyncOp>> {
        self.submit(target, OpKind::Remove, key, None, callback)
    }

    /// Queues a search. Read the result with [`AsyncOp::get_value`].
    ///
    /// # Errors
    ///
    /// See [`AsyncPool::submit`].
    pub fn search(
        &self,
        target: &OpTarget,
        key: &[u8],
        callback: Option<Arc<dyn AsyncCallback>>,
    ) -> AsyncResult<Arc<AsyncOp>> {
        self.submit(target, OpKind::Search, key, None, callback)
    }

    /// Admits `op` to the queue. A resubmitted request is loaded only once
    /// the pool has accepted it, so a rejected resubmit leaves the
    /// descriptor untouched.
    fn enqueue(
        &self,
        op: &Arc<AsyncOp>,
        kind: OpKind,
        reload: Option<OpRequest>,
    ) -> AsyncResult<()> {
        {
            let mut guard = self.shared.state.lock();
            if !self.shared.is_running() {
                return Err(AsyncError::shut_down());
            }
            let capacity = self.shared.config.ops_max;
            if guard.queue.ops_len() >= capacity {
                self.shared.stats.record_busy();
                return Err(AsyncError::Busy { capacity });
            }
            op.transition(OpState::Free, OpState::Enqueued)?;
            if let Some(request) = reload {
                op.load(request);
            }
            guard.queue.push_op(Arc::clone(op));
            self.shared.stats.set_queue_depth(guard.queue.ops_len());
        }
        self.shared.stats.record_submit(kind);
        self.shared.work_ready.notify_one();
        Ok(())
    }

    /// Blocks until every operation queued before the call has finished and
    /// every worker has met at the barrier.
    ///
    /// Concurrent callers are served one at a time. A completion callback
    /// must not flush its own pool: the worker running it could never join
    /// the barrier.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if called from one of this pool's workers, or if the
    ///   pool shuts down before the flush completes
    /// - `Fatal` if no worker is left to complete it
    pub fn flush(&self) -> AsyncResult<()> {
        if worker::is_worker_of(self.pool_id) {
            return Err(AsyncError::invalid_argument(
                "flush called from a worker of the same pool",
            ));
        }
        let shared = &self.shared;
        let mut guard = shared.state.lock();
        loop {
            if !shared.is_running() {
                return Err(AsyncError::shut_down());
            }
            if guard.flush.request() {
                break;
            }
            shared.flush_cond.wait_for(&mut guard, shared.config.flush_wait);
        }

        guard.queue.push_flush();
        debug!(pool = self.pool_id, queued = guard.queue.len(), "flush requested");
        shared.work_ready.notify_one();

        let rendezvous = loop {
            if let Some(rendezvous) = guard.flush.take_complete() {
                break rendezvous;
            }
            let running = shared.is_running();
            if !running || guard.live_workers == 0 {
                guard.queue.remove_flush();
                guard.flush.abandon();
                shared.flush_cond.notify_all();
                return Err(if running {
                    AsyncError::fatal("no live workers to complete the flush")
                } else {
                    AsyncError::shut_down()
                });
            }
            shared.flush_cond.wait_for(&mut guard, shared.config.flush_wait);
        };
        shared.flush_cond.notify_all();
        drop(guard);

        shared.stats.record_flush(rendezvous);
        debug!(pool = self.pool_id, rendezvous, "flush complete");
        Ok(())
    }

    /// Stops the pool and joins every worker.
    ///
    /// With `drain_on_shutdown` the queue is flushed first. Operations still
    /// queued afterwards are returned to FREE and their callbacks told the
    /// pool is shut down. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if !self.shared.is_running() {
            return;
        }
        if self.shared.config.drain_on_shutdown {
            if let Err(err) = self.flush() {
                warn!(pool = self.pool_id, error = %err, "drain before shutdown failed");
            }
        }
        if !self.shared.stop() {
            return;
        }
        {
            let _guard = self.shared.state.lock();
            self.shared.work_ready.notify_all();
            self.shared.flush_cond.notify_all();
        }

        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!(pool = self.pool_id, "worker thread panicked");
            }
        }

        let leftovers = self.shared.state.lock().queue.drain_ops();
        self.shared.stats.set_queue_depth(0);
        if !leftovers.is_empty() {
            warn!(
                pool = self.pool_id,
                count = leftovers.len(),
                "cancelling operations queued at shutdown"
            );
            for op in &leftovers {
                executor::cancel(op, AsyncError::shut_down(), &self.shared.stats);
            }
        }
        info!(pool = self.pool_id, "async pool stopped");
    }

    /// Returns true until [`AsyncPool::shutdown`] runs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Returns a snapshot of the pool counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Returns the number of operations waiting in the queue.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.shared.state.lock().queue.ops_len()
    }

    /// Returns the number of workers still serving the queue.
    #[must_use]
    pub fn live_workers(&self) -> usize {
        self.shared.state.lock().live_workers
    }

    /// Returns the engine the pool runs against.
    #[must_use]
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Returns the pool configuration.
    #[must_use]
    pub fn config(&self) -> &AsyncConfig {
        &self.shared.config
    }
}

impl<E: StoreEngine> Drop for AsyncPool<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<E: StoreEngine> std::fmt::Debug for AsyncPool<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncPool")
            .field("pool_id", &self.pool_id)
            .field("workers", &self.shared.config.workers)
            .field("running", &self.is_running())
            .finish()
    }
}
