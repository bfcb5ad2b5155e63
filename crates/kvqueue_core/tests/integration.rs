//! Integration tests for the async pool against the in-memory engine.

use kvqueue_core::{
    AsyncCallback, AsyncConfig, AsyncError, AsyncOp, AsyncPool, AsyncResult, OpKind, OpOutcome,
    OpState,
};
use kvqueue_store::{InMemoryEngine, StoreError};
use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// One observed callback invocation.
#[derive(Debug, Clone)]
struct Completion {
    op: u64,
    worker: String,
    kind: OpKind,
    outcome: OpOutcome,
    found: Option<Vec<u8>>,
}

#[derive(Default)]
struct Recorder {
    completions: Mutex<Vec<Completion>>,
}

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn completions(&self) -> Vec<Completion> {
        self.completions.lock().clone()
    }
}

impl AsyncCallback for Recorder {
    fn notify(&self, op: &AsyncOp, outcome: &OpOutcome, _flags: u32) -> AsyncResult<()> {
        let found = match op.kind() {
            OpKind::Search => op.get_value().ok(),
            _ => None,
        };
        self.completions.lock().push(Completion {
            op: op.id(),
            worker: thread::current().name().unwrap_or("?").to_string(),
            kind: op.kind(),
            outcome: outcome.clone(),
            found,
        });
        Ok(())
    }
}

fn engine_with(tables: &[&str]) -> Arc<InMemoryEngine> {
    let engine = Arc::new(InMemoryEngine::new());
    for table in tables {
        engine.create_table(table).unwrap();
    }
    engine
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn insert_search_flush_scenario() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(2)).unwrap();
    let t = pool.target("t", "").unwrap();

    let insert = pool.insert(&t, b"a", b"1", None).unwrap();
    pool.flush().unwrap();
    let search = pool.search(&t, b"a", None).unwrap();
    pool.flush().unwrap();

    assert_eq!(search.get_value().unwrap(), b"1".to_vec());
    assert_eq!(insert.state(), OpState::Free);
    assert_eq!(search.state(), OpState::Free);

    let stats = pool.stats();
    assert!(stats.cursor_misses <= 2);
    assert_eq!(stats.executed, 2);
    assert_eq!(stats.flushes, 2);
}

#[test]
fn single_worker_scenario_with_one_flush() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(1)).unwrap();
    let t = pool.target("t", "").unwrap();
    let recorder = Recorder::new();

    let insert = pool.insert(&t, b"a", b"1", Some(recorder.clone())).unwrap();
    let search = pool.search(&t, b"a", Some(recorder.clone())).unwrap();
    pool.flush().unwrap();

    assert_eq!(search.get_value().unwrap(), b"1".to_vec());
    assert_eq!(insert.state(), OpState::Free);
    assert_eq!(search.state(), OpState::Free);
    let completions = recorder.completions();
    assert_eq!(completions.len(), 2);
    assert_eq!(completions[1].found, Some(b"1".to_vec()));
    assert_eq!(pool.stats().cursor_misses, 1);
}

#[test]
fn empty_flush_on_pool_of_four() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(engine, AsyncConfig::new().workers(4)).unwrap();

    pool.flush().unwrap();

    let stats = pool.stats();
    assert_eq!(stats.last_rendezvous, 4);
    assert_eq!(stats.executed, 0);
    assert_eq!(stats.commits + stats.rollbacks, 0);
}

#[test]
fn single_worker_flush() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(engine, AsyncConfig::new().workers(1)).unwrap();
    pool.flush().unwrap();
    pool.flush().unwrap();
    assert_eq!(pool.stats().last_rendezvous, 1);
}

#[test]
fn flush_waits_for_prior_operations() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(3)).unwrap();
    let t = pool.target("t", "").unwrap();

    let ops: Vec<_> = (0..200u32)
        .map(|i| pool.insert(&t, &i.to_be_bytes(), b"v", None).unwrap())
        .collect();
    pool.flush().unwrap();

    assert!(ops.iter().all(|op| op.state() == OpState::Free));
    assert_eq!(engine.len("t").unwrap(), 200);
    assert_eq!(pool.stats().executed, 200);
    assert_eq!(pool.queue_len(), 0);
}

#[test]
fn per_worker_fifo_and_no_double_execution() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(engine, AsyncConfig::new().workers(4)).unwrap();
    let t = pool.target("t", "").unwrap();
    let recorder = Recorder::new();
    let callback: Arc<dyn AsyncCallback> = recorder.clone();

    let mut submitted = Vec::new();
    for i in 0..400u32 {
        let key = (i % 17).to_be_bytes();
        let op = pool
            .insert(&t, &key, &i.to_be_bytes(), Some(Arc::clone(&callback)))
            .unwrap();
        submitted.push(op.id());
    }
    pool.flush().unwrap();

    let completions = recorder.completions();
    assert_eq!(completions.len(), submitted.len());

    let unique: HashSet<u64> = completions.iter().map(|c| c.op).collect();
    assert_eq!(unique.len(), submitted.len());

    let mut by_worker: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
    for completion in &completions {
        assert!(completion.worker.starts_with("kvqueue-worker-"));
        by_worker
            .entry(completion.worker.as_str())
            .or_default()
            .push(completion.op);
    }
    for (worker, ids) in by_worker {
        assert!(
            ids.windows(2).all(|pair| pair[0] < pair[1]),
            "{worker} completed out of order: {ids:?}"
        );
    }
}

#[test]
fn cursor_cache_is_idempotent() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(1)).unwrap();
    let t = pool.target("t", "").unwrap();
    let same = pool.target("t", " ").unwrap();

    pool.insert(&t, b"a", b"1", None).unwrap();
    pool.insert(&same, b"b", b"2", None).unwrap();
    pool.flush().unwrap();

    let stats = pool.stats();
    assert_eq!((stats.cursor_misses, stats.cursor_hits), (1, 1));
    assert_eq!(engine.stats().cursors_opened, 1);
}

#[test]
fn cursors_closed_at_shutdown() {
    let engine = engine_with(&["t", "u"]);
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(1)).unwrap();
    let t = pool.target("t", "").unwrap();
    let u = pool.target("u", "").unwrap();

    pool.insert(&t, b"a", b"1", None).unwrap();
    pool.insert(&u, b"a", b"1", None).unwrap();
    pool.shutdown();

    let stats = engine.stats();
    assert_eq!(stats.cursors_opened, 2);
    assert_eq!(stats.cursors_closed, 2);
}

#[test]
fn search_hit_and_miss_both_commit() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(1)).unwrap();
    let t = pool.target("t", "").unwrap();
    let recorder = Recorder::new();
    let callback: Arc<dyn AsyncCallback> = recorder.clone();

    pool.insert(&t, b"a", b"1", None).unwrap();
    pool.search(&t, b"a", Some(Arc::clone(&callback))).unwrap();
    let miss = pool.search(&t, b"zzz", Some(callback)).unwrap();
    pool.flush().unwrap();

    let completions = recorder.completions();
    assert_eq!(completions.len(), 2);
    assert_eq!(completions[0].outcome, OpOutcome::Success);
    assert_eq!(completions[0].found, Some(b"1".to_vec()));
    assert_eq!(completions[1].kind, OpKind::Search);
    assert_eq!(completions[1].outcome, OpOutcome::NotFound);
    assert_eq!(miss.get_value(), Err(AsyncError::NotFound));

    let stats = pool.stats();
    assert_eq!(stats.commits, 3);
    assert_eq!(stats.rollbacks, 0);
    assert_eq!(stats.not_found, 1);
    assert_eq!(engine.stats().transactions_committed, 3);
}

#[test]
fn callback_error_rolls_back_write() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(2)).unwrap();
    let t = pool.target("t", "").unwrap();
    let veto: Arc<dyn AsyncCallback> =
        Arc::new(|_: &AsyncOp, _: &OpOutcome, _: u32| -> AsyncResult<()> {
            Err(AsyncError::callback("rejected by application"))
        });

    let op = pool.insert(&t, b"a", b"1", Some(veto)).unwrap();
    pool.flush().unwrap();

    assert_eq!(op.state(), OpState::Free);
    assert_eq!(engine.get("t", b"a").unwrap(), None);
    let stats = pool.stats();
    assert_eq!(stats.rollbacks, 1);
    assert_eq!(stats.callback_errors, 1);
    assert_eq!(stats.succeeded, 1);
}

#[test]
fn unknown_table_reports_resource_unavailable() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(1)).unwrap();
    let missing = pool.target("no_such_table", "").unwrap();
    let recorder = Recorder::new();

    let op = pool
        .insert(&missing, b"a", b"1", Some(recorder.clone()))
        .unwrap();
    pool.flush().unwrap();

    let completions = recorder.completions();
    assert_eq!(completions.len(), 1);
    match &completions[0].outcome {
        OpOutcome::Failed(AsyncError::ResourceUnavailable { uri, source }) => {
            assert_eq!(uri, "no_such_table");
            assert!(matches!(source, StoreError::ResourceUnavailable { .. }));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(op.state(), OpState::Free);
    assert_eq!(pool.stats().rollbacks, 1);
    assert_eq!(engine.stats().transactions_rolled_back, 1);
}

#[test]
fn duplicate_key_without_overwrite_fails() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(1)).unwrap();
    let strict = pool.target("t", "overwrite=false").unwrap();
    let recorder = Recorder::new();

    pool.insert(&strict, b"a", b"1", Some(recorder.clone())).unwrap();
    pool.insert(&strict, b"a", b"2", Some(recorder.clone())).unwrap();
    pool.flush().unwrap();

    let outcomes: Vec<_> = recorder
        .completions()
        .into_iter()
        .map(|c| c.outcome)
        .collect();
    assert_eq!(
        outcomes,
        vec![
            OpOutcome::Success,
            OpOutcome::Failed(AsyncError::Store(StoreError::DuplicateKey))
        ]
    );
    assert_eq!(engine.get("t", b"a").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn remove_and_update_apply_in_order() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(1)).unwrap();
    let t = pool.target("t", "").unwrap();

    pool.insert(&t, b"a", b"1", None).unwrap();
    pool.update(&t, b"a", b"2", None).unwrap();
    pool.insert(&t, b"b", b"1", None).unwrap();
    pool.remove(&t, b"b", None).unwrap();
    let absent = pool.remove(&t, b"c", None).unwrap();
    pool.flush().unwrap();

    assert_eq!(engine.get("t", b"a").unwrap(), Some(b"2".to_vec()));
    assert_eq!(engine.get("t", b"b").unwrap(), None);
    assert_eq!(absent.state(), OpState::Free);
    assert_eq!(pool.stats().not_found, 1);
}

struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            open: Mutex::new(false),
            cond: Condvar::new(),
        })
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }

    fn open(&self) {
        *self.open.lock() = true;
        self.cond.notify_all();
    }
}

#[test]
fn full_queue_is_busy() {
    let engine = engine_with(&["t"]);
    let config = AsyncConfig::new().workers(1).ops_max(10);
    let pool = AsyncPool::new(engine, config).unwrap();
    let t = pool.target("t", "").unwrap();

    let gate = Gate::new();
    let blocker = Arc::clone(&gate);
    let hold: Arc<dyn AsyncCallback> =
        Arc::new(move |_: &AsyncOp, _: &OpOutcome, _: u32| -> AsyncResult<()> {
            blocker.wait();
            Ok(())
        });

    let first = pool.insert(&t, b"first", b"v", Some(hold)).unwrap();
    wait_until(|| first.state() == OpState::Working);

    for i in 0..10u32 {
        pool.insert(&t, &i.to_be_bytes(), b"v", None).unwrap();
    }
    assert_eq!(pool.queue_len(), 10);
    assert_eq!(
        pool.insert(&t, b"overflow", b"v", None).unwrap_err(),
        AsyncError::Busy { capacity: 10 }
    );

    gate.open();
    pool.flush().unwrap();

    let stats = pool.stats();
    assert_eq!(stats.busy_rejections, 1);
    assert_eq!(stats.executed, 11);
    assert_eq!(stats.max_queue_depth, 10);
}

#[test]
fn flush_not_refused_when_queue_full() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(engine, AsyncConfig::new().workers(1).ops_max(10)).unwrap();
    let t = pool.target("t", "").unwrap();

    for i in 0..10u32 {
        pool.insert(&t, &i.to_be_bytes(), b"v", None).unwrap();
    }
    pool.flush().unwrap();
    assert_eq!(pool.stats().executed, 10);
}

#[test]
fn concurrent_flushes_serialize() {
    let engine = engine_with(&["t"]);
    let pool = Arc::new(AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(3)).unwrap());

    let handles: Vec<_> = (0..4u32)
        .map(|thread_id| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let t = pool.target("t", "").unwrap();
                for round in 0..5u32 {
                    for i in 0..20u32 {
                        let key = [thread_id.to_be_bytes(), round.to_be_bytes(), i.to_be_bytes()].concat();
                        pool.insert(&t, &key, b"v", None).unwrap();
                    }
                    pool.flush().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = pool.stats();
    assert_eq!(stats.flushes, 20);
    assert_eq!(stats.last_rendezvous, 3);
    assert_eq!(engine.len("t").unwrap(), 400);
}

#[test]
fn shutdown_rejects_new_work() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(engine, AsyncConfig::new().workers(2)).unwrap();
    let t = pool.target("t", "").unwrap();
    pool.shutdown();

    let err = pool.search(&t, b"a", None).unwrap_err();
    assert!(matches!(err, AsyncError::InvalidArgument { .. }));
    assert!(matches!(pool.flush(), Err(AsyncError::InvalidArgument { .. })));
}

#[test]
fn shutdown_without_drain_cancels_queued_work() {
    let engine = engine_with(&["t"]);
    let config = AsyncConfig::new().workers(1).drain_on_shutdown(false);
    let pool = AsyncPool::new(Arc::clone(&engine), config).unwrap();
    let t = pool.target("t", "").unwrap();

    let gate = Gate::new();
    let blocker = Arc::clone(&gate);
    let hold: Arc<dyn AsyncCallback> =
        Arc::new(move |_: &AsyncOp, _: &OpOutcome, _: u32| -> AsyncResult<()> {
            blocker.wait();
            Ok(())
        });
    let recorder = Recorder::new();

    let first = pool.insert(&t, b"first", b"v", Some(hold)).unwrap();
    wait_until(|| first.state() == OpState::Working);
    let queued = pool.insert(&t, b"queued", b"v", Some(recorder.clone())).unwrap();

    let opener = Arc::clone(&gate);
    let release = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        opener.open();
    });
    pool.shutdown();
    release.join().unwrap();

    assert_eq!(first.state(), OpState::Free);
    assert_eq!(queued.state(), OpState::Free);
    assert_eq!(engine.get("t", b"first").unwrap(), Some(b"v".to_vec()));
    assert_eq!(engine.get("t", b"queued").unwrap(), None);

    let completions = recorder.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(
        completions[0].outcome,
        OpOutcome::Failed(AsyncError::shut_down())
    );
}

#[test]
fn resubmitted_descriptor_runs_again() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(2)).unwrap();
    let t = pool.target("t", "").unwrap();
    let recorder = Recorder::new();

    let op = pool.insert(&t, b"k", b"1", Some(recorder.clone())).unwrap();
    pool.flush().unwrap();
    pool.resubmit(&op, OpKind::Update, b"k", Some(b"2")).unwrap();
    pool.flush().unwrap();
    pool.resubmit(&op, OpKind::Search, b"k", None).unwrap();
    pool.flush().unwrap();

    assert_eq!(op.get_value().unwrap(), b"2".to_vec());
    let kinds: Vec<_> = recorder.completions().iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![OpKind::Insert, OpKind::Update, OpKind::Search]);
    assert!(recorder.completions().iter().all(|c| c.op == op.id()));
}

#[test]
fn descriptors_move_through_states_in_order() {
    let engine = engine_with(&["t"]);
    let pool = AsyncPool::new(engine, AsyncConfig::new().workers(1)).unwrap();
    let t = pool.target("t", "").unwrap();

    let gate = Gate::new();
    let blocker = Arc::clone(&gate);
    let hold: Arc<dyn AsyncCallback> =
        Arc::new(move |_: &AsyncOp, _: &OpOutcome, _: u32| -> AsyncResult<()> {
            blocker.wait();
            Ok(())
        });
    let inside = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&inside);
    let observe: Arc<dyn AsyncCallback> =
        Arc::new(move |op: &AsyncOp, _: &OpOutcome, _: u32| -> AsyncResult<()> {
            seen.lock().push(op.state());
            thread::sleep(Duration::from_millis(2));
            Ok(())
        });

    let first = pool.insert(&t, b"first", b"v", Some(hold)).unwrap();
    wait_until(|| first.state() == OpState::Working);

    let ops: Vec<_> = (0..5u32)
        .map(|i| {
            pool.insert(&t, &i.to_be_bytes(), b"v", Some(Arc::clone(&observe)))
                .unwrap()
        })
        .collect();
    assert!(ops.iter().all(|op| op.state() == OpState::Enqueued));

    let watched = Arc::clone(&ops[4]);
    let poller = thread::spawn(move || {
        let mut states = vec![watched.state()];
        while *states.last().unwrap() != OpState::Free {
            let state = watched.state();
            if states.last() != Some(&state) {
                states.push(state);
            }
        }
        states
    });

    gate.open();
    pool.flush().unwrap();
    let observed = poller.join().unwrap();

    assert_eq!(
        observed,
        vec![OpState::Enqueued, OpState::Working, OpState::Free]
    );
    assert_eq!(*inside.lock(), vec![OpState::Working; 5]);
    assert_eq!(first.state(), OpState::Free);
    assert!(ops.iter().all(|op| op.state() == OpState::Free));
}
