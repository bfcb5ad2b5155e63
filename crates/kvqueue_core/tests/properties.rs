//! Property tests: a single-worker pool behaves like a sequential map.

use kvqueue_core::{AsyncCallback, AsyncConfig, AsyncOp, AsyncPool, AsyncResult, OpKind, OpOutcome, OpState};
use kvqueue_store::InMemoryEngine;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Step {
    kind: OpKind,
    key: u8,
    value: u8,
}

fn arb_step() -> impl Strategy<Value = Step> {
    (
        prop::sample::select(OpKind::ALL.to_vec()),
        0u8..8,
        any::<u8>(),
    )
        .prop_map(|(kind, key, value)| Step { kind, key, value })
}

type Log = Arc<Mutex<Vec<(u64, OpOutcome, Option<Vec<u8>>)>>>;

fn logging_callback(log: &Log) -> Arc<dyn AsyncCallback> {
    let sink = Arc::clone(log);
    Arc::new(move |op: &AsyncOp, outcome: &OpOutcome, _flags: u32| -> AsyncResult<()> {
        let found = if op.kind() == OpKind::Search {
            op.get_value().ok()
        } else {
            None
        };
        sink.lock().push((op.id(), outcome.clone(), found));
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn single_worker_matches_sequential_model(steps in prop::collection::vec(arb_step(), 1..60)) {
        let engine = Arc::new(InMemoryEngine::new());
        engine.create_table("t").unwrap();
        let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(1)).unwrap();
        let t = pool.target("t", "").unwrap();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let callback = logging_callback(&log);

        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        let mut expected = Vec::new();
        let mut ops = Vec::new();
        for step in &steps {
            let key = vec![step.key];
            let value = vec![step.value];
            let outcome = match step.kind {
                OpKind::Insert | OpKind::Update => {
                    model.insert(key.clone(), value.clone());
                    (OpOutcome::Success, None)
                }
                OpKind::Remove => match model.remove(&key) {
                    Some(_) => (OpOutcome::Success, None),
                    None => (OpOutcome::NotFound, None),
                },
                OpKind::Search => match model.get(&key) {
                    Some(found) => (OpOutcome::Success, Some(found.clone())),
                    None => (OpOutcome::NotFound, None),
                },
            };
            let op = pool
                .submit(&t, step.kind, &key, Some(&value), Some(Arc::clone(&callback)))
                .unwrap();
            expected.push((op.id(), outcome.0, outcome.1));
            ops.push(op);
        }
        pool.flush().unwrap();

        prop_assert_eq!(log.lock().clone(), expected);
        prop_assert!(ops.iter().all(|op| op.state() == OpState::Free));
        for (key, value) in &model {
            prop_assert_eq!(engine.get("t", key).unwrap(), Some(value.clone()));
        }
        prop_assert_eq!(engine.len("t").unwrap(), model.len());

        let stats = pool.stats();
        prop_assert_eq!(stats.executed, steps.len() as u64);
        prop_assert_eq!(stats.commits, steps.len() as u64);
        prop_assert_eq!(stats.cursor_misses, 1);
    }

    #[test]
    fn every_operation_runs_once_on_any_pool(
        workers in 1usize..5,
        keys in prop::collection::vec(0u8..16, 1..80),
    ) {
        let engine = Arc::new(InMemoryEngine::new());
        engine.create_table("t").unwrap();
        let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(workers)).unwrap();
        let t = pool.target("t", "").unwrap();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let callback = logging_callback(&log);

        for key in &keys {
            pool.insert(&t, &[*key], b"v", Some(Arc::clone(&callback))).unwrap();
        }
        pool.flush().unwrap();

        let mut ids: Vec<u64> = log.lock().iter().map(|(id, _, _)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), keys.len());
        prop_assert_eq!(pool.stats().last_rendezvous, workers);
        prop_assert!(pool.stats().cursor_misses <= workers as u64);
    }
}
