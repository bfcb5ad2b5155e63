//! Property-based test generators using proptest.
//!
//! Provides strategies for generating operation scripts, and a sequential
//! reference model to check a single-worker pool against.

use kvqueue_core::{AsyncConfig, OpKind, OpOutcome, MAX_OPS, MIN_OPS};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::ops::Range;

/// One generated submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedOp {
    /// Operation kind.
    pub kind: OpKind,
    /// Key bytes.
    pub key: Vec<u8>,
    /// Value bytes, present for insert and update.
    pub value: Option<Vec<u8>>,
}

/// Strategy for generating operation kinds.
pub fn op_kind_strategy() -> impl Strategy<Value = OpKind> {
    prop::sample::select(OpKind::ALL.to_vec())
}

/// Strategy for keys drawn from a space of `key_space` distinct keys.
///
/// A small key space makes collisions (updates, removes and search hits)
/// likely.
pub fn key_strategy(key_space: u16) -> impl Strategy<Value = Vec<u8>> {
    (0..key_space.max(1)).prop_map(|k| format!("k{k:05}").into_bytes())
}

/// Strategy for generating values (arbitrary bytes).
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Strategy for a single scripted operation.
pub fn scripted_op_strategy(key_space: u16) -> impl Strategy<Value = ScriptedOp> {
    (op_kind_strategy(), key_strategy(key_space), value_strategy()).prop_map(
        |(kind, key, value)| ScriptedOp {
            kind,
            key,
            value: kind.needs_value().then_some(value),
        },
    )
}

/// Strategy for a script of operations.
pub fn op_script_strategy(
    key_space: u16,
    len: Range<usize>,
) -> impl Strategy<Value = Vec<ScriptedOp>> {
    prop::collection::vec(scripted_op_strategy(key_space), len)
}

/// Strategy for valid pool configurations with small worker counts.
pub fn config_strategy() -> impl Strategy<Value = AsyncConfig> {
    (1usize..=6, MIN_OPS..=MAX_OPS.min(512))
        .prop_map(|(workers, ops_max)| AsyncConfig::new().workers(workers).ops_max(ops_max))
}

/// Expected result of one scripted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected {
    /// Outcome the callback should see.
    pub outcome: OpOutcome,
    /// Value a search should find.
    pub found: Option<Vec<u8>>,
}

/// A sequential key/value map that predicts what a pool with one worker
/// reports for each operation.
#[derive(Debug, Default, Clone)]
pub struct SequentialModel {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl SequentialModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one operation and returns what the pool should report.
    pub fn apply(&mut self, op: &ScriptedOp) -> Expected {
        let (outcome, found) = match op.kind {
            OpKind::Insert | OpKind::Update => {
                let value = op.value.clone().unwrap_or_default();
                self.data.insert(op.key.clone(), value);
                (OpOutcome::Success, None)
            }
            OpKind::Remove => match self.data.remove(&op.key) {
                Some(_) => (OpOutcome::Success, None),
                None => (OpOutcome::NotFound, None),
            },
            OpKind::Search => match self.data.get(&op.key) {
                Some(value) => (OpOutcome::Success, Some(value.clone())),
                None => (OpOutcome::NotFound, None),
            },
        };
        Expected { outcome, found }
    }

    /// Applies a whole script.
    pub fn run(&mut self, script: &[ScriptedOp]) -> Vec<Expected> {
        script.iter().map(|op| self.apply(op)).collect()
    }

    /// Returns the committed contents.
    pub fn data(&self) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        &self.data
    }
}
