//! Property-based test generators using proptest.

use kvbridge_core::WriteBatch;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for keys: short, non-empty, drawn from a small alphabet so
/// operations collide often.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"abcdef\x00\xff".to_vec()), 1..6)
}

/// Strategy for values, including the empty value.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        1 => Just(Vec::new()),
        4 => prop::collection::vec(any::<u8>(), 1..256),
    ]
}

/// A single write operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOp {
    /// Store a value.
    Put {
        /// Key
        key: Vec<u8>,
        /// Value
        value: Vec<u8>,
    },
    /// Remove a key.
    Delete {
        /// Key
        key: Vec<u8>,
    },
}

/// Strategy for write operations.
pub fn op_strategy() -> impl Strategy<Value = KvOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy()).prop_map(|(key, value)| KvOp::Put { key, value }),
        1 => key_strategy().prop_map(|key| KvOp::Delete { key }),
    ]
}

/// Strategy for a sequence of operations.
pub fn op_sequence_strategy(min_ops: usize, max_ops: usize) -> impl Strategy<Value = Vec<KvOp>> {
    prop::collection::vec(op_strategy(), min_ops..max_ops)
}

/// Builds a write batch from `ops`.
pub fn batch_from(ops: &[KvOp]) -> WriteBatch {
    let mut batch = WriteBatch::new();
    for op in ops {
        match op {
            KvOp::Put { key, value } => batch.put(key, value),
            KvOp::Delete { key } => batch.delete(key),
        };
    }
    batch
}

/// Applies `ops` to an in-memory model of the keyspace.
pub fn apply_to_model(model: &mut BTreeMap<Vec<u8>, Vec<u8>>, ops: &[KvOp]) {
    for op in ops {
        match op {
            KvOp::Put { key, value } => {
                model.insert(key.clone(), value.clone());
            }
            KvOp::Delete { key } => {
                model.remove(key);
            }
        }
    }
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 64,
            max_shrink_iters: 500,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 16,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
