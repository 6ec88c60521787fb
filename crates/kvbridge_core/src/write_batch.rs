//! Write batches.
//!
//! A batch is an ordered list of puts and deletes that [`Database::write`]
//! applies atomically. Writing does not consume the batch, so it can be
//! reused or cleared afterwards.
//!
//! [`Database::write`]: crate::Database::write

use crate::engine::Mutation;

/// A single batched operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Store `value` under `key`.
    Put {
        /// The key.
        key: Vec<u8>,
        /// The value, possibly empty.
        value: Vec<u8>,
    },
    /// Remove `key`.
    Delete {
        /// The key.
        key: Vec<u8>,
    },
}

impl BatchOp {
    /// The key this operation touches.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }

    pub(crate) fn as_mutation(&self) -> Mutation<'_> {
        match self {
            Self::Put { key, value } => Mutation::Put(key, value),
            Self::Delete { key } => Mutation::Delete(key),
        }
    }
}

/// An ordered sequence of put/delete operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a put. Key and value are copied into the batch.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> &mut Self {
        self.ops.push(BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
        self
    }

    /// Queues a put, or a delete when `value` is absent.
    pub fn put_opt(&mut self, key: &[u8], value: Option<&[u8]>) -> &mut Self {
        match value {
            Some(value) => self.put(key, value),
            None => self.delete(key),
        }
    }

    /// Queues a delete.
    pub fn delete(&mut self, key: &[u8]) -> &mut Self {
        self.ops.push(BatchOp::Delete { key: key.to_vec() });
        self
    }

    /// Drops every queued operation.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterates over the queued operations in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, BatchOp> {
        self.ops.iter()
    }
}

impl<'a> IntoIterator for &'a WriteBatch {
    type Item = &'a BatchOp;
    type IntoIter = std::slice::Iter<'a, BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
