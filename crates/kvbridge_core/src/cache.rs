//! Block cache resource.

use tracing::debug;

/// A block cache owned by exactly one session.
///
/// A zero capacity means no dedicated cache: the engine keeps its default.
#[derive(Debug)]
pub(crate) struct BlockCache {
    capacity: usize,
}

impl BlockCache {
    /// Allocates a cache of `capacity` bytes, or nothing for `0`.
    pub fn new(capacity: usize) -> Option<Self> {
        (capacity > 0).then(|| {
            debug!(capacity, "block cache allocated");
            Self { capacity }
        })
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hands the cache budget to the engine builder.
    pub fn configure(&self, builder: &mut redb::Builder) {
        builder.set_cache_size(self.capacity);
    }
}

impl Drop for BlockCache {
    fn drop(&mut self) {
        debug!(capacity = self.capacity, "block cache released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_no_cache() {
        assert!(BlockCache::new(0).is_none());
    }

    #[test]
    fn capacity_is_kept() {
        let cache = BlockCache::new(4 << 20).unwrap();
        assert_eq!(cache.capacity(), 4 << 20);
    }
}
