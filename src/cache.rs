//! A small read-through LRU cache in front of block reads.
//!
//! This is a transparent accelerator, not a write-back cache: every write
//! still goes straight to disk (§4.3/§5 of the specification), and this
//! cache is only ever consulted to skip a redundant read. It exists because
//! `read_blocks` and `render_block` can be called repeatedly against the
//! same hot blocks, and a cache is squarely an ambient-performance concern.

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::block::Block;

/// Default number of blocks kept warm, matching the teacher crate's
/// `DEFAULT_CACHE_SIZE`.
pub const DEFAULT_CACHE_SIZE: usize = 8;

/// Read-through cache keyed by block id.
pub struct BlockCache {
    entries: LruCache<u64, Block>,
}

impl BlockCache {
    /// Creates a cache holding at most `capacity` blocks (clamped to at
    /// least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Returns a clone of the cached block, if present, promoting it to
    /// most-recently-used.
    pub fn get(&mut self, block_id: u64) -> Option<Block> {
        self.entries.get(&block_id).cloned()
    }

    /// Inserts or refreshes a block in the cache.
    pub fn put(&mut self, block_id: u64, block: Block) {
        self.entries.put(block_id, block);
    }

    /// Evicts a single block id, e.g. after a write, free, or reallocation.
    pub fn invalidate(&mut self, block_id: u64) {
        self.entries.pop(&block_id);
    }

    /// Drops every cached entry, e.g. after a crash-recovery reopen.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of blocks currently cached.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockHeader, BlockType};

    fn sample_block(id: u64) -> Block {
        Block {
            header: BlockHeader::new(BlockType::Document, id, 0),
            payload: vec![id as u8],
        }
    }

    #[test]
    fn caches_and_evicts_lru_order() {
        let mut cache = BlockCache::new(2);
        cache.put(1, sample_block(1));
        cache.put(2, sample_block(2));
        // Touch 1 so it's more recently used than 2.
        assert!(cache.get(1).is_some());
        cache.put(3, sample_block(3));
        // 2 should have been evicted, 1 and 3 remain.
        assert!(cache.get(2).is_none());
        assert!(cache.get(1).is_some());
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn invalidate_removes_single_entry() {
        let mut cache = BlockCache::new(4);
        cache.put(5, sample_block(5));
        cache.invalidate(5);
        assert!(cache.get(5).is_none());
    }
}
