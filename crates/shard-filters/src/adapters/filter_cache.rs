//! # Decoded Filter Cache (Rebuild-Aware LRU)
//!
//! Decoding a shard costs a full file read plus a copy of its bit array, so a
//! long-lived query service keeps recently used filters in memory.
//!
//! ## Rules
//!
//! - Populated on first use of a shard
//! - Every entry belongs to one store generation; when the store reports a
//!   different generation (a rebuild finished) the whole cache is flushed
//! - `clear()` flushes explicitly

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::domain::{BloomFilter, ShardKey, SHARD_COUNT};

struct CacheState {
    generation: Option<u64>,
    entries: LruCache<ShardKey, Arc<BloomFilter>>,
}

/// Bounded cache of decoded filters keyed by shard
pub struct FilterCache {
    state: Mutex<CacheState>,
}

impl FilterCache {
    /// Create a cache holding at most `capacity` filters (1..=256)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, SHARD_COUNT);
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                generation: None,
                entries: LruCache::new(cap),
            }),
        }
    }

    /// Look up a filter decoded from `generation`
    pub fn get(&self, key: ShardKey, generation: Option<u64>) -> Option<Arc<BloomFilter>> {
        let mut state = self.state.lock();
        Self::sync_generation(&mut state, generation);
        state.entries.get(&key).cloned()
    }

    /// Store a filter decoded from `generation`
    pub fn insert(&self, key: ShardKey, generation: Option<u64>, filter: Arc<BloomFilter>) {
        let mut state = self.state.lock();
        Self::sync_generation(&mut state, generation);
        state.entries.put(key, filter);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sync_generation(state: &mut CacheState, generation: Option<u64>) {
        if state.generation != generation {
            state.entries.clear();
            state.generation = generation;
        }
    }
}
