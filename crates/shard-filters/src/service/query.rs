//! Query pipeline
//!
//! `Received → Hashed → Routed → Loaded → Decoded → Tested → Responded`
//!
//! Any stage may fail; the failure is returned as-is and no partial answer
//! is produced. Queries share no mutable state apart from the optional
//! decoded-filter cache, so any number may run in parallel.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::adapters::FilterCache;
use crate::domain::{codec, route, BloomFilter, Digest, QueryConfig, ShardKey};
use crate::error::FilterError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::{BreachFilterApi, ShardStore};

/// Answers membership queries against a shard store
pub struct QueryEngine<S: ShardStore> {
    store: S,
    cache: Option<FilterCache>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl<S: ShardStore> QueryEngine<S> {
    /// Engine that decodes the shard afresh on every query
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: None,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Engine configured from `config` (cache size)
    pub fn with_config(store: S, config: &QueryConfig) -> Self {
        let cache = (config.cache_capacity > 0).then(|| FilterCache::new(config.cache_capacity));
        Self {
            store,
            cache,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Attach a metrics recorder
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drop every cached filter
    pub fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Load and decode one shard, through the cache when enabled
    pub fn load_filter(&self, key: ShardKey) -> Result<Arc<BloomFilter>, FilterError> {
        let Some(cache) = &self.cache else {
            return self.decode_shard(key).map(Arc::new);
        };

        let generation = self.store.generation()?;
        if let Some(filter) = cache.get(key, generation) {
            self.metrics.record_cache_hit();
            debug!("shard {} served from cache", key);
            return Ok(filter);
        }

        let filter = Arc::new(self.decode_shard(key)?);
        cache.insert(key, generation, Arc::clone(&filter));
        Ok(filter)
    }

    fn decode_shard(&self, key: ShardKey) -> Result<BloomFilter, FilterError> {
        let bytes = self.store.get(key)?;
        debug!("decoding bloom filter from {} bytes", bytes.len());

        let start = Instant::now();
        let filter = codec::decode(&bytes)?;
        let elapsed = start.elapsed();
        self.metrics.record_shard_load(bytes.len(), elapsed);

        debug!(
            "decoded shard {} -> m: {} k: {} in {:?}",
            key,
            filter.size_bits(),
            filter.hash_count(),
            elapsed
        );
        Ok(filter)
    }
}

impl<S: ShardStore> BreachFilterApi for QueryEngine<S> {
    fn check_secret(&self, secret: &[u8]) -> Result<bool, FilterError> {
        let digest = Digest::of(secret);
        self.check_parsed(&digest)
    }

    fn check_parsed(&self, digest: &Digest) -> Result<bool, FilterError> {
        let start = Instant::now();
        let key = route(digest.as_str())?;
        let filter = self.load_filter(key)?;
        let found = filter.contains(digest.as_bytes());

        self.metrics.record_lookup(start.elapsed(), found);
        debug!("shard {} lookup -> found: {}", key, found);
        Ok(found)
    }
}
