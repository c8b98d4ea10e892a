//! Metrics hooks for build and query operations
//!
//! Provides instrumentation points for monitoring filter builds, shard loads
//! and lookup latencies.
//!
//! ## Usage
//!
//! ```ignore
//! use shard_filters::metrics::Metrics;
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(Metrics::new());
//! let engine = QueryEngine::new(store).with_metrics(metrics.clone());
//! engine.check_secret(b"hunter2")?;
//! println!("{:?}", metrics.snapshot());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector for shard filter operations
///
/// Thread-safe counters for monitoring filter performance.
#[derive(Default)]
pub struct Metrics {
    /// Shard filters sealed by the builder
    pub shards_built: AtomicU64,
    /// Digests inserted across all shards
    pub elements_inserted: AtomicU64,
    /// Lookups performed
    pub lookups_performed: AtomicU64,
    /// Positive lookups (matches, including false positives)
    pub lookups_positive: AtomicU64,
    /// Shard blobs loaded and decoded
    pub shard_loads: AtomicU64,
    /// Lookups answered from the decoded-filter cache
    pub cache_hits: AtomicU64,
    /// Bytes decoded
    pub bytes_decoded: AtomicU64,
    /// Cumulative decode time in nanoseconds
    pub decode_time_ns: AtomicU64,
    /// Cumulative lookup time in nanoseconds
    pub lookup_time_ns: AtomicU64,
}

impl Metrics {
    /// All counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every counter, with averages derived from the totals
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            shards_built: self.shards_built.load(Ordering::Relaxed),
            elements_inserted: self.elements_inserted.load(Ordering::Relaxed),
            lookups_performed: self.lookups_performed.load(Ordering::Relaxed),
            lookups_positive: self.lookups_positive.load(Ordering::Relaxed),
            shard_loads: self.shard_loads.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            avg_decode_ns: average(&self.decode_time_ns, &self.shard_loads),
            avg_lookup_ns: average(&self.lookup_time_ns, &self.lookups_performed),
        }
    }

    /// Ratio of positive lookups to total lookups
    pub fn observed_positive_rate(&self) -> f64 {
        let total = self.lookups_performed.load(Ordering::Relaxed);
        let positive = self.lookups_positive.load(Ordering::Relaxed);
        if total > 0 {
            positive as f64 / total as f64
        } else {
            0.0
        }
    }
}

fn average(total: &AtomicU64, count: &AtomicU64) -> u64 {
    let count = count.load(Ordering::Relaxed);
    if count > 0 {
        total.load(Ordering::Relaxed) / count
    } else {
        0
    }
}

/// Counter values at one instant
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub shards_built: u64,
    pub elements_inserted: u64,
    pub lookups_performed: u64,
    pub lookups_positive: u64,
    pub shard_loads: u64,
    pub cache_hits: u64,
    pub bytes_decoded: u64,
    pub avg_decode_ns: u64,
    pub avg_lookup_ns: u64,
}

/// Sink for build and query events
///
/// `Metrics` keeps in-process counters; embedders forward events to their
/// own exporter by implementing this.
pub trait MetricsRecorder: Send + Sync {
    /// A shard filter was sealed
    fn record_shard_built(&self, size_bits: usize, hash_count: usize);

    /// `count` digests were inserted
    fn record_inserts(&self, count: u64);

    /// A shard blob was loaded and decoded
    fn record_shard_load(&self, bytes: usize, decode: Duration);

    /// A lookup was served from the cache
    fn record_cache_hit(&self);

    /// A lookup completed
    fn record_lookup(&self, duration: Duration, found: bool);
}

/// Discards every event
#[derive(Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_shard_built(&self, _: usize, _: usize) {}
    fn record_inserts(&self, _: u64) {}
    fn record_shard_load(&self, _: usize, _: Duration) {}
    fn record_cache_hit(&self) {}
    fn record_lookup(&self, _: Duration, _: bool) {}
}

impl MetricsRecorder for Metrics {
    fn record_shard_built(&self, _size_bits: usize, _hash_count: usize) {
        self.shards_built.fetch_add(1, Ordering::Relaxed);
    }

    fn record_inserts(&self, count: u64) {
        self.elements_inserted.fetch_add(count, Ordering::Relaxed);
    }

    fn record_shard_load(&self, bytes: usize, decode: Duration) {
        self.shard_loads.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded.fetch_add(bytes as u64, Ordering::Relaxed);
        self.decode_time_ns
            .fetch_add(decode.as_nanos() as u64, Ordering::Relaxed);
    }

    fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_lookup(&self, duration: Duration, found: bool) {
        self.lookups_performed.fetch_add(1, Ordering::Relaxed);
        self.lookup_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        if found {
            self.lookups_positive.fetch_add(1, Ordering::Relaxed);
        }
    }
}
