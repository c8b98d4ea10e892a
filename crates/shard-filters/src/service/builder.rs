//! Filter build pipeline
//!
//! `Init → PerShardAccumulate → Serialized`
//!
//! - `FilterBuilder::new` creates 256 empty filters (Init)
//! - `insert` / `ingest` route digests into their shard (PerShardAccumulate)
//! - `seal` ends accumulation; `BuiltFilters` exposes no mutation
//! - `BuiltFilters::persist` encodes and writes every shard, then the
//!   manifest, and consumes the filters (Serialized)
//!
//! Each shard sits behind its own mutex, so sources can be ingested in
//! parallel: inserts into one shard are serialized, inserts into different
//! shards never contend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{
    codec, BloomFilter, BloomFilterParams, BuildConfig, BuildManifest, Digest, ShardKey,
    ShardSizing, ShardSummary, SHARD_COUNT,
};
use crate::error::FilterError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::{CorpusSource, ShardStore};

/// Estimated FPR above `target * DRIFT_TOLERANCE` is reported as drift
pub const DRIFT_TOLERANCE: f64 = 1.5;

/// Per-shard element counts from a counting pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardCounts([u64; SHARD_COUNT]);

impl Default for ShardCounts {
    fn default() -> Self {
        Self([0; SHARD_COUNT])
    }
}

impl ShardCounts {
    pub fn get(&self, key: ShardKey) -> u64 {
        self.0[key.index()]
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    fn add(&mut self, other: &ShardCounts) {
        for (mine, theirs) in self.0.iter_mut().zip(other.0.iter()) {
            *mine += theirs;
        }
    }
}

/// Count digests per shard without building filters
pub fn count_shards<C: CorpusSource>(sources: &[C]) -> Result<ShardCounts, FilterError> {
    let partials = sources
        .par_iter()
        .map(|source| -> Result<ShardCounts, FilterError> {
            let mut counts = ShardCounts::default();
            for digest in source.digests()? {
                counts.0[ShardKey::for_digest(&digest?).index()] += 1;
            }
            info!("Counted {} digests in {}", counts.total(), source.name());
            Ok(counts)
        })
        .collect::<Result<Vec<_>, FilterError>>()?;

    let mut total = ShardCounts::default();
    for partial in &partials {
        total.add(partial);
    }
    Ok(total)
}

/// Build all 256 filters from `sources` according to `config`.
///
/// Per-shard sizing reads the sources twice: once to count, once to insert.
pub fn build_filters<C: CorpusSource>(
    config: &BuildConfig,
    sources: &[C],
) -> Result<BuiltFilters, FilterError> {
    let builder = match config.strategy {
        ShardSizing::Uniform => FilterBuilder::new(config.clone())?,
        ShardSizing::PerShard => {
            let counts = count_shards(sources)?;
            FilterBuilder::with_shard_counts(config.clone(), &counts)?
        }
    };
    builder.ingest_all(sources)?;
    Ok(builder.seal())
}

struct ShardAccumulator {
    filter: BloomFilter,
    elements: u64,
}

/// Accumulates corpus digests into 256 shard filters
pub struct FilterBuilder {
    config: BuildConfig,
    shards: Vec<Mutex<ShardAccumulator>>,
    processed: AtomicU64,
    metrics: Arc<dyn MetricsRecorder>,
}

impl FilterBuilder {
    /// Create 256 empty filters sharing the configured parameters
    pub fn new(config: BuildConfig) -> Result<Self, FilterError> {
        config.validate()?;
        let params = config.uniform_parameters();
        info!(
            "Creating bloom filters with parameters --> n: {} m: {} k: {}",
            config.expected_elements, params.size_bits, params.hash_count
        );
        Ok(Self::from_parameters(config, |_| params))
    }

    /// Create 256 empty filters, each sized from its counted population
    pub fn with_shard_counts(
        config: BuildConfig,
        counts: &ShardCounts,
    ) -> Result<Self, FilterError> {
        config.validate()?;
        info!(
            "Creating per-shard sized bloom filters for {} digests",
            counts.total()
        );
        let sizing = config.clone();
        Ok(Self::from_parameters(config, |key| {
            sizing.shard_parameters(counts.get(key) as usize)
        }))
    }

    fn from_parameters(
        config: BuildConfig,
        params: impl Fn(ShardKey) -> BloomFilterParams,
    ) -> Self {
        let shards = ShardKey::all()
            .map(|key| {
                Mutex::new(ShardAccumulator {
                    filter: BloomFilter::from_params(&params(key)),
                    elements: 0,
                })
            })
            .collect();
        info!("Bloom filter buckets: {}", SHARD_COUNT);

        Self {
            config,
            shards,
            processed: AtomicU64::new(0),
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Attach a metrics recorder
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Route a digest to its shard and insert it
    pub fn insert(&self, digest: &Digest) {
        let key = ShardKey::for_digest(digest);
        {
            let mut shard = self.shards[key.index()].lock();
            shard.filter.insert(digest.as_bytes());
            shard.elements += 1;
        }
        self.metrics.record_inserts(1);
    }

    /// Stream every digest of one source into the filters
    pub fn ingest(&self, source: &dyn CorpusSource) -> Result<u64, FilterError> {
        info!("Reading hashes from {}", source.name());
        let mut inserted = 0u64;
        for digest in source.digests()? {
            self.insert(&digest?);
            inserted += 1;

            let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
            if processed % self.config.progress_interval == 0 {
                info!("Processed {} hashes...", processed);
            }
        }

        info!("Added {} hashes from {}", inserted, source.name());
        Ok(inserted)
    }

    /// Ingest several sources in parallel, one task per source
    pub fn ingest_all<C: CorpusSource>(&self, sources: &[C]) -> Result<u64, FilterError> {
        let counts = sources
            .par_iter()
            .map(|source| self.ingest(source))
            .collect::<Result<Vec<u64>, FilterError>>()?;
        Ok(counts.iter().sum())
    }

    /// End accumulation
    pub fn seal(self) -> BuiltFilters {
        let shards = ShardKey::all()
            .zip(self.shards)
            .map(|(key, shard)| {
                let shard = shard.into_inner();
                self.metrics
                    .record_shard_built(shard.filter.size_bits(), shard.filter.hash_count());
                BuiltShard {
                    key,
                    filter: shard.filter,
                    elements: shard.elements,
                }
            })
            .collect();

        BuiltFilters {
            config: self.config,
            shards,
        }
    }
}

/// One sealed shard
#[derive(Clone, Debug)]
pub struct BuiltShard {
    key: ShardKey,
    filter: BloomFilter,
    elements: u64,
}

impl BuiltShard {
    pub fn key(&self) -> ShardKey {
        self.key
    }

    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }

    /// Digests routed to this shard, duplicates included
    pub fn elements(&self) -> u64 {
        self.elements
    }
}

/// Sealed filters for all 256 shards, ready to persist
pub struct BuiltFilters {
    config: BuildConfig,
    shards: Vec<BuiltShard>,
}

impl BuiltFilters {
    pub fn shard(&self, key: ShardKey) -> &BuiltShard {
        &self.shards[key.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuiltShard> {
        self.shards.iter()
    }

    /// Test a digest against its shard before persisting
    pub fn contains(&self, digest: &Digest) -> bool {
        self.shard(ShardKey::for_digest(digest))
            .filter
            .contains(digest.as_bytes())
    }

    pub fn total_elements(&self) -> u64 {
        self.shards.iter().map(|s| s.elements).sum()
    }

    /// Encode and write every shard, then the manifest.
    ///
    /// The previous manifest is removed before the first shard write and the
    /// new one is written only after all shard writes succeed, so a failed
    /// rebuild leaves the store without a manifest.
    pub fn persist<S: ShardStore + ?Sized>(
        self,
        store: &S,
    ) -> Result<BuildManifest, FilterError> {
        info!("Serialising {} bloom filters...", self.shards.len());
        store.prepare()?;

        let previous = match store.generation() {
            Ok(generation) => generation,
            Err(e) => {
                warn!("ignoring unreadable previous manifest: {}", e);
                None
            }
        };

        // Shards are about to change: the old manifest no longer describes them
        store.remove_manifest()?;

        let target = self.config.target_fpr();
        let summaries = self
            .shards
            .par_iter()
            .map(|shard| -> Result<ShardSummary, FilterError> {
                let encoded = codec::encode(&shard.filter);
                store.put(shard.key, &encoded)?;
                Ok(summarize(shard, encoded.len(), target))
            })
            .collect::<Result<Vec<ShardSummary>, FilterError>>()?;

        let manifest = BuildManifest::new(next_generation(previous), summaries);
        store.put_manifest(&manifest)?;
        info!(
            "Wrote {} shards holding {} hashes (generation {})",
            manifest.shards.len(),
            manifest.total_elements(),
            manifest.generation
        );
        Ok(manifest)
    }
}

fn summarize(shard: &BuiltShard, bytes: usize, target: Option<f64>) -> ShardSummary {
    let fill_ratio = shard.filter.fill_ratio();
    let estimated_fpr = shard.filter.estimated_fpr();

    info!(
        "bucket: {} elements: {} encoded bytes: {} fill: {:.4} est. fpr: {:.6}",
        shard.key, shard.elements, bytes, fill_ratio, estimated_fpr
    );
    if let Some(target) = target {
        if estimated_fpr > target * DRIFT_TOLERANCE {
            warn!(
                "bucket {} estimated fpr {:.6} exceeds target {} (population {})",
                shard.key, estimated_fpr, target, shard.elements
            );
        }
    }

    ShardSummary {
        key: shard.key,
        elements: shard.elements,
        size_bits: shard.filter.size_bits(),
        hash_count: shard.filter.hash_count(),
        bytes,
        fill_ratio,
        estimated_fpr,
    }
}

fn next_generation(previous: Option<u64>) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    match previous {
        Some(prev) => now.max(prev.saturating_add(1)),
        None => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::adapters::{InMemoryCorpus, InMemoryShardStore};
    use crate::domain::{codec, Sizing};
    use crate::metrics::Metrics;

    /// Memory store whose writes to one shard fail once `armed` is set
    struct FailingStore {
        inner: InMemoryShardStore,
        broken: ShardKey,
        armed: std::sync::atomic::AtomicBool,
    }

    impl FailingStore {
        fn new(broken: ShardKey) -> Self {
            Self {
                inner: InMemoryShardStore::new(),
                broken,
                armed: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn arm(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }
    }

    impl ShardStore for FailingStore {
        fn prepare(&self) -> Result<(), FilterError> {
            self.inner.prepare()
        }

        fn put(&self, key: ShardKey, blob: &[u8]) -> Result<(), FilterError> {
            if key == self.broken && self.armed.load(Ordering::SeqCst) {
                return Err(FilterError::io(
                    PathBuf::from(format!("memory://{}", key)),
                    std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                ));
            }
            self.inner.put(key, blob)
        }

        fn get(&self, key: ShardKey) -> Result<Vec<u8>, FilterError> {
            self.inner.get(key)
        }

        fn put_manifest(&self, manifest: &BuildManifest) -> Result<(), FilterError> {
            self.inner.put_manifest(manifest)
        }

        fn remove_manifest(&self) -> Result<(), FilterError> {
            self.inner.remove_manifest()
        }

        fn manifest(&self) -> Result<Option<BuildManifest>, FilterError> {
            self.inner.manifest()
        }
    }

    fn small_config() -> BuildConfig {
        BuildConfig {
            expected_elements: 64,
            sizing: Sizing::TargetFpr(0.01),
            strategy: ShardSizing::Uniform,
            progress_interval: 10,
        }
    }

    fn digests(n: u32) -> Vec<Digest> {
        (0..n).map(|i| Digest::of(format!("secret-{}", i).as_bytes())).collect()
    }

    #[test]
    fn test_new_creates_256_empty_shards() {
        let built = FilterBuilder::new(small_config()).unwrap().seal();

        assert_eq!(built.iter().count(), SHARD_COUNT);
        let params = small_config().uniform_parameters();
        for shard in built.iter() {
            assert_eq!(shard.filter().bits_set(), 0);
            assert_eq!(shard.filter().size_bits(), params.size_bits);
            assert_eq!(shard.filter().hash_count(), params.hash_count);
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = BuildConfig {
            sizing: Sizing::TargetFpr(2.0),
            ..small_config()
        };
        assert!(matches!(
            FilterBuilder::new(config),
            Err(FilterError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_insert_touches_only_owning_shard() {
        let builder = FilterBuilder::new(small_config()).unwrap();
        let digest = Digest::parse("AA00000000000000000000000000000000000001").unwrap();
        builder.insert(&digest);
        let built = builder.seal();

        let owner = ShardKey::from_index(0xaa);
        for shard in built.iter() {
            if shard.key() == owner {
                assert!(shard.filter().bits_set() > 0);
                assert_eq!(shard.elements(), 1);
            } else {
                assert_eq!(shard.filter().bits_set(), 0, "shard {} changed", shard.key());
            }
        }
        assert!(built.contains(&digest));
    }

    #[test]
    fn test_ingest_all_parallel_sources() {
        let all = digests(600);
        let sources = vec![
            InMemoryCorpus::from_digests("a", &all[..200]),
            InMemoryCorpus::from_digests("b", &all[200..400]),
            InMemoryCorpus::from_digests("c", &all[400..]),
        ];

        let builder = FilterBuilder::new(small_config()).unwrap();
        assert_eq!(builder.ingest_all(&sources).unwrap(), 600);
        let built = builder.seal();

        assert_eq!(built.total_elements(), 600);
        for digest in &all {
            assert!(built.contains(digest), "False negative for {}", digest);
        }
    }

    #[test]
    fn test_ingest_fails_on_bad_line() {
        let builder = FilterBuilder::new(small_config()).unwrap();
        let source = InMemoryCorpus::new("bad", "AA0000000000000000000000000000000000000\n");

        assert!(matches!(
            builder.ingest(&source),
            Err(FilterError::DigestFormat { .. })
        ));
    }

    #[test]
    fn test_count_shards_matches_routing() {
        let all = digests(300);
        let sources = vec![InMemoryCorpus::from_digests("a", &all)];

        let counts = count_shards(&sources).unwrap();
        assert_eq!(counts.total(), 300);
        let key = ShardKey::for_digest(&all[0]);
        let expected = all.iter().filter(|d| ShardKey::for_digest(d) == key).count() as u64;
        assert_eq!(counts.get(key), expected);
    }

    #[test]
    fn test_per_shard_sizing_follows_population() {
        let mut lines = String::new();
        for i in 0..50u32 {
            lines.push_str(&format!("AA{:038X}\n", i));
        }
        lines.push_str(&format!("BB{:038X}\n", 1));
        let sources = vec![InMemoryCorpus::new("skewed", lines)];
        let config = BuildConfig {
            strategy: ShardSizing::PerShard,
            ..small_config()
        };

        let built = build_filters(&config, &sources).unwrap();
        let heavy = built.shard(ShardKey::from_index(0xaa)).filter().size_bits();
        let light = built.shard(ShardKey::from_index(0xbb)).filter().size_bits();
        let empty = built.shard(ShardKey::from_index(0x00)).filter().size_bits();

        assert!(heavy > light, "heavier shard must get more bits");
        assert_eq!(light, empty, "one element and none are sized alike");
        assert_eq!(built.total_elements(), 51);
    }

    #[test]
    fn test_persist_writes_every_shard_and_manifest() {
        let all = digests(100);
        let sources = vec![InMemoryCorpus::from_digests("a", &all)];
        let built = build_filters(&small_config(), &sources).unwrap();
        let store = InMemoryShardStore::new();

        let manifest = built.persist(&store).unwrap();

        assert_eq!(store.len(), SHARD_COUNT);
        assert_eq!(manifest.shards.len(), SHARD_COUNT);
        assert_eq!(manifest.total_elements(), 100);
        assert_eq!(store.manifest().unwrap(), Some(manifest));

        let digest = &all[0];
        let blob = store.get(ShardKey::for_digest(digest)).unwrap();
        let filter = codec::decode(&blob).unwrap();
        assert!(filter.contains(digest.as_bytes()));
    }

    #[test]
    fn test_rebuild_bumps_generation() {
        let store = InMemoryShardStore::new();
        let first = FilterBuilder::new(small_config())
            .unwrap()
            .seal()
            .persist(&store)
            .unwrap();
        let second = FilterBuilder::new(small_config())
            .unwrap()
            .seal()
            .persist(&store)
            .unwrap();

        assert!(second.generation > first.generation);
    }

    #[test]
    fn test_failed_rebuild_leaves_no_manifest() {
        let store = FailingStore::new(ShardKey::from_index(0x80));
        let sources = vec![InMemoryCorpus::from_digests("a", &digests(50))];

        build_filters(&small_config(), &sources)
            .unwrap()
            .persist(&store)
            .unwrap();
        assert!(store.generation().unwrap().is_some());

        store.arm();
        let rebuild = build_filters(&small_config(), &sources)
            .unwrap()
            .persist(&store);

        assert!(matches!(rebuild, Err(FilterError::Io { .. })));
        assert!(
            store.manifest().unwrap().is_none(),
            "a partial rebuild must not keep vouching for the shard files"
        );
    }

    #[test]
    fn test_builder_reports_metrics() {
        let metrics = Arc::new(Metrics::new());
        let all = digests(120);
        let sources = vec![
            InMemoryCorpus::from_digests("a", &all[..70]),
            InMemoryCorpus::from_digests("b", &all[70..]),
        ];

        let builder = FilterBuilder::new(small_config())
            .unwrap()
            .with_metrics(metrics.clone());
        builder.ingest_all(&sources).unwrap();
        builder.insert(&Digest::of(b"one more"));
        builder.seal();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.shards_built, SHARD_COUNT as u64);
        assert_eq!(
            snapshot.elements_inserted, 121,
            "direct inserts count alongside streamed ones"
        );
    }

    #[test]
    fn test_next_generation_is_monotonic() {
        let far_future = u64::MAX - 1;
        assert_eq!(next_generation(Some(far_future)), u64::MAX);
        assert!(next_generation(None) > 0);
    }
}
