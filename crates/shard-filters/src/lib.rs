//! # Shard Filters
//!
//! Answers "is this credential's digest in a known-compromised corpus?"
//! without holding the corpus in memory. The SHA-1 digest keyspace is split
//! into 256 shards by its first two hex characters; each shard is a bloom
//! filter built once offline and queried many times.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `Digest`: SHA-1 digest as 40 uppercase hex characters
//!   - `ShardKey` / `route`: digest → one of 256 shards
//!   - `BloomFilter`: Core probabilistic data structure
//!   - `codec`: Self-describing, versioned shard file encoding
//!   - `BuildConfig`: Sizing configuration with validation
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `BreachFilterApi`: Driving port (membership queries)
//!   - `ShardStore`: Driven port (shard persistence)
//!   - `CorpusSource`: Driven port (corpus digests)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `FilterBuilder` / `BuiltFilters`: Build pipeline
//!   - `QueryEngine`: Implements `BreachFilterApi`
//!
//! - **Adapters Layer** (`adapters/`): Stores, corpus readers, filter cache
//!
//! ## Invariants
//!
//! - No false negatives: a digest inserted at build time is always found
//!   after encode/decode
//! - Shard isolation: inserting a digest only touches its own shard
//! - Decode failures are errors, never a negative answer
//!
//! ## Usage Example
//!
//! ```ignore
//! use shard_filters::{build_filters, BreachFilterApi, BuildConfig, CorpusFile, FsShardStore, QueryEngine};
//!
//! let store = FsShardStore::new("bloom_filters");
//! let sources = vec![CorpusFile::new("pwned-passwords.txt")];
//! build_filters(&BuildConfig::default(), &sources)?.persist(&store)?;
//!
//! let engine = QueryEngine::new(store);
//! assert!(engine.check_secret(b"password")?);
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::{CorpusFile, FilterCache, FsShardStore, InMemoryCorpus, InMemoryShardStore};
pub use domain::{
    route, BloomFilter, BuildConfig, BuildConfigBuilder, BuildManifest, Digest, QueryConfig,
    ShardKey, ShardSizing, ShardSummary, Sizing, SHARD_COUNT,
};
pub use error::{DecodeError, DigestFault, FilterError};
pub use metrics::{Metrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use ports::{BreachFilterApi, CorpusSource, ShardStore};
pub use service::{build_filters, count_shards, BuiltFilters, FilterBuilder, QueryEngine};
