//! Domain Layer - Pure logic
//!
//! This layer contains:
//! - Digest computation and validation
//! - Shard routing
//! - Core Bloom filter, hash family and sizing math
//! - Shard file encoding and build manifest
//! - Configuration
//!
//! RULES:
//! - No I/O operations
//! - Pure functions where possible

pub mod bloom_filter;
pub mod codec;
pub mod config;
pub mod digest;
pub mod hash_functions;
pub mod manifest;
pub mod parameters;
pub mod shard_key;

pub use bloom_filter::BloomFilter;
pub use config::{BuildConfig, BuildConfigBuilder, QueryConfig, ShardSizing, Sizing};
pub use digest::{Digest, DIGEST_HEX_LEN};
pub use manifest::{BuildManifest, ShardSummary};
pub use parameters::{calculate_optimal_parameters, BloomFilterParams};
pub use shard_key::{route, ShardKey, SHARD_COUNT};
