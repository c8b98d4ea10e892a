//! Build manifest
//!
//! Written after all 256 shard files, so its presence marks a complete build.
//! The generation changes on every rebuild and lets long-lived readers drop
//! filters decoded from an older build.

use serde::{Deserialize, Serialize};

use super::codec::FORMAT_VERSION;
use super::hash_functions::HASH_FAMILY_MURMUR3_DOUBLE;
use super::ShardKey;

/// Summary of one persisted shard
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShardSummary {
    pub key: ShardKey,
    /// Digests routed to this shard, duplicates included
    pub elements: u64,
    pub size_bits: usize,
    pub hash_count: usize,
    /// Encoded file size
    pub bytes: usize,
    pub fill_ratio: f64,
    pub estimated_fpr: f64,
}

/// Manifest describing a complete build
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub format_version: u16,
    pub hash_family: u8,
    /// Monotonic build stamp (unix nanoseconds, bumped past the previous one)
    pub generation: u64,
    pub shards: Vec<ShardSummary>,
}

impl BuildManifest {
    pub fn new(generation: u64, shards: Vec<ShardSummary>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            hash_family: HASH_FAMILY_MURMUR3_DOUBLE,
            generation,
            shards,
        }
    }

    /// Total digests routed across all shards
    pub fn total_elements(&self) -> u64 {
        self.shards.iter().map(|s| s.elements).sum()
    }

    /// Summary for one shard
    pub fn shard(&self, key: ShardKey) -> Option<&ShardSummary> {
        self.shards.iter().find(|s| s.key == key)
    }
}
