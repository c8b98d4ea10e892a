//! Shard routing
//!
//! The digest keyspace is split into 256 shards by the first two hex
//! characters of the digest. SHA-1 output is uniform, so each shard holds
//! an expected 1/256 of the corpus.

use serde::{Deserialize, Serialize};

use super::digest::{self, Digest};
use crate::error::FilterError;

/// Number of shards
pub const SHARD_COUNT: usize = 256;

/// One of the 256 shard keys, `00` through `ff`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ShardKey(u8);

impl ShardKey {
    /// Shard key from its numeric index
    pub const fn from_index(index: u8) -> Self {
        Self(index)
    }

    /// Numeric index, usable to address a 256-entry table
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// All 256 keys in ascending order
    pub fn all() -> impl Iterator<Item = ShardKey> {
        (0..=u8::MAX).map(ShardKey)
    }

    /// Shard owning an already validated digest
    pub fn for_digest(digest: &Digest) -> Self {
        Self(digest.prefix_byte())
    }

    /// Parse a two-character shard name such as `aa`
    pub fn parse(name: &str) -> Result<Self, FilterError> {
        if name.len() != 2 || !name.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(FilterError::Input(format!(
                "invalid shard key {:?}: expected two hex characters",
                name
            )));
        }
        u8::from_str_radix(name, 16)
            .map(Self)
            .map_err(|e| FilterError::Input(format!("invalid shard key {:?}: {}", name, e)))
    }
}

impl std::fmt::Display for ShardKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

impl From<ShardKey> for String {
    fn from(key: ShardKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ShardKey {
    type Error = FilterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ShardKey::parse(&value)
    }
}

/// Route a digest string to its shard.
///
/// Fails with `DigestFormat` unless `digest` is exactly 40 hex characters.
pub fn route(digest: &str) -> Result<ShardKey, FilterError> {
    digest::validate(digest)?;
    ShardKey::parse(&digest[..2].to_ascii_lowercase())
}
