//! In-memory shard store for tests and embedding

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::RwLock;

use crate::domain::{BuildManifest, ShardKey};
use crate::error::FilterError;
use crate::ports::ShardStore;

/// Shard blobs kept in a map
#[derive(Default)]
pub struct InMemoryShardStore {
    shards: RwLock<HashMap<ShardKey, Vec<u8>>>,
    manifest: RwLock<Option<BuildManifest>>,
}

impl InMemoryShardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of shard blobs held
    pub fn len(&self) -> usize {
        self.shards.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.read().is_empty()
    }

    /// Drop one shard, as if its file had been deleted
    pub fn remove(&self, key: ShardKey) -> Option<Vec<u8>> {
        self.shards.write().remove(&key)
    }
}

impl ShardStore for InMemoryShardStore {
    fn prepare(&self) -> Result<(), FilterError> {
        Ok(())
    }

    fn put(&self, key: ShardKey, blob: &[u8]) -> Result<(), FilterError> {
        self.shards.write().insert(key, blob.to_vec());
        Ok(())
    }

    fn get(&self, key: ShardKey) -> Result<Vec<u8>, FilterError> {
        self.shards
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| FilterError::ShardNotFound {
                key,
                path: PathBuf::from(format!("memory://{}", key)),
            })
    }

    fn put_manifest(&self, manifest: &BuildManifest) -> Result<(), FilterError> {
        *self.manifest.write() = Some(manifest.clone());
        Ok(())
    }

    fn remove_manifest(&self) -> Result<(), FilterError> {
        *self.manifest.write() = None;
        Ok(())
    }

    fn manifest(&self) -> Result<Option<BuildManifest>, FilterError> {
        Ok(self.manifest.read().clone())
    }
}
