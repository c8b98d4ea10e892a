//! Outbound Ports (Driven Ports)
//!
//! Dependencies the build and query pipelines need from their host: durable
//! storage for shard files and a source of corpus digests.

use crate::domain::{BuildManifest, Digest, ShardKey};
use crate::error::FilterError;

/// Key-value store of serialized shard filters (Driven Port)
///
/// Production: `FsShardStore` (one file per shard under a root directory)
/// Testing: `InMemoryShardStore`
pub trait ShardStore: Send + Sync {
    /// Make the store ready for writes (e.g. create the root directory)
    fn prepare(&self) -> Result<(), FilterError>;

    /// Write one shard blob, replacing any previous one
    fn put(&self, key: ShardKey, blob: &[u8]) -> Result<(), FilterError>;

    /// Read one shard blob; `ShardNotFound` if it was never written
    fn get(&self, key: ShardKey) -> Result<Vec<u8>, FilterError>;

    /// Record a completed build. Called after every shard is written.
    fn put_manifest(&self, manifest: &BuildManifest) -> Result<(), FilterError>;

    /// Forget the last completed build. Called before the first shard write
    /// of a rebuild; a missing manifest is not an error.
    fn remove_manifest(&self) -> Result<(), FilterError>;

    /// Manifest of the last completed build, if any
    fn manifest(&self) -> Result<Option<BuildManifest>, FilterError>;

    /// Generation of the last completed build, if any
    fn generation(&self) -> Result<Option<u64>, FilterError> {
        Ok(self.manifest()?.map(|m| m.generation))
    }
}

/// Stream of parsed corpus digests
pub type DigestStream<'a> = Box<dyn Iterator<Item = Result<Digest, FilterError>> + Send + 'a>;

/// Re-readable source of corpus digests (Driven Port)
///
/// Per-shard sizing reads every source twice, so `digests()` must start a
/// fresh pass on each call. Sources stream; they never hold the corpus.
pub trait CorpusSource: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> String;

    /// Start a pass over the digests
    fn digests(&self) -> Result<DigestStream<'_>, FilterError>;
}

impl<T: ShardStore + ?Sized> ShardStore for std::sync::Arc<T> {
    fn prepare(&self) -> Result<(), FilterError> {
        (**self).prepare()
    }

    fn put(&self, key: ShardKey, blob: &[u8]) -> Result<(), FilterError> {
        (**self).put(key, blob)
    }

    fn get(&self, key: ShardKey) -> Result<Vec<u8>, FilterError> {
        (**self).get(key)
    }

    fn put_manifest(&self, manifest: &BuildManifest) -> Result<(), FilterError> {
        (**self).put_manifest(manifest)
    }

    fn remove_manifest(&self) -> Result<(), FilterError> {
        (**self).remove_manifest()
    }

    fn manifest(&self) -> Result<Option<BuildManifest>, FilterError> {
        (**self).manifest()
    }

    fn generation(&self) -> Result<Option<u64>, FilterError> {
        (**self).generation()
    }
}
