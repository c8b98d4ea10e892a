//! Filesystem shard store
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/00.dat ... <root>/ff.dat   one encoded filter per shard
//! <root>/MANIFEST.json              written last, marks a complete build
//! ```
//!
//! Writes go to a temporary file first and are renamed into place, so a
//! reader never sees a half-written shard.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::debug;

use crate::domain::{BuildManifest, ShardKey};
use crate::error::{DecodeError, FilterError};
use crate::ports::ShardStore;

/// Extension of shard files
pub const SHARD_EXTENSION: &str = "dat";
/// Manifest file name
pub const MANIFEST_FILE: &str = "MANIFEST.json";

/// Shard store backed by a directory
#[derive(Clone, Debug)]
pub struct FsShardStore {
    root: PathBuf,
}

impl FsShardStore {
    /// Create a store rooted at `root`. Nothing is touched on disk until
    /// `prepare` or a read.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a shard file, e.g. `<root>/aa.dat`
    pub fn shard_path(&self, key: ShardKey) -> PathBuf {
        self.root.join(format!("{}.{}", key, SHARD_EXTENSION))
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FilterError> {
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| FilterError::io(&temp_path, e))?;
        file.write_all(data)
            .map_err(|e| FilterError::io(&temp_path, e))?;
        file.sync_all().map_err(|e| FilterError::io(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| FilterError::io(path, e))
    }
}

impl ShardStore for FsShardStore {
    fn prepare(&self) -> Result<(), FilterError> {
        fs::create_dir_all(&self.root).map_err(|e| FilterError::io(&self.root, e))
    }

    fn put(&self, key: ShardKey, blob: &[u8]) -> Result<(), FilterError> {
        let path = self.shard_path(key);
        self.write_atomic(&path, blob)?;
        debug!("wrote shard {} ({} bytes) to {}", key, blob.len(), path.display());
        Ok(())
    }

    fn get(&self, key: ShardKey) -> Result<Vec<u8>, FilterError> {
        let path = self.shard_path(key);
        let start = Instant::now();
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(
                    "read shard {} ({} bytes) in {:?}",
                    key,
                    bytes.len(),
                    start.elapsed()
                );
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(FilterError::ShardNotFound { key, path })
            }
            Err(e) => Err(FilterError::io(path, e)),
        }
    }

    fn put_manifest(&self, manifest: &BuildManifest) -> Result<(), FilterError> {
        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| DecodeError::InvalidManifest(e.to_string()))?;
        self.write_atomic(&self.manifest_path(), &json)
    }

    fn remove_manifest(&self) -> Result<(), FilterError> {
        let path = self.manifest_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FilterError::io(path, e)),
        }
    }

    fn manifest(&self) -> Result<Option<BuildManifest>, FilterError> {
        let path = self.manifest_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FilterError::io(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| DecodeError::InvalidManifest(e.to_string()).into())
    }
}
