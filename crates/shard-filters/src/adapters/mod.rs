//! Adapters Layer (Driven Adapters)
//!
//! Implementations of the driven ports plus the decoded-filter cache.
//!
//! ## Adapters
//!
//! - `FsShardStore` - One `<key>.dat` file per shard under a root directory
//! - `InMemoryShardStore` - Shard blobs in a map, for tests and embedding
//! - `CorpusFile` / `InMemoryCorpus` - Newline-delimited digest input
//! - `FilterCache` - Bounded LRU of decoded filters, flushed on rebuild

pub mod corpus;
pub mod filter_cache;
pub mod fs_store;
pub mod memory_store;

pub use corpus::{CorpusFile, InMemoryCorpus};
pub use filter_cache::FilterCache;
pub use fs_store::FsShardStore;
pub use memory_store::InMemoryShardStore;
