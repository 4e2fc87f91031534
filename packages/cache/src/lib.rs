//! # pagekit-cache
//!
//! A persistent key-value cache for fetched files.
//!
//! The cache sits on top of a [`StorageEngine`]: an async store of named
//! record collections. Two engines ship with the crate:
//!
//! - [`MemoryEngine`]: process-local, with write counters for tests
//! - [`DiskEngine`]: one directory per collection, one JSON file per record
//!
//! [`FileCache`] keeps an in-memory directory of what it holds (when each
//! entry was added and last loaded) and persists that directory as a
//! reserved record. Directory writes are debounced: loads only touch the
//! mirror and schedule a delayed sync, while saves and deletes schedule an
//! immediate one.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pagekit_cache::{FileCache, MemoryEngine};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), pagekit_cache::CacheError> {
//! let cache = FileCache::new(Arc::new(MemoryEngine::new()));
//!
//! cache.save("https://example.com/menu.js", "console.log('menu')", None).await?;
//! let content = cache.load("https://example.com/menu.js").await?;
//! assert_eq!(content, "console.log('menu')");
//! # Ok(())
//! # }
//! ```

mod directory;
mod engine;
mod error;
mod file_cache;
mod local_disk;
mod memory;
mod record;
mod sync;

pub use directory::{DirEntry, Directory, DIRECTORY_RECORD};
pub use engine::{RecordStore, StorageEngine};
pub use error::{CacheError, Result, StoreError};
pub use file_cache::{CacheConfig, CacheState, FileCache};
pub use local_disk::{DiskCollection, DiskEngine};
pub use memory::{MemoryCollection, MemoryEngine};
pub use record::FileRecord;
