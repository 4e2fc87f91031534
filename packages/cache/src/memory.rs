//! In-memory storage engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::engine::{RecordStore, StorageEngine};
use crate::error::StoreError;
use crate::record::FileRecord;

/// A process-local storage engine.
///
/// Collections live as long as the engine. Every collection counts the
/// writes it receives per record name, which lets tests observe how often
/// the cache persists its directory.
///
/// # Example
///
/// ```rust
/// use pagekit_cache::{FileRecord, MemoryEngine, StorageEngine};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), pagekit_cache::StoreError> {
/// let engine = MemoryEngine::new();
/// let files = engine.open("files").await?;
/// files.put(FileRecord::new("a", "1")).await?;
///
/// assert_eq!(engine.collection("files").unwrap().put_count("a"), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryEngine {
    collections: Mutex<HashMap<String, Arc<MemoryCollection>>>,
    opens: AtomicUsize,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The named collection, if it has been opened.
    pub fn collection(&self, name: &str) -> Option<Arc<MemoryCollection>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// How many times [`StorageEngine::open`] was called.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    async fn open(&self, collection: &str) -> Result<Arc<dyn RecordStore>, StoreError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let store = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .clone();
        Ok(store)
    }
}

#[derive(Default)]
struct CollectionInner {
    records: HashMap<String, String>,
    puts: HashMap<String, usize>,
}

/// A record collection held in memory.
#[derive(Default)]
pub struct MemoryCollection {
    inner: Mutex<CollectionInner>,
}

impl MemoryCollection {
    fn lock(&self) -> MutexGuard<'_, CollectionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of writes received for `name` since the collection was created.
    pub fn put_count(&self, name: &str) -> usize {
        self.lock().puts.get(name).copied().unwrap_or(0)
    }

    /// Current content stored under `name`.
    pub fn content(&self, name: &str) -> Option<String> {
        self.lock().records.get(name).cloned()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryCollection {
    async fn get(&self, name: &str) -> Result<Option<FileRecord>, StoreError> {
        Ok(self
            .lock()
            .records
            .get(name)
            .map(|content| FileRecord::new(name, content.clone())))
    }

    async fn put(&self, record: FileRecord) -> Result<(), StoreError> {
        let mut inner = self.lock();
        *inner.puts.entry(record.name.clone()).or_default() += 1;
        inner.records.insert(record.name, record.content);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.lock().records.remove(name);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.lock().records.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_collection_once() {
        let engine = MemoryEngine::new();
        assert!(engine.collection("files").is_none());

        let first = engine.open("files").await.unwrap();
        first.put(FileRecord::new("a", "1")).await.unwrap();

        let second = engine.open("files").await.unwrap();
        assert_eq!(
            second.get("a").await.unwrap(),
            Some(FileRecord::new("a", "1"))
        );
        assert_eq!(engine.open_count(), 2);
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let engine = MemoryEngine::new();
        let files = engine.open("files").await.unwrap();
        let settings = engine.open("settings").await.unwrap();

        files.put(FileRecord::new("k", "file")).await.unwrap();
        assert!(settings.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_overwrites_and_counts() {
        let engine = MemoryEngine::new();
        let files = engine.open("files").await.unwrap();

        files.put(FileRecord::new("a", "1")).await.unwrap();
        files.put(FileRecord::new("a", "2")).await.unwrap();

        let collection = engine.collection("files").unwrap();
        assert_eq!(collection.content("a"), Some("2".to_string()));
        assert_eq!(collection.put_count("a"), 2);
        assert_eq!(collection.put_count("b"), 0);
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let engine = MemoryEngine::new();
        let files = engine.open("files").await.unwrap();

        files.put(FileRecord::new("a", "1")).await.unwrap();
        files.put(FileRecord::new("b", "2")).await.unwrap();
        files.delete("a").await.unwrap();
        files.delete("missing").await.unwrap();
        assert!(files.get("a").await.unwrap().is_none());

        files.clear().await.unwrap();
        assert!(engine.collection("files").unwrap().is_empty());
    }
}
