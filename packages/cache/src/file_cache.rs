//! The persistent file cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use crate::directory::{DirEntry, Directory, DIRECTORY_RECORD};
use crate::engine::{RecordStore, StorageEngine};
use crate::error::{CacheError, Result};
use crate::record::FileRecord;
use crate::sync::DeferredSync;

/// Configuration for a [`FileCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Collection holding cached files and the directory record.
    pub collection: String,
    /// Delay before the directory is persisted after a load.
    pub sync_delay: Duration,
    /// Delay before the directory is persisted after a save, delete or clear.
    pub immediate_delay: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            collection: "files".to_string(),
            sync_delay: Duration::from_millis(2000),
            immediate_delay: Duration::ZERO,
        }
    }
}

/// Lifecycle of the cache's connection to its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Closed,
    Opening,
    Open,
}

struct CacheInner {
    engine: Arc<dyn StorageEngine>,
    config: CacheConfig,
    store: OnceCell<Arc<dyn RecordStore>>,
    opening: AtomicBool,
    dir: Mutex<Directory>,
    timer: Mutex<DeferredSync>,
    flush_lock: tokio::sync::Mutex<()>,
}

impl CacheInner {
    fn dir(&self) -> MutexGuard<'_, Directory> {
        self.dir.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timer(&self) -> MutexGuard<'_, DeferredSync> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn open_store(&self) -> Result<Arc<dyn RecordStore>> {
        let collection = self.config.collection.as_str();
        let store = self.engine.open(collection).await?;

        let dir = match store.get(DIRECTORY_RECORD).await? {
            Some(record) => match serde_json::from_str::<Directory>(&record.content) {
                Ok(dir) => dir,
                Err(error) => {
                    tracing::warn!(collection, %error, "discarding unreadable cache directory");
                    Directory::new()
                }
            },
            None => Directory::new(),
        };

        tracing::debug!(collection, entries = dir.len(), "file cache opened");
        *self.dir() = dir;
        Ok(store)
    }

    /// Persist the directory mirror.
    ///
    /// Flushes are serialized and each one snapshots the mirror after taking
    /// the lock, so the last write to land is always the newest directory.
    async fn write_directory(&self) -> Result<()> {
        let _flushing = self.flush_lock.lock().await;
        let Some(store) = self.store.get() else {
            return Ok(());
        };

        let content = serde_json::to_string(&*self.dir())?;
        store
            .put(FileRecord::new(DIRECTORY_RECORD, content))
            .await?;
        tracing::debug!(collection = %self.config.collection, "cache directory synced");
        Ok(())
    }
}

/// Holds `opening` up until the open attempt finishes or is dropped.
struct OpeningFlag<'a>(&'a AtomicBool);

impl<'a> OpeningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for OpeningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Async key-value cache of file contents with a persisted directory.
///
/// The store is opened lazily by the first operation that needs it;
/// concurrent first callers share a single open. Cloning is cheap and every
/// clone shares the store, the directory mirror and the sync timer.
///
/// Between a content write and the directory flush that follows it, the
/// persisted directory lags the mirror. The mirror is authoritative.
#[derive(Clone)]
pub struct FileCache {
    inner: Arc<CacheInner>,
}

impl FileCache {
    /// Create a cache over `engine` with the default configuration.
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self::with_config(engine, CacheConfig::default())
    }

    pub fn with_config(engine: Arc<dyn StorageEngine>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                engine,
                config,
                store: OnceCell::new(),
                opening: AtomicBool::new(false),
                dir: Mutex::new(Directory::new()),
                timer: Mutex::new(DeferredSync::new()),
                flush_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn state(&self) -> CacheState {
        if self.inner.store.initialized() {
            CacheState::Open
        } else if self.inner.opening.load(Ordering::SeqCst) {
            CacheState::Opening
        } else {
            CacheState::Closed
        }
    }

    /// Open the store and load the directory mirror.
    ///
    /// Idempotent: later and concurrent calls share the first open.
    pub async fn open(&self) -> Result<Arc<dyn RecordStore>> {
        let inner = &self.inner;
        let store = inner
            .store
            .get_or_try_init(|| async {
                let _opening = OpeningFlag::raise(&inner.opening);
                inner.open_store().await
            })
            .await?;
        Ok(store.clone())
    }

    /// Load the cached content for `name`.
    ///
    /// Fails with [`CacheError::NotCached`] without touching the store when
    /// the directory has no entry for `name`. A hit refreshes the entry's
    /// `last_loaded` time and schedules a delayed directory sync.
    pub async fn load(&self, name: &str) -> Result<String> {
        let store = self.open().await?;

        match self.inner.dir().get_mut(name) {
            Some(entry) => entry.touch(Utc::now()),
            None => return Err(CacheError::NotCached(name.to_string())),
        }
        self.schedule_sync(false);

        match store.get(name).await? {
            Some(record) => Ok(record.content),
            None => Err(CacheError::MissingRecord(name.to_string())),
        }
    }

    /// Save `content` under `name`.
    ///
    /// The directory entry is stamped with the current time and merged with
    /// `extra_attribs`. The directory is synced immediately.
    pub async fn save(
        &self,
        name: &str,
        content: impl Into<String>,
        extra_attribs: Option<Map<String, Value>>,
    ) -> Result<String> {
        if name == DIRECTORY_RECORD {
            return Err(CacheError::ReservedName(name.to_string()));
        }
        let store = self.open().await?;
        store.put(FileRecord::new(name, content)).await?;

        let entry = DirEntry::new(Utc::now()).with_attribs(extra_attribs.unwrap_or_default());
        self.inner.dir().insert(name.to_string(), entry);
        self.schedule_sync(true);

        tracing::debug!(name, "saved to file cache");
        Ok(name.to_string())
    }

    /// Remove `name` from the store and the directory.
    pub async fn delete(&self, name: &str) -> Result<String> {
        if name == DIRECTORY_RECORD {
            return Err(CacheError::ReservedName(name.to_string()));
        }
        let store = self.open().await?;
        store.delete(name).await?;

        self.inner.dir().remove(name);
        self.schedule_sync(true);

        tracing::debug!(name, "deleted from file cache");
        Ok(name.to_string())
    }

    /// Remove every cached file and empty the directory.
    pub async fn clear(&self) -> Result<()> {
        let store = self.open().await?;
        store.clear().await?;
        self.inner.dir().clear();
        self.schedule_sync(true);

        tracing::debug!(collection = %self.inner.config.collection, "file cache cleared");
        Ok(())
    }

    /// Snapshot of the directory mirror.
    ///
    /// Empty until the cache has been opened.
    pub fn dir(&self) -> Directory {
        self.inner.dir().clone()
    }

    /// Whether the directory mirror lists `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.dir().contains_key(name)
    }

    /// Whether a directory sync is waiting on its timer.
    pub fn is_sync_pending(&self) -> bool {
        self.inner.timer().is_pending()
    }

    /// Cancel any pending sync and persist the directory now.
    pub async fn flush(&self) -> Result<()> {
        self.open().await?;
        self.inner.timer().cancel();
        self.inner.write_directory().await
    }

    fn schedule_sync(&self, immediately: bool) {
        let delay = if immediately {
            self.inner.config.immediate_delay
        } else {
            self.inner.config.sync_delay
        };

        let inner = self.inner.clone();
        self.inner.timer().schedule(delay, immediately, move || async move {
            if let Err(error) = inner.write_directory().await {
                tracing::warn!(%error, "cache directory sync failed");
            }
        });
    }
}

impl std::fmt::Debug for FileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCache")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .field("entries", &self.inner.dir().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::MemoryEngine;
    use async_trait::async_trait;
    use serde_json::json;

    fn cache() -> (Arc<MemoryEngine>, FileCache) {
        let engine = Arc::new(MemoryEngine::new());
        (engine.clone(), FileCache::new(engine))
    }

    /// Memory engine that opens slowly and whose stores refuse to clear.
    struct StubbornEngine {
        inner: MemoryEngine,
        open_delay: Duration,
    }

    struct StubbornStore(Arc<dyn RecordStore>);

    #[async_trait]
    impl StorageEngine for StubbornEngine {
        async fn open(&self, collection: &str) -> std::result::Result<Arc<dyn RecordStore>, StoreError> {
            tokio::time::sleep(self.open_delay).await;
            let store = self.inner.open(collection).await?;
            Ok(Arc::new(StubbornStore(store)))
        }
    }

    #[async_trait]
    impl RecordStore for StubbornStore {
        async fn get(&self, name: &str) -> std::result::Result<Option<FileRecord>, StoreError> {
            self.0.get(name).await
        }

        async fn put(&self, record: FileRecord) -> std::result::Result<(), StoreError> {
            self.0.put(record).await
        }

        async fn delete(&self, name: &str) -> std::result::Result<(), StoreError> {
            self.0.delete(name).await
        }

        async fn clear(&self) -> std::result::Result<(), StoreError> {
            Err(StoreError::Backend {
                message: "clear refused".to_string(),
            })
        }
    }

    fn stubborn(open_delay: Duration) -> FileCache {
        FileCache::new(Arc::new(StubbornEngine {
            inner: MemoryEngine::new(),
            open_delay,
        }))
    }

    #[tokio::test]
    async fn save_then_load() {
        let (_engine, cache) = cache();
        cache.save("f", "data", None).await.unwrap();
        assert_eq!(cache.load("f").await.unwrap(), "data");
    }

    #[tokio::test]
    async fn load_unknown_is_not_cached() {
        let (_engine, cache) = cache();
        let err = cache.load("nope").await.unwrap_err();
        assert!(matches!(err, CacheError::NotCached(name) if name == "nope"));
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let (_engine, cache) = cache();
        cache.save("f", "data", None).await.unwrap();
        assert!(cache.contains("f"));

        assert_eq!(cache.delete("f").await.unwrap(), "f");
        assert!(!cache.contains("f"));
        assert!(cache.load("f").await.is_err());
    }

    #[tokio::test]
    async fn clear_empties_store_and_directory() {
        let (engine, cache) = cache();
        cache.save("a", "1", None).await.unwrap();
        cache.save("b", "2", None).await.unwrap();

        cache.clear().await.unwrap();
        assert!(cache.dir().is_empty());
        assert!(engine.collection("files").unwrap().content("a").is_none());
        assert!(cache.load("a").await.is_err());
    }

    #[tokio::test]
    async fn failed_clear_keeps_the_directory() {
        let cache = stubborn(Duration::ZERO);
        cache.save("a", "1", None).await.unwrap();
        cache.flush().await.unwrap();

        let err = cache.clear().await.unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Backend { .. })));
        assert!(cache.contains("a"));
        assert_eq!(cache.load("a").await.unwrap(), "1");
    }

    #[tokio::test]
    async fn save_merges_extra_attribs() {
        let (_engine, cache) = cache();
        let mut extra = Map::new();
        extra.insert("etag".to_string(), json!("abc"));
        cache.save("f", "data", Some(extra)).await.unwrap();

        let dir = cache.dir();
        assert_eq!(dir["f"].extra.get("etag"), Some(&json!("abc")));
        assert_eq!(dir["f"].added, dir["f"].last_loaded);
    }

    #[tokio::test]
    async fn reserved_name_is_rejected() {
        let (_engine, cache) = cache();
        let err = cache.save(DIRECTORY_RECORD, "x", None).await.unwrap_err();
        assert!(matches!(err, CacheError::ReservedName(_)));
        assert!(cache.delete(DIRECTORY_RECORD).await.is_err());
    }

    #[tokio::test]
    async fn missing_record_is_reported() {
        let (engine, cache) = cache();
        cache.save("f", "data", None).await.unwrap();

        // Remove the content behind the cache's back.
        engine.open("files").await.unwrap().delete("f").await.unwrap();

        let err = cache.load("f").await.unwrap_err();
        assert!(matches!(err, CacheError::MissingRecord(name) if name == "f"));
    }

    #[tokio::test]
    async fn open_is_shared() {
        let (engine, cache) = cache();
        assert_eq!(cache.state(), CacheState::Closed);

        let other = cache.clone();
        let (a, b) = tokio::join!(cache.open(), other.open());
        a.unwrap();
        b.unwrap();
        cache.load("x").await.unwrap_err();

        assert_eq!(engine.open_count(), 1);
        assert_eq!(cache.state(), CacheState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn state_tracks_a_slow_open() {
        let cache = stubborn(Duration::from_millis(100));

        let opening = tokio::spawn({
            let cache = cache.clone();
            async move { cache.open().await.map(|_| ()) }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.state(), CacheState::Opening);

        opening.await.unwrap().unwrap();
        assert_eq!(cache.state(), CacheState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_open_returns_to_closed() {
        let cache = stubborn(Duration::from_millis(100));

        let abandoned = tokio::time::timeout(Duration::from_millis(10), cache.open()).await;
        assert!(abandoned.is_err());
        assert_eq!(cache.state(), CacheState::Closed);

        cache.open().await.unwrap();
        assert_eq!(cache.state(), CacheState::Open);
    }

    #[tokio::test]
    async fn open_reads_persisted_directory() {
        let engine = Arc::new(MemoryEngine::new());
        let first = FileCache::new(engine.clone());
        first.save("f", "data", None).await.unwrap();
        first.flush().await.unwrap();

        let second = FileCache::new(engine);
        second.open().await.unwrap();
        assert!(second.contains("f"));
        assert_eq!(second.load("f").await.unwrap(), "data");
    }

    #[tokio::test]
    async fn unreadable_directory_starts_empty() {
        let engine = Arc::new(MemoryEngine::new());
        engine
            .open("files")
            .await
            .unwrap()
            .put(FileRecord::new(DIRECTORY_RECORD, "{not json"))
            .await
            .unwrap();

        let cache = FileCache::new(engine);
        cache.open().await.unwrap();
        assert!(cache.dir().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_saves_coalesce_into_one_directory_write() {
        let engine = Arc::new(MemoryEngine::new());
        let config = CacheConfig {
            immediate_delay: Duration::from_millis(50),
            ..CacheConfig::default()
        };
        let cache = FileCache::with_config(engine.clone(), config);

        cache.save("a", "1", None).await.unwrap();
        cache.save("b", "2", None).await.unwrap();
        cache.save("c", "3", None).await.unwrap();
        assert!(cache.is_sync_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;

        let files = engine.collection("files").unwrap();
        assert_eq!(files.put_count(DIRECTORY_RECORD), 1);
        let persisted: Directory =
            serde_json::from_str(&files.content(DIRECTORY_RECORD).unwrap()).unwrap();
        assert_eq!(
            persisted.keys().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn load_sync_is_deferred() {
        let engine = Arc::new(MemoryEngine::new());
        let cache = FileCache::new(engine.clone());

        cache.save("f", "data", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        let files = engine.collection("files").unwrap();
        assert_eq!(files.put_count(DIRECTORY_RECORD), 1);

        cache.load("f").await.unwrap();
        cache.load("f").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(files.put_count(DIRECTORY_RECORD), 1);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(files.put_count(DIRECTORY_RECORD), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn save_overrides_pending_load_sync() {
        let engine = Arc::new(MemoryEngine::new());
        let cache = FileCache::new(engine.clone());

        cache.save("f", "data", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        cache.load("f").await.unwrap();
        cache.save("g", "more", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let files = engine.collection("files").unwrap();
        assert_eq!(files.put_count(DIRECTORY_RECORD), 2);
        assert!(!cache.is_sync_pending());
    }

    #[tokio::test]
    async fn flush_writes_directory_now() {
        let (engine, cache) = cache();
        cache.save("f", "data", None).await.unwrap();
        cache.flush().await.unwrap();

        let files = engine.collection("files").unwrap();
        assert!(files.content(DIRECTORY_RECORD).unwrap().contains("\"f\""));
        assert!(!cache.is_sync_pending());
    }
}
