//! Persisted framework settings.

use std::sync::Arc;

use pagekit_cache::{FileRecord, RecordStore, StorageEngine, StoreError};
use pagekit_core::NameList;
use tokio::sync::OnceCell;

/// Collection holding framework settings.
pub const SETTINGS_COLLECTION: &str = "settings";

/// Record holding the comma-separated list of modules that skip the cache.
pub const NO_CACHE_RECORD: &str = "include.nocache";

/// Settings stored beside the file cache in the same storage engine.
pub struct Settings {
    engine: Arc<dyn StorageEngine>,
    store: OnceCell<Arc<dyn RecordStore>>,
}

impl Settings {
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self {
            engine,
            store: OnceCell::new(),
        }
    }

    async fn store(&self) -> Result<&Arc<dyn RecordStore>, StoreError> {
        self.store
            .get_or_try_init(|| self.engine.open(SETTINGS_COLLECTION))
            .await
    }

    /// Modules whose loads bypass the cache. Empty when never set.
    pub async fn no_cache(&self) -> Result<NameList, StoreError> {
        let record = self.store().await?.get(NO_CACHE_RECORD).await?;
        Ok(record
            .map(|record| NameList::parse(&record.content))
            .unwrap_or_default())
    }

    /// Replace the no-cache list.
    pub async fn set_no_cache(&self, modules: &NameList) -> Result<(), StoreError> {
        let record = FileRecord::new(NO_CACHE_RECORD, modules.to_string());
        self.store().await?.put(record).await?;
        tracing::debug!(modules = %modules, "no-cache list updated");
        Ok(())
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("open", &self.store.initialized())
            .finish()
    }
}
