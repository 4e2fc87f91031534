//! Storage engine traits.
//!
//! A [`StorageEngine`] hands out named record collections. Each collection
//! is a [`RecordStore`]: records keyed by name, written and read whole.
//! Write serialization across concurrent callers is the engine's job.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::FileRecord;

/// A collection of records keyed by name.
///
/// # Object Safety
///
/// This trait is object-safe: engines return `Arc<dyn RecordStore>`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read a record.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - No record with this name.
    /// * `Ok(Some(record))` - The stored record.
    /// * `Err(StoreError)` - The read failed.
    async fn get(&self, name: &str) -> Result<Option<FileRecord>, StoreError>;

    /// Write a record, replacing any record with the same name.
    async fn put(&self, record: FileRecord) -> Result<(), StoreError>;

    /// Remove a record. Removing a missing record succeeds.
    async fn delete(&self, name: &str) -> Result<(), StoreError>;

    /// Remove every record in the collection.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Opens record collections.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Open the named collection, creating it on first use.
    async fn open(&self, collection: &str) -> Result<Arc<dyn RecordStore>, StoreError>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn get(&self, name: &str) -> Result<Option<FileRecord>, StoreError> {
        self.as_ref().get(name).await
    }

    async fn put(&self, record: FileRecord) -> Result<(), StoreError> {
        self.as_ref().put(record).await
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.as_ref().delete(name).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.as_ref().clear().await
    }
}

#[async_trait]
impl<T: StorageEngine + ?Sized> StorageEngine for Arc<T> {
    async fn open(&self, collection: &str) -> Result<Arc<dyn RecordStore>, StoreError> {
        self.as_ref().open(collection).await
    }
}
