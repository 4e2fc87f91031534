//! Error types for the cache layer.

use thiserror::Error;

/// Failures reported by a storage engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage root is unusable.
    #[error("invalid storage root {path}: {message}")]
    InvalidRoot {
        path: std::path::PathBuf,
        message: String,
    },

    /// Engine-specific failure.
    #[error("{message}")]
    Backend { message: String },
}

/// Errors returned by [`FileCache`](crate::FileCache) operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The name is not in the cache directory.
    #[error("not cached: {0}")]
    NotCached(String),

    /// The directory lists the name but the store has no record for it.
    #[error("cache directory lists {0} but the store holds no record for it")]
    MissingRecord(String),

    /// The name is reserved for the cache's own bookkeeping.
    #[error("reserved cache name: {0}")]
    ReservedName(String),

    /// The underlying store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The directory could not be serialized.
    #[error("directory serialization error: {0}")]
    Directory(#[from] serde_json::Error),
}

impl CacheError {
    /// Whether this error only means "not in the cache".
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotCached(_) | CacheError::MissingRecord(_))
    }
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
