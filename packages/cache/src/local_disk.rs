//! Storage engine backed by a local directory.
//!
//! Each collection is a subdirectory of the root; each record is one JSON
//! file named after the percent-encoded record name. Names whose encoding
//! would not fit in a file name are stored under `~<sha256 of the name>`.
//! `~` is always percent-encoded, so the two forms never collide.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::engine::{RecordStore, StorageEngine};
use crate::error::StoreError;
use crate::record::FileRecord;

const RECORD_EXTENSION: &str = "json";

/// Longest encoded name used verbatim; leaves room for the extension
/// under the common 255-byte file name limit.
const MAX_ENCODED_LEN: usize = 200;

fn encode(name: &str) -> String {
    url::form_urlencoded::byte_serialize(name.as_bytes()).collect()
}

fn file_stem(name: &str) -> String {
    let encoded = encode(name);
    if encoded.len() <= MAX_ENCODED_LEN {
        return encoded;
    }
    format!("~{}", hex::encode(Sha256::digest(name.as_bytes())))
}

/// Write `bytes` to a fresh temp file in `dir` and rename it over `path`.
///
/// Every writer gets its own temp file, so concurrent writes of one record
/// each land whole and the last rename wins.
fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// A [`StorageEngine`] writing JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct DiskEngine {
    root: PathBuf,
}

impl DiskEngine {
    /// Use `root` as the storage directory, creating it if needed.
    ///
    /// Fails with [`StoreError::InvalidRoot`] if `root` is not a writable
    /// directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let invalid = |path: &Path, message: String| StoreError::InvalidRoot {
            path: path.to_path_buf(),
            message,
        };

        std::fs::create_dir_all(&root).map_err(|e| invalid(&root, e.to_string()))?;
        let attr = std::fs::metadata(&root).map_err(|e| invalid(&root, e.to_string()))?;
        if !attr.is_dir() {
            return Err(invalid(&root, "root path must be a directory".to_string()));
        }
        if attr.permissions().readonly() {
            return Err(invalid(&root, "root directory must be writable".to_string()));
        }

        match root.canonicalize() {
            Ok(root) => Ok(Self { root }),
            Err(e) => Err(invalid(&root, e.to_string())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageEngine for DiskEngine {
    async fn open(&self, collection: &str) -> Result<Arc<dyn RecordStore>, StoreError> {
        let dir = self.root.join(encode(collection));
        fs::create_dir_all(&dir).await?;
        tracing::debug!(collection, path = %dir.display(), "opened disk collection");
        Ok(Arc::new(DiskCollection { dir }))
    }
}

/// One collection directory of a [`DiskEngine`].
#[derive(Debug)]
pub struct DiskCollection {
    dir: PathBuf,
}

impl DiskCollection {
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", file_stem(name), RECORD_EXTENSION))
    }
}

fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[async_trait]
impl RecordStore for DiskCollection {
    async fn get(&self, name: &str) -> Result<Option<FileRecord>, StoreError> {
        let path = self.record_path(name);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    async fn put(&self, record: FileRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.name);
        tracing::debug!("Writing {}...", path.display());

        let text = serde_json::to_string(&record)?;
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &path, text.as_bytes()))
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("write task failed: {}", e),
            })??;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.record_path(name);
        ignore_not_found(fs::remove_file(&path).await)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                ignore_not_found(fs::remove_file(&path).await)?;
            }
        }
        tracing::debug!(path = %self.dir.display(), "cleared disk collection");
        Ok(())
    }
}
