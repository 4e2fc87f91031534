//! The cache directory: metadata for every cached entry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Record name under which the directory itself is persisted.
pub const DIRECTORY_RECORD: &str = "[dir]";

/// Directory of cached entries, keyed by entry name.
pub type Directory = BTreeMap<String, DirEntry>;

/// Metadata kept for one cached entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirEntry {
    /// When the entry was saved.
    pub added: DateTime<Utc>,
    /// When the entry was last read from the cache.
    pub last_loaded: DateTime<Utc>,
    /// Caller-supplied attributes stored alongside the timestamps.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DirEntry {
    /// A fresh entry stamped with `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            added: now,
            last_loaded: now,
            extra: Map::new(),
        }
    }

    /// Merge `attribs` over this entry.
    ///
    /// `added` and `last_loaded` in `attribs` replace the timestamps when
    /// they parse as timestamps; everything else lands in `extra`.
    pub fn with_attribs(mut self, attribs: Map<String, Value>) -> Self {
        for (key, value) in attribs {
            match key.as_str() {
                "added" | "last_loaded" => {
                    match serde_json::from_value::<DateTime<Utc>>(value.clone()) {
                        Ok(at) if key == "added" => self.added = at,
                        Ok(at) => self.last_loaded = at,
                        Err(_) => {
                            tracing::debug!(key, %value, "ignoring non-timestamp attribute");
                        }
                    }
                }
                _ => {
                    self.extra.insert(key, value);
                }
            }
        }
        self
    }

    /// Record a read at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_loaded = now;
    }
}
