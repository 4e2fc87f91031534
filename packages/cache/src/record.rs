use serde::{Deserialize, Serialize};

/// A named record in a storage collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Record key, typically the URL the content was fetched from.
    pub name: String,
    /// Stored content.
    pub content: String,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}
