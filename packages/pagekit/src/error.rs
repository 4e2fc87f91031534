//! Error types for the loader, registry and framework.

use thiserror::Error;

use crate::registry::IncludeReport;

/// A document insertion failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("no insertion point named `{0}`")]
    UnknownLocation(String),
}

/// Why a resource did not materialize.
///
/// `Clone` so a single coalesced load can report its outcome to every
/// waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The fetch answered with an error status, or `0` when no response
    /// arrived at all.
    #[error("fetching {url} failed with status {status}")]
    Fetch { url: String, status: u16 },

    /// The content was fetched but could not be placed in the page.
    #[error("inserting {url} into the page failed: {source}")]
    Page {
        url: String,
        #[source]
        source: PageError,
    },
}

impl LoadError {
    /// The URL that failed to load.
    pub fn url(&self) -> &str {
        match self {
            LoadError::Fetch { url, .. } | LoadError::Page { url, .. } => url,
        }
    }

    /// The fetch status, for fetch failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            LoadError::Fetch { status, .. } => Some(*status),
            LoadError::Page { .. } => None,
        }
    }
}

/// Problems found while loading or validating a [`FrameworkConfig`](crate::FrameworkConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("namespace must not be empty")]
    EmptyNamespace,

    #[error("module names must not be empty")]
    EmptyModuleName,

    #[error("module name `{0}` collides with a reserved state key")]
    ReservedModuleName(String),

    #[error("module `{module}` has an invalid url: {source}")]
    InvalidUrl {
        module: String,
        #[source]
        source: url::ParseError,
    },
}

/// Framework-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more modules failed; the report lists what did load.
    #[error("include failed: {0}")]
    Include(IncludeReport),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("cache error: {0}")]
    Cache(#[from] pagekit_cache::CacheError),

    #[error("store error: {0}")]
    Store(#[from] pagekit_cache::StoreError),

    #[error("state error: {0}")]
    State(#[from] pagekit_core::Error),

    #[error("http error: {0}")]
    Http(#[from] pagekit_http::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for framework operations.
pub type Result<T> = std::result::Result<T, Error>;
