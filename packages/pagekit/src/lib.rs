//! # pagekit
//!
//! Loads independently published modules into a page and coordinates their
//! readiness.
//!
//! A [`Framework`] owns:
//!
//! - a [`StateStore`](pagekit_core::StateStore) of named state variables
//! - an [`EventBus`](pagekit_core::EventBus)
//! - a [`FileCache`](pagekit_cache::FileCache) of fetched files
//! - a [`ResourceLoader`] that fetches through the cache into a [`Page`]
//! - a [`ModuleRegistry`] mapping module names to urls, with one load per
//!   module no matter how many callers ask for it
//!
//! Modules announce themselves by setting `<namespace>.<module>` to
//! `"ready"`. [`Framework::include`] loads modules; [`Framework::ready`]
//! waits for them to announce themselves.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pagekit::{Framework, FrameworkConfig, MemoryPage};
//! use pagekit_http::fetcher::mock::MockFetcher;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), pagekit::Error> {
//! let config = FrameworkConfig::default().with_module("Menu", "https://cdn.example.com/menu.js");
//! let fetcher = MockFetcher::new().with_body("https://cdn.example.com/menu.js", "menu()");
//!
//! let page = Arc::new(MemoryPage::loaded_page());
//! let fw = Arc::new(
//!     Framework::builder(config)
//!         .fetcher(Arc::new(fetcher))
//!         .page(page.clone())
//!         .build()?,
//! );
//!
//! // Stand-in for the script announcing itself when it runs.
//! let announcer = fw.clone();
//! page.on_script(move |_node| announcer.set_state("pagekit.Menu", "ready"));
//!
//! fw.startup();
//! fw.include("Menu").await?;
//! fw.ready("Menu").await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod framework;
mod loader;
mod page;
mod registry;
mod settings;

pub use config::{CacheSettings, FrameworkConfig, ModuleSpec, DOCUMENT_KEY};
pub use error::{ConfigError, Error, LoadError, PageError, Result};
pub use framework::{Framework, FrameworkBuilder};
pub use loader::ResourceLoader;
pub use page::{MemoryPage, Page, ResourceKind, ResourceNode};
pub use registry::{FailedModule, FailureReason, IncludeReport, ModuleRegistry};
pub use settings::{Settings, NO_CACHE_RECORD, SETTINGS_COLLECTION};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
