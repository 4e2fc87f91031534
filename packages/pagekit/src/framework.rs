//! The framework context: one state store, event bus, cache, loader and
//! module registry bound together.

use std::sync::Arc;

use futures::future::try_join_all;
use pagekit_cache::{DiskEngine, FileCache, MemoryEngine, StorageEngine};
use pagekit_core::{
    EventBus, ListenerId, ListenerResult, NameList, Persistence, StateStore, StateValue,
    StateWait, Target, READY,
};
use pagekit_http::{Fetcher, ReqwestFetcher};

use crate::config::FrameworkConfig;
use crate::error::{LoadError, Result};
use crate::loader::ResourceLoader;
use crate::page::{MemoryPage, Page};
use crate::registry::{IncludeReport, ModuleRegistry};
use crate::settings::Settings;

/// Assembles a [`Framework`].
///
/// Unset collaborators default to a reqwest fetcher, an on-disk engine at
/// the configured `storage_dir` (in-memory without one) and an already
/// loaded headless page.
pub struct FrameworkBuilder {
    config: FrameworkConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    engine: Option<Arc<dyn StorageEngine>>,
    page: Option<Arc<dyn Page>>,
}

impl FrameworkBuilder {
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn engine(mut self, engine: Arc<dyn StorageEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn page(mut self, page: Arc<dyn Page>) -> Self {
        self.page = Some(page);
        self
    }

    pub fn build(self) -> Result<Framework> {
        self.config.validate()?;

        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(ReqwestFetcher::new()?),
        };
        let engine: Arc<dyn StorageEngine> = match (self.engine, &self.config.storage_dir) {
            (Some(engine), _) => engine,
            (None, Some(dir)) => Arc::new(DiskEngine::new(dir)?),
            (None, None) => Arc::new(MemoryEngine::new()),
        };
        let page: Arc<dyn Page> = match self.page {
            Some(page) => page,
            None => Arc::new(MemoryPage::loaded_page()),
        };

        let cache = FileCache::with_config(engine.clone(), self.config.cache_config());
        let loader = Arc::new(ResourceLoader::new(fetcher, cache.clone(), page.clone()));
        let registry = ModuleRegistry::new(self.config.module_table(), loader.clone());

        Ok(Framework {
            state: StateStore::new(),
            events: EventBus::new(),
            settings: Settings::new(engine),
            config: self.config,
            cache,
            loader,
            registry,
            page,
        })
    }
}

/// A module loader instance.
///
/// Everything the framework shares between operations lives here, so
/// separate instances never observe each other.
///
/// # Lifecycle
///
/// Call [`startup`](Self::startup) once from inside a tokio runtime. Until
/// then [`include`](Self::include) waits.
pub struct Framework {
    config: FrameworkConfig,
    state: StateStore,
    events: EventBus,
    cache: FileCache,
    loader: Arc<ResourceLoader>,
    registry: ModuleRegistry,
    settings: Settings,
    page: Arc<dyn Page>,
}

impl Framework {
    pub fn builder(config: FrameworkConfig) -> FrameworkBuilder {
        FrameworkBuilder {
            config,
            fetcher: None,
            engine: None,
            page: None,
        }
    }

    /// A framework with default collaborators.
    pub fn new(config: FrameworkConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Mark the framework ready.
    ///
    /// Opens the file cache in the background, arranges for the document
    /// key to become `ready` once the page has loaded, then releases every
    /// waiting [`include`](Self::include).
    pub fn startup(&self) {
        let page = self.page.clone();
        let state = self.state.clone();
        let document_key = self.config.document_key();
        tokio::spawn(async move {
            page.loaded().await;
            state.set_state(&document_key, READY);
        });

        let cache = self.cache.clone();
        tokio::spawn(async move {
            if let Err(error) = cache.open().await {
                tracing::warn!(%error, "file cache failed to open");
            }
        });

        tracing::debug!(namespace = %self.config.namespace, version = crate::VERSION, "startup");
        self.state.set_state(&self.config.bootstrap_key(), READY);
    }

    /// Load the named modules' scripts into the page.
    ///
    /// Waits for [`startup`](Self::startup) first. The persisted no-cache
    /// list is read on every call.
    pub async fn include(&self, names: impl Into<NameList>) -> Result<IncludeReport> {
        let names = names.into();
        self.state
            .wait_state(&self.config.bootstrap_key(), READY)
            .await?;

        let no_cache = match self.settings.no_cache().await {
            Ok(list) => list,
            Err(error) => {
                tracing::warn!(%error, "could not read no-cache list, using cache for all");
                NameList::new()
            }
        };
        self.registry.include(names, &no_cache).await
    }

    /// Wait until every named module has set its state key to `ready`.
    ///
    /// Does not load anything.
    pub async fn ready(&self, names: impl Into<NameList>) -> Result<()> {
        let names = names.into();
        let mut waits: Vec<StateWait> = names
            .iter()
            .map(|name| self.state.wait_state(&self.config.module_key(name), READY))
            .collect();

        match waits.len() {
            0 => {}
            1 => {
                if let Some(wait) = waits.pop() {
                    wait.await?;
                }
            }
            _ => {
                try_join_all(waits).await?;
            }
        }
        Ok(())
    }

    pub fn get_state(&self, key: &str) -> Option<StateValue> {
        self.state.get_state(key)
    }

    pub fn set_state(&self, key: &str, value: impl Into<StateValue>) {
        self.state.set_state(key, value)
    }

    pub fn wait_state(&self, key: &str, target: impl Into<Target>) -> StateWait {
        self.state.wait_state(key, target)
    }

    pub fn wait_state_with<F>(
        &self,
        key: &str,
        target: impl Into<Target>,
        persistence: Persistence,
        callback: F,
    ) -> ListenerId
    where
        F: Fn(&StateValue, Option<&StateValue>) -> ListenerResult + Send + Sync + 'static,
    {
        self.state
            .wait_state_with(key, target, persistence, callback)
    }

    pub fn on<F>(&self, event: &str, callback: F) -> &Self
    where
        F: Fn(&[StateValue]) -> ListenerResult + Send + Sync + 'static,
    {
        self.events.on(event, callback);
        self
    }

    pub fn trigger(&self, event: &str, args: &[StateValue]) -> &Self {
        self.events.trigger(event, args);
        self
    }

    pub async fn load_file(
        &self,
        url: &str,
        use_cache: bool,
    ) -> std::result::Result<String, LoadError> {
        self.loader.load_file(url, use_cache).await
    }

    pub async fn load_css(
        &self,
        url: &str,
        use_cache: bool,
    ) -> std::result::Result<String, LoadError> {
        self.loader.load_css(url, use_cache).await
    }

    pub async fn load_script(
        &self,
        url: &str,
        use_cache: bool,
    ) -> std::result::Result<String, LoadError> {
        self.loader.load_script(url, use_cache).await
    }

    /// Modules whose loads bypass the file cache.
    pub async fn no_cache(&self) -> Result<NameList> {
        Ok(self.settings.no_cache().await?)
    }

    pub async fn set_no_cache(&self, modules: impl Into<NameList>) -> Result<()> {
        Ok(self.settings.set_no_cache(&modules.into()).await?)
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn file_cache(&self) -> &FileCache {
        &self.cache
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn page(&self) -> &Arc<dyn Page> {
        &self.page
    }
}

impl std::fmt::Debug for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framework")
            .field("namespace", &self.config.namespace)
            .field("state", &self.state)
            .field("cache", &self.cache)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
