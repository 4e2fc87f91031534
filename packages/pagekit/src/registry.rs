//! Module table and coalesced module loads.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use pagekit_core::NameList;

use crate::error::{Error, LoadError, Result};
use crate::loader::ResourceLoader;

type LoadHandle = Shared<BoxFuture<'static, std::result::Result<String, LoadError>>>;

/// Why a requested module did not load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The name is not in the module table; nothing was fetched.
    UnknownModule,
    Load(LoadError),
}

/// A module that failed to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedModule {
    pub name: String,
    /// The module's url, or `None` for unknown modules.
    pub url: Option<String>,
    pub reason: FailureReason,
}

/// Outcome of an [`include`](ModuleRegistry::include): the urls that loaded
/// and the modules that did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeReport {
    pub loaded: Vec<String>,
    pub failed: Vec<FailedModule>,
}

impl IncludeReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Names of the failed modules.
    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.name.as_str()).collect()
    }
}

impl fmt::Display for IncludeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} loaded, {} failed ({})",
            self.loaded.len(),
            self.failed.len(),
            self.failed_names().join(",")
        )
    }
}

/// Maps module names to urls and keeps one load per module.
///
/// The first request for a module starts its load; every later request,
/// concurrent or not, shares that load's outcome. Outcomes are kept for the
/// registry's lifetime, failures included. [`forget`](Self::forget) drops a
/// settled outcome so the module can be requested again.
pub struct ModuleRegistry {
    table: HashMap<String, String>,
    loader: Arc<ResourceLoader>,
    loads: Mutex<HashMap<String, LoadHandle>>,
}

impl ModuleRegistry {
    pub fn new(table: HashMap<String, String>, loader: Arc<ResourceLoader>) -> Self {
        Self {
            table,
            loader,
            loads: Mutex::new(HashMap::new()),
        }
    }

    fn loads(&self) -> MutexGuard<'_, HashMap<String, LoadHandle>> {
        self.loads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The url registered for `name`.
    pub fn module_url(&self, name: &str) -> Option<&str> {
        self.table.get(name).map(String::as_str)
    }

    /// Registered module names, sorted.
    pub fn modules(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Load every module in `names`.
    ///
    /// Modules listed in `no_cache` lose their cached copy and are fetched
    /// fresh. Settles once every requested module has settled; fails with
    /// [`Error::Include`] if any of them failed.
    pub async fn include(
        &self,
        names: impl Into<NameList>,
        no_cache: &NameList,
    ) -> Result<IncludeReport> {
        let names = names.into();
        let mut report = IncludeReport::default();
        if names.is_empty() {
            return Ok(report);
        }

        let mut pending = Vec::new();
        for name in names.iter() {
            match self.table.get(name) {
                Some(url) => {
                    let bypass_cache = no_cache.contains(name);
                    if bypass_cache {
                        self.drop_cached_copy(name, url).await;
                    }
                    let handle = self.handle(name, url, bypass_cache);
                    pending.push((name.to_string(), url.clone(), handle));
                }
                None => {
                    tracing::warn!(module = name, "unknown module");
                    report.failed.push(FailedModule {
                        name: name.to_string(),
                        url: None,
                        reason: FailureReason::UnknownModule,
                    });
                }
            }
        }

        let outcomes = join_all(pending.iter().map(|(_, _, handle)| handle.clone())).await;
        for ((name, url, _), outcome) in pending.into_iter().zip(outcomes) {
            match outcome {
                Ok(url) => report.loaded.push(url),
                Err(error) => report.failed.push(FailedModule {
                    name,
                    url: Some(url),
                    reason: FailureReason::Load(error),
                }),
            }
        }

        if report.is_success() {
            Ok(report)
        } else {
            Err(Error::Include(report))
        }
    }

    /// Remove the cached copy of a no-cache module.
    ///
    /// Runs on every include of the module, whether or not a load for it has
    /// already settled.
    async fn drop_cached_copy(&self, name: &str, url: &str) {
        if let Err(error) = self.loader.cache().delete(url).await {
            tracing::warn!(module = name, %error, "could not drop cached copy");
        }
    }

    /// The load for `name`, started if there is none yet.
    fn handle(&self, name: &str, url: &str, bypass_cache: bool) -> LoadHandle {
        let mut loads = self.loads();
        if let Some(handle) = loads.get(name) {
            tracing::debug!(module = name, "joining existing load");
            return handle.clone();
        }

        let loader = self.loader.clone();
        let url = url.to_string();
        let module = name.to_string();
        let handle = async move {
            let result = loader.load_script(&url, !bypass_cache).await;
            match &result {
                Ok(_) => tracing::debug!(%module, %url, "module loaded"),
                Err(error) => tracing::warn!(%module, %error, "module failed to load"),
            }
            result
        }
        .boxed()
        .shared();

        // Loads run to completion even if every include waiting on them is
        // dropped.
        tokio::spawn(handle.clone());
        loads.insert(name.to_string(), handle.clone());
        handle
    }

    /// Drop the settled load of `name`. Returns whether anything was dropped.
    ///
    /// A load still in flight is kept.
    pub fn forget(&self, name: &str) -> bool {
        let mut loads = self.loads();
        match loads.get(name) {
            Some(handle) if handle.peek().is_some() => {
                loads.remove(name);
                true
            }
            _ => false,
        }
    }

    /// Whether a load for `name` has started and not yet settled.
    pub fn is_loading(&self, name: &str) -> bool {
        self.loads()
            .get(name)
            .is_some_and(|handle| handle.peek().is_none())
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.modules())
            .field("loads", &self.loads().keys().collect::<Vec<_>>())
            .finish()
    }
}
