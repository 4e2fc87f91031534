//! Framework configuration.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use pagekit_cache::CacheConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// State key suffix tracking page-load completion.
pub const DOCUMENT_KEY: &str = "document";

fn default_namespace() -> String {
    "pagekit".to_string()
}

/// One entry of the module table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub url: String,
}

/// File cache settings as written in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub collection: String,
    pub sync_delay_ms: u64,
    pub immediate_delay_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            collection: defaults.collection,
            sync_delay_ms: defaults.sync_delay.as_millis() as u64,
            immediate_delay_ms: defaults.immediate_delay.as_millis() as u64,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        CacheConfig {
            collection: settings.collection.clone(),
            sync_delay: Duration::from_millis(settings.sync_delay_ms),
            immediate_delay: Duration::from_millis(settings.immediate_delay_ms),
        }
    }
}

/// Framework configuration, usually read from a JSON file.
///
/// ```rust
/// use pagekit::FrameworkConfig;
///
/// let config = FrameworkConfig::from_json_str(r#"{
///     "modules": { "Menu": { "url": "https://cdn.example.com/menu.js" } }
/// }"#).unwrap();
///
/// assert_eq!(config.namespace, "pagekit");
/// assert_eq!(config.module_key("Menu"), "pagekit.Menu");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// Prefix of every state key the framework and its modules use.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Module name to source url.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleSpec>,

    #[serde(default)]
    pub cache: CacheSettings,

    /// Where the on-disk storage engine keeps its files. In-memory storage
    /// when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            modules: BTreeMap::new(),
            cache: CacheSettings::default(),
            storage_dir: None,
        }
    }
}

impl FrameworkConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with_module(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.modules
            .insert(name.into(), ModuleSpec { url: url.into() });
        self
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        for (name, spec) in &self.modules {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyModuleName);
            }
            if name == &self.namespace || name == DOCUMENT_KEY {
                return Err(ConfigError::ReservedModuleName(name.clone()));
            }
            url::Url::parse(&spec.url).map_err(|source| ConfigError::InvalidUrl {
                module: name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Name to url lookup table.
    pub fn module_table(&self) -> HashMap<String, String> {
        self.modules
            .iter()
            .map(|(name, spec)| (name.clone(), spec.url.clone()))
            .collect()
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::from(&self.cache)
    }

    /// State key a module sets to `ready` once it has initialized.
    pub fn module_key(&self, module: &str) -> String {
        format!("{}.{}", self.namespace, module)
    }

    /// State key set to `ready` by [`Framework::startup`](crate::Framework::startup).
    pub fn bootstrap_key(&self) -> String {
        self.module_key(&self.namespace)
    }

    /// State key set to `ready` once the page has fully loaded.
    pub fn document_key(&self) -> String {
        self.module_key(DOCUMENT_KEY)
    }
}
