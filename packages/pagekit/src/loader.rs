//! Fetch resources through the cache and inject them into the page.

use std::sync::Arc;

use pagekit_cache::FileCache;
use pagekit_http::{FetchResponse, Fetcher};

use crate::error::LoadError;
use crate::page::{Page, ResourceKind, ResourceNode};

/// Loads resource text and places it in the page.
pub struct ResourceLoader {
    fetcher: Arc<dyn Fetcher>,
    cache: FileCache,
    page: Arc<dyn Page>,
}

impl ResourceLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: FileCache, page: Arc<dyn Page>) -> Self {
        Self {
            fetcher,
            cache,
            page,
        }
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub fn page(&self) -> &Arc<dyn Page> {
        &self.page
    }

    /// Load the text behind `url`.
    ///
    /// With `use_cache`, a cached copy is returned when there is one, and a
    /// fetched copy is saved before returning. Any cache failure falls back
    /// to the network.
    pub async fn load_file(&self, url: &str, use_cache: bool) -> Result<String, LoadError> {
        if use_cache {
            match self.cache.load(url).await {
                Ok(content) => {
                    tracing::debug!(url, "cache hit");
                    return Ok(content);
                }
                Err(error) if error.is_miss() => tracing::debug!(url, "cache miss"),
                Err(error) => tracing::warn!(url, %error, "cache read failed, fetching"),
            }
        }

        let response = match self.fetcher.get(url).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(url, %error, "fetch failed");
                FetchResponse::transport_failure()
            }
        };
        if response.is_failure() {
            return Err(LoadError::Fetch {
                url: url.to_string(),
                status: response.status,
            });
        }

        if use_cache {
            if let Err(error) = self.cache.save(url, response.body.as_str(), None).await {
                tracing::warn!(url, %error, "could not cache fetched file");
            }
        }
        Ok(response.body)
    }

    /// Load `url` and append it under `location` as a `kind` node.
    ///
    /// Does nothing if a `kind` node for `url` is already there. Resolves
    /// with `url`.
    pub async fn load_and_append(
        &self,
        url: &str,
        kind: ResourceKind,
        location: &str,
        use_cache: bool,
    ) -> Result<String, LoadError> {
        if self.page.contains(location, kind, url) {
            return Ok(url.to_string());
        }

        let content = self.load_file(url, use_cache).await?;

        // Another load of the same url may have finished while this one was
        // fetching.
        if self.page.contains(location, kind, url) {
            return Ok(url.to_string());
        }

        let node = ResourceNode {
            kind,
            uid: url.to_string(),
            content,
        };
        self.page
            .append(location, node)
            .map_err(|source| LoadError::Page {
                url: url.to_string(),
                source,
            })?;

        tracing::debug!(url, tag = kind.tag(), location, "appended resource");
        Ok(url.to_string())
    }

    /// Load a stylesheet into the page head.
    pub async fn load_css(&self, url: &str, use_cache: bool) -> Result<String, LoadError> {
        let kind = ResourceKind::Style;
        self.load_and_append(url, kind, kind.location(), use_cache)
            .await
    }

    /// Load a script into the page body.
    pub async fn load_script(&self, url: &str, use_cache: bool) -> Result<String, LoadError> {
        let kind = ResourceKind::Script;
        self.load_and_append(url, kind, kind.location(), use_cache)
            .await
    }
}

impl std::fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
