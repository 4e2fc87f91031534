//! The document the loader injects resources into.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::PageError;

/// Kind of resource node the loader can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Style,
    Script,
}

impl ResourceKind {
    /// Tag name of the node.
    pub fn tag(self) -> &'static str {
        match self {
            ResourceKind::Style => "style",
            ResourceKind::Script => "script",
        }
    }

    /// Insertion point used by the specialised loaders.
    pub fn location(self) -> &'static str {
        match self {
            ResourceKind::Style => "head",
            ResourceKind::Script => "body",
        }
    }
}

/// A resource node: inline content marked with the URL it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    pub kind: ResourceKind,
    /// The source URL. At most one node per URL lives at a location.
    pub uid: String,
    pub content: String,
}

/// Document insertion and page-load notification.
///
/// # Object Safety
///
/// This trait is object-safe and is normally held as `Arc<dyn Page>`.
#[async_trait]
pub trait Page: Send + Sync {
    /// Whether a node of `kind` marked with `uid` exists under `location`.
    fn contains(&self, location: &str, kind: ResourceKind, uid: &str) -> bool;

    /// Append `node` under `location`.
    fn append(&self, location: &str, node: ResourceNode) -> Result<(), PageError>;

    /// Resolve once the page has fully loaded.
    async fn loaded(&self);
}

type ScriptHook = Arc<dyn Fn(&ResourceNode) + Send + Sync>;

#[derive(Default)]
struct PageInner {
    locations: BTreeMap<String, Vec<ResourceNode>>,
    hooks: Vec<ScriptHook>,
}

/// A headless in-memory page.
///
/// Has a `head` and a `body` location. Scripts do not execute by
/// themselves: hooks registered with [`on_script`](MemoryPage::on_script)
/// run after every script append and stand in for script execution.
pub struct MemoryPage {
    inner: Mutex<PageInner>,
    loaded: watch::Sender<bool>,
}

impl MemoryPage {
    /// A page that has not finished loading.
    pub fn new() -> Self {
        let mut inner = PageInner::default();
        for location in ["head", "body"] {
            inner.locations.insert(location.to_string(), Vec::new());
        }
        let (loaded, _) = watch::channel(false);
        Self {
            inner: Mutex::new(inner),
            loaded,
        }
    }

    /// A page that has already finished loading.
    pub fn loaded_page() -> Self {
        let page = Self::new();
        page.mark_loaded();
        page
    }

    fn lock(&self) -> MutexGuard<'_, PageInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Signal that the page has fully loaded.
    pub fn mark_loaded(&self) {
        self.loaded.send_replace(true);
    }

    pub fn is_loaded(&self) -> bool {
        *self.loaded.borrow()
    }

    /// Run `hook` for every script node appended from now on.
    pub fn on_script<F>(&self, hook: F)
    where
        F: Fn(&ResourceNode) + Send + Sync + 'static,
    {
        self.lock().hooks.push(Arc::new(hook));
    }

    /// Nodes under `location`, in insertion order.
    pub fn nodes(&self, location: &str) -> Vec<ResourceNode> {
        self.lock()
            .locations
            .get(location)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Page for MemoryPage {
    fn contains(&self, location: &str, kind: ResourceKind, uid: &str) -> bool {
        self.lock()
            .locations
            .get(location)
            .is_some_and(|nodes| nodes.iter().any(|n| n.kind == kind && n.uid == uid))
    }

    fn append(&self, location: &str, node: ResourceNode) -> Result<(), PageError> {
        let hooks = {
            let mut inner = self.lock();
            let nodes = inner
                .locations
                .get_mut(location)
                .ok_or_else(|| PageError::UnknownLocation(location.to_string()))?;
            nodes.push(node.clone());

            if node.kind == ResourceKind::Script {
                inner.hooks.clone()
            } else {
                Vec::new()
            }
        };

        for hook in hooks {
            hook(&node);
        }
        Ok(())
    }

    async fn loaded(&self) {
        let mut rx = self.loaded.subscribe();
        // The sender lives as long as the page, so this only ends on `true`.
        let _ = rx.wait_for(|loaded| *loaded).await;
    }
}

impl std::fmt::Debug for MemoryPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MemoryPage")
            .field("locations", &inner.locations)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn script(uid: &str) -> ResourceNode {
        ResourceNode {
            kind: ResourceKind::Script,
            uid: uid.to_string(),
            content: "run()".to_string(),
        }
    }

    #[test]
    fn kinds_map_to_tags_and_locations() {
        assert_eq!(ResourceKind::Style.tag(), "style");
        assert_eq!(ResourceKind::Style.location(), "head");
        assert_eq!(ResourceKind::Script.tag(), "script");
        assert_eq!(ResourceKind::Script.location(), "body");
    }

    #[test]
    fn append_and_contains() {
        let page = MemoryPage::new();
        page.append("body", script("https://a.com/x.js")).unwrap();

        assert!(page.contains("body", ResourceKind::Script, "https://a.com/x.js"));
        assert!(!page.contains("head", ResourceKind::Script, "https://a.com/x.js"));
        assert!(!page.contains("body", ResourceKind::Style, "https://a.com/x.js"));
        assert_eq!(page.nodes("body").len(), 1);
    }

    #[test]
    fn unknown_location_is_rejected() {
        let page = MemoryPage::new();
        let err = page.append("footer", script("u")).unwrap_err();
        assert!(matches!(err, PageError::UnknownLocation(location) if location == "footer"));
    }

    #[test]
    fn script_hooks_run_after_append() {
        let page = Arc::new(MemoryPage::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let s = seen.clone();
        let p = page.clone();
        page.on_script(move |node| {
            // The node is already in place when the hook runs.
            assert!(p.contains("body", ResourceKind::Script, &node.uid));
            s.fetch_add(1, Ordering::SeqCst);
        });

        page.append("body", script("a")).unwrap();
        page.append(
            "head",
            ResourceNode {
                kind: ResourceKind::Style,
                uid: "b".to_string(),
                content: String::new(),
            },
        )
        .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn loaded_resolves_after_mark() {
        let page = Arc::new(MemoryPage::new());
        assert!(!page.is_loaded());

        let waiter = {
            let page = page.clone();
            tokio::spawn(async move { page.loaded().await })
        };
        page.mark_loaded();
        waiter.await.unwrap();

        // Already loaded pages resolve at once.
        MemoryPage::loaded_page().loaded().await;
    }
}
