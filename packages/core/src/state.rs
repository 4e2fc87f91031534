//! State variables with change notification.
//!
//! A state variable is a named slot holding the last value written to it.
//! Listeners attach to one key and fire when a write changes the value to
//! their target (or to anything, for [`Target::Any`]). One-shot listeners
//! are dropped after their first firing; persistent listeners stay.
//!
//! Writes that do not change the value notify nobody.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{Error, ListenerResult, Result};
use crate::listener::invoke_guarded;

/// Values held by state variables.
pub type StateValue = serde_json::Value;

/// Callback invoked with `(new_value, old_value)`.
///
/// `old_value` is `None` when the key had never been written.
pub type StateCallback =
    Arc<dyn Fn(&StateValue, Option<&StateValue>) -> ListenerResult + Send + Sync>;

/// Which values a listener fires on.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Fire on every change.
    Any,
    /// Fire when the variable changes to exactly this value.
    Value(StateValue),
}

impl Target {
    pub fn value(value: impl Into<StateValue>) -> Self {
        Target::Value(value.into())
    }

    pub fn matches(&self, value: &StateValue) -> bool {
        match self {
            Target::Any => true,
            Target::Value(target) => target == value,
        }
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Target::Value(StateValue::from(value))
    }
}

impl From<StateValue> for Target {
    fn from(value: StateValue) -> Self {
        Target::Value(value)
    }
}

/// Whether a listener survives its first firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persistence {
    #[default]
    Once,
    Persistent,
}

/// Identifies a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    target: Target,
    persistence: Persistence,
    callback: StateCallback,
}

#[derive(Default)]
struct StateInner {
    values: HashMap<String, StateValue>,
    listeners: HashMap<String, Vec<Listener>>,
    next_id: u64,
}

/// Key/value store of state variables.
///
/// Cloning is cheap and every clone sees the same variables. Callbacks run
/// with no internal lock held, so a callback may read or write state
/// (including the key that fired it).
#[derive(Clone, Default)]
pub struct StateStore {
    inner: Arc<Mutex<StateInner>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current value of `key`, or `None` if it was never written.
    pub fn get_state(&self, key: &str) -> Option<StateValue> {
        self.lock().values.get(key).cloned()
    }

    /// Write `value` to `key` and notify matching listeners.
    ///
    /// Writing the value the key already holds is a no-op. Listeners are
    /// snapshotted before any of them runs and fire in registration order.
    /// Fired one-shot listeners are removed before their callback runs, so a
    /// reentrant write cannot fire them a second time.
    pub fn set_state(&self, key: &str, value: impl Into<StateValue>) {
        let value = value.into();

        let (old_value, fired) = {
            let mut inner = self.lock();
            let old_value = inner.values.insert(key.to_string(), value.clone());
            if old_value.as_ref() == Some(&value) {
                return;
            }

            let mut fired = Vec::new();
            if let Some(listeners) = inner.listeners.get_mut(key) {
                listeners.retain(|listener| {
                    if !listener.target.matches(&value) {
                        return true;
                    }
                    fired.push(listener.callback.clone());
                    listener.persistence == Persistence::Persistent
                });
            }
            (old_value, fired)
        };

        tracing::trace!(key, %value, listeners = fired.len(), "state changed");

        for callback in fired {
            invoke_guarded(key, || callback(&value, old_value.as_ref()));
        }
    }

    /// Register `callback` to fire when `key` reaches `target`.
    ///
    /// If `key` already holds the target value the callback fires right away
    /// with `(value, value)`. A one-shot listener that fired this way is not
    /// registered; a persistent one is, and keeps firing on later matches.
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
        let target = target.into();
        let callback: StateCallback = Arc::new(callback);

        let (id, current) = {
            let mut inner = self.lock();
            let id = ListenerId(inner.next_id);
            inner.next_id += 1;

            let current = match (&target, inner.values.get(key)) {
                (Target::Value(wanted), Some(current)) if wanted == current => {
                    Some(current.clone())
                }
                _ => None,
            };

            if persistence == Persistence::Persistent || current.is_none() {
                inner
                    .listeners
                    .entry(key.to_string())
                    .or_default()
                    .push(Listener {
                        id,
                        target,
                        persistence,
                        callback: callback.clone(),
                    });
            }
            (id, current)
        };

        if let Some(current) = current {
            invoke_guarded(key, || callback(&current, Some(&current)));
        }
        id
    }

    /// Wait once for `key` to reach `target`.
    ///
    /// The returned future resolves with the matching value. It resolves
    /// immediately if the key already holds a concrete target value.
    pub fn wait_state(&self, key: &str, target: impl Into<Target>) -> StateWait {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));

        self.wait_state_with(key, target, Persistence::Once, move |value, _old| {
            let sender = tx.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(sender) = sender {
                let _ = sender.send(value.clone());
            }
            Ok(())
        });

        StateWait {
            key: key.to_string(),
            rx,
        }
    }

    /// Number of listeners currently registered on `key`.
    pub fn listener_count(&self, key: &str) -> usize {
        self.lock().listeners.get(key).map_or(0, Vec::len)
    }

    /// Whether the listener `id` is still registered on `key`.
    pub fn is_listening(&self, key: &str, id: ListenerId) -> bool {
        self.lock()
            .listeners
            .get(key)
            .is_some_and(|listeners| listeners.iter().any(|l| l.id == id))
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("StateStore")
            .field("values", &inner.values)
            .field("listener_keys", &inner.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One-shot wait on a state variable, returned by [`StateStore::wait_state`].
#[must_use = "a StateWait does nothing unless awaited"]
pub struct StateWait {
    key: String,
    rx: oneshot::Receiver<StateValue>,
}

impl StateWait {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Future for StateWait {
    type Output = Result<StateValue>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::WaitAbandoned {
                key: this.key.clone(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
