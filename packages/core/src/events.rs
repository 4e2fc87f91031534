//! Named fire-and-forget events.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ListenerResult;
use crate::listener::invoke_guarded;
use crate::state::StateValue;

/// Callback invoked with the arguments passed to [`EventBus::trigger`].
pub type EventCallback = Arc<dyn Fn(&[StateValue]) -> ListenerResult + Send + Sync>;

/// Multi-listener event dispatcher.
///
/// Listeners are kept per event name in registration order. They are never
/// deduplicated and cannot be removed. Cloning shares the listener table.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<HashMap<String, Vec<EventCallback>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<EventCallback>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `callback` to the listeners of `event`.
    ///
    /// Returns the bus so registrations can be chained.
    pub fn on<F>(&self, event: &str, callback: F) -> &Self
    where
        F: Fn(&[StateValue]) -> ListenerResult + Send + Sync + 'static,
    {
        self.lock()
            .entry(event.to_string())
            .or_default()
            .push(Arc::new(callback));
        self
    }

    /// Invoke every listener of `event` with `args`, in registration order.
    ///
    /// A failing listener is logged and skipped. Triggering an event nobody
    /// listens to does nothing.
    pub fn trigger(&self, event: &str, args: &[StateValue]) -> &Self {
        let listeners = match self.lock().get(event) {
            Some(listeners) => listeners.clone(),
            None => return self,
        };

        tracing::trace!(event, listeners = listeners.len(), "triggering event");
        for listener in listeners {
            invoke_guarded(event, || listener(args));
        }
        self
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.lock();
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(event, callbacks)| (event.as_str(), callbacks.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}
