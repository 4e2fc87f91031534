//! # pagekit-core
//!
//! Synchronization primitives shared by every pagekit layer:
//!
//! - [`StateStore`]: named state variables with change notification.
//!   Modules announce readiness by setting `"<namespace>.<module>"` to
//!   `"ready"`; anything waiting on that key is released.
//! - [`EventBus`]: named, multi-listener, fire-and-forget events.
//!
//! Both primitives invoke user callbacks behind a failure boundary: a
//! callback that returns an error or panics is logged and skipped, and the
//! remaining listeners are still notified.
//!
//! # Example
//!
//! ```rust
//! use pagekit_core::{StateStore, Target};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), pagekit_core::Error> {
//! let state = StateStore::new();
//! let ready = state.wait_state("pagekit.Menu", Target::value("ready"));
//!
//! state.set_state("pagekit.Menu", "ready");
//! assert_eq!(ready.await?, "ready");
//! # Ok(())
//! # }
//! ```

mod error;
mod events;
mod listener;
mod names;
mod state;

pub use error::{Error, ListenerError, ListenerResult, Result};
pub use events::{EventBus, EventCallback};
pub use names::{split_list, NameList};
pub use state::{ListenerId, Persistence, StateCallback, StateStore, StateValue, StateWait, Target};

/// The value modules set on their state key once initialized.
pub const READY: &str = "ready";
