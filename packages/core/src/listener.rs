//! Failure boundary around listener invocations.

use std::panic::{self, AssertUnwindSafe};

use crate::error::ListenerResult;

/// Run one listener callback, containing its failure.
///
/// An `Err` result or a panic is logged against `source` and dropped, so the
/// caller can move on to the next listener.
pub(crate) fn invoke_guarded<F>(source: &str, callback: F)
where
    F: FnOnce() -> ListenerResult,
{
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            tracing::warn!(source, %error, "listener returned an error");
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::warn!(source, panic = %message, "listener panicked");
        }
    }
}
