//! Error types for the core layer.

use thiserror::Error;

/// Errors surfaced by the state store.
#[derive(Debug, Error)]
pub enum Error {
    /// The store was dropped before the awaited value was reached.
    #[error("wait on state `{key}` abandoned: state store dropped")]
    WaitAbandoned { key: String },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by a state or event listener.
///
/// Listener errors never reach the code that changed the state or fired the
/// event. They are logged and the next listener runs.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// What a listener callback returns.
pub type ListenerResult = std::result::Result<(), ListenerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_abandoned_display() {
        let e = Error::WaitAbandoned {
            key: "pagekit.Menu".to_string(),
        };
        let display = format!("{}", e);
        assert!(display.contains("pagekit.Menu"));
        assert!(display.contains("abandoned"));
    }

    #[test]
    fn listener_error_from_str() {
        let e: ListenerError = "boom".into();
        assert_eq!(e.message(), "boom");
        assert_eq!(format!("{}", e), "boom");
    }

    #[test]
    fn listener_error_from_string() {
        let e = ListenerError::from(format!("bad value {}", 3));
        assert_eq!(e.message(), "bad value 3");
    }
}
