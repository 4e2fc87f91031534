use serde::{Deserialize, Serialize};

/// The outcome of a GET request that reached the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// HTTP status code. `0` means the request never produced a response.
    pub status: u16,

    /// Response body as text.
    #[serde(default)]
    pub body: String,
}

impl FetchResponse {
    /// A `200` response with `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The status-0 response reported when the transport itself failed.
    pub fn transport_failure() -> Self {
        Self {
            status: 0,
            body: String::new(),
        }
    }

    /// Whether this response counts as a failed fetch: a client or server
    /// error status, or no response at all.
    pub fn is_failure(&self) -> bool {
        self.status == 0 || self.status >= 400
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_statuses() {
        assert!(!FetchResponse::ok("x").is_failure());
        assert!(!FetchResponse::with_status(304, "").is_failure());
        assert!(FetchResponse::with_status(404, "").is_failure());
        assert!(FetchResponse::with_status(503, "").is_failure());
        assert!(FetchResponse::transport_failure().is_failure());
    }

    #[test]
    fn body_defaults_when_missing() {
        let response: FetchResponse = serde_json::from_str(r#"{"status": 204}"#).unwrap();
        assert_eq!(response, FetchResponse::with_status(204, ""));
    }
}
