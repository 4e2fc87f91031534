//! HTTP fetch abstraction.
//!
//! The loader only ever issues GET requests for resource text, so the seam
//! is a single method. It can be mocked in tests, avoiding the need for
//! actual network calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Error;
use crate::types::FetchResponse;

/// Fetches the text behind a URL.
///
/// A response with any status is `Ok`; deciding whether a status counts as
/// failure is the caller's job (see [`FetchResponse::is_failure`]). `Err` is
/// reserved for requests that never produced a response.
///
/// # Object Safety
///
/// This trait is object-safe and is normally held as `Arc<dyn Fetcher>`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse, Error>;
}

/// Production fetcher using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Create a fetcher with no request timeout.
    pub fn new() -> Result<Self, Error> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    /// Create a fetcher that gives up on requests after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, Error> {
        let url = url::Url::parse(url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Transport {
                message: format!("no transport for scheme `{}`", url.scheme()),
            });
        }
        tracing::debug!(%url, "GET");

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(FetchResponse { status, body })
    }
}

/// Mock fetcher for testing.
///
/// Returns predefined responses keyed by URL.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    #[derive(Default)]
    struct MockState {
        responses: HashMap<String, FetchResponse>,
        default_response: Option<FetchResponse>,
        recorded_requests: Vec<String>,
        error_message: Option<String>,
        delay: Option<Duration>,
    }

    /// A mock fetcher that returns predefined responses.
    ///
    /// Clones share configuration and the request log.
    #[derive(Clone, Default)]
    pub struct MockFetcher {
        state: Arc<Mutex<MockState>>,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        fn state(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Add a response for a specific URL.
        pub fn with_response(self, url: impl Into<String>, response: FetchResponse) -> Self {
            self.state().responses.insert(url.into(), response);
            self
        }

        /// Add a `200` response with `body` for a specific URL.
        pub fn with_body(self, url: impl Into<String>, body: impl Into<String>) -> Self {
            self.with_response(url, FetchResponse::ok(body))
        }

        /// Set a default response when no URL matches.
        pub fn with_default_response(self, response: FetchResponse) -> Self {
            self.state().default_response = Some(response);
            self
        }

        /// Delay every response by `delay`.
        pub fn with_delay(self, delay: Duration) -> Self {
            self.state().delay = Some(delay);
            self
        }

        /// Configure to fail all requests with a transport error.
        pub fn fail_with(self, message: impl Into<String>) -> Self {
            self.state().error_message = Some(message.into());
            self
        }

        /// Replace the response for `url` on an existing fetcher.
        pub fn set_response(&self, url: impl Into<String>, response: FetchResponse) {
            self.state().responses.insert(url.into(), response);
        }

        /// All requested URLs, in request order.
        pub fn recorded_requests(&self) -> Vec<String> {
            self.state().recorded_requests.clone()
        }

        /// How many times `url` was requested.
        pub fn request_count(&self, url: &str) -> usize {
            self.state()
                .recorded_requests
                .iter()
                .filter(|requested| requested.as_str() == url)
                .count()
        }

        pub fn clear_recorded(&self) {
            self.state().recorded_requests.clear();
        }

        /// Create a 404 Not Found response.
        pub fn not_found() -> FetchResponse {
            FetchResponse::with_status(404, "Not Found")
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn get(&self, url: &str) -> Result<FetchResponse, Error> {
            let delay = {
                let mut state = self.state();
                state.recorded_requests.push(url.to_string());
                state.delay
            };

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let state = self.state();
            if let Some(message) = &state.error_message {
                return Err(Error::Transport {
                    message: message.clone(),
                });
            }

            if let Some(response) = state.responses.get(url) {
                return Ok(response.clone());
            }

            if let Some(response) = &state.default_response {
                return Ok(response.clone());
            }

            // No match - return 404
            Ok(Self::not_found())
        }
    }
}
