//! # pagekit-http
//!
//! The transport seam used to fetch module and resource text.
//!
//! [`Fetcher`] is a one-method async trait; [`ReqwestFetcher`] implements it
//! over a reqwest client. With the `test-utils` feature (always on for this
//! crate's own tests) a `fetcher::mock::MockFetcher` serves canned responses
//! and records every requested URL.
//!
//! ```ignore
//! use pagekit_http::{Fetcher, ReqwestFetcher};
//!
//! let fetcher = ReqwestFetcher::new()?;
//! let response = fetcher.get("https://example.com/menu.js").await?;
//! if !response.is_failure() {
//!     println!("{}", response.body);
//! }
//! ```

pub mod error;
pub mod fetcher;
pub mod types;

pub use error::Error;
pub use fetcher::{Fetcher, ReqwestFetcher};
pub use types::FetchResponse;
