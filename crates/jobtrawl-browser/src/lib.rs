//! Page fetching for search and item pages.
//!
//! Provides the [`PageFetcher`] seam the pipeline fetches through, with a
//! plain HTTP implementation and a headless Chromium implementation, plus
//! the HTML extraction shared by both.

pub mod engine;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod http;

pub use engine::BrowserEngine;
pub use error::{FetchError, Result};
pub use extract::extract_page;
pub use fetcher::PageFetcher;
pub use http::HttpFetcher;
