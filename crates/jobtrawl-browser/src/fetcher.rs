use crate::error::Result;
use jobtrawl_core::{RawPage, RenderConfig};

/// Fetch collaborator: turns a URL into extracted text and internal links.
///
/// Implementations must be safe to call concurrently; the dispatcher runs
/// many fetches against one shared fetcher.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and extract its content according to `render`.
    async fn fetch(&self, url: &str, render: &RenderConfig) -> Result<RawPage>;

    /// Short name used in logs.
    fn backend_name(&self) -> &'static str;
}
