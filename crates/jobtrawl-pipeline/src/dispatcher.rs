//! Concurrent fetching of search and item pages.

use crate::dedup::UniqueItem;
use crate::fanout::{FanOut, FanOutReport};
use jobtrawl_browser::{FetchError, PageFetcher};
use jobtrawl_core::{RawItem, RawPage, RenderConfig};
use std::sync::Arc;
use tracing::warn;

/// Fetches batches of URLs through one shared [`PageFetcher`].
pub struct FetchDispatcher {
    fetcher: Arc<dyn PageFetcher>,
    fan_out: FanOut,
}

impl FetchDispatcher {
    /// Create a dispatcher bounded by `fan_out`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, fan_out: FanOut) -> Self {
        Self { fetcher, fan_out }
    }

    /// Fetch every URL; each outcome is keyed by the URL it belongs to.
    ///
    /// Failures are logged with their URL and returned, never raised.
    pub async fn fetch_all(
        &self,
        urls: Vec<String>,
        render: &RenderConfig,
    ) -> FanOutReport<String, RawPage, FetchError> {
        let report = self
            .fan_out
            .run(urls, Clone::clone, |url| {
                let fetcher = Arc::clone(&self.fetcher);
                async move { fetcher.fetch(&url, render).await }
            })
            .await;

        for failed in report.outcomes.iter().filter_map(|a| a.outcome.as_ref().err()) {
            warn!(
                backend = self.fetcher.backend_name(),
                "page fetch failed: {failed}"
            );
        }
        report
    }

    /// Fetch the page of every unique item, keyed by the item.
    pub async fn fetch_items(
        &self,
        items: Vec<UniqueItem>,
        render: &RenderConfig,
    ) -> FanOutReport<UniqueItem, RawItem, FetchError> {
        let report = self
            .fan_out
            .run(items, Clone::clone, |item| {
                let fetcher = Arc::clone(&self.fetcher);
                async move {
                    let page = fetcher.fetch(&item.reference.url, render).await?;
                    Ok::<_, FetchError>(RawItem {
                        identity: item.identity,
                        url: page.url,
                        extracted_text: page.extracted_text,
                    })
                }
            })
            .await;

        for (item, failed) in report
            .outcomes
            .iter()
            .filter_map(|a| a.outcome.as_ref().err().map(|e| (&a.key, e)))
        {
            warn!(identity = %item.identity, "item fetch failed: {failed}");
        }
        report
    }
}
