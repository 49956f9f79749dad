//! Concurrent enrichment of fetched items.

use crate::error::EnrichError;
use crate::fanout::{FanOut, FanOutReport};
use jobtrawl_core::{EnrichedRecord, Identity, RawItem};
use jobtrawl_llm::RecordExtractor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Runs one inference call per item and stamps the results.
pub struct EnrichmentFanOut {
    extractor: Arc<dyn RecordExtractor>,
    fan_out: FanOut,
    timeout: Duration,
}

impl EnrichmentFanOut {
    /// Create an enrichment stage; each inference call is bounded by `timeout`.
    #[must_use]
    pub fn new(extractor: Arc<dyn RecordExtractor>, fan_out: FanOut, timeout: Duration) -> Self {
        Self {
            extractor,
            fan_out,
            timeout,
        }
    }

    /// Enrich every item, keyed by identity.
    ///
    /// Identity, source URL and `keyword` are attached here from the item
    /// itself; the extractor only ever sees the item's text.
    pub async fn enrich_all(
        &self,
        items: Vec<RawItem>,
        keyword: &str,
    ) -> FanOutReport<Identity, EnrichedRecord, EnrichError> {
        let report = self
            .fan_out
            .run(
                items,
                |item| item.identity.clone(),
                |item| self.enrich_one(item, keyword),
            )
            .await;

        for failed in report.outcomes.iter().filter_map(|a| a.outcome.as_ref().err()) {
            warn!(identity = %failed.identity(), "enrichment failed: {failed}");
        }
        report
    }

    async fn enrich_one(
        &self,
        item: RawItem,
        keyword: &str,
    ) -> Result<EnrichedRecord, EnrichError> {
        let inference =
            tokio::time::timeout(self.timeout, self.extractor.infer(&item.extracted_text));
        let structured = match inference.await {
            Ok(Ok(structured)) => structured,
            Ok(Err(source)) => {
                return Err(EnrichError::Inference {
                    identity: item.identity,
                    source,
                })
            }
            Err(_) => {
                return Err(EnrichError::Timeout {
                    identity: item.identity,
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        debug!(identity = %item.identity, "item enriched");
        Ok(EnrichedRecord::from_structured(
            item.identity,
            item.url,
            keyword,
            structured,
        ))
    }
}
