//! Keyword pass orchestration.
//!
//! The [`Orchestrator`] drives one keyword at a time through
//! `Idle → Planning → Fetching → Deduping → FetchingItems → Enriching →
//! Persisting → Idle`. Every state runs even when its input is empty; per-page
//! and per-item failures are counted in the [`PassReport`] and never abort the
//! pass.

use crate::dedup::{count_unique, Deduplicator};
use crate::dispatcher::FetchDispatcher;
use crate::enrichment::EnrichmentFanOut;
use crate::error::{PipelineError, Result};
use crate::fanout::FanOut;
use crate::links::LinkClassifier;
use crate::pagination::{is_sentinel, PaginationPlanner};
use crate::persistence::PersistenceGateway;
use crate::pressure::{default_monitor, ResourceMonitor};
use chrono::{DateTime, Utc};
use jobtrawl_browser::PageFetcher;
use jobtrawl_core::{
    AppConfig, CrawlConfig, ItemReference, PaginationMode, RawItem, RenderSettings,
};
use jobtrawl_db::RecordStore;
use jobtrawl_llm::RecordExtractor;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Where the orchestrator is in the current pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PassState {
    /// Waiting for the next keyword
    Idle,
    /// Building the page sequence
    Planning,
    /// Fetching a batch of search pages
    Fetching {
        /// Pages in the batch
        pages: usize,
    },
    /// Filtering item links down to unique identities
    Deduping,
    /// Fetching item pages
    FetchingItems {
        /// Unique items to fetch
        items: usize,
    },
    /// Running inference on fetched items
    Enriching {
        /// Items to enrich
        items: usize,
    },
    /// Writing enriched records
    Persisting {
        /// Records to write
        records: usize,
    },
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Planning => write!(f, "planning"),
            Self::Fetching { pages } => write!(f, "fetching {pages} page(s)"),
            Self::Deduping => write!(f, "deduping"),
            Self::FetchingItems { items } => write!(f, "fetching {items} item(s)"),
            Self::Enriching { items } => write!(f, "enriching {items} item(s)"),
            Self::Persisting { records } => write!(f, "persisting {records} record(s)"),
        }
    }
}

/// Outcome counts of one keyword pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    /// Per-pass id, also carried by the pass's tracing span
    pub run_id: Uuid,
    /// Keyword as stored in `search_keyword`
    pub keyword: String,
    /// When the pass started
    pub started_at: DateTime<Utc>,
    /// Search pages in the plan
    pub pages_planned: usize,
    /// Search pages fetched successfully
    pub pages_fetched: usize,
    /// Search pages whose fetch failed
    pub page_failures: usize,
    /// First page recognised as the empty-results sentinel
    pub sentinel_page: Option<u32>,
    /// Unique items after deduplication
    pub unique_items: usize,
    /// Item pages fetched successfully
    pub items_fetched: usize,
    /// Item pages whose fetch failed
    pub item_failures: usize,
    /// Items enriched successfully
    pub enriched: usize,
    /// Items whose enrichment failed
    pub enrich_failures: usize,
    /// Records written
    pub persisted: usize,
    /// Records whose write failed
    pub persist_failures: usize,
    /// Tasks never launched because of cancellation
    pub skipped: usize,
    /// Whether cancellation was requested during the pass
    pub cancelled: bool,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

impl PassReport {
    fn new(run_id: Uuid, keyword: &str) -> Self {
        Self {
            run_id,
            keyword: keyword.to_string(),
            started_at: Utc::now(),
            pages_planned: 0,
            pages_fetched: 0,
            page_failures: 0,
            sentinel_page: None,
            unique_items: 0,
            items_fetched: 0,
            item_failures: 0,
            enriched: 0,
            enrich_failures: 0,
            persisted: 0,
            persist_failures: 0,
            skipped: 0,
            cancelled: false,
            elapsed_ms: 0,
        }
    }

    /// Whether no record was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.persisted == 0
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}': {}/{} pages, {} unique items, {} enriched, {} persisted \
             ({} page, {} item, {} enrichment, {} write failures) in {:.1}s",
            self.keyword,
            self.pages_fetched,
            self.pages_planned,
            self.unique_items,
            self.enriched,
            self.persisted,
            self.page_failures,
            self.item_failures,
            self.enrich_failures,
            self.persist_failures,
            Duration::from_millis(self.elapsed_ms).as_secs_f64(),
        )?;
        if self.cancelled {
            write!(f, " [cancelled, {} task(s) skipped]", self.skipped)?;
        }
        Ok(())
    }
}

/// Runs keyword passes against injected fetch, inference and storage backends.
pub struct Orchestrator {
    crawl: CrawlConfig,
    render: RenderSettings,
    planner: PaginationPlanner,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn RecordExtractor>,
    gateway: PersistenceGateway,
    monitor: Arc<dyn ResourceMonitor>,
    cancel: CancellationToken,
    fetch_limit: usize,
    enrich_limit: usize,
    memory_threshold_percent: f64,
    check_interval: Duration,
    enrich_timeout: Duration,
    state: watch::Sender<PassState>,
}

impl Orchestrator {
    /// Create an orchestrator from validated configuration and its collaborators.
    #[must_use]
    pub fn new(
        config: &AppConfig,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn RecordExtractor>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let (state, _) = watch::channel(PassState::Idle);
        Self {
            crawl: config.crawl.clone(),
            render: config.render.clone(),
            planner: PaginationPlanner::new(&config.crawl),
            fetcher,
            extractor,
            gateway: PersistenceGateway::new(store, config.storage.write_attempts),
            monitor: default_monitor(),
            cancel: CancellationToken::new(),
            fetch_limit: config.dispatch.concurrency,
            enrich_limit: config.llm.concurrency,
            memory_threshold_percent: config.dispatch.memory_threshold_percent,
            check_interval: Duration::from_millis(config.dispatch.check_interval_ms),
            enrich_timeout: Duration::from_secs(config.llm.timeout_secs),
            state,
        }
    }

    /// Replace the resource monitor used for launch back-off.
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<dyn ResourceMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Use `cancel` to stop launching new work.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Watch state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PassState> {
        self.state.subscribe()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PassState {
        self.state.borrow().clone()
    }

    /// Persistence gateway, for reading back stored records.
    #[must_use]
    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    /// Run one full pass for `keyword`.
    ///
    /// Only an empty keyword or an invalid link pattern fail the pass; every
    /// other problem is counted in the returned report.
    pub async fn run_pass(&self, keyword: &str) -> Result<PassReport> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(PipelineError::EmptyKeyword);
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("keyword_pass", keyword, %run_id);
        let result = self.execute(keyword, run_id).instrument(span).await;
        self.transition(PassState::Idle);
        result
    }

    fn transition(&self, next: PassState) {
        info!(state = %next, "state transition");
        self.state.send_replace(next);
    }

    fn fan_out(&self, limit: usize) -> FanOut {
        FanOut::new(limit)
            .with_cancellation(self.cancel.clone())
            .with_resource_budget(
                Arc::clone(&self.monitor),
                self.memory_threshold_percent,
                self.check_interval,
            )
    }

    async fn execute(&self, keyword: &str, run_id: Uuid) -> Result<PassReport> {
        let started = Instant::now();
        let mut report = PassReport::new(run_id, keyword);

        self.transition(PassState::Planning);
        let classifier = LinkClassifier::new(&self.crawl, keyword)?;
        let batches = self.planner.batches(keyword);
        report.pages_planned = batches.iter().map(Vec::len).sum();

        let dispatcher =
            FetchDispatcher::new(Arc::clone(&self.fetcher), self.fan_out(self.fetch_limit));
        let mut pages: Vec<(u32, Vec<ItemReference>)> = Vec::new();
        let mut remaining_batches = batches.into_iter();

        for batch in remaining_batches.by_ref() {
            self.transition(PassState::Fetching { pages: batch.len() });
            let numbers: HashMap<String, u32> =
                batch.iter().map(|p| (p.url.clone(), p.number)).collect();
            let fetched = dispatcher
                .fetch_all(
                    batch.into_iter().map(|p| p.url).collect(),
                    &self.render.search_page,
                )
                .await;
            report.page_failures += fetched.failure_count();
            report.skipped += fetched.not_started.len();

            let (successes, _) = fetched.partition();
            report.pages_fetched += successes.len();
            for (url, page) in successes {
                let Some(&number) = numbers.get(&url) else {
                    continue;
                };
                let links = classifier.item_links(&page);
                // The pseudo-item counts: a lone pseudo-item is the sentinel,
                // the pseudo-item plus one listing is not.
                if is_sentinel(count_unique(&links)) {
                    info!(page = number, "sentinel page, no further results");
                    report.sentinel_page =
                        Some(report.sentinel_page.map_or(number, |s| s.min(number)));
                }
                pages.push((number, links));
            }

            if self.cancel.is_cancelled()
                || (report.sentinel_page.is_some()
                    && self.planner.mode() == PaginationMode::Adaptive)
            {
                break;
            }
        }
        if self.cancel.is_cancelled() {
            report.skipped += remaining_batches.map(|batch| batch.len()).sum::<usize>();
        }

        self.transition(PassState::Deduping);
        if let Some(sentinel) = report.sentinel_page {
            pages.retain(|(number, _)| *number < sentinel);
        }
        pages.sort_by_key(|(number, _)| *number);
        let unique = Deduplicator::new().filter_unique_with(
            pages.into_iter().flat_map(|(_, links)| links),
            |r| classifier.is_excluded(r),
        );
        report.unique_items = unique.len();

        self.transition(PassState::FetchingItems {
            items: unique.len(),
        });
        let fetched = dispatcher.fetch_items(unique, &self.render.item_page).await;
        report.item_failures = fetched.failure_count();
        report.skipped += fetched.not_started.len();
        let (successes, _) = fetched.partition();
        let items: Vec<RawItem> = successes.into_iter().map(|(_, item)| item).collect();
        report.items_fetched = items.len();

        self.transition(PassState::Enriching { items: items.len() });
        let enrichment = EnrichmentFanOut::new(
            Arc::clone(&self.extractor),
            self.fan_out(self.enrich_limit),
            self.enrich_timeout,
        );
        let enriched = enrichment.enrich_all(items, keyword).await;
        report.enrich_failures = enriched.failure_count();
        report.skipped += enriched.not_started.len();
        let (successes, _) = enriched.partition();
        let records: Vec<_> = successes.into_iter().map(|(_, record)| record).collect();
        report.enriched = records.len();

        self.transition(PassState::Persisting {
            records: records.len(),
        });
        // Already enriched records are written even after cancellation.
        let persisted = self
            .gateway
            .persist_all(records, &FanOut::new(self.fetch_limit))
            .await;
        report.persisted = persisted.success_count();
        report.persist_failures = persisted.failure_count();

        report.cancelled = self.cancel.is_cancelled();
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            pages = report.pages_fetched,
            unique = report.unique_items,
            persisted = report.persisted,
            "pass complete: {report}"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(PassState::Idle.to_string(), "idle");
        assert_eq!(
            PassState::Fetching { pages: 3 }.to_string(),
            "fetching 3 page(s)"
        );
        assert_eq!(
            PassState::Persisting { records: 8 }.to_string(),
            "persisting 8 record(s)"
        );
    }

    #[test]
    fn test_report_display() {
        let mut report = PassReport::new(Uuid::nil(), "data-analyst");
        report.pages_planned = 3;
        report.pages_fetched = 3;
        report.unique_items = 8;
        report.enriched = 7;
        report.persisted = 7;
        report.enrich_failures = 1;
        report.elapsed_ms = 1500;

        let line = report.to_string();
        assert!(line.starts_with("'data-analyst': 3/3 pages"));
        assert!(line.contains("8 unique items"));
        assert!(line.contains("1 enrichment"));
        assert!(line.ends_with("in 1.5s"));
        assert!(!report.is_empty());
    }

    #[test]
    fn test_report_serializes() {
        let report = PassReport::new(Uuid::nil(), "k");
        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["keyword"], "k");
        assert_eq!(json["sentinel_page"], serde_json::Value::Null);
    }
}
