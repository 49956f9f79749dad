//! End-to-end keyword passes against scripted fetch and inference backends.

use async_trait::async_trait;
use jobtrawl_browser::{FetchError, PageFetcher};
use jobtrawl_core::{AppConfig, PaginationMode, RawPage, RenderConfig, StructuredRecord};
use jobtrawl_db::{Database, MemoryStore, RecordStore};
use jobtrawl_llm::{LlmError, RecordExtractor};
use jobtrawl_pipeline::{NoopMonitor, Orchestrator, PassState, PipelineError};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const SEARCH: &str = "https://hk.jobsdb.com/data-analyst-jobs";
const PSEUDO_ITEM: &str = "https://hk.jobsdb.com/data-analyst-jobs/81999999?type=standard";

fn item_url(n: u32) -> String {
    format!("https://hk.jobsdb.com/job/8100000{n}?type=standard")
}

fn page_url(n: u32) -> String {
    format!("{SEARCH}?page={n}")
}

/// Serves scripted search pages; any other URL is an item page whose text
/// names the URL. Unscripted search pages have no links.
#[derive(Default)]
struct ScriptedFetcher {
    pages: HashMap<String, Vec<String>>,
    broken: HashSet<String>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn page(mut self, n: u32, items: &[u32]) -> Self {
        let mut links: Vec<String> = vec![
            "https://hk.jobsdb.com/companies/acme".to_string(),
            PSEUDO_ITEM.to_string(),
        ];
        links.extend(items.iter().map(|&i| item_url(i)));
        self.pages.insert(page_url(n), links);
        self
    }

    fn sentinel(mut self, n: u32) -> Self {
        let links = vec![PSEUDO_ITEM.to_string()];
        self.pages.insert(page_url(n), links);
        self
    }

    fn broken(mut self, url: String) -> Self {
        self.broken.insert(url);
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("lock").clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _render: &RenderConfig) -> jobtrawl_browser::Result<RawPage> {
        self.requested.lock().expect("lock").push(url.to_string());
        tokio::task::yield_now().await;

        if self.broken.contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 502,
            });
        }
        let (text, links) = match self.pages.get(url) {
            Some(links) => (String::new(), links.clone()),
            None if url.starts_with(SEARCH) => (String::new(), Vec::new()),
            None => (format!("listing at {url}"), Vec::new()),
        };
        Ok(RawPage {
            url: url.to_string(),
            extracted_text: text,
            links,
        })
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

/// Uses the item text as the title. Fails for texts containing `fail_on`,
/// and trips `cancel_on_call` when invoked.
#[derive(Default)]
struct ScriptedExtractor {
    fail_on: Option<String>,
    cancel_on_call: Option<CancellationToken>,
}

#[async_trait]
impl RecordExtractor for ScriptedExtractor {
    async fn infer(&self, text: &str) -> jobtrawl_llm::Result<StructuredRecord> {
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }
        tokio::task::yield_now().await;
        if self.fail_on.as_deref().is_some_and(|marker| text.contains(marker)) {
            return Err(LlmError::Schema {
                provider: "scripted".to_string(),
                reason: "expected a JSON object".to_string(),
            });
        }
        Ok(StructuredRecord {
            title: Some(text.to_string()),
            skills: vec!["SQL".to_string()],
            ..StructuredRecord::default()
        })
    }
}

fn config(max_pages: u32, mode: PaginationMode) -> AppConfig {
    let mut config = AppConfig::default();
    config.crawl.max_pages = max_pages;
    config.crawl.pagination_mode = mode;
    config.dispatch.concurrency = 3;
    config.llm.concurrency = 2;
    config
}

/// Page 1: five items; page 2: five items, two shared with page 1; page 3: sentinel.
fn three_page_site() -> ScriptedFetcher {
    ScriptedFetcher::default()
        .page(1, &[1, 2, 3, 4, 5])
        .page(2, &[4, 5, 6, 7, 8])
        .sentinel(3)
}

fn orchestrator(
    config: &AppConfig,
    fetcher: &Arc<ScriptedFetcher>,
    extractor: ScriptedExtractor,
    store: &Arc<dyn RecordStore>,
) -> Orchestrator {
    Orchestrator::new(
        config,
        Arc::clone(fetcher) as Arc<dyn PageFetcher>,
        Arc::new(extractor),
        Arc::clone(store),
    )
    .with_monitor(Arc::new(NoopMonitor))
}

async fn sqlite_store(dir: &tempfile::TempDir) -> Arc<dyn RecordStore> {
    let path = dir.path().join("listings.db");
    let db = Database::open(path.to_str().expect("utf-8 path"), 4)
        .await
        .expect("open database");
    Arc::new(db)
}

async fn stored(store: &Arc<dyn RecordStore>, keyword: &str) -> u64 {
    store.count_by_keyword(keyword).await.expect("count")
}

#[tokio::test]
async fn test_three_page_pass_persists_eight_records() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = sqlite_store(&dir).await;
    let fetcher = Arc::new(three_page_site());
    let orchestrator = orchestrator(
        &config(3, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    );

    let report = orchestrator.run_pass("data-analyst").await.expect("pass");

    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.sentinel_page, Some(3));
    assert_eq!(report.unique_items, 8);
    assert_eq!(report.enriched, 8);
    assert_eq!(report.persisted, 8);
    assert_eq!(stored(&store, "data-analyst").await, 8);

    let item_requests = fetcher
        .requested()
        .into_iter()
        .filter(|url| url.contains("/job/"))
        .count();
    assert_eq!(item_requests, 8);
    assert!(!fetcher.requested().iter().any(|url| url == PSEUDO_ITEM));

    let id = jobtrawl_pipeline::resolve(&item_url(6)).expect("identity");
    let record = store
        .fetch_by_identity(&id)
        .await
        .expect("fetch")
        .expect("record stored");
    assert_eq!(record.source_url, item_url(6));
    assert_eq!(record.search_keyword, "data-analyst");
    assert_eq!(orchestrator.state(), PassState::Idle);
}

#[tokio::test]
async fn test_rerun_updates_in_place() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = sqlite_store(&dir).await;
    let fetcher = Arc::new(three_page_site());
    let orchestrator = orchestrator(
        &config(3, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    );

    let first = orchestrator.run_pass("data-analyst").await.expect("pass");
    let second = orchestrator.run_pass("data-analyst").await.expect("pass");

    assert_eq!(first.persisted, 8);
    assert_eq!(second.persisted, 8);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(stored(&store, "data-analyst").await, 8);
    assert_eq!(store.list_identities().await.expect("list").len(), 8);
}

#[tokio::test]
async fn test_one_enrichment_failure() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(three_page_site());
    let orchestrator = orchestrator(
        &config(3, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor {
            fail_on: Some("81000003".to_string()),
            ..ScriptedExtractor::default()
        },
        &store,
    );

    let report = orchestrator.run_pass("data-analyst").await.expect("pass");

    assert_eq!(report.unique_items, 8);
    assert_eq!(report.enrich_failures, 1);
    assert_eq!(report.persisted, 7);
    assert_eq!(stored(&store, "data-analyst").await, 7);
    let missing = jobtrawl_pipeline::resolve(&item_url(3)).expect("identity");
    assert!(store
        .fetch_by_identity(&missing)
        .await
        .expect("fetch")
        .is_none());
}

#[tokio::test]
async fn test_adaptive_mode_stops_at_sentinel() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(three_page_site().page(4, &[9]).page(5, &[9]));
    let orchestrator = orchestrator(
        &config(5, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    );

    let report = orchestrator.run_pass("data-analyst").await.expect("pass");

    let requested = fetcher.requested();
    assert!(requested.contains(&page_url(3)));
    assert!(!requested.contains(&page_url(4)));
    assert!(!requested.contains(&page_url(5)));
    assert_eq!(report.pages_planned, 5);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.persisted, 8);
}

#[tokio::test]
async fn test_single_listing_last_page_is_kept() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page(1, &[1, 2, 3, 4, 5])
            .page(2, &[9])
            .sentinel(3),
    );
    let orchestrator = orchestrator(
        &config(3, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    );

    let report = orchestrator.run_pass("data-analyst").await.expect("pass");

    assert!(fetcher.requested().contains(&page_url(3)));
    assert!(fetcher.requested().contains(&item_url(9)));
    assert_eq!(report.sentinel_page, Some(3));
    assert_eq!(report.unique_items, 6);
    assert_eq!(report.persisted, 6);
    assert_eq!(stored(&store, "data-analyst").await, 6);
}

#[tokio::test]
async fn test_eager_mode_ignores_pages_after_sentinel() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(three_page_site().page(4, &[9, 10]));
    let orchestrator = orchestrator(
        &config(5, PaginationMode::Eager),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    );

    let report = orchestrator.run_pass("data-analyst").await.expect("pass");

    let requested = fetcher.requested();
    assert!(requested.contains(&page_url(4)));
    assert!(requested.contains(&page_url(5)));
    assert_eq!(report.pages_fetched, 5);
    assert_eq!(report.sentinel_page, Some(3));
    assert_eq!(report.unique_items, 8);
    assert_eq!(stored(&store, "data-analyst").await, 8);
}

#[tokio::test]
async fn test_failed_page_is_skipped() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(three_page_site().broken(page_url(2)));
    let orchestrator = orchestrator(
        &config(3, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    );

    let report = orchestrator.run_pass("data-analyst").await.expect("pass");

    assert_eq!(report.page_failures, 1);
    assert_eq!(report.sentinel_page, Some(3));
    assert_eq!(report.persisted, 5);
}

#[tokio::test]
async fn test_failed_item_is_skipped() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(three_page_site().broken(item_url(7)));
    let orchestrator = orchestrator(
        &config(3, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    );

    let report = orchestrator.run_pass("data-analyst").await.expect("pass");

    assert_eq!(report.item_failures, 1);
    assert_eq!(report.items_fetched, 7);
    assert_eq!(report.persisted, 7);
}

#[tokio::test]
async fn test_zero_result_pass() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(ScriptedFetcher::default().sentinel(1));
    let orchestrator = orchestrator(
        &config(3, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    );

    let report = orchestrator.run_pass("data-analyst").await.expect("pass");

    assert_eq!(report.sentinel_page, Some(1));
    assert_eq!(report.unique_items, 0);
    assert!(report.is_empty());
    assert_eq!(fetcher.requested(), vec![page_url(1)]);
}

#[tokio::test]
async fn test_keyword_is_slugged_and_trimmed() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(three_page_site());
    let orchestrator = orchestrator(
        &config(3, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    );

    let keyword = "  Data Analyst ";
    let report = orchestrator.run_pass(keyword).await.expect("pass");

    assert_eq!(report.keyword, "Data Analyst");
    assert_eq!(fetcher.requested()[0], page_url(1));
    assert_eq!(stored(&store, "Data Analyst").await, 8);
}

#[tokio::test]
async fn test_empty_keyword_is_rejected() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(three_page_site());
    let orchestrator = orchestrator(
        &config(3, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    );

    assert!(matches!(
        orchestrator.run_pass("   ").await,
        Err(PipelineError::EmptyKeyword)
    ));
    assert!(fetcher.requested().is_empty());
}

#[tokio::test]
async fn test_cancellation_drains_and_persists_enriched() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(three_page_site());
    let cancel = CancellationToken::new();
    let mut config = config(3, PaginationMode::Adaptive);
    config.llm.concurrency = 1;

    let orchestrator = orchestrator(
        &config,
        &fetcher,
        ScriptedExtractor {
            cancel_on_call: Some(cancel.clone()),
            ..ScriptedExtractor::default()
        },
        &store,
    )
    .with_cancellation(cancel);

    let report = orchestrator.run_pass("data-analyst").await.expect("pass");

    assert!(report.cancelled);
    assert_eq!(report.items_fetched, 8);
    assert_eq!(report.enriched, 1);
    assert_eq!(report.skipped, 7);
    assert_eq!(report.persisted, 1);
    assert_eq!(stored(&store, "data-analyst").await, 1);
    assert_eq!(orchestrator.state(), PassState::Idle);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(three_page_site());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let orchestrator = orchestrator(
        &config(3, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    )
    .with_cancellation(cancel);

    let report = orchestrator.run_pass("data-analyst").await.expect("pass");

    assert!(report.cancelled);
    assert_eq!(report.pages_fetched, 0);
    assert_eq!(report.skipped, 3);
    assert!(fetcher.requested().is_empty());
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_state_watch_returns_to_idle() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(three_page_site());
    let orchestrator = orchestrator(
        &config(3, PaginationMode::Adaptive),
        &fetcher,
        ScriptedExtractor::default(),
        &store,
    );
    let mut states = orchestrator.subscribe();

    orchestrator.run_pass("data-analyst").await.expect("pass");

    assert!(states.has_changed().expect("sender alive"));
    assert_eq!(*states.borrow_and_update(), PassState::Idle);
}
