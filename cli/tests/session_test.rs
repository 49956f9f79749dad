//! Keyword loop behaviour against scripted backends.

use async_trait::async_trait;
use jobtrawl_browser::PageFetcher;
use jobtrawl_cli::{load_config, write_config, Cli, Session, SessionEnd};
use jobtrawl_core::{AppConfig, RawPage, RenderConfig, StructuredRecord};
use jobtrawl_db::{MemoryStore, RecordStore};
use jobtrawl_llm::RecordExtractor;
use jobtrawl_pipeline::{NoopMonitor, Orchestrator};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

/// Page 1 lists two items; every later search page is empty.
struct TwoItemSite;

#[async_trait]
impl PageFetcher for TwoItemSite {
    async fn fetch(&self, url: &str, _render: &RenderConfig) -> jobtrawl_browser::Result<RawPage> {
        let links = if url.ends_with("-jobs?page=1") {
            vec![
                "https://hk.jobsdb.com/job/81000001?type=standard".to_string(),
                "https://hk.jobsdb.com/job/81000002?type=standard".to_string(),
            ]
        } else {
            Vec::new()
        };
        Ok(RawPage {
            url: url.to_string(),
            extracted_text: format!("Analyst role at {url}"),
            links,
        })
    }

    fn backend_name(&self) -> &'static str {
        "two-item"
    }
}

struct TitleExtractor;

#[async_trait]
impl RecordExtractor for TitleExtractor {
    async fn infer(&self, _text: &str) -> jobtrawl_llm::Result<StructuredRecord> {
        Ok(StructuredRecord {
            title: Some("Data Analyst".to_string()),
            location: Some("Central".to_string()),
            ..StructuredRecord::default()
        })
    }
}

fn orchestrator(store: &Arc<dyn RecordStore>, cancel: &CancellationToken) -> Orchestrator {
    let mut config = AppConfig::default();
    config.crawl.max_pages = 3;
    Orchestrator::new(
        &config,
        Arc::new(TwoItemSite),
        Arc::new(TitleExtractor),
        Arc::clone(store),
    )
    .with_monitor(Arc::new(NoopMonitor))
    .with_cancellation(cancel.clone())
}

async fn stored(store: &Arc<dyn RecordStore>, keyword: &str) -> u64 {
    store.count_by_keyword(keyword).await.expect("count")
}

#[tokio::test]
async fn test_keywords_until_quit() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let cancel = CancellationToken::new();
    let orchestrator = orchestrator(&store, &cancel);
    let session = Session::new(&orchestrator, "q", cancel);

    let input = BufReader::new("data analyst\n\n   \nq\nnever reached\n".as_bytes());
    let mut output = Vec::new();
    let end = session.run(input, &mut output).await.expect("session");

    assert_eq!(end, SessionEnd::Quit);
    let printed = String::from_utf8(output).expect("utf-8 output");
    let summary = "'data analyst': 2/3 pages, 2 unique items";
    assert!(printed.contains(summary));
    assert!(!printed.contains("never reached"));
    assert_eq!(stored(&store, "data analyst").await, 2);
    assert_eq!(stored(&store, "never reached").await, 0);
}

#[tokio::test]
async fn test_quit_token_ignores_case() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let cancel = CancellationToken::new();
    let orchestrator = orchestrator(&store, &cancel);
    let session = Session::new(&orchestrator, "q", cancel);

    let mut output = Vec::new();
    let end = session
        .run(BufReader::new("Q\ndata analyst\n".as_bytes()), &mut output)
        .await
        .expect("session");

    assert_eq!(end, SessionEnd::Quit);
    assert_eq!(stored(&store, "Q").await, 0);
    assert_eq!(stored(&store, "data analyst").await, 0);
}

#[tokio::test]
async fn test_end_of_input() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let cancel = CancellationToken::new();
    let orchestrator = orchestrator(&store, &cancel);
    let session = Session::new(&orchestrator, "q", cancel);

    let end = session
        .run(BufReader::new("".as_bytes()), &mut Vec::new())
        .await
        .expect("session");
    assert_eq!(end, SessionEnd::EndOfInput);
}

#[tokio::test]
async fn test_cancelled_session_stops_prompting() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let orchestrator = orchestrator(&store, &cancel);
    let session = Session::new(&orchestrator, "q", cancel);

    let (_writer, reader) = tokio::io::duplex(64);
    let end = session
        .run(BufReader::new(reader), &mut Vec::new())
        .await
        .expect("session");
    assert_eq!(end, SessionEnd::Cancelled);
}

#[tokio::test]
async fn test_report_written_per_keyword() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let cancel = CancellationToken::new();
    let orchestrator = orchestrator(&store, &cancel);
    let dir = tempfile::tempdir().expect("create temp dir");
    let report_dir = Some(dir.path().to_path_buf());
    let session = Session::new(&orchestrator, "q", cancel).with_report_dir(report_dir);

    let mut output = Vec::new();
    session
        .run_keyword("Data Analyst", &mut output)
        .await
        .expect("pass");

    let report = std::fs::read_to_string(dir.path().join("Job_Report_keyword-data-analyst.txt"))
        .expect("report file");
    assert!(report.starts_with("Job report for 'Data Analyst'"));
    assert!(report.contains("2 listing(s)"));
    assert!(report.contains("Location: Central"));
}

#[test]
fn test_missing_explicit_config_is_fatal() {
    let cli = Cli {
        config: Some("/nonexistent/jobtrawl.toml".into()),
        ..Cli::default()
    };
    assert!(load_config(&cli).is_err());
}

#[test]
fn test_invalid_override_is_fatal() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    AppConfig::default().save(&path).expect("save config");

    let cli = Cli {
        config: Some(path),
        max_pages: Some(0),
        ..Cli::default()
    };
    assert!(load_config(&cli).is_err());
}

#[test]
fn test_write_config_saves_effective_settings() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("nested").join("config.toml");
    let cli = Cli {
        config: Some(path.clone()),
        max_pages: Some(4),
        write_config: true,
        ..Cli::default()
    };

    let written = write_config(&cli).expect("write config");
    assert_eq!(written, path);

    let loaded = AppConfig::load(Some(&path)).expect("reload written config");
    assert_eq!(loaded.crawl.max_pages, 4);
    let defaults = AppConfig::default();
    assert_eq!(loaded.crawl.quit_token, defaults.crawl.quit_token);
}

#[test]
fn test_write_config_rejects_invalid_settings() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    let cli = Cli {
        config: Some(path.clone()),
        concurrency: Some(0),
        write_config: true,
        ..Cli::default()
    };

    assert!(write_config(&cli).is_err());
    assert!(!path.exists());
}
