//! Application state: the collaborators a session runs against.

use anyhow::Context;
use jobtrawl_browser::{BrowserEngine, HttpFetcher, PageFetcher};
use jobtrawl_core::{AppConfig, FetchBackend};
use jobtrawl_db::RecordStore;
use jobtrawl_llm::{build_provider, LlmRecordExtractor, RecordExtractor};
use jobtrawl_pipeline::{default_monitor, Orchestrator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything acquired at startup and released at shutdown.
pub struct AppState {
    /// Validated configuration
    pub config: AppConfig,
    /// Keyword pass driver
    pub orchestrator: Orchestrator,
    /// Shared Chromium instance when the browser backend is selected.
    browser: Option<Arc<BrowserEngine>>,
}

impl AppState {
    /// Connect the configured fetch, inference and storage backends.
    pub async fn build(
        config: AppConfig,
        cancel: CancellationToken,
        headless: bool,
    ) -> anyhow::Result<Self> {
        let (fetcher, browser): (Arc<dyn PageFetcher>, _) = match config.dispatch.fetch_backend {
            FetchBackend::Http => (
                Arc::new(
                    HttpFetcher::from_config(&config.dispatch).context("building HTTP client")?,
                ),
                None,
            ),
            FetchBackend::Browser => {
                let engine = Arc::new(
                    BrowserEngine::launch(config.dispatch.fetch_timeout_secs, headless)
                        .await
                        .context("launching Chromium")?,
                );
                (Arc::clone(&engine) as Arc<dyn PageFetcher>, Some(engine))
            }
        };

        let provider = build_provider(&config.llm).context("configuring LLM provider")?;
        if !provider.is_local() {
            warn!(
                provider = provider.provider_id(),
                "listing text will be sent to a remote inference service"
            );
        }
        let model = provider.model().to_string();
        let extractor: Arc<dyn RecordExtractor> =
            Arc::new(LlmRecordExtractor::new(provider, &config.llm));

        let store = jobtrawl_db::open_store(&config.storage)
            .await
            .context("opening listing store")?;

        info!(
            fetch = fetcher.backend_name(),
            %model,
            storage = store.backend_name(),
            "collaborators ready"
        );

        let orchestrator = Orchestrator::new(&config, fetcher, extractor, store)
            .with_monitor(default_monitor())
            .with_cancellation(cancel);

        Ok(Self {
            config,
            orchestrator,
            browser,
        })
    }

    /// Release external resources.
    pub async fn shutdown(self) {
        let Self {
            orchestrator,
            browser,
            ..
        } = self;
        drop(orchestrator);

        if let Some(engine) = browser {
            match Arc::try_unwrap(engine) {
                Ok(engine) => {
                    if let Err(e) = engine.close().await {
                        warn!("failed to close browser: {e}");
                    }
                }
                Err(_) => warn!("browser still in use at shutdown"),
            }
        }
        info!("shutdown complete");
    }
}
