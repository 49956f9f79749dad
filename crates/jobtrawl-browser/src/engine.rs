use crate::error::{FetchError, Result};
use crate::extract::extract_page;
use crate::fetcher::PageFetcher;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use jobtrawl_core::{RawPage, RenderConfig};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Headless Chromium fetch backend for pages rendered by JavaScript.
pub struct BrowserEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    timeout: Duration,
}

impl BrowserEngine {
    /// Launch a browser. Each page load is bounded by `timeout_secs`.
    pub async fn launch(timeout_secs: u64, headless: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(Duration::from_secs(timeout_secs));
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(FetchError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::ChromiumError(e.to_string()))?;

        // Drive the CDP connection until the browser goes away
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    async fn load_html(&self, url: &str) -> Result<String> {
        let navigation = |e: chromiumoxide::error::CdpError| FetchError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        };

        let page = self.browser.new_page(url).await.map_err(navigation)?;
        let content = async {
            page.wait_for_navigation().await?;
            page.content().await
        }
        .await
        .map_err(navigation);

        if let Err(e) = page.close().await {
            warn!(url, "failed to close page: {e}");
        }
        content
    }

    /// Close the browser and stop its event handler.
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| FetchError::ChromiumError(e.to_string()))?;
        if let Err(e) = self.browser.wait().await {
            debug!("browser process wait failed: {e}");
        }
        self.handler.abort();
        Ok(())
    }
}

#[async_trait::async_trait]
impl PageFetcher for BrowserEngine {
    async fn fetch(&self, url: &str, render: &RenderConfig) -> Result<RawPage> {
        let html = tokio::time::timeout(self.timeout, self.load_html(url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            })??;
        debug!(url, bytes = html.len(), "rendered page in browser");

        extract_page(url, &html, render)
    }

    fn backend_name(&self) -> &'static str {
        "browser"
    }
}
