//! Plain HTTP fetch backend.

use crate::error::{FetchError, Result};
use crate::extract::extract_page;
use crate::fetcher::PageFetcher;
use jobtrawl_core::{DispatchConfig, RawPage, RenderConfig};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches pages with a shared `reqwest` client.
///
/// Suitable for server-rendered listing sites. Sites that build their
/// content in the browser need [`crate::BrowserEngine`] instead.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Build a fetcher with the given user agent and per-request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Build a fetcher from the dispatch settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        Self::new(&config.user_agent, config.fetch_timeout_secs)
    }

    fn map_request_error(&self, url: &str, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                seconds: self.timeout_secs,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, render: &RenderConfig) -> Result<RawPage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(url, &e))?;
        debug!(url, bytes = body.len(), "fetched page over HTTP");

        extract_page(url, &body, render)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_fetcher_from_config() {
        let fetcher = HttpFetcher::from_config(&DispatchConfig::default());
        assert!(fetcher.is_ok());
        assert_eq!(fetcher.expect("client builds").backend_name(), "http");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let fetcher = HttpFetcher::new("jobtrawl-test", 2).expect("client builds");
        let result = fetcher
            .fetch("http://127.0.0.1:9/listing", &RenderConfig::default())
            .await;

        match result {
            Err(FetchError::Network { url, .. }) | Err(FetchError::Timeout { url, .. }) => {
                assert_eq!(url, "http://127.0.0.1:9/listing");
            }
            other => panic!("expected network failure, got {other:?}"),
        }
    }
}
