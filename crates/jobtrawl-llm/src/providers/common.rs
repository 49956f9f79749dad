//! HTTP plumbing shared by the providers.

use crate::error::{LlmError, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Client whose every request is bounded by `timeout_secs`.
pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LlmError::Client(e.to_string()))
}

/// Send a prepared request and decode a successful JSON body.
///
/// Timeouts map to [`LlmError::Timeout`], non-2xx statuses to
/// [`LlmError::Status`] with the body text, and undecodable bodies to
/// [`LlmError::Decode`].
pub async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
    timeout_secs: u64,
) -> Result<T> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            LlmError::Timeout {
                seconds: timeout_secs,
            }
        } else {
            LlmError::Network(e)
        }
    })?;
    let response = reject_status(provider, response).await?;

    response.json().await.map_err(|e| LlmError::Decode {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}

async fn reject_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(LlmError::Status {
        provider: provider.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Strip trailing slashes so endpoint paths can be appended.
pub fn normalize_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}
