//! Local Ollama server, `/api/generate` endpoint.

use super::common::{build_http_client, normalize_base_url, send_json};
use crate::error::Result;
use crate::provider::{Completion, CompletionRequest, LlmProvider, TokenCount};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Address of an Ollama server on its default port.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const ID: &str = "ollama";

/// Ollama-backed provider. Nothing leaves the machine.
pub struct OllamaProvider {
    model: String,
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl OllamaProvider {
    /// `model` on the default local server with a two minute timeout.
    pub fn with_model(model: impl Into<String>) -> Result<Self> {
        Self::with_url(DEFAULT_OLLAMA_URL, model, 120)
    }

    /// `model` on the server at `base_url`.
    pub fn with_url(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            model: model.into(),
            client: build_http_client(timeout_secs)?,
            base_url: normalize_base_url(base_url),
            timeout_secs,
        })
    }

    fn generate_body<'a>(&'a self, request: &'a CompletionRequest) -> GenerateBody<'a> {
        GenerateBody {
            model: &self.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
            format: request.json_output.then_some("json"),
            options: GenerateOptions {
                temperature: request.sampling.temperature,
                num_predict: request.sampling.max_tokens,
            },
        }
    }
}

impl GenerateReply {
    fn into_completion(self) -> Completion {
        let tokens = self
            .prompt_eval_count
            .zip(self.eval_count)
            .map(|(prompt, answer)| TokenCount { prompt, answer });
        Completion {
            text: self.response,
            model: self.model,
            finish_reason: self
                .done_reason
                .or_else(|| self.done.then(|| "stop".to_string())),
            tokens,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let http = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&self.generate_body(request));
        let reply: GenerateReply = send_json(ID, http, self.timeout_secs).await?;
        Ok(reply.into_completion())
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_local(&self) -> bool {
        true
    }

    fn provider_id(&self) -> &str {
        ID
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    model: String,
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}
