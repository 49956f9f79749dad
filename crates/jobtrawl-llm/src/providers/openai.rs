//! `OpenAI`-compatible `/chat/completions` servers.

use super::common::{build_http_client, normalize_base_url, send_json};
use crate::error::{LlmError, Result};
use crate::provider::{Completion, CompletionRequest, LlmProvider, TokenCount};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Public `OpenAI` API base URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

const ID: &str = "openai";

/// Remote chat completions provider. Listing text is sent off the machine.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl OpenAiProvider {
    /// `model` on the public API with a one minute timeout.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_url(DEFAULT_OPENAI_URL, api_key, model, 60)
    }

    /// `model` on any compatible server at `base_url`.
    pub fn with_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            client: build_http_client(timeout_secs)?,
            base_url: normalize_base_url(base_url),
            timeout_secs,
        })
    }

    fn chat_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatBody<'a> {
        let system = request.system.as_deref().map(|content| ChatTurn {
            role: "system",
            content,
        });
        let user = ChatTurn {
            role: "user",
            content: &request.prompt,
        };

        ChatBody {
            model: &self.model,
            messages: system.into_iter().chain(std::iter::once(user)).collect(),
            max_tokens: request.sampling.max_tokens,
            temperature: request.sampling.temperature,
            response_format: request
                .json_output
                .then_some(ResponseFormat {
                    kind: "json_object",
                }),
        }
    }
}

impl ChatReply {
    fn into_completion(self) -> Result<Completion> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Decode {
                provider: ID.to_string(),
                message: "reply has no choices".to_string(),
            })?;

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            model: self.model,
            finish_reason: choice.finish_reason,
            tokens: self.usage.map(|u| TokenCount {
                prompt: u.prompt_tokens,
                answer: u.completion_tokens,
            }),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let http = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.chat_body(request));
        let reply: ChatReply = send_json(ID, http, self.timeout_secs).await?;
        reply.into_completion()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_local(&self) -> bool {
        false
    }

    fn provider_id(&self) -> &str {
        ID
    }
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<ChatTurn<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatAnswer,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatAnswer {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
