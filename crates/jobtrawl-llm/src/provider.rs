//! Inference backend seam.
//!
//! Extraction is single-turn: one instruction block, one listing prompt, one
//! JSON answer. The request type carries exactly that.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An inference backend shared by every enrichment task.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one prompt to completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Model the backend was configured with.
    fn model(&self) -> &str;

    /// True when inference runs on this machine.
    fn is_local(&self) -> bool;

    /// Short backend name used in logs and errors.
    fn provider_id(&self) -> &str;
}

/// Sampling limits applied to a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    /// 0.0 is deterministic
    pub temperature: Option<f32>,
    /// Answer length cap
    pub max_tokens: Option<u32>,
}

/// A single-turn prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Instructions placed ahead of the prompt
    pub system: Option<String>,
    /// Listing prompt
    pub prompt: String,
    /// Sampling limits
    pub sampling: Sampling,
    /// Constrain the answer to a JSON object where the backend supports it
    pub json_output: bool,
}

impl CompletionRequest {
    /// Prompt with default sampling and free-form output.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            sampling: Sampling::default(),
            json_output: false,
        }
    }

    /// Set the instruction block.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set temperature and answer length.
    #[must_use]
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.sampling = Sampling {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
        };
        self
    }

    /// Ask for a JSON object answer.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// What a backend answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Raw answer text
    pub text: String,
    /// Model name as reported by the backend
    pub model: String,
    /// Why generation stopped, e.g. "stop" or "length"
    pub finish_reason: Option<String>,
    /// Token counts
    pub tokens: Option<TokenCount>,
}

/// Prompt and answer token counts, when the backend reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCount {
    /// Tokens consumed by the prompt
    pub prompt: u32,
    /// Tokens generated
    pub answer: u32,
}

impl TokenCount {
    /// Sum of both counts.
    #[must_use]
    pub fn total(self) -> u32 {
        self.prompt.saturating_add(self.answer)
    }
}
