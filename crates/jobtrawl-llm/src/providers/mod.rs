//! LLM provider implementations.

pub mod common;
pub mod ollama;
pub mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;
use jobtrawl_core::{LlmConfig, LlmProviderKind};
use std::sync::Arc;

/// Build the provider selected by `config.provider`.
///
/// # Errors
/// Returns error if an `OpenAI` provider has no API key or the HTTP client
/// cannot be created.
pub fn build_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.provider {
        LlmProviderKind::Ollama => Ok(Arc::new(OllamaProvider::with_url(
            &config.base_url,
            &config.model,
            config.timeout_secs,
        )?)),
        LlmProviderKind::OpenAi => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| LlmError::Config("openai provider needs an API key".into()))?;
            Ok(Arc::new(OpenAiProvider::with_url(
                &config.base_url,
                api_key,
                &config.model,
                config.timeout_secs,
            )?))
        }
    }
}
