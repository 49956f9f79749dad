//! Listing text in, [`jobtrawl_core::StructuredRecord`] out.
//!
//! [`LlmRecordExtractor`] wraps the listing text in a prompt that embeds the
//! record's JSON schema, sends it to whichever [`LlmProvider`] the config
//! selects (a local Ollama server or an `OpenAI`-compatible endpoint) in JSON
//! mode, and parses the answer strictly. Output that is not a JSON object of
//! the schema becomes [`LlmError::Schema`] rather than a guessed record.
//!
//! # Example
//!
//! ```rust,no_run
//! use jobtrawl_core::LlmConfig;
//! use jobtrawl_llm::{build_provider, LlmRecordExtractor, RecordExtractor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LlmConfig::default();
//! let extractor = LlmRecordExtractor::new(build_provider(&config)?, &config);
//!
//! let record = extractor.infer("Data Analyst at Acme Ltd. SQL required.").await?;
//! println!("title: {:?}", record.title);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod extractor;
pub mod provider;
pub mod providers;

pub use error::{LlmError, Result};
pub use extractor::{parse_record, LlmRecordExtractor, RecordExtractor};
pub use provider::{Completion, CompletionRequest, LlmProvider, Sampling, TokenCount};
pub use providers::{build_provider, OllamaProvider, OpenAiProvider};
