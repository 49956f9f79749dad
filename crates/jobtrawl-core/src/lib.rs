//! Shared vocabulary of the jobtrawl crates.
//!
//! Everything a crawl pass passes between stages lives here: listing
//! identities, fetched pages and items, structured and enriched records, plus
//! the layered configuration that tunes each stage.
//!
//! - [`config`]: file, environment and flag layers merged into [`AppConfig`]
//! - [`error`]: [`ConfigError`], the only error that stops the process
//! - [`types`]: [`Identity`], [`RawPage`], [`RawItem`], [`EnrichedRecord`] and friends
//!
//! # Example
//!
//! ```rust
//! use jobtrawl_core::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! config.validate()?;
//! assert_eq!(config.crawl.max_pages, 10);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, CrawlConfig, DispatchConfig, FetchBackend, LlmConfig, LlmProviderKind,
    LoggingConfig, PaginationMode, RenderSettings, StorageBackend, StorageConfig,
    KEYWORD_PLACEHOLDER,
};
pub use error::{ConfigError, ConfigResult};
pub use types::{
    EnrichedRecord, Identity, ItemReference, RawItem, RawPage, RenderConfig, StructuredRecord,
};
