use jobtrawl_core::{ConfigError, Identity};
use jobtrawl_db::DatabaseError;
use jobtrawl_llm::LlmError;
use thiserror::Error;

/// An item URL that yields no identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("no path segment to derive an identity from in {url}")]
    NoPathSegment { url: String },
}

/// Per-item enrichment failure. Recoverable: the item is skipped and reported.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("inference failed for {identity}: {source}")]
    Inference {
        identity: Identity,
        #[source]
        source: LlmError,
    },

    #[error("inference for {identity} timed out after {seconds}s")]
    Timeout { identity: Identity, seconds: u64 },
}

impl EnrichError {
    /// Identity of the item that failed.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        match self {
            Self::Inference { identity, .. } | Self::Timeout { identity, .. } => identity,
        }
    }
}

/// Per-record persistence failure, after the gateway gave up retrying.
#[derive(Debug, Error)]
#[error("failed to persist {identity} after {attempts} attempt(s): {source}")]
pub struct PersistError {
    pub identity: Identity,
    pub attempts: u32,
    #[source]
    pub source: DatabaseError,
}

/// Errors that abort a keyword pass before any work is dispatched.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("keyword is empty")]
    EmptyKeyword,

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] DatabaseError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
