//! Inference failures. Each one is scoped to the listing being enriched.

use thiserror::Error;

/// Why an inference call produced no record.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Backend answered with a non-success HTTP status
    #[error("{provider} answered HTTP {status}: {body}")]
    Status {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body, as much as could be read
        body: String,
    },

    /// Backend reply was not in its documented wire format
    #[error("{provider} sent an undecodable reply: {message}")]
    Decode {
        /// Provider name
        provider: String,
        /// Decoder message
        message: String,
    },

    /// Model text is not a listing record
    #[error("{provider} output is not a listing record: {reason}")]
    Schema {
        /// Provider name
        provider: String,
        /// What was wrong with the output
        reason: String,
    },

    /// Provider settings cannot work, e.g. a remote backend without a key
    #[error("provider misconfigured: {0}")]
    Config(String),

    /// Connection-level failure
    #[error("transport failure: {0}")]
    Network(#[from] reqwest::Error),

    /// No answer within the configured request timeout
    #[error("no answer within {seconds}s")]
    Timeout {
        /// Configured timeout
        seconds: u64,
    },

    /// HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Result alias for inference calls.
pub type Result<T> = std::result::Result<T, LlmError>;
