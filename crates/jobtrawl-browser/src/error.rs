use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Failure to fetch or extract one page.
///
/// Per-URL variants carry the URL so failures stay attributable after they
/// leave the fan-out.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("timeout after {seconds}s fetching {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },
}

impl FetchError {
    /// URL the error belongs to, if it is a per-URL failure.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::ChromiumError(_) | Self::Client(_) => None,
            Self::InvalidUrl { url, .. }
            | Self::Network { url, .. }
            | Self::Navigation { url, .. }
            | Self::Timeout { url, .. }
            | Self::Status { url, .. }
            | Self::Extraction { url, .. } => Some(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FetchError::Status {
            url: "https://example.com/a".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "HTTP 503 from https://example.com/a");
    }

    #[test]
    fn test_error_url() {
        let err = FetchError::Timeout {
            url: "https://example.com/slow".to_string(),
            seconds: 30,
        };
        assert_eq!(err.url(), Some("https://example.com/slow"));
        let err = FetchError::ChromiumError("launch".to_string());
        assert!(err.url().is_none());
    }
}
