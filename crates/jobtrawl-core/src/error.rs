//! Startup errors.
//!
//! Configuration problems are the only errors that abort the process. Every
//! other failure is scoped to a single page, item, or record and lives in the
//! crate that produces it.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The platform has no per-user config directory
    #[error("no per-user config directory on this platform")]
    NoConfigDir,

    /// An explicitly requested config file does not exist
    #[error("config file {} does not exist", path.display())]
    NotFound {
        /// Requested path
        path: PathBuf,
    },

    /// The file is not valid TOML for [`crate::AppConfig`]
    #[error("{}: {source}", path.display())]
    Syntax {
        /// File being read
        path: PathBuf,
        /// Parser diagnostic
        source: toml::de::Error,
    },

    /// The configuration could not be rendered as TOML
    #[error("cannot encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    /// Reading or writing the file failed
    #[error("config I/O: {0}")]
    Io(#[from] std::io::Error),

    /// A setting the selected backends need is empty
    #[error("{field} must be set")]
    MissingSetting {
        /// Dotted setting name
        field: String,
    },

    /// A setting is out of range or unparseable
    #[error("{field}: {reason}")]
    InvalidValue {
        /// Dotted setting name
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        Self::MissingSetting {
            field: field.to_string(),
        }
    }
}

/// Result alias for configuration loading and validation.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
