//! Listing store failures.

use thiserror::Error;

/// `SQLite` primary result codes that signal a retryable lock conflict.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Why a store operation failed.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Bad connection string, or the file could not be opened
    #[error("cannot open listing store: {0}")]
    Open(String),

    /// Schema migration did not apply
    #[error("schema migration failed: {0}")]
    Migration(String),

    /// A stored row does not map back to a listing
    #[error("corrupt listing row: {0}")]
    Decode(String),

    /// A listing field could not be encoded for storage
    #[error("cannot encode listing: {0}")]
    Encode(String),

    /// Query-level failure from `SQLx`
    #[error("sqlite: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Whether the write may succeed if attempted again.
    ///
    /// True for `SQLite` busy/locked conflicts and pool acquisition timeouts.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlx(sqlx::Error::PoolTimedOut) => true,
            Self::Sqlx(sqlx::Error::Database(db)) => db
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
            _ => false,
        }
    }
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
