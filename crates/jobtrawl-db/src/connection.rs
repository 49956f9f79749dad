//! Database connection management.
//!
//! Provides a `ListingPool` wrapper around `SQLx` that applies the pragmas the
//! pipeline relies on for concurrent upserts.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// `SQLite` connection pool for the listing store.
#[derive(Debug, Clone)]
pub struct ListingPool {
    pool: Pool<Sqlite>,
}

impl ListingPool {
    /// Open (or create) the database at `url`.
    ///
    /// `url` may be a plain file path, a `sqlite:` URL, or `:memory:`.
    /// File databases use WAL journaling; in-memory databases are limited to
    /// one connection so every query sees the same data.
    ///
    /// # Errors
    /// Returns `DatabaseError::Open` if the URL is invalid or the database
    /// cannot be opened.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = is_in_memory(url);

        let mut connect_options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
            .busy_timeout(BUSY_TIMEOUT)
            .create_if_missing(true);
        if !in_memory {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        let max_connections = if in_memory { 1 } else { max_connections.max(1) };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .map_err(|e| DatabaseError::Open(format!("failed to initialize pool: {e}")))?;

        tracing::info!(url, max_connections, "Database pool created");

        Ok(Self { pool })
    }

    /// Get a reference to the underlying `SQLx` pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
