//! Jobtrawl Database Layer
//!
//! Persists enriched listings keyed by identity. Uses `SQLx` with `SQLite`
//! and embedded migrations; an in-memory store is available for runs that
//! should leave nothing behind.
//!
//! # Architecture
//!
//! - **Upsert by identity**: a single `INSERT ... ON CONFLICT(identity) DO UPDATE`
//!   statement, so re-runs update rows instead of duplicating them
//! - **Migrations**: SQL migrations are embedded and versioned using `SQLx`
//! - **Connection Pooling**: WAL journaling and a busy timeout for concurrent writers
//!
//! # Example
//!
//! ```ignore
//! use jobtrawl_db::{Database, RecordStore};
//!
//! let db = Database::open("jobtrawl.db", 5).await?;
//! let records = db.fetch_by_keyword("data analyst").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod listings;
pub mod migrations;
pub mod store;

// Re-export commonly used types
pub use connection::ListingPool;
pub use error::{DatabaseError, Result};
pub use store::{MemoryStore, RecordStore};

use jobtrawl_core::{StorageBackend, StorageConfig};
use std::sync::Arc;

/// `SQLite` listing store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: ListingPool,
}

impl Database {
    /// Open `url` without touching the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = ListingPool::new(url, max_connections).await?;
        Ok(Self { pool })
    }

    /// Open `url` and bring its schema up to date.
    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        let db = Self::connect(url, max_connections).await?;
        migrations::migrate(db.pool()).await?;
        Ok(db)
    }

    /// Schema version recorded in the file.
    pub async fn schema_version(&self) -> Result<i64> {
        migrations::schema_version(self.pool()).await
    }

    /// Underlying pool, for queries outside [`RecordStore`].
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.pool.pool()
    }
}

/// Open the storage backend selected by `config`, migrated and ready for use.
///
/// # Errors
/// Returns `DatabaseError` if the `SQLite` database cannot be opened or migrated.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn RecordStore>> {
    match config.backend {
        StorageBackend::Sqlite => {
            let db = Database::open(&config.database_url, config.max_connections).await?;
            Ok(Arc::new(db))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
