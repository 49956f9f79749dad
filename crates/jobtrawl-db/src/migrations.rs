//! Embedded schema migrations for the listing store.

use crate::error::{DatabaseError, Result};
use sqlx::migrate::Migrator;
use sqlx::{Pool, Sqlite};

/// Migrations compiled in from `migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Highest version shipped with this build.
#[must_use]
pub fn latest_version() -> i64 {
    MIGRATOR.iter().map(|m| m.version).max().unwrap_or(0)
}

/// Apply pending migrations. Already-applied ones are skipped.
pub async fn migrate(pool: &Pool<Sqlite>) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    tracing::debug!(version = latest_version(), "listing schema up to date");
    Ok(())
}

/// Version recorded in the database, 0 for a fresh file.
pub async fn schema_version(pool: &Pool<Sqlite>) -> Result<i64> {
    let tracked: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master \
         WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;
    if !tracked {
        return Ok(0);
    }

    let version: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;
    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ListingPool;

    async fn fresh_pool() -> ListingPool {
        ListingPool::new(":memory:", 1).await.expect("create pool")
    }

    #[test]
    fn test_latest_version() {
        assert_eq!(latest_version(), 1);
    }

    #[tokio::test]
    async fn test_migrate_creates_listing_table() {
        let pool = fresh_pool().await;
        migrate(pool.pool()).await.expect("migrate");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations'",
        )
        .fetch_all(pool.pool())
        .await
        .expect("query tables");
        assert_eq!(tables, vec!["job_listings"]);
    }

    #[tokio::test]
    async fn test_version_tracks_migration() {
        let pool = fresh_pool().await;
        assert_eq!(schema_version(pool.pool()).await.expect("version"), 0);

        migrate(pool.pool()).await.expect("first run");
        migrate(pool.pool()).await.expect("second run is a no-op");
        assert_eq!(
            schema_version(pool.pool()).await.expect("version"),
            latest_version()
        );
    }
}
