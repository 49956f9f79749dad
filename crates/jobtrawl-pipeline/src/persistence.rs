//! Idempotent persistence of enriched records.

use crate::error::PersistError;
use crate::fanout::{FanOut, FanOutReport};
use jobtrawl_core::{EnrichedRecord, Identity};
use jobtrawl_db::{DatabaseError, RecordStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default pause before the first retry; later retries wait proportionally longer.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Upserts records by identity, retrying transient lock conflicts.
///
/// Writes for the same identity are serialized by the store's atomic upsert,
/// so the gateway holds no lock of its own.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn RecordStore>,
    write_attempts: u32,
    retry_delay: Duration,
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("backend", &self.store.backend_name())
            .field("write_attempts", &self.write_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl PersistenceGateway {
    /// Wrap `store`; each record gets at most `write_attempts` tries (at least one).
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, write_attempts: u32) -> Self {
        Self {
            store,
            write_attempts: write_attempts.max(1),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the base retry delay.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Insert `record`, or overwrite the stored record with its identity.
    pub async fn upsert(&self, record: &EnrichedRecord) -> Result<(), PersistError> {
        let mut attempt = 1;
        loop {
            match self.store.upsert(record).await {
                Ok(()) => {
                    debug!(identity = %record.identity, attempt, "record persisted");
                    return Ok(());
                }
                Err(e) if e.is_transient() && attempt < self.write_attempts => {
                    warn!(
                        identity = %record.identity,
                        attempt,
                        "transient write failure, retrying: {e}"
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                    attempt += 1;
                }
                Err(source) => {
                    return Err(PersistError {
                        identity: record.identity.clone(),
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }

    /// Upsert every record concurrently under `fan_out`.
    ///
    /// A failing record never affects the others. The fan-out should not carry
    /// a cancellation token: records that were already enriched are persisted
    /// even when the pass is being cancelled.
    pub async fn persist_all(
        &self,
        records: Vec<EnrichedRecord>,
        fan_out: &FanOut,
    ) -> FanOutReport<Identity, (), PersistError> {
        let report = fan_out
            .run(
                records,
                |record| record.identity.clone(),
                |record| async move { self.upsert(&record).await },
            )
            .await;

        for failed in report.outcomes.iter().filter_map(|a| a.outcome.as_ref().err()) {
            warn!(identity = %failed.identity, "persist failed: {failed}");
        }
        report
    }

    /// Records stored under `keyword`, in first-stored order.
    pub async fn fetch_by_keyword(
        &self,
        keyword: &str,
    ) -> Result<Vec<EnrichedRecord>, DatabaseError> {
        self.store.fetch_by_keyword(keyword).await
    }

    /// The stored record for `identity`, if any.
    pub async fn fetch_by_identity(
        &self,
        identity: &Identity,
    ) -> Result<Option<EnrichedRecord>, DatabaseError> {
        self.store.fetch_by_identity(identity).await
    }

    /// Number of records stored under `keyword`.
    pub async fn count_by_keyword(&self, keyword: &str) -> Result<u64, DatabaseError> {
        self.store.count_by_keyword(keyword).await
    }

    /// Every stored identity, ascending.
    pub async fn list_identities(&self) -> Result<Vec<Identity>, DatabaseError> {
        self.store.list_identities().await
    }

    /// Remove the record for `identity`. Returns whether it existed.
    pub async fn delete(&self, identity: &Identity) -> Result<bool, DatabaseError> {
        self.store.delete(identity).await
    }

    /// Name of the underlying backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}
