//! Storage backends behind one record-store interface.

use crate::error::Result;
use crate::{listings, Database};
use async_trait::async_trait;
use jobtrawl_core::{EnrichedRecord, Identity};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence boundary for enriched records, keyed by identity.
///
/// Implementations must make `upsert` atomic per identity: concurrent writes
/// for different identities never interfere, and repeated writes of one
/// identity leave exactly one record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert the record, or replace the stored record with the same identity.
    async fn upsert(&self, record: &EnrichedRecord) -> Result<()>;

    /// Fetch one record by identity.
    async fn fetch_by_identity(&self, identity: &Identity) -> Result<Option<EnrichedRecord>>;

    /// Fetch every record stored under a search keyword, in first-stored order.
    async fn fetch_by_keyword(&self, keyword: &str) -> Result<Vec<EnrichedRecord>>;

    /// Count the records stored under a search keyword.
    async fn count_by_keyword(&self, keyword: &str) -> Result<u64>;

    /// All stored identities in ascending order.
    async fn list_identities(&self) -> Result<Vec<Identity>>;

    /// Remove a record. Returns whether it existed.
    async fn delete(&self, identity: &Identity) -> Result<bool>;

    /// Short name used in logs.
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl RecordStore for Database {
    async fn upsert(&self, record: &EnrichedRecord) -> Result<()> {
        listings::upsert_listing(self.pool(), record).await
    }

    async fn fetch_by_identity(&self, identity: &Identity) -> Result<Option<EnrichedRecord>> {
        listings::get_by_identity(self.pool(), identity).await
    }

    async fn fetch_by_keyword(&self, keyword: &str) -> Result<Vec<EnrichedRecord>> {
        listings::get_by_keyword(self.pool(), keyword).await
    }

    async fn count_by_keyword(&self, keyword: &str) -> Result<u64> {
        listings::count_by_keyword(self.pool(), keyword).await
    }

    async fn list_identities(&self) -> Result<Vec<Identity>> {
        listings::list_identities(self.pool()).await
    }

    async fn delete(&self, identity: &Identity) -> Result<bool> {
        listings::delete_listing(self.pool(), identity).await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    records: HashMap<Identity, (u64, EnrichedRecord)>,
    next_seq: u64,
}

/// Process-local record store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert(&self, record: &EnrichedRecord) -> Result<()> {
        let mut state = self.state.write().await;
        let seq = match state.records.get(&record.identity) {
            Some((seq, _)) => *seq,
            None => {
                state.next_seq += 1;
                state.next_seq
            }
        };
        state
            .records
            .insert(record.identity.clone(), (seq, record.clone()));
        Ok(())
    }

    async fn fetch_by_identity(&self, identity: &Identity) -> Result<Option<EnrichedRecord>> {
        let state = self.state.read().await;
        Ok(state.records.get(identity).map(|(_, r)| r.clone()))
    }

    async fn fetch_by_keyword(&self, keyword: &str) -> Result<Vec<EnrichedRecord>> {
        let state = self.state.read().await;
        let mut matching: Vec<_> = state
            .records
            .values()
            .filter(|(_, r)| r.search_keyword == keyword)
            .collect();
        matching.sort_by_key(|(seq, _)| *seq);
        Ok(matching.into_iter().map(|(_, r)| r.clone()).collect())
    }

    async fn count_by_keyword(&self, keyword: &str) -> Result<u64> {
        let state = self.state.read().await;
        let count = state
            .records
            .values()
            .filter(|(_, r)| r.search_keyword == keyword)
            .count();
        Ok(count as u64)
    }

    async fn list_identities(&self) -> Result<Vec<Identity>> {
        let state = self.state.read().await;
        let mut ids: Vec<_> = state.records.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, identity: &Identity) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.records.remove(identity).is_some())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
