//! First-occurrence deduplication of item references.

use crate::identity::resolve_reference;
use jobtrawl_core::{Identity, ItemReference};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Set of identities already emitted during one keyword pass.
///
/// `insert` is atomic, so tasks discovering links concurrently can share one
/// set without two of them both claiming the same identity.
#[derive(Debug, Default)]
pub struct SeenSet {
    inner: Mutex<HashSet<Identity>>,
}

impl SeenSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn seen(&self) -> MutexGuard<'_, HashSet<Identity>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `identity`. Returns `true` if it had not been seen before.
    pub fn insert(&self, identity: &Identity) -> bool {
        let mut seen = self.seen();
        if seen.contains(identity) {
            false
        } else {
            seen.insert(identity.clone())
        }
    }

    /// Whether `identity` has been seen.
    #[must_use]
    pub fn contains(&self, identity: &Identity) -> bool {
        self.seen().contains(identity)
    }

    /// Number of identities seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen().len()
    }

    /// Whether nothing has been seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything; used between keyword passes.
    pub fn clear(&self) {
        self.seen().clear();
    }
}

/// An item reference together with its resolved identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueItem {
    /// Resolved identity
    pub identity: Identity,
    /// Reference the identity was resolved from
    pub reference: ItemReference,
}

/// Filters item references down to the first occurrence of each identity.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: SeenSet,
}

impl Deduplicator {
    /// Create a deduplicator with an empty [`SeenSet`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the first reference for each identity, in input order.
    ///
    /// References whose URL yields no identity are logged and dropped.
    pub fn filter_unique<I>(&self, references: I) -> Vec<UniqueItem>
    where
        I: IntoIterator<Item = ItemReference>,
    {
        self.filter_unique_with(references, |_| false)
    }

    /// Like [`Self::filter_unique`], additionally dropping references for
    /// which `exclude` returns `true`. Excluded references do not mark their
    /// identity as seen.
    pub fn filter_unique_with<I, F>(&self, references: I, exclude: F) -> Vec<UniqueItem>
    where
        I: IntoIterator<Item = ItemReference>,
        F: Fn(&ItemReference) -> bool,
    {
        references
            .into_iter()
            .filter_map(|reference| {
                if exclude(&reference) {
                    debug!(url = %reference.url, "excluded item reference");
                    return None;
                }
                match resolve_reference(&reference) {
                    Ok(identity) => self
                        .seen
                        .insert(&identity)
                        .then_some(UniqueItem {
                            identity,
                            reference,
                        }),
                    Err(e) => {
                        warn!("dropping item reference: {e}");
                        None
                    }
                }
            })
            .collect()
    }

    /// Identities emitted so far.
    #[must_use]
    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Start a new pass with an empty set.
    pub fn reset(&self) {
        self.seen.clear();
    }
}

/// Number of distinct identities among `references`, ignoring unresolvable ones.
#[must_use]
pub fn count_unique(references: &[ItemReference]) -> usize {
    references
        .iter()
        .filter_map(|r| resolve_reference(r).ok())
        .collect::<HashSet<_>>()
        .len()
}
