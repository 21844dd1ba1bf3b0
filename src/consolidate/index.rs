//! consolidate::index
//!
//! Single-writer mapping from stable repository id to its authoritative
//! record. All merges pass through this index.
//!
//! # Invariants
//!
//! - One record per id; identity is immutable once assigned
//! - The index is single-writer during a consolidation run; mutation only
//!   through `&mut self`
//! - Iteration order is ascending id, so every walk over the index is
//!   deterministic

use std::collections::BTreeMap;

use crate::core::record::{Layer, RepositoryRecord};
use crate::core::types::RepoId;

/// Identity-keyed record store for consolidation.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    records: BTreeMap<RepoId, RepositoryRecord>,
}

impl IdentityIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the record for `id`, creating it on first occurrence.
    ///
    /// The creating layer is recorded as the provenance of the identity
    /// itself.
    pub fn entry(&mut self, id: RepoId, layer: Layer) -> &mut RepositoryRecord {
        self.records.entry(id).or_insert_with(|| {
            let mut record = RepositoryRecord::new(id);
            record.provenance.record("id", layer);
            record
        })
    }

    pub fn get(&self, id: RepoId) -> Option<&RepositoryRecord> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: RepoId) -> Option<&mut RepositoryRecord> {
        self.records.get_mut(&id)
    }

    pub fn contains(&self, id: RepoId) -> bool {
        self.records.contains_key(&id)
    }

    /// Remove a record, returning it. Used only for rename-chain merges and
    /// cycle exclusion.
    pub fn remove(&mut self, id: RepoId) -> Option<RepositoryRecord> {
        self.records.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All ids in ascending order.
    pub fn ids(&self) -> Vec<RepoId> {
        self.records.keys().copied().collect()
    }

    /// Iterate records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &RepositoryRecord> {
        self.records.values()
    }

    /// Resolve a full name to the id currently carrying it.
    pub fn find_by_full_name(&self, full_name: &str) -> Option<RepoId> {
        self.records
            .values()
            .find(|r| {
                r.full_name
                    .as_ref()
                    .is_some_and(|name| name.as_str() == full_name)
            })
            .map(|r| r.id)
    }

    /// Consume the index, yielding the canonical set keyed by id.
    pub fn into_records(self) -> BTreeMap<RepoId, RepositoryRecord> {
        self.records
    }
}
