//! forks
//!
//! Derives fork relationship edges from parent/source id references,
//! validated against the final retained record set.
//!
//! # Design
//!
//! Two-pass indexed lookup: the canonical map is the id index, and one scan
//! over it emits edges. Edges are purely derived - rebuilding from an
//! unchanged canonical set is idempotent and deterministic. Duplicate edges
//! on the same ordered pair collapse to one.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::core::record::{ForkEdge, RepositoryRecord};
use crate::core::types::RepoId;

/// Accounting for one fork derivation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForkSummary {
    pub edges: usize,
    /// References whose target is absent or `not_found`; the edge is
    /// dropped and counted.
    pub dangling_references: usize,
}

impl std::fmt::Display for ForkSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fork edges: {} (dangling references dropped: {})",
            self.edges, self.dangling_references
        )
    }
}

/// Build the fork edge set for a canonical record set.
///
/// An edge is emitted iff both endpoints are present in the set and
/// neither is `not_found`.
pub fn build_fork_edges(
    records: &BTreeMap<RepoId, RepositoryRecord>,
) -> (BTreeSet<ForkEdge>, ForkSummary) {
    // First pass: collect candidate ordered pairs, collapsing the
    // parent/source duplication up front.
    let mut candidates: BTreeSet<ForkEdge> = BTreeSet::new();
    for record in records.values() {
        if !record.is_active() {
            continue;
        }
        for parent in [record.parent_id, record.source_id].into_iter().flatten() {
            candidates.insert(ForkEdge {
                child: record.id,
                parent,
            });
        }
    }

    // Second pass: validate each pair against the retained id set.
    let mut edges = BTreeSet::new();
    let mut summary = ForkSummary::default();
    for edge in candidates {
        let valid = records
            .get(&edge.parent)
            .is_some_and(RepositoryRecord::is_active);
        if valid {
            edges.insert(edge);
        } else {
            debug!(child = %edge.child, parent = %edge.parent, "dangling fork reference dropped");
            summary.dangling_references += 1;
        }
    }
    summary.edges = edges.len();
    (edges, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::RepositoryRecord;

    fn id(n: i64) -> RepoId {
        RepoId::new(n).unwrap()
    }

    fn records(
        specs: &[(i64, Option<i64>, Option<i64>, bool)],
    ) -> BTreeMap<RepoId, RepositoryRecord> {
        specs
            .iter()
            .map(|&(n, parent, source, not_found)| {
                let mut record = RepositoryRecord::new(id(n));
                record.parent_id = parent.map(|p| id(p));
                record.source_id = source.map(|s| id(s));
                record.not_found = not_found;
                (record.id, record)
            })
            .collect()
    }

    #[test]
    fn no_references_no_edges() {
        let set = records(&[(10, None, None, false)]);
        let (edges, summary) = build_fork_edges(&set);
        assert!(edges.is_empty());
        assert_eq!(summary.dangling_references, 0);
    }

    #[test]
    fn parent_and_source_collapse_to_one_edge() {
        let set = records(&[(10, None, None, false), (11, Some(10), Some(10), false)]);
        let (edges, summary) = build_fork_edges(&set);
        assert_eq!(edges.len(), 1);
        assert!(edges.contains(&ForkEdge {
            child: id(11),
            parent: id(10)
        }));
        assert_eq!(summary.edges, 1);
    }

    #[test]
    fn absent_parent_is_dangling() {
        let set = records(&[(12, Some(99), None, false)]);
        let (edges, summary) = build_fork_edges(&set);
        assert!(edges.is_empty());
        assert_eq!(summary.dangling_references, 1);
    }

    #[test]
    fn not_found_parent_is_dangling() {
        let set = records(&[(10, None, None, true), (11, Some(10), None, false)]);
        let (edges, summary) = build_fork_edges(&set);
        assert!(edges.is_empty());
        assert_eq!(summary.dangling_references, 1);
    }

    #[test]
    fn not_found_child_is_excluded_silently() {
        let set = records(&[(10, None, None, false), (11, Some(10), None, true)]);
        let (edges, summary) = build_fork_edges(&set);
        assert!(edges.is_empty());
        assert_eq!(summary.dangling_references, 0);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let set = records(&[
            (10, None, None, false),
            (11, Some(10), Some(10), false),
            (12, Some(99), None, false),
        ]);
        let (first, _) = build_fork_edges(&set);
        let (second, _) = build_fork_edges(&set);
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_parent_and_source_yield_two_edges() {
        let set = records(&[
            (1, None, None, false),
            (2, None, None, false),
            (3, Some(1), Some(2), false),
        ]);
        let (edges, _) = build_fork_edges(&set);
        assert_eq!(edges.len(), 2);
    }
}
