//! consolidate::renames
//!
//! Rename-chain resolution with cycle detection.
//!
//! # Algorithm
//!
//! After the layer fold, each record's `renamed_to` chain is walked to a
//! terminal node over an explicit name-to-id adjacency map. Traversal is
//! iterative with a visited-set guard so pathological chains cannot
//! overflow the stack. Multiple old ids converging on one terminal is
//! valid (ownership-transfer aliasing); the terminal retains the most
//! recent snapshot among the merged records. A cycle is a structural
//! error: every id on the affected chain is excluded and reported, and the
//! run continues.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::core::types::RepoId;

use super::index::IdentityIndex;

/// A rename chain that loops back on itself. The whole chain is excluded
/// from the canonical set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameCycle {
    /// Ids on the chain, in walk order from the starting id.
    pub chain: Vec<RepoId>,
}

/// Outcome of rename resolution.
#[derive(Debug, Default)]
pub struct RenameOutcome {
    /// Alias records merged into their terminal record.
    pub merged: usize,
    /// Detected cycles; their ids were removed from the index.
    pub cycles: Vec<RenameCycle>,
}

impl RenameOutcome {
    /// Every id excluded by cycle detection.
    pub fn excluded_ids(&self) -> BTreeSet<RepoId> {
        self.cycles
            .iter()
            .flat_map(|c| c.chain.iter().copied())
            .collect()
    }
}

enum WalkResult {
    Terminal(RepoId),
    Cycle(Vec<RepoId>),
}

/// Resolve every rename chain in the index.
pub fn resolve(index: &mut IdentityIndex) -> RenameOutcome {
    // Adjacency is resolved over the pre-merge name assignment; merging
    // never rewrites full names, so one map suffices for all walks.
    let name_to_id: BTreeMap<String, RepoId> = index
        .iter()
        .filter_map(|r| {
            r.full_name
                .as_ref()
                .map(|name| (name.as_str().to_string(), r.id))
        })
        .collect();

    let mut outcome = RenameOutcome::default();
    let mut excluded: BTreeSet<RepoId> = BTreeSet::new();
    let mut merges: Vec<(RepoId, RepoId)> = Vec::new();

    for id in index.ids() {
        if excluded.contains(&id) {
            continue;
        }
        match walk_chain(index, &name_to_id, id, &excluded) {
            WalkResult::Terminal(terminal) if terminal != id => {
                merges.push((id, terminal));
            }
            WalkResult::Terminal(_) => {}
            WalkResult::Cycle(chain) => {
                warn!(?chain, "rename cycle excluded");
                excluded.extend(chain.iter().copied());
                outcome.cycles.push(RenameCycle { chain });
            }
        }
    }

    for id in &excluded {
        index.remove(*id);
    }

    // Merge aliases in ascending id order so converging chains resolve
    // deterministically.
    for (alias_id, terminal_id) in merges {
        if excluded.contains(&terminal_id) {
            // The terminal fell inside a cycle; the alias chain dangles
            // into excluded territory and goes with it.
            index.remove(alias_id);
            continue;
        }
        merge_alias(index, alias_id, terminal_id);
        outcome.merged += 1;
    }

    outcome
}

/// Walk one id's rename chain to its terminal node.
fn walk_chain(
    index: &IdentityIndex,
    name_to_id: &BTreeMap<String, RepoId>,
    start: RepoId,
    excluded: &BTreeSet<RepoId>,
) -> WalkResult {
    let mut chain = vec![start];
    let mut visited: BTreeSet<RepoId> = BTreeSet::new();
    visited.insert(start);
    let mut current = start;

    loop {
        let target = index
            .get(current)
            .and_then(|r| r.renamed_to.as_ref())
            .and_then(|name| name_to_id.get(name.as_str()).copied());

        let Some(next) = target else {
            // No outgoing mapping, or the target name is outside the
            // dataset: this node is terminal.
            return WalkResult::Terminal(current);
        };
        if next == current {
            return WalkResult::Cycle(chain);
        }
        if visited.contains(&next) || excluded.contains(&next) {
            return WalkResult::Cycle(chain);
        }
        visited.insert(next);
        chain.push(next);
        current = next;
    }
}

/// Fold an alias record into its terminal, then drop the alias.
fn merge_alias(index: &mut IdentityIndex, alias_id: RepoId, terminal_id: RepoId) {
    let Some(alias) = index.remove(alias_id) else {
        return;
    };
    let Some(terminal) = index.get_mut(terminal_id) else {
        return;
    };
    debug!(%alias_id, %terminal_id, "merging renamed record into terminal");

    terminal.packages.extend(alias.packages);

    // Ownership-transfer aliasing keeps the most recent snapshot.
    let alias_newer = match (alias.snapshot_timestamp, terminal.snapshot_timestamp) {
        (Some(a), Some(t)) => a > t,
        (Some(_), None) => true,
        _ => false,
    };
    if alias_newer {
        terminal.snapshot = alias.snapshot;
        terminal.snapshot_timestamp = alias.snapshot_timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::Layer;
    use crate::core::types::FullName;

    fn id(n: i64) -> RepoId {
        RepoId::new(n).unwrap()
    }

    fn insert(index: &mut IdentityIndex, n: i64, full_name: &str, renamed_to: Option<&str>) {
        let record = index.entry(id(n), Layer::Scrape);
        record.full_name = Some(FullName::new(full_name).unwrap());
        record.renamed_to = renamed_to.map(|t| FullName::new(t).unwrap());
    }

    #[test]
    fn chain_resolves_to_terminal() {
        let mut index = IdentityIndex::new();
        insert(&mut index, 1, "x/a", Some("x/b"));
        insert(&mut index, 2, "x/b", Some("x/c"));
        insert(&mut index, 3, "x/c", None);

        let outcome = resolve(&mut index);
        assert_eq!(outcome.merged, 2);
        assert!(outcome.cycles.is_empty());
        assert_eq!(index.ids(), vec![id(3)]);
    }

    #[test]
    fn cycle_excludes_whole_chain() {
        let mut index = IdentityIndex::new();
        insert(&mut index, 1, "x/a", Some("x/b"));
        insert(&mut index, 2, "x/b", Some("x/a"));
        insert(&mut index, 3, "x/c", None);

        let outcome = resolve(&mut index);
        assert_eq!(outcome.cycles.len(), 1);
        assert_eq!(outcome.excluded_ids(), [id(1), id(2)].into_iter().collect());
        assert_eq!(index.ids(), vec![id(3)]);
    }

    #[test]
    fn self_rename_is_a_cycle() {
        let mut index = IdentityIndex::new();
        insert(&mut index, 1, "x/a", Some("x/a"));

        let outcome = resolve(&mut index);
        assert_eq!(outcome.cycles.len(), 1);
        assert!(index.is_empty());
    }

    #[test]
    fn converging_chains_keep_most_recent_snapshot() {
        let mut index = IdentityIndex::new();
        insert(&mut index, 1, "x/a", Some("x/c"));
        insert(&mut index, 2, "x/b", Some("x/c"));
        insert(&mut index, 3, "x/c", None);
        index.get_mut(id(1)).unwrap().snapshot_timestamp = Some(300);
        index.get_mut(id(1)).unwrap().snapshot = Some("mirror/a".into());
        index.get_mut(id(2)).unwrap().snapshot_timestamp = Some(100);
        index.get_mut(id(3)).unwrap().snapshot_timestamp = Some(200);

        let outcome = resolve(&mut index);
        assert_eq!(outcome.merged, 2);
        let terminal = index.get(id(3)).unwrap();
        assert_eq!(terminal.snapshot_timestamp, Some(300));
        assert_eq!(terminal.snapshot.as_deref(), Some("mirror/a"));
    }

    #[test]
    fn rename_to_unknown_name_is_terminal() {
        let mut index = IdentityIndex::new();
        insert(&mut index, 1, "x/a", Some("gone/elsewhere"));

        let outcome = resolve(&mut index);
        assert_eq!(outcome.merged, 0);
        assert!(outcome.cycles.is_empty());
        assert_eq!(index.ids(), vec![id(1)]);
    }

    #[test]
    fn merged_alias_packages_union_into_terminal() {
        let mut index = IdentityIndex::new();
        insert(&mut index, 1, "x/a", Some("x/b"));
        insert(&mut index, 2, "x/b", None);
        index
            .get_mut(id(1))
            .unwrap()
            .packages
            .insert(crate::core::types::PackageName::new("com.a").unwrap());
        index
            .get_mut(id(2))
            .unwrap()
            .packages
            .insert(crate::core::types::PackageName::new("com.b").unwrap());

        resolve(&mut index);
        assert_eq!(index.get(id(2)).unwrap().packages.len(), 2);
    }

    #[test]
    fn chain_into_cycle_is_excluded() {
        let mut index = IdentityIndex::new();
        insert(&mut index, 1, "x/a", Some("x/b"));
        insert(&mut index, 2, "x/b", Some("x/c"));
        insert(&mut index, 3, "x/c", Some("x/b"));

        let outcome = resolve(&mut index);
        // b<->c cycle plus the chain a that leads into it.
        assert!(index.is_empty(), "all chain members excluded");
        assert!(!outcome.cycles.is_empty());
    }
}
