//! emit
//!
//! Turns the canonical record set, the app-store records, and the match
//! table into a deterministic stream of graph writes: node and relationship
//! upserts a thin store adapter applies. Planning is pure; applying goes
//! through the [`GraphStore`] trait so the same plan drives both the JSONL
//! stream consumed externally and the in-memory store used in tests.

mod store;

pub use store::{GraphStore, MemoryGraph, WriteOutcome};

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::record::{MatchStatus, PackageMatch, RepositoryRecord};
use crate::core::types::{PackageName, RepoId};
use crate::forks::{self, ForkSummary};
use crate::play::PlayRecord;

/// Errors from graph emission.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("writing graph stream to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serializing graph write: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Node labels in the emitted graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// Keyed by canonical repository id.
    Repository,
    /// Keyed by store document id (the package name).
    PlayPage,
}

/// Relationship types in the emitted graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelKind {
    /// Repository to repository: the start node is a fork of the end node.
    Forks,
    /// Play page to repository: the app is implemented by the repository.
    ImplementedBy,
}

/// A node identity: label plus key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub key: String,
}

impl NodeRef {
    pub fn repository(id: RepoId) -> Self {
        Self {
            kind: NodeKind::Repository,
            key: id.to_string(),
        }
    }

    pub fn play_page(package: &PackageName) -> Self {
        Self {
            kind: NodeKind::PlayPage,
            key: package.to_string(),
        }
    }
}

/// One node upsert, keyed by identity. Property values replace whatever the
/// store holds for that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUpsert {
    pub kind: NodeKind,
    pub key: String,
    pub props: BTreeMap<String, serde_json::Value>,
}

/// One relationship upsert. Relationships carry no properties and are
/// unique per (kind, start, end).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelUpsert {
    pub kind: RelKind,
    pub start: NodeRef,
    pub end: NodeRef,
}

/// One line of the graph-write stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GraphWrite {
    Node(NodeUpsert),
    Rel(RelUpsert),
}

/// Accounting for one emit run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub nodes_created: usize,
    pub nodes_updated: usize,
    pub nodes_unchanged: usize,
    pub rels_created: usize,
    pub rels_unchanged: usize,
}

impl EmitSummary {
    /// Whether the run changed the store at all.
    pub fn is_noop(&self) -> bool {
        self.nodes_created == 0 && self.nodes_updated == 0 && self.rels_created == 0
    }
}

impl std::fmt::Display for EmitSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "nodes: {} created, {} updated, {} unchanged",
            self.nodes_created, self.nodes_updated, self.nodes_unchanged
        )?;
        write!(
            f,
            "relationships: {} created, {} unchanged",
            self.rels_created, self.rels_unchanged
        )
    }
}

fn json_string(value: &str) -> serde_json::Value {
    serde_json::Value::String(value.to_string())
}

fn repository_props(record: &RepositoryRecord) -> BTreeMap<String, serde_json::Value> {
    let mut props = BTreeMap::new();
    props.insert("id".to_string(), serde_json::json!(record.id.value()));
    if let Some(owner) = &record.owner {
        props.insert("owner".to_string(), json_string(owner));
    }
    if let Some(name) = &record.name {
        props.insert("name".to_string(), json_string(name));
    }
    if let Some(full_name) = &record.full_name {
        props.insert("fullName".to_string(), json_string(full_name.as_str()));
    }
    if let Some(snapshot) = &record.snapshot {
        props.insert("snapshot".to_string(), json_string(snapshot));
    }
    if let Some(ts) = record.snapshot_timestamp {
        props.insert("snapshotTimestamp".to_string(), serde_json::json!(ts));
    }
    if let Some(count) = record.commit_count {
        props.insert("commitCount".to_string(), serde_json::json!(count));
    }
    if let Some(gradle) = record.has_gradle_files {
        props.insert("hasGradleFiles".to_string(), serde_json::json!(gradle));
    }
    if !record.packages.is_empty() {
        let packages: Vec<_> = record.packages.iter().map(|p| p.to_string()).collect();
        props.insert("packages".to_string(), serde_json::json!(packages));
    }
    props
}

fn play_page_props(record: &PlayRecord) -> Result<BTreeMap<String, serde_json::Value>, EmitError> {
    // The record serializes to its store-native camelCase field names;
    // null properties are dropped rather than stored.
    let value = serde_json::to_value(record)?;
    let serde_json::Value::Object(map) = value else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .collect())
}

/// Plan the full write set for one run.
///
/// Deterministic: nodes in key order per kind, then relationships in
/// (kind, start, end) order, deduplicated on that triple. Only active
/// records become nodes; fork edges and unique matches are validated
/// against that node set.
pub fn plan_writes(
    records: &BTreeMap<RepoId, RepositoryRecord>,
    play: &BTreeMap<PackageName, PlayRecord>,
    matches: &[PackageMatch],
) -> Result<(Vec<GraphWrite>, ForkSummary), EmitError> {
    let mut writes = Vec::new();

    for record in records.values().filter(|r| r.is_active()) {
        writes.push(GraphWrite::Node(NodeUpsert {
            kind: NodeKind::Repository,
            key: record.id.to_string(),
            props: repository_props(record),
        }));
    }

    for (package, record) in play {
        writes.push(GraphWrite::Node(NodeUpsert {
            kind: NodeKind::PlayPage,
            key: package.to_string(),
            props: play_page_props(record)?,
        }));
    }

    let (edges, fork_summary) = forks::build_fork_edges(records);

    let mut rels: BTreeSet<RelUpsert> = BTreeSet::new();
    for edge in edges {
        rels.insert(RelUpsert {
            kind: RelKind::Forks,
            start: NodeRef::repository(edge.child),
            end: NodeRef::repository(edge.parent),
        });
    }

    for m in matches {
        if m.status != MatchStatus::Unique {
            continue;
        }
        let Some(id) = m.resolved else {
            continue;
        };
        if !records.get(&id).is_some_and(RepositoryRecord::is_active) {
            debug!(package = %m.package, %id, "match target not in node set, skipped");
            continue;
        }
        if !play.contains_key(&m.package) {
            debug!(package = %m.package, "match without app-store record, skipped");
            continue;
        }
        rels.insert(RelUpsert {
            kind: RelKind::ImplementedBy,
            start: NodeRef::play_page(&m.package),
            end: NodeRef::repository(id),
        });
    }

    writes.extend(rels.into_iter().map(GraphWrite::Rel));
    Ok((writes, fork_summary))
}

/// Apply a planned write set to a store, tallying outcomes.
pub fn apply_writes<S: GraphStore>(
    store: &mut S,
    writes: &[GraphWrite],
) -> Result<EmitSummary, EmitError> {
    let mut summary = EmitSummary::default();
    for write in writes {
        match write {
            GraphWrite::Node(node) => match store.upsert_node(node)? {
                WriteOutcome::Created => summary.nodes_created += 1,
                WriteOutcome::Updated => summary.nodes_updated += 1,
                WriteOutcome::Unchanged => summary.nodes_unchanged += 1,
            },
            GraphWrite::Rel(rel) => match store.upsert_rel(rel)? {
                WriteOutcome::Created => summary.rels_created += 1,
                WriteOutcome::Updated | WriteOutcome::Unchanged => summary.rels_unchanged += 1,
            },
        }
    }
    Ok(summary)
}

/// Write the plan as one JSON document per line.
pub fn write_stream(path: &Path, writes: &[GraphWrite]) -> Result<(), EmitError> {
    let io_err = |source| EmitError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    for write in writes {
        serde_json::to_writer(&mut out, write)?;
        out.write_all(b"\n").map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    Ok(())
}
