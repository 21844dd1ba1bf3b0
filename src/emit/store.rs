//! emit::store
//!
//! The upsert boundary: a minimal trait a graph-store adapter implements,
//! plus the in-memory store the test suite and idempotence checks run
//! against. Upserts are keyed by node identity and never delete.

use std::collections::{BTreeMap, BTreeSet};

use super::{EmitError, NodeKind, NodeRef, NodeUpsert, RelKind, RelUpsert};

/// What an upsert did against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    /// The store already held exactly this state; no write happened.
    Unchanged,
}

/// A destination for graph writes.
pub trait GraphStore {
    fn upsert_node(&mut self, node: &NodeUpsert) -> Result<WriteOutcome, EmitError>;
    fn upsert_rel(&mut self, rel: &RelUpsert) -> Result<WriteOutcome, EmitError>;
}

/// In-memory graph store.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: BTreeMap<(NodeKind, String), BTreeMap<String, serde_json::Value>>,
    rels: BTreeSet<(RelKind, NodeRef, NodeRef)>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn rel_count(&self) -> usize {
        self.rels.len()
    }

    pub fn node_props(
        &self,
        kind: NodeKind,
        key: &str,
    ) -> Option<&BTreeMap<String, serde_json::Value>> {
        self.nodes.get(&(kind, key.to_string()))
    }

    pub fn has_rel(&self, kind: RelKind, start: &NodeRef, end: &NodeRef) -> bool {
        self.rels.contains(&(kind, start.clone(), end.clone()))
    }
}

impl GraphStore for MemoryGraph {
    fn upsert_node(&mut self, node: &NodeUpsert) -> Result<WriteOutcome, EmitError> {
        let key = (node.kind, node.key.clone());
        match self.nodes.get(&key) {
            Some(existing) if *existing == node.props => Ok(WriteOutcome::Unchanged),
            Some(_) => {
                self.nodes.insert(key, node.props.clone());
                Ok(WriteOutcome::Updated)
            }
            None => {
                self.nodes.insert(key, node.props.clone());
                Ok(WriteOutcome::Created)
            }
        }
    }

    fn upsert_rel(&mut self, rel: &RelUpsert) -> Result<WriteOutcome, EmitError> {
        let key = (rel.kind, rel.start.clone(), rel.end.clone());
        if self.rels.insert(key) {
            Ok(WriteOutcome::Created)
        } else {
            Ok(WriteOutcome::Unchanged)
        }
    }
}
