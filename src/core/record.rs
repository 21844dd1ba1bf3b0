//! core::record
//!
//! Canonical repository records and derived result types.
//!
//! # Lifecycle
//!
//! A [`RepositoryRecord`] is created on first occurrence in the
//! lowest-precedence layer that mentions its id, updated by later layers
//! under the non-destructive override rule, and frozen once handed to the
//! emitter. [`PackageMatch`] and [`ForkEdge`] are fully derived and
//! recomputed each run.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{FullName, PackageName, RepoId};

/// One ordered input source with a fixed precedence rank.
///
/// Layers are applied lowest rank first; a later layer's non-empty value
/// replaces an earlier layer's value for the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Layer {
    /// L0: the original scrape of the code-hosting platform.
    Scrape,
    /// L1: the re-imported list. Richer columns, but its text columns were
    /// damaged by a re-encoding step in the import.
    Reimport,
    /// L2: corrections recorded while repairing empty mirrors.
    Mirror,
    /// L3: the package-to-repository association list.
    Association,
    /// L4: the explicit rename list.
    Rename,
}

impl Layer {
    /// Precedence rank, lowest first.
    pub fn rank(self) -> u8 {
        match self {
            Layer::Scrape => 0,
            Layer::Reimport => 1,
            Layer::Mirror => 2,
            Layer::Association => 3,
            Layer::Rename => 4,
        }
    }

    /// All layers in application order.
    pub fn ordered() -> [Layer; 5] {
        [
            Layer::Scrape,
            Layer::Reimport,
            Layer::Mirror,
            Layer::Association,
            Layer::Rename,
        ]
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Scrape => "L0/scrape",
            Layer::Reimport => "L1/reimport",
            Layer::Mirror => "L2/mirror",
            Layer::Association => "L3/association",
            Layer::Rename => "L4/rename",
        };
        f.write_str(name)
    }
}

/// Per-field provenance: which layer last set each field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    fields: std::collections::BTreeMap<String, Layer>,
}

impl Provenance {
    /// Record that `field` was last set by `layer`.
    pub fn record(&mut self, field: &str, layer: Layer) {
        self.fields.insert(field.to_string(), layer);
    }

    /// The layer that last set `field`, if any layer set it.
    pub fn layer_of(&self, field: &str) -> Option<Layer> {
        self.fields.get(field).copied()
    }
}

/// The single authoritative merged representation of a repository.
///
/// Identity is the numeric id and is immutable once assigned. All other
/// fields carry provenance in [`Provenance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: RepoId,
    pub owner: Option<String>,
    pub name: Option<String>,
    pub full_name: Option<FullName>,
    /// URI of the mirrored snapshot of this repository.
    pub snapshot: Option<String>,
    /// Epoch seconds the snapshot was taken.
    pub snapshot_timestamp: Option<i64>,
    pub commit_count: Option<i64>,
    pub has_gradle_files: Option<bool>,
    /// Target full name this repository was renamed to, if any.
    pub renamed_to: Option<FullName>,
    /// Terminal flag: the upstream repository no longer exists. Excluded
    /// from matching and fork derivation.
    pub not_found: bool,
    pub parent_id: Option<RepoId>,
    pub source_id: Option<RepoId>,
    /// Package names whose manifests were found in this repository.
    pub packages: BTreeSet<PackageName>,
    pub provenance: Provenance,
}

impl RepositoryRecord {
    /// Create an empty record for `id`.
    pub fn new(id: RepoId) -> Self {
        Self {
            id,
            owner: None,
            name: None,
            full_name: None,
            snapshot: None,
            snapshot_timestamp: None,
            commit_count: None,
            has_gradle_files: None,
            renamed_to: None,
            not_found: false,
            parent_id: None,
            source_id: None,
            packages: BTreeSet::new(),
            provenance: Provenance::default(),
        }
    }

    /// Whether this record participates in matching and fork derivation.
    pub fn is_active(&self) -> bool {
        !self.not_found
    }
}

/// Resolution status of a package-to-repository match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Exactly one candidate repository.
    Unique,
    /// More than one candidate; retained with the full candidate set,
    /// never auto-resolved.
    Ambiguous,
    /// No candidate. Should not occur by construction.
    None,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchStatus::Unique => "unique",
            MatchStatus::Ambiguous => "ambiguous",
            MatchStatus::None => "none",
        };
        f.write_str(name)
    }
}

/// A package name with its candidate repositories and resolution outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMatch {
    pub package: PackageName,
    /// Every repository whose manifests mention this package.
    pub candidates: BTreeSet<FullName>,
    /// Canonical id of the resolved repository. Set only for unique matches
    /// whose candidate survived consolidation.
    pub resolved: Option<RepoId>,
    pub status: MatchStatus,
}

/// A derived fork relationship: `child` originated as a copy-with-history
/// of `parent`.
///
/// Never independently created or stored; always rebuilt from the canonical
/// record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForkEdge {
    pub child: RepoId,
    pub parent: RepoId,
}
