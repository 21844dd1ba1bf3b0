//! core
//!
//! Domain types and canonical records.
//!
//! - [`types`] - Validated identifier types and the canonical-set fingerprint
//! - [`record`] - Canonical repository records, match results, fork edges

pub mod record;
pub mod types;

pub use record::{ForkEdge, Layer, MatchStatus, PackageMatch, Provenance, RepositoryRecord};
pub use types::{Fingerprint, FullName, PackageName, RepoId, TypeError};
