//! matching
//!
//! Resolves package-name to repository associations to at most one trusted
//! match per package.
//!
//! # Policy
//!
//! A 1:1 app-identity to source-identity mapping cannot be reliably
//! inferred from manifest co-occurrence alone. Correctness therefore favors
//! explicit, visible ambiguity over silently wrong matches: a package with
//! more than one candidate is retained with its full candidate set and
//! never auto-resolved.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::record::{MatchStatus, PackageMatch, RepositoryRecord};
use crate::core::types::{FullName, PackageName, RepoId};
use crate::tabular::{self, RawRow, TabularError};

/// Column order of the match table.
pub const MATCH_HEADER: &[&str] = &["package", "status", "resolved_id", "candidates"];

/// Errors from match-table handling.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Tabular(#[from] TabularError),
}

/// Accounting for one match run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSummary {
    /// Packages in the association table.
    pub considered: usize,
    /// Packages not verified present on the app store; dropped.
    pub not_on_store: usize,
    pub unique: usize,
    pub ambiguous: usize,
    pub unmatched: usize,
    /// Association rows that could not contribute a candidate set.
    pub malformed_rows: usize,
}

impl std::fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "packages considered: {}", self.considered)?;
        writeln!(f, "not on app store:    {}", self.not_on_store)?;
        writeln!(f, "unique matches:      {}", self.unique)?;
        writeln!(f, "ambiguous matches:   {}", self.ambiguous)?;
        writeln!(f, "without candidates:  {}", self.unmatched)?;
        write!(f, "malformed rows:      {}", self.malformed_rows)
    }
}

/// Candidate sets per package, built from manifest co-occurrence.
pub type CandidateTable = BTreeMap<PackageName, BTreeSet<FullName>>;

/// Parse an association table: a `package` column and an `all_repos`
/// column holding a comma-separated repository list.
pub fn build_candidate_table(rows: &[RawRow]) -> (CandidateTable, usize) {
    let mut table = CandidateTable::new();
    let mut malformed = 0usize;
    for row in rows {
        let Some(package) = row.get("package") else {
            warn!("association row without package column skipped");
            malformed += 1;
            continue;
        };
        let package = match PackageName::new(package.clone()) {
            Ok(package) => package,
            Err(err) => {
                warn!(%err, "invalid package name skipped");
                malformed += 1;
                continue;
            }
        };
        let candidates = table.entry(package).or_default();
        for candidate in row
            .get("all_repos")
            .map(String::as_str)
            .unwrap_or("")
            .split(',')
            .filter(|s| !s.is_empty())
        {
            match FullName::new(candidate) {
                Ok(name) => {
                    candidates.insert(name);
                }
                Err(err) => {
                    warn!(%err, "invalid candidate repository skipped");
                    malformed += 1;
                }
            }
        }
    }
    (table, malformed)
}

/// Resolve each package against its candidate set.
///
/// `verified` is the set of packages confirmed present on the app store;
/// candidate sets are intersected with it. `canonical` (when available)
/// resolves the unique candidate's full name to its canonical id -
/// `not_found` records never resolve.
pub fn match_packages(
    candidates: &CandidateTable,
    verified: &BTreeSet<PackageName>,
    canonical: Option<&BTreeMap<RepoId, RepositoryRecord>>,
) -> (Vec<PackageMatch>, MatchSummary) {
    let name_to_id: BTreeMap<&str, RepoId> = canonical
        .map(|records| {
            records
                .values()
                .filter(|r| r.is_active())
                .filter_map(|r| r.full_name.as_ref().map(|n| (n.as_str(), r.id)))
                .collect()
        })
        .unwrap_or_default();

    let mut matches = Vec::new();
    let mut summary = MatchSummary {
        considered: candidates.len(),
        ..MatchSummary::default()
    };

    for (package, repos) in candidates {
        if !verified.contains(package) {
            debug!(%package, "package not verified on app store");
            summary.not_on_store += 1;
            continue;
        }
        let status = match repos.len() {
            1 => MatchStatus::Unique,
            0 => MatchStatus::None,
            _ => MatchStatus::Ambiguous,
        };
        let resolved = if status == MatchStatus::Unique {
            repos
                .first()
                .and_then(|name| name_to_id.get(name.as_str()).copied())
        } else {
            None
        };
        match status {
            MatchStatus::Unique => summary.unique += 1,
            MatchStatus::Ambiguous => summary.ambiguous += 1,
            MatchStatus::None => summary.unmatched += 1,
        }
        matches.push(PackageMatch {
            package: package.clone(),
            candidates: repos.clone(),
            resolved,
            status,
        });
    }

    (matches, summary)
}

fn match_to_row(m: &PackageMatch) -> Vec<String> {
    vec![
        m.package.to_string(),
        m.status.to_string(),
        m.resolved.map(|id| id.to_string()).unwrap_or_default(),
        m.candidates
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(";"),
    ]
}

/// Write the match table with its status column.
pub fn write_matches(path: &Path, matches: &[PackageMatch]) -> Result<(), MatchError> {
    tabular::write_rows(path, MATCH_HEADER, matches.iter().map(match_to_row))?;
    Ok(())
}

/// Read a match table produced by [`write_matches`].
///
/// Rows that fail to parse are logged and skipped; the match table is
/// derived data and is recomputed each run anyway.
pub fn read_matches(path: &Path) -> Result<Vec<PackageMatch>, MatchError> {
    let rows = tabular::read_rows(path)?;
    let mut matches = Vec::new();
    for row in rows {
        match parse_match(&row) {
            Some(m) => matches.push(m),
            None => warn!(?row, "malformed match row skipped"),
        }
    }
    Ok(matches)
}

fn parse_match(row: &RawRow) -> Option<PackageMatch> {
    let package = PackageName::new(row.get("package")?.clone()).ok()?;
    let status = match row.get("status")?.as_str() {
        "unique" => MatchStatus::Unique,
        "ambiguous" => MatchStatus::Ambiguous,
        "none" => MatchStatus::None,
        _ => return None,
    };
    let resolved = match row.get("resolved_id") {
        Some(raw) => Some(RepoId::new(raw.parse().ok()?).ok()?),
        None => None,
    };
    let mut candidates = BTreeSet::new();
    for candidate in row
        .get("candidates")
        .map(String::as_str)
        .unwrap_or("")
        .split(';')
        .filter(|s| !s.is_empty())
    {
        candidates.insert(FullName::new(candidate).ok()?);
    }
    Some(PackageMatch {
        package,
        candidates,
        resolved,
        status,
    })
}
