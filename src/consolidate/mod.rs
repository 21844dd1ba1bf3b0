//! consolidate
//!
//! Folds the five ordered input layers into the canonical repository record
//! set via the identity index.
//!
//! # Determinism
//!
//! Consolidation is a pure, reproducible fold: given a fixed set of layers,
//! the canonical set is identical regardless of in-layer row ordering. Rows
//! are sorted before application and the index iterates in id order, so the
//! canonical table and its fingerprint are stable across runs.
//!
//! # Failure semantics
//!
//! A missing layer file aborts the run before any merging begins - the
//! precedence contract requires a complete layer set. Field-level defects
//! are logged and counted, never fatal. Rename cycles exclude only the
//! affected chain.

pub mod index;
pub mod layers;
pub mod renames;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::core::record::{Layer, RepositoryRecord};
use crate::core::types::{Fingerprint, FullName, PackageName, RepoId};
use crate::normalize::normalize_row;
use crate::tabular::{self, RawRow, TabularError};

pub use index::IdentityIndex;
pub use renames::{RenameCycle, RenameOutcome};

/// Column order of the canonical repository table.
pub const CANONICAL_HEADER: &[&str] = &[
    "id",
    "owner",
    "name",
    "full_name",
    "snapshot",
    "snapshot_timestamp",
    "commit_count",
    "has_gradle_files",
    "renamed_to",
    "not_found",
    "parent_id",
    "source_id",
    "packages",
];

/// Errors from consolidation.
#[derive(Debug, Error)]
pub enum ConsolidateError {
    /// Fatal: precedence semantics require a complete layer set.
    #[error("missing layer file: {path} ({layer})")]
    MissingLayerFile { layer: Layer, path: String },

    #[error(transparent)]
    Tabular(#[from] TabularError),

    #[error("canonical table {path} row {row}: {reason}")]
    MalformedCanonical {
        path: String,
        row: usize,
        reason: String,
    },
}

/// Paths of the five ordered layer files.
#[derive(Debug, Clone)]
pub struct LayerFiles {
    pub scrape: PathBuf,
    pub reimport: PathBuf,
    pub mirror: PathBuf,
    pub associations: PathBuf,
    pub renames: PathBuf,
}

impl LayerFiles {
    fn ordered(&self) -> [(Layer, &Path); 5] {
        [
            (Layer::Scrape, self.scrape.as_path()),
            (Layer::Reimport, self.reimport.as_path()),
            (Layer::Mirror, self.mirror.as_path()),
            (Layer::Association, self.associations.as_path()),
            (Layer::Rename, self.renames.as_path()),
        ]
    }
}

/// Already-parsed rows for the five layers, for callers that do their own
/// file handling.
#[derive(Debug, Default, Clone)]
pub struct LayerRows {
    pub scrape: Vec<RawRow>,
    pub reimport: Vec<RawRow>,
    pub mirror: Vec<RawRow>,
    pub associations: Vec<RawRow>,
    pub renames: Vec<RawRow>,
}

impl LayerRows {
    fn ordered(self) -> [(Layer, Vec<RawRow>); 5] {
        [
            (Layer::Scrape, self.scrape),
            (Layer::Reimport, self.reimport),
            (Layer::Mirror, self.mirror),
            (Layer::Association, self.associations),
            (Layer::Rename, self.renames),
        ]
    }
}

/// End-of-run accounting for one consolidation.
#[derive(Debug, Clone)]
pub struct ConsolidateSummary {
    pub records: usize,
    pub merged_renames: usize,
    pub rename_cycles: usize,
    pub excluded_ids: usize,
    pub malformed_fields: usize,
    pub skipped_rows: usize,
    pub fingerprint: Fingerprint,
}

impl std::fmt::Display for ConsolidateSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "canonical records:  {}", self.records)?;
        writeln!(f, "renames merged:     {}", self.merged_renames)?;
        writeln!(f, "rename cycles:      {}", self.rename_cycles)?;
        writeln!(f, "ids excluded:       {}", self.excluded_ids)?;
        writeln!(f, "malformed fields:   {}", self.malformed_fields)?;
        writeln!(f, "rows skipped:       {}", self.skipped_rows)?;
        write!(f, "fingerprint:        {}", self.fingerprint)
    }
}

/// Consolidate already-parsed layer rows into the canonical record set.
pub fn consolidate_rows(
    rows: LayerRows,
) -> (BTreeMap<RepoId, RepositoryRecord>, ConsolidateSummary) {
    let mut index = IdentityIndex::new();
    let mut malformed_fields = 0usize;
    let mut skipped_rows = 0usize;

    for (layer, mut layer_rows) in rows.ordered() {
        // In-layer row order must not affect the result; raw rows sort
        // lexicographically by column name and value.
        layer_rows.sort_unstable();
        let schema = layers::schema(layer);
        for raw in &layer_rows {
            let (row, defects) = normalize_row(raw, schema);
            malformed_fields += defects.len();
            if !layers::apply(&mut index, layer, &row) {
                skipped_rows += 1;
            }
        }
        info!(%layer, rows = layer_rows.len(), "layer applied");
    }

    let outcome = renames::resolve(&mut index);
    let records = index.into_records();

    let fingerprint = Fingerprint::compute(&format_canonical(records.values()));
    let summary = ConsolidateSummary {
        records: records.len(),
        merged_renames: outcome.merged,
        rename_cycles: outcome.cycles.len(),
        excluded_ids: outcome.excluded_ids().len(),
        malformed_fields,
        skipped_rows,
        fingerprint,
    };
    (records, summary)
}

/// Consolidate the five layer files.
///
/// # Errors
///
/// Fails with [`ConsolidateError::MissingLayerFile`] before any merging if
/// a layer file does not exist.
pub fn consolidate(
    files: &LayerFiles,
) -> Result<(BTreeMap<RepoId, RepositoryRecord>, ConsolidateSummary), ConsolidateError> {
    for (layer, path) in files.ordered() {
        if !path.is_file() {
            return Err(ConsolidateError::MissingLayerFile {
                layer,
                path: path.display().to_string(),
            });
        }
    }

    let rows = LayerRows {
        scrape: tabular::read_rows(&files.scrape)?,
        reimport: tabular::read_rows(&files.reimport)?,
        mirror: tabular::read_rows(&files.mirror)?,
        associations: tabular::read_rows(&files.associations)?,
        renames: tabular::read_rows(&files.renames)?,
    };
    Ok(consolidate_rows(rows))
}

fn record_to_row(record: &RepositoryRecord) -> Vec<String> {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let num = |v: &Option<i64>| v.map(|n| n.to_string()).unwrap_or_default();
    let reference = |v: &Option<RepoId>| v.map(|id| id.to_string()).unwrap_or_else(|| "-1".into());
    vec![
        record.id.to_string(),
        opt(&record.owner),
        opt(&record.name),
        record
            .full_name
            .as_ref()
            .map(|n| n.as_str().to_string())
            .unwrap_or_default(),
        opt(&record.snapshot),
        num(&record.snapshot_timestamp),
        num(&record.commit_count),
        record
            .has_gradle_files
            .map(|b| b.to_string())
            .unwrap_or_default(),
        record
            .renamed_to
            .as_ref()
            .map(|n| n.as_str().to_string())
            .unwrap_or_default(),
        record.not_found.to_string(),
        reference(&record.parent_id),
        reference(&record.source_id),
        record
            .packages
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(";"),
    ]
}

/// Serialize the canonical set to CSV bytes. Also the fingerprint input.
pub fn format_canonical<'a, I>(records: I) -> Vec<u8>
where
    I: Iterator<Item = &'a RepositoryRecord>,
{
    tabular::format_rows(CANONICAL_HEADER, records.map(record_to_row))
}

/// Write the canonical repository table.
pub fn write_canonical(
    path: &Path,
    records: &BTreeMap<RepoId, RepositoryRecord>,
) -> Result<(), ConsolidateError> {
    tabular::write_rows(path, CANONICAL_HEADER, records.values().map(record_to_row))?;
    Ok(())
}

/// Read a canonical repository table back into records.
///
/// Used by the match and emit operations; the canonical table is trusted
/// input here, so a malformed row is an error rather than a logged defect.
pub fn read_canonical(
    path: &Path,
) -> Result<BTreeMap<RepoId, RepositoryRecord>, ConsolidateError> {
    let rows = tabular::read_rows(path)?;
    let mut records = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        let record = canonical_record(row).map_err(|reason| {
            ConsolidateError::MalformedCanonical {
                path: path.display().to_string(),
                row: i + 2,
                reason,
            }
        })?;
        records.insert(record.id, record);
    }
    Ok(records)
}

fn canonical_record(row: &RawRow) -> Result<RepositoryRecord, String> {
    let id = row
        .get("id")
        .ok_or("missing id")?
        .parse::<i64>()
        .map_err(|e| format!("bad id: {e}"))?;
    let id = RepoId::new(id).map_err(|e| e.to_string())?;
    let mut record = RepositoryRecord::new(id);

    record.owner = row.get("owner").cloned();
    record.name = row.get("name").cloned();
    record.full_name = row
        .get("full_name")
        .map(|n| FullName::new(n.clone()))
        .transpose()
        .map_err(|e| e.to_string())?;
    record.snapshot = row.get("snapshot").cloned();
    record.snapshot_timestamp = parse_opt_i64(row, "snapshot_timestamp")?;
    record.commit_count = parse_opt_i64(row, "commit_count")?;
    record.has_gradle_files = row
        .get("has_gradle_files")
        .map(|v| v.parse::<bool>().map_err(|e| format!("bad has_gradle_files: {e}")))
        .transpose()?;
    record.renamed_to = row
        .get("renamed_to")
        .map(|n| FullName::new(n.clone()))
        .transpose()
        .map_err(|e| e.to_string())?;
    record.not_found = row
        .get("not_found")
        .map(|v| v.parse::<bool>().map_err(|e| format!("bad not_found: {e}")))
        .transpose()?
        .unwrap_or(false);
    record.parent_id = parse_opt_i64(row, "parent_id")?.and_then(RepoId::parse_reference);
    record.source_id = parse_opt_i64(row, "source_id")?.and_then(RepoId::parse_reference);
    for package in row
        .get("packages")
        .map(String::as_str)
        .unwrap_or("")
        .split(';')
        .filter(|s| !s.is_empty())
    {
        record
            .packages
            .insert(PackageName::new(package).map_err(|e| e.to_string())?);
    }
    Ok(record)
}

fn parse_opt_i64(row: &RawRow, field: &str) -> Result<Option<i64>, String> {
    row.get(field)
        .map(|v| v.parse::<i64>().map_err(|e| format!("bad {field}: {e}")))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base_rows() -> LayerRows {
        LayerRows {
            scrape: vec![
                raw(&[
                    ("id", "10"),
                    ("owner", "alice"),
                    ("name", "lib"),
                    ("full_name", "alice/lib"),
                    ("commit_count", "12"),
                ]),
                raw(&[
                    ("id", "11"),
                    ("owner", "bob"),
                    ("name", "app"),
                    ("full_name", "bob/app"),
                    ("parent_id", "10"),
                    ("source_id", "10"),
                ]),
            ],
            reimport: vec![raw(&[
                ("id", "10"),
                ("owner", "alice"),
                ("name", "damaged"),
                ("has_gradle_files", "true"),
            ])],
            mirror: vec![],
            associations: vec![raw(&[
                ("package", "com.example.app"),
                ("all_repos", "bob/app"),
            ])],
            renames: vec![],
        }
    }

    #[test]
    fn fold_produces_expected_canonical_set() {
        let (records, summary) = consolidate_rows(base_rows());
        assert_eq!(summary.records, 2);
        assert_eq!(summary.malformed_fields, 0);

        let r10 = &records[&RepoId::new(10).unwrap()];
        // name always from L0 despite the later L1 value
        assert_eq!(r10.name.as_deref(), Some("lib"));
        assert_eq!(r10.has_gradle_files, Some(true));
        assert_eq!(r10.commit_count, Some(12));

        let r11 = &records[&RepoId::new(11).unwrap()];
        assert_eq!(r11.parent_id, Some(RepoId::new(10).unwrap()));
        assert_eq!(r11.packages.len(), 1);
    }

    #[test]
    fn fold_is_order_independent() {
        let rows = base_rows();
        let mut shuffled = rows.clone();
        shuffled.scrape.reverse();
        shuffled.reimport.reverse();

        let (a, summary_a) = consolidate_rows(rows);
        let (b, summary_b) = consolidate_rows(shuffled);
        assert_eq!(a, b);
        assert_eq!(summary_a.fingerprint, summary_b.fingerprint);
    }

    #[test]
    fn missing_layer_file_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let present = dir.path().join("present.csv");
        std::fs::write(&present, "id\n").unwrap();
        let files = LayerFiles {
            scrape: present.clone(),
            reimport: present.clone(),
            mirror: dir.path().join("absent.csv"),
            associations: present.clone(),
            renames: present,
        };
        assert!(matches!(
            consolidate(&files),
            Err(ConsolidateError::MissingLayerFile {
                layer: Layer::Mirror,
                ..
            })
        ));
    }

    #[test]
    fn canonical_round_trips_through_csv() {
        let (records, _) = consolidate_rows(base_rows());
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("canonical.csv");
        write_canonical(&path, &records).unwrap();
        let reread = read_canonical(&path).unwrap();

        assert_eq!(reread.len(), records.len());
        for (id, record) in &records {
            let other = &reread[id];
            assert_eq!(other.owner, record.owner);
            assert_eq!(other.full_name, record.full_name);
            assert_eq!(other.parent_id, record.parent_id);
            assert_eq!(other.packages, record.packages);
            assert_eq!(other.not_found, record.not_found);
        }
    }

    #[test]
    fn malformed_fields_are_counted_not_fatal() {
        let mut rows = base_rows();
        rows.scrape.push(raw(&[("id", "12"), ("commit_count", "NaN")]));
        let (records, summary) = consolidate_rows(rows);
        assert_eq!(summary.malformed_fields, 1);
        // The row itself is retained.
        assert!(records.contains_key(&RepoId::new(12).unwrap()));
    }
}
