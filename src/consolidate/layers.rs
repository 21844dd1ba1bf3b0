//! consolidate::layers
//!
//! Field schemas and application functions for the five input layers.
//!
//! # Precedence
//!
//! Layers are folded in rank order. A later layer's value replaces an
//! earlier layer's value for the same id unless the later value is empty,
//! in which case the earlier value is retained ("non-destructive
//! override"). One named inversion: `name`/`full_name` are always taken
//! from L0 even though L1 is later, because L1's text columns mis-decode
//! non-ASCII names.

use tracing::warn;

use crate::core::record::{Layer, Provenance};
use crate::core::types::{FullName, PackageName, RepoId};
use crate::normalize::{FieldSpec, NormalizedRow};

use super::index::IdentityIndex;

/// L0: the original scrape.
pub const SCRAPE_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("id"),
    FieldSpec::text("owner"),
    FieldSpec::text("name"),
    FieldSpec::text("full_name"),
    FieldSpec::text("snapshot"),
    FieldSpec::timestamp("snapshot_timestamp"),
    FieldSpec::integer("commit_count"),
    FieldSpec::integer("parent_id"),
    FieldSpec::integer("source_id"),
];

/// L1: the re-imported list. Richer columns; text columns carry the
/// documented re-encoding damage and are repaired on read.
pub const REIMPORT_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("id"),
    FieldSpec::damaged_text("owner"),
    FieldSpec::damaged_text("name"),
    FieldSpec::damaged_text("full_name"),
    FieldSpec::damaged_text("snapshot"),
    FieldSpec::timestamp("snapshot_timestamp"),
    FieldSpec::integer("commit_count"),
    FieldSpec::boolean("has_gradle_files"),
    FieldSpec::integer("parent_id"),
    FieldSpec::integer("source_id"),
];

/// L2: mirror-repair corrections. Partial coverage of the id space is
/// expected; flags flip only where a value is explicitly supplied.
pub const MIRROR_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("id"),
    FieldSpec::boolean("not_found"),
    FieldSpec::boolean("has_gradle_files"),
    FieldSpec::text("snapshot"),
    FieldSpec::timestamp("snapshot_timestamp"),
];

/// L3: package-to-repository associations from manifest co-occurrence.
pub const ASSOCIATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("package"),
    FieldSpec::text("all_repos"),
];

/// L4: the explicit rename list.
pub const RENAME_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("id"),
    FieldSpec::text("renamed_to"),
];

/// Schema for a layer.
pub fn schema(layer: Layer) -> &'static [FieldSpec] {
    match layer {
        Layer::Scrape => SCRAPE_FIELDS,
        Layer::Reimport => REIMPORT_FIELDS,
        Layer::Mirror => MIRROR_FIELDS,
        Layer::Association => ASSOCIATION_FIELDS,
        Layer::Rename => RENAME_FIELDS,
    }
}

/// Apply one normalized row of `layer` to the index.
///
/// Returns false when the row carried no usable identity and was skipped.
pub fn apply(index: &mut IdentityIndex, layer: Layer, row: &NormalizedRow) -> bool {
    match layer {
        Layer::Scrape | Layer::Reimport => apply_repository(index, layer, row),
        Layer::Mirror => apply_mirror(index, row),
        Layer::Association => apply_association(index, row),
        Layer::Rename => apply_rename(index, row),
    }
}

fn row_id(row: &NormalizedRow) -> Option<RepoId> {
    row.integer("id").and_then(|id| RepoId::new(id).ok())
}

/// Non-destructive override for one field: an absent incoming value
/// retains whatever an earlier layer set.
fn override_text(
    slot: &mut Option<String>,
    incoming: Option<&str>,
    field: &str,
    layer: Layer,
    provenance: &mut Provenance,
) {
    if let Some(value) = incoming {
        *slot = Some(value.to_string());
        provenance.record(field, layer);
    }
}

fn override_integer(
    slot: &mut Option<i64>,
    incoming: Option<i64>,
    field: &str,
    layer: Layer,
    provenance: &mut Provenance,
) {
    if let Some(value) = incoming {
        *slot = Some(value);
        provenance.record(field, layer);
    }
}

fn override_reference(
    slot: &mut Option<RepoId>,
    incoming: Option<i64>,
    field: &str,
    layer: Layer,
    provenance: &mut Provenance,
) {
    if let Some(raw) = incoming {
        // The -1 sentinel is an explicit "no reference", not an empty cell.
        *slot = RepoId::parse_reference(raw);
        provenance.record(field, layer);
    }
}

/// L0/L1: full repository rows.
fn apply_repository(index: &mut IdentityIndex, layer: Layer, row: &NormalizedRow) -> bool {
    let Some(id) = row_id(row) else {
        warn!(%layer, "repository row without id skipped");
        return false;
    };
    let record = index.entry(id, layer);

    override_text(&mut record.owner, row.text("owner"), "owner", layer, &mut record.provenance);

    // Named precedence inversion: name/full_name always come from L0. A
    // later layer fills them only when L0 never supplied a value.
    let name_locked = layer > Layer::Scrape
        && record.provenance.layer_of("name") == Some(Layer::Scrape);
    if !name_locked {
        override_text(&mut record.name, row.text("name"), "name", layer, &mut record.provenance);
    }
    let full_name_locked = layer > Layer::Scrape
        && record.provenance.layer_of("full_name") == Some(Layer::Scrape);
    if !full_name_locked {
        if let Some(raw) = row.text("full_name") {
            match FullName::new(raw) {
                Ok(full_name) => {
                    record.full_name = Some(full_name);
                    record.provenance.record("full_name", layer);
                }
                Err(err) => warn!(%id, %err, "invalid full_name skipped"),
            }
        }
    }

    override_text(&mut record.snapshot, row.text("snapshot"), "snapshot", layer, &mut record.provenance);
    override_integer(
        &mut record.snapshot_timestamp,
        row.integer("snapshot_timestamp"),
        "snapshot_timestamp",
        layer,
        &mut record.provenance,
    );
    override_integer(
        &mut record.commit_count,
        row.integer("commit_count"),
        "commit_count",
        layer,
        &mut record.provenance,
    );
    override_reference(
        &mut record.parent_id,
        row.integer("parent_id"),
        "parent_id",
        layer,
        &mut record.provenance,
    );
    override_reference(
        &mut record.source_id,
        row.integer("source_id"),
        "source_id",
        layer,
        &mut record.provenance,
    );
    if let Some(flag) = row.boolean("has_gradle_files") {
        record.has_gradle_files = Some(flag);
        record.provenance.record("has_gradle_files", layer);
    }
    true
}

/// L2: flags flip only when the correction list explicitly supplies a
/// value for the id.
fn apply_mirror(index: &mut IdentityIndex, row: &NormalizedRow) -> bool {
    let Some(id) = row_id(row) else {
        warn!("mirror correction row without id skipped");
        return false;
    };
    let record = index.entry(id, Layer::Mirror);
    if let Some(flag) = row.boolean("not_found") {
        record.not_found = flag;
        record.provenance.record("not_found", Layer::Mirror);
    }
    if let Some(flag) = row.boolean("has_gradle_files") {
        record.has_gradle_files = Some(flag);
        record.provenance.record("has_gradle_files", Layer::Mirror);
    }
    override_text(
        &mut record.snapshot,
        row.text("snapshot"),
        "snapshot",
        Layer::Mirror,
        &mut record.provenance,
    );
    override_integer(
        &mut record.snapshot_timestamp,
        row.integer("snapshot_timestamp"),
        "snapshot_timestamp",
        Layer::Mirror,
        &mut record.provenance,
    );
    true
}

/// L3: union the package into every listed repository that consolidated.
///
/// Candidate repositories that never appeared in L0-L2 are not errors; the
/// scrape covers only a subset of the hosting platform.
fn apply_association(index: &mut IdentityIndex, row: &NormalizedRow) -> bool {
    let Some(package) = row.text("package") else {
        warn!("association row without package skipped");
        return false;
    };
    let package = match PackageName::new(package) {
        Ok(package) => package,
        Err(err) => {
            warn!(%err, "invalid package name skipped");
            return false;
        }
    };
    let repos = row.text("all_repos").unwrap_or("");
    for full_name in repos.split(',').filter(|s| !s.is_empty()) {
        if let Some(id) = index.find_by_full_name(full_name) {
            let record = index.entry(id, Layer::Association);
            record.packages.insert(package.clone());
            record.provenance.record("packages", Layer::Association);
        }
    }
    true
}

/// L4: record the rename target. Chains are resolved after the fold.
fn apply_rename(index: &mut IdentityIndex, row: &NormalizedRow) -> bool {
    let Some(id) = row_id(row) else {
        warn!("rename row without id skipped");
        return false;
    };
    let Some(target) = row.text("renamed_to") else {
        warn!(%id, "rename row without target skipped");
        return false;
    };
    match FullName::new(target) {
        Ok(target) => {
            let record = index.entry(id, Layer::Rename);
            record.renamed_to = Some(target);
            record.provenance.record("renamed_to", Layer::Rename);
            true
        }
        Err(err) => {
            warn!(%id, %err, "invalid rename target skipped");
            false
        }
    }
}
