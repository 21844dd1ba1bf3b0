//! match command - resolve package names to repositories

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::info;

use crate::consolidate::read_canonical;
use crate::core::types::PackageName;
use crate::matching;
use crate::play;
use crate::tabular;

/// Run the match command.
pub fn match_packages(
    details: &Path,
    associations: &Path,
    canonical: Option<&Path>,
    out: &Path,
    quiet: bool,
) -> Result<()> {
    let (mut play_records, mut play_summary) = play::load_details(details)
        .with_context(|| format!("loading app-store details from {}", details.display()))?;
    play::augment_categories(details, &mut play_records, &mut play_summary)?;
    info!(%play_summary, "app-store details loaded");

    let verified: BTreeSet<PackageName> = play_records.into_keys().collect();

    let rows = tabular::read_rows(associations)
        .with_context(|| format!("reading association table {}", associations.display()))?;
    let (candidates, malformed_rows) = matching::build_candidate_table(&rows);

    let canonical_records = canonical
        .map(read_canonical)
        .transpose()
        .context("reading canonical repository table")?;

    let (matches, mut summary) =
        matching::match_packages(&candidates, &verified, canonical_records.as_ref());
    summary.malformed_rows += malformed_rows;

    matching::write_matches(out, &matches)
        .with_context(|| format!("writing match table to {}", out.display()))?;
    info!(path = %out.display(), matches = matches.len(), "match table written");

    if !quiet {
        println!("{summary}");
    }
    Ok(())
}
