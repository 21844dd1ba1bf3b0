//! consolidate command - merge the five layered inputs into the canonical table

use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::info;

use crate::consolidate::{self, LayerFiles};

/// Run the consolidate command.
#[allow(clippy::too_many_arguments)]
pub fn consolidate(
    scrape: &Path,
    reimport: &Path,
    mirror: &Path,
    associations: &Path,
    renames: &Path,
    out: &Path,
    quiet: bool,
) -> Result<()> {
    let files = LayerFiles {
        scrape: scrape.to_path_buf(),
        reimport: reimport.to_path_buf(),
        mirror: mirror.to_path_buf(),
        associations: associations.to_path_buf(),
        renames: renames.to_path_buf(),
    };

    let (records, summary) = consolidate::consolidate(&files)?;
    consolidate::write_canonical(out, &records)
        .with_context(|| format!("writing canonical table to {}", out.display()))?;
    info!(path = %out.display(), records = records.len(), "canonical table written");

    if !quiet {
        println!("{summary}");
    }
    Ok(())
}
