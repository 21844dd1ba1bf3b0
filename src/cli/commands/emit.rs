//! emit command - write the graph upsert stream

use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::info;

use crate::consolidate::read_canonical;
use crate::emit::{self, GraphWrite};
use crate::matching::read_matches;
use crate::play;

/// Run the emit command.
pub fn emit(canonical: &Path, details: &Path, matches: &Path, out: &Path, quiet: bool) -> Result<()> {
    let records = read_canonical(canonical)
        .with_context(|| format!("reading canonical table {}", canonical.display()))?;

    let (mut play_records, mut play_summary) = play::load_details(details)
        .with_context(|| format!("loading app-store details from {}", details.display()))?;
    play::augment_categories(details, &mut play_records, &mut play_summary)?;
    info!(%play_summary, "app-store details loaded");

    let matches = read_matches(matches)
        .with_context(|| format!("reading match table {}", matches.display()))?;

    let (writes, fork_summary) = emit::plan_writes(&records, &play_records, &matches)?;
    emit::write_stream(out, &writes)
        .with_context(|| format!("writing graph stream to {}", out.display()))?;
    info!(path = %out.display(), writes = writes.len(), "graph stream written");

    if !quiet {
        let nodes = writes
            .iter()
            .filter(|w| matches!(w, GraphWrite::Node(_)))
            .count();
        let rels = writes.len() - nodes;
        println!("node upserts:         {nodes}");
        println!("relationship upserts: {rels}");
        println!("{fork_summary}");
    }
    Ok(())
}
