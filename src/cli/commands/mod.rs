//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! Each handler:
//! 1. Validates command-specific arguments
//! 2. Calls the owning library module
//! 3. Prints the end-of-run summary (suppressed under `--quiet`)

mod consolidate;
mod emit;
mod match_cmd;

pub use consolidate::consolidate;
pub use emit::emit;
pub use match_cmd::match_packages;

use anyhow::Result;

use super::args::Command;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, quiet: bool) -> Result<()> {
    match command {
        Command::Consolidate {
            scrape,
            reimport,
            mirror,
            associations,
            renames,
            out,
        } => consolidate(&scrape, &reimport, &mirror, &associations, &renames, &out, quiet),
        Command::Match {
            details,
            associations,
            canonical,
            out,
        } => match_packages(&details, &associations, canonical.as_deref(), &out, quiet),
        Command::Emit {
            canonical,
            details,
            matches,
            out,
        } => emit(&canonical, &details, &matches, &out, quiet),
    }
}
