//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output, errors only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Playgraph - consolidate layered repository datasets into a property graph
#[derive(Parser, Debug)]
#[command(name = "playgraph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; only errors are reported
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge the five layered input files into the canonical repository table
    #[command(
        long_about = "Merge the five layered input files into the canonical repository table.\n\n\
            Layers are applied in fixed precedence order: scrape, re-import, mirror \
            corrections, package associations, renames. A later layer's non-empty value \
            replaces an earlier layer's value for the same id, except that name and \
            full_name always come from the scrape layer. Rename chains are resolved \
            after the merge; cycles are excluded and reported.\n\n\
            All five files must exist or the run aborts before merging."
    )]
    Consolidate {
        /// L0: original scrape of the code-hosting platform
        #[arg(long)]
        scrape: PathBuf,

        /// L1: re-imported list with damaged text columns
        #[arg(long)]
        reimport: PathBuf,

        /// L2: corrections recorded while repairing empty mirrors
        #[arg(long)]
        mirror: PathBuf,

        /// L3: package-to-repository association table
        #[arg(long)]
        associations: PathBuf,

        /// L4: explicit rename list
        #[arg(long)]
        renames: PathBuf,

        /// Output path for the canonical repository table
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Resolve package names to repositories
    #[command(
        long_about = "Resolve package names to repositories.\n\n\
            Candidate repositories come from the association table and are kept only \
            for packages actually present in the app-store details directory. A package \
            with exactly one candidate matches uniquely; one with several stays \
            ambiguous and is written out with its full candidate set, never resolved \
            automatically."
    )]
    Match {
        /// Directory of per-package app-store detail JSON files
        #[arg(long)]
        details: PathBuf,

        /// Package-to-repository association table
        #[arg(long)]
        associations: PathBuf,

        /// Canonical repository table; unique matches resolve to its ids
        #[arg(long)]
        canonical: Option<PathBuf>,

        /// Output path for the match table
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Emit the property graph as a stream of node and relationship upserts
    #[command(
        long_about = "Emit the property graph as a stream of node and relationship upserts.\n\n\
            Reads the canonical repository table, the app-store details directory and \
            the match table, derives fork edges, and writes one JSON document per line: \
            Repository and PlayPage node upserts followed by FORKS and IMPLEMENTED_BY \
            relationship upserts. Re-emitting an unchanged dataset produces a stream \
            that leaves a store already holding it untouched."
    )]
    Emit {
        /// Canonical repository table produced by consolidate
        #[arg(long)]
        canonical: PathBuf,

        /// Directory of per-package app-store detail JSON files
        #[arg(long)]
        details: PathBuf,

        /// Match table produced by match
        #[arg(long)]
        matches: PathBuf,

        /// Output path for the graph-write stream (JSON lines)
        #[arg(short, long)]
        out: PathBuf,
    },
}
