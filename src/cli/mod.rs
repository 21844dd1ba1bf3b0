//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Initialize logging
//! - Delegate to command handlers
//!
//! The CLI layer is thin: handlers validate paths, call into the library
//! modules, and print the end-of-run summaries. No merge or match logic
//! lives here.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug, cli.quiet);
    commands::dispatch(cli.command, cli.quiet)
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `--debug` selects debug level,
/// `--quiet` errors only, and the default is info.
fn init_logging(debug: bool, quiet: bool) {
    let default_level = if debug {
        "playgraph=debug"
    } else if quiet {
        "playgraph=error"
    } else {
        "playgraph=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
