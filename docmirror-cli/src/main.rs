//! docmirror: keep a Markdown mirror of a document tree in sync.
//!
//! # Usage
//!
//! ```text
//! docmirror init [DIR] [--name <name>] [--force]
//! docmirror sync [--project-dir DIR] [--dry-run] [--force] [--on-error skip|fail] [--keep-orphans]
//! docmirror status [--project-dir DIR] [--json]
//! docmirror index [--project-dir DIR]
//! ```

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{index::IndexArgs, init::InitArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "docmirror",
    version,
    about = "Incrementally convert a document tree into mirrored Markdown",
    long_about = None,
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the sources/output layout, config and an empty manifest.
    Init(InitArgs),

    /// Convert new and changed sources, clean up orphans, rebuild the index.
    Sync(SyncArgs),

    /// Show what the next sync would do and what the manifest holds.
    Status(StatusArgs),

    /// Regenerate INDEX.md without syncing.
    Index(IndexArgs),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn init_logging(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Index(args) => args.run(),
    }
}
