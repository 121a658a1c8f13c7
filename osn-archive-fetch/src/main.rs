// osn-archive-fetch/src/main.rs
// ============================================================================
// Module: Fetch CLI Entry Point
// Description: Command-line driver for the archive fetch pipeline.
// Purpose: Wire flags to bootstrap, backfill, and the fetch run.
// Dependencies: clap, osn-archive-core, osn-archive-store-sqlite, tracing-subscriber
// ============================================================================

//! ## Overview
//! The binary opens (and optionally bootstraps) the archive database, runs
//! any requested backfills, then walks the live listing and fetches new
//! replays. It exits zero on clean completion and nonzero on any fatal
//! error, printing the error kind and its context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use osn_archive_core::ArchiveError;
use osn_archive_fetch::backfill::backfill_from_index;
use osn_archive_fetch::backfill::backfill_from_replays;
use osn_archive_fetch::fetcher::Fetcher;
use osn_archive_fetch::pipeline;
use osn_archive_store_sqlite::Store;

// ============================================================================
// SECTION: CLI
// ============================================================================

/// Seconds between outbound requests (clamped to the floor of three).
const DEFAULT_WAIT_SECONDS: u64 = 5;

/// Archive the OSN replay history into a local database.
#[derive(Parser, Debug)]
#[command(name = "osn-archive-fetch", version)]
struct Cli {
    /// Path where the sqlite3 database will be written.
    #[arg(long = "db-path", value_name = "PATH", default_value = ".data/osn.db")]
    db_path: PathBuf,

    /// Create the table schemata before running, including enum values.
    #[arg(long = "create-tables")]
    create_tables: bool,

    /// Path to a TSV file containing a legacy backup of replay metadata.
    #[arg(long = "backfill-tsv", value_name = "PATH")]
    backfill_tsv: Option<PathBuf>,

    /// Path to a directory of previously downloaded JSON replays.
    #[arg(long = "backfill-replays", value_name = "PATH")]
    backfill_replays: Option<PathBuf>,

    /// Path where JSON formatted replay data is written to.
    #[arg(long = "out", value_name = "PATH", default_value = ".data/replays/")]
    out: PathBuf,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(fetched) => {
            println!("fetch of recent replays completed");
            println!("{fetched} new replays fetched");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "fatal");
            eprintln!("ERROR: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the configured stages; returns the count of newly fetched replays.
fn run(cli: &Cli) -> Result<usize, ArchiveError> {
    let store = Store::open(&cli.db_path)?;

    if cli.create_tables {
        info!("creating DB tables...");
        store.create_and_populate()?;
    }

    if let Some(tsv_path) = cli.backfill_tsv.as_deref().filter(|path| !path.as_os_str().is_empty()) {
        info!("back-filling from legacy DB...");
        backfill_from_index(&store, tsv_path)?;
    }
    if let Some(replays) = cli
        .backfill_replays
        .as_deref()
        .filter(|path| !path.as_os_str().is_empty())
    {
        info!("back-filling from legacy replays...");
        backfill_from_replays(&store, replays)?;
    }

    let fetcher = Fetcher::new(DEFAULT_WAIT_SECONDS)?;
    let report = pipeline::run(&Arc::new(store), &Arc::new(fetcher), &cli.out)?;
    if let Some(fatal) = report.fatal {
        return Err(fatal);
    }
    Ok(report.fetched)
}
