// osn-archive-fetch/src/pipeline.rs
// ============================================================================
// Module: Replay Pipeline
// Description: Download, unwrap, and persist replays for discovered matches.
// Purpose: Drive each match from LISTED to FETCHED with durable file writes.
// Dependencies: osn-archive-core, osn-archive-store-sqlite, tracing
// ============================================================================

//! ## Overview
//! The pipeline owns the main loop: it first retries matches already parked
//! at LISTED from earlier runs, then receives newly discovered ids from the
//! walker thread and processes each in order. A replay is downloaded,
//! unwrapped, written to the content directory as `<short_id>.json` via a
//! temporary sibling and rename (readers never observe a partial file), and
//! the match advances to FETCHED. Transient failures leave the status
//! untouched for the next run; envelope failures mark the row INVALID; an
//! error on the error channel stops the run after draining the identifier
//! channel.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use tracing::info;
use tracing::warn;

use osn_archive_core::ArchiveError;
use osn_archive_core::FetchStatus;
use osn_archive_core::GameId;
use osn_archive_core::unwrap_replay;
use osn_archive_store_sqlite::Store;

use crate::fetcher::Upstream;
use crate::walker::walk_listing;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Mode of the content directory.
pub const OUT_DIR_MODE: u32 = 0o755;
/// Mode of each written replay file.
pub const REPLAY_FILE_MODE: u32 = 0o644;

// ============================================================================
// SECTION: Report
// ============================================================================

/// Summary of one pipeline run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Replays newly fetched and written this run.
    pub fetched: usize,
    /// Matches that failed transiently and stay at their current status.
    pub failed: usize,
    /// Matches marked INVALID this run.
    pub invalidated: usize,
    /// Fatal error that ended the run early, if any.
    pub fatal: Option<ArchiveError>,
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Runs the full fetch pipeline: pending retries, walker, replay loop.
///
/// # Errors
///
/// Returns store-consistency failures (retrograde status, foreign keys) and
/// content-directory creation failures; everything else is classified into
/// the report.
pub fn run<U: Upstream + 'static>(
    store: &Arc<Store>,
    upstream: &Arc<U>,
    out_dir: &Path,
) -> Result<PipelineReport, ArchiveError> {
    ensure_out_dir(out_dir)?;
    let mut report = PipelineReport::default();

    // Matches left at LISTED by an earlier run are retried first, in
    // insertion order, before any new discovery.
    let pending = store.match_hashes_at(FetchStatus::Listed)?;
    if !pending.is_empty() {
        info!(count = pending.len(), "retrying matches still at LISTED");
    }

    let (id_tx, id_rx) = mpsc::channel::<GameId>();
    let (err_tx, err_rx) = mpsc::channel::<ArchiveError>();
    let walker = {
        let store = Arc::clone(store);
        let upstream = Arc::clone(upstream);
        thread::spawn(move || {
            let outcome = walk_listing(&store, upstream.as_ref(), &id_tx, &err_tx);
            info!(
                new_matches = outcome.new_matches,
                pages = outcome.pages,
                skipped = outcome.skipped_rows,
                "listing walk finished"
            );
        })
    };

    let mut drain_only = false;
    for game_id in pending.into_iter().chain(id_rx.iter()) {
        if !drain_only {
            if let Ok(err) = err_rx.try_recv() {
                report.fatal = Some(err);
                drain_only = true;
            }
        }
        if drain_only {
            // Fatal error upstream: no new downloads, drain the channel.
            continue;
        }
        match process_replay(store, upstream.as_ref(), out_dir, &game_id) {
            Ok(()) => report.fetched += 1,
            Err(err) if err.is_transient() => {
                warn!(gameid = %game_id, %err, "replay left for a later run");
                report.failed += 1;
            }
            Err(err) if err.is_row_local() => {
                warn!(gameid = %game_id, %err, "replay payload unusable, marking INVALID");
                store.update_match_status(&game_id, FetchStatus::Invalid)?;
                report.invalidated += 1;
            }
            Err(err) => return Err(err),
        }
    }

    if report.fatal.is_none() {
        if let Ok(err) = err_rx.try_recv() {
            report.fatal = Some(err);
        }
    }
    // The walker has closed its channels by now.
    let _ = walker.join();

    info!(
        fetched = report.fetched,
        failed = report.failed,
        invalidated = report.invalidated,
        "pipeline run complete"
    );
    Ok(report)
}

/// Downloads, unwraps, writes, and advances one match.
fn process_replay(
    store: &Store,
    upstream: &dyn Upstream,
    out_dir: &Path,
    game_id: &GameId,
) -> Result<(), ArchiveError> {
    let bytes = upstream.replay(game_id)?;
    let unwrapped = unwrap_replay(&bytes)?;
    if unwrapped.game_id != *game_id {
        warn!(
            requested = %game_id,
            payload = %unwrapped.game_id,
            "payload identifies a different match"
        );
    }
    let path = out_dir.join(format!("{}.json", game_id.short_id()));
    write_atomic(&path, &unwrapped.canonical)?;
    store.update_match_status(game_id, FetchStatus::Fetched)?;
    info!(gameid = %game_id, path = %path.display(), "replay fetched");
    Ok(())
}

// ============================================================================
// SECTION: Filesystem
// ============================================================================

/// Creates the content directory with the expected mode.
fn ensure_out_dir(out_dir: &Path) -> Result<(), ArchiveError> {
    fs::create_dir_all(out_dir).map_err(|err| ArchiveError::io(out_dir, &err))?;
    set_mode(out_dir, OUT_DIR_MODE)
}

/// Writes a file via a temporary sibling and rename.
///
/// The rename is atomic on the same filesystem, so readers only ever see
/// the previous file or the complete new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArchiveError> {
    let tmp = sibling_tmp_path(path);
    fs::write(&tmp, bytes).map_err(|err| ArchiveError::io(&tmp, &err))?;
    set_mode(&tmp, REPLAY_FILE_MODE)?;
    fs::rename(&tmp, path).map_err(|err| ArchiveError::io(path, &err))
}

/// Temporary sibling name in the same directory as the target.
fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "replay".to_string());
    name.push_str(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ArchiveError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|err| ArchiveError::io(path, &err))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), ArchiveError> {
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_leaves_no_temporary_behind() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("replay.json");
        write_atomic(&path, b"{\"gameid\":\"X\"}").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"{\"gameid\":\"X\"}");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn replay_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("replay.json");
        write_atomic(&path, b"{}").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, REPLAY_FILE_MODE);
    }

    #[test]
    fn overwrite_replaces_the_previous_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("replay.json");
        write_atomic(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }
}
