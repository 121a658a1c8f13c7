// osn-archive-fetch/src/backfill.rs
// ============================================================================
// Module: Legacy Backfill
// Description: One-shot import of the legacy TSV dump and saved replays.
// Purpose: Feed the store from historical data instead of the live listing.
// Dependencies: osn-archive-core, osn-archive-store-sqlite, serde_json, tracing
// ============================================================================

//! ## Overview
//! The TSV backfill reads a tab-delimited dump with a leading header line
//! naming exactly the fifteen known columns in any order. Each data row is
//! normalized with the same codec as the live listing and inserted at
//! status LEGACY, since the dump predates the supported engine minimum.
//! A single bad row is logged and skipped; a row with the wrong column
//! count marks the dump's end of data and stops the run cleanly. The
//! replay-directory backfill re-reads previously downloaded replay files
//! and advances their matches to FETCHED.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fs;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use tracing::debug;
use tracing::info;
use tracing::warn;

use osn_archive_core::ArchiveError;
use osn_archive_core::FetchStatus;
use osn_archive_core::GameId;
use osn_archive_core::ListingRow;
use osn_archive_core::unwrap_replay;
use osn_archive_store_sqlite::Store;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exact column count of the legacy dump.
pub const TSV_COLUMN_COUNT: usize = 15;

/// The fifteen columns the header must contain, in any order.
pub const EXPECTED_COLUMNS: [&str; TSV_COLUMN_COUNT] = [
    "game_id",
    "game_type",
    "season",
    "created",
    "player_names",
    "player_ids",
    "player_leagues",
    "player_races",
    "map_id",
    "map_name",
    "turn_count",
    "replay_fetched",
    "player_winner",
    "engine",
    "first_playerid",
];

// ============================================================================
// SECTION: Report
// ============================================================================

/// Summary of one backfill run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    /// Matches newly inserted.
    pub inserted: usize,
    /// Rows already present in the store.
    pub already_present: usize,
    /// Rows skipped after a row-local failure.
    pub skipped: usize,
}

// ============================================================================
// SECTION: TSV Backfill
// ============================================================================

/// Verifies the header and maps each known column to its position.
fn verify_columns(header: &str) -> Result<HashMap<&'static str, usize>, ArchiveError> {
    let names: Vec<&str> = header.split('\t').map(str::trim).collect();
    if names.len() != TSV_COLUMN_COUNT {
        return Err(ArchiveError::Decode {
            field: "header",
            raw: header.to_string(),
        });
    }
    let mut indices = HashMap::new();
    for (position, &name) in names.iter().enumerate() {
        let known = EXPECTED_COLUMNS
            .iter()
            .copied()
            .find(|column| *column == name)
            .ok_or(ArchiveError::Decode {
                field: "header",
                raw: name.to_string(),
            })?;
        indices.insert(known, position);
    }
    if indices.len() != TSV_COLUMN_COUNT {
        return Err(ArchiveError::Decode {
            field: "header",
            raw: header.to_string(),
        });
    }
    Ok(indices)
}

/// Builds a listing row from one TSV line using the header's positions.
fn row_from_values(indices: &HashMap<&'static str, usize>, values: &[&str]) -> ListingRow {
    let cell = |column: &'static str| values[indices[column]].to_string();
    ListingRow {
        index: String::new(),
        game_id: cell("game_id"),
        game_type: cell("game_type"),
        isleaguematch: None,
        created: cell("created"),
        season: cell("season"),
        engine: cell("engine"),
        map_id: cell("map_id"),
        map_name: cell("map_name"),
        turn_count: cell("turn_count"),
        player_names: cell("player_names"),
        player_ids: cell("player_ids"),
        player_leagues: cell("player_leagues"),
        player_races: cell("player_races"),
        replay_fetched: cell("replay_fetched"),
        player_winner: cell("player_winner"),
        first_playerid: cell("first_playerid"),
    }
}

/// Imports the legacy TSV dump into the store at status LEGACY.
///
/// # Errors
///
/// Returns [`ArchiveError::IoError`] when the file cannot be read,
/// [`ArchiveError::Decode`] on a bad header, and store-consistency errors
/// from the insert path. Row-local failures are logged and skipped.
pub fn backfill_from_index(store: &Store, tsv_path: &Path) -> Result<BackfillReport, ArchiveError> {
    let file = fs::File::open(tsv_path).map_err(|err| ArchiveError::io(tsv_path, &err))?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .transpose()
        .map_err(|err| ArchiveError::io(tsv_path, &err))?
        .ok_or(ArchiveError::Decode {
            field: "header",
            raw: String::new(),
        })?;
    let indices = verify_columns(&header)?;
    info!(path = %tsv_path.display(), "backfilling from legacy index");

    let mut report = BackfillReport::default();
    let mut line_number = 1usize;
    for line in lines {
        let line = line.map_err(|err| ArchiveError::io(tsv_path, &err))?;
        line_number += 1;
        let values: Vec<&str> = line.split('\t').collect();
        if values.len() != TSV_COLUMN_COUNT {
            // The dump carries trailing bookkeeping after its data section.
            info!(line_number, "end of data reached, stopping cleanly");
            break;
        }

        let row = row_from_values(&indices, &values);
        let mut matched = match row.normalize() {
            Ok(matched) => matched,
            Err(err) if err.is_row_local() => {
                warn!(line_number, %err, "skipping unparseable row");
                report.skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };

        // The dump predates the engine minimum; these rows are terminal.
        matched.status = FetchStatus::Legacy;

        if let Err(err) = store.map_by_id(matched.map_id) {
            warn!(line_number, map_id = matched.map_id, %err, "skipping row with unknown map");
            report.skipped += 1;
            continue;
        }

        match store.insert_match(&mut matched) {
            Ok(()) => report.inserted += 1,
            Err(ArchiveError::DuplicateKey { .. }) => {
                debug!(gameid = %matched.match_hash, "already archived");
                report.already_present += 1;
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        inserted = report.inserted,
        already_present = report.already_present,
        skipped = report.skipped,
        "legacy index backfill complete"
    );
    Ok(report)
}

// ============================================================================
// SECTION: Replay Directory Backfill
// ============================================================================

/// Re-reads previously downloaded replay files and advances their matches.
///
/// Accepts both wrapped envelopes and already-canonical replay documents.
/// Files whose GameId is not in the store are logged and skipped.
///
/// # Errors
///
/// Returns [`ArchiveError::IoError`] when the directory cannot be listed.
pub fn backfill_from_replays(store: &Store, dir: &Path) -> Result<BackfillReport, ArchiveError> {
    let entries = fs::read_dir(dir).map_err(|err| ArchiveError::io(dir, &err))?;
    let mut report = BackfillReport::default();

    for entry in entries {
        let entry = entry.map_err(|err| ArchiveError::io(dir, &err))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping unreadable replay file");
                report.skipped += 1;
                continue;
            }
        };
        let game_id = match replay_game_id(&bytes) {
            Some(game_id) => game_id,
            None => {
                warn!(path = %path.display(), "skipping file with no recognizable gameid");
                report.skipped += 1;
                continue;
            }
        };
        match lookup_full_id(store, &game_id) {
            Some(full_id) => match store.update_match_status(&full_id, FetchStatus::Fetched) {
                Ok(()) => report.inserted += 1,
                Err(ArchiveError::RetrogradeStatus { .. }) => report.already_present += 1,
                Err(err) => return Err(err),
            },
            None => {
                warn!(path = %path.display(), gameid = %game_id, "replay has no match row");
                report.skipped += 1;
            }
        }
    }

    info!(
        advanced = report.inserted,
        already_past = report.already_present,
        skipped = report.skipped,
        "replay directory backfill complete"
    );
    Ok(report)
}

/// Extracts the GameId from an envelope or an already-canonical replay.
fn replay_game_id(bytes: &[u8]) -> Option<GameId> {
    if let Ok(unwrapped) = unwrap_replay(bytes) {
        return Some(unwrapped.game_id);
    }
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    value
        .get("gameid")
        .and_then(serde_json::Value::as_str)
        .map(GameId::new)
}

/// Resolves a possibly prefix-stripped id against the stored matches.
fn lookup_full_id(store: &Store, game_id: &GameId) -> Option<GameId> {
    if store.match_by_hash(game_id).is_ok() {
        return Some(game_id.clone());
    }
    let prefixed = GameId::new(format!(
        "{}{}",
        osn_archive_core::ids::COMMON_PREFIX,
        game_id.as_str(),
    ));
    store.match_by_hash(&prefixed).ok().map(|_| prefixed)
}
