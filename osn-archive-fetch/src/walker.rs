// osn-archive-fetch/src/walker.rs
// ============================================================================
// Module: Index Walker
// Description: Walk the paginated listing and record new matches.
// Purpose: Emit newly discovered GameIds in listing order until caught up.
// Dependencies: osn-archive-core, osn-archive-store-sqlite, tracing
// ============================================================================

//! ## Overview
//! The walker fetches listing pages starting at 1, normalizes each row, and
//! inserts it with status LISTED. Rows already present are consumed
//! silently; freshly inserted GameIds go out on the identifier channel in
//! the order they were observed. The walk stops when a whole page yields
//! nothing new or the upstream returns an empty page. A row that fails
//! normalization is logged and skipped; only run-fatal errors go out on the
//! error channel.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::mpsc::Sender;

use tracing::info;
use tracing::warn;

use osn_archive_core::ArchiveError;
use osn_archive_core::FetchStatus;
use osn_archive_core::GameId;
use osn_archive_store_sqlite::Store;

use crate::fetcher::Upstream;

// ============================================================================
// SECTION: Walk
// ============================================================================

/// Summary of one listing walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOutcome {
    /// Matches newly recorded at LISTED.
    pub new_matches: usize,
    /// Pages fetched before the stopping rule fired.
    pub pages: u32,
    /// Rows skipped because normalization failed.
    pub skipped_rows: usize,
}

/// Walks the listing, inserting new matches and emitting their ids.
///
/// Fatal failures (network on the listing itself, store consistency) are
/// delivered on `errors`; the walk ends immediately after. The identifier
/// channel is closed by dropping `ids` on return.
pub fn walk_listing(
    store: &Store,
    upstream: &dyn Upstream,
    ids: &Sender<GameId>,
    errors: &Sender<ArchiveError>,
) -> WalkOutcome {
    let mut outcome = WalkOutcome::default();
    let mut page = 1u32;
    loop {
        let index = match upstream.index_page(page) {
            Ok(index) => index,
            Err(err) => {
                let _ = errors.send(err);
                return outcome;
            }
        };
        outcome.pages = page;
        if page == 1 {
            match index.total_count() {
                Ok(Some(total)) => info!(total, "listing reports total matches"),
                Ok(None) => {}
                Err(err) => warn!(%err, "listing total did not parse"),
            }
        }
        if index.replays.is_empty() {
            info!(page, "listing exhausted");
            return outcome;
        }

        let mut new_on_page = 0usize;
        for row in &index.replays {
            let mut matched = match row.normalize() {
                Ok(matched) => matched,
                Err(err) if err.is_row_local() => {
                    warn!(gameid = %row.game_id, %err, "skipping malformed listing row");
                    outcome.skipped_rows += 1;
                    continue;
                }
                Err(err) => {
                    let _ = errors.send(err);
                    return outcome;
                }
            };
            matched.status = FetchStatus::Listed;
            match store.insert_match(&mut matched) {
                Ok(()) => {
                    new_on_page += 1;
                    outcome.new_matches += 1;
                    if ids.send(matched.match_hash.clone()).is_err() {
                        // Receiver gone; the pipeline is shutting down.
                        return outcome;
                    }
                }
                Err(ArchiveError::DuplicateKey { .. }) => {
                    // Already archived; consumed silently.
                }
                Err(err) => {
                    let _ = errors.send(err);
                    return outcome;
                }
            }
        }

        if new_on_page == 0 {
            info!(page, "page held no new matches, walk complete");
            return outcome;
        }
        page += 1;
    }
}
