// osn-archive-core/src/matches.rs
// ============================================================================
// Module: Legacy Matches
// Description: The metadata of a single match between two or four players.
// Purpose: Aggregate everything persisted about a match except replay turns.
// Dependencies: chrono
// ============================================================================

//! ## Overview
//! A [`LegacyMatch`] carries the listing-derived metadata for one match: the
//! natural key (its [`GameId`] hash), season and creation time, map and turn
//! count, the engine version it ran under, its pipeline status, and the
//! ordered player roles. The replay itself is stored opaquely on disk after
//! envelope unwrapping; it is not part of this type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chrono::DateTime;
use chrono::Utc;

use crate::enums::FetchStatus;
use crate::ids::GameId;
use crate::player::PlayerRole;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum engine version the current pipeline can process.
///
/// Matches recorded under older engines are kept but marked LEGACY.
pub const ENGINE_VERSION_MIN: i64 = 1603;

// ============================================================================
// SECTION: LegacyMatch
// ============================================================================

/// Metadata of a single match; everything but the per-turn replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMatch {
    /// Surrogate row index; zero until first insert assigns it.
    pub match_index: i64,
    /// Natural key: the upstream identifier hash.
    pub match_hash: GameId,
    /// League match (true) or friendly (false).
    pub competitive: bool,
    /// Season ordinal; seasons are of variable duration.
    pub season: u16,
    /// Creation time, UTC.
    pub start_time: DateTime<Utc>,
    /// Map the match was played on.
    pub map_id: u8,
    /// Number of turns (one ply each) played.
    pub turn_count: u32,
    /// Engine (runtime) version the match ran under.
    pub version: i64,
    /// Progress through the processing pipeline.
    pub status: FetchStatus,
    /// Participating players ordered by turn order.
    pub players: Vec<PlayerRole>,
}

impl LegacyMatch {
    /// The unknown match sentinel (empty hash, no players).
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            match_index: 0,
            match_hash: GameId::default(),
            competitive: false,
            season: 0,
            start_time: DateTime::<Utc>::UNIX_EPOCH,
            map_id: 0,
            turn_count: 0,
            version: 0,
            status: FetchStatus::Unknown,
            players: Vec::new(),
        }
    }

    /// True when the engine version predates the supported minimum.
    #[must_use]
    pub const fn is_legacy_version(&self) -> bool {
        self.version < ENGINE_VERSION_MIN
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_match_has_empty_hash() {
        let unknown = LegacyMatch::unknown();
        assert!(unknown.match_hash.is_unknown());
        assert_eq!(unknown.status, FetchStatus::Unknown);
        assert!(unknown.players.is_empty());
    }

    #[test]
    fn version_threshold_is_exclusive() {
        let mut m = LegacyMatch::unknown();
        m.version = ENGINE_VERSION_MIN;
        assert!(!m.is_legacy_version());
        m.version = ENGINE_VERSION_MIN - 1;
        assert!(m.is_legacy_version());
    }
}
