// osn-archive-core/src/player.rs
// ============================================================================
// Module: Players, Roles, and Standings
// Description: Player identity, match participation, and ranked standings.
// Purpose: Model who played, in which seat, and where that left their rank.
// Dependencies: (std only)
// ============================================================================

//! ## Overview
//! A [`Player`] is identified by the upstream row id; the GameCenter id is
//! only revealed inside replay payloads and is therefore optional. A
//! [`PlayerRole`] binds a player to one match, seat, and race. A
//! [`PlayerStanding`] snapshots the player's ranked position after a role;
//! consecutive standings for one player chain `until` to the next `after`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::enums::League;
use crate::enums::PlayerColor;
use crate::enums::UnitRace;
use crate::error::ArchiveError;

// ============================================================================
// SECTION: Player
// ============================================================================

/// Row id reserved for the unknown player sentinel.
pub const UNKNOWN_PLAYER_ID: i64 = 0;

/// A player as recorded by the archive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Player {
    /// Surrogate row id; zero is the unknown sentinel.
    pub row_id: i64,
    /// GameCenter id, revealed only in replay payloads; unique when present.
    pub gcid: Option<String>,
    /// Display name, unique across players.
    pub name: String,
}

impl Player {
    /// Creates a player with no GCID (the listing never reveals one).
    #[must_use]
    pub fn new(row_id: i64, name: impl Into<String>) -> Self {
        Self {
            row_id,
            gcid: None,
            name: name.into(),
        }
    }

    /// The unknown player sentinel stored at row id zero.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            row_id: UNKNOWN_PLAYER_ID,
            gcid: None,
            name: "UNKNOWN".to_string(),
        }
    }

    /// True for the unknown sentinel.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.row_id == UNKNOWN_PLAYER_ID
    }
}

// ============================================================================
// SECTION: Player Role
// ============================================================================

/// One player's participation in one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRole {
    /// Surrogate id of the match row; zero until the match is stored.
    pub match_id: i64,
    /// The participating player.
    pub player: Player,
    /// Seat and turn order, one-based.
    pub turn_order: PlayerColor,
    /// Race the player fielded.
    pub race: UnitRace,
    /// Base color theme chosen for the player's buildings.
    pub base_theme: u8,
}

impl PlayerRole {
    /// Creates a role for a match that has not been stored yet.
    #[must_use]
    pub fn new(player: Player, turn_order: PlayerColor, race: UnitRace) -> Self {
        Self {
            match_id: 0,
            player,
            turn_order,
            race,
            base_theme: 0,
        }
    }
}

// ============================================================================
// SECTION: Player Standing
// ============================================================================

/// Upper bound (exclusive) for a standing's rank byte.
pub const RANK_LIMIT: u8 = 128;

/// An ELO-like snapshot of a player's league, rank, points, and delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerStanding {
    /// League the player stands in.
    pub league: League,
    /// Rank within the player's division.
    pub rank: u8,
    /// Points after the match this standing follows.
    pub points: u16,
    /// Difference from the previous standing's points.
    pub delta: i8,
}

impl PlayerStanding {
    /// Creates a standing, rejecting an invalid league or rank.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Decode`] when the rank is outside `0..128`.
    /// (The league is typed and therefore always in range; the raw-integer
    /// check lives in the codec.)
    pub fn new(league: League, rank: u8, points: u16, delta: i8) -> Result<Self, ArchiveError> {
        if rank >= RANK_LIMIT {
            return Err(ArchiveError::Decode {
                field: "player_rank",
                raw: rank.to_string(),
            });
        }
        Ok(Self {
            league,
            rank,
            points,
            delta,
        })
    }

    /// The unknown standing sentinel.
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Points before the match, recovered from the delta.
    #[must_use]
    pub fn points_before(&self) -> u16 {
        (i32::from(self.points) - i32::from(self.delta)) as u16
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
