// osn-archive-store-sqlite/src/tables/matches.rs
// ============================================================================
// Module: Matches and Roles Tables
// Description: Match metadata rows and the per-match player role relation.
// Purpose: Persist a match and its seats; the GameId hash is the natural key.
// Dependencies: osn-archive-core, rusqlite, chrono
// ============================================================================

//! ## Overview
//! The matches table holds everything the listing reveals about a match;
//! the replay itself lives on disk. The surrogate `match_index` is assigned
//! at first insert, while the `match_hash` stays the natural key across
//! ingestions. Roles tie players to a match with a unique turn order per
//! seat; a duplicate (match, player) pair is ignored by constraint so
//! re-ingesting a row stays idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chrono::DateTime;
use chrono::Utc;
use rusqlite::Row;
use rusqlite::types::Value;

use osn_archive_core::ArchiveError;
use osn_archive_core::Enumerated;
use osn_archive_core::FetchStatus;
use osn_archive_core::GameId;
use osn_archive_core::LegacyMatch;
use osn_archive_core::PlayerColor;
use osn_archive_core::UnitRace;

use crate::table::MutableTable;
use crate::table::Record;
use crate::table::SharedConnection;
use crate::table::cell_bool;
use crate::table::cell_i64;
use crate::table::cell_text;

// ============================================================================
// SECTION: Matches Schema
// ============================================================================

/// Matches table name.
pub const MATCHES_TABLE: &str = "matches";

const MATCHES_CREATE_SQL: &str = r#"CREATE TABLE "matches" (
  "match_index"   INTEGER PRIMARY KEY,
  "match_hash"    TEXT NOT NULL UNIQUE,
  "competitive"   BOOLEAN,
  "season"        INTEGER,
  "start_time"    TIMESTAMP,

  "map_id"        INTEGER,
  "turn_count"    INTEGER,

  "version"       INTEGER,
  "fetch_status"  INTEGER,

  FOREIGN KEY (map_id)
    REFERENCES maps (map_id)
    ON DELETE CASCADE ON UPDATE NO ACTION,
  FOREIGN KEY (fetch_status)
    REFERENCES fetch_status (id)
    ON DELETE CASCADE ON UPDATE NO ACTION
)"#;

fn matches_seed_sql() -> Vec<String> {
    vec!["CREATE UNIQUE INDEX match_hashes ON matches (match_hash)".to_string()]
}

// ============================================================================
// SECTION: Match Record
// ============================================================================

/// Row wrapper around [`LegacyMatch`]; the role list is a separate relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord(pub LegacyMatch);

impl MatchRecord {
    /// Wraps a match, dropping its in-memory role list (stored separately).
    #[must_use]
    pub fn new(mut matched: LegacyMatch) -> Self {
        matched.players = Vec::new();
        Self(matched)
    }
}

impl Record for MatchRecord {
    const ENTITY: &'static str = "matches";

    fn columns() -> &'static [&'static str] {
        &[
            "match_index",
            "match_hash",
            "competitive",
            "season",
            "start_time",
            "map_id",
            "turn_count",
            "version",
            "fetch_status",
        ]
    }

    fn encode(&self) -> Vec<Value> {
        let matched = &self.0;
        vec![
            Value::Integer(matched.match_index),
            Value::Text(matched.match_hash.as_str().to_string()),
            Value::Integer(i64::from(matched.competitive)),
            Value::Integer(i64::from(matched.season)),
            Value::Text(matched.start_time.to_rfc3339()),
            Value::Integer(i64::from(matched.map_id)),
            Value::Integer(i64::from(matched.turn_count)),
            Value::Integer(matched.version),
            Value::Integer(i64::from(matched.status.as_repr())),
        ]
    }

    fn decode(cells: &[Value]) -> Result<Self, ArchiveError> {
        let start_raw = cell_text(cells, 4, "start_time")?;
        let start_time = DateTime::parse_from_rfc3339(&start_raw)
            .map(|stamp| stamp.with_timezone(&Utc))
            .map_err(|_| ArchiveError::Decode {
                field: "start_time",
                raw: start_raw.clone(),
            })?;
        let status_raw = cell_i64(cells, 8, "fetch_status")?;
        let status = u8::try_from(status_raw)
            .ok()
            .and_then(FetchStatus::from_repr)
            .ok_or(ArchiveError::Decode {
                field: "fetch_status",
                raw: status_raw.to_string(),
            })?;
        Ok(Self(LegacyMatch {
            match_index: cell_i64(cells, 0, "match_index")?,
            match_hash: GameId::new(cell_text(cells, 1, "match_hash")?),
            competitive: cell_bool(cells, 2, "competitive")?,
            season: cell_i64(cells, 3, "season")? as u16,
            start_time,
            map_id: cell_i64(cells, 5, "map_id")? as u8,
            turn_count: cell_i64(cells, 6, "turn_count")? as u32,
            version: cell_i64(cells, 7, "version")?,
            status,
            players: Vec::new(),
        }))
    }

    fn scan_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status_raw: u8 = row.get(8)?;
        Ok(Self(LegacyMatch {
            match_index: row.get(0)?,
            match_hash: GameId::new(row.get::<_, String>(1)?),
            competitive: row.get(2)?,
            season: row.get(3)?,
            start_time: row.get(4)?,
            map_id: row.get(5)?,
            turn_count: row.get(6)?,
            version: row.get(7)?,
            status: FetchStatus::from_repr(status_raw).unwrap_or(FetchStatus::Unknown),
            players: Vec::new(),
        }))
    }

    fn key(&self) -> i64 {
        self.0.match_index
    }

    fn assign_key(&mut self, key: i64) {
        self.0.match_index = key;
    }
}

// ============================================================================
// SECTION: Roles Schema
// ============================================================================

/// Roles table name.
pub const ROLES_TABLE: &str = "roles";

const ROLES_CREATE_SQL: &str = r#"CREATE TABLE "roles" (
  "role_id"     INTEGER PRIMARY KEY,
  "match_id"    INTEGER NOT NULL,
  "player_id"   INTEGER NOT NULL,
  "turn_order"  INTEGER CHECK(turn_order > 0 AND turn_order <= 4),
  "race"        INTEGER,
  "base_theme"  INTEGER DEFAULT 0,

  FOREIGN KEY (match_id)
    REFERENCES matches (match_index)
    ON DELETE CASCADE ON UPDATE NO ACTION,
  FOREIGN KEY (player_id)
    REFERENCES players (id)
    ON DELETE CASCADE ON UPDATE NO ACTION,
  FOREIGN KEY (race)
    REFERENCES races (race_id)
    ON DELETE CASCADE ON UPDATE NO ACTION,

  UNIQUE (match_id, turn_order) ON CONFLICT FAIL,
  UNIQUE (match_id, player_id) ON CONFLICT IGNORE
)"#;

// ============================================================================
// SECTION: Role Record
// ============================================================================

/// One player's seat in one match, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    /// Surrogate role id; standings reference it.
    pub role_id: i64,
    /// The match this seat belongs to.
    pub match_id: i64,
    /// The seated player.
    pub player_id: i64,
    /// Seat and turn order.
    pub turn_order: PlayerColor,
    /// Race fielded from this seat.
    pub race: UnitRace,
    /// Base color theme.
    pub base_theme: u8,
}

impl Record for RoleRecord {
    const ENTITY: &'static str = "roles";

    fn columns() -> &'static [&'static str] {
        &["role_id", "match_id", "player_id", "turn_order", "race", "base_theme"]
    }

    fn encode(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.role_id),
            Value::Integer(self.match_id),
            Value::Integer(self.player_id),
            Value::Integer(i64::from(self.turn_order.as_repr())),
            Value::Integer(i64::from(self.race.as_repr())),
            Value::Integer(i64::from(self.base_theme)),
        ]
    }

    fn decode(cells: &[Value]) -> Result<Self, ArchiveError> {
        let order_raw = cell_i64(cells, 3, "turn_order")?;
        let turn_order = u8::try_from(order_raw)
            .ok()
            .and_then(PlayerColor::from_repr)
            .ok_or(ArchiveError::Decode {
                field: "turn_order",
                raw: order_raw.to_string(),
            })?;
        let race_raw = cell_i64(cells, 4, "race")?;
        let race = u8::try_from(race_raw)
            .ok()
            .and_then(UnitRace::from_repr)
            .ok_or(ArchiveError::Decode {
                field: "race",
                raw: race_raw.to_string(),
            })?;
        Ok(Self {
            role_id: cell_i64(cells, 0, "role_id")?,
            match_id: cell_i64(cells, 1, "match_id")?,
            player_id: cell_i64(cells, 2, "player_id")?,
            turn_order,
            race,
            base_theme: cell_i64(cells, 5, "base_theme")? as u8,
        })
    }

    fn scan_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let order_raw: u8 = row.get(3)?;
        let race_raw: u8 = row.get(4)?;
        Ok(Self {
            role_id: row.get(0)?,
            match_id: row.get(1)?,
            player_id: row.get(2)?,
            turn_order: PlayerColor::from_repr(order_raw).unwrap_or(PlayerColor::Blue),
            race: UnitRace::from_repr(race_raw).unwrap_or(UnitRace::Unknown),
            base_theme: row.get(5)?,
        })
    }

    fn key(&self) -> i64 {
        self.role_id
    }

    fn assign_key(&mut self, key: i64) {
        self.role_id = key;
    }
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

/// Builds the mutable matches table.
#[must_use]
pub fn matches_table(conn: SharedConnection) -> MutableTable<MatchRecord> {
    MutableTable::new(
        conn,
        MATCHES_TABLE,
        "match_index",
        Some("match_hash"),
        MATCHES_CREATE_SQL,
        matches_seed_sql(),
    )
}

/// Builds the mutable roles table.
#[must_use]
pub fn roles_table(conn: SharedConnection) -> MutableTable<RoleRecord> {
    MutableTable::new(conn, ROLES_TABLE, "role_id", None, ROLES_CREATE_SQL, Vec::new())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_match() -> LegacyMatch {
        LegacyMatch {
            match_index: 5,
            match_hash: GameId::new("hash-abc"),
            competitive: true,
            season: 1,
            start_time: Utc.with_ymd_and_hms(2012, 8, 5, 15, 14, 31).unwrap(),
            map_id: 7,
            turn_count: 25,
            version: 1603,
            status: FetchStatus::Listed,
            players: Vec::new(),
        }
    }

    #[test]
    fn match_encode_decode_roundtrips() {
        let record = MatchRecord(sample_match());
        let back = MatchRecord::decode(&record.encode()).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn role_encode_decode_roundtrips() {
        let record = RoleRecord {
            role_id: 3,
            match_id: 5,
            player_id: 2,
            turn_order: PlayerColor::Red,
            race: UnitRace::Scallywags,
            base_theme: 1,
        };
        assert_eq!(RoleRecord::decode(&record.encode()).unwrap(), record);
    }

    #[test]
    fn decode_rejects_an_invalid_status() {
        let record = MatchRecord(sample_match());
        let mut cells = record.encode();
        cells[8] = Value::Integer(42);
        let err = MatchRecord::decode(&cells).unwrap_err();
        assert!(matches!(err, ArchiveError::Decode { field: "fetch_status", .. }));
    }
}
