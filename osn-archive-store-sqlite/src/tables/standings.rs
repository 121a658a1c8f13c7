// osn-archive-store-sqlite/src/tables/standings.rs
// ============================================================================
// Module: Standings Table
// Description: Append-only ranked standings chained between roles.
// Purpose: Snapshot a player's league position after each competitive match.
// Dependencies: osn-archive-core, rusqlite
// ============================================================================

//! ## Overview
//! A standing is valid from the role it follows (`after_role`) until a later
//! role closes the interval (`until_role`). For each player the rows chain:
//! one row's `until_role` equals the next row's `after_role`, and the most
//! recent row is open with `until_role` NULL. Rows are never updated except
//! to close that interval when the next one is appended.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Row;
use rusqlite::types::Value;

use osn_archive_core::ArchiveError;
use osn_archive_core::Enumerated;
use osn_archive_core::League;
use osn_archive_core::PlayerStanding;

use crate::table::MutableTable;
use crate::table::Record;
use crate::table::SharedConnection;
use crate::table::cell_i64;

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Table name.
pub const TABLE_NAME: &str = "standings";

const CREATE_SQL: &str = r#"CREATE TABLE "standings" (
  "standing_id"    INTEGER PRIMARY KEY,
  "after_role"     INTEGER NOT NULL UNIQUE,
  "until_role"     INTEGER,

  "player_league"  INTEGER NOT NULL,
  "player_rank"    INTEGER NOT NULL CHECK(player_rank >= 0 AND player_rank < 128),
  "player_points"  INTEGER DEFAULT 0,
  "player_delta"   INTEGER DEFAULT 0,

  FOREIGN KEY (after_role)
    REFERENCES roles (role_id)
    ON DELETE CASCADE ON UPDATE NO ACTION,
  FOREIGN KEY (until_role)
    REFERENCES roles (role_id)
    ON DELETE CASCADE ON UPDATE NO ACTION,
  FOREIGN KEY (player_league)
    REFERENCES leagues (league_id)
    ON DELETE CASCADE ON UPDATE NO ACTION
)"#;

// ============================================================================
// SECTION: Record
// ============================================================================

/// One stored standing interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingRecord {
    /// Surrogate row id.
    pub standing_id: i64,
    /// Role this standing follows.
    pub after_role: i64,
    /// Role that closed the interval; None while current.
    pub until_role: Option<i64>,
    /// The standing snapshot itself.
    pub standing: PlayerStanding,
}

impl Record for StandingRecord {
    const ENTITY: &'static str = "standings";

    fn columns() -> &'static [&'static str] {
        &[
            "standing_id",
            "after_role",
            "until_role",
            "player_league",
            "player_rank",
            "player_points",
            "player_delta",
        ]
    }

    fn encode(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.standing_id),
            Value::Integer(self.after_role),
            self.until_role.map_or(Value::Null, Value::Integer),
            Value::Integer(i64::from(self.standing.league.as_repr())),
            Value::Integer(i64::from(self.standing.rank)),
            Value::Integer(i64::from(self.standing.points)),
            Value::Integer(i64::from(self.standing.delta)),
        ]
    }

    fn decode(cells: &[Value]) -> Result<Self, ArchiveError> {
        let until_role = match cells.get(2) {
            Some(Value::Integer(value)) => Some(*value),
            Some(Value::Null) => None,
            other => {
                return Err(ArchiveError::Decode {
                    field: "until_role",
                    raw: format!("{other:?}"),
                })
            }
        };
        let league_raw = cell_i64(cells, 3, "player_league")?;
        let league = u8::try_from(league_raw)
            .ok()
            .and_then(League::from_repr)
            .ok_or(ArchiveError::Decode {
                field: "player_league",
                raw: league_raw.to_string(),
            })?;
        let standing = PlayerStanding::new(
            league,
            cell_i64(cells, 4, "player_rank")? as u8,
            cell_i64(cells, 5, "player_points")? as u16,
            cell_i64(cells, 6, "player_delta")? as i8,
        )?;
        Ok(Self {
            standing_id: cell_i64(cells, 0, "standing_id")?,
            after_role: cell_i64(cells, 1, "after_role")?,
            until_role,
            standing,
        })
    }

    fn scan_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let league_raw: u8 = row.get(3)?;
        Ok(Self {
            standing_id: row.get(0)?,
            after_role: row.get(1)?,
            until_role: row.get(2)?,
            standing: PlayerStanding {
                league: League::from_repr(league_raw).unwrap_or(League::Unknown),
                rank: row.get(4)?,
                points: row.get(5)?,
                delta: row.get(6)?,
            },
        })
    }

    fn key(&self) -> i64 {
        self.standing_id
    }

    fn assign_key(&mut self, key: i64) {
        self.standing_id = key;
    }
}

// ============================================================================
// SECTION: Constructor
// ============================================================================

/// Builds the mutable standings table.
#[must_use]
pub fn standings_table(conn: SharedConnection) -> MutableTable<StandingRecord> {
    MutableTable::new(conn, TABLE_NAME, "standing_id", None, CREATE_SQL, Vec::new())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrips_open_and_closed_intervals() {
        let open = StandingRecord {
            standing_id: 1,
            after_role: 10,
            until_role: None,
            standing: PlayerStanding::new(League::Clever, 42, 850, -6).unwrap(),
        };
        assert_eq!(StandingRecord::decode(&open.encode()).unwrap(), open);

        let closed = StandingRecord {
            until_role: Some(12),
            ..open.clone()
        };
        assert_eq!(StandingRecord::decode(&closed.encode()).unwrap(), closed);
    }

    #[test]
    fn decode_rejects_an_out_of_range_rank() {
        let record = StandingRecord {
            standing_id: 1,
            after_role: 10,
            until_role: None,
            standing: PlayerStanding::new(League::Clever, 42, 850, -6).unwrap(),
        };
        let mut cells = record.encode();
        cells[4] = Value::Integer(200);
        assert!(StandingRecord::decode(&cells).is_err());
    }
}
