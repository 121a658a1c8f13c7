// osn-archive-store-sqlite/src/tables/players.rs
// ============================================================================
// Module: Players Table
// Description: Player identities with optional, unique GameCenter ids.
// Purpose: Persist players idempotently as they are first sighted.
// Dependencies: osn-archive-core, rusqlite
// ============================================================================

//! ## Overview
//! Players keep the row id the upstream service assigned them, so the key
//! column carries caller-provided values rather than autoincrement. The
//! UNKNOWN sentinel occupies row zero from bootstrap. Display names are
//! unique through a secondary index; GCIDs are unique when present and are
//! only learned later, from replay payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Row;
use rusqlite::types::Value;

use osn_archive_core::ArchiveError;
use osn_archive_core::Player;

use crate::table::MutableTable;
use crate::table::Record;
use crate::table::SharedConnection;
use crate::table::cell_i64;
use crate::table::cell_opt_text;
use crate::table::cell_text;

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Table name.
pub const TABLE_NAME: &str = "players";

const CREATE_SQL: &str = r#"CREATE TABLE "players" (
  "id"    INTEGER PRIMARY KEY,
  "gcid"  TEXT UNIQUE,
  "name"  TEXT NOT NULL
)"#;

/// Seed: the UNKNOWN sentinel plus the unique name index.
fn seed_sql() -> Vec<String> {
    vec![
        "INSERT INTO players (id, gcid, name) VALUES (0, NULL, 'UNKNOWN')".to_string(),
        "CREATE UNIQUE INDEX player_names ON players (name)".to_string(),
    ]
}

// ============================================================================
// SECTION: Record
// ============================================================================

/// Row wrapper around [`Player`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord(pub Player);

impl Record for PlayerRecord {
    const ENTITY: &'static str = "players";

    fn columns() -> &'static [&'static str] {
        &["id", "gcid", "name"]
    }

    fn encode(&self) -> Vec<Value> {
        let player = &self.0;
        vec![
            Value::Integer(player.row_id),
            player
                .gcid
                .clone()
                .map_or(Value::Null, Value::Text),
            Value::Text(player.name.clone()),
        ]
    }

    fn decode(cells: &[Value]) -> Result<Self, ArchiveError> {
        Ok(Self(Player {
            row_id: cell_i64(cells, 0, "id")?,
            gcid: cell_opt_text(cells, 1, "gcid")?,
            name: cell_text(cells, 2, "name")?,
        }))
    }

    fn scan_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self(Player {
            row_id: row.get(0)?,
            gcid: row.get(1)?,
            name: row.get(2)?,
        }))
    }

    fn key(&self) -> i64 {
        self.0.row_id
    }

    fn assign_key(&mut self, key: i64) {
        self.0.row_id = key;
    }
}

// ============================================================================
// SECTION: Constructor
// ============================================================================

/// Builds the mutable players table.
#[must_use]
pub fn players_table(conn: SharedConnection) -> MutableTable<PlayerRecord> {
    MutableTable::new(conn, TABLE_NAME, "id", Some("name"), CREATE_SQL, seed_sql())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrips_with_and_without_gcid() {
        let bare = PlayerRecord(Player::new(7, "Syvan"));
        assert_eq!(PlayerRecord::decode(&bare.encode()).unwrap(), bare);

        let mut with_gcid = Player::new(8, "Alvendor");
        with_gcid.gcid = Some("G:12345".to_string());
        let record = PlayerRecord(with_gcid);
        assert_eq!(PlayerRecord::decode(&record.encode()).unwrap(), record);
    }

    #[test]
    fn missing_gcid_encodes_as_null() {
        let record = PlayerRecord(Player::new(7, "Syvan"));
        assert_eq!(record.encode()[1], Value::Null);
    }
}
