// osn-archive-store-sqlite/src/tables/maps.rs
// ============================================================================
// Module: Maps Table
// Description: The read-only map catalog table.
// Purpose: Seed the static catalog and decode rows back into LegacyMap.
// Dependencies: osn-archive-core, rusqlite
// ============================================================================

//! ## Overview
//! The maps table is created and seeded once from the in-memory catalog and
//! never mutated afterwards. A role count of zero marks deprecation; such
//! rows stay present so matches on deprecated maps keep a valid foreign key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Row;
use rusqlite::types::Value;

use osn_archive_core::ArchiveError;
use osn_archive_core::Enumerated;
use osn_archive_core::LegacyMap;
use osn_archive_core::UnitRace;
use osn_archive_core::map::catalog;

use crate::table::Record;
use crate::table::SharedConnection;
use crate::table::Table;
use crate::table::cell_i64;
use crate::table::cell_text;

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Table name.
pub const TABLE_NAME: &str = "maps";

const CREATE_SQL: &str = r#"CREATE TABLE "maps" (
  "map_id"        INTEGER PRIMARY KEY,
  "map_name"      VARCHAR(127) NOT NULL,
  "role_count"    INTEGER CHECK(role_count == 0 OR role_count == 2 OR role_count == 4),
  "map_filename"  TEXT NOT NULL,
  "map_theme"     INTEGER,
  "width"         INTEGER,
  "height"        INTEGER,

  FOREIGN KEY (map_theme) REFERENCES races (race_id)
    ON DELETE CASCADE ON UPDATE NO ACTION
) WITHOUT ROWID"#;

/// Builds the seed statements from the static catalog.
fn seed_sql() -> Vec<String> {
    let rows: Vec<String> = catalog()
        .iter()
        .map(|map| {
            format!(
                "({}, '{}', {}, '{}', {}, {}, {})",
                map.map_id,
                map.name.replace('\'', "''"),
                map.role_count,
                map.filename,
                map.theme.as_repr(),
                map.width,
                map.height,
            )
        })
        .collect();
    vec![format!(
        "INSERT INTO maps (map_id, map_name, role_count, map_filename, map_theme, width, height) VALUES {}",
        rows.join(", "),
    )]
}

// ============================================================================
// SECTION: Record
// ============================================================================

/// Row wrapper around [`LegacyMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRecord(pub LegacyMap);

impl Record for MapRecord {
    const ENTITY: &'static str = "maps";

    fn columns() -> &'static [&'static str] {
        &[
            "map_id",
            "map_name",
            "role_count",
            "map_filename",
            "map_theme",
            "width",
            "height",
        ]
    }

    fn encode(&self) -> Vec<Value> {
        let map = &self.0;
        vec![
            Value::Integer(i64::from(map.map_id)),
            Value::Text(map.name.clone()),
            Value::Integer(i64::from(map.role_count)),
            Value::Text(map.filename.clone()),
            Value::Integer(i64::from(map.theme.as_repr())),
            Value::Integer(i64::from(map.width)),
            Value::Integer(i64::from(map.height)),
        ]
    }

    fn decode(cells: &[Value]) -> Result<Self, ArchiveError> {
        let theme_raw = cell_i64(cells, 4, "map_theme")?;
        let theme = u8::try_from(theme_raw)
            .ok()
            .and_then(UnitRace::from_repr)
            .ok_or(ArchiveError::Decode {
                field: "map_theme",
                raw: theme_raw.to_string(),
            })?;
        Ok(Self(LegacyMap {
            map_id: cell_i64(cells, 0, "map_id")? as u8,
            name: cell_text(cells, 1, "map_name")?,
            role_count: cell_i64(cells, 2, "role_count")? as u8,
            filename: cell_text(cells, 3, "map_filename")?,
            theme,
            width: cell_i64(cells, 5, "width")? as u8,
            height: cell_i64(cells, 6, "height")? as u8,
        }))
    }

    fn scan_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let theme_raw: u8 = row.get(4)?;
        Ok(Self(LegacyMap {
            map_id: row.get(0)?,
            name: row.get(1)?,
            role_count: row.get(2)?,
            filename: row.get(3)?,
            theme: UnitRace::from_repr(theme_raw).unwrap_or(UnitRace::Unknown),
            width: row.get(5)?,
            height: row.get(6)?,
        }))
    }

    fn key(&self) -> i64 {
        i64::from(self.0.map_id)
    }

    fn assign_key(&mut self, key: i64) {
        self.0.map_id = key as u8;
    }
}

// ============================================================================
// SECTION: Constructor
// ============================================================================

/// Builds the read-only maps table.
#[must_use]
pub fn maps_table(conn: SharedConnection) -> Table<MapRecord> {
    Table::new(conn, TABLE_NAME, "map_id", Some("map_name"), CREATE_SQL, seed_sql())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrips_the_catalog() {
        for map in catalog() {
            let record = MapRecord(map);
            let cells = record.encode();
            let back = MapRecord::decode(&cells).unwrap();
            assert_eq!(back, record);
        }
    }

    #[test]
    fn seed_contains_every_catalog_row() {
        let seed = seed_sql();
        assert_eq!(seed.len(), 1);
        assert!(seed[0].contains("(1, 'Machination', 4, 'machination', 1, 13, 13)"));
        assert!(seed[0].contains("(2, 'Foundry (v1)', 0,"));
    }
}
