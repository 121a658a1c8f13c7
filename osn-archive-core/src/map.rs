// osn-archive-core/src/map.rs
// ============================================================================
// Module: Legacy Maps
// Description: The static catalog of maps matches were played on.
// Purpose: Identify board layouts; deprecated maps keep their ids joinable.
// Dependencies: (std only)
// ============================================================================

//! ## Overview
//! The map catalog is fixed: the upstream service stopped adding maps long
//! ago, so the nineteen entries here (id 0 is the unknown sentinel) are seed
//! data, created once at bootstrap and read-only afterwards. A role count of
//! zero marks a map as deprecated; such maps stay in the table so matches
//! recorded on them remain joinable.

// ============================================================================
// SECTION: Imports
// ============================================================================


use crate::enums::UnitRace;

// ============================================================================
// SECTION: LegacyMap
// ============================================================================

/// A map identity plus the layout facts the archive keeps about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMap {
    /// Map enumeration value; zero is the unknown sentinel.
    pub map_id: u8,
    /// Display name, e.g. "Glitch".
    pub name: String,
    /// Short filename stem used for map asset files.
    pub filename: String,
    /// Seats the map supports: 2, 4, or 0 for a deprecated map.
    pub role_count: u8,
    /// Visual theme, shared with the race enumeration.
    pub theme: UnitRace,
    /// Board width in tiles.
    pub width: u8,
    /// Board height in tiles.
    pub height: u8,
}

impl LegacyMap {
    /// The unknown map sentinel stored at id zero.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            map_id: 0,
            name: "MAP_UNKNOWN".to_string(),
            filename: String::new(),
            role_count: 0,
            theme: UnitRace::Unknown,
            width: 0,
            height: 0,
        }
    }

    /// True when the map no longer accepts new matches.
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        self.role_count == 0
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// (id, name, filename, role count, theme, width, height) seed rows.
///
/// Map 2 is the superseded first revision of Foundry; its role count of zero
/// marks it deprecated while keeping the id joinable for historical matches.
const CATALOG: &[(u8, &str, &str, u8, UnitRace, u8, u8)] = &[
    (0, "MAP_UNKNOWN", "", 0, UnitRace::Unknown, 0, 0),
    (1, "Machination", "machination", 4, UnitRace::Feedback, 13, 13),
    (2, "Foundry (v1)", "foundry", 0, UnitRace::Feedback, 13, 12),
    (3, "Foundry", "foundry", 2, UnitRace::Feedback, 13, 12),
    (4, "Glitch", "glitch", 2, UnitRace::Feedback, 11, 11),
    (5, "Candy Core Mine", "candy-core-mine", 4, UnitRace::Adorables, 13, 13),
    (6, "Sweetie Plains", "sweetie-plains", 2, UnitRace::Adorables, 13, 13),
    (7, "Peek-a-boo", "peekaboo", 2, UnitRace::Adorables, 13, 10),
    (8, "Blitz Beach", "blitz-beach", 4, UnitRace::Scallywags, 13, 11),
    (9, "Long Nine", "long-nine", 2, UnitRace::Scallywags, 13, 14),
    (10, "Sharkfood Island", "sharkfood-island", 2, UnitRace::Scallywags, 13, 10),
    (11, "Acrospire", "acrospire", 4, UnitRace::Veggienauts, 13, 13),
    (12, "Thorn Gulley", "thorn-gulley", 2, UnitRace::Veggienauts, 13, 12),
    (13, "Reaper", "reaper", 2, UnitRace::Veggienauts, 13, 12),
    (14, "Skull Duggery", "skull-duggery", 2, UnitRace::Scallywags, 13, 10),
    (15, "War Garden", "war-garden", 2, UnitRace::Veggienauts, 13, 12),
    (16, "Sweet Tooth", "sweet-tooth", 2, UnitRace::Adorables, 13, 10),
    (17, "Sugar Rock", "sugar-rock", 4, UnitRace::Adorables, 13, 13),
    (18, "Mechanism", "mechanism", 4, UnitRace::Feedback, 13, 13),
];

/// Builds the full static catalog, unknown sentinel included.
#[must_use]
pub fn catalog() -> Vec<LegacyMap> {
    CATALOG
        .iter()
        .map(|&(map_id, name, filename, role_count, theme, width, height)| LegacyMap {
            map_id,
            name: name.to_string(),
            filename: filename.to_string(),
            role_count,
            theme,
            width,
            height,
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_ids_zero_through_eighteen() {
        let maps = catalog();
        assert_eq!(maps.len(), 19);
        for (expected, map) in maps.iter().enumerate() {
            assert_eq!(usize::from(map.map_id), expected);
        }
    }

    #[test]
    fn role_counts_are_zero_two_or_four() {
        for map in catalog() {
            assert!(matches!(map.role_count, 0 | 2 | 4), "map {}", map.map_id);
        }
    }

    #[test]
    fn foundry_v1_is_deprecated() {
        let maps = catalog();
        assert!(maps[2].is_deprecated());
        assert_eq!(maps[2].name, "Foundry (v1)");
        assert!(!maps[3].is_deprecated());
    }

    #[test]
    fn machination_seats_four() {
        let maps = catalog();
        assert_eq!(maps[1].name, "Machination");
        assert_eq!(maps[1].role_count, 4);
    }
}
