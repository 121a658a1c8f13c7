// osn-archive-store-sqlite/src/enum_table.rs
// ============================================================================
// Module: Enumeration Tables
// Description: Specialized tables for the closed enumerations.
// Purpose: Serve variants from memory; the database copy is documentation.
// Dependencies: osn-archive-core
// ============================================================================

//! ## Overview
//! Enumeration tables are a recurring pattern in fully constrained
//! relational schemas: an (id, name) pair per variant, seeded once at
//! bootstrap so foreign keys and human inspection both work. After
//! bootstrap the table is never read; every lookup is answered from the
//! enum itself, and insertion is refused outright.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use osn_archive_core::ArchiveError;
use osn_archive_core::Enumerated;

// ============================================================================
// SECTION: EnumTable
// ============================================================================

/// A table whose rows are the variants of a closed enumeration.
pub struct EnumTable<E: Enumerated> {
    /// Table name.
    name: &'static str,
    /// Primary-key column name.
    id_col: &'static str,
    /// Name column name.
    name_col: &'static str,
    /// Optional extra column: (name, type declaration, value per variant).
    extra: Option<(&'static str, &'static str, fn(E) -> String)>,
    /// Name lookup, built once at construction.
    naming: HashMap<&'static str, E>,
}

impl<E: Enumerated> EnumTable<E> {
    /// Creates an enum table over the variants of `E`.
    #[must_use]
    pub fn new(name: &'static str, id_col: &'static str, name_col: &'static str) -> Self {
        let naming = E::VARIANTS
            .iter()
            .map(|variant| (variant.name(), *variant))
            .collect();
        Self {
            name,
            id_col,
            name_col,
            extra: None,
            naming,
        }
    }

    /// Adds an extra seeded column derived from each variant.
    #[must_use]
    pub fn with_extra_column(
        mut self,
        column: &'static str,
        declaration: &'static str,
        value: fn(E) -> String,
    ) -> Self {
        self.extra = Some((column, declaration, value));
        self
    }

    /// The table name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// All valid variants in declared order, served without a query.
    #[must_use]
    pub const fn variants(&self) -> &'static [E] {
        E::VARIANTS
    }

    /// Validates the integer and returns its variant.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] outside the declared range.
    pub fn get(&self, id: u8) -> Result<E, ArchiveError> {
        E::from_repr(id).ok_or_else(|| ArchiveError::NotFound {
            entity: self.name,
            key: id.to_string(),
        })
    }

    /// Returns the variant with the given canonical spelling.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] for an unrecognized name.
    pub fn get_by_name(&self, name: &str) -> Result<E, ArchiveError> {
        self.naming
            .get(name)
            .copied()
            .ok_or_else(|| ArchiveError::NotFound {
                entity: self.name,
                key: name.to_string(),
            })
    }

    /// Refuses the insert: enumerations are fixed at bootstrap.
    ///
    /// # Errors
    ///
    /// Always returns [`ArchiveError::EnumImmutable`].
    pub fn insert(&self, _variant: E) -> Result<(), ArchiveError> {
        Err(ArchiveError::EnumImmutable)
    }

    /// The CREATE TABLE statement for this enumeration.
    #[must_use]
    pub fn schema_create(&self) -> String {
        let extra = self
            .extra
            .map(|(column, declaration, _)| format!(",\n  \"{column}\"  {declaration}"))
            .unwrap_or_default();
        format!(
            "CREATE TABLE \"{}\" (\n  \"{}\"  INTEGER PRIMARY KEY,\n  \"{}\"  TEXT NOT NULL{extra}\n) WITHOUT ROWID",
            self.name, self.id_col, self.name_col,
        )
    }

    /// The INSERT statement seeding every variant.
    #[must_use]
    pub fn schema_seed(&self) -> String {
        let rows: Vec<String> = E::VARIANTS
            .iter()
            .map(|variant| match self.extra {
                Some((_, _, value)) => format!(
                    "({}, '{}', '{}')",
                    variant.as_repr(),
                    variant.name(),
                    value(*variant),
                ),
                None => format!("({}, '{}')", variant.as_repr(), variant.name()),
            })
            .collect();
        format!("INSERT INTO {} VALUES {}", self.name, rows.join(", "))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use osn_archive_core::FetchStatus;
    use osn_archive_core::League;
    use osn_archive_core::UnitRace;

    #[test]
    fn get_validates_the_integer() {
        let table = EnumTable::<FetchStatus>::new("fetch_status", "id", "name");
        assert_eq!(table.get(1).unwrap(), FetchStatus::Listed);
        assert!(matches!(
            table.get(10).unwrap_err(),
            ArchiveError::NotFound { entity: "fetch_status", .. }
        ));
    }

    #[test]
    fn get_by_name_uses_the_canonical_spelling() {
        let table = EnumTable::<League>::new("leagues", "league_id", "league_name");
        assert_eq!(table.get_by_name("SuperTitan").unwrap(), League::SuperTitan);
        assert!(table.get_by_name("supertitan").is_err());
    }

    #[test]
    fn insert_is_refused() {
        let table = EnumTable::<League>::new("leagues", "league_id", "league_name");
        assert!(matches!(
            table.insert(League::Fluffy).unwrap_err(),
            ArchiveError::EnumImmutable
        ));
    }

    #[test]
    fn seed_covers_every_variant_in_order() {
        let table = EnumTable::<FetchStatus>::new("fetch_status", "id", "name");
        let seed = table.schema_seed();
        assert!(seed.starts_with("INSERT INTO fetch_status VALUES (0, 'UNKNOWN')"));
        assert!(seed.contains("(9, 'LEGACY')"));
    }

    #[test]
    fn races_carry_their_hero_column() {
        let table = EnumTable::<UnitRace>::new("races", "race_id", "race_name")
            .with_extra_column("hero", "TEXT NOT NULL", |race| race.hero().to_string());
        assert!(table.schema_create().contains("\"hero\""));
        assert!(table.schema_seed().contains("(2, 'Adorables', 'Mobi')"));
    }
}
