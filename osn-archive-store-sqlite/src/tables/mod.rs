// osn-archive-store-sqlite/src/tables/mod.rs
// ============================================================================
// Module: Entity Tables
// Description: One record type and schema per persisted entity.
// Purpose: Bind the domain types to their relational rows.
// Dependencies: osn-archive-core, rusqlite
// ============================================================================

//! ## Overview
//! Each submodule pairs a thin record wrapper around a domain type with the
//! table's DDL: the CREATE TABLE statement (checks, uniques, foreign keys)
//! and the seed statements run once at bootstrap. The record implements the
//! [`Record`](crate::table::Record) contract so the generic table layer can
//! drive every query.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod maps;
pub mod matches;
pub mod players;
pub mod standings;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use maps::MapRecord;
pub use matches::MatchRecord;
pub use matches::RoleRecord;
pub use players::PlayerRecord;
pub use standings::StandingRecord;
