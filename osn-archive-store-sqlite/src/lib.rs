// osn-archive-store-sqlite/src/lib.rs
// ============================================================================
// Module: OSN Archive SQLite Store
// Description: Typed-table layer and the durable store over one SQLite file.
// Purpose: Map strongly typed domain records to relational rows.
// Dependencies: osn-archive-core, rusqlite, lru, chrono, tracing
// ============================================================================

//! ## Overview
//! One embedded SQLite database holds the whole archive: enumeration tables,
//! the static map catalog, players, matches, per-match roles, and ranked
//! standings. A generic typed-table contract maps each record type to its
//! rows; the [`Store`] composes one typed table per entity, bootstraps the
//! schema with its seed data, and enforces the monotonic match status
//! machine. All access flows through a single shared connection handle.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod enum_table;
pub mod store;
pub mod table;
pub mod tables;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use enum_table::EnumTable;
pub use store::Store;
pub use table::MutableTable;
pub use table::Record;
pub use table::Table;
pub use tables::MapRecord;
pub use tables::MatchRecord;
pub use tables::PlayerRecord;
pub use tables::RoleRecord;
pub use tables::StandingRecord;
