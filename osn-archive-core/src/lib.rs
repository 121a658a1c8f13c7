// osn-archive-core/src/lib.rs
// ============================================================================
// Module: OSN Archive Core
// Description: Domain types and codecs for the OSN match archive.
// Purpose: Define identifiers, enumerations, entities, and the upstream codec.
// Dependencies: chrono, regex, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! This crate holds the domain model shared by the store and the fetch
//! pipeline: strongly typed identifiers and enumerations, the entity types
//! persisted in the archive, and the codec that normalizes the upstream
//! service's loosely typed listing rows and nested replay envelopes.
//! Upstream payloads are untrusted; every conversion is checked and failures
//! carry the offending field and raw text.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod boolish;
pub mod enums;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod listing;
pub mod map;
pub mod matches;
pub mod player;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use boolish::Boolish;
pub use enums::Enumerated;
pub use enums::FetchStatus;
pub use enums::League;
pub use enums::PlayerColor;
pub use enums::UnitRace;
pub use envelope::UnwrappedReplay;
pub use envelope::unwrap_replay;
pub use error::ArchiveError;
pub use ids::GameId;
pub use listing::IndexPage;
pub use listing::ListingRow;
pub use map::LegacyMap;
pub use matches::ENGINE_VERSION_MIN;
pub use matches::LegacyMatch;
pub use player::Player;
pub use player::PlayerRole;
pub use player::PlayerStanding;
