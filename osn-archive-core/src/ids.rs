// osn-archive-core/src/ids.rs
// ============================================================================
// Module: Game Identifiers
// Description: The upstream service's opaque match identifier.
// Purpose: Provide a typed GameId with prefix-stripped display form.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every match shares a 48-character identifier prefix issued by the upstream
//! host. Equality and storage use the full string; [`GameId::short_id`]
//! strips the prefix for filesystem-safe replay filenames and display.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: GameId
// ============================================================================

/// Prefix shared by every real match identifier.
pub const COMMON_PREFIX: &str = "ahRzfm91dHdpdHRlcnNnYW1lLWhyZHIVCxIIR2FtZVJvb20Y";

/// Opaque identifier for a match, as issued by the upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Creates a new identifier from its full string form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the full identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier with the common prefix removed.
    ///
    /// Identifiers that do not carry the prefix are returned unchanged, so
    /// short forms read back from filenames stay stable under this call.
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.0.strip_prefix(COMMON_PREFIX).unwrap_or(&self.0)
    }

    /// True for the sentinel empty identifier.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_id())
    }
}

impl From<&str> for GameId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GameId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
