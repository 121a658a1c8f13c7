// osn-archive-core/src/envelope.rs
// ============================================================================
// Module: Replay Envelope
// Description: Peel the upstream's nested string-in-string replay envelope.
// Purpose: Extract the GameId and canonical replay bytes from a download.
// Dependencies: serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! The upstream delivers a replay as JSON wrapping a string holding JSON
//! whose single field is again a string holding the final replay document.
//! The layers are decoded sequentially, never flattened, so a failure names
//! the exact layer that broke: 0 for the outer response, 1 for the first
//! nested document, 2 for the innermost replay. The room identifier on the
//! outer wrapper is cross-checked against the GameId inside the payload;
//! on mismatch the inner value wins and a warning is logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::boolish::Boolish;
use crate::error::ArchiveError;
use crate::ids::GameId;

// ============================================================================
// SECTION: Wire Shapes
// ============================================================================

/// Outermost response document.
#[derive(Debug, Deserialize)]
struct ReplayResponse {
    /// The envelope proper.
    #[serde(rename = "viewResponse")]
    view_response: ViewResponse,
}

/// The envelope: room bookkeeping plus the first nested document.
#[derive(Debug, Deserialize)]
struct ViewResponse {
    /// JSON text of the middle layer.
    #[serde(rename = "gameState")]
    game_state: String,
    /// Whether the upstream located the room.
    #[serde(rename = "foundRoom", default)]
    found_room: Boolish,
    /// Room identifier; should equal the payload's own GameId.
    #[serde(default)]
    room: Option<String>,
}

/// Middle layer; its single field is the innermost document's text.
#[derive(Debug, Deserialize)]
struct GameStateDoc {
    /// JSON text of the final replay document.
    #[serde(rename = "gameState")]
    game_state: String,
}

// ============================================================================
// SECTION: Unwrap
// ============================================================================

/// Result of peeling the envelope: the id and the canonical replay bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwrappedReplay {
    /// The match this replay belongs to, per the innermost document.
    pub game_id: GameId,
    /// The replay document re-serialized in canonical form.
    pub canonical: Vec<u8>,
}

/// Peels the two string-in-string layers off a downloaded replay.
///
/// # Errors
///
/// Returns [`ArchiveError::EnvelopeLayer`] naming the layer that failed to
/// parse, or [`ArchiveError::Decode`] when the innermost document carries no
/// usable `gameid`.
pub fn unwrap_replay(bytes: &[u8]) -> Result<UnwrappedReplay, ArchiveError> {
    let outer: ReplayResponse =
        serde_json::from_slice(bytes).map_err(|_| ArchiveError::EnvelopeLayer { depth: 0 })?;
    let envelope = outer.view_response;
    if !envelope.found_room.get() {
        warn!(room = envelope.room.as_deref(), "upstream reports room not found");
    }

    let middle: GameStateDoc = serde_json::from_str(&envelope.game_state)
        .map_err(|_| ArchiveError::EnvelopeLayer { depth: 1 })?;

    let replay: Value = serde_json::from_str(&middle.game_state)
        .map_err(|_| ArchiveError::EnvelopeLayer { depth: 2 })?;

    let game_id = replay
        .get("gameid")
        .and_then(Value::as_str)
        .map(GameId::new)
        .ok_or(ArchiveError::Decode {
            field: "gameid",
            raw: String::new(),
        })?;

    // The inner payload is authoritative; the wrapper's room id is only a
    // cross-check.
    if let Some(room) = &envelope.room {
        if room != game_id.as_str() {
            warn!(room = %room, gameid = %game_id.as_str(), "envelope room does not match payload gameid");
        }
    }

    let canonical = serde_json::to_vec(&replay).map_err(|_| ArchiveError::EnvelopeLayer { depth: 2 })?;
    Ok(UnwrappedReplay { game_id, canonical })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_the_nested_envelope() {
        let bytes = br#"{"viewResponse":{"gameState":"{\"gameState\":\"{\\\"gameid\\\":\\\"X\\\"}\"}","foundRoom":true,"room":"X"}}"#;
        let unwrapped = unwrap_replay(bytes).unwrap();
        assert_eq!(unwrapped.game_id, GameId::new("X"));
        assert_eq!(unwrapped.canonical, br#"{"gameid":"X"}"#.to_vec());
    }

    #[test]
    fn inner_gameid_wins_over_the_room() {
        let bytes = br#"{"viewResponse":{"gameState":"{\"gameState\":\"{\\\"gameid\\\":\\\"INNER\\\"}\"}","foundRoom":true,"room":"OUTER"}}"#;
        let unwrapped = unwrap_replay(bytes).unwrap();
        assert_eq!(unwrapped.game_id, GameId::new("INNER"));
    }

    #[test]
    fn reports_the_outer_layer() {
        let err = unwrap_replay(b"not json").unwrap_err();
        assert!(matches!(err, ArchiveError::EnvelopeLayer { depth: 0 }));
    }

    #[test]
    fn reports_the_middle_layer() {
        let bytes = br#"{"viewResponse":{"gameState":"not json","foundRoom":true,"room":"X"}}"#;
        let err = unwrap_replay(bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::EnvelopeLayer { depth: 1 }));
    }

    #[test]
    fn reports_the_innermost_layer() {
        let bytes = br#"{"viewResponse":{"gameState":"{\"gameState\":\"not json\"}","foundRoom":true,"room":"X"}}"#;
        let err = unwrap_replay(bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::EnvelopeLayer { depth: 2 }));
    }

    #[test]
    fn requires_a_gameid_in_the_payload() {
        let bytes = br#"{"viewResponse":{"gameState":"{\"gameState\":\"{\\\"turns\\\":[]}\"}","foundRoom":true,"room":"X"}}"#;
        let err = unwrap_replay(bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::Decode { field: "gameid", .. }));
    }
}
