// osn-archive-core/src/error.rs
// ============================================================================
// Module: Archive Errors
// Description: The closed set of error kinds shared across the archive.
// Purpose: Give every failure a structured, matchable shape.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! One enum covers the whole archive rather than a per-layer hierarchy: the
//! set of failure kinds is small, closed, and stable, and the pipeline
//! classifies errors by kind (row-local, transient, fatal) when deciding
//! whether to skip, retry, or abort.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::enums::FetchStatus;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Every failure the archive can produce.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A scalar field could not be interpreted.
    #[error("could not decode field `{field}` from {raw:?}")]
    Decode {
        /// Name of the field that failed.
        field: &'static str,
        /// Raw upstream text.
        raw: String,
    },

    /// Brace-list parsing failed or produced the wrong element count.
    #[error("malformed list in field `{field}`: {raw:?}")]
    MalformedList {
        /// Name of the field that failed.
        field: &'static str,
        /// Raw upstream text.
        raw: String,
    },

    /// The nested replay envelope failed to parse at the given layer.
    #[error("replay envelope failed to parse at layer {depth}")]
    EnvelopeLayer {
        /// Zero-based nesting depth of the failing document.
        depth: u8,
    },

    /// No row matched the requested key.
    #[error("{entity} not found for key {key:?}")]
    NotFound {
        /// Entity (table) that was queried.
        entity: &'static str,
        /// The key that missed.
        key: String,
    },

    /// An insert collided with an existing key.
    #[error("duplicate {entity} key {key:?}")]
    DuplicateKey {
        /// Entity (table) that rejected the insert.
        entity: &'static str,
        /// The colliding key.
        key: String,
    },

    /// An insert referenced a row that does not exist.
    #[error("{entity} references a missing {referenced} row")]
    ForeignKeyViolation {
        /// Entity (table) that rejected the insert.
        entity: &'static str,
        /// Referenced entity that is missing the row.
        referenced: &'static str,
    },

    /// Enumeration tables are seeded at bootstrap and never change.
    #[error("enum tables are static, insertions are not allowed")]
    EnumImmutable,

    /// The request exceeded its connect+read budget.
    #[error("request timed out")]
    NetworkTimeout,

    /// The upstream answered with a non-2xx status code.
    #[error("upstream returned HTTP status {code}")]
    NetworkStatus {
        /// HTTP status code.
        code: u16,
    },

    /// The request failed below the HTTP layer.
    #[error("network transport failure: {message}")]
    NetworkTransport {
        /// Transport-level diagnostic.
        message: String,
    },

    /// A status update would move a match backwards through the pipeline.
    #[error("status may not move backwards from {from} to {to}")]
    RetrogradeStatus {
        /// Status currently stored.
        from: FetchStatus,
        /// Status that was rejected.
        to: FetchStatus,
    },

    /// Schema creation failed; nothing else can be trusted after this.
    #[error("schema statement failed: {sql}")]
    SchemaFailure {
        /// The statement that failed.
        sql: String,
    },

    /// A filesystem operation failed.
    #[error("i/o failure at {}: {message}", path.display())]
    IoError {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying diagnostic.
        message: String,
    },
}

impl ArchiveError {
    /// Wraps a [`std::io::Error`] with the path it occurred at.
    #[must_use]
    pub fn io(path: &Path, error: &std::io::Error) -> Self {
        Self::IoError {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }

    /// True when a later run may succeed without any data changing.
    ///
    /// Network and filesystem failures are transient; the match stays at its
    /// current status and is retried by the next run.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NetworkTimeout
                | Self::NetworkStatus { .. }
                | Self::NetworkTransport { .. }
                | Self::IoError { .. }
        )
    }

    /// True when the failure is confined to a single upstream row.
    #[must_use]
    pub const fn is_row_local(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::MalformedList { .. } | Self::EnvelopeLayer { .. }
        )
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
