// osn-archive-core/src/boolish.rs
// ============================================================================
// Module: Lenient Booleans
// Description: Boolean value decoded permissively from upstream shapes.
// Purpose: Accept bool, integer, string, or missing; always encode a bool.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The upstream service emits boolean-like fields in four shapes: a native
//! boolean, an integer (zero is false), a string (`""` and `"0"` are false),
//! or the field is missing entirely (false). [`Boolish`] decodes all four
//! and nothing else; encoding is always the native boolean form. It stays a
//! dedicated type rather than `bool` so the permissive decode never leaks
//! past the codec boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Visitor;

// ============================================================================
// SECTION: Boolish
// ============================================================================

/// Boolean decoded permissively from upstream, encoded strictly as a bool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Boolish(pub bool);

impl Boolish {
    /// Returns the contained boolean.
    #[must_use]
    pub const fn get(self) -> bool {
        self.0
    }

    /// Applies the string rule: `""` and `"0"` are false, anything else true.
    ///
    /// Used for TSV cells and form values, which arrive outside serde.
    #[must_use]
    pub fn from_str_lenient(raw: &str) -> Self {
        Self(!(raw.is_empty() || raw == "0"))
    }
}

impl From<bool> for Boolish {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl From<Boolish> for bool {
    fn from(value: Boolish) -> Self {
        value.0
    }
}

impl fmt::Display for Boolish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SECTION: Serde
// ============================================================================

impl Serialize for Boolish {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bool(self.0)
    }
}

struct BoolishVisitor;

impl<'de> Visitor<'de> for BoolishVisitor {
    type Value = Boolish;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a boolean, integer, string, or null")
    }

    fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Boolish(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Boolish(value != 0))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Boolish(value != 0))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Boolish::from_str_lenient(value))
    }

    // Explicit null in the payload behaves like a missing field.
    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Boolish(false))
    }
}

impl<'de> Deserialize<'de> for Boolish {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(BoolishVisitor)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
