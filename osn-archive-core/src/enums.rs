// osn-archive-core/src/enums.rs
// ============================================================================
// Module: Closed Enumerations
// Description: The archive's closed, stable enumerations and their contract.
// Purpose: Map small integers to named variants with validation both ways.
// Dependencies: (std only)
// ============================================================================

//! ## Overview
//! Every enumeration in the archive is closed and stable: the integer
//! discriminants are the upstream service's own encoding and will never be
//! renumbered. Zero is the UNKNOWN value except for [`PlayerColor`], which
//! the upstream starts at one. The database persists the integer alongside
//! the canonical spelling; the [`Enumerated`] contract is what the enum
//! tables in the store are generic over.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SECTION: Enumerated Contract
// ============================================================================

/// Contract satisfied by every closed enumeration in the archive.
///
/// A type implementing this maps to and from a one-byte discriminant, has a
/// canonical spelling per variant, and can enumerate all valid variants in
/// declared order.
pub trait Enumerated: Copy + Eq + fmt::Display + Sized + 'static {
    /// All valid variants in declared order.
    const VARIANTS: &'static [Self];

    /// Returns the variant for `value`, or `None` outside the declared range.
    fn from_repr(value: u8) -> Option<Self>;

    /// Returns the integer discriminant.
    fn as_repr(self) -> u8;

    /// Returns the canonical spelling persisted alongside the integer.
    fn name(self) -> &'static str;

    /// False iff the integer is outside the declared range.
    #[must_use]
    fn is_valid(value: u8) -> bool {
        Self::from_repr(value).is_some()
    }
}

// ============================================================================
// SECTION: Fetch Status
// ============================================================================

/// Progress of a match through the processing pipeline.
///
/// The ordering is the forward progression; INVALID and LEGACY are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum FetchStatus {
    /// Not yet observed.
    #[default]
    Unknown = 0,
    /// Seen on the upstream listing and recorded.
    Listed = 1,
    /// Replay payload downloaded.
    Fetched = 2,
    /// Envelope peeled to the canonical replay document.
    Unwrapped = 3,
    /// Metadata normalized into the relational schema.
    Converted = 4,
    /// Replay reduced to its canonical form.
    Canonical = 5,
    /// Invariants checked.
    Validated = 6,
    /// Included in the analytics index.
    Indexed = 7,
    /// Unrecoverable fault; terminal.
    Invalid = 8,
    /// Predates the supported engine minimum; terminal.
    Legacy = 9,
}

impl FetchStatus {
    /// True for the terminal states that permit no further transitions.
    #[must_use]
    pub const fn is_absorbing(self) -> bool {
        matches!(self, Self::Invalid | Self::Legacy)
    }

    /// True when a stored match at `self` may be updated to `next`.
    ///
    /// Transitions are monotonic: a match never moves backwards through the
    /// pipeline. Re-asserting the current status is permitted so that retried
    /// operations stay idempotent.
    #[must_use]
    pub fn permits(self, next: Self) -> bool {
        if self.is_absorbing() {
            return next == self;
        }
        next.as_repr() >= self.as_repr()
    }
}

impl Enumerated for FetchStatus {
    const VARIANTS: &'static [Self] = &[
        Self::Unknown,
        Self::Listed,
        Self::Fetched,
        Self::Unwrapped,
        Self::Converted,
        Self::Canonical,
        Self::Validated,
        Self::Indexed,
        Self::Invalid,
        Self::Legacy,
    ];

    fn from_repr(value: u8) -> Option<Self> {
        Self::VARIANTS.get(value as usize).copied()
    }

    fn as_repr(self) -> u8 {
        self as u8
    }

    fn name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Listed => "LISTED",
            Self::Fetched => "FETCHED",
            Self::Unwrapped => "UNWRAPPED",
            Self::Converted => "CONVERTED",
            Self::Canonical => "CANONICAL",
            Self::Validated => "VALIDATED",
            Self::Indexed => "INDEXED",
            Self::Invalid => "INVALID",
            Self::Legacy => "LEGACY",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SECTION: League
// ============================================================================

/// Ranked league a player competes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum League {
    /// League not known (friendly matches, missing data).
    #[default]
    Unknown = 0,
    /// Entry league.
    Fluffy = 1,
    /// Second league.
    Clever = 2,
    /// Third league.
    Gifted = 3,
    /// Fourth league.
    Master = 4,
    /// Top league.
    SuperTitan = 5,
}

impl Enumerated for League {
    const VARIANTS: &'static [Self] = &[
        Self::Unknown,
        Self::Fluffy,
        Self::Clever,
        Self::Gifted,
        Self::Master,
        Self::SuperTitan,
    ];

    fn from_repr(value: u8) -> Option<Self> {
        Self::VARIANTS.get(value as usize).copied()
    }

    fn as_repr(self) -> u8 {
        self as u8
    }

    fn name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Fluffy => "Fluffy",
            Self::Clever => "Clever",
            Self::Gifted => "Gifted",
            Self::Master => "Master",
            Self::SuperTitan => "SuperTitan",
        }
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SECTION: Unit Race
// ============================================================================

/// Squad a player fields; determines the hero unit and visual theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum UnitRace {
    /// Race not known.
    #[default]
    Unknown = 0,
    /// Feedback.
    Feedback = 1,
    /// Adorables.
    Adorables = 2,
    /// Scallywags.
    Scallywags = 3,
    /// Veggienauts.
    Veggienauts = 4,
}

impl UnitRace {
    /// Name of the hero unit unique to this race.
    ///
    /// Heroes share the enumeration ordering with their race.
    #[must_use]
    pub const fn hero(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Feedback => "Scrambler",
            Self::Adorables => "Mobi",
            Self::Scallywags => "Bombshell",
            Self::Veggienauts => "Bramble",
        }
    }
}

impl Enumerated for UnitRace {
    const VARIANTS: &'static [Self] = &[
        Self::Unknown,
        Self::Feedback,
        Self::Adorables,
        Self::Scallywags,
        Self::Veggienauts,
    ];

    fn from_repr(value: u8) -> Option<Self> {
        Self::VARIANTS.get(value as usize).copied()
    }

    fn as_repr(self) -> u8 {
        self as u8
    }

    fn name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Feedback => "Feedback",
            Self::Adorables => "Adorables",
            Self::Scallywags => "Scallywags",
            Self::Veggienauts => "Veggienauts",
        }
    }
}

impl fmt::Display for UnitRace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SECTION: Player Color
// ============================================================================

/// A player's seat in a match, doubling as turn order.
///
/// Unlike the other enumerations this one has no zero value; the upstream
/// numbers seats starting at one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PlayerColor {
    /// First seat.
    Blue = 1,
    /// Second seat.
    Red = 2,
    /// Third seat.
    Green = 3,
    /// Fourth seat.
    Gold = 4,
}

impl Enumerated for PlayerColor {
    const VARIANTS: &'static [Self] = &[Self::Blue, Self::Red, Self::Green, Self::Gold];

    fn from_repr(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Blue),
            2 => Some(Self::Red),
            3 => Some(Self::Green),
            4 => Some(Self::Gold),
            _ => None,
        }
    }

    fn as_repr(self) -> u8 {
        self as u8
    }

    fn name(self) -> &'static str {
        match self {
            Self::Blue => "BLUE",
            Self::Red => "RED",
            Self::Green => "GREEN",
            Self::Gold => "GOLD",
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
