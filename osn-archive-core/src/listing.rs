// osn-archive-core/src/listing.rs
// ============================================================================
// Module: Listing Codec
// Description: Normalize the upstream listing's string-typed rows.
// Purpose: Turn loosely typed listing rows into validated LegacyMatch values.
// Dependencies: chrono, regex, serde
// ============================================================================

//! ## Overview
//! The upstream listing delivers every field as a string, several of them
//! with game-type-dependent semantics, and the player columns as
//! brace-wrapped comma-separated lists where elements containing commas or
//! spaces are double-quote-wrapped. This module holds the row type for both
//! the live listing and the legacy TSV dump, the brace-list grammar, and the
//! normalization into [`LegacyMatch`]. Nothing is coerced silently: a field
//! that fails its shape yields an error naming the field and the raw text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;

use crate::boolish::Boolish;
use crate::enums::Enumerated;
use crate::enums::FetchStatus;
use crate::enums::League;
use crate::enums::PlayerColor;
use crate::enums::UnitRace;
use crate::error::ArchiveError;
use crate::ids::GameId;
use crate::matches::LegacyMatch;
use crate::player::Player;
use crate::player::PlayerRole;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed layout of the listing's `created` column, interpreted as UTC.
pub const CREATED_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// SECTION: Row Types
// ============================================================================

/// One row of the listing, every field still in its upstream string form.
///
/// The same shape covers the live index response and the legacy TSV dump;
/// the TSV lacks `isleaguematch`, which stays `None` there.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingRow {
    /// Upstream sequential index; absent in the TSV.
    #[serde(default, alias = "id")]
    pub index: String,
    /// The match identifier hash.
    #[serde(rename = "gameid", alias = "game_id")]
    pub game_id: String,
    /// Game type digit; encodes player count and competitiveness.
    #[serde(rename = "game_type", alias = "gametype")]
    pub game_type: String,
    /// League-match flag, only present on the live listing.
    #[serde(default)]
    pub isleaguematch: Option<Boolish>,
    /// Creation timestamp under [`CREATED_LAYOUT`].
    pub created: String,
    /// Season ordinal.
    pub season: String,
    /// Engine (runtime) version.
    pub engine: String,
    /// Map enumeration value.
    #[serde(rename = "map_id", alias = "mapid")]
    pub map_id: String,
    /// Map display name; redundant with the map table.
    #[serde(default, alias = "map_title")]
    pub map_name: String,
    /// Number of turns played.
    pub turn_count: String,
    /// Brace-list of player display names.
    pub player_names: String,
    /// Brace-list of player row ids.
    pub player_ids: String,
    /// Brace-list of league enumeration values; may be empty.
    #[serde(default)]
    pub player_leagues: String,
    /// Brace-list of race enumeration values; may be empty.
    #[serde(default)]
    pub player_races: String,
    /// Whether the replay was already fetched by the legacy tooling.
    #[serde(default)]
    pub replay_fetched: String,
    /// Winning player's row id.
    #[serde(default)]
    pub player_winner: String,
    /// Row id of the player who moved first.
    #[serde(default)]
    pub first_playerid: String,
}

/// One decoded page of the listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexPage {
    /// Total match count; only returned on the first page.
    #[serde(default)]
    pub total: Option<String>,
    /// The page's listing rows.
    #[serde(default)]
    pub replays: Vec<ListingRow>,
    /// Server timestamp of the response.
    #[serde(default, rename = "ts")]
    pub when: Option<String>,
}

impl IndexPage {
    /// Parses the `total` count when the server returned one.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Decode`] when the count is present but junk.
    pub fn total_count(&self) -> Result<Option<u64>, ArchiveError> {
        match &self.total {
            None => Ok(None),
            Some(raw) => parse_int::<u64>("total", raw).map(Some),
        }
    }
}

// ============================================================================
// SECTION: Scalar Parsing
// ============================================================================

/// Parses an integer field with an explicit width check.
fn parse_int<T: FromStr>(field: &'static str, raw: &str) -> Result<T, ArchiveError> {
    raw.trim().parse::<T>().map_err(|_| ArchiveError::Decode {
        field,
        raw: raw.to_string(),
    })
}

/// Parses the `created` column under the fixed UTC layout.
fn parse_created(raw: &str) -> Result<DateTime<Utc>, ArchiveError> {
    NaiveDateTime::parse_from_str(raw, CREATED_LAYOUT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ArchiveError::Decode {
            field: "created",
            raw: raw.to_string(),
        })
}

// ============================================================================
// SECTION: Brace Lists
// ============================================================================

/// One element: a quoted form, or an unquoted form ended by `,` or `}`.
fn list_item_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"^("[^"]+"|[^",}][^,}]*)[,}]"#).expect("item grammar"))
}

/// Splits a brace-wrapped comma-separated list into its elements.
///
/// Elements containing commas or spaces arrive double-quote-wrapped; the
/// wrapping quotes are removed. `"{}"` is the empty list.
///
/// # Errors
///
/// Returns [`ArchiveError::MalformedList`] when the input is not a brace
/// list or an element fails the grammar.
pub fn split_list(field: &'static str, raw: &str) -> Result<Vec<String>, ArchiveError> {
    let malformed = || ArchiveError::MalformedList {
        field,
        raw: raw.to_string(),
    };

    let body = raw
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(malformed)?;
    if body.is_empty() {
        return Ok(Vec::new());
    }

    // Re-attach the closing brace so the final element terminates like the
    // others, then consume one element at a time from the front.
    let mut rest = format!("{body}}}");
    let mut items = Vec::new();
    while !rest.is_empty() {
        let (item, consumed) = {
            let captures = list_item_pattern().captures(&rest).ok_or_else(malformed)?;
            let matched = captures.get(0).ok_or_else(malformed)?;
            let text = captures.get(1).ok_or_else(malformed)?.as_str();
            let text = text
                .strip_prefix('"')
                .and_then(|inner| inner.strip_suffix('"'))
                .unwrap_or(text);
            (text.to_string(), matched.end())
        };
        items.push(item);
        rest = rest.split_off(consumed);
    }
    Ok(items)
}

/// Splits a brace list and checks it has exactly `expected` elements.
fn split_counted(
    field: &'static str,
    raw: &str,
    expected: usize,
) -> Result<Vec<String>, ArchiveError> {
    let items = split_list(field, raw)?;
    if items.len() != expected {
        return Err(ArchiveError::MalformedList {
            field,
            raw: raw.to_string(),
        });
    }
    Ok(items)
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

impl ListingRow {
    /// Derives the player count from the game-type digit.
    ///
    /// Types 1..3 seat two players, 4..5 seat four, and 0 marks a deprecated
    /// game type with no seats.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Decode`] for a non-digit or out-of-range type.
    pub fn player_count(&self) -> Result<u8, ArchiveError> {
        match parse_int::<u8>("game_type", &self.game_type)? {
            0 => Ok(0),
            1..=3 => Ok(2),
            4 | 5 => Ok(4),
            _ => Err(ArchiveError::Decode {
                field: "game_type",
                raw: self.game_type.clone(),
            }),
        }
    }

    /// Whether the match counted for league standings.
    ///
    /// The live listing states this outright; the TSV omits the column and
    /// falls back to the rule that odd game types are league matches.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Decode`] when the game-type digit is junk.
    pub fn competitive(&self) -> Result<bool, ArchiveError> {
        match self.isleaguematch {
            Some(flag) => Ok(flag.get()),
            None => Ok(parse_int::<u8>("game_type", &self.game_type)? % 2 == 1),
        }
    }

    /// Per-player league values, for recording standings.
    ///
    /// An empty `player_leagues` column yields UNKNOWN for every seat.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::MalformedList`] on a bad list or count, or
    /// [`ArchiveError::Decode`] on an out-of-range league value.
    pub fn leagues(&self) -> Result<Vec<League>, ArchiveError> {
        let count = usize::from(self.player_count()?);
        if self.player_leagues.is_empty() {
            return Ok(vec![League::Unknown; count]);
        }
        split_counted("player_leagues", &self.player_leagues, count)?
            .iter()
            .map(|raw| {
                let value = parse_int::<u8>("player_leagues", raw)?;
                League::from_repr(value).ok_or(ArchiveError::Decode {
                    field: "player_leagues",
                    raw: raw.clone(),
                })
            })
            .collect()
    }

    /// Normalizes the row into a [`LegacyMatch`] at status LISTED.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Decode`] or [`ArchiveError::MalformedList`]
    /// naming the first field that fails its shape.
    pub fn normalize(&self) -> Result<LegacyMatch, ArchiveError> {
        let count = usize::from(self.player_count()?);
        let competitive = self.competitive()?;
        let start_time = parse_created(&self.created)?;
        let season = parse_int::<u16>("season", &self.season)?;
        let map_id = parse_int::<u8>("map_id", &self.map_id)?;
        let turn_count = parse_int::<u32>("turn_count", &self.turn_count)?;
        let version = parse_int::<i64>("engine", &self.engine)?;
        let match_index = if self.index.is_empty() {
            0
        } else {
            parse_int::<i64>("id", &self.index)?
        };
        if !self.first_playerid.is_empty() {
            parse_int::<i64>("first_playerid", &self.first_playerid)?;
        }
        if !self.player_winner.is_empty() {
            parse_int::<i64>("player_winner", &self.player_winner)?;
        }

        let names = split_counted("player_names", &self.player_names, count)?;
        let ids = split_counted("player_ids", &self.player_ids, count)?;
        let races = if self.player_races.is_empty() {
            vec![UnitRace::Unknown; count]
        } else {
            split_counted("player_races", &self.player_races, count)?
                .iter()
                .map(|raw| {
                    let value = parse_int::<u8>("player_races", raw)?;
                    UnitRace::from_repr(value).ok_or(ArchiveError::Decode {
                        field: "player_races",
                        raw: raw.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut players = Vec::with_capacity(count);
        for (seat, ((name, id), race)) in names.iter().zip(&ids).zip(&races).enumerate() {
            let row_id = parse_int::<i64>("player_ids", id)?;
            let turn_order =
                PlayerColor::from_repr(seat as u8 + 1).ok_or(ArchiveError::Decode {
                    field: "player_ids",
                    raw: id.clone(),
                })?;
            players.push(PlayerRole::new(
                Player::new(row_id, name.clone()),
                turn_order,
                *race,
            ));
        }

        Ok(LegacyMatch {
            match_index,
            match_hash: GameId::new(self.game_id.clone()),
            competitive,
            season,
            start_time,
            map_id,
            turn_count,
            version,
            status: FetchStatus::Listed,
            players,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn split_list_handles_plain_elements() {
        assert_eq!(
            split_list("t", "{a,b}").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn split_list_unwraps_quoted_elements() {
        assert_eq!(
            split_list("t", "{\"a,b\",c}").unwrap(),
            vec!["a,b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn split_list_accepts_the_empty_list() {
        assert!(split_list("t", "{}").unwrap().is_empty());
    }

    #[test]
    fn split_list_rejects_malformed_input() {
        for raw in ["", "a,b", "{a,b", "a,b}", "{a,,b}"] {
            let err = split_list("t", raw).unwrap_err();
            assert!(matches!(err, ArchiveError::MalformedList { field: "t", .. }), "{raw}");
        }
    }

    #[test]
    fn game_type_maps_to_player_count() {
        let mut row = ListingRow::default();
        for (game_type, expected) in [("0", 0), ("1", 2), ("2", 2), ("3", 2), ("4", 4), ("5", 4)] {
            row.game_type = game_type.to_string();
            assert_eq!(row.player_count().unwrap(), expected, "type {game_type}");
        }
        row.game_type = "6".to_string();
        assert!(row.player_count().is_err());
        row.game_type = "x".to_string();
        assert!(row.player_count().is_err());
    }

    #[test]
    fn odd_game_types_are_competitive_when_flag_is_absent() {
        let mut row = ListingRow::default();
        row.game_type = "3".to_string();
        assert!(row.competitive().unwrap());
        row.game_type = "2".to_string();
        assert!(!row.competitive().unwrap());
        row.isleaguematch = Some(Boolish(true));
        assert!(row.competitive().unwrap());
    }

    fn sample_row() -> ListingRow {
        ListingRow {
            game_id: "ag5vHDA".to_string(),
            game_type: "2".to_string(),
            isleaguematch: Some(Boolish(true)),
            created: "2012-08-05 15:14:31".to_string(),
            season: "1".to_string(),
            engine: "1603".to_string(),
            map_id: "7".to_string(),
            turn_count: "25".to_string(),
            player_names: "{Alvendor,Lenoxe}".to_string(),
            player_ids: "{2,3}".to_string(),
            ..ListingRow::default()
        }
    }

    #[test]
    fn normalize_produces_the_expected_match() {
        let matched = sample_row().normalize().unwrap();
        assert!(matched.competitive);
        assert_eq!(matched.season, 1);
        assert_eq!(
            matched.start_time,
            Utc.with_ymd_and_hms(2012, 8, 5, 15, 14, 31).unwrap()
        );
        assert_eq!(matched.map_id, 7);
        assert_eq!(matched.turn_count, 25);
        assert_eq!(matched.version, 1603);
        assert_eq!(matched.status, FetchStatus::Listed);
        assert_eq!(matched.players.len(), 2);
        assert_eq!(matched.players[0].turn_order, PlayerColor::Blue);
        assert_eq!(matched.players[0].player.row_id, 2);
        assert_eq!(matched.players[0].player.name, "Alvendor");
        assert_eq!(matched.players[1].turn_order, PlayerColor::Red);
        assert_eq!(matched.players[1].player.row_id, 3);
        assert_eq!(matched.players[1].player.name, "Lenoxe");
    }

    #[test]
    fn normalize_rejects_a_short_player_list() {
        let mut row = sample_row();
        row.player_ids = "{2}".to_string();
        let err = row.normalize().unwrap_err();
        assert!(matches!(err, ArchiveError::MalformedList { field: "player_ids", .. }));
    }

    #[test]
    fn normalize_rejects_a_bad_timestamp() {
        let mut row = sample_row();
        row.created = "2012/08/05".to_string();
        let err = row.normalize().unwrap_err();
        assert!(matches!(err, ArchiveError::Decode { field: "created", .. }));
    }

    #[test]
    fn normalize_rejects_numeric_overflow() {
        let mut row = sample_row();
        row.map_id = "300".to_string();
        let err = row.normalize().unwrap_err();
        assert!(matches!(err, ArchiveError::Decode { field: "map_id", .. }));
    }

    #[test]
    fn empty_league_column_yields_unknowns() {
        let leagues = sample_row().leagues().unwrap();
        assert_eq!(leagues, vec![League::Unknown, League::Unknown]);
    }

    #[test]
    fn league_column_is_validated() {
        let mut row = sample_row();
        row.player_leagues = "{5,9}".to_string();
        let err = row.leagues().unwrap_err();
        assert!(matches!(err, ArchiveError::Decode { field: "player_leagues", .. }));
        row.player_leagues = "{5,4}".to_string();
        assert_eq!(row.leagues().unwrap(), vec![League::SuperTitan, League::Master]);
    }

    #[test]
    fn index_page_decodes_from_live_json() {
        let json = r#"{
            "total": "143299",
            "replays": [{
                "id": "5",
                "gameid": "ag5vHDA",
                "game_type": "2",
                "isleaguematch": "1",
                "created": "2012-08-05 15:14:31",
                "season": "1",
                "engine": "1603",
                "map_id": "7",
                "turn_count": "25",
                "player_names": "{Alvendor,Lenoxe}",
                "player_ids": "{2,3}"
            }],
            "ts": "2024-01-01 00:00:00"
        }"#;
        let page: IndexPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_count().unwrap(), Some(143_299));
        assert_eq!(page.replays.len(), 1);
        let matched = page.replays[0].normalize().unwrap();
        assert_eq!(matched.match_index, 5);
        assert!(matched.competitive);
    }
}
