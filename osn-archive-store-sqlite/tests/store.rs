// osn-archive-store-sqlite/tests/store.rs
// ============================================================================
// Module: Store Tests
// Description: Validate bootstrap, typed tables, and the status machine.
// Purpose: Exercise the store end to end against a temporary database file.
// Dependencies: osn-archive-store-sqlite, osn-archive-core, tempfile, chrono
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed archive store: schema bootstrap
//! with seed data, transactional match+role inserts, duplicate and
//! retrograde rejection, the standings chain, and cache behavior.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use chrono::TimeZone;
use chrono::Utc;
use tempfile::TempDir;

use osn_archive_core::ArchiveError;
use osn_archive_core::ENGINE_VERSION_MIN;
use osn_archive_core::Enumerated;
use osn_archive_core::FetchStatus;
use osn_archive_core::GameId;
use osn_archive_core::League;
use osn_archive_core::LegacyMatch;
use osn_archive_core::Player;
use osn_archive_core::PlayerColor;
use osn_archive_core::PlayerRole;
use osn_archive_core::PlayerStanding;
use osn_archive_core::UnitRace;
use osn_archive_store_sqlite::Store;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn fresh_store() -> (TempDir, Store) {
    let temp = TempDir::new().unwrap();
    let store = Store::open(&temp.path().join("archive.db")).expect("open store");
    store.create_and_populate().expect("bootstrap schema");
    (temp, store)
}

fn sample_match(game_id: &str, players: &[(i64, &str)]) -> LegacyMatch {
    let roles = players
        .iter()
        .enumerate()
        .map(|(seat, (row_id, name))| {
            PlayerRole::new(
                Player::new(*row_id, *name),
                PlayerColor::from_repr(seat as u8 + 1).expect("seat in range"),
                UnitRace::Scallywags,
            )
        })
        .collect();
    LegacyMatch {
        match_index: 0,
        match_hash: GameId::new(game_id),
        competitive: true,
        season: 1,
        start_time: Utc.with_ymd_and_hms(2012, 8, 5, 15, 14, 31).unwrap(),
        map_id: 7,
        turn_count: 25,
        version: ENGINE_VERSION_MIN,
        status: FetchStatus::Listed,
        players: roles,
    }
}

/// Finds the stored role id for a player within a stored match.
fn role_id_for(store: &Store, match_index: i64, player_id: i64) -> i64 {
    let mut found = 0;
    store
        .roles()
        .scan_all(|role| {
            if role.match_id == match_index && role.player_id == player_id {
                found = role.role_id;
            }
            Ok(())
        })
        .expect("roles scan");
    assert!(found > 0, "role for player {player_id}");
    found
}

// ============================================================================
// SECTION: Bootstrap
// ============================================================================

#[test]
fn bootstrap_seeds_the_map_catalog() {
    let (_tmp, store) = fresh_store();

    let machination = store.map_by_id(1).unwrap();
    assert_eq!(machination.name, "Machination");
    assert_eq!(machination.role_count, 4);

    let deprecated = store.map_by_id(2).unwrap();
    assert_eq!(deprecated.role_count, 0);
    assert!(deprecated.is_deprecated());
}

#[test]
fn bootstrap_seeds_the_unknown_player() {
    let (_tmp, store) = fresh_store();
    let unknown = store.player(0).unwrap();
    assert_eq!(unknown.name, "UNKNOWN");
    assert!(unknown.gcid.is_none());
}

#[test]
fn map_lookups_work_by_name_and_filter_deprecated() {
    let (_tmp, store) = fresh_store();

    let glitch = store.map_by_name("Glitch").unwrap();
    assert_eq!(glitch.map_id, 4);

    let playable = store.playable_maps().unwrap();
    assert_eq!(playable.len(), 17);
    assert!(playable.iter().all(|map| map.role_count > 0));

    assert!(matches!(
        store.map_by_id(42).unwrap_err(),
        ArchiveError::NotFound { entity: "maps", .. }
    ));
}

#[test]
fn bootstrap_twice_is_a_schema_failure() {
    let (_tmp, store) = fresh_store();
    assert!(matches!(
        store.create_and_populate().unwrap_err(),
        ArchiveError::SchemaFailure { .. }
    ));
}

// ============================================================================
// SECTION: Enum Tables
// ============================================================================

#[test]
fn enum_tables_answer_without_the_database() {
    let (_tmp, store) = fresh_store();
    assert_eq!(store.fetch_statuses().get(1).unwrap(), FetchStatus::Listed);
    assert_eq!(store.leagues().get_by_name("Gifted").unwrap(), League::Gifted);
    assert_eq!(store.races().get(3).unwrap(), UnitRace::Scallywags);
    assert!(matches!(
        store.races().insert(UnitRace::Feedback).unwrap_err(),
        ArchiveError::EnumImmutable
    ));
}

// ============================================================================
// SECTION: Matches
// ============================================================================

#[test]
fn insert_match_stores_roles_transactionally() {
    let (_tmp, store) = fresh_store();
    let mut matched = sample_match("G1", &[(2, "Alvendor"), (3, "Lenoxe")]);
    store.insert_match(&mut matched).unwrap();
    assert!(matched.match_index > 0);

    let stored = store.match_by_hash(&GameId::new("G1")).unwrap();
    assert_eq!(stored.status, FetchStatus::Listed);
    assert_eq!(stored.players.len(), 2);
    assert_eq!(stored.players[0].turn_order, PlayerColor::Blue);
    assert_eq!(stored.players[0].player.name, "Alvendor");
    assert_eq!(stored.players[1].turn_order, PlayerColor::Red);
    assert_eq!(stored.players[1].player.row_id, 3);
}

#[test]
fn four_player_matches_seat_four_distinct_turn_orders() {
    let (_tmp, store) = fresh_store();
    let mut matched = sample_match(
        "G4P",
        &[(2, "Alvendor"), (3, "Lenoxe"), (4, "Syvan"), (5, "Norville")],
    );
    matched.map_id = 1; // Machination seats four.
    store.insert_match(&mut matched).unwrap();

    let stored = store.match_by_hash(&GameId::new("G4P")).unwrap();
    assert_eq!(stored.players.len(), 4);
    let orders: Vec<u8> = stored
        .players
        .iter()
        .map(|role| role.turn_order.as_repr())
        .collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
}

#[test]
fn duplicate_game_id_is_rejected_and_leaves_the_row_unchanged() {
    let (_tmp, store) = fresh_store();
    let mut first = sample_match("G2", &[(2, "Alvendor"), (3, "Lenoxe")]);
    store.insert_match(&mut first).unwrap();

    let mut second = sample_match("G2", &[(2, "Alvendor"), (3, "Lenoxe")]);
    second.turn_count = 99;
    let err = store.insert_match(&mut second).unwrap_err();
    assert!(matches!(err, ArchiveError::DuplicateKey { entity: "matches", .. }));

    let stored = store.match_by_hash(&GameId::new("G2")).unwrap();
    assert_eq!(stored.turn_count, 25);
}

#[test]
fn failed_role_insert_rolls_back_the_match_row() {
    let (_tmp, store) = fresh_store();
    let mut matched = sample_match("G3", &[(2, "Alvendor"), (3, "Lenoxe")]);
    // Both seats claim the same turn order; the unique constraint fails.
    matched.players[1].turn_order = PlayerColor::Blue;
    assert!(store.insert_match(&mut matched).is_err());

    assert!(matches!(
        store.match_by_hash(&GameId::new("G3")).unwrap_err(),
        ArchiveError::NotFound { entity: "matches", .. }
    ));
}

#[test]
fn status_updates_are_monotonic() {
    let (_tmp, store) = fresh_store();
    let mut matched = sample_match("G4", &[(2, "Alvendor"), (3, "Lenoxe")]);
    store.insert_match(&mut matched).unwrap();
    let id = GameId::new("G4");

    store.update_match_status(&id, FetchStatus::Fetched).unwrap();
    let err = store.update_match_status(&id, FetchStatus::Listed).unwrap_err();
    match err {
        ArchiveError::RetrogradeStatus { from, to } => {
            assert_eq!(from, FetchStatus::Fetched);
            assert_eq!(to, FetchStatus::Listed);
        }
        other => panic!("expected retrograde rejection, got {other}"),
    }

    let stored = store.match_by_hash(&id).unwrap();
    assert_eq!(stored.status, FetchStatus::Fetched);
}

#[test]
fn unknown_status_may_become_listed() {
    let (_tmp, store) = fresh_store();
    let mut matched = sample_match("G5", &[(2, "Alvendor"), (3, "Lenoxe")]);
    matched.status = FetchStatus::Unknown;
    store.insert_match(&mut matched).unwrap();
    let id = GameId::new("G5");
    store.update_match_status(&id, FetchStatus::Listed).unwrap();
    assert_eq!(store.match_by_hash(&id).unwrap().status, FetchStatus::Listed);
}

#[test]
fn sub_minimum_engine_versions_read_back_as_legacy() {
    let (_tmp, store) = fresh_store();
    let mut matched = sample_match("G6", &[(2, "Alvendor"), (3, "Lenoxe")]);
    matched.version = ENGINE_VERSION_MIN - 100;
    store.insert_match(&mut matched).unwrap();

    let id = GameId::new("G6");
    let stored = store.match_by_hash(&id).unwrap();
    assert_eq!(stored.status, FetchStatus::Legacy);

    // The reset is persisted, not recomputed per read.
    let hashes = store.match_hashes_at(FetchStatus::Legacy).unwrap();
    assert_eq!(hashes, vec![id]);
}

#[test]
fn match_hashes_at_returns_listing_order() {
    let (_tmp, store) = fresh_store();
    for game_id in ["A", "B", "C"] {
        let mut matched = sample_match(game_id, &[(2, "Alvendor"), (3, "Lenoxe")]);
        store.insert_match(&mut matched).unwrap();
    }
    store.update_match_status(&GameId::new("B"), FetchStatus::Fetched).unwrap();

    let listed = store.match_hashes_at(FetchStatus::Listed).unwrap();
    assert_eq!(listed, vec![GameId::new("A"), GameId::new("C")]);
}

#[test]
fn deleting_a_match_cascades_to_its_roles() {
    let (_tmp, store) = fresh_store();
    let mut matched = sample_match("G7", &[(2, "Alvendor"), (3, "Lenoxe")]);
    store.insert_match(&mut matched).unwrap();

    store.matches().delete(matched.match_index).unwrap();
    let stored = store.match_by_hash(&GameId::new("G7"));
    assert!(matches!(stored, Err(ArchiveError::NotFound { .. })));
}

// ============================================================================
// SECTION: Players
// ============================================================================

#[test]
fn player_inserts_are_idempotent() {
    let (_tmp, store) = fresh_store();
    let player = Player::new(9, "Syvan");
    store.insert_player_if_absent(&player).unwrap();
    store.insert_player_if_absent(&player).unwrap();

    assert_eq!(store.player(9).unwrap().name, "Syvan");
    assert_eq!(store.player_by_name("Syvan").unwrap().row_id, 9);
}

#[test]
fn cached_player_matches_the_stored_row() {
    let (_tmp, store) = fresh_store();
    let player = Player::new(9, "Syvan");
    store.insert_player_if_absent(&player).unwrap();

    // First read populates the LRU, second is served from it.
    let first = store.player(9).unwrap();
    let second = store.player(9).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, store.players().get(9).unwrap().0);
}

#[test]
fn gcid_upgrades_exactly_once() {
    let (_tmp, store) = fresh_store();
    store.insert_player_if_absent(&Player::new(9, "Syvan")).unwrap();

    store.assign_gcid(9, "G:1234").unwrap();
    assert_eq!(store.player(9).unwrap().gcid.as_deref(), Some("G:1234"));

    // Re-asserting the same value is fine; changing it is not.
    store.assign_gcid(9, "G:1234").unwrap();
    assert!(matches!(
        store.assign_gcid(9, "G:9999").unwrap_err(),
        ArchiveError::DuplicateKey { entity: "players", .. }
    ));
    assert!(matches!(
        store.assign_gcid(404, "G:0000").unwrap_err(),
        ArchiveError::NotFound { .. }
    ));
}

#[test]
fn scan_all_streams_players_in_key_order() {
    let (_tmp, store) = fresh_store();
    store.insert_player_if_absent(&Player::new(5, "Early")).unwrap();
    store.insert_player_if_absent(&Player::new(2, "Earlier")).unwrap();

    let mut ids = Vec::new();
    store
        .players()
        .scan_all(|record| {
            ids.push(record.0.row_id);
            Ok(())
        })
        .unwrap();
    assert_eq!(ids, vec![0, 2, 5]);
}

// ============================================================================
// SECTION: Standings
// ============================================================================

#[test]
fn standings_chain_links_until_to_the_next_after() {
    let (_tmp, store) = fresh_store();

    let mut first = sample_match("S1", &[(2, "Alvendor"), (3, "Lenoxe")]);
    store.insert_match(&mut first).unwrap();
    let mut second = sample_match("S2", &[(2, "Alvendor"), (4, "Syvan")]);
    store.insert_match(&mut second).unwrap();

    let first_role = role_id_for(&store, first.match_index, 2);
    let second_role = role_id_for(&store, second.match_index, 2);

    let early = PlayerStanding::new(League::Clever, 40, 800, 10).unwrap();
    let later = PlayerStanding::new(League::Clever, 38, 812, 12).unwrap();
    store.record_standing(first_role, early).unwrap();
    store.record_standing(second_role, later).unwrap();

    let chain = store.standings_for_player(2).unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].after_role, first_role);
    assert_eq!(chain[0].until_role, Some(second_role));
    assert_eq!(chain[1].after_role, second_role);
    assert_eq!(chain[1].until_role, None);
    assert_eq!(chain[1].standing.points_before(), 800);
}
