// osn-archive-store-sqlite/src/store.rs
// ============================================================================
// Module: Archive Store
// Description: The one open database handle and its composed typed tables.
// Purpose: Bootstrap the schema, enforce the status machine, serve lookups.
// Dependencies: osn-archive-core, rusqlite, lru, tracing
// ============================================================================

//! ## Overview
//! The [`Store`] owns the single SQLite handle for the archive and one typed
//! table per entity. Bootstrap creates and seeds every table in dependency
//! order and is fatal on any SQL error, since no other invariant holds
//! without the schema. Match status updates are monotonic, multi-row writes
//! (a match together with its roles, a standing together with closing its
//! predecessor) are transactional, and the map and player caches are
//! read-through and write-through over the database rows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use lru::LruCache;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use tracing::debug;
use tracing::info;

use osn_archive_core::ArchiveError;
use osn_archive_core::Enumerated;
use osn_archive_core::FetchStatus;
use osn_archive_core::GameId;
use osn_archive_core::League;
use osn_archive_core::LegacyMap;
use osn_archive_core::LegacyMatch;
use osn_archive_core::Player;
use osn_archive_core::PlayerRole;
use osn_archive_core::PlayerStanding;
use osn_archive_core::UnitRace;

use crate::enum_table::EnumTable;
use crate::table::MutableTable;
use crate::table::Record;
use crate::table::SharedConnection;
use crate::table::Table;
use crate::table::map_sqlite_error;
use crate::tables::MapRecord;
use crate::tables::MatchRecord;
use crate::tables::PlayerRecord;
use crate::tables::RoleRecord;
use crate::tables::StandingRecord;
use crate::tables::maps::maps_table;
use crate::tables::matches::matches_table;
use crate::tables::matches::roles_table;
use crate::tables::players::players_table;
use crate::tables::standings::standings_table;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Busy timeout for the shared connection (ms).
const BUSY_TIMEOUT_MS: u64 = 5_000;
/// Capacity of the per-connection prepared statement cache.
const STATEMENT_CACHE_CAPACITY: usize = 64;
/// Capacity of the bounded player LRU.
const PLAYER_CACHE_CAPACITY: usize = 256;

// ============================================================================
// SECTION: Map Cache
// ============================================================================

/// Full map catalog keyed by id and by name, loaded lazily on first access.
struct MapCache {
    by_id: HashMap<u8, LegacyMap>,
    by_name: HashMap<String, u8>,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// The archive store: one database handle, one typed table per entity.
pub struct Store {
    /// Shared connection; every table holds a clone.
    conn: SharedConnection,
    /// Fetch status enumeration table.
    status: EnumTable<FetchStatus>,
    /// League enumeration table.
    leagues: EnumTable<League>,
    /// Race enumeration table (carries the hero column).
    races: EnumTable<UnitRace>,
    /// Read-only map catalog.
    maps: Table<MapRecord>,
    /// Player rows.
    players: MutableTable<PlayerRecord>,
    /// Match metadata rows.
    matches: MutableTable<MatchRecord>,
    /// Per-match role rows.
    roles: MutableTable<RoleRecord>,
    /// Ranked standings rows.
    standings: MutableTable<StandingRecord>,
    /// Lazy full catalog cache.
    map_cache: Mutex<Option<MapCache>>,
    /// Bounded cache of recently looked-up players.
    player_cache: Mutex<LruCache<i64, Player>>,
}

impl Store {
    /// Opens the database at `path` and wires the typed tables.
    ///
    /// Does not create the schema; see [`Store::create_and_populate`].
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::IoError`] when the file cannot be opened and
    /// [`ArchiveError::SchemaFailure`] when the connection pragmas fail.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let conn = Connection::open(path).map_err(|err| ArchiveError::IoError {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))
            .map_err(|err| ArchiveError::SchemaFailure {
                sql: format!("busy_timeout: {err}"),
            })?;
        conn.execute_batch("PRAGMA journal_mode = wal;")
            .map_err(|err| ArchiveError::SchemaFailure {
                sql: format!("PRAGMA journal_mode = wal; -- {err}"),
            })?;
        conn.execute_batch("PRAGMA foreign_keys = on;")
            .map_err(|err| ArchiveError::SchemaFailure {
                sql: format!("PRAGMA foreign_keys = on; -- {err}"),
            })?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);

        let conn: SharedConnection = Arc::new(Mutex::new(conn));
        debug!(path = %path.display(), "opened archive database");
        Ok(Self {
            status: EnumTable::new("fetch_status", "id", "name"),
            leagues: EnumTable::new("leagues", "league_id", "league_name"),
            races: EnumTable::new("races", "race_id", "race_name")
                .with_extra_column("hero", "TEXT NOT NULL", |race| race.hero().to_string()),
            maps: maps_table(Arc::clone(&conn)),
            players: players_table(Arc::clone(&conn)),
            matches: matches_table(Arc::clone(&conn)),
            roles: roles_table(Arc::clone(&conn)),
            standings: standings_table(Arc::clone(&conn)),
            map_cache: Mutex::new(None),
            player_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(PLAYER_CACHE_CAPACITY).expect("nonzero capacity"),
            )),
            conn,
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Creates and seeds every table in dependency order.
    ///
    /// Intended for a fresh database; schema correctness is a pre-condition
    /// of everything else, so any SQL error here is fatal to the run.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::SchemaFailure`] carrying the statement that
    /// failed.
    pub fn create_and_populate(&self) -> Result<(), ArchiveError> {
        let conn = self.lock();
        let run = |sql: &str| -> Result<(), ArchiveError> {
            conn.execute_batch(sql).map_err(|err| {
                ArchiveError::SchemaFailure {
                    sql: format!("{sql}\n-- {err}"),
                }
            })
        };

        for (name, create, seed) in [
            (self.status.name(), self.status.schema_create(), vec![self.status.schema_seed()]),
            (self.leagues.name(), self.leagues.schema_create(), vec![self.leagues.schema_seed()]),
            (self.races.name(), self.races.schema_create(), vec![self.races.schema_seed()]),
        ] {
            info!(table = name, "creating enum table");
            run(&create)?;
            for statement in seed {
                run(&statement)?;
            }
        }

        info!(table = self.maps.name(), "creating table");
        run(self.maps.schema_create())?;
        for statement in self.maps.schema_seed() {
            run(statement)?;
        }
        info!(table = self.players.name(), "creating table");
        run(self.players.schema_create())?;
        for statement in self.players.schema_seed() {
            run(statement)?;
        }
        info!(table = self.matches.name(), "creating table");
        run(self.matches.schema_create())?;
        for statement in self.matches.schema_seed() {
            run(statement)?;
        }
        info!(table = self.roles.name(), "creating table");
        run(self.roles.schema_create())?;
        for statement in self.roles.schema_seed() {
            run(statement)?;
        }
        info!(table = self.standings.name(), "creating table");
        run(self.standings.schema_create())?;
        for statement in self.standings.schema_seed() {
            run(statement)?;
        }
        Ok(())
    }

    /// Closes the handle; prepared statements and cursors go with it.
    pub fn close(self) {
        drop(self);
    }

    // ------------------------------------------------------------------
    // Typed accessors
    // ------------------------------------------------------------------

    /// The fetch-status enumeration table.
    #[must_use]
    pub const fn fetch_statuses(&self) -> &EnumTable<FetchStatus> {
        &self.status
    }

    /// The league enumeration table.
    #[must_use]
    pub const fn leagues(&self) -> &EnumTable<League> {
        &self.leagues
    }

    /// The race enumeration table.
    #[must_use]
    pub const fn races(&self) -> &EnumTable<UnitRace> {
        &self.races
    }

    /// The players table.
    #[must_use]
    pub const fn players(&self) -> &MutableTable<PlayerRecord> {
        &self.players
    }

    /// The matches table.
    #[must_use]
    pub const fn matches(&self) -> &MutableTable<MatchRecord> {
        &self.matches
    }

    /// The roles table.
    #[must_use]
    pub const fn roles(&self) -> &MutableTable<RoleRecord> {
        &self.roles
    }

    /// The standings table.
    #[must_use]
    pub const fn standings(&self) -> &MutableTable<StandingRecord> {
        &self.standings
    }

    // ------------------------------------------------------------------
    // Maps
    // ------------------------------------------------------------------

    /// Loads the full catalog into the cache on first access.
    fn with_map_cache<T>(
        &self,
        read: impl FnOnce(&MapCache) -> Result<T, ArchiveError>,
    ) -> Result<T, ArchiveError> {
        let mut guard = self
            .map_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.is_none() {
            let mut by_id = HashMap::new();
            let mut by_name = HashMap::new();
            self.maps.scan_all(|record| {
                by_name.insert(record.0.name.clone(), record.0.map_id);
                by_id.insert(record.0.map_id, record.0);
                Ok(())
            })?;
            *guard = Some(MapCache { by_id, by_name });
        }
        read(guard.as_ref().expect("cache loaded above"))
    }

    /// Fetches a map by its enumeration value.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] for an unassigned id.
    pub fn map_by_id(&self, map_id: u8) -> Result<LegacyMap, ArchiveError> {
        self.with_map_cache(|cache| {
            cache.by_id.get(&map_id).cloned().ok_or(ArchiveError::NotFound {
                entity: "maps",
                key: map_id.to_string(),
            })
        })
    }

    /// Fetches a map by display name.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] for an unrecognized name.
    pub fn map_by_name(&self, name: &str) -> Result<LegacyMap, ArchiveError> {
        self.with_map_cache(|cache| {
            cache
                .by_name
                .get(name)
                .and_then(|id| cache.by_id.get(id))
                .cloned()
                .ok_or(ArchiveError::NotFound {
                    entity: "maps",
                    key: name.to_string(),
                })
        })
    }

    /// Every map still accepting matches (role count above zero), by id.
    ///
    /// # Errors
    ///
    /// Propagates a cursor failure from the first cache load.
    pub fn playable_maps(&self) -> Result<Vec<LegacyMap>, ArchiveError> {
        self.with_map_cache(|cache| {
            let mut maps: Vec<LegacyMap> = cache
                .by_id
                .values()
                .filter(|map| !map.is_deprecated())
                .cloned()
                .collect();
            maps.sort_by_key(|map| map.map_id);
            Ok(maps)
        })
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Fetches a player by row id through the bounded LRU.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] when the id is unknown.
    pub fn player(&self, row_id: i64) -> Result<Player, ArchiveError> {
        {
            let mut cache = self
                .player_cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(player) = cache.get(&row_id) {
                return Ok(player.clone());
            }
        }
        let record = self.players.get(row_id)?;
        self.cache_player(&record.0);
        Ok(record.0)
    }

    /// Fetches a player by display name.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] when the name is unknown.
    pub fn player_by_name(&self, name: &str) -> Result<Player, ArchiveError> {
        let record = self.players.get_by_name(name)?;
        self.cache_player(&record.0);
        Ok(record.0)
    }

    /// Write-through into the player LRU.
    fn cache_player(&self, player: &Player) {
        self.player_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .put(player.row_id, player.clone());
    }

    /// Inserts a player if the row id is not already present.
    ///
    /// # Errors
    ///
    /// Propagates any failure other than a duplicate key.
    pub fn insert_player_if_absent(&self, player: &Player) -> Result<(), ArchiveError> {
        let mut record = PlayerRecord(player.clone());
        match self.players.insert(&mut record) {
            Ok(()) => {
                self.cache_player(player);
                Ok(())
            }
            Err(ArchiveError::DuplicateKey { .. }) => Ok(()),
            Err(other) => Err(other),
        }
    }

    /// Upgrades a player's GCID from NULL to a value, exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] for an unknown player and
    /// [`ArchiveError::DuplicateKey`] when a different GCID is already set.
    pub fn assign_gcid(&self, row_id: i64, gcid: &str) -> Result<(), ArchiveError> {
        let affected = {
            let conn = self.lock();
            let mut stmt = conn
                .prepare_cached("UPDATE players SET gcid = ?1 WHERE id = ?2 AND gcid IS NULL")
                .map_err(|err| map_sqlite_error("players", row_id, &err))?;
            stmt.execute(params![gcid, row_id])
                .map_err(|err| map_sqlite_error("players", row_id, &err))?
        };
        if affected == 0 {
            let existing = self.players.get(row_id)?;
            if existing.0.gcid.as_deref() != Some(gcid) {
                return Err(ArchiveError::DuplicateKey {
                    entity: "players",
                    key: gcid.to_string(),
                });
            }
            return Ok(());
        }
        // Refresh the cache from the stored row.
        let record = self.players.get(row_id)?;
        self.cache_player(&record.0);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Matches
    // ------------------------------------------------------------------

    /// Inserts a match together with all of its roles in one transaction.
    ///
    /// Participating players are inserted idempotently first. On success the
    /// match's surrogate index and each role's match id are populated.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::DuplicateKey`] keyed by the GameId when the
    /// match already exists; the transaction is rolled back and nothing is
    /// written.
    pub fn insert_match(&self, matched: &mut LegacyMatch) -> Result<(), ArchiveError> {
        let hash = matched.match_hash.clone();
        {
            let conn = self.lock();
            let tx = conn
                .unchecked_transaction()
                .map_err(|err| map_sqlite_error("matches", hash.as_str(), &err))?;

            for role in &matched.players {
                let mut record = PlayerRecord(role.player.clone());
                match self.players.insert_in(&tx, &mut record) {
                    Ok(()) | Err(ArchiveError::DuplicateKey { .. }) => {}
                    Err(other) => return Err(other),
                }
            }

            let mut record = MatchRecord::new(matched.clone());
            self.matches.insert_in(&tx, &mut record).map_err(|err| match err {
                ArchiveError::DuplicateKey { entity, .. } => ArchiveError::DuplicateKey {
                    entity,
                    key: hash.as_str().to_string(),
                },
                other => other,
            })?;
            matched.match_index = record.key();

            for role in &mut matched.players {
                role.match_id = matched.match_index;
                let mut row = RoleRecord {
                    role_id: 0,
                    match_id: role.match_id,
                    player_id: role.player.row_id,
                    turn_order: role.turn_order,
                    race: role.race,
                    base_theme: role.base_theme,
                };
                self.roles.insert_in(&tx, &mut row)?;
            }

            tx.commit()
                .map_err(|err| map_sqlite_error("matches", hash.as_str(), &err))?;
        }
        for role in &matched.players {
            self.cache_player(&role.player);
        }
        debug!(gameid = %hash, index = matched.match_index, "stored match");
        Ok(())
    }

    /// Advances a match's status, rejecting retrograde transitions.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] for an unknown GameId and
    /// [`ArchiveError::RetrogradeStatus`] when the update would move the
    /// match backwards; the stored row is left unchanged.
    pub fn update_match_status(
        &self,
        game_id: &GameId,
        status: FetchStatus,
    ) -> Result<(), ArchiveError> {
        let conn = self.lock();
        let current: Option<u8> = conn
            .prepare_cached("SELECT fetch_status FROM matches WHERE match_hash = ?1")
            .and_then(|mut stmt| {
                stmt.query_row(params![game_id.as_str()], |row| row.get(0)).optional()
            })
            .map_err(|err| map_sqlite_error("matches", game_id.as_str(), &err))?;
        let raw = current.ok_or(ArchiveError::NotFound {
            entity: "matches",
            key: game_id.as_str().to_string(),
        })?;
        let current = FetchStatus::from_repr(raw).ok_or(ArchiveError::Decode {
            field: "fetch_status",
            raw: raw.to_string(),
        })?;
        if !current.permits(status) {
            return Err(ArchiveError::RetrogradeStatus {
                from: current,
                to: status,
            });
        }
        conn.prepare_cached("UPDATE matches SET fetch_status = ?1 WHERE match_hash = ?2")
            .and_then(|mut stmt| stmt.execute(params![status.as_repr(), game_id.as_str()]))
            .map_err(|err| map_sqlite_error("matches", game_id.as_str(), &err))?;
        debug!(gameid = %game_id, from = %current, to = %status, "status advanced");
        Ok(())
    }

    /// Fetches a match with its roles, ordered by turn order.
    ///
    /// A stored engine version below the supported minimum resets the status
    /// to LEGACY (persisted) so callers skip further processing.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] for an unknown GameId.
    pub fn match_by_hash(&self, game_id: &GameId) -> Result<LegacyMatch, ArchiveError> {
        let mut matched = {
            let conn = self.lock();
            let record = self.matches.get_by_name_in(&conn, game_id.as_str())?;
            let mut matched = record.0;

            let mut stmt = conn
                .prepare_cached(
                    "SELECT r.role_id, r.match_id, r.player_id, r.turn_order, r.race, r.base_theme, \
                            p.gcid, p.name \
                     FROM roles r JOIN players p ON p.id = r.player_id \
                     WHERE r.match_id = ?1 ORDER BY r.turn_order",
                )
                .map_err(|err| map_sqlite_error("roles", game_id.as_str(), &err))?;
            let roles = stmt
                .query_map(params![matched.match_index], |row| {
                    let role = RoleRecord::scan_row(row)?;
                    let gcid: Option<String> = row.get(6)?;
                    let name: String = row.get(7)?;
                    Ok(PlayerRole {
                        match_id: role.match_id,
                        player: Player {
                            row_id: role.player_id,
                            gcid,
                            name,
                        },
                        turn_order: role.turn_order,
                        race: role.race,
                        base_theme: role.base_theme,
                    })
                })
                .map_err(|err| map_sqlite_error("roles", game_id.as_str(), &err))?;
            for role in roles {
                matched
                    .players
                    .push(role.map_err(|err| map_sqlite_error("roles", game_id.as_str(), &err))?);
            }
            matched
        };

        if matched.is_legacy_version()
            && matched.status != FetchStatus::Legacy
            && matched.status.permits(FetchStatus::Legacy)
        {
            self.update_match_status(game_id, FetchStatus::Legacy)?;
            matched.status = FetchStatus::Legacy;
        }
        Ok(matched)
    }

    /// Every GameId currently parked at `status`, in insertion order.
    ///
    /// # Errors
    ///
    /// Propagates cursor failures.
    pub fn match_hashes_at(&self, status: FetchStatus) -> Result<Vec<GameId>, ArchiveError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT match_hash FROM matches WHERE fetch_status = ?1 ORDER BY match_index",
            )
            .map_err(|err| map_sqlite_error("matches", status.name(), &err))?;
        let rows = stmt
            .query_map(params![status.as_repr()], |row| row.get::<_, String>(0))
            .map_err(|err| map_sqlite_error("matches", status.name(), &err))?;
        let mut hashes = Vec::new();
        for row in rows {
            hashes.push(GameId::new(
                row.map_err(|err| map_sqlite_error("matches", status.name(), &err))?,
            ));
        }
        Ok(hashes)
    }

    // ------------------------------------------------------------------
    // Standings
    // ------------------------------------------------------------------

    /// Appends a standing after `role_id`, closing the player's open one.
    ///
    /// Both writes happen in one transaction: the previous open interval for
    /// the same player gets `until_role = role_id`, then the new row is
    /// inserted open.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::ForeignKeyViolation`] for an unknown role id.
    pub fn record_standing(
        &self,
        role_id: i64,
        standing: PlayerStanding,
    ) -> Result<i64, ArchiveError> {
        let conn = self.lock();
        let tx = conn
            .unchecked_transaction()
            .map_err(|err| map_sqlite_error("standings", role_id, &err))?;

        let open: Option<i64> = tx
            .prepare_cached(
                "SELECT s.standing_id FROM standings s \
                 JOIN roles prev ON prev.role_id = s.after_role \
                 JOIN roles cur ON cur.player_id = prev.player_id \
                 WHERE cur.role_id = ?1 AND s.until_role IS NULL",
            )
            .and_then(|mut stmt| stmt.query_row(params![role_id], |row| row.get(0)).optional())
            .map_err(|err| map_sqlite_error("standings", role_id, &err))?;
        if let Some(standing_id) = open {
            tx.prepare_cached("UPDATE standings SET until_role = ?1 WHERE standing_id = ?2")
                .and_then(|mut stmt| stmt.execute(params![role_id, standing_id]))
                .map_err(|err| map_sqlite_error("standings", role_id, &err))?;
        }

        let mut record = StandingRecord {
            standing_id: 0,
            after_role: role_id,
            until_role: None,
            standing,
        };
        self.standings.insert_in(&tx, &mut record)?;
        tx.commit()
            .map_err(|err| map_sqlite_error("standings", role_id, &err))?;
        Ok(record.standing_id)
    }

    /// A player's standings chain ordered by appearance.
    ///
    /// # Errors
    ///
    /// Propagates cursor failures.
    pub fn standings_for_player(&self, player_id: i64) -> Result<Vec<StandingRecord>, ArchiveError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT s.standing_id, s.after_role, s.until_role, s.player_league, \
                        s.player_rank, s.player_points, s.player_delta \
                 FROM standings s JOIN roles r ON r.role_id = s.after_role \
                 WHERE r.player_id = ?1 ORDER BY s.standing_id",
            )
            .map_err(|err| map_sqlite_error("standings", player_id, &err))?;
        let rows = stmt
            .query_map(params![player_id], |row| StandingRecord::scan_row(row))
            .map_err(|err| map_sqlite_error("standings", player_id, &err))?;
        let mut chain = Vec::new();
        for row in rows {
            chain.push(row.map_err(|err| map_sqlite_error("standings", player_id, &err))?);
        }
        Ok(chain)
    }
}
