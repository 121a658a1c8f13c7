// osn-archive-store-sqlite/src/table.rs
// ============================================================================
// Module: Typed Tables
// Description: Generic contract binding a record type to a relational table.
// Purpose: One implementation of get/lookup/scan/insert/delete for all tables.
// Dependencies: osn-archive-core, rusqlite
// ============================================================================

//! ## Overview
//! Every entity table in the archive is an instance of [`Table`] (read-only)
//! or [`MutableTable`] (insert/delete) parameterized by its [`Record`] type.
//! A record declares its column list once, in the order used for both
//! encoding and decoding; the table derives all of its SQL from that list
//! plus the primary-key and natural-name column bindings. Statements are
//! built once at table construction and prepared once at first use via the
//! connection's statement cache.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::Row;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value;

use osn_archive_core::ArchiveError;

// ============================================================================
// SECTION: Record Contract
// ============================================================================

/// Structural contract for one row of a typed table.
///
/// `columns()` leads with the surrogate-key column; `encode` and `decode`
/// are inverses over that column order, modulo field widths.
pub trait Record: Sized {
    /// Entity label used in structured error context.
    const ENTITY: &'static str;

    /// Column names in declared order, surrogate key first.
    fn columns() -> &'static [&'static str];

    /// Encodes the record as one scalar cell per column.
    fn encode(&self) -> Vec<Value>;

    /// Decodes a record from one scalar cell per column.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Decode`] when a cell has the wrong shape.
    fn decode(cells: &[Value]) -> Result<Self, ArchiveError>;

    /// Reads a record off a live row cursor, columns in declared order.
    ///
    /// # Errors
    ///
    /// Returns the underlying SQLite error on a type mismatch.
    fn scan_row(row: &Row<'_>) -> Result<Self, rusqlite::Error>;

    /// The surrogate key; zero means not yet assigned.
    fn key(&self) -> i64;

    /// Stores the key assigned by the database at first insert.
    fn assign_key(&mut self, key: i64);
}

// ============================================================================
// SECTION: Cell Helpers
// ============================================================================

/// Decodes an integer cell.
///
/// # Errors
///
/// Returns [`ArchiveError::Decode`] when the cell is not an integer.
pub fn cell_i64(cells: &[Value], index: usize, field: &'static str) -> Result<i64, ArchiveError> {
    match cells.get(index) {
        Some(Value::Integer(value)) => Ok(*value),
        other => Err(ArchiveError::Decode {
            field,
            raw: format!("{other:?}"),
        }),
    }
}

/// Decodes a text cell.
///
/// # Errors
///
/// Returns [`ArchiveError::Decode`] when the cell is not text.
pub fn cell_text(cells: &[Value], index: usize, field: &'static str) -> Result<String, ArchiveError> {
    match cells.get(index) {
        Some(Value::Text(value)) => Ok(value.clone()),
        other => Err(ArchiveError::Decode {
            field,
            raw: format!("{other:?}"),
        }),
    }
}

/// Decodes a nullable text cell.
///
/// # Errors
///
/// Returns [`ArchiveError::Decode`] when the cell is neither text nor null.
pub fn cell_opt_text(
    cells: &[Value],
    index: usize,
    field: &'static str,
) -> Result<Option<String>, ArchiveError> {
    match cells.get(index) {
        Some(Value::Text(value)) => Ok(Some(value.clone())),
        Some(Value::Null) => Ok(None),
        other => Err(ArchiveError::Decode {
            field,
            raw: format!("{other:?}"),
        }),
    }
}

/// Decodes a boolean cell stored as an integer.
///
/// # Errors
///
/// Returns [`ArchiveError::Decode`] when the cell is not an integer.
pub fn cell_bool(cells: &[Value], index: usize, field: &'static str) -> Result<bool, ArchiveError> {
    Ok(cell_i64(cells, index, field)? != 0)
}

// ============================================================================
// SECTION: Error Mapping
// ============================================================================

/// Extended SQLite result code for a PRIMARY KEY collision.
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
/// Extended SQLite result code for a UNIQUE collision.
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;
/// Extended SQLite result code for a FOREIGN KEY violation.
const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;

/// Maps a SQLite failure to the archive's structured error kinds.
pub(crate) fn map_sqlite_error(
    entity: &'static str,
    key: impl ToString,
    error: &rusqlite::Error,
) -> ArchiveError {
    match error {
        rusqlite::Error::QueryReturnedNoRows => ArchiveError::NotFound {
            entity,
            key: key.to_string(),
        },
        rusqlite::Error::SqliteFailure(failure, _) => match failure.extended_code {
            SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE => ArchiveError::DuplicateKey {
                entity,
                key: key.to_string(),
            },
            SQLITE_CONSTRAINT_FOREIGNKEY => ArchiveError::ForeignKeyViolation {
                entity,
                referenced: "required",
            },
            _ => ArchiveError::SchemaFailure {
                sql: format!("{entity}: {error}"),
            },
        },
        _ => ArchiveError::SchemaFailure {
            sql: format!("{entity}: {error}"),
        },
    }
}

// ============================================================================
// SECTION: Table
// ============================================================================

/// Shared handle to the one open database connection.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// A read-only typed table bound to a record type.
pub struct Table<R: Record> {
    /// Shared connection handle.
    conn: SharedConnection,
    /// Table name.
    name: &'static str,
    /// CREATE TABLE statement.
    create_sql: &'static str,
    /// Seed INSERTs and auxiliary CREATE INDEX statements.
    seed_sql: Vec<String>,
    /// SELECT by primary key, built once at construction.
    select_sql: String,
    /// SELECT by natural name; empty when the table has no name column.
    select_by_name_sql: String,
    /// SELECT of every row.
    select_all_sql: String,
    /// Record type marker.
    _marker: PhantomData<R>,
}

impl<R: Record> Table<R> {
    /// Binds a record type to a table, its key, and its natural-name column.
    ///
    /// `primary` defaults to the implicit rowid when the key column is not a
    /// declared column; `name_col` enables [`Table::get_by_name`].
    #[must_use]
    pub fn new(
        conn: SharedConnection,
        name: &'static str,
        primary: &'static str,
        name_col: Option<&'static str>,
        create_sql: &'static str,
        seed_sql: Vec<String>,
    ) -> Self {
        let column_list = R::columns().join(", ");
        let select_sql = format!("SELECT {column_list} FROM {name} WHERE {primary} = ?1");
        let select_by_name_sql = name_col
            .map(|col| format!("SELECT {column_list} FROM {name} WHERE {col} = ?1"))
            .unwrap_or_default();
        let select_all_sql = format!("SELECT {column_list} FROM {name} ORDER BY {primary}");
        Self {
            conn,
            name,
            create_sql,
            seed_sql,
            select_sql,
            select_by_name_sql,
            select_all_sql,
            _marker: PhantomData,
        }
    }

    /// The table name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The CREATE TABLE statement for this table.
    #[must_use]
    pub const fn schema_create(&self) -> &'static str {
        self.create_sql
    }

    /// Seed INSERTs and index statements run after creation.
    #[must_use]
    pub fn schema_seed(&self) -> &[String] {
        &self.seed_sql
    }

    /// Locks the shared connection.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        // A poisoned mutex means another thread died mid-statement; the
        // database itself is still consistent (transactions), so continue.
        self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Fetches the record with the given primary key.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] when no row matches.
    pub fn get(&self, key: i64) -> Result<R, ArchiveError> {
        let conn = self.lock();
        self.get_in(&conn, key)
    }

    /// Fetches by primary key on an already-locked connection.
    pub(crate) fn get_in(&self, conn: &Connection, key: i64) -> Result<R, ArchiveError> {
        let mut stmt = conn
            .prepare_cached(&self.select_sql)
            .map_err(|err| map_sqlite_error(R::ENTITY, key, &err))?;
        stmt.query_row(params![key], |row| R::scan_row(row))
            .map_err(|err| map_sqlite_error(R::ENTITY, key, &err))
    }

    /// Fetches the record with the given natural name.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] when no row matches or the table
    /// has no natural-name column.
    pub fn get_by_name(&self, name: &str) -> Result<R, ArchiveError> {
        let conn = self.lock();
        self.get_by_name_in(&conn, name)
    }

    /// Fetches by natural name on an already-locked connection.
    pub(crate) fn get_by_name_in(&self, conn: &Connection, name: &str) -> Result<R, ArchiveError> {
        if self.select_by_name_sql.is_empty() {
            return Err(ArchiveError::NotFound {
                entity: R::ENTITY,
                key: name.to_string(),
            });
        }
        let mut stmt = conn
            .prepare_cached(&self.select_by_name_sql)
            .map_err(|err| map_sqlite_error(R::ENTITY, name, &err))?;
        stmt.query_row(params![name], |row| R::scan_row(row))
            .map_err(|err| map_sqlite_error(R::ENTITY, name, &err))
    }

    /// Streams every row through `visit`, in primary-key order.
    ///
    /// The cursor is released when this returns, so visitors should be
    /// quick; anything long-running belongs on a collected copy.
    ///
    /// # Errors
    ///
    /// Propagates the first error from the cursor or the visitor.
    pub fn scan_all(
        &self,
        mut visit: impl FnMut(R) -> Result<(), ArchiveError>,
    ) -> Result<(), ArchiveError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached(&self.select_all_sql)
            .map_err(|err| map_sqlite_error(R::ENTITY, "*", &err))?;
        let rows = stmt
            .query_map([], |row| R::scan_row(row))
            .map_err(|err| map_sqlite_error(R::ENTITY, "*", &err))?;
        for row in rows {
            let record = row.map_err(|err| map_sqlite_error(R::ENTITY, "*", &err))?;
            visit(record)?;
        }
        Ok(())
    }

    /// Collects every row into a vector, in primary-key order.
    ///
    /// # Errors
    ///
    /// Propagates the first cursor error.
    pub fn select_all(&self) -> Result<Vec<R>, ArchiveError> {
        let mut records = Vec::new();
        self.scan_all(|record| {
            records.push(record);
            Ok(())
        })?;
        Ok(records)
    }
}

// ============================================================================
// SECTION: MutableTable
// ============================================================================

/// A typed table that additionally accepts inserts and deletes.
pub struct MutableTable<R: Record> {
    /// The read side.
    table: Table<R>,
    /// Primary-key column used by delete.
    primary: &'static str,
    /// INSERT omitting the key column (key assigned by the database).
    insert_sql: String,
    /// INSERT including the key column (caller-provided key).
    insert_keyed_sql: String,
}

impl<R: Record> MutableTable<R> {
    /// Binds a record type to a mutable table.
    #[must_use]
    pub fn new(
        conn: SharedConnection,
        name: &'static str,
        primary: &'static str,
        name_col: Option<&'static str>,
        create_sql: &'static str,
        seed_sql: Vec<String>,
    ) -> Self {
        let columns = R::columns();
        let unkeyed = &columns[1..];
        let insert_sql = format!(
            "INSERT INTO {name} ({}) VALUES ({})",
            unkeyed.join(", "),
            placeholders(unkeyed.len()),
        );
        let keyed_columns = {
            // The key column participates explicitly when the caller fixed it.
            let mut list = vec![primary];
            list.extend_from_slice(unkeyed);
            list.join(", ")
        };
        let insert_keyed_sql = format!(
            "INSERT INTO {name} ({keyed_columns}) VALUES ({})",
            placeholders(columns.len()),
        );
        Self {
            table: Table::new(conn, name, primary, name_col, create_sql, seed_sql),
            primary,
            insert_sql,
            insert_keyed_sql,
        }
    }

    /// Inserts a record.
    ///
    /// A zero surrogate key is populated with the database-assigned row id;
    /// a non-zero key that already exists fails with a duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::DuplicateKey`] on a key or unique-constraint
    /// collision and [`ArchiveError::ForeignKeyViolation`] on a missing
    /// referenced row.
    pub fn insert(&self, record: &mut R) -> Result<(), ArchiveError> {
        let conn = self.lock();
        self.insert_in(&conn, record)
    }

    /// Inserts on an already-locked connection (used inside transactions).
    pub(crate) fn insert_in(&self, conn: &Connection, record: &mut R) -> Result<(), ArchiveError> {
        let cells = record.encode();
        if record.key() == 0 {
            let mut stmt = conn
                .prepare_cached(&self.insert_sql)
                .map_err(|err| map_sqlite_error(R::ENTITY, record.key(), &err))?;
            stmt.execute(params_from_iter(cells.into_iter().skip(1)))
                .map_err(|err| map_sqlite_error(R::ENTITY, record.key(), &err))?;
            record.assign_key(conn.last_insert_rowid());
        } else {
            let mut stmt = conn
                .prepare_cached(&self.insert_keyed_sql)
                .map_err(|err| map_sqlite_error(R::ENTITY, record.key(), &err))?;
            stmt.execute(params_from_iter(cells))
                .map_err(|err| map_sqlite_error(R::ENTITY, record.key(), &err))?;
        }
        Ok(())
    }

    /// Deletes the record with the given primary key.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotFound`] when no row matched.
    pub fn delete(&self, key: i64) -> Result<(), ArchiveError> {
        let conn = self.lock();
        let sql = format!("DELETE FROM {} WHERE {} = ?1", self.table.name, self.primary);
        let affected = conn
            .prepare_cached(&sql)
            .and_then(|mut stmt| stmt.execute(params![key]))
            .map_err(|err| map_sqlite_error(R::ENTITY, key, &err))?;
        if affected == 0 {
            return Err(ArchiveError::NotFound {
                entity: R::ENTITY,
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

impl<R: Record> std::ops::Deref for MutableTable<R> {
    type Target = Table<R>;

    fn deref(&self) -> &Self::Target {
        &self.table
    }
}

/// Builds a `?1, ?2, ...` placeholder list.
fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|ordinal| format!("?{ordinal}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
