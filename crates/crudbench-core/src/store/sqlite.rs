//! SQLite backends.
//!
//! One `records (id, name)` table serves both relational backends. With
//! `AUTOINCREMENT` SQLite assigns identities itself and never reuses one,
//! even after the newest row is deleted. Without it, identities come from a
//! counter row in a `sequences` table.

use std::path::Path;
use std::rc::Rc;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::debug;

use super::RecordStore;
use crate::error::Error;
use crate::record::{Record, RecordId};
use crate::sequence::AtomicCounter;

/// Name of the counter row used by the records table.
pub const RECORDS_SEQUENCE: &str = "records";

/// SQLite record table.
pub struct SqliteStore {
    conn: Rc<Connection>,
    autoincrement: bool,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>, autoincrement: bool) -> Result<Self, Error> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            Error::Connection(format!("failed to open {}: {}", path.display(), e))
        })?;
        Ok(Self::from_connection(conn, autoincrement))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(autoincrement: bool) -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Connection(format!("failed to open in-memory database: {}", e)))?;
        Ok(Self::from_connection(conn, autoincrement))
    }

    fn from_connection(conn: Connection, autoincrement: bool) -> Self {
        Self {
            conn: Rc::new(conn),
            autoincrement,
        }
    }

    /// Whether the table uses SQLite's native `AUTOINCREMENT`.
    pub fn is_autoincrement(&self) -> bool {
        self.autoincrement
    }

    /// A counter row sharing this store's connection.
    pub fn counter(&self, name: impl Into<String>) -> SqliteCounter {
        SqliteCounter {
            conn: Rc::clone(&self.conn),
            name: name.into(),
        }
    }
}

impl RecordStore for SqliteStore {
    fn ensure_schema(&self) -> Result<(), Error> {
        if self.autoincrement {
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS records (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL
                );
                "#,
            )?;
        } else {
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS records (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS sequences (
                    name TEXT PRIMARY KEY,
                    value INTEGER NOT NULL
                );
                "#,
            )?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM records", [])?;
        if self.autoincrement {
            // Restart the AUTOINCREMENT watermark at 1
            tx.execute("DELETE FROM sqlite_sequence WHERE name = 'records'", [])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn append(&self, values: &[String]) -> Result<(), Error> {
        if !self.autoincrement {
            return Err(Error::Write(
                "records table has no AUTOINCREMENT column".to_string(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached("INSERT INTO records (name) VALUES (?1)")?;
            for value in values {
                stmt.execute([value]).map_err(write_error)?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write(&self, records: &[(RecordId, &str)]) -> Result<(), Error> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached("INSERT INTO records (id, name) VALUES (?1, ?2)")?;
            for (id, value) in records {
                stmt.execute(params![sql_id(*id)?, value])
                    .map_err(write_error)?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn scan(&self) -> Result<Vec<Record>, Error> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, name FROM records ORDER BY id")?;
        let rows = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get(&self, id: RecordId) -> Result<Option<Record>, Error> {
        let record = self
            .conn
            .prepare_cached("SELECT id, name FROM records WHERE id = ?1")?
            .query_row([sql_id(id)?], row_to_record)
            .optional()?;
        Ok(record)
    }

    fn replace(&self, id: RecordId, value: &str) -> Result<(), Error> {
        self.conn
            .prepare_cached("UPDATE records SET name = ?1 WHERE id = ?2")?
            .execute(params![value, sql_id(id)?])?;
        Ok(())
    }

    fn remove(&self, id: RecordId) -> Result<(), Error> {
        self.conn
            .prepare_cached("DELETE FROM records WHERE id = ?1")?
            .execute([sql_id(id)?])?;
        Ok(())
    }

    fn max_id(&self) -> Result<Option<RecordId>, Error> {
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(id) FROM records", [], |row| row.get(0))?;
        max.map(record_id).transpose()
    }

    fn filter_contains(&self, needle: &str) -> Result<Vec<Record>, Error> {
        // instr() matches literally, unlike LIKE with its % and _ wildcards
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, name FROM records WHERE instr(name, ?1) > 0 ORDER BY id")?;
        let rows = stmt
            .query_map([needle], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Counter row in the `sequences` table.
///
/// Increments run as a single upsert so concurrent processes sharing the
/// database file cannot lose updates.
pub struct SqliteCounter {
    conn: Rc<Connection>,
    name: String,
}

impl AtomicCounter for SqliteCounter {
    fn increment(
        &self,
        delta: u64,
        seed: &mut dyn FnMut() -> Result<u64, Error>,
    ) -> Result<u64, Error> {
        let base = match self.load()? {
            Some(_) => 0,
            None => {
                let floor = seed()?;
                debug!(counter = %self.name, floor, "seeding sequence row");
                floor
            }
        };

        let value: i64 = self.conn.query_row(
            r#"
            INSERT INTO sequences (name, value) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET value = value + ?3
            RETURNING value
            "#,
            params![self.name, sql_id(base + delta)?, sql_id(delta)?],
            |row| row.get(0),
        )?;
        record_id(value)
    }

    fn store(&self, value: u64) -> Result<(), Error> {
        self.conn.execute(
            r#"
            INSERT INTO sequences (name, value) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value
            "#,
            params![self.name, sql_id(value)?],
        )?;
        Ok(())
    }

    fn load(&self) -> Result<Option<u64>, Error> {
        let value: Option<i64> = self
            .conn
            .query_row(
                "SELECT value FROM sequences WHERE name = ?1",
                [&self.name],
                |row| row.get(0),
            )
            .optional()?;
        value.map(record_id).transpose()
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let id: i64 = row.get(0)?;
    let id = RecordId::try_from(id).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, id))?;
    Ok(Record {
        id,
        value: row.get(1)?,
    })
}

fn sql_id(id: RecordId) -> Result<i64, Error> {
    i64::try_from(id)
        .map_err(|_| Error::InvalidData(format!("identity {} exceeds SQLite integer range", id)))
}

fn record_id(value: i64) -> Result<RecordId, Error> {
    RecordId::try_from(value)
        .map_err(|_| Error::InvalidData(format!("negative identity {}", value)))
}

/// Constraint violations are identity collisions; everything else is a driver error.
fn write_error(err: rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            Error::Write(err.to_string())
        }
        other => Error::Sqlite(other),
    }
}
