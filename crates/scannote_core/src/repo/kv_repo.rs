//! Key-value repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist opaque string values under string keys.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `save` is a synchronous upsert; the last write for a key wins.
//! - `load` of a key that was never saved returns `Ok(None)`.
//! - Writes to different keys are independent (no cross-key transaction).

use crate::db::{ensure_current, DbError};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and decoding.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Stored value for `key` could not be decoded or encoded.
    InvalidData { key: &'static str, message: String },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData { key, message } => {
                write!(f, "invalid persisted data for `{key}`: {message}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Minimal persistence contract behind the notebook collections.
pub trait KeyValueRepository {
    /// Returns the stored value, or `None` when the key was never saved.
    fn load(&self, key: &str) -> RepoResult<Option<String>>;
    /// Stores `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> RepoResult<()>;
}

/// SQLite-backed key-value repository owning its connection.
pub struct SqliteKeyValueRepository {
    conn: Connection,
}

impl SqliteKeyValueRepository {
    /// Wraps a connection returned by `open_db` / `open_db_in_memory`.
    ///
    /// # Errors
    /// - `DbError::SchemaBehind` / `SchemaAhead` unless the schema is current.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_current(&conn)?;
        Ok(Self { conn })
    }

    /// Gives the connection back, e.g. for inspection in tests.
    pub fn into_inner(self) -> Connection {
        self.conn
    }
}

impl KeyValueRepository for SqliteKeyValueRepository {
    fn load(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyValueRepository, RepoError, SqliteKeyValueRepository};
    use crate::db::{open_db_in_memory, DbError};
    use rusqlite::Connection;

    #[test]
    fn load_missing_key_returns_none() {
        let repo = SqliteKeyValueRepository::try_new(open_db_in_memory().unwrap()).unwrap();
        assert_eq!(repo.load("books").unwrap(), None);
    }

    #[test]
    fn save_overwrites_previous_value() {
        let repo = SqliteKeyValueRepository::try_new(open_db_in_memory().unwrap()).unwrap();
        repo.save("theme", "light").unwrap();
        repo.save("theme", "dark").unwrap();
        assert_eq!(repo.load("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteKeyValueRepository::try_new(conn)
            .err()
            .expect("unmigrated connection must be rejected");
        assert!(matches!(
            err,
            RepoError::Db(DbError::SchemaBehind { found: 0, .. })
        ));
    }
}
