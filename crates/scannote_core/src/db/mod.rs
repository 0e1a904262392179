//! SQLite backing for the notebook key-value store.
//!
//! # Responsibility
//! - Open connections and bring the `kv_entries` schema up to date.
//! - Report how a connection's schema relates to this binary.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - No entry is read or written on a connection whose schema is not current.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use migrations::{ensure_current, schema_state, SchemaState, KV_SCHEMA_VERSION};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// One migration step failed; its transaction was rolled back.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The file was written by a newer build. It is left untouched.
    SchemaAhead { found: u32, supported: u32 },
    /// The connection was handed over without running migrations.
    SchemaBehind { found: u32, required: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration { version, source } => {
                write!(f, "kv schema migration to v{version} failed: {source}")
            }
            Self::SchemaAhead { found, supported } => write!(
                f,
                "kv schema v{found} was written by a newer build (this build supports v{supported})"
            ),
            Self::SchemaBehind { found, required } => {
                write!(f, "kv schema v{found} is not migrated (v{required} required)")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaAhead { .. } | Self::SchemaBehind { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
