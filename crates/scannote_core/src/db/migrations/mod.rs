//! `kv_entries` schema steps and version checks.
//!
//! # Responsibility
//! - List schema steps in version order.
//! - Classify a connection's schema and upgrade it step by step.
//!
//! # Invariants
//! - Each step runs in its own transaction together with its
//!   `user_version` bump, so a failed step leaves the previous version intact.
//! - A schema ahead of `KV_SCHEMA_VERSION` is never modified.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

/// Schema version this build reads and writes.
pub const KV_SCHEMA_VERSION: u32 = 1;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static STEPS: [SchemaStep; KV_SCHEMA_VERSION as usize] = [SchemaStep {
    version: 1,
    name: "kv_entries",
    sql: include_str!("0001_kv_entries.sql"),
}];

/// How a connection's schema compares to `KV_SCHEMA_VERSION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    Current,
    /// Older (or fresh) file; `apply_migrations` can upgrade it.
    Behind { found: u32 },
    /// Written by a newer build.
    Ahead { found: u32 },
}

pub fn schema_state(conn: &Connection) -> DbResult<SchemaState> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(match found {
        v if v == KV_SCHEMA_VERSION => SchemaState::Current,
        v if v < KV_SCHEMA_VERSION => SchemaState::Behind { found: v },
        v => SchemaState::Ahead { found: v },
    })
}

/// Fails unless the schema is exactly `KV_SCHEMA_VERSION`.
pub fn ensure_current(conn: &Connection) -> DbResult<()> {
    match schema_state(conn)? {
        SchemaState::Current => Ok(()),
        SchemaState::Behind { found } => Err(DbError::SchemaBehind {
            found,
            required: KV_SCHEMA_VERSION,
        }),
        SchemaState::Ahead { found } => Err(DbError::SchemaAhead {
            found,
            supported: KV_SCHEMA_VERSION,
        }),
    }
}

/// Upgrades `conn` to `KV_SCHEMA_VERSION`. Returns the number of steps run.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let found = match schema_state(conn)? {
        SchemaState::Current => return Ok(0),
        SchemaState::Ahead { found } => {
            return Err(DbError::SchemaAhead {
                found,
                supported: KV_SCHEMA_VERSION,
            })
        }
        SchemaState::Behind { found } => found,
    };

    let pending: Vec<&SchemaStep> = STEPS.iter().filter(|step| step.version > found).collect();
    for step in &pending {
        run_step(conn, step).map_err(|source| {
            error!(
                "event=db_migrate module=db status=error version={} step={} error={}",
                step.version, step.name, source
            );
            DbError::Migration {
                version: step.version,
                source,
            }
        })?;
        info!(
            "event=db_migrate module=db status=ok version={} step={}",
            step.version, step.name
        );
    }
    Ok(pending.len())
}

fn run_step(conn: &mut Connection, step: &SchemaStep) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, ensure_current, schema_state, SchemaState, KV_SCHEMA_VERSION};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn fresh_connection_is_behind_then_current() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(
            schema_state(&conn).unwrap(),
            SchemaState::Behind { found: 0 }
        );
        assert!(matches!(
            ensure_current(&conn),
            Err(DbError::SchemaBehind { found: 0, .. })
        ));

        assert_eq!(apply_migrations(&mut conn).unwrap(), KV_SCHEMA_VERSION as usize);
        assert_eq!(schema_state(&conn).unwrap(), SchemaState::Current);
        assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
    }

    #[test]
    fn newer_schema_is_left_untouched() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 7;").unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            DbError::SchemaAhead {
                found: 7,
                supported: KV_SCHEMA_VERSION
            }
        ));
        let tables: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(tables, 0);
    }
}
