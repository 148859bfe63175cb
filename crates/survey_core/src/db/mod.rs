//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for survey storage.
//! - Apply schema migrations in deterministic order.
//! - Offer schema probes that repositories use to refuse unmigrated handles.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Returned connections enforce foreign keys, so deleting a section
//!   cascades to its questions.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_with_config};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "survey database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Reason a connection failed the repository readiness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaGap {
    /// `PRAGMA user_version` does not match this binary.
    Version { expected: u32, actual: u32 },
    /// Table is absent.
    Table(&'static str),
    /// Column is absent from an otherwise present table.
    Column {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for SchemaGap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Version { expected, actual } => {
                write!(f, "schema version {actual}, expected {expected}")
            }
            Self::Table(table) => write!(f, "missing table `{table}`"),
            Self::Column { table, column } => {
                write!(f, "missing column `{column}` in table `{table}`")
            }
        }
    }
}

/// Checks that `conn` is migrated and exposes every listed table/column.
///
/// Returns `Ok(None)` when ready and `Ok(Some(gap))` naming the first
/// missing piece otherwise.
pub(crate) fn probe_schema(
    conn: &Connection,
    required: &[(&'static str, &[&'static str])],
) -> DbResult<Option<SchemaGap>> {
    let expected = migrations::latest_version();
    let actual: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual != expected {
        return Ok(Some(SchemaGap::Version { expected, actual }));
    }

    for (table, columns) in required {
        let present = table_columns(conn, table)?;
        if present.is_empty() {
            return Ok(Some(SchemaGap::Table(table)));
        }
        if let Some(column) = columns
            .iter()
            .find(|column| !present.iter().any(|p| p == *column))
        {
            return Ok(Some(SchemaGap::Column { table, column }));
        }
    }

    Ok(None)
}

fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
