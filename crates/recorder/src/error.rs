//! Recorder Error Types

use crate::schema::Table;
use thiserror::Error;

/// Errors opening a connection to the store
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A credential field is empty
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// The database URL cannot be used by this backend
    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),

    /// The store refused or could not be reached
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// Connect did not complete in time
    #[error("Connect timed out after {0}ms")]
    Timeout(u64),
}

/// Errors creating the tables
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No live connection
    #[error("Not connected, cannot ensure schema")]
    NotConnected,

    /// The store rejected a CREATE TABLE statement
    #[error("Failed to create table {table}: {reason}")]
    Rejected { table: Table, reason: String },

    /// Schema statement did not complete in time
    #[error("Schema creation timed out after {0}ms")]
    Timeout(u64),
}

/// Errors appending a row
#[derive(Debug, Error)]
pub enum WriteError {
    /// No live connection
    #[error("Not connected, cannot write to {0} table")]
    NotConnected(Table),

    /// The connection failed during the write
    #[error("Connection lost while writing to {table} table: {reason}")]
    ConnectionLost { table: Table, reason: String },

    /// The write did not complete in time
    #[error("Write to {table} table timed out after {timeout_ms}ms")]
    Timeout { table: Table, timeout_ms: u64 },

    /// The store rejected the row (constraint, malformed value)
    #[error("Row rejected by {table} table: {reason}")]
    Rejected { table: Table, reason: String },
}

impl WriteError {
    /// Table the failed write targeted
    pub fn table(&self) -> Table {
        match self {
            WriteError::NotConnected(table) => *table,
            WriteError::ConnectionLost { table, .. }
            | WriteError::Timeout { table, .. }
            | WriteError::Rejected { table, .. } => *table,
        }
    }

    /// Whether a reconnection may fix this failure
    pub fn is_connection_loss(&self) -> bool {
        !matches!(self, WriteError::Rejected { .. })
    }

    /// Whether the row is known not to have been written, so the insert
    /// can be issued again on a fresh connection.
    ///
    /// A timed-out insert may still commit after the caller gave up on it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WriteError::NotConnected(_) | WriteError::ConnectionLost { .. }
        )
    }

    /// Classify a driver error raised while writing to `table`
    pub(crate) fn from_sqlx(table: Table, err: sqlx::Error) -> Self {
        let lost = match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => true,
            sqlx::Error::Database(db) => db.code().is_some_and(|code| is_unreachable_code(&code)),
            _ => false,
        };

        if lost {
            WriteError::ConnectionLost {
                table,
                reason: err.to_string(),
            }
        } else {
            WriteError::Rejected {
                table,
                reason: err.to_string(),
            }
        }
    }
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_IOERR: i32 = 10;
const SQLITE_CANTOPEN: i32 = 14;
const SQLITE_NOTADB: i32 = 26;
const SQLITE_READONLY_DBMOVED: i32 = 1032;

/// SQLite result codes (primary or extended, as reported by the driver)
/// that mean the store cannot be used through the current handle.
/// None of them leave a statement half-applied.
fn is_unreachable_code(code: &str) -> bool {
    let Ok(extended) = code.parse::<i32>() else {
        return false;
    };
    extended == SQLITE_READONLY_DBMOVED
        || matches!(
            extended & 0xff,
            SQLITE_BUSY | SQLITE_LOCKED | SQLITE_IOERR | SQLITE_CANTOPEN | SQLITE_NOTADB
        )
}
