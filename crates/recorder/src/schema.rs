//! Table Definitions

use std::fmt;

/// Append-only tables written by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Motion,
    Temperature,
}

impl Table {
    pub const ALL: [Table; 2] = [Table::Motion, Table::Temperature];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Motion => "motion",
            Table::Temperature => "temperature",
        }
    }

    /// Idempotent CREATE statement
    pub fn create_sql(&self) -> &'static str {
        match self {
            Table::Motion => CREATE_MOTION,
            Table::Temperature => CREATE_TEMPERATURE,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CREATE_MOTION: &str = r#"
CREATE TABLE IF NOT EXISTS motion (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    motion_detected INTEGER NOT NULL
)
"#;

const CREATE_TEMPERATURE: &str = r#"
CREATE TABLE IF NOT EXISTS temperature (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    temperature REAL NOT NULL
)
"#;

pub(crate) const INSERT_MOTION: &str =
    "INSERT INTO motion (timestamp, motion_detected) VALUES (?, ?)";

pub(crate) const INSERT_TEMPERATURE: &str =
    "INSERT INTO temperature (timestamp, temperature) VALUES (?, ?)";
