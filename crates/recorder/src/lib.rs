//! Reading Recorder
//!
//! Write-only persistence for stamped readings. A recorder owns at most one
//! live connection to the store; it is either open and usable or absent.

mod credentials;
mod error;
mod schema;
mod sqlite;

pub use credentials::Credentials;
pub use error::{ConnectionError, SchemaError, WriteError};
pub use schema::Table;
pub use sqlite::{SqliteRecorder, DEFAULT_BUSY_TIMEOUT};

use async_trait::async_trait;
use sensor_source::Timestamp;

/// Capability around the remote store
#[async_trait]
pub trait Recorder: Send {
    /// Open a new connection with the configured credentials.
    ///
    /// A previous connection, if any, is closed first.
    async fn connect(&mut self) -> Result<(), ConnectionError>;

    /// Create both tables if they are absent. Idempotent.
    async fn ensure_schema(&mut self) -> Result<(), SchemaError>;

    /// Append one row to `temperature`
    async fn insert_temperature(
        &mut self,
        celsius: f64,
        timestamp: &Timestamp,
    ) -> Result<(), WriteError>;

    /// Append one row to `motion`
    async fn insert_motion(
        &mut self,
        detected: bool,
        timestamp: &Timestamp,
    ) -> Result<(), WriteError>;

    /// Release the connection. No-op when already closed.
    async fn close(&mut self);

    /// Whether a connection is currently held
    fn is_connected(&self) -> bool;
}
