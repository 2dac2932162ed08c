//! SQLite Recorder
//!
//! Holds a single `SqliteConnection`. Every statement runs in autocommit
//! mode, so each insert is committed on its own or not at all.

use crate::credentials::Credentials;
use crate::error::{ConnectionError, SchemaError, WriteError};
use crate::schema::{Table, INSERT_MOTION, INSERT_TEMPERATURE};
use crate::Recorder;
use async_trait::async_trait;
use sensor_source::Timestamp;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a statement waits on a locked database before failing with
/// `SQLITE_BUSY`
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// Recorder backed by one SQLite connection
pub struct SqliteRecorder {
    credentials: Credentials,
    busy_timeout: Duration,
    conn: Option<SqliteConnection>,
}

impl SqliteRecorder {
    /// Create a recorder; no connection is opened until [`Recorder::connect`]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            conn: None,
        }
    }

    /// Set the lock wait applied to connections opened from now on.
    ///
    /// Keep it below any timeout the caller wraps around an insert: the
    /// driver keeps running a statement whose future was dropped, and
    /// a statement still waiting on the lock can commit afterwards.
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// SQLite has no key authentication. `API_KEY` is validated with the
    /// rest of the credentials but never sent to the store.
    fn connect_options(&self) -> Result<SqliteConnectOptions, ConnectionError> {
        let location = self.credentials.database_location();
        if !location.starts_with("sqlite:") {
            return Err(ConnectionError::UnsupportedUrl(
                self.credentials.database_url().to_string(),
            ));
        }

        let options = SqliteConnectOptions::from_str(&location)
            .map_err(|e| ConnectionError::UnsupportedUrl(e.to_string()))?
            .create_if_missing(true)
            .busy_timeout(self.busy_timeout);
        Ok(options)
    }
}

#[async_trait]
impl Recorder for SqliteRecorder {
    async fn connect(&mut self) -> Result<(), ConnectionError> {
        self.close().await;

        let options = self.connect_options()?;
        let conn = options
            .connect()
            .await
            .map_err(|e| ConnectionError::Connect(e.to_string()))?;

        info!("Connected to {}", self.credentials.database_location());
        self.conn = Some(conn);
        Ok(())
    }

    async fn ensure_schema(&mut self) -> Result<(), SchemaError> {
        let conn = self.conn.as_mut().ok_or(SchemaError::NotConnected)?;

        for table in Table::ALL {
            sqlx::query(table.create_sql())
                .execute(&mut *conn)
                .await
                .map_err(|e| SchemaError::Rejected {
                    table,
                    reason: e.to_string(),
                })?;
            debug!("Table {} ready", table);
        }

        info!("Tables are ready");
        Ok(())
    }

    async fn insert_temperature(
        &mut self,
        celsius: f64,
        timestamp: &Timestamp,
    ) -> Result<(), WriteError> {
        let table = Table::Temperature;
        if !celsius.is_finite() {
            return Err(WriteError::Rejected {
                table,
                reason: format!("non-finite temperature {celsius}"),
            });
        }
        let conn = self.conn.as_mut().ok_or(WriteError::NotConnected(table))?;

        sqlx::query(INSERT_TEMPERATURE)
            .bind(timestamp.as_str())
            .bind(celsius)
            .execute(&mut *conn)
            .await
            .map_err(|e| WriteError::from_sqlx(table, e))?;

        info!(
            "Record inserted into temperature table: {}, temperature: {:.2}",
            timestamp, celsius
        );
        Ok(())
    }

    async fn insert_motion(
        &mut self,
        detected: bool,
        timestamp: &Timestamp,
    ) -> Result<(), WriteError> {
        let table = Table::Motion;
        let conn = self.conn.as_mut().ok_or(WriteError::NotConnected(table))?;

        sqlx::query(INSERT_MOTION)
            .bind(timestamp.as_str())
            .bind(i64::from(detected))
            .execute(&mut *conn)
            .await
            .map_err(|e| WriteError::from_sqlx(table, e))?;

        info!(
            "Record inserted into motion table: {}, motion detected: {}",
            timestamp,
            u8::from(detected)
        );
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                warn!("Error while closing database connection: {}", e);
            }
            info!("Database connection closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }
}
