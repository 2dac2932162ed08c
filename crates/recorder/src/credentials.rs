//! Store Credentials

use crate::error::ConnectionError;
use std::fmt;

/// Location and key of the database
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    database_url: String,
    db_name: String,
    api_key: String,
}

impl Credentials {
    /// Build credentials, rejecting empty fields
    pub fn new(
        database_url: impl Into<String>,
        db_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ConnectionError> {
        let database_url = database_url.into();
        let db_name = db_name.into();
        let api_key = api_key.into();

        if database_url.trim().is_empty() {
            return Err(ConnectionError::MissingCredential("DATABASE_URL"));
        }
        if db_name.trim().is_empty() {
            return Err(ConnectionError::MissingCredential("DB_NAME"));
        }
        if api_key.trim().is_empty() {
            return Err(ConnectionError::MissingCredential("API_KEY"));
        }

        Ok(Self {
            database_url,
            db_name,
            api_key,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// `{database_url}/{db_name}`
    pub fn database_location(&self) -> String {
        format!("{}/{}", self.database_url.trim_end_matches('/'), self.db_name)
    }

    /// Full connection string including the API key, for keyed remote
    /// stores. [`crate::SqliteRecorder`] opens [`Self::database_location`]
    /// instead. Never log this.
    pub fn connection_string(&self) -> String {
        format!("{}?apikey={}", self.database_location(), self.api_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("database_url", &self.database_url)
            .field("db_name", &self.db_name)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
