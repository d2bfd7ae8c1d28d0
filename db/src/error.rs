//! Error taxonomy for the database layer.
//!
//! Only programmer-misuse conditions are returned as `Err(DbError)` from the facade
//! (closed resources, fetch cardinality, unknown backends, bad configuration).
//! Statement execution failures are captured by the session and carried as data in
//! [`QueryResult`](crate::result::QueryResult).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Improperly configured: {message}")]
    ImproperlyConfigured { message: String },

    #[error("Database is not open.")]
    ResourceClosed,

    #[error("Failed to connect to '{url}': {message}")]
    ConnectionFailed { url: String, message: String },

    #[error("{message}")]
    Operational { message: String },

    #[error("{table} object does not exist.")]
    ObjectDoesNotExist { table: String },

    #[error("{table} query returned multiple records.")]
    MultipleObjectsReturned { table: String },

    #[error("Query failed: {message}")]
    QueryFailed { message: String },

    #[error("Invalid or unsupported backend: {name}")]
    UnknownBackend { name: String },

    #[error("Invalid field name: {name}")]
    InvalidField { name: String },

    #[error("The data has multiple fields named: {name}")]
    AmbiguousField { name: String },

    #[error("Row has {attributes} attribute(s) but {values} value(s)")]
    RowShape { attributes: usize, values: usize },

    #[error("Export failed: {message}")]
    Export { message: String },
}

impl DbError {
    pub(crate) fn operational(message: impl Into<String>) -> Self {
        DbError::Operational {
            message: message.into(),
        }
    }

    pub(crate) fn improperly_configured(message: impl Into<String>) -> Self {
        DbError::ImproperlyConfigured {
            message: message.into(),
        }
    }
}

#[cfg(feature = "backend-sqlite")]
impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::operational(e.to_string())
    }
}

#[cfg(feature = "backend-postgres")]
impl From<postgres::Error> for DbError {
    fn from(e: postgres::Error) -> Self {
        // The Display impl of postgres::Error only says "db error"; the source carries
        // the server message.
        let message = match e.as_db_error() {
            Some(db) => format!("{}: {}", db.severity(), db.message()),
            None => e.to_string(),
        };
        DbError::operational(message)
    }
}
