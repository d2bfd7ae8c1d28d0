//! Backend construction by name.

use tracing::warn;

use crate::backend::{Backend, BackendParams};
use crate::database::{Database, DatabaseOptions};
use crate::error::DbError;

#[cfg(feature = "backend-postgres")]
use crate::backend::PostgresBackend;
#[cfg(feature = "backend-sqlite")]
use crate::backend::SqliteBackend;

/// Names accepted by [`load_backend`], for help text and error messages.
pub const BACKEND_NAMES: &[&str] = &["sqlite", "pgsql", "psql", "postgres", "postgresql"];

/// Build an unconnected backend from its name and parameters.
///
/// Names are matched case-insensitively. Backends whose feature is disabled are
/// reported as unknown.
#[cfg_attr(
    not(any(feature = "backend-sqlite", feature = "backend-postgres")),
    allow(unused_variables)
)]
pub fn load_backend(name: &str, params: &BackendParams) -> Result<Box<dyn Backend>, DbError> {
    match name.to_ascii_lowercase().as_str() {
        #[cfg(feature = "backend-sqlite")]
        "sqlite" => Ok(Box::new(SqliteBackend::from_params(params)?)),
        #[cfg(feature = "backend-postgres")]
        "pgsql" | "psql" | "postgres" | "postgresql" => {
            Ok(Box::new(PostgresBackend::from_params(params)?))
        }
        _ => Err(DbError::UnknownBackend {
            name: name.to_string(),
        }),
    }
}

/// Build a [`Database`] around a named backend.
///
/// An unknown backend name is logged and yields `None`; invalid parameters for a
/// known backend are an error.
pub fn load_database(
    name: &str,
    params: &BackendParams,
    options: DatabaseOptions,
) -> Result<Option<Database>, DbError> {
    match load_backend(name, params) {
        Ok(backend) => Ok(Some(Database::with_options(backend, options))),
        Err(DbError::UnknownBackend { name }) => {
            warn!(backend = %name, "unknown database backend");
            Ok(None)
        }
        Err(error) => Err(error),
    }
}
