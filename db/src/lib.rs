//! Database layer for recordkit - statement building, backends, sessions and
//! result sets

pub mod backend;
pub mod config;
pub mod database;
pub mod error;
pub mod expression;
pub mod factory;
pub mod query;
pub mod query_builders;
pub mod result;
pub mod session;
pub mod types;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

#[cfg(all(any(test, feature = "test-utils"), feature = "backend-sqlite"))]
pub mod test_utils;

// Re-export commonly used items
pub use backend::{Backend, BackendParams, Bindings, Connection, Cursor, Execution};
pub use config::{ConfigFile, DatabaseConfig};
pub use database::{Database, DatabaseOptions, TableNaming};
pub use error::DbError;
pub use expression::Expression;
pub use factory::{load_backend, load_database};
pub use query::{AggregateFunction, Operation, QueryObserver, TracingObserver};
pub use query_builders::{Criteria, Criterion, SelectOptions, Values};
pub use result::QueryResult;
pub use session::Session;
pub use types::{Dataset, ExportFormat, Row, Set};
pub use value::Value;

#[cfg(feature = "backend-postgres")]
pub use backend::PostgresBackend;
#[cfg(feature = "backend-sqlite")]
pub use backend::SqliteBackend;
