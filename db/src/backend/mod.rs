//! Backend abstraction layer for database operations.
//!
//! A [`Backend`] owns at most one physical connection to one database family and
//! hands out [`Session`]s bound to it. Driver specifics live behind the
//! [`Connection`] and [`Cursor`] traits so sessions, queries and sets never see a
//! driver type.

use std::collections::btree_map;
use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::session::Session;
use crate::value::Value;

#[cfg(feature = "backend-postgres")]
pub mod postgres;
#[cfg(feature = "backend-sqlite")]
pub mod sqlite;

#[cfg(feature = "backend-postgres")]
pub use self::postgres::PostgresBackend;
#[cfg(feature = "backend-sqlite")]
pub use self::sqlite::SqliteBackend;

/// Container for named statement parameters.
///
/// Names are written `:name` in statement text and stored here without the colon.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Bindings {
    params: BTreeMap<String, Value>,
}

impl Bindings {
    /// Creates a new empty parameter container.
    pub fn new() -> Self {
        Self {
            params: BTreeMap::new(),
        }
    }

    /// Inserts a parameter, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.params.iter()
    }

    /// Returns a reference to the underlying parameters map.
    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }
}

impl Extend<(String, Value)> for Bindings {
    fn extend<T: IntoIterator<Item = (String, Value)>>(&mut self, iter: T) {
        self.params.extend(iter);
    }
}

impl IntoIterator for Bindings {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bindings {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut bindings = Bindings::new();
        for (k, v) in iter {
            bindings.insert(k, v);
        }
        bindings
    }
}

/// Construction parameters shared by every backend; each backend reads the ones it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl BackendParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Outcome of a statement run for its side effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Execution {
    /// Rows changed by a mutation, or rows returned by a row-producing statement.
    pub rows_affected: u64,
    /// Row id generated by an insert, when the driver reports one.
    pub last_id: Option<i64>,
}

/// One-shot forward cursor over statement results.
pub trait Cursor: Send {
    /// Column names in result order.
    fn columns(&self) -> &[String];

    /// Pulls the next row; `Ok(None)` once the cursor is exhausted.
    fn fetch(&mut self) -> Result<Option<Vec<Value>>, DbError>;
}

/// A cursor over rows that are already in memory.
#[derive(Debug, Default)]
pub struct BufferedCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
}

impl BufferedCursor {
    pub fn new(columns: Vec<String>, rows: impl Into<VecDeque<Vec<Value>>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }
}

impl Cursor for BufferedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn fetch(&mut self) -> Result<Option<Vec<Value>>, DbError> {
        Ok(self.rows.pop_front())
    }
}

/// Driver plumbing for one open physical connection.
///
/// Implementations translate `:name` parameters to whatever the driver expects,
/// and every driver failure into [`DbError::Operational`].
pub trait Connection: Send {
    /// Prepares and runs a row-returning statement.
    fn query<'c>(
        &'c mut self,
        statement: &str,
        bindings: &Bindings,
    ) -> Result<Box<dyn Cursor + 'c>, DbError>;

    /// Runs a statement for its side effects.
    fn execute(&mut self, statement: &str, bindings: &Bindings) -> Result<Execution, DbError>;

    fn begin(&mut self) -> Result<(), DbError>;

    fn commit(&mut self) -> Result<(), DbError>;

    fn rollback(&mut self) -> Result<(), DbError>;

    /// Names of the user tables visible to this connection, sorted.
    fn table_names(&mut self) -> Result<Vec<String>, DbError>;
}

/// Core trait for one database family.
///
/// `connect` and `disconnect` may be called any number of times; a Session can only
/// be obtained while the backend is open.
pub trait Backend: Send {
    /// Lowercase family name, e.g. `sqlite`.
    fn backend_name(&self) -> &'static str;

    /// Driver-specific connection URL.
    fn url(&self) -> String;

    fn database_name(&self) -> String;

    fn is_open(&self) -> bool;

    /// Opens the physical connection. Does nothing when already open.
    fn connect(&mut self) -> Result<(), DbError>;

    /// Drops the physical connection. Safe to call when closed.
    fn disconnect(&mut self);

    /// Returns a Session over the open connection, or [`DbError::ResourceClosed`].
    fn session(&mut self) -> Result<Session<'_>, DbError>;

    /// Lists user tables, opening a temporary connection when closed.
    fn table_names(&mut self) -> Result<Vec<String>, DbError>;
}
