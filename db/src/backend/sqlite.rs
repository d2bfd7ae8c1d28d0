//! SQLite backend over `rusqlite`.
//!
//! Named parameters are bound by name straight from the prepared statement. Rows
//! are buffered in memory before they are handed to the session, since a rusqlite
//! `Rows` cannot outlive its `Statement`.

use std::path::Path;

use rusqlite::types::ValueRef;
use tracing::debug;

use super::{Backend, BackendParams, BufferedCursor, Bindings, Connection, Cursor, Execution};
use crate::error::DbError;
use crate::session::Session;
use crate::value::Value;

/// Path used when none is configured.
pub const DEFAULT_PATH: &str = "tmp.db";

/// Path value that selects an in-memory database.
pub const MEMORY: &str = "memory";

const TABLE_NAMES: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name;";

/// A SQLite database file, or an in-memory database.
///
/// An in-memory database lives only as long as one connection, so its contents are
/// lost on every `disconnect`.
pub struct SqliteBackend {
    path: String,
    connection: Option<rusqlite::Connection>,
}

impl SqliteBackend {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.trim().is_empty() {
            DEFAULT_PATH.to_string()
        } else {
            path
        };
        Self {
            path,
            connection: None,
        }
    }

    pub fn memory() -> Self {
        Self::new(MEMORY)
    }

    pub fn from_params(params: &BackendParams) -> Result<Self, DbError> {
        Ok(Self::new(params.path.as_deref().unwrap_or(DEFAULT_PATH)))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_memory(&self) -> bool {
        self.path == MEMORY
    }

    fn open_connection(&self) -> Result<rusqlite::Connection, DbError> {
        let opened = if self.is_memory() {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&self.path)
        };
        opened.map_err(|e| DbError::ConnectionFailed {
            url: self.url(),
            message: e.to_string(),
        })
    }
}

impl Backend for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn url(&self) -> String {
        if self.is_memory() {
            "sqlite://".to_string()
        } else {
            format!("sqlite:///{}", self.path)
        }
    }

    fn database_name(&self) -> String {
        if self.is_memory() {
            return MEMORY.to_string();
        }
        Path::new(&self.path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.clone())
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn connect(&mut self) -> Result<(), DbError> {
        if self.connection.is_none() {
            debug!(url = %self.url(), "opening sqlite connection");
            self.connection = Some(self.open_connection()?);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            debug!(url = %self.url(), "closed sqlite connection");
        }
    }

    fn session(&mut self) -> Result<Session<'_>, DbError> {
        match self.connection.as_mut() {
            Some(connection) => Ok(Session::new(connection)),
            None => Err(DbError::ResourceClosed),
        }
    }

    fn table_names(&mut self) -> Result<Vec<String>, DbError> {
        match self.connection.as_mut() {
            Some(connection) => Connection::table_names(connection),
            None => {
                let mut connection = self.open_connection()?;
                Connection::table_names(&mut connection)
            }
        }
    }
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(text) => Value::Text(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

fn convert_value(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Integer(v) => rusqlite::types::Value::Integer(*v),
        Value::Real(v) => rusqlite::types::Value::Real(*v),
        Value::Text(v) => rusqlite::types::Value::Text(v.clone()),
        Value::Blob(v) => rusqlite::types::Value::Blob(v.clone()),
        Value::Bool(v) => rusqlite::types::Value::Integer(i64::from(*v)),
        Value::Timestamp(_) | Value::Date(_) | Value::Time(_) => {
            rusqlite::types::Value::Text(value.to_iso_string().unwrap_or_default())
        }
    }
}

/// Binds every `:name` (or `@name`/`$name`) parameter of the statement by name.
fn bind_parameters(statement: &mut rusqlite::Statement<'_>, bindings: &Bindings) -> Result<(), DbError> {
    for index in 1..=statement.parameter_count() {
        let name = statement
            .parameter_name(index)
            .map(|name| name.trim_start_matches([':', '@', '$']).to_string())
            .ok_or_else(|| {
                DbError::operational(format!(
                    "positional parameter {} is not supported, use :name",
                    index
                ))
            })?;
        let value = bindings.get(&name).ok_or_else(|| {
            DbError::operational(format!("You did not supply a value for binding '{}'", name))
        })?;
        statement.raw_bind_parameter(index, convert_value(value))?;
    }
    Ok(())
}

fn is_insert(statement: &str) -> bool {
    let keyword: String = statement
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    keyword.eq_ignore_ascii_case("insert") || keyword.eq_ignore_ascii_case("replace")
}

impl Connection for rusqlite::Connection {
    fn query<'c>(
        &'c mut self,
        statement: &str,
        bindings: &Bindings,
    ) -> Result<Box<dyn Cursor + 'c>, DbError> {
        let mut prepared = self.prepare(statement)?;
        bind_parameters(&mut prepared, bindings)?;
        let columns: Vec<String> = prepared
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut buffered = Vec::new();
        let mut rows = prepared.raw_query();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                values.push(value_from_ref(row.get_ref(index)?));
            }
            buffered.push(values);
        }

        Ok(Box::new(BufferedCursor::new(columns, buffered)))
    }

    fn execute(&mut self, statement: &str, bindings: &Bindings) -> Result<Execution, DbError> {
        let before = self.last_insert_rowid();

        let rows_affected = {
            let mut prepared = self.prepare(statement)?;
            bind_parameters(&mut prepared, bindings)?;
            if prepared.column_count() > 0 {
                let mut rows = prepared.raw_query();
                let mut returned = 0u64;
                while rows.next()?.is_some() {
                    returned += 1;
                }
                returned
            } else {
                prepared.raw_execute()? as u64
            }
        };

        let after = self.last_insert_rowid();
        let inserted = after != before || (is_insert(statement) && rows_affected > 0);
        Ok(Execution {
            rows_affected,
            last_id: inserted.then_some(after),
        })
    }

    fn begin(&mut self) -> Result<(), DbError> {
        Ok(self.execute_batch("BEGIN")?)
    }

    fn commit(&mut self) -> Result<(), DbError> {
        Ok(self.execute_batch("COMMIT")?)
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        Ok(self.execute_batch("ROLLBACK")?)
    }

    fn table_names(&mut self) -> Result<Vec<String>, DbError> {
        let mut prepared = self.prepare(TABLE_NAMES)?;
        let names = prepared
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}
