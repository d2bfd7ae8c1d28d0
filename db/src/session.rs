//! Statement execution over one open connection.
//!
//! Every backend failure is captured into a failed [`QueryResult`]; nothing here
//! returns an error to the caller.

use tracing::{debug, warn};

use crate::backend::{Bindings, Connection};
use crate::error::DbError;
use crate::result::QueryResult;
use crate::types::Set;
use crate::value::Value;

/// Wraps exactly one open connection borrowed from a backend.
///
/// Closing a session only makes it unusable; the backend connection stays open
/// until the backend disconnects.
pub struct Session<'c> {
    connection: &'c mut dyn Connection,
    open: bool,
}

impl<'c> Session<'c> {
    pub fn new(connection: &'c mut dyn Connection) -> Self {
        Self {
            connection,
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    fn capture<'r>(statement: &str, bindings: &Bindings, error: DbError) -> QueryResult<'r> {
        debug!(%statement, %error, "statement failed");
        QueryResult::failed(statement, bindings.clone(), error)
    }

    /// Runs an aggregate; the aggregate value is the first column of the first row.
    pub fn aggregate(&mut self, statement: &str, bindings: &Bindings) -> QueryResult<'static> {
        if !self.open {
            return Self::capture(statement, bindings, DbError::ResourceClosed);
        }

        let fetched = self
            .connection
            .query(statement, bindings)
            .and_then(|mut cursor| cursor.fetch());

        match fetched {
            Ok(row) => {
                let value = row
                    .and_then(|values| values.into_iter().next())
                    .unwrap_or(Value::Null);
                QueryResult::aggregate_value(statement, bindings.clone(), value)
            }
            Err(error) => Self::capture(statement, bindings, error),
        }
    }

    /// Runs a row-returning statement.
    ///
    /// When `lazy` is false every row is pulled before returning and a fetch error
    /// fails the whole result. When `lazy` is true rows are pulled on demand and the
    /// result borrows this session.
    pub fn query(&mut self, statement: &str, lazy: bool, bindings: &Bindings) -> QueryResult<'_> {
        if !self.open {
            return Self::capture(statement, bindings, DbError::ResourceClosed);
        }

        let cursor = match self.connection.query(statement, bindings) {
            Ok(cursor) => cursor,
            Err(error) => return Self::capture(statement, bindings, error),
        };

        let mut rows = Set::new(cursor);
        if !lazy {
            if let Err(error) = rows.all() {
                return Self::capture(statement, bindings, error);
            }
        }
        QueryResult::with_rows(statement, bindings.clone(), rows)
    }

    /// Runs a statement inside its own transaction, rolling back on failure.
    pub fn raw(&mut self, statement: &str, bindings: &Bindings) -> QueryResult<'static> {
        if !self.open {
            return Self::capture(statement, bindings, DbError::ResourceClosed);
        }

        if let Err(error) = self.connection.begin() {
            return Self::capture(statement, bindings, error);
        }

        let execution = match self.connection.execute(statement, bindings) {
            Ok(execution) => execution,
            Err(error) => {
                self.rollback(statement);
                return Self::capture(statement, bindings, error);
            }
        };

        if let Err(error) = self.connection.commit() {
            self.rollback(statement);
            return Self::capture(statement, bindings, error);
        }

        QueryResult::executed(statement, bindings.clone(), execution)
    }

    fn rollback(&mut self, statement: &str) {
        match self.connection.rollback() {
            Ok(()) => debug!(%statement, "rolled back"),
            Err(error) => warn!(%statement, %error, "rollback failed"),
        }
    }
}
