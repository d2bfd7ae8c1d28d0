//! The uniform outcome of running a statement.

use std::fmt;

use crate::backend::{Bindings, Execution};
use crate::error::DbError;
use crate::types::{Row, Set};
use crate::value::Value;

/// Statement, bindings and either the operation's outcome or the captured error.
///
/// A result is successful exactly when it carries no error. `rows` is only set for
/// row-returning queries, `aggregate` only for aggregates and `last_id` only when
/// the driver reported a newly generated row id.
#[derive(Debug)]
pub struct QueryResult<'c> {
    statement: String,
    bindings: Bindings,
    error: Option<DbError>,
    aggregate: Option<Value>,
    count: Option<u64>,
    last_id: Option<i64>,
    rows: Option<Set<'c>>,
}

impl<'c> QueryResult<'c> {
    fn empty(statement: impl Into<String>, bindings: Bindings) -> Self {
        Self {
            statement: statement.into(),
            bindings,
            error: None,
            aggregate: None,
            count: None,
            last_id: None,
            rows: None,
        }
    }

    pub fn failed(statement: impl Into<String>, bindings: Bindings, error: DbError) -> Self {
        Self {
            error: Some(error),
            ..Self::empty(statement, bindings)
        }
    }

    pub fn aggregate_value(statement: impl Into<String>, bindings: Bindings, value: Value) -> Self {
        Self {
            aggregate: Some(value),
            count: Some(1),
            ..Self::empty(statement, bindings)
        }
    }

    pub fn with_rows(statement: impl Into<String>, bindings: Bindings, rows: Set<'c>) -> Self {
        Self {
            rows: Some(rows),
            ..Self::empty(statement, bindings)
        }
    }

    pub fn executed(statement: impl Into<String>, bindings: Bindings, execution: Execution) -> Self {
        Self {
            count: Some(execution.rows_affected),
            last_id: execution.last_id,
            ..Self::empty(statement, bindings)
        }
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&DbError> {
        self.error.as_ref()
    }

    pub fn into_error(self) -> Option<DbError> {
        self.error
    }

    pub fn aggregate(&self) -> Option<&Value> {
        self.aggregate.as_ref()
    }

    /// Rows affected or returned. For row results this is the number of rows pulled
    /// so far, which for an eager query is all of them.
    pub fn count(&self) -> Option<u64> {
        match &self.rows {
            Some(rows) => Some(rows.len() as u64),
            None => self.count,
        }
    }

    pub fn last_id(&self) -> Option<i64> {
        self.last_id
    }

    pub fn rows(&self) -> Option<&Set<'c>> {
        self.rows.as_ref()
    }

    pub fn rows_mut(&mut self) -> Option<&mut Set<'c>> {
        self.rows.as_mut()
    }

    pub fn into_rows(self) -> Option<Set<'c>> {
        self.rows
    }

    /// The first row, if any rows were returned.
    pub fn first(&self) -> Option<&Row> {
        self.rows.as_ref().and_then(|rows| rows.cached().first())
    }

    /// Drains any pending rows so the result no longer borrows the connection.
    ///
    /// A fetch error while draining turns the result into a failed one.
    pub fn detach(self) -> QueryResult<'static> {
        let QueryResult {
            statement,
            bindings,
            error,
            aggregate,
            count,
            last_id,
            rows,
        } = self;

        let rows = match rows.map(Set::detach).transpose() {
            Ok(rows) => rows,
            Err(error) => return QueryResult::failed(statement, bindings, error),
        };

        QueryResult {
            statement,
            bindings,
            error,
            aggregate,
            count,
            last_id,
            rows,
        }
    }
}

impl fmt::Display for QueryResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Result {}>", self.statement)
    }
}
