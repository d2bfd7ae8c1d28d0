//! The public entry point: table naming, statement building and query dispatch.

use std::fmt;
use std::sync::Arc;

use crate::backend::{Backend, Bindings};
use crate::error::DbError;
use crate::query::{AggregateFunction, Operation, Query, QueryObserver, TracingObserver};
use crate::query_builders::{
    aggregate_statement, delete_statement, insert_statement, raw_statement, select_statement,
    update_statement, Criteria, SelectOptions, Values,
};
use crate::result::QueryResult;
use crate::types::Row;

/// Column counted by [`Database::count`].
pub const DEFAULT_COUNT_COLUMN: &str = "id";

/// Maps a logical table name to the physical one.
pub type NamingFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone, Default)]
pub enum TableNaming {
    #[default]
    Verbatim,
    /// `{prefix}_{table}`
    Prefix(String),
    Custom(NamingFn),
}

impl TableNaming {
    pub fn apply(&self, table: &str) -> String {
        match self {
            TableNaming::Verbatim => table.to_string(),
            TableNaming::Prefix(prefix) => format!("{}_{}", prefix, table),
            TableNaming::Custom(naming) => naming(table),
        }
    }
}

impl fmt::Debug for TableNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableNaming::Verbatim => write!(f, "Verbatim"),
            TableNaming::Prefix(prefix) => f.debug_tuple("Prefix").field(prefix).finish(),
            TableNaming::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Construction options for [`Database`].
#[derive(Clone, Default)]
pub struct DatabaseOptions {
    /// Install [`TracingObserver`] unless another observer is given.
    pub debug: bool,
    pub naming: TableNaming,
    pub observer: Option<Arc<dyn QueryObserver>>,
}

impl DatabaseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// An empty prefix leaves table names untouched.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.naming = if prefix.is_empty() {
            TableNaming::Verbatim
        } else {
            TableNaming::Prefix(prefix)
        };
        self
    }

    pub fn naming<F>(mut self, naming: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.naming = TableNaming::Custom(Arc::new(naming));
        self
    }

    pub fn observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}

pub struct Database {
    backend: Box<dyn Backend>,
    naming: TableNaming,
    observer: Option<Arc<dyn QueryObserver>>,
}

impl Database {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self::with_options(backend, DatabaseOptions::default())
    }

    pub fn with_options(backend: Box<dyn Backend>, options: DatabaseOptions) -> Self {
        let observer = match options.observer {
            Some(observer) => Some(observer),
            None if options.debug => Some(Arc::new(TracingObserver) as Arc<dyn QueryObserver>),
            None => None,
        };
        Self {
            backend,
            naming: options.naming,
            observer,
        }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    pub fn is_debug(&self) -> bool {
        self.observer.is_some()
    }

    /// The physical name of a table after naming rules are applied.
    pub fn table_name(&self, table: &str) -> String {
        self.naming.apply(table)
    }

    pub fn table_names(&mut self) -> Result<Vec<String>, DbError> {
        self.backend.table_names()
    }

    fn run(&mut self, operation: Operation, statement: String, bindings: Bindings) -> QueryResult<'static> {
        let mut query = Query::new(operation, statement, bindings);
        query.run(self.backend.as_mut(), self.observer.as_deref());
        query.into_result()
    }

    pub fn select(
        &mut self,
        table: &str,
        options: &SelectOptions,
        criteria: &Criteria,
    ) -> QueryResult<'static> {
        let (statement, bindings) = select_statement(&self.table_name(table), options, criteria);
        self.run(Operation::Select, statement, bindings)
    }

    /// Selects exactly one row.
    pub fn fetch(&mut self, table: &str, criteria: &Criteria) -> Result<Row, DbError> {
        let result = self.select(table, &SelectOptions::default(), criteria);
        if let Some(error) = result.error() {
            return Err(DbError::QueryFailed {
                message: error.to_string(),
            });
        }

        let mut rows = result
            .into_rows()
            .map(|rows| rows.into_rows())
            .transpose()?
            .unwrap_or_default();
        match rows.len() {
            0 => Err(DbError::ObjectDoesNotExist {
                table: table.to_string(),
            }),
            1 => Ok(rows.remove(0)),
            _ => Err(DbError::MultipleObjectsReturned {
                table: table.to_string(),
            }),
        }
    }

    pub fn insert(&mut self, table: &str, values: &Values) -> QueryResult<'static> {
        let (statement, bindings) = insert_statement(&self.table_name(table), values);
        self.run(Operation::Insert, statement, bindings)
    }

    /// Updates matching rows. Without values nothing is sent to the backend and the
    /// result is failed.
    pub fn update(&mut self, table: &str, values: &Values, criteria: &Criteria) -> QueryResult<'static> {
        let table = self.table_name(table);
        match update_statement(&table, values, criteria) {
            Some((statement, bindings)) => self.run(Operation::Update, statement, bindings),
            None => QueryResult::failed(
                format!("UPDATE {};", table),
                Bindings::new(),
                DbError::QueryFailed {
                    message: "no values given for update".to_string(),
                },
            ),
        }
    }

    pub fn delete(&mut self, table: &str, criteria: &Criteria) -> QueryResult<'static> {
        let (statement, bindings) = delete_statement(&self.table_name(table), criteria);
        self.run(Operation::Delete, statement, bindings)
    }

    /// Runs a caller-written statement in its own transaction.
    pub fn raw(&mut self, statement: &str, bindings: Bindings) -> QueryResult<'static> {
        self.run(Operation::Raw, raw_statement(statement), bindings)
    }

    pub fn aggregate(
        &mut self,
        function: AggregateFunction,
        column: &str,
        table: &str,
        criteria: &Criteria,
    ) -> QueryResult<'static> {
        let (statement, bindings) =
            aggregate_statement(function.sql_name(), column, &self.table_name(table), criteria);
        self.run(Operation::Aggregate(function), statement, bindings)
    }

    pub fn average(&mut self, column: &str, table: &str, criteria: &Criteria) -> QueryResult<'static> {
        self.aggregate(AggregateFunction::Average, column, table, criteria)
    }

    /// Counts rows by their `id` column.
    pub fn count(&mut self, table: &str, criteria: &Criteria) -> QueryResult<'static> {
        self.count_by(DEFAULT_COUNT_COLUMN, table, criteria)
    }

    pub fn count_by(&mut self, column: &str, table: &str, criteria: &Criteria) -> QueryResult<'static> {
        self.aggregate(AggregateFunction::Count, column, table, criteria)
    }

    pub fn max(&mut self, column: &str, table: &str, criteria: &Criteria) -> QueryResult<'static> {
        self.aggregate(AggregateFunction::Max, column, table, criteria)
    }

    pub fn min(&mut self, column: &str, table: &str, criteria: &Criteria) -> QueryResult<'static> {
        self.aggregate(AggregateFunction::Min, column, table, criteria)
    }

    pub fn sum(&mut self, column: &str, table: &str, criteria: &Criteria) -> QueryResult<'static> {
        self.aggregate(AggregateFunction::Sum, column, table, criteria)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.backend.backend_name())
            .field("url", &self.backend.url())
            .field("naming", &self.naming)
            .field("debug", &self.is_debug())
            .finish()
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Database {}:{}>",
            self.backend.backend_name(),
            self.backend.database_name()
        )
    }
}

#[cfg(all(test, feature = "backend-sqlite"))]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;
    use rstest::rstest;

    #[rstest]
    #[case(DatabaseOptions::new(), "page")]
    #[case(DatabaseOptions::new().prefix("test"), "test_page")]
    #[case(DatabaseOptions::new().prefix(""), "page")]
    #[case(DatabaseOptions::new().naming(|t| format!("{}s", t)), "pages")]
    fn test_table_naming(#[case] options: DatabaseOptions, #[case] expected: &str) {
        let db = Database::with_options(Box::new(SqliteBackend::memory()), options);
        assert_eq!(db.table_name("page"), expected);
    }

    #[rstest]
    fn test_display() {
        let db = Database::new(Box::new(SqliteBackend::new("tmp.db")));
        assert_eq!(db.to_string(), "<Database sqlite:tmp.db>");
    }

    #[rstest]
    fn test_debug_installs_observer() {
        let db = Database::with_options(
            Box::new(SqliteBackend::memory()),
            DatabaseOptions::new().debug(true),
        );
        assert!(db.is_debug());
        assert!(!Database::new(Box::new(SqliteBackend::memory())).is_debug());
    }

    #[rstest]
    fn test_update_without_values_does_not_touch_backend() {
        let mut db = Database::new(Box::new(SqliteBackend::new("/nonexistent/dir/never.db")));
        let result = db.update("page", &Values::new(), &Criteria::new().with("id", 1));
        assert!(!result.is_success());
        assert!(matches!(result.error(), Some(DbError::QueryFailed { .. })));
    }

    #[rstest]
    fn test_raw_against_missing_table_fails_cleanly() {
        let mut db = Database::new(Box::new(SqliteBackend::memory()));
        let result = db.raw("SELECT * FROM nonexistent_table", Bindings::new());
        assert!(!result.is_success());
        assert_eq!(result.statement(), "SELECT * FROM nonexistent_table;");
    }
}
