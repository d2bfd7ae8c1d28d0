//! One request/response cycle against a backend.

use std::fmt;

use tracing::info;

use crate::backend::{Backend, Bindings};
use crate::error::DbError;
use crate::result::QueryResult;

/// Aggregate functions supported by the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Average,
    Count,
    Max,
    Min,
    Sum,
}

impl AggregateFunction {
    /// Name of the SQL function.
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunction::Average => "avg",
            AggregateFunction::Count => "count",
            AggregateFunction::Max => "max",
            AggregateFunction::Min => "min",
            AggregateFunction::Sum => "sum",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
    Raw,
    Aggregate(AggregateFunction),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Select => write!(f, "select"),
            Operation::Insert => write!(f, "insert"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Raw => write!(f, "raw"),
            Operation::Aggregate(function) => write!(f, "{}", function.sql_name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Created,
    Running,
    Complete,
}

/// Receives every statement just before it runs.
pub trait QueryObserver: Send + Sync {
    fn before_execute(&self, operation: Operation, statement: &str, bindings: &Bindings);
}

/// Emits one `info` event per statement on the `db::query` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl QueryObserver for TracingObserver {
    fn before_execute(&self, operation: Operation, statement: &str, bindings: &Bindings) {
        info!(
            target: "db::query",
            %operation,
            %statement,
            bindings = ?bindings.params(),
            "executing query"
        );
    }
}

pub struct Query {
    operation: Operation,
    statement: String,
    bindings: Bindings,
    state: QueryState,
    result: Option<QueryResult<'static>>,
}

impl Query {
    pub fn new(operation: Operation, statement: impl Into<String>, bindings: Bindings) -> Self {
        Self {
            operation,
            statement: statement.into(),
            bindings,
            state: QueryState::Created,
            result: None,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn result(&self) -> Option<&QueryResult<'static>> {
        self.result.as_ref()
    }

    /// Connects, executes, disconnects and keeps the result.
    ///
    /// Running a completed query returns the stored result without executing again.
    /// The backend is disconnected afterwards even when it was already open.
    pub fn run(
        &mut self,
        backend: &mut dyn Backend,
        observer: Option<&dyn QueryObserver>,
    ) -> &QueryResult<'static> {
        let result = match self.result.take() {
            Some(result) => result,
            None => {
                self.state = QueryState::Running;
                if let Some(observer) = observer {
                    observer.before_execute(self.operation, &self.statement, &self.bindings);
                }
                let result = self.execute(backend);
                backend.disconnect();
                result
            }
        };

        self.state = QueryState::Complete;
        self.result.insert(result)
    }

    fn execute(&self, backend: &mut dyn Backend) -> QueryResult<'static> {
        if let Err(error) = backend.connect() {
            return QueryResult::failed(&self.statement, self.bindings.clone(), error);
        }

        let mut session = match backend.session() {
            Ok(session) => session,
            Err(error) => return QueryResult::failed(&self.statement, self.bindings.clone(), error),
        };

        let result = match self.operation {
            Operation::Aggregate(_) => session.aggregate(&self.statement, &self.bindings),
            Operation::Select => session
                .query(&self.statement, false, &self.bindings)
                .detach(),
            Operation::Insert | Operation::Update | Operation::Delete | Operation::Raw => {
                session.raw(&self.statement, &self.bindings)
            }
        };
        session.close();
        result
    }

    /// Takes the stored result, or a failed one when the query never ran.
    pub fn into_result(self) -> QueryResult<'static> {
        match self.result {
            Some(result) => result,
            None => QueryResult::failed(
                self.statement,
                self.bindings,
                DbError::QueryFailed {
                    message: "query has not been run".to_string(),
                },
            ),
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("operation", &self.operation)
            .field("statement", &self.statement)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(all(test, feature = "backend-sqlite"))]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;
    use crate::value::Value;
    use rstest::{fixture, rstest};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<(Operation, String)>>,
    }

    impl QueryObserver for RecordingObserver {
        fn before_execute(&self, operation: Operation, statement: &str, _bindings: &Bindings) {
            self.seen
                .lock()
                .unwrap()
                .push((operation, statement.to_string()));
        }
    }

    #[fixture]
    fn backend() -> (TempDir, SqliteBackend) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("query.db");
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute_batch(
                "CREATE TABLE page (id INTEGER PRIMARY KEY, title TEXT, popularity REAL);
                 INSERT INTO page (title, popularity) VALUES ('Page 1', 1.0), ('Page 2', 2.0);",
            )
            .unwrap();
        (dir, SqliteBackend::new(path.to_string_lossy()))
    }

    #[rstest]
    fn test_select_runs_and_disconnects(backend: (TempDir, SqliteBackend)) {
        let (_dir, mut backend) = backend;
        let mut query = Query::new(Operation::Select, "SELECT * FROM page;", Bindings::new());
        assert_eq!(query.state(), QueryState::Created);

        let result = query.run(&mut backend, None);
        assert!(result.is_success());
        assert_eq!(result.count(), Some(2));
        assert_eq!(query.state(), QueryState::Complete);
        assert!(!backend.is_open());
    }

    #[rstest]
    fn test_aggregate_routes_to_aggregate(backend: (TempDir, SqliteBackend)) {
        let (_dir, mut backend) = backend;
        let mut query = Query::new(
            Operation::Aggregate(AggregateFunction::Sum),
            "SELECT sum(popularity) AS agg FROM page;",
            Bindings::new(),
        );
        let result = query.run(&mut backend, None);
        assert_eq!(result.aggregate(), Some(&Value::Real(3.0)));
    }

    #[rstest]
    fn test_completed_query_is_not_rerun(backend: (TempDir, SqliteBackend)) {
        let (_dir, mut backend) = backend;
        let observer = RecordingObserver::default();
        let mut query = Query::new(
            Operation::Insert,
            "INSERT INTO page (title) VALUES (:title);",
            Bindings::new().with("title", "Page 3"),
        );

        assert_eq!(query.run(&mut backend, Some(&observer)).last_id(), Some(3));
        assert_eq!(query.run(&mut backend, Some(&observer)).last_id(), Some(3));
        assert_eq!(observer.seen.lock().unwrap().len(), 1);
        assert_eq!(observer.seen.lock().unwrap()[0].0, Operation::Insert);
    }

    #[rstest]
    fn test_connection_failure_is_captured() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing").join("nested.db");
        let mut backend = SqliteBackend::new(missing.to_string_lossy());
        let mut query = Query::new(Operation::Select, "SELECT 1;", Bindings::new());
        let result = query.run(&mut backend, None);
        assert!(matches!(result.error(), Some(DbError::ConnectionFailed { .. })));
    }

    #[rstest]
    fn test_unrun_query_result_is_failed() {
        let query = Query::new(Operation::Raw, "SELECT 1;", Bindings::new());
        let result = query.into_result();
        assert!(!result.is_success());
    }

    #[rstest]
    #[case(Operation::Aggregate(AggregateFunction::Average), "avg")]
    #[case(Operation::Select, "select")]
    #[case(Operation::Raw, "raw")]
    fn test_operation_display(#[case] operation: Operation, #[case] expected: &str) {
        assert_eq!(operation.to_string(), expected);
    }
}
