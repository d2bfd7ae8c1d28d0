//! Shared test utilities for database and integration tests.
//!
//! This module provides helpers for setting up file-backed SQLite databases seeded
//! with fixture data.

use std::path::PathBuf;

use tempfile::TempDir;

use crate::backend::{Backend, SqliteBackend};
use crate::database::{Database, DatabaseOptions};
use crate::fixtures;

/// Prefix used by seeded databases; the fixture table is `test_page`.
pub const TEST_PREFIX: &str = "test";

/// A temp directory holding one SQLite file. The file is removed when dropped.
pub struct TestDb {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TestDb {
    /// Create an empty database file.
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("recordkit.db");
        rusqlite::Connection::open(&path).expect("Failed to create SQLite file");
        Self { dir, path }
    }

    /// Create a database with the page fixture loaded into `table`.
    pub fn with_pages(table: &str) -> Self {
        let db = Self::empty();
        db.execute_batch(&fixtures::pages(table));
        db
    }

    /// Run setup SQL straight through the driver.
    pub fn execute_batch(&self, sql: &str) {
        let connection = rusqlite::Connection::open(&self.path).expect("Failed to open SQLite file");
        connection
            .execute_batch(sql)
            .unwrap_or_else(|e| panic!("Failed to run setup SQL: {}", e));
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn backend(&self) -> Box<dyn Backend> {
        Box::new(SqliteBackend::new(self.path_str()))
    }

    pub fn database(&self, options: DatabaseOptions) -> Database {
        Database::with_options(self.backend(), options)
    }
}

/// A seeded `test_page` table behind a [`Database`] with the `test` prefix.
///
/// Keep the returned [`TestDb`] alive for as long as the database is used.
pub fn seeded_sqlite() -> (TestDb, Database) {
    let test_db = TestDb::with_pages(&format!("{}_page", TEST_PREFIX));
    let db = test_db.database(DatabaseOptions::new().prefix(TEST_PREFIX));
    (test_db, db)
}
