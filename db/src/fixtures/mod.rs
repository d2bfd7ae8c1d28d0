//! SQL fixtures for tests, loaded at compile time with `include_str!`.
//!
//! ## Available Fixtures
//!
//! - [`PAGES`] - A `page` table with three rows

/// Page table fixture.
///
/// Contains:
/// - columns `id INTEGER PRIMARY KEY`, `title TEXT`, `popularity REAL`
/// - 3 rows: `Page 1`/`Page 2`/`Page 3` with popularity 1.0, 2.0 and 3.0
///
/// The table name is the `{table}` placeholder; see [`pages`].
pub const PAGES: &str = include_str!("pages.sql");

/// The page fixture creating `table`.
pub fn pages(table: &str) -> String {
    PAGES.replace("{table}", table)
}
