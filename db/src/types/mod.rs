//! Result containers: rows, sets of rows and tabular datasets.

mod dataset;
mod row;
mod set;

pub use dataset::{Dataset, ExportFormat};
pub use row::Row;
pub use set::Set;
