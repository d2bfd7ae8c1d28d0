//! Output formatting for command results.
//!
//! Supports multiple output formats: table (human-readable), JSON, CSV, and toon.

use clap::ValueEnum;
use serde::Serialize;

use db::{Dataset, DbError, Row, Set, Value};

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Comma-separated values with a header line
    Csv,
    /// Token-efficient toon format
    Toon,
}

/// Trait for types that can be formatted for output
pub trait Outputable: Serialize {
    /// Format as a human-readable table
    fn to_table(&self) -> String;

    /// The same data as a dataset, for CSV output
    fn to_dataset(&self) -> Dataset;

    /// Format according to the specified output format
    fn format(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => self.to_table(),
            OutputFormat::Json => serde_json::to_string_pretty(self).unwrap_or_default(),
            OutputFormat::Csv => self.to_dataset().to_csv().unwrap_or_default(),
            OutputFormat::Toon => {
                let json_value = serde_json::to_value(self).unwrap_or_default();
                toon::encode(&json_value, None)
            }
        }
    }
}

/// Left-aligns each field to its column width.
fn render_line(fields: &[String], widths: &[usize]) -> String {
    fields
        .iter()
        .zip(widths)
        .map(|(field, width)| format!("{:<width$}", field, width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

/// Rows returned by `select`, `fetch` and row-returning statements.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct RowsOutput {
    dataset: Dataset,
}

impl RowsOutput {
    pub fn from_set(mut set: Set<'static>) -> Result<Self, DbError> {
        Ok(Self {
            dataset: set.as_dataset()?,
        })
    }

    pub fn from_row(row: &Row) -> Self {
        Self {
            dataset: row.as_dataset(),
        }
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl Outputable for RowsOutput {
    fn to_table(&self) -> String {
        let headers = self.dataset.headers();
        if headers.is_empty() {
            return "No rows.".to_string();
        }

        let cells: Vec<Vec<String>> = self
            .dataset
            .rows()
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut lines = vec![render_line(headers, &widths)];
        lines.push(
            widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &cells {
            lines.push(render_line(row, &widths));
        }
        lines.push(String::new());
        lines.push(format!("({} row{})", self.len(), if self.len() == 1 { "" } else { "s" }));
        lines.join("\n")
    }

    fn to_dataset(&self) -> Dataset {
        self.dataset.clone()
    }
}

/// A single value from `count` or `aggregate`.
#[derive(Debug, Serialize)]
pub struct ValueOutput {
    pub function: String,
    pub statement: String,
    pub value: Value,
}

impl Outputable for ValueOutput {
    fn to_table(&self) -> String {
        format!("{}: {}", self.function, self.value)
    }

    fn to_dataset(&self) -> Dataset {
        Dataset::from_record([(self.function.as_str(), self.value.clone())])
    }
}

/// Rows affected by `insert`, `update`, `delete` and `raw`.
#[derive(Debug, Serialize)]
pub struct ExecutionOutput {
    pub statement: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<i64>,
}

impl Outputable for ExecutionOutput {
    fn to_table(&self) -> String {
        let mut lines = vec![format!(
            "{} row{} affected",
            self.count,
            if self.count == 1 { "" } else { "s" }
        )];
        if let Some(id) = self.last_id {
            lines.push(format!("Last id: {}", id));
        }
        lines.join("\n")
    }

    fn to_dataset(&self) -> Dataset {
        Dataset::from_record([
            ("count", Value::from(self.count as i64)),
            ("last_id", Value::from(self.last_id)),
        ])
    }
}

/// Table names reported by the backend.
#[derive(Debug, Serialize)]
pub struct TablesOutput {
    pub tables: Vec<String>,
}

impl Outputable for TablesOutput {
    fn to_table(&self) -> String {
        if self.tables.is_empty() {
            return "No tables found.".to_string();
        }
        let mut lines = vec![format!("Found {} table(s):", self.tables.len()), String::new()];
        lines.extend(self.tables.iter().map(|table| format!("  {}", table)));
        lines.join("\n")
    }

    fn to_dataset(&self) -> Dataset {
        Dataset::from_column("table", self.tables.iter().map(|table| Value::from(table.as_str())))
    }
}
