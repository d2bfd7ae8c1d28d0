//! Command definitions and implementations.
//!
//! Each command is defined in its own module with:
//! - The command struct with clap attributes for CLI parsing
//! - An `Execute` implementation running it against the database facade

mod aggregate;
mod count;
mod delete;
mod fetch;
mod insert;
mod raw;
mod select;
mod tables;
mod update;

pub use aggregate::AggregateCmd;
pub use count::CountCmd;
pub use delete::DeleteCmd;
pub use fetch::FetchCmd;
pub use insert::InsertCmd;
pub use raw::RawCmd;
pub use select::SelectCmd;
pub use tables::TablesCmd;
pub use update::UpdateCmd;

use clap::{Args, Subcommand};
use std::error::Error;

use db::{Criteria, Database, QueryResult};

use crate::criteria::{criteria_from, parse_filter, Filter};
use crate::output::{ExecutionOutput, OutputFormat, Outputable};

/// Help text shared by commands taking `-w` filters.
pub(crate) const FILTER_HELP: &str = "\
Filters (-w, repeatable, all must match):
  column=value     equality, value bound as a parameter
  column!=value    also <>, >, >=, <, <=
  column~pattern   SQL LIKE, e.g. title~Page%
Values are typed automatically: 3 is an integer, 2.5 a real, null is NULL.";

/// Optional `-w` filters.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Filter rows (column=value, column>value, column~pattern)
    #[arg(short = 'w', long = "where", value_name = "EXPR", value_parser = parse_filter)]
    pub filters: Vec<Filter>,
}

impl FilterArgs {
    pub fn criteria(&self) -> Criteria {
        criteria_from(&self.filters)
    }
}

/// Trait for executing commands with command-specific result types.
pub trait Execute {
    type Output: Outputable;

    fn execute(self, db: &mut Database) -> Result<Self::Output, Box<dyn Error>>;
}

/// Trait for running a command and formatting its output.
pub trait CommandRunner {
    fn run(self, db: &mut Database, format: OutputFormat) -> Result<String, Box<dyn Error>>;
}

impl<T: Execute> CommandRunner for T {
    fn run(self, db: &mut Database, format: OutputFormat) -> Result<String, Box<dyn Error>> {
        let result = self.execute(db)?;
        Ok(result.format(format))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the tables in the database
    Tables(TablesCmd),

    /// Select rows from a table
    Select(SelectCmd),

    /// Fetch exactly one row, failing on zero or several matches
    Fetch(FetchCmd),

    /// Count rows in a table
    Count(CountCmd),

    /// Compute avg, max, min or sum of a column
    Aggregate(AggregateCmd),

    /// Insert one row
    Insert(InsertCmd),

    /// Update matching rows
    Update(UpdateCmd),

    /// Delete matching rows
    Delete(DeleteCmd),

    /// Run a statement in its own transaction
    Raw(RawCmd),
}

impl Command {
    /// Execute the command and return formatted output
    pub fn run(self, db: &mut Database, format: OutputFormat) -> Result<String, Box<dyn Error>> {
        match self {
            Command::Tables(cmd) => cmd.run(db, format),
            Command::Select(cmd) => cmd.run(db, format),
            Command::Fetch(cmd) => cmd.run(db, format),
            Command::Count(cmd) => cmd.run(db, format),
            Command::Aggregate(cmd) => cmd.run(db, format),
            Command::Insert(cmd) => cmd.run(db, format),
            Command::Update(cmd) => cmd.run(db, format),
            Command::Delete(cmd) => cmd.run(db, format),
            Command::Raw(cmd) => cmd.run(db, format),
        }
    }
}

/// Turns a failed result into the command's error.
pub(crate) fn succeeded(result: QueryResult<'static>) -> Result<QueryResult<'static>, Box<dyn Error>> {
    if result.is_success() {
        return Ok(result);
    }
    let statement = result.statement().to_string();
    match result.into_error() {
        Some(error) => Err(format!("{}\n  statement: {}", error, statement).into()),
        None => Err(format!("statement failed: {}", statement).into()),
    }
}

/// Output for statements that only report affected rows.
pub(crate) fn execution_output(result: QueryResult<'static>) -> Result<ExecutionOutput, Box<dyn Error>> {
    let result = succeeded(result)?;
    Ok(ExecutionOutput {
        statement: result.statement().to_string(),
        count: result.count().unwrap_or(0),
        last_id: result.last_id(),
    })
}
