use std::error::Error;

use clap::Args;
use db::Database;

use crate::commands::{Execute, FILTER_HELP};
use crate::criteria::{criteria_from, parse_filter, Filter};
use crate::output::RowsOutput;

/// Fetch exactly one row, failing when none or several match
#[derive(Args, Debug)]
#[command(after_help = FILTER_HELP)]
pub struct FetchCmd {
    /// Table to read (the configured prefix is applied)
    pub table: String,

    /// Filter rows (column=value, column>value, column~pattern)
    #[arg(short = 'w', long = "where", value_name = "EXPR", required = true, value_parser = parse_filter)]
    pub filters: Vec<Filter>,
}

impl Execute for FetchCmd {
    type Output = RowsOutput;

    fn execute(self, db: &mut Database) -> Result<Self::Output, Box<dyn Error>> {
        let row = db.fetch(&self.table, &criteria_from(&self.filters))?;
        Ok(RowsOutput::from_row(&row))
    }
}
