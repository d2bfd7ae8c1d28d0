use std::error::Error;

use clap::Args;
use db::Database;

use crate::commands::{execution_output, Execute, FilterArgs, FILTER_HELP};
use crate::output::ExecutionOutput;

/// Delete matching rows (every row when no filter is given)
#[derive(Args, Debug)]
#[command(after_help = FILTER_HELP)]
pub struct DeleteCmd {
    /// Table to write (the configured prefix is applied)
    pub table: String,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl Execute for DeleteCmd {
    type Output = ExecutionOutput;

    fn execute(self, db: &mut Database) -> Result<Self::Output, Box<dyn Error>> {
        execution_output(db.delete(&self.table, &self.filter.criteria()))
    }
}
