use std::error::Error;

use clap::Args;
use db::Database;

use crate::commands::{execution_output, Execute, FilterArgs, FILTER_HELP};
use crate::criteria::{parse_assignment, values_from, Assignment};
use crate::output::ExecutionOutput;

/// Update matching rows
#[derive(Args, Debug)]
#[command(after_help = FILTER_HELP)]
pub struct UpdateCmd {
    /// Table to write (the configured prefix is applied)
    pub table: String,

    /// New column value (repeatable)
    #[arg(short = 's', long = "set", value_name = "COLUMN=VALUE", required = true, value_parser = parse_assignment)]
    pub values: Vec<Assignment>,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl Execute for UpdateCmd {
    type Output = ExecutionOutput;

    fn execute(self, db: &mut Database) -> Result<Self::Output, Box<dyn Error>> {
        execution_output(db.update(
            &self.table,
            &values_from(&self.values),
            &self.filter.criteria(),
        ))
    }
}
