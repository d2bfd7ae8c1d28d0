use std::error::Error;

use clap::Args;
use db::Database;

use crate::commands::{execution_output, Execute};
use crate::criteria::{parse_assignment, values_from, Assignment};
use crate::output::ExecutionOutput;

/// Insert one row
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  recordkit insert page -s title='Page 4' -s popularity=4.0
")]
pub struct InsertCmd {
    /// Table to write (the configured prefix is applied)
    pub table: String,

    /// Column value (repeatable)
    #[arg(short = 's', long = "set", value_name = "COLUMN=VALUE", required = true, value_parser = parse_assignment)]
    pub values: Vec<Assignment>,
}

impl Execute for InsertCmd {
    type Output = ExecutionOutput;

    fn execute(self, db: &mut Database) -> Result<Self::Output, Box<dyn Error>> {
        execution_output(db.insert(&self.table, &values_from(&self.values)))
    }
}
