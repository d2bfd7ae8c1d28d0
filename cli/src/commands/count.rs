use std::error::Error;

use clap::Args;
use db::database::DEFAULT_COUNT_COLUMN;
use db::{Database, Value};

use crate::commands::{succeeded, Execute, FilterArgs, FILTER_HELP};
use crate::output::ValueOutput;

/// Count rows in a table
#[derive(Args, Debug)]
#[command(after_help = FILTER_HELP)]
pub struct CountCmd {
    /// Table to count (the configured prefix is applied)
    pub table: String,

    /// Column passed to count()
    #[arg(long, default_value = DEFAULT_COUNT_COLUMN)]
    pub column: String,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl Execute for CountCmd {
    type Output = ValueOutput;

    fn execute(self, db: &mut Database) -> Result<Self::Output, Box<dyn Error>> {
        let result = succeeded(db.count_by(&self.column, &self.table, &self.filter.criteria()))?;
        Ok(ValueOutput {
            function: "count".to_string(),
            statement: result.statement().to_string(),
            value: result.aggregate().cloned().unwrap_or(Value::Null),
        })
    }
}
