use std::error::Error;

use clap::{Args, ValueEnum};
use db::{AggregateFunction, Database, Value};

use crate::commands::{succeeded, Execute, FilterArgs, FILTER_HELP};
use crate::output::ValueOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AggregateKind {
    Avg,
    Max,
    Min,
    Sum,
}

impl From<AggregateKind> for AggregateFunction {
    fn from(kind: AggregateKind) -> Self {
        match kind {
            AggregateKind::Avg => AggregateFunction::Average,
            AggregateKind::Max => AggregateFunction::Max,
            AggregateKind::Min => AggregateFunction::Min,
            AggregateKind::Sum => AggregateFunction::Sum,
        }
    }
}

/// Compute avg, max, min or sum of a column
///
/// An average over no rows is NULL.
#[derive(Args, Debug)]
#[command(after_help = FILTER_HELP)]
pub struct AggregateCmd {
    #[arg(value_enum)]
    pub function: AggregateKind,

    pub column: String,

    /// Table to read (the configured prefix is applied)
    pub table: String,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl Execute for AggregateCmd {
    type Output = ValueOutput;

    fn execute(self, db: &mut Database) -> Result<Self::Output, Box<dyn Error>> {
        let function = AggregateFunction::from(self.function);
        let result = succeeded(db.aggregate(
            function,
            &self.column,
            &self.table,
            &self.filter.criteria(),
        ))?;
        Ok(ValueOutput {
            function: function.sql_name().to_string(),
            statement: result.statement().to_string(),
            value: result.aggregate().cloned().unwrap_or(Value::Null),
        })
    }
}
