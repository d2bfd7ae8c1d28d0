mod cli_tests;
mod execute;
mod execute_tests;

use clap::Args;

use crate::commands::FilterArgs;

/// Select rows from a table
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  recordkit select page                             # Every row
  recordkit select page -c id,title -w popularity>1 # Some columns of popular pages
  recordkit select page --order-by 'popularity DESC' --limit 10 -o csv
")]
pub struct SelectCmd {
    /// Table to read (the configured prefix is applied)
    pub table: String,

    /// Columns to return, comma-separated (default: all)
    #[arg(short, long, value_delimiter = ',')]
    pub columns: Vec<String>,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// ORDER BY clause, e.g. "popularity DESC"
    #[arg(long)]
    pub order_by: Option<String>,

    /// Maximum number of rows
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,
}
