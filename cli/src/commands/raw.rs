use std::error::Error;

use clap::Args;
use db::{Bindings, Database};

use crate::commands::{execution_output, Execute};
use crate::criteria::{parse_assignment, Assignment};
use crate::output::ExecutionOutput;

/// Run a statement in its own transaction
///
/// Table names are used verbatim; the prefix is not applied.
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  recordkit raw 'DELETE FROM test_page WHERE popularity < 1'
  recordkit raw 'UPDATE page SET title = :title WHERE id = :id' -b title=Home -b id=1
")]
pub struct RawCmd {
    pub statement: String,

    /// Named parameter value for :name in the statement (repeatable)
    #[arg(short = 'b', long = "bind", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub bindings: Vec<Assignment>,
}

impl Execute for RawCmd {
    type Output = ExecutionOutput;

    fn execute(self, db: &mut Database) -> Result<Self::Output, Box<dyn Error>> {
        let bindings: Bindings = self
            .bindings
            .into_iter()
            .map(|binding| (binding.column, binding.value))
            .collect();
        execution_output(db.raw(&self.statement, bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_macros::parse_argv;
    use db::test_utils::seeded_sqlite;
    use rstest::rstest;

    crate::rejected_argv_test! {
        test_name: test_requires_statement,
        argv: ["raw"],
        mentions: "<STATEMENT>",
    }

    #[rstest]
    fn test_raw_with_bindings() {
        let (_file, mut db) = seeded_sqlite();
        let cmd = RawCmd {
            statement: "UPDATE test_page SET title = :title WHERE id = :id".to_string(),
            bindings: vec![
                parse_assignment("title=Home").unwrap(),
                parse_assignment("id=1").unwrap(),
            ],
        };
        let output = cmd.execute(&mut db).unwrap();
        assert_eq!(output.count, 1);
        assert_eq!(output.statement, "UPDATE test_page SET title = :title WHERE id = :id;");
    }

    crate::seeded_failure_test! {
        test_name: test_raw_failure_is_an_error,
        cmd: RawCmd {
            statement: "SELECT * FROM nonexistent_table".to_string(),
            bindings: vec![],
        },
        message: "nonexistent_table",
    }

    #[rstest]
    fn test_command_dispatch() {
        let (_file, mut db) = seeded_sqlite();
        let args = parse_argv(&["-o", "csv", "count", "page"]).unwrap();
        let output = args.command.run(&mut db, args.format).unwrap();
        assert_eq!(output, "count\n3\n");
    }
}
