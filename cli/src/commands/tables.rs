use std::error::Error;

use clap::Args;
use db::Database;

use crate::commands::Execute;
use crate::output::TablesOutput;

/// List the tables in the database
#[derive(Args, Debug)]
pub struct TablesCmd {}

impl Execute for TablesCmd {
    type Output = TablesOutput;

    fn execute(self, db: &mut Database) -> Result<Self::Output, Box<dyn Error>> {
        Ok(TablesOutput {
            tables: db.table_names()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::test_utils::{seeded_sqlite, TestDb};
    use rstest::rstest;

    #[rstest]
    fn test_lists_seeded_table() {
        let (_file, mut db) = seeded_sqlite();
        let output = TablesCmd {}.execute(&mut db).unwrap();
        assert_eq!(output.tables, vec!["test_page".to_string()]);
    }

    #[rstest]
    fn test_empty_database() {
        let file = TestDb::empty();
        let mut db = file.database(Default::default());
        let output = TablesCmd {}.execute(&mut db).unwrap();
        assert!(output.tables.is_empty());
    }
}
