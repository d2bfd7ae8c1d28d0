use std::error::Error;

use db::{Database, SelectOptions};

use super::SelectCmd;
use crate::commands::{succeeded, Execute};
use crate::output::RowsOutput;

impl SelectCmd {
    fn options(&self) -> SelectOptions {
        let mut options = SelectOptions::new();
        if !self.columns.is_empty() {
            options = options.columns(self.columns.iter().cloned());
        }
        if let Some(order_by) = &self.order_by {
            options = options.order_by(order_by.clone());
        }
        if let Some(limit) = self.limit {
            options = options.limit(limit);
        }
        options
    }
}

impl Execute for SelectCmd {
    type Output = RowsOutput;

    fn execute(self, db: &mut Database) -> Result<Self::Output, Box<dyn Error>> {
        let result = succeeded(db.select(&self.table, &self.options(), &self.filter.criteria()))?;
        let rows = result.into_rows().ok_or("select returned no rows")?;
        Ok(RowsOutput::from_set(rows)?)
    }
}
