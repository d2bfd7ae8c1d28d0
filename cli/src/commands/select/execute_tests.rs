//! Execute tests for select command.

#[cfg(test)]
mod tests {
    use super::super::SelectCmd;
    use crate::commands::{Execute, FilterArgs};
    use crate::criteria::parse_filter;
    use crate::output::{OutputFormat, Outputable};
    use db::test_utils::seeded_sqlite;
    use rstest::rstest;

    fn select(filters: &[&str]) -> SelectCmd {
        SelectCmd {
            table: "page".to_string(),
            columns: vec![],
            filter: FilterArgs {
                filters: filters.iter().map(|f| parse_filter(f).unwrap()).collect(),
            },
            order_by: None,
            limit: None,
        }
    }

    #[rstest]
    fn test_select_all() {
        let (_file, mut db) = seeded_sqlite();
        let output = select(&[]).execute(&mut db).unwrap();
        assert_eq!(output.len(), 3);
    }

    #[rstest]
    #[case(&["popularity>1.0"], 2)]
    #[case(&["id=2"], 1)]
    #[case(&["title~%3"], 1)]
    #[case(&["popularity>=2", "popularity<3"], 1)]
    #[case(&["title=missing"], 0)]
    fn test_select_filtered(#[case] filters: &[&str], #[case] expected: usize) {
        let (_file, mut db) = seeded_sqlite();
        let output = select(filters).execute(&mut db).unwrap();
        assert_eq!(output.len(), expected);
    }

    #[rstest]
    fn test_select_columns_order_and_limit_as_csv() {
        let (_file, mut db) = seeded_sqlite();
        let cmd = SelectCmd {
            columns: vec!["title".to_string()],
            order_by: Some("popularity DESC".to_string()),
            limit: Some(2),
            ..select(&[])
        };
        let output = cmd.execute(&mut db).unwrap();
        assert_eq!(output.format(OutputFormat::Csv), "title\nPage 3\nPage 2\n");
    }

    #[rstest]
    fn test_select_missing_table_fails() {
        let (_file, mut db) = seeded_sqlite();
        let cmd = SelectCmd {
            table: "absent".to_string(),
            ..select(&[])
        };
        let err = cmd.execute(&mut db).unwrap_err();
        assert!(err.to_string().contains("test_absent"));
    }
}
