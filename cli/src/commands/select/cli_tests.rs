//! CLI parsing tests for select command using the test DSL.

#[cfg(test)]
mod tests {
    use crate::criteria::parse_filter;
    use crate::test_macros::parse_argv;
    use rstest::rstest;

    crate::rejected_argv_test! {
        test_name: test_requires_table,
        argv: ["select"],
        mentions: "<TABLE>",
    }

    crate::parse_test! {
        test_name: test_defaults,
        argv: ["select", "page"],
        variant: Select,
        fields: {
            table: "page".to_string(),
            columns: Vec::<String>::new(),
            order_by: None,
            limit: None,
        },
    }

    crate::parse_test! {
        test_name: test_with_columns,
        argv: ["select", "page", "-c", "id,title"],
        variant: Select,
        fields: {
            columns: vec!["id".to_string(), "title".to_string()],
        },
    }

    crate::parse_test! {
        test_name: test_with_order_by_and_limit,
        argv: ["select", "page", "--order-by", "popularity DESC", "--limit", "5"],
        variant: Select,
        fields: {
            order_by: Some("popularity DESC".to_string()),
            limit: Some(5),
        },
    }

    crate::rejected_argv_test! {
        test_name: test_limit_zero_rejected,
        argv: ["select", "page", "--limit", "0"],
        mentions: "--limit",
    }

    crate::rejected_argv_test! {
        test_name: test_malformed_filter_rejected,
        argv: ["select", "page", "-w", "popularity"],
    }

    #[rstest]
    fn test_repeated_filters() {
        let args = parse_argv(&["select", "page", "-w", "id>1", "--where", "title~Page%"]).unwrap();
        match args.command {
            crate::commands::Command::Select(cmd) => {
                assert_eq!(
                    cmd.filter.filters,
                    vec![
                        parse_filter("id>1").unwrap(),
                        parse_filter("title~Page%").unwrap()
                    ]
                );
            }
            _ => panic!("Expected Select command"),
        }
    }
}
