//! Parsing of `-w` filters and `-s` assignments into facade criteria and values.

use std::sync::LazyLock;

use regex::Regex;

use db::{Criteria, Criterion, Expression, Value, Values};

static FILTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_.]*)\s*(!=|<>|>=|<=|=|>|<|~)\s*(.*)$")
        .expect("filter pattern is valid")
});

/// One `-w` argument: `column=value` is an equality binding, any other operator an
/// expression. `column~pattern` is a LIKE match.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub criterion: Criterion,
}

pub fn parse_filter(raw: &str) -> Result<Filter, String> {
    let captures = FILTER.captures(raw).ok_or_else(|| {
        format!(
            "invalid filter '{}': expected column{{=,!=,<>,>=,<=,>,<}}value or column~pattern",
            raw
        )
    })?;

    let column = captures[1].to_string();
    let operator = &captures[2];
    let value = &captures[3];

    let criterion = match operator {
        "=" => Criterion::Equals(Value::infer(value)),
        "~" => Criterion::Expression(Expression::like(value)),
        op => Criterion::Expression(Expression::new(op, Value::infer(value))),
    };
    Ok(Filter { column, criterion })
}

/// One `-s`/`-b` argument: `column=value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
}

pub fn parse_assignment(raw: &str) -> Result<Assignment, String> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid assignment '{}': expected column=value", raw))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("invalid assignment '{}': missing column", raw));
    }
    Ok(Assignment {
        column: column.to_string(),
        value: Value::infer(value),
    })
}

pub fn criteria_from(filters: &[Filter]) -> Criteria {
    let mut criteria = Criteria::new();
    for filter in filters {
        criteria.insert(filter.column.clone(), filter.criterion.clone());
    }
    criteria
}

pub fn values_from(assignments: &[Assignment]) -> Values {
    let mut values = Values::new();
    for assignment in assignments {
        values.insert(assignment.column.clone(), assignment.value.clone());
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("id=3", "id", Criterion::Equals(Value::Integer(3)))]
    #[case("title = Page 1", "title", Criterion::Equals(Value::Text("Page 1".into())))]
    #[case("popularity>1.0", "popularity", Criterion::Expression(Expression::gt(1.0)))]
    #[case("popularity>=2", "popularity", Criterion::Expression(Expression::gte(2)))]
    #[case("popularity<=2", "popularity", Criterion::Expression(Expression::lte(2)))]
    #[case("id!=1", "id", Criterion::Expression(Expression::not_equals(1)))]
    #[case("id<>1", "id", Criterion::Expression(Expression::new("<>", 1)))]
    #[case("title~Page%", "title", Criterion::Expression(Expression::like("Page%")))]
    #[case("deleted_at=null", "deleted_at", Criterion::Equals(Value::Null))]
    fn test_parse_filter(#[case] raw: &str, #[case] column: &str, #[case] criterion: Criterion) {
        let filter = parse_filter(raw).unwrap();
        assert_eq!(filter.column, column);
        assert_eq!(filter.criterion, criterion);
    }

    #[rstest]
    #[case("popularity")]
    #[case("=3")]
    #[case("1id=3")]
    fn test_parse_filter_rejects(#[case] raw: &str) {
        assert!(parse_filter(raw).is_err());
    }

    #[rstest]
    fn test_parse_assignment() {
        let assignment = parse_assignment("title=a=b").unwrap();
        assert_eq!(assignment.column, "title");
        assert_eq!(assignment.value, Value::Text("a=b".into()));
        assert_eq!(parse_assignment("popularity=2.5").unwrap().value, Value::Real(2.5));
        assert!(parse_assignment("title").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[rstest]
    fn test_repeated_column_keeps_last_filter() {
        let filters = vec![parse_filter("id=1").unwrap(), parse_filter("id=2").unwrap()];
        let criteria = criteria_from(&filters);
        assert_eq!(criteria.len(), 1);
        assert_eq!(
            criteria.iter().next().map(|(_, c)| c.clone()),
            Some(Criterion::Equals(Value::Integer(2)))
        );
    }
}
