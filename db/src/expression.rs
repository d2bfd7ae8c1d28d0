//! Comparison expressions used in place of plain values in criteria.

use std::fmt;

use crate::value::Value;

/// A deferred comparison such as `>= 2.0`.
///
/// When a criteria entry holds an `Expression` the operator and the literal value are
/// rendered into the WHERE clause directly instead of being bound as `column = :column`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    operator: String,
    value: Value,
}

impl Expression {
    pub fn new(operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            operator: operator.into(),
            value: value.into(),
        }
    }

    pub fn equals(value: impl Into<Value>) -> Self {
        Self::new("=", value)
    }

    pub fn not_equals(value: impl Into<Value>) -> Self {
        Self::new("!=", value)
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        Self::new(">", value)
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        Self::new(">=", value)
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        Self::new("<", value)
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        Self::new("<=", value)
    }

    pub fn like(pattern: impl Into<String>) -> Self {
        Self::new("LIKE", Value::Text(pattern.into()))
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.value.to_sql_literal())
    }
}
