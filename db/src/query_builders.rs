//! SQL statement builders for the facade operations.
//!
//! Only identifiers (table and column names) are interpolated into statement text.
//! Values are always bound as `:name` parameters, with [`Expression`] literals as the
//! one exception.

use crate::backend::Bindings;
use crate::expression::Expression;
use crate::value::Value;

/// A single criteria entry: strict equality against a bound value, or an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Equals(Value),
    Expression(Expression),
}

impl From<Expression> for Criterion {
    fn from(expression: Expression) -> Self {
        Criterion::Expression(expression)
    }
}

impl From<Value> for Criterion {
    fn from(value: Value) -> Self {
        Criterion::Equals(value)
    }
}

/// Ordered column to criterion mapping, rendered as a WHERE clause.
///
/// Setting a column twice replaces the earlier criterion in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    entries: Vec<(String, Criterion)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a strict equality criterion.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, Criterion::Equals(value.into()));
        self
    }

    /// Adds an expression criterion such as `popularity > 1.0`.
    pub fn with_expression(mut self, column: impl Into<String>, expression: Expression) -> Self {
        self.insert(column, Criterion::Expression(expression));
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, criterion: impl Into<Criterion>) {
        let column = column.into();
        let criterion = criterion.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = criterion,
            None => self.entries.push((column, criterion)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Ordered column to value mapping for inserts and updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    entries: Vec<(String, Value)>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Builds the WHERE clause body for a set of criteria.
///
/// Equality criteria become `column = :{prefix}column` and are added to the bindings;
/// expressions are rendered inline as `column {operator} {literal}`. Entries are
/// joined with ` AND ` in insertion order.
///
/// # Examples
///
/// ```ignore
/// let criteria = Criteria::new().with("id", 3);
/// let (clause, bindings) = ConditionBuilder::new(&criteria).with_binding_prefix("c_").build();
/// // clause == Some("id = :c_id"), bindings == {c_id: 3}
/// ```
pub struct ConditionBuilder<'a> {
    criteria: &'a Criteria,
    binding_prefix: String,
}

impl<'a> ConditionBuilder<'a> {
    pub fn new(criteria: &'a Criteria) -> Self {
        Self {
            criteria,
            binding_prefix: String::new(),
        }
    }

    /// Prefix for binding names, used where the statement also binds values by column name.
    pub fn with_binding_prefix(mut self, prefix: &str) -> Self {
        self.binding_prefix = prefix.to_string();
        self
    }

    /// Returns the clause (None when there are no criteria) and its bindings.
    pub fn build(&self) -> (Option<String>, Bindings) {
        let mut bindings = Bindings::new();
        if self.criteria.is_empty() {
            return (None, bindings);
        }

        let conditions: Vec<String> = self
            .criteria
            .iter()
            .map(|(column, criterion)| match criterion {
                Criterion::Equals(value) => {
                    let name = format!("{}{}", self.binding_prefix, column);
                    let condition = format!("{} = :{}", column, name);
                    bindings.insert(name, value.clone());
                    condition
                }
                Criterion::Expression(expression) => format!("{} {}", column, expression),
            })
            .collect();

        (Some(conditions.join(" AND ")), bindings)
    }
}

/// Projection, ordering and limit for select statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    pub columns: Vec<String>,
    pub order_by: Option<String>,
    pub limit: Option<u64>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn push_where(sql: &mut String, clause: Option<String>) {
    if let Some(clause) = clause {
        sql.push_str(" WHERE ");
        sql.push_str(&clause);
    }
}

pub fn select_statement(
    table: &str,
    options: &SelectOptions,
    criteria: &Criteria,
) -> (String, Bindings) {
    let projection = if options.columns.is_empty() {
        "*".to_string()
    } else {
        options.columns.join(", ")
    };

    let mut sql = format!("SELECT {} FROM {}", projection, table);
    let (clause, bindings) = ConditionBuilder::new(criteria).build();
    push_where(&mut sql, clause);

    if let Some(order_by) = &options.order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }
    if let Some(limit) = options.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql.push(';');

    (sql, bindings)
}

pub fn insert_statement(table: &str, values: &Values) -> (String, Bindings) {
    if values.is_empty() {
        return (format!("INSERT INTO {} DEFAULT VALUES;", table), Bindings::new());
    }

    let mut bindings = Bindings::new();
    let mut columns = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (column, value) in values.iter() {
        columns.push(column.to_string());
        placeholders.push(format!(":{}", column));
        bindings.insert(column, value.clone());
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({});",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    (sql, bindings)
}

/// Criteria bindings are prefixed with `c_` so a column can be both set and matched.
/// When a value column already uses a prefixed name (`c_id` next to a criterion on
/// `id`), the prefix becomes `c1_`, `c2_` and so on until every name is unique.
/// Returns None when there is nothing to set.
pub fn update_statement(
    table: &str,
    values: &Values,
    criteria: &Criteria,
) -> Option<(String, Bindings)> {
    if values.is_empty() {
        return None;
    }

    let mut bindings = Bindings::new();
    let assignments: Vec<String> = values
        .iter()
        .map(|(column, value)| {
            bindings.insert(column, value.clone());
            format!("{} = :{}", column, column)
        })
        .collect();

    let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));
    let prefix = criteria_prefix(values, criteria);
    let (clause, criteria_bindings) = ConditionBuilder::new(criteria)
        .with_binding_prefix(&prefix)
        .build();
    push_where(&mut sql, clause);
    sql.push(';');

    bindings.extend(criteria_bindings);
    Some((sql, bindings))
}

/// First binding prefix whose criteria names are all free of value columns.
fn criteria_prefix(values: &Values, criteria: &Criteria) -> String {
    let taken = |prefix: &str| {
        criteria.iter().any(|(column, criterion)| {
            matches!(criterion, Criterion::Equals(_))
                && values.contains(&format!("{}{}", prefix, column))
        })
    };

    let mut prefix = "c_".to_string();
    let mut attempt = 0;
    while taken(&prefix) {
        attempt += 1;
        prefix = format!("c{}_", attempt);
    }
    prefix
}

pub fn delete_statement(table: &str, criteria: &Criteria) -> (String, Bindings) {
    let mut sql = format!("DELETE FROM {}", table);
    let (clause, bindings) = ConditionBuilder::new(criteria).build();
    push_where(&mut sql, clause);
    sql.push(';');
    (sql, bindings)
}

/// `SELECT {function}({column}) AS agg FROM {table}[ WHERE ...];`
pub fn aggregate_statement(
    function: &str,
    column: &str,
    table: &str,
    criteria: &Criteria,
) -> (String, Bindings) {
    let mut sql = format!("SELECT {}({}) AS agg FROM {}", function, column, table);
    let (clause, bindings) = ConditionBuilder::new(criteria).build();
    push_where(&mut sql, clause);
    sql.push(';');
    (sql, bindings)
}

/// Terminates a caller-supplied statement with `;` when it is missing.
pub fn raw_statement(statement: &str) -> String {
    let trimmed = statement.trim_end();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{};", trimmed)
    }
}
