use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use super::dataset::{Dataset, ExportFormat, OrderedRecord};
use crate::error::DbError;
use crate::value::Value;

/// One result row: attribute names paired with values, in column order.
///
/// Attribute names are shared between all rows of a [`Set`](super::Set).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    attributes: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(attributes: impl Into<Arc<[String]>>, values: Vec<Value>) -> Result<Self, DbError> {
        let attributes = attributes.into();
        if attributes.len() != values.len() {
            return Err(DbError::RowShape {
                attributes: attributes.len(),
                values: values.len(),
            });
        }
        Ok(Self { attributes, values })
    }

    /// Looks up a value by attribute name (case-sensitive).
    pub fn try_get(&self, name: &str) -> Result<&Value, DbError> {
        let mut matches = self
            .attributes
            .iter()
            .enumerate()
            .filter(|(_, attribute)| attribute.as_str() == name);

        let (index, _) = matches.next().ok_or_else(|| DbError::InvalidField {
            name: name.to_string(),
        })?;
        if matches.next().is_some() {
            return Err(DbError::AmbiguousField {
                name: name.to_string(),
            });
        }
        Ok(&self.values[index])
    }

    /// Like [`Row::try_get`], but missing and ambiguous names give `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.try_get(name).ok()
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a Value) -> &'a Value {
        self.get(name).unwrap_or(default)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attributes.iter().any(|attribute| attribute == name)
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub(crate) fn shared_attributes(&self) -> &Arc<[String]> {
        &self.attributes
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Duplicate attribute names keep the last value.
    pub fn as_dict(&self) -> HashMap<String, Value> {
        self.attributes
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    pub fn as_ordered_dict(&self) -> Vec<(String, Value)> {
        self.attributes
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    pub fn as_dataset(&self) -> Dataset {
        Dataset::from_record(
            self.attributes
                .iter()
                .map(String::as_str)
                .zip(self.values.iter().cloned()),
        )
    }

    pub fn export(&self, format: ExportFormat) -> Result<String, DbError> {
        self.as_dataset().export(format)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OrderedRecord {
            headers: &self.attributes,
            values: &self.values,
        }
        .serialize(serializer)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Row {}>", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn row() -> Row {
        Row::new(
            vec!["id".to_string(), "title".to_string(), "popularity".to_string()],
            vec![
                Value::Integer(1),
                Value::Text("Page 1".into()),
                Value::Real(1.0),
            ],
        )
        .unwrap()
    }

    #[rstest]
    fn test_lookup_by_name(row: Row) {
        assert_eq!(row.get("title"), Some(&Value::Text("Page 1".into())));
        assert_eq!(row.get_i64("id"), Some(1));
        assert_eq!(row.get_f64("popularity"), Some(1.0));
        assert_eq!(row.get_str("title"), Some("Page 1"));
        assert!(row.has("id"));
        assert!(!row.has("Title"));
    }

    #[rstest]
    fn test_unknown_field(row: Row) {
        assert!(matches!(row.try_get("nope"), Err(DbError::InvalidField { .. })));
        assert_eq!(row.get("nope"), None);
        assert_eq!(row.get_or("nope", &Value::Integer(0)), &Value::Integer(0));
    }

    #[rstest]
    fn test_ambiguous_field() {
        let row = Row::new(
            vec!["id".to_string(), "id".to_string()],
            vec![Value::Integer(1), Value::Integer(2)],
        )
        .unwrap();
        let err = row.try_get("id").unwrap_err();
        assert_eq!(err.to_string(), "The data has multiple fields named: id");
        assert_eq!(row.value(1), Some(&Value::Integer(2)));
    }

    #[rstest]
    fn test_shape_is_enforced() {
        let result = Row::new(vec!["id".to_string()], vec![]);
        assert!(matches!(result, Err(DbError::RowShape { attributes: 1, values: 0 })));
    }

    #[rstest]
    fn test_exports(row: Row) {
        assert_eq!(row.as_dict().get("id"), Some(&Value::Integer(1)));
        assert_eq!(row.as_ordered_dict()[1].0, "title");
        assert_eq!(row.as_dataset().len(), 1);
        assert_eq!(
            row.export(ExportFormat::Csv).unwrap(),
            "id,title,popularity\n1,Page 1,1.0\n"
        );
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"id":1,"title":"Page 1","popularity":1.0}"#
        );
    }

    #[rstest]
    fn test_display(row: Row) {
        assert_eq!(row.to_string(), "<Row 3>");
    }
}
