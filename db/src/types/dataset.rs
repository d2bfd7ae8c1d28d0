use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::DbError;
use crate::value::Value;

/// Output formats supported by [`Dataset::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(DbError::Export {
                message: format!("unsupported export format: {}", other),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Json => write!(f, "json"),
        }
    }
}

/// Headers plus rows of values, ready for tabular export.
///
/// Temporal values are converted to ISO 8601 text as rows are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// A one-row dataset; each pair is a header and its value.
    pub fn from_record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        let (headers, values): (Vec<String>, Vec<Value>) = fields
            .into_iter()
            .map(|(header, value)| (header.into(), value.to_export()))
            .unzip();
        Self {
            headers,
            rows: vec![values],
        }
    }

    /// A one-column dataset with one row per value.
    pub fn from_column(header: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            headers: vec![header.into()],
            rows: values.into_iter().map(|value| vec![value.to_export()]).collect(),
        }
    }

    pub fn push(&mut self, values: &[Value]) -> Result<(), DbError> {
        if values.len() != self.headers.len() {
            return Err(DbError::RowShape {
                attributes: self.headers.len(),
                values: values.len(),
            });
        }
        self.rows.push(values.iter().map(Value::to_export).collect());
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header line, then one line per row. Null is an empty field.
    pub fn to_csv(&self) -> Result<String, DbError> {
        if self.headers.is_empty() {
            return Ok(String::new());
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers).map_err(export_error)?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(Value::to_csv_field))
                .map_err(export_error)?;
        }

        let data = writer.into_inner().map_err(|e| export_error(e.into_error()))?;
        String::from_utf8(data).map_err(export_error)
    }

    /// An array of objects keyed by header, in column order.
    pub fn to_json(&self) -> Result<String, DbError> {
        serde_json::to_string(self).map_err(export_error)
    }

    pub fn export(&self, format: ExportFormat) -> Result<String, DbError> {
        match format {
            ExportFormat::Csv => self.to_csv(),
            ExportFormat::Json => self.to_json(),
        }
    }
}

fn export_error(error: impl fmt::Display) -> DbError {
    DbError::Export {
        message: error.to_string(),
    }
}

/// One row serialized as a map without losing column order.
pub(crate) struct OrderedRecord<'a> {
    pub(crate) headers: &'a [String],
    pub(crate) values: &'a [Value],
}

impl Serialize for OrderedRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (header, value) in self.headers.iter().zip(self.values) {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&OrderedRecord {
                headers: &self.headers,
                values: row,
            })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::{fixture, rstest};

    #[fixture]
    fn pages() -> Dataset {
        let mut dataset = Dataset::new(vec!["id".into(), "title".into(), "popularity".into()]);
        dataset
            .push(&[Value::Integer(1), Value::Text("Page 1".into()), Value::Real(1.5)])
            .unwrap();
        dataset
            .push(&[Value::Integer(2), Value::Text("Hello, \"World\"".into()), Value::Null])
            .unwrap();
        dataset
    }

    #[rstest]
    fn test_csv_quotes_and_nulls(pages: Dataset) {
        assert_eq!(
            pages.to_csv().unwrap(),
            "id,title,popularity\n1,Page 1,1.5\n2,\"Hello, \"\"World\"\"\",\n"
        );
    }

    #[rstest]
    fn test_csv_and_json_agree_on_reals() {
        let mut dataset = Dataset::new(vec!["popularity".into()]);
        dataset.push(&[Value::Real(1.0)]).unwrap();
        assert_eq!(dataset.to_csv().unwrap(), "popularity\n1.0\n");
        assert_eq!(dataset.to_json().unwrap(), r#"[{"popularity":1.0}]"#);
    }

    #[rstest]
    fn test_json_keeps_column_order(pages: Dataset) {
        assert_eq!(
            pages.export(ExportFormat::Json).unwrap(),
            r#"[{"id":1,"title":"Page 1","popularity":1.5},{"id":2,"title":"Hello, \"World\"","popularity":null}]"#
        );
    }

    #[rstest]
    fn test_record_and_column_constructors() {
        let record = Dataset::from_record([("count", Value::Integer(1)), ("last_id", Value::Null)]);
        assert_eq!(record.headers(), ["count".to_string(), "last_id".to_string()]);
        assert_eq!(record.to_csv().unwrap(), "count,last_id\n1,\n");

        let column = Dataset::from_column("table", [Value::from("a"), Value::from("b")]);
        assert_eq!(column.len(), 2);
        assert_eq!(column.to_csv().unwrap(), "table\na\nb\n");
    }

    #[rstest]
    fn test_push_rejects_wrong_shape(mut pages: Dataset) {
        let err = pages.push(&[Value::Integer(3)]).unwrap_err();
        assert!(matches!(err, DbError::RowShape { attributes: 3, values: 1 }));
        assert_eq!(pages.len(), 2);
    }

    #[rstest]
    fn test_push_stringifies_temporal_values() {
        let mut dataset = Dataset::new(vec!["created".into()]);
        let date = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        dataset.push(&[Value::Date(date)]).unwrap();
        assert_eq!(dataset.rows()[0][0], Value::Text("2020-01-31".into()));
    }

    #[rstest]
    fn test_empty_dataset_exports() {
        let dataset = Dataset::default();
        assert_eq!(dataset.to_csv().unwrap(), "");
        assert_eq!(dataset.to_json().unwrap(), "[]");
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("JSON", ExportFormat::Json)]
    fn test_export_format_from_str(#[case] raw: &str, #[case] expected: ExportFormat) {
        assert_eq!(raw.parse::<ExportFormat>().unwrap(), expected);
    }

    #[rstest]
    fn test_unknown_export_format() {
        assert!(matches!("xlsx".parse::<ExportFormat>(), Err(DbError::Export { .. })));
    }
}
