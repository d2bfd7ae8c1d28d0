//! Backend-agnostic cell values.
//!
//! Every driver converts its native column types into [`Value`] when reading rows
//! and converts [`Value`] back into native parameters when binding. Temporal values
//! are kept typed until export, where they are rendered in ISO 8601.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// A single value read from, or bound into, a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Value {
    /// Attempts to extract the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract the value as a signed 64-bit integer.
    ///
    /// Reals are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Attempts to extract the value as a 64-bit float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Attempts to extract the value as a boolean.
    ///
    /// SQLite has no boolean storage class, so the integers 0 and 1 are accepted too.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(0) => Some(false),
            Value::Integer(1) => Some(true),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get type name for debugging/error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Bool(_) => "bool",
            Value::Timestamp(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
        }
    }

    /// Returns true for values that carry a date and/or a time of day.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Timestamp(_) | Value::Date(_) | Value::Time(_))
    }

    /// ISO 8601 rendering of temporal values; `None` for everything else.
    pub fn to_iso_string(&self) -> Option<String> {
        match self {
            Value::Timestamp(ts) => Some(ts.format(TIMESTAMP_FORMAT).to_string()),
            Value::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            Value::Time(t) => Some(t.format(TIME_FORMAT).to_string()),
            _ => None,
        }
    }

    /// The value as handed to a tabular export: temporal values become ISO text.
    pub fn to_export(&self) -> Value {
        match self.to_iso_string() {
            Some(iso) => Value::Text(iso),
            None => self.clone(),
        }
    }

    /// Text for a CSV field. Null is empty and reals keep their fractional part, so
    /// `1.0` reads back as a real.
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Real(f) if f.is_finite() => format!("{:?}", f),
            other => other.to_string(),
        }
    }

    /// Render the value as an inline SQL literal.
    ///
    /// Only used for expression criteria; everything else is bound as a parameter.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) if f.is_finite() => format!("{:?}", f),
            Value::Real(f) => format!("'{}'", f),
            Value::Text(s) => quote_literal(s),
            Value::Blob(b) => format!("X'{}'", hex::encode(b)),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            Value::Timestamp(_) | Value::Date(_) | Value::Time(_) => {
                quote_literal(&self.to_iso_string().unwrap_or_default())
            }
        }
    }

    /// Infer a typed value from command-line or config text.
    ///
    /// `null`/`none` become [`Value::Null`], `true`/`false` become booleans, then integer
    /// and real parsing are attempted; anything else stays text.
    pub fn infer(raw: &str) -> Value {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "null" | "none" => return Value::Null,
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }

        // `f64::from_str` also accepts "inf" and "nan"; those stay text.
        if trimmed.chars().any(|c| c.is_ascii_digit()) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Value::Real(f);
            }
        }

        Value::Text(raw.to_string())
    }
}

/// Single-quote a string for SQL, doubling embedded quotes.
fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "{}", hex::encode(b)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Timestamp(_) | Value::Date(_) | Value::Time(_) => {
                write!(f, "{}", self.to_iso_string().unwrap_or_default())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(b) => serializer.serialize_str(&hex::encode(b)),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Timestamp(_) | Value::Date(_) | Value::Time(_) => {
                serializer.serialize_str(&self.to_iso_string().unwrap_or_default())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
