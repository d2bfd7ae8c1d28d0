//! PostgreSQL backend over the synchronous `postgres` client.
//!
//! Statements use `:name` parameters like every other backend; they are rewritten
//! into `$n` placeholders before preparation and bound with the parameter types
//! the server inferred. Rows are streamed through the client's row iterator, so a
//! lazy set pulls them from the server one at a time.

use ::postgres::fallible_iterator::FallibleIterator;
use ::postgres::types::{FromSql, ToSql, Type};
use ::postgres::{Client, NoTls, Row, RowIter};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tracing::debug;

use super::{Backend, BackendParams, Bindings, Connection, Cursor, Execution};
use crate::error::DbError;
use crate::session::Session;
use crate::value::Value;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_USER: &str = "postgres";

const TABLE_NAMES: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
     ORDER BY table_name;";

pub struct PostgresBackend {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    database: String,
    client: Option<Client>,
}

impl PostgresBackend {
    /// Builds a backend from parameters, filling in defaults.
    ///
    /// The database defaults to the user name. An empty host or user, or a zero
    /// port, cannot form a URL and is rejected here.
    pub fn from_params(params: &BackendParams) -> Result<Self, DbError> {
        let host = params.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = params.port.unwrap_or(DEFAULT_PORT);
        let user = params.user.clone().unwrap_or_else(|| DEFAULT_USER.to_string());

        if host.trim().is_empty() {
            return Err(DbError::improperly_configured("postgres host cannot be empty"));
        }
        if user.trim().is_empty() {
            return Err(DbError::improperly_configured("postgres user cannot be empty"));
        }
        if port == 0 {
            return Err(DbError::improperly_configured("postgres port cannot be 0"));
        }

        let database = params
            .database
            .clone()
            .filter(|db| !db.is_empty())
            .unwrap_or_else(|| user.clone());

        Ok(Self {
            host,
            port,
            user,
            password: params.password.clone().filter(|pw| !pw.is_empty()),
            database,
            client: None,
        })
    }

    fn open_client(&self) -> Result<Client, DbError> {
        let mut config = ::postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(&self.database);
        if let Some(password) = &self.password {
            config.password(password);
        }
        config.connect(NoTls).map_err(|e| DbError::ConnectionFailed {
            url: self.url(),
            message: e.to_string(),
        })
    }
}

impl Backend for PostgresBackend {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn url(&self) -> String {
        let credentials = match &self.password {
            Some(password) => format!("{}:{}", self.user, password),
            None => self.user.clone(),
        };
        format!(
            "postgresql://{}@{}:{}/{}",
            credentials, self.host, self.port, self.database
        )
    }

    fn database_name(&self) -> String {
        self.database.clone()
    }

    fn is_open(&self) -> bool {
        self.client.as_ref().is_some_and(|client| !client.is_closed())
    }

    fn connect(&mut self) -> Result<(), DbError> {
        if !self.is_open() {
            debug!(host = %self.host, port = self.port, database = %self.database, "opening postgres connection");
            self.client = Some(self.open_client()?);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.client.take().is_some() {
            debug!(host = %self.host, database = %self.database, "closed postgres connection");
        }
    }

    fn session(&mut self) -> Result<Session<'_>, DbError> {
        if !self.is_open() {
            return Err(DbError::ResourceClosed);
        }
        match self.client.as_mut() {
            Some(client) => Ok(Session::new(client)),
            None => Err(DbError::ResourceClosed),
        }
    }

    fn table_names(&mut self) -> Result<Vec<String>, DbError> {
        if self.is_open() {
            if let Some(client) = self.client.as_mut() {
                return Connection::table_names(client);
            }
        }
        let mut client = self.open_client()?;
        Connection::table_names(&mut client)
    }
}

/// Rewrites `:name` parameters into `$n` placeholders.
///
/// String literals, quoted identifiers, `::` casts, `--` and `/* */` comments and
/// dollar-quoted bodies are left alone. Returns the
/// rewritten statement and the parameter names in placeholder order; a name used
/// twice maps to one placeholder.
pub(crate) fn rewrite_parameters(statement: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = statement.chars().collect();
    let mut rewritten = String::with_capacity(statement.len());
    let mut names: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                rewritten.push(c);
                i += 1;
                while i < chars.len() {
                    rewritten.push(chars[i]);
                    i += 1;
                    if chars[i - 1] == c {
                        break;
                    }
                }
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |offset| i + offset + 1);
                rewritten.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = block_comment_end(&chars, i);
                rewritten.extend(&chars[i..end]);
                i = end;
            }
            '$' => {
                let end = dollar_quote_end(&chars, i).unwrap_or(i + 1);
                rewritten.extend(&chars[i..end]);
                i = end;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                rewritten.push_str("::");
                i += 2;
            }
            ':' if chars
                .get(i + 1)
                .is_some_and(|next| next.is_alphabetic() || *next == '_') =>
            {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let position = match names.iter().position(|existing| *existing == name) {
                    Some(position) => position,
                    None => {
                        names.push(name);
                        names.len() - 1
                    }
                };
                rewritten.push_str(&format!("${}", position + 1));
                i = end;
            }
            _ => {
                rewritten.push(c);
                i += 1;
            }
        }
    }

    (rewritten, names)
}

/// End of a `/* */` comment starting at `start`; comments nest.
fn block_comment_end(chars: &[char], start: usize) -> usize {
    let mut depth = 0;
    let mut i = start;
    while i < chars.len() {
        match (chars[i], chars.get(i + 1).copied()) {
            ('/', Some('*')) => {
                depth += 1;
                i += 2;
            }
            ('*', Some('/')) => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    chars.len()
}

/// End of a `$tag$ ... $tag$` body starting at `start`, or None when the `$` does
/// not open one (`$1` placeholders, `$` inside identifiers).
fn dollar_quote_end(chars: &[char], start: usize) -> Option<usize> {
    if start > 0 && (chars[start - 1].is_alphanumeric() || chars[start - 1] == '_') {
        return None;
    }

    let mut tag_end = start + 1;
    if chars
        .get(tag_end)
        .is_some_and(|first| first.is_alphabetic() || *first == '_')
    {
        while tag_end < chars.len() && (chars[tag_end].is_alphanumeric() || chars[tag_end] == '_') {
            tag_end += 1;
        }
    }
    if chars.get(tag_end) != Some(&'$') {
        return None;
    }
    let tag = &chars[start..=tag_end];

    let body = tag_end + 1;
    let close = chars[body..]
        .windows(tag.len())
        .position(|window| window == tag)
        .map_or(chars.len(), |offset| body + offset + tag.len());
    Some(close)
}

fn is_text_like(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

/// A typed NULL the server will accept for a parameter of type `ty`.
fn null_param(ty: &Type) -> Box<dyn ToSql + Sync> {
    match *ty {
        Type::BOOL => Box::new(None::<bool>),
        Type::INT2 => Box::new(None::<i16>),
        Type::INT4 => Box::new(None::<i32>),
        Type::INT8 => Box::new(None::<i64>),
        Type::FLOAT4 => Box::new(None::<f32>),
        Type::FLOAT8 => Box::new(None::<f64>),
        Type::BYTEA => Box::new(None::<Vec<u8>>),
        Type::TIMESTAMP => Box::new(None::<NaiveDateTime>),
        Type::TIMESTAMPTZ => Box::new(None::<DateTime<Utc>>),
        Type::DATE => Box::new(None::<NaiveDate>),
        Type::TIME => Box::new(None::<NaiveTime>),
        Type::JSON | Type::JSONB => Box::new(None::<serde_json::Value>),
        _ => Box::new(None::<String>),
    }
}

/// Converts a value into a parameter of the type the server inferred for it.
fn to_param(value: &Value, ty: &Type) -> Result<Box<dyn ToSql + Sync>, DbError> {
    let mismatch = || {
        DbError::operational(format!(
            "cannot bind {} value to a parameter of type {}",
            value.type_name(),
            ty
        ))
    };

    let param: Box<dyn ToSql + Sync> = match (value, ty) {
        (Value::Null, _) => null_param(ty),
        (Value::Bool(b), &Type::BOOL) => Box::new(*b),
        (Value::Integer(i), &Type::BOOL) => Box::new(*i != 0),
        (Value::Integer(i), &Type::INT2) => Box::new(i16::try_from(*i).map_err(|_| mismatch())?),
        (Value::Integer(i), &Type::INT4) => Box::new(i32::try_from(*i).map_err(|_| mismatch())?),
        (Value::Integer(i), &Type::INT8) => Box::new(*i),
        (Value::Integer(i), &Type::FLOAT4) => Box::new(*i as f32),
        (Value::Integer(i), &Type::FLOAT8) => Box::new(*i as f64),
        (Value::Real(f), &Type::FLOAT4) => Box::new(*f as f32),
        (Value::Real(f), &Type::FLOAT8) => Box::new(*f),
        (Value::Blob(b), &Type::BYTEA) => Box::new(b.clone()),
        (Value::Timestamp(ts), &Type::TIMESTAMP) => Box::new(*ts),
        (Value::Timestamp(ts), &Type::TIMESTAMPTZ) => Box::new(Utc.from_utc_datetime(ts)),
        (Value::Date(d), &Type::DATE) => Box::new(*d),
        (Value::Time(t), &Type::TIME) => Box::new(*t),
        (Value::Text(s), &Type::JSON | &Type::JSONB) => {
            let json: serde_json::Value =
                serde_json::from_str(s).map_err(|e| DbError::operational(e.to_string()))?;
            Box::new(json)
        }
        (Value::Text(s), _) if is_text_like(ty) => Box::new(s.clone()),
        (_, _) if is_text_like(ty) => Box::new(value.to_string()),
        _ => return Err(mismatch()),
    };
    Ok(param)
}

fn ordered_values<'b>(names: &[String], bindings: &'b Bindings) -> Result<Vec<&'b Value>, DbError> {
    names
        .iter()
        .map(|name| {
            bindings.get(name).ok_or_else(|| {
                DbError::operational(format!("You did not supply a value for binding '{}'", name))
            })
        })
        .collect()
}

fn build_params(
    names: &[String],
    types: &[Type],
    bindings: &Bindings,
) -> Result<Vec<Box<dyn ToSql + Sync>>, DbError> {
    let values = ordered_values(names, bindings)?;
    values
        .into_iter()
        .zip(types)
        .map(|(value, ty)| to_param(value, ty))
        .collect()
}

/// Binary NUMERIC decoded to a float.
struct Numeric(f64);

impl<'a> FromSql<'a> for Numeric {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        if raw.len() < 8 {
            return Err("invalid numeric header".into());
        }
        let read = |at: usize| i16::from_be_bytes([raw[at], raw[at + 1]]);
        let ndigits = read(0).max(0) as usize;
        let weight = i32::from(read(2));
        let sign = u16::from_be_bytes([raw[4], raw[5]]);

        match sign {
            0xC000 => return Ok(Numeric(f64::NAN)),
            0xD000 => return Ok(Numeric(f64::INFINITY)),
            0xF000 => return Ok(Numeric(f64::NEG_INFINITY)),
            _ => {}
        }
        if raw.len() < 8 + ndigits * 2 {
            return Err("numeric digits truncated".into());
        }

        let mut value = 0f64;
        for i in 0..ndigits {
            let digit = f64::from(read(8 + i * 2));
            value += digit * 10000f64.powi(weight - i as i32);
        }
        Ok(Numeric(if sign == 0x4000 { -value } else { value }))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

fn decode(row: &Row, index: usize) -> Result<Value, DbError> {
    let column = &row.columns()[index];
    let ty = column.type_();
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(index)?.map(Value::Bool),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)?
            .map(|v| Value::Integer(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(index)?
            .map(|v| Value::Integer(i64::from(v))),
        Type::INT8 => row.try_get::<_, Option<i64>>(index)?.map(Value::Integer),
        Type::OID => row
            .try_get::<_, Option<u32>>(index)?
            .map(|v| Value::Integer(i64::from(v))),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)?
            .map(|v| Value::Real(f64::from(v))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(index)?.map(Value::Real),
        Type::NUMERIC => row
            .try_get::<_, Option<Numeric>>(index)?
            .map(|v| Value::Real(v.0)),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(index)?.map(Value::Text)
        }
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(index)?.map(Value::Blob),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(index)?
            .map(Value::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(index)?
            .map(|v| Value::Timestamp(v.naive_utc())),
        Type::DATE => row.try_get::<_, Option<NaiveDate>>(index)?.map(Value::Date),
        Type::TIME => row.try_get::<_, Option<NaiveTime>>(index)?.map(Value::Time),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(index)?
            .map(|v| Value::Text(v.to_string())),
        _ => {
            return Err(DbError::operational(format!(
                "unsupported type {} for column '{}'",
                ty,
                column.name()
            )))
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

fn decode_row(row: &Row) -> Result<Vec<Value>, DbError> {
    (0..row.len()).map(|index| decode(row, index)).collect()
}

/// Streams rows from an open portal.
struct PostgresCursor<'c> {
    columns: Vec<String>,
    rows: RowIter<'c>,
}

impl Cursor for PostgresCursor<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn fetch(&mut self) -> Result<Option<Vec<Value>>, DbError> {
        match self.rows.next()? {
            Some(row) => Ok(Some(decode_row(&row)?)),
            None => Ok(None),
        }
    }
}

impl Connection for Client {
    fn query<'c>(
        &'c mut self,
        statement: &str,
        bindings: &Bindings,
    ) -> Result<Box<dyn Cursor + 'c>, DbError> {
        let (sql, names) = rewrite_parameters(statement);
        let prepared = self.prepare(&sql)?;
        let params = build_params(&names, prepared.params(), bindings)?;
        let columns = prepared
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let rows = self.query_raw(&prepared, params.iter().map(|param| param.as_ref()))?;
        Ok(Box::new(PostgresCursor { columns, rows }))
    }

    fn execute(&mut self, statement: &str, bindings: &Bindings) -> Result<Execution, DbError> {
        let (sql, names) = rewrite_parameters(statement);
        let prepared = self.prepare(&sql)?;
        let params = build_params(&names, prepared.params(), bindings)?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|param| param.as_ref()).collect();

        let rows_affected = if prepared.columns().is_empty() {
            Client::execute(self, &prepared, &refs)?
        } else {
            Client::query(self, &prepared, &refs)?.len() as u64
        };

        // The server does not report generated ids without a RETURNING clause.
        Ok(Execution {
            rows_affected,
            last_id: None,
        })
    }

    fn begin(&mut self) -> Result<(), DbError> {
        Ok(self.batch_execute("BEGIN")?)
    }

    fn commit(&mut self) -> Result<(), DbError> {
        Ok(self.batch_execute("COMMIT")?)
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        Ok(self.batch_execute("ROLLBACK")?)
    }

    fn table_names(&mut self) -> Result<Vec<String>, DbError> {
        let rows = Client::query(self, TABLE_NAMES, &[])?;
        rows.iter()
            .map(|row| Ok(row.try_get::<_, String>(0)?))
            .collect()
    }
}
