//! PostgreSQL [`Connection`] over `tokio-postgres`.
//!
//! The client runs on a private current-thread Tokio runtime, so the
//! connection can be used from plain synchronous code:
//!
//! ```ignore
//! use sqlbuilder::{PgConnection, SqlBuilder, args};
//!
//! let conn = PgConnection::connect("postgres://postgres@localhost/app")?;
//! let n = SqlBuilder::with_args("select count(*) from users where id in (?)", args![vec![1, 2]])
//!     .get_long(&conn, 1, 0)?;
//! ```
//!
//! Rows are fetched eagerly. The fetch size and scroll mode are accepted but
//! have no effect; the max-rows cap truncates the fetched rows.

use crate::client::{Close, Column, Connection, Cursor, Statement};
use crate::config::ScrollMode;
use crate::error::{SqlError, SqlResult};
use crate::quote::quote_name;
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::error::Error;
use std::io::Read;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_postgres::Row;
use tokio_postgres::types::{IsNull, ToSql, Type};

struct Shared {
    runtime: Runtime,
    client: tokio_postgres::Client,
}

/// A synchronous PostgreSQL connection.
pub struct PgConnection {
    shared: Arc<Shared>,
    closed: bool,
}

impl PgConnection {
    /// Connect with a `postgres://` URL or key/value connection string (no TLS).
    pub fn connect(url: &str) -> SqlResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (client, connection) =
            runtime.block_on(tokio_postgres::connect(url, tokio_postgres::NoTls))?;
        runtime.spawn(async move {
            if let Err(_err) = connection.await {
                #[cfg(feature = "tracing")]
                tracing::error!(target: "sqlbuilder.sql", error = %_err, "postgres connection error");
            }
        });
        Ok(Self {
            shared: Arc::new(Shared { runtime, client }),
            closed: false,
        })
    }

    fn check_open(&self) -> SqlResult<()> {
        if self.closed {
            return Err(SqlError::driver("connection is closed"));
        }
        Ok(())
    }

    fn prepare_sql(&self, sql: String, returning: bool) -> SqlResult<PgStatement> {
        self.check_open()?;
        let shared = Arc::clone(&self.shared);
        let statement = shared.runtime.block_on(shared.client.prepare(&sql))?;
        Ok(PgStatement {
            shared,
            statement: Some(statement),
            params: Vec::new(),
            max_rows: None,
            returning,
            keys: None,
        })
    }
}

impl Close for PgConnection {
    fn close(&mut self) -> SqlResult<()> {
        self.closed = true;
        Ok(())
    }
}

impl Connection for PgConnection {
    type Statement = PgStatement;

    fn prepare(&self, sql: &str, _scroll: ScrollMode) -> SqlResult<PgStatement> {
        self.prepare_sql(rewrite_placeholders(sql), false)
    }

    fn prepare_returning(&self, sql: &str, key_columns: &[&str]) -> SqlResult<PgStatement> {
        let mut sql = rewrite_placeholders(sql);
        if !key_columns.is_empty() {
            let keys = key_columns
                .iter()
                .map(|c| quote_name(c))
                .collect::<SqlResult<Vec<_>>>()?;
            sql.push_str(" RETURNING ");
            sql.push_str(&keys.join(", "));
        }
        self.prepare_sql(sql, !key_columns.is_empty())
    }
}

/// Rewrite `?` placeholders to `$1, $2, ...`, leaving single-quoted literals alone.
pub fn rewrite_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut in_literal = false;
    let mut n = 0;
    for c in sql.chars() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            '?' if !in_literal => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            _ => out.push(c),
        }
    }
    out
}

/// A prepared PostgreSQL statement.
pub struct PgStatement {
    shared: Arc<Shared>,
    statement: Option<tokio_postgres::Statement>,
    params: Vec<Value>,
    max_rows: Option<u64>,
    returning: bool,
    keys: Option<PgCursor>,
}

impl PgStatement {
    fn statement(&self) -> SqlResult<&tokio_postgres::Statement> {
        self.statement
            .as_ref()
            .ok_or_else(|| SqlError::driver("statement is closed"))
    }

    fn query_rows(&self) -> SqlResult<Vec<Row>> {
        let statement = self.statement()?;
        let params: Vec<&(dyn ToSql + Sync)> =
            self.params.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        let mut rows = self
            .shared
            .runtime
            .block_on(self.shared.client.query(statement, &params))?;
        if let Some(max) = self.max_rows.filter(|m| *m > 0) {
            rows.truncate(usize::try_from(max).unwrap_or(usize::MAX));
        }
        Ok(rows)
    }
}

impl Close for PgStatement {
    fn close(&mut self) -> SqlResult<()> {
        self.statement = None;
        self.keys = None;
        Ok(())
    }
}

impl Statement for PgStatement {
    type Cursor = PgCursor;

    fn bind(&mut self, index: usize, value: &Value) -> SqlResult<()> {
        if index == 0 {
            return Err(SqlError::driver("parameter indexes start at 1"));
        }
        if self.params.len() < index {
            self.params.resize(index, Value::Null);
        }
        self.params[index - 1] = value.clone();
        Ok(())
    }

    fn bind_stream(&mut self, index: usize, reader: &mut dyn Read) -> SqlResult<()> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.bind(index, &Value::Text(text))
    }

    fn set_fetch_size(&mut self, _rows: u32) -> SqlResult<()> {
        Ok(())
    }

    fn set_max_rows(&mut self, rows: u64) -> SqlResult<()> {
        self.max_rows = Some(rows);
        Ok(())
    }

    fn execute_query(&mut self) -> SqlResult<PgCursor> {
        let rows = self.query_rows()?;
        Ok(PgCursor::new(rows, self.statement()?))
    }

    fn execute_update(&mut self) -> SqlResult<u64> {
        if self.returning {
            let rows = self.query_rows()?;
            let count = rows.len() as u64;
            self.keys = Some(PgCursor::new(rows, self.statement()?));
            return Ok(count);
        }
        let statement = self.statement()?;
        let params: Vec<&(dyn ToSql + Sync)> =
            self.params.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        Ok(self
            .shared
            .runtime
            .block_on(self.shared.client.execute(statement, &params))?)
    }

    fn generated_keys(&mut self) -> SqlResult<PgCursor> {
        Ok(self.keys.take().unwrap_or_default())
    }
}

/// Cursor over fetched PostgreSQL rows.
#[derive(Default)]
pub struct PgCursor {
    columns: Vec<String>,
    rows: Vec<Row>,
    /// 1-based row position; 0 is before the first row.
    pos: usize,
    last_null: bool,
}

impl PgCursor {
    fn new(rows: Vec<Row>, statement: &tokio_postgres::Statement) -> Self {
        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        Self {
            columns,
            rows,
            pos: 0,
            last_null: false,
        }
    }

    fn resolve(&self, column: Column<'_>) -> SqlResult<usize> {
        match column {
            Column::Index(i) if i >= 1 && i <= self.columns.len() => Ok(i),
            Column::Index(_) => Err(SqlError::ColumnNotFound(column.to_string())),
            Column::Label(label) => self.find_column(label),
        }
    }
}

impl Close for PgCursor {
    fn close(&mut self) -> SqlResult<()> {
        self.rows.clear();
        self.pos = 0;
        Ok(())
    }
}

impl Cursor for PgCursor {
    fn advance(&mut self) -> SqlResult<bool> {
        if self.pos < self.rows.len() {
            self.pos += 1;
            Ok(true)
        } else {
            self.pos = self.rows.len() + 1;
            Ok(false)
        }
    }

    fn value(&mut self, column: Column<'_>) -> SqlResult<Value> {
        let index = self.resolve(column)?;
        let row = self
            .pos
            .checked_sub(1)
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| SqlError::driver("cursor is not positioned on a row"))?;
        let value = decode_cell(row, index - 1)?;
        self.last_null = value.is_null();
        Ok(value)
    }

    fn was_null(&self) -> bool {
        self.last_null
    }

    fn column_names(&self) -> SqlResult<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn find_column(&self, label: &str) -> SqlResult<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(label))
            .map(|i| i + 1)
            .ok_or_else(|| SqlError::ColumnNotFound(label.to_string()))
    }
}

fn decode_cell(row: &Row, idx: usize) -> SqlResult<Value> {
    let column = &row.columns()[idx];

    macro_rules! cell {
        ($t:ty, $wrap:expr) => {
            row.try_get::<_, Option<$t>>(idx)
                .map_err(|e| SqlError::decode(column.name(), e.to_string()))?
                .map($wrap)
        };
    }

    let value = match *column.type_() {
        Type::BOOL => cell!(bool, Value::Bool),
        Type::INT2 => cell!(i16, |v| Value::Int(v.into())),
        Type::INT4 => cell!(i32, |v| Value::Int(v.into())),
        Type::INT8 => cell!(i64, Value::Int),
        Type::OID => cell!(u32, |v| Value::Int(v.into())),
        Type::FLOAT4 => cell!(f32, |v| Value::Double(v.into())),
        Type::FLOAT8 => cell!(f64, Value::Double),
        Type::NUMERIC => cell!(Decimal, Value::Decimal),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            cell!(String, Value::Text)
        }
        Type::BYTEA => cell!(Vec<u8>, Value::Bytes),
        Type::DATE => cell!(NaiveDate, Value::Date),
        Type::TIMESTAMP => cell!(NaiveDateTime, Value::Timestamp),
        Type::TIMESTAMPTZ => cell!(DateTime<Utc>, |v| Value::DateTime(v.fixed_offset())),
        Type::UUID => cell!(uuid::Uuid, Value::Uuid),
        Type::JSON | Type::JSONB => cell!(serde_json::Value, Value::Json),
        ref other => {
            return Err(SqlError::decode(
                column.name(),
                format!("unsupported column type {other}"),
            ));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

fn is_text_type(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN)
}

/// Values convert to whatever parameter type the server inferred.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::OID => u32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                ref t if is_text_type(t) => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Double(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql(ty, out),
                ref t if is_text_type(t) => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Decimal(v) => match *ty {
                Type::FLOAT8 => v
                    .to_f64()
                    .ok_or("decimal out of range for float8")?
                    .to_sql(ty, out),
                ref t if is_text_type(t) => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Text(v) | Value::LongText(v) => match *ty {
                Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::DateTime(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
            Value::List(_) => Err("collection arguments must be expanded before binding".into()),
            Value::Masked(masked) => masked.data().to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}
