//! Executing a `SqlBuilder` against a [`Connection`].
//!
//! Every method applies the builder's bindings in place, expands collection
//! arguments, prepares and binds a statement, and releases whatever it opened
//! before returning. Methods returning a cursor hand the statement over to an
//! [`AutoCloseCursor`] instead.

use super::builder::{ArgList, SqlBuilder};
use crate::client::{Connection, CursorOf, Cursor, Statement};
use crate::config::StatementOptions;
use crate::error::SqlResult;
use crate::resource::{AutoCloseCursor, close_quietly, with_resource};
use crate::row::{self, MapEntry};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

/// Cut `sql` to at most `max_bytes`, on a char boundary.
#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

fn log_statement(_sql: &str, _args: &[Value], _options: &StatementOptions) {
    #[cfg(feature = "tracing")]
    {
        let sql = match _options.max_log_sql_length {
            Some(max) if _sql.len() > max => format!("{}...", truncate_sql_bytes(_sql, max)),
            _ => _sql.to_string(),
        };
        tracing::debug!(
            target: "sqlbuilder.sql",
            param_count = _args.len(),
            sql = %sql,
            args = %ArgList(_args),
        );
    }
}

/// Apply fetch size, max rows and all arguments to a fresh statement.
fn configure<S: Statement>(stmt: &mut S, options: &StatementOptions, args: &[Value]) -> SqlResult<()> {
    if let Some(rows) = options.effective_fetch_size() {
        stmt.set_fetch_size(rows)?;
    }
    if let Some(rows) = options.max_rows {
        stmt.set_max_rows(rows)?;
    }
    for (i, arg) in args.iter().enumerate() {
        let index = i + 1;
        match arg.unmasked() {
            Value::LongText(text) => {
                let mut reader = text.as_bytes();
                stmt.bind_stream(index, &mut reader)?;
            }
            value => stmt.bind(index, value)?,
        }
    }
    Ok(())
}

impl SqlBuilder {
    /// Prepare and bind the final statement. With `key_columns`, the statement
    /// reports those columns as generated keys.
    fn prepare<C: Connection>(&mut self, conn: &C, key_columns: &[&str]) -> SqlResult<C::Statement> {
        let (sql, args) = self.finalize()?;
        log_statement(&sql, &args, self.options());

        let mut stmt = if key_columns.is_empty() {
            conn.prepare(&sql, self.options().scroll)?
        } else {
            conn.prepare_returning(&sql, key_columns)?
        };
        if let Err(err) = configure(&mut stmt, self.options(), &args) {
            close_quietly(&mut stmt);
            return Err(err);
        }
        Ok(stmt)
    }

    /// Run as a query and read the first row with `read`, or return `default`.
    fn query_first<C, T, F>(&mut self, conn: &C, default: T, read: F) -> SqlResult<T>
    where
        C: Connection,
        F: FnOnce(&mut dyn Cursor) -> SqlResult<T>,
    {
        let stmt = self.prepare(conn, &[])?;
        with_resource(stmt, |stmt| {
            let rs = stmt.execute_query()?;
            with_resource(rs, |rs| if rs.advance()? { read(rs) } else { Ok(default) })
        })
    }

    /// Run as a query and hand the whole cursor to `f`.
    fn query_all<C, T, F>(&mut self, conn: &C, f: F) -> SqlResult<T>
    where
        C: Connection,
        F: FnOnce(&mut dyn Cursor) -> SqlResult<T>,
    {
        let stmt = self.prepare(conn, &[])?;
        with_resource(stmt, |stmt| {
            let rs = stmt.execute_query()?;
            with_resource(rs, |rs| f(rs))
        })
    }

    /// Execute the query and return its cursor.
    ///
    /// Closing (or dropping) the cursor also closes the statement.
    pub fn result_set<C: Connection>(
        &mut self,
        conn: &C,
    ) -> SqlResult<AutoCloseCursor<CursorOf<C>>> {
        let mut stmt = self.prepare(conn, &[])?;
        match stmt.execute_query() {
            Ok(rs) => Ok(AutoCloseCursor::new(rs).owning(stmt)),
            Err(err) => {
                close_quietly(&mut stmt);
                Err(err)
            }
        }
    }

    /// Like [`result_set`](Self::result_set), but the cursor also owns and
    /// closes the connection.
    pub fn result_set_owned<C: Connection + 'static>(
        &mut self,
        mut conn: C,
    ) -> SqlResult<AutoCloseCursor<CursorOf<C>>> {
        match self.result_set(&conn) {
            Ok(rs) => Ok(rs.owning(conn)),
            Err(err) => {
                close_quietly(&mut conn);
                Err(err)
            }
        }
    }

    impl_typed_getters! {
        /// Read an `INT` column of the first row. NULL reads as 0.
        get_int -> i32;
        /// Read a `BIGINT` column of the first row. NULL reads as 0.
        get_long -> i64;
        get_double -> f64;
        get_string -> Option<String>;
        get_decimal -> Option<rust_decimal::Decimal>;
        /// Read a column of the first row without conversion.
        get_object -> Value;
        get_date -> Option<chrono::NaiveDate>;
        get_date_time -> Option<chrono::DateTime<chrono::FixedOffset>>;
        /// Read a point in time, normalized to UTC.
        get_instant -> Option<chrono::DateTime<chrono::Utc>>;
        get_timestamp -> Option<chrono::NaiveDateTime>;
    }

    /// Execute a DML statement and return the affected row count.
    pub fn execute<C: Connection>(&mut self, conn: &C) -> SqlResult<u64> {
        let stmt = self.prepare(conn, &[])?;
        with_resource(stmt, |stmt| stmt.execute_update())
    }

    /// Execute a DML statement and return a cursor over the `key_columns`
    /// generated for the affected rows.
    ///
    /// Closing the cursor also closes the statement.
    pub fn execute_returning<C: Connection>(
        &mut self,
        conn: &C,
        key_columns: &[&str],
    ) -> SqlResult<AutoCloseCursor<CursorOf<C>>> {
        let mut stmt = self.prepare(conn, key_columns)?;
        match stmt.execute_update().and_then(|_| stmt.generated_keys()) {
            Ok(keys) => Ok(AutoCloseCursor::new(keys).owning(stmt)),
            Err(err) => {
                close_quietly(&mut stmt);
                Err(err)
            }
        }
    }

    /// Map every row, skipping rows the mapper returns `None` for.
    pub fn get_list<C, T, F>(&mut self, conn: &C, mapper: F) -> SqlResult<Vec<T>>
    where
        C: Connection,
        F: FnMut(&mut dyn Cursor) -> SqlResult<Option<T>>,
    {
        self.query_all(conn, |rs| row::collect_list(rs, mapper))
    }

    /// Map every row, keeping `None` results.
    pub fn get_list_with_nulls<C, T, F>(&mut self, conn: &C, mapper: F) -> SqlResult<Vec<Option<T>>>
    where
        C: Connection,
        F: FnMut(&mut dyn Cursor) -> SqlResult<Option<T>>,
    {
        self.query_all(conn, |rs| row::collect_list_with_nulls(rs, mapper))
    }

    /// Collect rows into a map, skipping NULL values.
    ///
    /// Fails with [`SqlError::NullMapKey`](crate::SqlError::NullMapKey) or
    /// [`SqlError::DuplicateMapKey`](crate::SqlError::DuplicateMapKey) when
    /// the keys are not unique.
    pub fn get_map<C, K, V, F>(&mut self, conn: &C, mapper: F) -> SqlResult<HashMap<K, V>>
    where
        C: Connection,
        K: Eq + Hash + Display,
        F: FnMut(&mut dyn Cursor) -> SqlResult<MapEntry<K, V>>,
    {
        self.query_all(conn, |rs| row::collect_map(rs, mapper))
    }

    /// Collect rows into a map, keeping NULL values.
    pub fn get_map_with_nulls<C, K, V, F>(
        &mut self,
        conn: &C,
        mapper: F,
    ) -> SqlResult<HashMap<K, Option<V>>>
    where
        C: Connection,
        K: Eq + Hash + Display,
        F: FnMut(&mut dyn Cursor) -> SqlResult<MapEntry<K, V>>,
    {
        self.query_all(conn, |rs| row::collect_map_with_nulls(rs, mapper))
    }

    /// Map the first row, if there is one.
    pub fn get_single<C, T, F>(&mut self, conn: &C, mapper: F) -> SqlResult<Option<T>>
    where
        C: Connection,
        F: FnOnce(&mut dyn Cursor) -> SqlResult<Option<T>>,
    {
        self.query_first(conn, None, mapper)
    }

    /// Map the first row, or return `default` when there is no row or the
    /// mapper returns `None`.
    pub fn get_single_or<C, T, F>(&mut self, conn: &C, mapper: F, default: T) -> SqlResult<T>
    where
        C: Connection,
        F: FnOnce(&mut dyn Cursor) -> SqlResult<Option<T>>,
    {
        Ok(self.get_single(conn, mapper)?.unwrap_or(default))
    }
}
