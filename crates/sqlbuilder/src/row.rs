//! Typed access to cursor rows.

use crate::client::{Column, Cursor};
use crate::error::{SqlError, SqlResult};
use crate::value::Value;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Display;
use std::hash::Hash;
use uuid::Uuid;

/// Conversion from a cell [`Value`].
///
/// Numeric and boolean targets read SQL NULL as zero / `false`; use
/// `Option<T>` to tell NULL apart.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, String>;
}

fn mismatch<T>(value: &Value) -> Result<T, String> {
    Err(format!(
        "cannot read {} as {}",
        value.kind(),
        std::any::type_name::<T>()
    ))
}

fn unmask(value: Value) -> Value {
    match value {
        Value::Masked(masked) => unmask(masked.into_inner()),
        other => other,
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, String> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::Null => Ok(0),
            Value::Int(v) => Ok(v),
            Value::Bool(v) => Ok(i64::from(v)),
            Value::Double(v) if v.is_finite() => Ok(v.trunc() as i64),
            Value::Decimal(v) => v.trunc().to_i64().ok_or_else(|| format!("{v} out of range")),
            Value::Text(v) | Value::LongText(v) => v.trim().parse().map_err(|e| format!("{e}")),
            other => mismatch(&other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, String> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| format!("{wide} out of range"))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::Null => Ok(0.0),
            Value::Int(v) => Ok(v as f64),
            Value::Double(v) => Ok(v),
            Value::Decimal(v) => v.to_f64().ok_or_else(|| format!("{v} out of range")),
            Value::Text(v) | Value::LongText(v) => v.trim().parse().map_err(|e| format!("{e}")),
            other => mismatch(&other),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::Null => Ok(false),
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            Value::Text(v) | Value::LongText(v) => match v.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "y" | "yes" => Ok(true),
                "false" | "f" | "0" | "n" | "no" => Ok(false),
                _ => Err(format!("'{v}' is not a boolean")),
            },
            other => mismatch(&other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::Null => Err("unexpected NULL".to_string()),
            Value::Text(v) | Value::LongText(v) => Ok(v),
            Value::List(_) => Err("cannot read list as text".to_string()),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::Null => Ok(Decimal::ZERO),
            Value::Int(v) => Ok(Decimal::from(v)),
            Value::Double(v) => Decimal::from_f64(v).ok_or_else(|| format!("{v} out of range")),
            Value::Decimal(v) => Ok(v),
            Value::Text(v) | Value::LongText(v) => v.trim().parse().map_err(|e| format!("{e}")),
            other => mismatch(&other),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::Date(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.date()),
            Value::DateTime(v) => Ok(v.date_naive()),
            Value::Text(v) => v.trim().parse().map_err(|e| format!("{e}")),
            other => mismatch(&other),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::Timestamp(v) => Ok(v),
            Value::Date(v) => Ok(v.and_time(chrono::NaiveTime::MIN)),
            Value::DateTime(v) => Ok(v.naive_local()),
            Value::Text(v) => v.trim().parse().map_err(|e| format!("{e}")),
            other => mismatch(&other),
        }
    }
}

/// Timestamps without zone are read as UTC.
impl FromValue for DateTime<FixedOffset> {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::DateTime(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.and_utc().fixed_offset()),
            Value::Text(v) => DateTime::parse_from_rfc3339(v.trim()).map_err(|e| format!("{e}")),
            other => mismatch(&other),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, String> {
        DateTime::<FixedOffset>::from_value(value).map(|v| v.with_timezone(&Utc))
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::Uuid(v) => Ok(v),
            Value::Text(v) => Uuid::parse_str(v.trim()).map_err(|e| format!("{e}")),
            other => mismatch(&other),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Json(v) => Ok(v),
            Value::Text(v) | Value::LongText(v) => {
                serde_json::from_str(&v).map_err(|e| format!("{e}"))
            }
            other => mismatch(&other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, String> {
        match unmask(value) {
            Value::Bytes(v) => Ok(v),
            Value::Text(v) | Value::LongText(v) => Ok(v.into_bytes()),
            other => mismatch(&other),
        }
    }
}

/// Typed getters for any [`Cursor`] positioned on a row.
pub trait CursorExt: Cursor {
    /// Read a cell and convert it, returning [`SqlError::Decode`] on failure.
    fn get<'c, T: FromValue>(&mut self, column: impl Into<Column<'c>>) -> SqlResult<T> {
        let column = column.into();
        let value = self.value(column)?;
        T::from_value(value).map_err(|message| SqlError::decode(column.to_string(), message))
    }

    fn get_int<'c>(&mut self, column: impl Into<Column<'c>>) -> SqlResult<i32> {
        self.get(column)
    }

    fn get_long<'c>(&mut self, column: impl Into<Column<'c>>) -> SqlResult<i64> {
        self.get(column)
    }

    fn get_double<'c>(&mut self, column: impl Into<Column<'c>>) -> SqlResult<f64> {
        self.get(column)
    }

    fn get_string<'c>(&mut self, column: impl Into<Column<'c>>) -> SqlResult<Option<String>> {
        self.get(column)
    }

    fn get_decimal<'c>(&mut self, column: impl Into<Column<'c>>) -> SqlResult<Option<Decimal>> {
        self.get(column)
    }

    fn get_object<'c>(&mut self, column: impl Into<Column<'c>>) -> SqlResult<Value> {
        self.get(column)
    }

    fn get_date<'c>(&mut self, column: impl Into<Column<'c>>) -> SqlResult<Option<NaiveDate>> {
        self.get(column)
    }

    fn get_date_time<'c>(
        &mut self,
        column: impl Into<Column<'c>>,
    ) -> SqlResult<Option<DateTime<FixedOffset>>> {
        self.get(column)
    }

    /// A point in time, normalized to UTC.
    fn get_instant<'c>(&mut self, column: impl Into<Column<'c>>) -> SqlResult<Option<DateTime<Utc>>> {
        self.get(column)
    }

    fn get_timestamp<'c>(
        &mut self,
        column: impl Into<Column<'c>>,
    ) -> SqlResult<Option<NaiveDateTime>> {
        self.get(column)
    }
}

impl<C: Cursor + ?Sized> CursorExt for C {}

/// Map every remaining row, skipping rows the mapper returns `None` for.
pub fn collect_list<T, F>(cursor: &mut dyn Cursor, mut mapper: F) -> SqlResult<Vec<T>>
where
    F: FnMut(&mut dyn Cursor) -> SqlResult<Option<T>>,
{
    let mut list = Vec::new();
    while cursor.advance()? {
        if let Some(item) = mapper(cursor)? {
            list.push(item);
        }
    }
    Ok(list)
}

/// Map every remaining row, keeping `None` results.
pub fn collect_list_with_nulls<T, F>(cursor: &mut dyn Cursor, mut mapper: F) -> SqlResult<Vec<Option<T>>>
where
    F: FnMut(&mut dyn Cursor) -> SqlResult<Option<T>>,
{
    let mut list = Vec::new();
    while cursor.advance()? {
        list.push(mapper(cursor)?);
    }
    Ok(list)
}

/// Key/value pair produced per row for map collection. `None` skips the row.
pub type MapEntry<K, V> = Option<(Option<K>, Option<V>)>;

fn collect_entries<K, V, F>(
    cursor: &mut dyn Cursor,
    mut mapper: F,
    with_nulls: bool,
) -> SqlResult<HashMap<K, Option<V>>>
where
    K: Eq + Hash + Display,
    F: FnMut(&mut dyn Cursor) -> SqlResult<MapEntry<K, V>>,
{
    let mut map = HashMap::new();
    while cursor.advance()? {
        let Some((key, value)) = mapper(cursor)? else {
            continue;
        };
        let key = key.ok_or(SqlError::NullMapKey)?;
        if value.is_none() && !with_nulls {
            continue;
        }
        match map.entry(key) {
            Entry::Occupied(entry) => {
                return Err(SqlError::DuplicateMapKey(entry.key().to_string()));
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
        }
    }
    Ok(map)
}

/// Collect rows into a map. NULL values are skipped.
///
/// A NULL key fails with [`SqlError::NullMapKey`], a repeated key with
/// [`SqlError::DuplicateMapKey`].
pub fn collect_map<K, V, F>(cursor: &mut dyn Cursor, mapper: F) -> SqlResult<HashMap<K, V>>
where
    K: Eq + Hash + Display,
    F: FnMut(&mut dyn Cursor) -> SqlResult<MapEntry<K, V>>,
{
    let map = collect_entries(cursor, mapper, false)?;
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect())
}

/// Collect rows into a map, keeping NULL values.
pub fn collect_map_with_nulls<K, V, F>(
    cursor: &mut dyn Cursor,
    mapper: F,
) -> SqlResult<HashMap<K, Option<V>>>
where
    K: Eq + Hash + Display,
    F: FnMut(&mut dyn Cursor) -> SqlResult<MapEntry<K, V>>,
{
    collect_entries(cursor, mapper, true)
}
