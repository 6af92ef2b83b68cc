//! Connection capability traits.
//!
//! The execution methods on [`SqlBuilder`](crate::SqlBuilder) only need a small
//! slice of a database driver: prepare a statement, bind positional values,
//! execute, and walk a cursor. Drivers (and test doubles) implement these traits;
//! the builder never holds a connection itself.

use crate::config::ScrollMode;
use crate::error::SqlResult;
use crate::value::Value;
use std::fmt;
use std::io::Read;

/// A resource that must be released explicitly.
pub trait Close {
    /// Release the resource. Closing twice is not an error.
    fn close(&mut self) -> SqlResult<()>;

    /// Name used when a failed close is logged.
    fn resource_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<T: Close + ?Sized> Close for Box<T> {
    fn close(&mut self) -> SqlResult<()> {
        (**self).close()
    }

    fn resource_name(&self) -> &'static str {
        (**self).resource_name()
    }
}

impl<T: Close> Close for Option<T> {
    fn close(&mut self) -> SqlResult<()> {
        match self {
            Some(inner) => inner.close(),
            None => Ok(()),
        }
    }

    fn resource_name(&self) -> &'static str {
        match self {
            Some(inner) => inner.resource_name(),
            None => "none",
        }
    }
}

/// A column addressed by 1-based position or by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column<'a> {
    Index(usize),
    /// Matched case-insensitively.
    Label(&'a str),
}

impl From<usize> for Column<'_> {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Negative positions map to index 0, which no cursor has.
impl From<i32> for Column<'_> {
    fn from(index: i32) -> Self {
        Self::Index(usize::try_from(index).unwrap_or(0))
    }
}

impl<'a> From<&'a str> for Column<'a> {
    fn from(label: &'a str) -> Self {
        Self::Label(label)
    }
}

impl<'a> From<&'a String> for Column<'a> {
    fn from(label: &'a String) -> Self {
        Self::Label(label.as_str())
    }
}

impl fmt::Display for Column<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "#{index}"),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// A forward cursor over query results.
///
/// A fresh cursor is positioned before the first row.
pub trait Cursor: Close {
    /// Move to the next row. Returns `false` once the rows are exhausted.
    fn advance(&mut self) -> SqlResult<bool>;

    /// Read a cell of the current row.
    fn value(&mut self, column: Column<'_>) -> SqlResult<Value>;

    /// Whether the last cell read was SQL NULL.
    fn was_null(&self) -> bool;

    /// Column labels in result order.
    fn column_names(&self) -> SqlResult<Vec<String>>;

    /// 1-based position of the column with this label.
    fn find_column(&self, label: &str) -> SqlResult<usize>;
}

/// A prepared statement.
pub trait Statement: Close {
    type Cursor: Cursor + 'static;

    /// Bind a value to the 1-based parameter `index`.
    fn bind(&mut self, index: usize, value: &Value) -> SqlResult<()>;

    /// Bind a character stream to the 1-based parameter `index`.
    fn bind_stream(&mut self, index: usize, reader: &mut dyn Read) -> SqlResult<()>;

    /// Number of rows to fetch per round trip.
    fn set_fetch_size(&mut self, rows: u32) -> SqlResult<()>;

    /// Maximum number of rows any cursor of this statement returns. Zero means no limit.
    fn set_max_rows(&mut self, rows: u64) -> SqlResult<()>;

    fn execute_query(&mut self) -> SqlResult<Self::Cursor>;

    /// Execute a DML statement, returning the affected row count.
    fn execute_update(&mut self) -> SqlResult<u64>;

    /// Cursor over the key columns requested when the statement was prepared.
    fn generated_keys(&mut self) -> SqlResult<Self::Cursor>;
}

/// A live database connection.
pub trait Connection: Close {
    type Statement: Statement + 'static;

    fn prepare(&self, sql: &str, scroll: ScrollMode) -> SqlResult<Self::Statement>;

    /// Prepare a DML statement whose `key_columns` are returned by
    /// [`Statement::generated_keys`].
    fn prepare_returning(&self, sql: &str, key_columns: &[&str]) -> SqlResult<Self::Statement>;
}

/// Cursor type produced by statements of connection `C`.
pub type CursorOf<C> = <<C as Connection>::Statement as Statement>::Cursor;
