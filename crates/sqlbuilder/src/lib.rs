//! # sqlbuilder
//!
//! Incremental, parameterized SQL statements for synchronous database clients.
//!
//! ## Features
//!
//! - **Positional arguments**: `?` placeholders with ordered arguments; a collection
//!   argument expands into `?,?,...` at execution time
//! - **Identifier bindings**: `${name}` / `:{name}` placeholders for table and column
//!   names, validated and quoted, bindable once per statement
//! - **Composition**: append fragments or whole builders (sub-queries), wrap, copy
//! - **Masking**: sensitive arguments log as digests
//! - **Numbered templates**: `:1`, `:2` templates translated to positional statements
//! - **Pluggable execution**: any [`Connection`] implementation, including the
//!   in-memory one from `sqlbuilder-mock`
//!
//! ## Example
//!
//! ```ignore
//! use sqlbuilder::{SqlBuilder, CursorExt, args, mask};
//!
//! let mut sb = SqlBuilder::with_args(
//!     "select id, name from ${t} where dept in (?) and token = ?",
//!     args![vec![10, 20], mask(token)],
//! );
//! sb.bind("t", "employees")?;
//!
//! let names = sb.get_list(&conn, |rs| rs.get_string("name"))?;
//! let count = SqlBuilder::new("select count(*) from employees").get_long(&conn, 1, 0)?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod masked;
pub mod quote;
pub mod resource;
pub mod row;
pub mod sql;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use client::{Close, Column, Connection, Cursor, CursorOf, Statement};
pub use config::{ScrollMode, StatementOptions};
pub use error::{SqlError, SqlResult};
pub use masked::{MASK_MARKER, Masked, mask};
pub use quote::{QuoteMode, quote_name, quote_name_with};
pub use resource::{AutoCloseCursor, close_all};
pub use row::{
    CursorExt, FromValue, MapEntry, collect_list, collect_list_with_nulls, collect_map,
    collect_map_with_nulls,
};
pub use sql::{NumberedParams, NumberedValues, SqlBuilder, from_numbered, sql};
pub use value::Value;

#[cfg(feature = "postgres")]
pub use postgres::{PgConnection, PgCursor, PgStatement};
