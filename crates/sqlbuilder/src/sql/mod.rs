//! Statement builder.
//!
//! A [`SqlBuilder`] is composed from fragments:
//! - `?` placeholders take positional arguments, and a [`Value::List`](crate::Value::List)
//!   argument expands into `?,?,...` when the statement is executed or rendered;
//! - `${name}` / `:{name}` placeholders take table, view, or column names bound
//!   with [`SqlBuilder::bind`].
//!
//! # Example
//!
//! ```ignore
//! use sqlbuilder::{SqlBuilder, args};
//!
//! let mut sb = SqlBuilder::with_args("select ${cols} from ${t} where id in (?)", args![vec![1, 2, 3]]);
//! sb.bind_list("cols", ["id", "name"])?.bind("t", "users")?;
//! if let Some(status) = status {
//!     sb.append_args("and status = ?", args![status]);
//! }
//! let names = sb.get_list(&conn, |rs| rs.get_string("name"))?;
//! ```

#[macro_use]
mod exec_macros;

mod bindings;
mod builder;
mod exec;
mod numbered;


pub use builder::SqlBuilder;
pub use numbered::{NumberedParams, NumberedValues, from_numbered};

/// Start building a statement.
pub fn sql(initial_sql: impl Into<String>) -> SqlBuilder {
    SqlBuilder::new(initial_sql)
}
