//! # sqlbuilder-mock
//!
//! A deterministic in-memory [`Connection`](sqlbuilder::Connection) for
//! testing code that executes `SqlBuilder` statements.
//!
//! ```ignore
//! use sqlbuilder::{CursorExt, SqlBuilder, Value};
//! use sqlbuilder_mock::{MockConnection, MockResultSet};
//!
//! let conn = MockConnection::new();
//! conn.add_result_set(MockResultSet::new("names").columns(["name"]).values(["a", "b"]));
//!
//! let names = SqlBuilder::new("select name from t")
//!     .get_list(&conn, |rs| rs.get_string("name"))?;
//! assert_eq!(names, ["a", "b"]);
//! assert_eq!(conn.last_statement().unwrap().sql, "select name from t");
//! ```

mod connection;
mod result_set;

pub use connection::{Invocations, MockConnection, MockCursor, MockStatement, RecordedStatement};
pub use result_set::{GENERATED_VALUE, MockResultSet};
