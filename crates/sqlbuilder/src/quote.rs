//! Table, view, and column name quoting.
//!
//! Names bound into a statement through `${name}` placeholders are meant to be
//! trusted internal identifiers. [`quote_name`] accepts them as-is when they are
//! plain (optionally dotted) identifiers or already double-quoted, handles a
//! trailing alias (`orders o`, `orders AS o`), and otherwise rejects them.
//! [`QuoteMode::Permissive`] wraps such names in double quotes instead.
//!
//! # Example
//! ```ignore
//! use sqlbuilder::{quote_name, quote_name_with, QuoteMode};
//!
//! assert_eq!(quote_name("public.users")?, "public.users");
//! assert_eq!(quote_name("users AS u")?, "users u");
//! assert_eq!(quote_name_with("column+A", QuoteMode::Permissive)?, "\"column+A\"");
//! # Ok::<(), sqlbuilder::SqlError>(())
//! ```

use crate::error::{SqlError, SqlResult};
use regex::Regex;
use std::sync::OnceLock;

/// How names that are not plain identifiers are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuoteMode {
    /// Reject names that would need quoting.
    #[default]
    Strict,
    /// Wrap names that would need quoting in double quotes.
    Permissive,
}

fn plain_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(?:[A-Za-z][A-Za-z0-9_.]*|"[^"]+")$"#).expect("invalid built-in name regex")
    })
}

fn alias_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+(?i:as\s+)?").expect("invalid built-in alias regex"))
}

/// Quote `name` in [`QuoteMode::Strict`].
pub fn quote_name(name: &str) -> SqlResult<String> {
    quote_name_with(name, QuoteMode::Strict)
}

/// Validate `name` and return its SQL form.
pub fn quote_name_with(name: &str, mode: QuoteMode) -> SqlResult<String> {
    if plain_name_regex().is_match(name) {
        return Ok(name.to_string());
    }

    let mut parts = alias_regex().splitn(name, 2);
    if let (Some(base), Some(alias)) = (parts.next(), parts.next()) {
        return Ok(format!(
            "{} {}",
            quote_name_with(base, mode)?,
            quote_name_with(alias, mode)?
        ));
    }

    if mode == QuoteMode::Strict || name.contains('"') {
        return Err(SqlError::InvalidObjectName(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_pass_through() {
        for name in ["columnA", "t1.col_2", "a.b.c", "\"Weird Name\""] {
            assert_eq!(quote_name(name).unwrap(), name);
        }
    }

    #[test]
    fn alias_is_split_and_as_dropped() {
        assert_eq!(quote_name("columnA A").unwrap(), "columnA A");
        assert_eq!(quote_name("orders AS o").unwrap(), "orders o");
        assert_eq!(quote_name("orders   as   o").unwrap(), "orders o");
    }

    #[test]
    fn strict_mode_rejects_special_characters() {
        let err = quote_name("column+A").unwrap_err();
        assert!(matches!(err, SqlError::InvalidObjectName(ref n) if n == "column+A"));
        assert_eq!(
            err.to_string(),
            "Object name \"column+A\" contains invalid characters"
        );
        assert!(quote_name("1abc").is_err());
        assert!(quote_name("").is_err());
    }

    #[test]
    fn permissive_mode_quotes() {
        assert_eq!(
            quote_name_with("column+A", QuoteMode::Permissive).unwrap(),
            "\"column+A\""
        );
        assert_eq!(
            quote_name_with("column;A A+B", QuoteMode::Permissive).unwrap(),
            "\"column;A\" \"A+B\""
        );
    }

    #[test]
    fn embedded_quote_is_always_rejected() {
        assert!(quote_name_with("bad\"name", QuoteMode::Permissive).is_err());
    }

    #[test]
    fn quoting_is_idempotent() {
        for name in ["columnA", "a.b", "columnA A"] {
            let once = quote_name(name).unwrap();
            assert_eq!(quote_name(&once).unwrap(), once);
        }
        let once = quote_name_with("x-y", QuoteMode::Permissive).unwrap();
        assert_eq!(quote_name(&once).unwrap(), once);
    }
}
