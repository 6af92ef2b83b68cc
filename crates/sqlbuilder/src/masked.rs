//! Sensitive argument wrapper.
//!
//! Logging a builder prints every argument. Wrapping an argument with [`mask`]
//! replaces it in the log output by a digest of its text form while the
//! underlying value is still what gets bound to the statement.
//!
//! ```ignore
//! let sb = SqlBuilder::with_args("select name from user where secret = ?", args![mask("oops!")]);
//! // select name from user where secret = ?; args=[__masked__:<64 hex chars>]
//! ```

use crate::value::Value;
use std::fmt;

/// Prefix of every masked log value.
pub const MASK_MARKER: &str = "__masked__:";

/// An argument whose log form is a digest instead of the raw value.
#[derive(Debug, Clone)]
pub struct Masked {
    data: Box<Value>,
}

/// Wrap `data` so it is masked when the builder is logged.
pub fn mask(data: impl Into<Value>) -> Masked {
    Masked::new(data)
}

impl Masked {
    pub fn new(data: impl Into<Value>) -> Self {
        Self {
            data: Box::new(data.into()),
        }
    }

    /// The wrapped value, which is what gets bound.
    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_inner(self) -> Value {
        *self.data
    }
}

impl fmt::Display for Masked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data.is_null() {
            return f.write_str("null");
        }
        let text = self.data.to_string();
        if text.is_empty() {
            return Ok(());
        }
        let digest = blake3::hash(text.as_bytes()).to_hex();
        write!(f, "{MASK_MARKER}{digest}")
    }
}

/// Two masked values are equal when their log forms are equal.
impl PartialEq for Masked {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_empty_have_fixed_forms() {
        assert_eq!(mask(Value::Null).to_string(), "null");
        assert_eq!(mask(None::<i32>).to_string(), "null");
        assert_eq!(mask("").to_string(), "");
    }

    #[test]
    fn digest_has_marker_and_fixed_length() {
        let masked = mask("oops!").to_string();
        let digest = masked.strip_prefix(MASK_MARKER).expect("marker");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!masked.contains("oops"));
    }

    #[test]
    fn same_text_form_masks_identically() {
        assert_eq!(mask("hello").to_string(), mask("hello").to_string());
        assert_eq!(mask(42).to_string(), mask("42").to_string());
        assert_eq!(mask(42_i64).to_string(), mask(42_i32).to_string());
        assert_eq!(mask(42), mask("42"));
        assert_ne!(mask(42).to_string(), mask(43).to_string());
    }

    #[test]
    fn into_inner_returns_raw_value() {
        assert_eq!(mask("secret").into_inner(), Value::Text("secret".to_string()));
    }
}
