//! Numbered-parameter templates (`:1`, `:2`, ...).
//!
//! [`from_numbered`] turns such a template into a [`SqlBuilder`] with `?`
//! placeholders and the parameter values as arguments, in the order the
//! placeholders occur. Text inside single-quoted literals is never touched.
//!
//! # Example
//! ```ignore
//! use sqlbuilder::{NumberedValues, from_numbered};
//!
//! let params = NumberedValues::new().param("1", "a").param("2", "b");
//! let sb = from_numbered("select n from t where i=:2 or k=':2'", &params);
//! assert_eq!(sb.to_string(), "select n from t where i=? or k=':2'; args=[b]");
//! ```

use super::builder::SqlBuilder;
use crate::value::Value;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Source of values for a numbered-parameter template.
pub trait NumberedParams {
    /// Every distinct parameter name used by the template, without the `:`.
    fn param_names(&self) -> &[String];

    /// Value for one occurrence of `name`.
    ///
    /// `multi` is set when the occurrence follows `IN (`; the value should
    /// then be a [`Value::List`]. `date_as_string` is set when the occurrence
    /// is rendered with [`date_parameter_as_string`](Self::date_parameter_as_string).
    fn value(&self, name: &str, multi: bool, date_as_string: bool) -> Value;

    /// Whether the occurrence preceded by `prefix` needs the date expression.
    fn date_as_string_needed(&self, prefix: &str) -> bool {
        let _ = prefix;
        false
    }

    /// SQL substituted for occurrences that need the date expression.
    ///
    /// An argument is only added for such an occurrence if the expression
    /// contains a `?`.
    fn date_parameter_as_string(&self) -> String {
        "?".to_string()
    }
}

fn multi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bin\s*\(\s*$").expect("invalid built-in IN regex"))
}

fn to_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bto_date\s*\(\s*(?:nvl\s*\(\s*)?$").expect("invalid built-in TO_DATE regex")
    })
}

fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Regex `\b` at byte offset `pos`.
fn is_word_boundary(text: &str, pos: usize) -> bool {
    let before = text[..pos].chars().next_back().is_some_and(is_word_char);
    let after = text[pos..].chars().next().is_some_and(is_word_char);
    before != after
}

/// Name matching `:name\b` at byte offset `colon`, trying names in order.
fn match_at<'n>(span: &str, colon: usize, names: &'n [String]) -> Option<&'n str> {
    let rest = &span[colon + 1..];
    names
        .iter()
        .filter(|name| !name.is_empty())
        .find(|name| rest.starts_with(name.as_str()) && is_word_boundary(span, colon + 1 + name.len()))
        .map(String::as_str)
}

/// Rewrite one code span (outside quotes), appending to `out` and `args`.
fn rewrite_span(span: &str, params: &dyn NumberedParams, out: &mut String, args: &mut Vec<Value>) {
    let names = params.param_names();
    let mut copied = 0;
    let mut search = 0;

    while let Some(offset) = span[search..].find(':') {
        let colon = search + offset;
        let Some(name) = match_at(span, colon, names) else {
            search = colon + 1;
            continue;
        };

        let prefix = &span[..colon];
        let multi = multi_regex().is_match(prefix);
        let date_as_string = params.date_as_string_needed(prefix);

        out.push_str(&span[copied..colon]);
        if date_as_string {
            let expr = params.date_parameter_as_string();
            if expr.contains('?') {
                args.push(params.value(name, multi, true));
            }
            out.push_str(&expr);
        } else {
            out.push('?');
            args.push(params.value(name, multi, false));
        }

        copied = colon + 1 + name.len();
        search = copied;
    }
    out.push_str(&span[copied..]);
}

/// Translate a numbered-parameter template into a builder.
///
/// Each occurrence of `:name` outside single-quoted literals becomes `?` (or
/// the source's date expression) and contributes one argument, so a name used
/// twice is bound twice. A template without declared names is returned as-is.
pub fn from_numbered(sql: &str, params: &dyn NumberedParams) -> SqlBuilder {
    if params.param_names().is_empty() {
        return SqlBuilder::new(sql);
    }

    let mut out = String::with_capacity(sql.len());
    let mut args = Vec::new();
    let spans: Vec<&str> = sql.split('\'').collect();
    let last = spans.len() - 1;

    for (i, span) in spans.iter().enumerate() {
        if i % 2 == 0 {
            rewrite_span(span, params, &mut out, &mut args);
        } else {
            out.push('\'');
            out.push_str(span);
            // An unterminated literal runs to the end of the text.
            if i < last {
                out.push('\'');
            }
        }
    }

    SqlBuilder::with_args(out, args)
}

/// A [`NumberedParams`] backed by a map of values.
///
/// In an `IN (...)` context a text value is split on commas into a list.
/// Occurrences inside `TO_DATE(` (optionally `TO_DATE(NVL(`) use the date
/// expression when one is configured.
#[derive(Debug, Clone, Default)]
pub struct NumberedValues {
    names: Vec<String>,
    values: HashMap<String, Value>,
    date_expression: Option<String>,
}

impl NumberedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of parameter `name`.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if !self.values.contains_key(&name) {
            self.names.push(name.clone());
        }
        self.values.insert(name, value.into());
        self
    }

    /// Values for `:1`, `:2`, ... in order.
    pub fn positional<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        values
            .into_iter()
            .enumerate()
            .fold(Self::new(), |params, (i, v)| params.param((i + 1).to_string(), v))
    }

    /// Render occurrences inside `TO_DATE(` with `expression`, e.g.
    /// `to_char(?, 'YYYY-MM-DD')`.
    pub fn date_expression(mut self, expression: impl Into<String>) -> Self {
        self.date_expression = Some(expression.into());
        self
    }
}

impl NumberedParams for NumberedValues {
    fn param_names(&self) -> &[String] {
        &self.names
    }

    fn value(&self, name: &str, multi: bool, _date_as_string: bool) -> Value {
        let value = self.values.get(name).cloned().unwrap_or_default();
        match value {
            Value::Text(text) if multi => Value::List(
                text.split(',')
                    .map(|part| Value::Text(part.trim().to_string()))
                    .collect(),
            ),
            other => other,
        }
    }

    fn date_as_string_needed(&self, prefix: &str) -> bool {
        self.date_expression.is_some() && to_date_regex().is_match(prefix)
    }

    fn date_parameter_as_string(&self) -> String {
        self.date_expression.clone().unwrap_or_else(|| "?".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> NumberedValues {
        NumberedValues::positional(["a", "b", "c"])
    }

    fn render(sql: &str, params: &dyn NumberedParams) -> String {
        from_numbered(sql, params).render().unwrap()
    }

    #[test]
    fn placeholders_follow_occurrence_order() {
        let p = abc();
        assert_eq!(
            render("select n from t where i=:1)", &p),
            "select n from t where i=?); args=[a]"
        );
        assert_eq!(
            render("select n from t where i=:2 or i=:1)", &p),
            "select n from t where i=? or i=?); args=[b, a]"
        );
        assert_eq!(
            render("select n from t where i=:2 or k=:2)", &p),
            "select n from t where i=? or k=?); args=[b, b]"
        );
    }

    #[test]
    fn quoted_literals_are_untouched() {
        let p = abc();
        assert_eq!(
            render("select n from t where i=:2 or k=':4')", &p),
            "select n from t where i=? or k=':4'); args=[b]"
        );
        assert_eq!(
            render("select n from t where i=:2 or k=':2')", &p),
            "select n from t where i=? or k=':2'); args=[b]"
        );
        assert_eq!(
            render("select 'it''s :1' from t where i=:1", &p),
            "select 'it''s :1' from t where i=?; args=[a]"
        );
    }

    #[test]
    fn unterminated_literal_is_preserved() {
        let p = abc();
        assert_eq!(render("select :1, 'x :2", &p), "select ?, 'x :2; args=[a]");
    }

    #[test]
    fn names_match_whole_tokens_only() {
        let p = abc();
        assert_eq!(
            render("select n from t where i=:11 or i=:2)", &p),
            "select n from t where i=:11 or i=?); args=[b]"
        );
        assert_eq!(render("select :1x, :3", &p), "select :1x, ?; args=[c]");
    }

    #[test]
    fn longer_names_are_not_shadowed() {
        let p = NumberedValues::positional((1..=11).map(|i| format!("v{i}")));
        assert_eq!(render("x=:11 and y=:1", &p), "x=? and y=?; args=[v11, v1]");
    }

    #[test]
    fn in_clause_expands_comma_separated_text() {
        let p = NumberedValues::new().param("1", "a, b,c").param("2", 7);
        assert_eq!(
            render("select n from t where k in ( :1 ) and j = :2", &p),
            "select n from t where k in ( ?,?,? ) and j = ?; args=[a, b, c, 7]"
        );
        assert_eq!(
            render("select n from t where k = :1", &p),
            "select n from t where k = ?; args=[a, b,c]"
        );
    }

    #[test]
    fn date_expression_replaces_placeholder() {
        let p = NumberedValues::new()
            .param("1", "2024-01-31")
            .date_expression("to_char(?, 'YYYY-MM-DD')");
        assert_eq!(
            render("select n from t where d <= TO_DATE(:1)", &p),
            "select n from t where d <= TO_DATE(to_char(?, 'YYYY-MM-DD')); args=[2024-01-31]"
        );

        let literal = NumberedValues::new()
            .param("1", "x")
            .date_expression("sysdate");
        assert_eq!(
            render("select n from t where d <= to_date( nvl( :1", &literal),
            "select n from t where d <= to_date( nvl( sysdate; args=[]"
        );
    }

    #[test]
    fn no_names_returns_template_unchanged() {
        let p = NumberedValues::new();
        let sb = from_numbered("select ':1' from t where i=:1", &p);
        assert_eq!(sb.statement(), "select ':1' from t where i=:1");
        assert!(sb.arguments().is_empty());
    }
}
