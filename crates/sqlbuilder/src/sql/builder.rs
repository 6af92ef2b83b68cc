use super::bindings::Bindings;
use crate::config::{ScrollMode, StatementOptions};
use crate::error::{SqlError, SqlResult};
use crate::value::{Value, write_list};
use std::fmt;

/// Separator inserted by every `append`.
const DELIMITER: &str = " ";

/// An incrementally built, parameterized SQL statement.
///
/// `SqlBuilder` keeps the SQL text, the positional `?` arguments and the named
/// identifier bindings (`${name}` / `:{name}`) separately until the statement is
/// executed or rendered. Collection arguments ([`Value::List`]) are expanded into
/// one `?` per element at that point.
///
/// # Example
/// ```ignore
/// use sqlbuilder::{SqlBuilder, args};
///
/// let mut sb = SqlBuilder::with_args("select a, ${b} from ${t} where x > ?", args![5]);
/// sb.bind("b", "BCOL")?.bind("t", "table1")?;
/// assert_eq!(sb.to_string(), "select a, BCOL from table1 where x > ?; args=[5]");
/// # Ok::<(), sqlbuilder::SqlError>(())
/// ```
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    statement: String,
    arguments: Vec<Value>,
    bindings: Bindings,
    options: StatementOptions,
}

impl SqlBuilder {
    /// Create a builder from a SQL fragment without arguments.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            statement: sql.into(),
            ..Self::default()
        }
    }

    /// Create a builder from a SQL fragment and its positional arguments.
    pub fn with_args<I>(sql: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self {
            statement: sql.into(),
            arguments: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Append a SQL fragment, separated by a single space.
    pub fn append(&mut self, sql: &str) -> &mut Self {
        self.statement.push_str(DELIMITER);
        self.statement.push_str(sql);
        self
    }

    /// Append a SQL fragment together with its positional arguments.
    pub fn append_args<I>(&mut self, sql: &str, args: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.append(sql);
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append another builder: its text, a copy of its arguments and its bindings.
    ///
    /// Fails without modifying `self` if both builders bound the same name.
    pub fn append_builder(&mut self, other: &SqlBuilder) -> SqlResult<&mut Self> {
        self.bindings.merge(&other.bindings)?;
        self.arguments.extend(other.arguments.iter().cloned());
        self.statement.push_str(DELIMITER);
        self.statement.push_str(&other.statement);
        Ok(self)
    }

    /// Surround the current text with `before` and `after`. No delimiter is added.
    pub fn wrap(&mut self, before: &str, after: &str) -> &mut Self {
        self.statement.insert_str(0, before);
        self.statement.push_str(after);
        self
    }

    /// `wrap("select count(*) from")` turns `X` into `select count(*) from (X)`.
    pub fn wrap_parens(&mut self, before: &str) -> &mut Self {
        self.wrap(&format!("{before} ("), ")")
    }

    /// Bind `name` to a table, view, or column name.
    ///
    /// The name must consist of word characters and must not have been bound
    /// before. The value is quoted (or rejected) when the bindings are applied.
    pub fn bind(&mut self, name: &str, value: impl Into<String>) -> SqlResult<&mut Self> {
        self.bindings.bind(name, value.into())?;
        Ok(self)
    }

    /// Bind `name` to a list of names, substituted as `a, b, c`.
    pub fn bind_list<I>(&mut self, name: &str, values: I) -> SqlResult<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.bindings
            .bind_list(name, values.into_iter().map(Into::into).collect())?;
        Ok(self)
    }

    /// Bind several single-valued names at once.
    pub fn bind_all<I, K, V>(&mut self, bindings: I) -> SqlResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = bindings
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.bindings.bind_all(pairs)?;
        Ok(self)
    }

    /// Substitute all bound names into the text and forget the bindings.
    ///
    /// After this the names can be bound again, which lets a parent builder
    /// reuse a name that a merged sub-query already resolved.
    pub fn apply_bindings(&mut self) -> SqlResult<&mut Self> {
        if !self.bindings.is_empty() {
            let applied = self.bindings.substitute(&self.statement)?.into_owned();
            self.statement = applied;
            self.bindings.clear();
        }
        Ok(self)
    }

    /// True if there is neither text nor an argument.
    pub fn is_empty(&self) -> bool {
        self.statement.is_empty() && self.arguments.is_empty()
    }

    pub fn is_not_empty(&self) -> bool {
        !self.is_empty()
    }

    /// The raw SQL text, with unexpanded placeholders and unapplied bindings.
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// The raw arguments, with collections not yet expanded.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn options(&self) -> &StatementOptions {
        &self.options
    }

    /// Replace the execution options.
    pub fn with_options(&mut self, options: StatementOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Request a scroll-insensitive cursor.
    pub fn random_access(&mut self) -> &mut Self {
        self.options.scroll = ScrollMode::ScrollInsensitive;
        self
    }

    pub fn with_fetch_size(&mut self, fetch_size: u32) -> &mut Self {
        self.options.fetch_size = Some(fetch_size);
        self
    }

    pub fn with_max_rows(&mut self, max_rows: u64) -> &mut Self {
        self.options.max_rows = Some(max_rows);
        self
    }

    /// Final statement text and arguments, without touching `self`.
    pub(crate) fn expand(&self) -> SqlResult<(String, Vec<Value>)> {
        let (text, args) = expand_collections(&self.statement, &self.arguments)?;
        let sql = self.bindings.substitute(&text)?.into_owned();
        Ok((sql, args))
    }

    /// Apply the bindings in place and return the statement ready for execution.
    ///
    /// Only the returned text is expanded, so executing the builder again
    /// expands the same arguments again.
    pub(crate) fn finalize(&mut self) -> SqlResult<(String, Vec<Value>)> {
        self.apply_bindings()?;
        self.expand()
    }

    /// Log form: the final statement followed by `; args=[...]`.
    ///
    /// Masked arguments print as digests. The builder is not modified.
    pub fn render(&self) -> SqlResult<String> {
        let (sql, args) = self.expand()?;
        Ok(format!("{sql}; args={}", ArgList(&args)))
    }

    /// The final statement text, without arguments. The builder is not modified.
    pub fn to_sql(&self) -> SqlResult<String> {
        self.expand().map(|(sql, _)| sql)
    }
}

/// Expand every [`Value::List`] argument into `?,?,...` at its placeholder.
///
/// Arguments beyond the last `?` are dropped. A `?` inside string literals is
/// not distinguished from a placeholder.
pub(crate) fn expand_collections(statement: &str, arguments: &[Value]) -> SqlResult<(String, Vec<Value>)> {
    let mut sql = String::with_capacity(statement.len());
    let mut expanded = Vec::with_capacity(arguments.len());
    let mut rest = statement;

    for arg in arguments {
        let Some(pos) = rest.find('?') else {
            break;
        };
        sql.push_str(&rest[..=pos]);
        rest = &rest[pos + 1..];

        match arg {
            Value::List(items) => {
                if items.is_empty() {
                    return Err(SqlError::EmptyCollection);
                }
                for _ in 1..items.len() {
                    sql.push_str(",?");
                }
                expanded.extend(items.iter().cloned());
            }
            other => expanded.push(other.clone()),
        }
    }
    sql.push_str(rest);
    Ok((sql, expanded))
}

/// Displays arguments as `[a, b, c]`.
pub(crate) struct ArgList<'a>(pub(crate) &'a [Value]);

impl fmt::Display for ArgList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, self.0)
    }
}

impl fmt::Display for SqlBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(rendered) => f.write_str(&rendered),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    target: "sqlbuilder.sql",
                    error = %_err,
                    "rendering statement failed, showing raw text",
                );
                write!(f, "{}; args={}", self.statement, ArgList(&self.arguments))
            }
        }
    }
}

