use sqlbuilder::Value;
use std::fmt;

/// Value of every cell in a generated result set.
pub const GENERATED_VALUE: i64 = 42;

/// Scripted rows served by a [`MockConnection`](crate::MockConnection).
///
/// ```ignore
/// let rs = MockResultSet::new("employees")
///     .columns(["id", "name"])
///     .row([Value::from(1), Value::from("Alice")])
///     .row([Value::from(2), Value::Null]);
/// conn.add_result_set(rs);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockResultSet {
    pub(crate) tag: String,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<Value>>,
    pub(crate) generated: bool,
}

impl MockResultSet {
    /// Empty result set; `tag` names it in logs.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Set the column labels.
    pub fn columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append a row.
    pub fn row<I>(mut self, cells: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    /// Append a single-cell row for each value.
    pub fn values<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.rows
            .extend(values.into_iter().map(|v| vec![v.into()]));
        self
    }

    /// One row in which every column reads [`GENERATED_VALUE`].
    pub(crate) fn generated() -> Self {
        Self {
            tag: "generated".to_string(),
            columns: Vec::new(),
            rows: vec![Vec::new()],
            generated: true,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for MockResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MockResultSet#{}", self.tag)
    }
}
