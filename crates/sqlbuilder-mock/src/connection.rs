use crate::result_set::{GENERATED_VALUE, MockResultSet};
use sqlbuilder::{Close, Column, Connection, Cursor, ScrollMode, SqlError, SqlResult, Statement, Value};
use std::collections::VecDeque;
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Calls observed by a [`MockConnection`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocations {
    pub prepare: usize,
    pub execute_query: usize,
    pub execute_update: usize,
    /// Result sets handed out, scripted or generated.
    pub result_sets: usize,
    pub advance: usize,
    pub value: usize,
    pub statements_closed: usize,
    pub cursors_closed: usize,
}

/// A statement as the mock saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub scroll: ScrollMode,
    pub key_columns: Vec<String>,
    /// Bound values by position; index 0 holds parameter 1.
    pub args: Vec<Value>,
    pub fetch_size: Option<u32>,
    pub max_rows: Option<u64>,
    pub closed: bool,
}

#[derive(Debug)]
struct State {
    result_sets: VecDeque<MockResultSet>,
    generate_single_row: bool,
    update_counts: VecDeque<u64>,
    statements: Vec<RecordedStatement>,
    invocations: Invocations,
    prepare_failure: Option<String>,
    bind_failure: Option<String>,
    close_failure: Option<String>,
    closed: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            result_sets: VecDeque::new(),
            generate_single_row: true,
            update_counts: VecDeque::new(),
            statements: Vec::new(),
            invocations: Invocations::default(),
            prepare_failure: None,
            bind_failure: None,
            close_failure: None,
            closed: false,
        }
    }
}

impl State {
    fn next_result_set(&mut self) -> MockResultSet {
        self.invocations.result_sets += 1;
        let rs = match self.result_sets.pop_front() {
            Some(rs) => rs,
            None if self.generate_single_row => MockResultSet::generated(),
            None => MockResultSet::new("empty"),
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "sqlbuilder.mock", result_set = %rs, rows = rs.len(), "using mock result set");
        rs
    }
}

type Shared = Arc<Mutex<State>>;

fn lock(state: &Shared) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`Connection`] serving scripted result sets.
///
/// Queries take the next queued [`MockResultSet`]. When the queue is empty,
/// the connection answers with a single generated row whose every column
/// reads [`GENERATED_VALUE`] (or with no rows, see
/// [`without_generated_rows`](Self::without_generated_rows)). Updates
/// report the next queued count, then [`GENERATED_VALUE`].
///
/// Clones share state, so a test can keep a handle after moving the
/// connection into a cursor.
#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    state: Shared,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer unscripted queries with an empty result set.
    pub fn without_generated_rows(self) -> Self {
        lock(&self.state).generate_single_row = false;
        self
    }

    /// Queue a result set for the next query.
    pub fn add_result_set(&self, rs: MockResultSet) -> &Self {
        lock(&self.state).result_sets.push_back(rs);
        self
    }

    /// Queue affected-row counts for the next updates.
    pub fn add_update_counts(&self, counts: impl IntoIterator<Item = u64>) -> &Self {
        lock(&self.state).update_counts.extend(counts);
        self
    }

    /// Fail the next prepare with a driver error.
    pub fn fail_next_prepare(&self, message: impl Into<String>) -> &Self {
        lock(&self.state).prepare_failure = Some(message.into());
        self
    }

    /// Fail the next bind with a driver error.
    pub fn fail_next_bind(&self, message: impl Into<String>) -> &Self {
        lock(&self.state).bind_failure = Some(message.into());
        self
    }

    /// Fail the next statement close with a driver error.
    pub fn fail_next_close(&self, message: impl Into<String>) -> &Self {
        lock(&self.state).close_failure = Some(message.into());
        self
    }

    /// Every statement prepared so far, oldest first.
    pub fn statements(&self) -> Vec<RecordedStatement> {
        lock(&self.state).statements.clone()
    }

    pub fn last_statement(&self) -> Option<RecordedStatement> {
        lock(&self.state).statements.last().cloned()
    }

    pub fn invocations(&self) -> Invocations {
        lock(&self.state).invocations.clone()
    }

    /// Scripted result sets not consumed yet.
    pub fn pending_result_sets(&self) -> usize {
        lock(&self.state).result_sets.len()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Forget all scripted data, recordings and counters.
    ///
    /// Unused result sets are logged at WARN.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        if !state.result_sets.is_empty() {
            #[cfg(feature = "tracing")]
            {
                let unused: Vec<String> = state.result_sets.iter().map(ToString::to_string).collect();
                tracing::warn!(target: "sqlbuilder.mock", ?unused, "unused mock result sets");
            }
        }
        let generate_single_row = state.generate_single_row;
        *state = State {
            generate_single_row,
            ..State::default()
        };
    }

    fn open_statement(&self, sql: &str, scroll: ScrollMode, key_columns: &[&str]) -> SqlResult<MockStatement> {
        let mut state = lock(&self.state);
        state.invocations.prepare += 1;
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "sqlbuilder.mock", sql = %sql, keys = ?key_columns, "prepare");

        if state.closed {
            return Err(SqlError::driver("connection is closed"));
        }
        if let Some(message) = state.prepare_failure.take() {
            return Err(SqlError::driver(message));
        }

        state.statements.push(RecordedStatement {
            sql: sql.to_string(),
            scroll,
            key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
            args: Vec::new(),
            fetch_size: None,
            max_rows: None,
            closed: false,
        });
        Ok(MockStatement {
            state: Arc::clone(&self.state),
            id: state.statements.len() - 1,
            keys: None,
        })
    }
}

impl Close for MockConnection {
    fn close(&mut self) -> SqlResult<()> {
        lock(&self.state).closed = true;
        Ok(())
    }
}

impl Connection for MockConnection {
    type Statement = MockStatement;

    fn prepare(&self, sql: &str, scroll: ScrollMode) -> SqlResult<MockStatement> {
        self.open_statement(sql, scroll, &[])
    }

    fn prepare_returning(&self, sql: &str, key_columns: &[&str]) -> SqlResult<MockStatement> {
        self.open_statement(sql, ScrollMode::ForwardOnly, key_columns)
    }
}

/// Statement handed out by [`MockConnection`]; records what is bound to it.
#[derive(Debug)]
pub struct MockStatement {
    state: Shared,
    id: usize,
    keys: Option<MockResultSet>,
}

impl MockStatement {
    fn record<F: FnOnce(&mut RecordedStatement)>(&self, f: F) -> SqlResult<()> {
        let mut state = lock(&self.state);
        if let Some(message) = state.bind_failure.take() {
            return Err(SqlError::driver(message));
        }
        let stmt = &mut state.statements[self.id];
        if stmt.closed {
            return Err(SqlError::driver("statement is closed"));
        }
        f(stmt);
        Ok(())
    }

    fn set_arg(&self, index: usize, value: Value) -> SqlResult<()> {
        if index == 0 {
            return Err(SqlError::driver("parameter indexes start at 1"));
        }
        self.record(|stmt| {
            if stmt.args.len() < index {
                stmt.args.resize(index, Value::Null);
            }
            stmt.args[index - 1] = value;
        })
    }

    fn cursor(&self, rs: MockResultSet) -> MockCursor {
        let max_rows = lock(&self.state).statements[self.id].max_rows;
        MockCursor::new(rs, Arc::clone(&self.state), max_rows)
    }
}

impl Close for MockStatement {
    fn close(&mut self) -> SqlResult<()> {
        let mut state = lock(&self.state);
        if state.statements[self.id].closed {
            return Ok(());
        }
        if let Some(message) = state.close_failure.take() {
            return Err(SqlError::driver(message));
        }
        state.statements[self.id].closed = true;
        state.invocations.statements_closed += 1;
        self.keys = None;
        Ok(())
    }
}

impl Statement for MockStatement {
    type Cursor = MockCursor;

    fn bind(&mut self, index: usize, value: &Value) -> SqlResult<()> {
        self.set_arg(index, value.clone())
    }

    /// Recorded as [`Value::LongText`].
    fn bind_stream(&mut self, index: usize, reader: &mut dyn Read) -> SqlResult<()> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.set_arg(index, Value::LongText(text))
    }

    fn set_fetch_size(&mut self, rows: u32) -> SqlResult<()> {
        self.record(|stmt| stmt.fetch_size = Some(rows))
    }

    fn set_max_rows(&mut self, rows: u64) -> SqlResult<()> {
        self.record(|stmt| stmt.max_rows = Some(rows))
    }

    fn execute_query(&mut self) -> SqlResult<MockCursor> {
        let rs = {
            let mut state = lock(&self.state);
            state.invocations.execute_query += 1;
            state.next_result_set()
        };
        Ok(self.cursor(rs))
    }

    /// Statements prepared with key columns take the next result set as
    /// their generated keys.
    fn execute_update(&mut self) -> SqlResult<u64> {
        let mut state = lock(&self.state);
        state.invocations.execute_update += 1;
        if !state.statements[self.id].key_columns.is_empty() {
            self.keys = Some(state.next_result_set());
        }
        Ok(state
            .update_counts
            .pop_front()
            .unwrap_or(GENERATED_VALUE as u64))
    }

    fn generated_keys(&mut self) -> SqlResult<MockCursor> {
        let keys = self.keys.take().unwrap_or_else(|| MockResultSet::new("no keys"));
        Ok(self.cursor(keys))
    }
}

/// Cursor over a [`MockResultSet`].
#[derive(Debug)]
pub struct MockCursor {
    rs: MockResultSet,
    state: Shared,
    /// 1-based row position; 0 is before the first row.
    pos: usize,
    last_null: bool,
    closed: bool,
}

impl MockCursor {
    fn new(mut rs: MockResultSet, state: Shared, max_rows: Option<u64>) -> Self {
        if let Some(max) = max_rows.filter(|m| *m > 0) {
            rs.rows.truncate(usize::try_from(max).unwrap_or(usize::MAX));
        }
        Self {
            rs,
            state,
            pos: 0,
            last_null: false,
            closed: false,
        }
    }

    pub fn tag(&self) -> &str {
        self.rs.tag()
    }

    fn check_open(&self) -> SqlResult<()> {
        if self.closed {
            return Err(SqlError::driver("cursor is closed"));
        }
        Ok(())
    }

    fn resolve(&self, column: Column<'_>) -> SqlResult<usize> {
        match column {
            Column::Index(i) if i >= 1 && i <= self.rs.columns.len().max(self.row_width()) => Ok(i),
            Column::Index(_) => Err(SqlError::ColumnNotFound(column.to_string())),
            Column::Label(label) => self.find_column(label),
        }
    }

    fn row_width(&self) -> usize {
        self.rs.rows.first().map_or(0, Vec::len)
    }
}

impl Close for MockCursor {
    fn close(&mut self) -> SqlResult<()> {
        if !self.closed {
            self.closed = true;
            lock(&self.state).invocations.cursors_closed += 1;
        }
        Ok(())
    }
}

impl Cursor for MockCursor {
    fn advance(&mut self) -> SqlResult<bool> {
        self.check_open()?;
        lock(&self.state).invocations.advance += 1;
        if self.pos < self.rs.rows.len() {
            self.pos += 1;
            Ok(true)
        } else {
            self.pos = self.rs.rows.len() + 1;
            Ok(false)
        }
    }

    fn value(&mut self, column: Column<'_>) -> SqlResult<Value> {
        self.check_open()?;
        lock(&self.state).invocations.value += 1;
        if self.pos == 0 || self.pos > self.rs.rows.len() {
            return Err(SqlError::driver("cursor is not positioned on a row"));
        }
        let value = if self.rs.generated {
            Value::Int(GENERATED_VALUE)
        } else {
            let index = self.resolve(column)?;
            self.rs.rows[self.pos - 1]
                .get(index - 1)
                .cloned()
                .unwrap_or_default()
        };
        self.last_null = value.is_null();
        Ok(value)
    }

    fn was_null(&self) -> bool {
        self.last_null
    }

    fn column_names(&self) -> SqlResult<Vec<String>> {
        Ok(self.rs.columns.clone())
    }

    /// Generated result sets accept any label.
    fn find_column(&self, label: &str) -> SqlResult<usize> {
        if self.rs.generated {
            return Ok(1);
        }
        self.rs
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(label))
            .map(|i| i + 1)
            .ok_or_else(|| SqlError::ColumnNotFound(label.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_row_answers_any_column() {
        let conn = MockConnection::new();
        let mut stmt = conn.prepare("select x", ScrollMode::ForwardOnly).unwrap();
        let mut rs = stmt.execute_query().unwrap();
        assert!(rs.advance().unwrap());
        assert_eq!(rs.value(Column::Index(7)).unwrap(), Value::Int(GENERATED_VALUE));
        assert_eq!(rs.value(Column::Label("anything")).unwrap(), Value::Int(GENERATED_VALUE));
        assert!(!rs.advance().unwrap());
    }

    #[test]
    fn labels_match_case_insensitively() {
        let conn = MockConnection::new();
        conn.add_result_set(MockResultSet::new("t").columns(["Id", "Name"]).row([Value::from(1), Value::from("a")]));
        let mut stmt = conn.prepare("select", ScrollMode::ForwardOnly).unwrap();
        let mut rs = stmt.execute_query().unwrap();
        assert!(rs.advance().unwrap());
        assert_eq!(rs.find_column("NAME").unwrap(), 2);
        assert_eq!(rs.value(Column::Label("name")).unwrap(), Value::from("a"));
        assert!(matches!(rs.value(Column::Label("missing")), Err(SqlError::ColumnNotFound(_))));
        assert!(matches!(rs.value(Column::Index(3)), Err(SqlError::ColumnNotFound(_))));
    }

    #[test]
    fn binds_are_recorded_per_statement() {
        let conn = MockConnection::new();
        let mut stmt = conn.prepare("select ?, ?", ScrollMode::ScrollInsensitive).unwrap();
        stmt.bind(2, &Value::from("b")).unwrap();
        stmt.bind_stream(1, &mut "long".as_bytes()).unwrap();
        stmt.close().unwrap();
        stmt.close().unwrap();

        let recorded = conn.last_statement().unwrap();
        assert_eq!(recorded.scroll, ScrollMode::ScrollInsensitive);
        assert_eq!(recorded.args, vec![Value::LongText("long".to_string()), Value::from("b")]);
        assert!(recorded.closed);
        assert_eq!(conn.invocations().statements_closed, 1);
    }

    #[test]
    fn reset_keeps_generation_mode() {
        let conn = MockConnection::new().without_generated_rows();
        conn.add_result_set(MockResultSet::new("unused"));
        conn.reset();
        assert_eq!(conn.pending_result_sets(), 0);

        let mut stmt = conn.prepare("select", ScrollMode::ForwardOnly).unwrap();
        let mut rs = stmt.execute_query().unwrap();
        assert!(!rs.advance().unwrap());
    }
}
