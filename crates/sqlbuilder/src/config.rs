/// Result cursor scrolling behavior requested from the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrollMode {
    #[default]
    ForwardOnly,
    /// Random access over a snapshot of the result.
    ScrollInsensitive,
}

/// Execution-shaping settings carried by every `SqlBuilder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementOptions {
    /// Cursor scrolling mode.
    pub scroll: ScrollMode,
    /// Fetch size hint. `None` (or zero) keeps the driver default.
    pub fetch_size: Option<u32>,
    /// Maximum number of rows. `None` keeps the driver default; zero means unlimited.
    pub max_rows: Option<u64>,
    /// Truncate logged SQL to this many bytes. `None` logs the full text.
    pub max_log_sql_length: Option<usize>,
}

impl Default for StatementOptions {
    fn default() -> Self {
        Self {
            scroll: ScrollMode::ForwardOnly,
            fetch_size: None,
            max_rows: None,
            max_log_sql_length: Some(200),
        }
    }
}

impl StatementOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scroll mode.
    pub fn scroll(mut self, mode: ScrollMode) -> Self {
        self.scroll = mode;
        self
    }

    /// Set the fetch size hint.
    pub fn fetch_size(mut self, size: u32) -> Self {
        self.fetch_size = Some(size);
        self
    }

    /// Cap the number of returned rows.
    pub fn max_rows(mut self, rows: u64) -> Self {
        self.max_rows = Some(rows);
        self
    }

    /// Set the logged SQL truncation length.
    pub fn max_log_sql_length(mut self, len: usize) -> Self {
        self.max_log_sql_length = Some(len);
        self
    }

    /// Log the full SQL text.
    pub fn no_log_truncation(mut self) -> Self {
        self.max_log_sql_length = None;
        self
    }

    /// Fetch size to hand to the driver, if one should be set at all.
    pub(crate) fn effective_fetch_size(&self) -> Option<u32> {
        self.fetch_size.filter(|n| *n > 0)
    }
}
