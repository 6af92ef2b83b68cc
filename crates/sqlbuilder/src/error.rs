//! Error types for sqlbuilder

use thiserror::Error;

/// Result type alias for sqlbuilder operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Error types for statement construction and execution
#[derive(Debug, Error)]
pub enum SqlError {
    /// Binding name is not made of word characters
    #[error("The binding name \"{0}\" must only consist of word characters [a-zA-Z_0-9]")]
    InvalidBindingName(String),

    /// Binding name was already used on this builder (or a merged one)
    #[error("The binding name \"{0}\" must be unique")]
    DuplicateBinding(String),

    /// A collection argument had nothing to expand into
    #[error("Collection parameters must contain at least one element")]
    EmptyCollection,

    /// Table, view, or column name that cannot be used as-is
    #[error("Object name \"{0}\" contains invalid characters")]
    InvalidObjectName(String),

    /// A row mapper produced a null key for `get_map`
    #[error("Null as map key is unsupported")]
    NullMapKey,

    /// A row mapper produced the same key twice for `get_map`
    #[error("Duplicate map key '{0}' is unsupported")]
    DuplicateMapKey(String),

    /// Column index or label does not exist in the cursor
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Cell value could not be converted to the requested type
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Failure reported by the underlying connection capability
    #[error("Driver error: {0}")]
    Driver(String),

    /// Reading a streamed text argument failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PostgreSQL client error
    #[cfg(feature = "postgres")]
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

impl SqlError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// Check if this error signals a mistake in statement construction
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InvalidBindingName(_)
                | Self::DuplicateBinding(_)
                | Self::EmptyCollection
                | Self::InvalidObjectName(_)
        )
    }

    /// Check if this error came from collecting rows into a map
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::NullMapKey | Self::DuplicateMapKey(_))
    }
}
