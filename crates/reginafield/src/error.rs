//! Field Error Types
//!
//! Every stage either returns a complete new table or one of these errors.
//! Degenerate distributions are handled by fallback policies and never show up here.

use thiserror::Error;

/// Result type alias for field operations
pub type Result<T> = std::result::Result<T, FieldError>;

/// Errors raised by the field core
#[derive(Error, Debug)]
pub enum FieldError {
    /// A required column is absent from a table handed to a stage
    #[error("{context} is missing required column '{column}'")]
    MissingColumn {
        /// Key of the absent column
        column: String,
        /// Which table or operation asked for it
        context: String,
    },

    /// An operation needs at least one qualifying row
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A column exists but holds the wrong kind of values
    #[error("Column '{column}' has type {found}, expected {expected}")]
    ColumnType {
        /// Column key
        column: String,
        /// Kind the operation needs
        expected: &'static str,
        /// Kind actually stored
        found: &'static str,
    },

    /// A column's length differs from the table's row count
    #[error("Column '{column}' has {found} rows, table has {expected}")]
    LengthMismatch {
        /// Column key
        column: String,
        /// Rows in the table
        expected: usize,
        /// Rows in the offending column
        found: usize,
    },

    /// A parameter is outside its valid domain
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FieldError {
    /// Shorthand for [`FieldError::MissingColumn`]
    pub fn missing(column: impl Into<String>, context: impl Into<String>) -> Self {
        FieldError::MissingColumn {
            column: column.into(),
            context: context.into(),
        }
    }

    /// Whether this is a schema failure (an absent column)
    pub fn is_schema(&self) -> bool {
        matches!(self, FieldError::MissingColumn { .. })
    }

    /// Whether this is an empty-input failure
    pub fn is_empty_input(&self) -> bool {
        matches!(self, FieldError::EmptyInput(_))
    }
}

impl From<serde_json::Error> for FieldError {
    fn from(err: serde_json::Error) -> Self {
        FieldError::Config(err.to_string())
    }
}
