//! Table I/O Error Types

use feature_align::AlignError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors while reading, writing or querying tables
#[derive(Debug, Error)]
pub enum TableError {
    /// File could not be opened or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structural problem: missing header, wrong field count, duplicate ids
    #[error("Malformed table: {0}")]
    InvalidFormat(String),

    /// Cell that should be numeric is not
    #[error("Invalid value '{value}' at line {line}, column '{column}'")]
    InvalidValue {
        value: String,
        line: u64,
        column: String,
    },

    /// Requested metadata column does not exist
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Parsed axes do not form a valid matrix
    #[error(transparent)]
    Matrix(#[from] AlignError),
}

impl From<csv::Error> for TableError {
    fn from(err: csv::Error) -> Self {
        TableError::InvalidFormat(err.to_string())
    }
}

impl TableError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TableError::Io {
            path: path.into(),
            source,
        }
    }
}
