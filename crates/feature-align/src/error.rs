//! Alignment Error Types

use thiserror::Error;

/// Errors while building or aligning feature matrices
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    /// Malformed axes: empty reference, duplicate identifiers, ragged rows
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AlignError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AlignError::InvalidInput(message.into())
    }
}
