//! Error types for standoff-tree.
//!
//! Bad annotations are not errors: they are recorded as
//! [`Diagnostic`](crate::Diagnostic)s and processing continues. This type is
//! reserved for broken configuration, unreadable input, and violated
//! internal invariants (bugs in the extractor itself).

use thiserror::Error;

/// Result type for standoff-tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for standoff-tree operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// An internal invariant was violated (e.g. an id referenced before it
    /// was assigned). Indicates a bug, not bad input.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid schema configuration.
    #[error("Schema error: {0}")]
    Schema(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invariant violation error.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::Invariant(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }

    /// Whether this error signals a bug in the extractor rather than bad
    /// input or configuration.
    #[must_use]
    pub fn is_invariant(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }
}
