//! Error types for docqa-vector.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for docqa-vector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docqa-vector operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No persisted index exists at the given directory.
    #[error("No persisted index found at '{}'", .0.display())]
    NotFound(PathBuf),

    /// The persisted artifacts exist but cannot be parsed or disagree with each other.
    #[error("Persisted index is corrupt: {0}")]
    Corrupt(String),

    /// Dimension mismatch between a vector and the index.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions.
        expected: usize,
        /// Actual dimensions provided.
        actual: usize,
    },

    /// Invalid vector (e.g., empty, contains NaN).
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Two entries were built with the same id.
    #[error("Duplicate entry id '{0}'")]
    DuplicateId(String),

    /// Persistence error (serialization, staging, swap).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
