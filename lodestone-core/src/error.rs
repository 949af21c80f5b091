//! Error types for Lodestone operations.

use thiserror::Error;

/// Result type alias using Lodestone's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during Lodestone operations.
///
/// Unknown libraries are deliberately *not* an error: querying, inspecting or
/// dropping a library that has no index returns the empty/absent form so that
/// search stays idempotent across warm-ups.
#[derive(Debug, Error)]
pub enum Error {
    /// Vector dimension mismatch between index and input.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The embedding provider failed to produce a query vector.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The external chunk store failed during result enrichment.
    #[error("store error: {0}")]
    Store(String),
}
