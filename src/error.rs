//! Error types for batchq
//!
//! `BatchError` is what callers of the facade see. `StoreError` is what a
//! backing store reports for a failed bulk call or query.

use thiserror::Error;

/// Result type alias using BatchError
pub type Result<T> = std::result::Result<T, BatchError>;

/// Unified error type for batchq operations
#[derive(Debug, Error)]
pub enum BatchError {
    // -------------------------------------------------------------------------
    // Enqueue-time Errors
    // -------------------------------------------------------------------------
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Queue manager is shut down")]
    Shutdown,

    // -------------------------------------------------------------------------
    // Select Errors
    // -------------------------------------------------------------------------
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Timed out waiting for select result")]
    Timeout,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Worker Errors
    // -------------------------------------------------------------------------
    #[error("Flush worker error: {0}")]
    Worker(String),
}

/// Errors reported by a [`DocumentStore`](crate::store::DocumentStore)
///
/// Cloneable so a single group failure can be attached to every item in it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached at all
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused a document (e.g. a uniqueness violation)
    #[error("rejected: {0}")]
    Rejected(String),

    /// A query could not be executed
    #[error("query failed: {0}")]
    Query(String),
}
