use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors shared by every link store backend.
///
/// Each variant is a distinct failure kind that callers are expected to
/// branch on; the payload is context for logs, not for matching.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("no entry for {0}")]
    NotFound(String),
    #[error("requester not allowed: {0}")]
    Unauthorized(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage is busy: {0}")]
    Busy(String),
    #[error("short code already taken: {0}")]
    Conflict(String),
    #[error("storage query failed: {0}")]
    Query(String),
}
