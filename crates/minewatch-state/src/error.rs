//! Error types for the state store.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while loading, saving, or locking state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state: {0}")]
    Read(String),

    #[error("failed to write state: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    /// The document exists but cannot be trusted. Never silently reset.
    #[error("state document is corrupt: {0}")]
    Corrupt(String),

    #[error("lock error: {0}")]
    Lock(String),
}
