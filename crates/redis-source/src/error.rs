//! Error types for the staging store.

use thiserror::Error;

/// Errors raised while talking to the staging store.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Redis connection or command error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The SCAN cursor never came back to the start-of-scan sentinel.
    #[error("Key scan did not terminate after {rounds} cursor round-trips")]
    ScanDidNotTerminate { rounds: usize },

    /// The session was already closed.
    #[error("Staging store connection is closed")]
    Closed,

    /// Store-specific failure not covered above.
    #[error("Staging store error: {0}")]
    Store(String),
}
