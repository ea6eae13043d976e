//! Error types for the destination store.

use thiserror::Error;

/// Errors raised by a destination session.
#[derive(Error, Debug)]
pub enum SinkError {
    /// MySQL connection or query error.
    #[error("MySQL error: {0}")]
    MySQL(#[from] mysql_async::Error),

    /// The destination could not be reached.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Transaction used out of order (commit without begin, nested begin, ...).
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The destination refused the row (constraint violation and the like).
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// The session was already closed.
    #[error("Destination connection is closed")]
    Closed,
}
