//! Pass-level errors.
//!
//! Only failures that prevent a pass from running at all are errors.
//! Everything that goes wrong for a single key is reported as a
//! [`crate::SyncOutcome`] in the pass summary instead.

use redis_source::SourceError;
use std::fmt;
use thiserror::Error;

/// Which of the two stores an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Redis, holding the staged records
    Source,
    /// MySQL, receiving the rows
    Destination,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Source => f.write_str("staging store"),
            StoreKind::Destination => f.write_str("destination store"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// A store could not be reached at pass start; no key was touched.
    #[error("Failed to connect to {store}: {reason}")]
    ConnectionInit { store: StoreKind, reason: String },

    /// The SCAN cursor never returned to its start sentinel.
    #[error("Key scan did not terminate after {rounds} cursor round-trips")]
    ScanDidNotTerminate { rounds: usize },

    /// The staging store failed while enumerating keys.
    #[error("Key scan failed: {0}")]
    ScanFailed(#[source] SourceError),

    /// A previous pass over the same stores has not finished.
    #[error("A sync pass is already running")]
    PassAlreadyRunning,

    /// Schemas or bindings are unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<SourceError> for SyncError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::ScanDidNotTerminate { rounds } => SyncError::ScanDidNotTerminate { rounds },
            other => SyncError::ScanFailed(other),
        }
    }
}
