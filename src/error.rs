//! Error types for the store and the search coordinator
//!
//! Store-level failures never reach the code that feeds search terms in:
//! the coordinator turns every [`QueryError`] into a failed feed state.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure reading a record source from disk
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file could not be interpreted as a record source at all
    #[error("{path} is not a record file: {reason}")]
    Format { path: PathBuf, reason: String },
}

/// Reason a single row was skipped during a load
///
/// These are recovered locally: the row is counted and dropped, the load
/// continues. `index` is the 0-based row in the source: the line of a JSON
/// lines file, the element of an array, or the position in the iterator
/// handed to [`TextIndexStore::load`](crate::store::TextIndexStore::load).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("row {index}: empty name")]
    EmptyName { index: usize },

    #[error("row {index}: {reason}")]
    Invalid { index: usize, reason: String },

    #[error("row {index}: duplicate of an earlier row")]
    Duplicate { index: usize },
}

/// Failure of a single store query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("search term is {len} bytes (max {max})")]
    TermTooLong { len: usize, max: usize },

    #[error("search timed out after {0:?}")]
    Timeout(Duration),

    #[error("search backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("no tokio runtime is available to drive the search coordinator")]
    NoRuntime,
}
