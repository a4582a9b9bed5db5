//! Error types for snapvault operations.
//!
//! Callers need to tell a missing snapshot apart from a filesystem failure and
//! from a store failure, so each gets its own variant. The binary maps any of
//! them to a message on stderr and a non-zero exit.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results across the engine and store.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Referenced snapshot id does not exist (restore/prune/check by id).
    #[error("snapshot {0} not found")]
    SnapshotNotFound(i64),

    /// Filesystem read/write failure during a walk or restore, with the path
    /// that triggered it. The operation aborts; prior writes are not rolled back.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persistent store rejected an operation or is unavailable.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Configuration file could not be read or parsed, or holds an invalid value.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Attach path context to an io error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
