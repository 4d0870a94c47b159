//! Error types for the history engine.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for history operations.
///
/// Nothing here is fatal to the host process; every failure is scoped to a
/// single file's history operation. Malformed individual records are absorbed
/// and logged during load rather than surfaced through this type.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to write history for {}: {source}", .path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read history at {}: {source}", .path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed snapshot record: {0}")]
    MalformedSnapshot(String),

    #[error("Source path cannot be tracked: {0}")]
    InvalidPath(String),
}

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
