//! Error types for the diagram engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for codemapper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for codemapper.
#[derive(Error, Debug)]
pub enum Error {
    /// The scan root does not exist or is not a directory.
    #[error("target directory does not exist: {}", .0.display())]
    ScanRootMissing(PathBuf),

    /// Walking the scan root failed somewhere below it.
    #[error("failed to scan {}: {source}", root.display())]
    Scan {
        /// Root directory of the scan.
        root: PathBuf,
        /// Underlying traversal error.
        source: walkdir::Error,
    },

    /// Plain I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The generation call failed or returned something unusable.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A batch file could not be read.
    #[error("failed to read {path}: {message}")]
    FileRead {
        /// Relative path of the file.
        path: String,
        /// Reason reported by the filesystem.
        message: String,
    },

    /// Persisted state could not be written or parsed.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Retry was requested for a file that is not in the Failed state.
    #[error("{path} is {status} and cannot be retried")]
    NotRetryable {
        /// Relative path of the file.
        path: String,
        /// Current status label.
        status: String,
    },

    /// No file with the given path or index is known to the run.
    #[error("unknown file: {0}")]
    UnknownFile(String),
}
