//! Error types for planbridge-core
//!
//! Only file-level helpers can fail. Encoding, decoding, parsing and merging
//! are total and never produce one of these.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in planbridge-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backup content is not a JSON object at all
    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    /// Entity kind name not recognized
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    /// CSV error from the csv crate
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
