//! Error types for genrematch
//!
//! Per-record and per-file errors (`MalformedRecord`, `Extraction`,
//! `NoMatchFound`) are recovered by the caller and reported; the rest are
//! structural and end the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A database or query row could not be parsed
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// No database record matched the query within tolerance
    #[error("no matching genre found")]
    NoMatchFound,

    /// The feature extractor failed on one file
    #[error("failed to extract features from {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    /// The persisted database could not be opened
    #[error("database unavailable at {}: {source}", path.display())]
    DatabaseUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corpus or input path does not exist
    #[error("input not found: {}", .0.display())]
    InputUnavailable(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn extraction(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Extraction {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
