//! Error types for plates operations.

use thiserror::Error;

/// Errors that abort a run.
///
/// Findings about the book itself (missing files, oversized images, duplicate
/// ids) are not errors; they are collected into the [`Report`](crate::Report).
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A directive that cannot be reasoned about past its start.
    #[error("Malformed illustration marker at line {line}, column {column}: {reason}")]
    MalformedMarker {
        offset: usize,
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("Unknown validation profile: {0}")]
    UnknownProfile(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
