//! Error types for cdeplib

use std::path::PathBuf;
use thiserror::Error;

/// Why an include directive could not be parsed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    /// `#include <foo` or `#include "foo` with no closing delimiter
    #[error("unterminated include reference")]
    Unterminated,
    /// `#include <>` or `#include ""`
    #[error("empty include reference")]
    Empty,
}

/// Errors that abort a dependency scan.
///
/// Every variant is fatal: the scan stops and no output is produced.
/// Recoverable conditions (unresolved includes, computed includes) are
/// reported as [`crate::deps::Diagnostic`] values instead.
#[derive(Error, Debug)]
pub enum CdepError {
    /// Failed to open or read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file named explicitly as a scan root could not be opened
    #[error("cannot read file: {0}")]
    CannotRead(PathBuf),

    /// Include directive with a delimiter but no valid reference
    #[error("invalid #include syntax in {origin} ({reason}): {text}")]
    InvalidInclude {
        origin: String,
        text: String,
        reason: Malformed,
    },

    /// Invalid glob pattern
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// Path does not exist
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// Failed to serialize results
    #[error("failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}
