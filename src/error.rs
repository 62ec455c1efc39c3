//! Error types shared across the trainers.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the question data file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DataError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("question data is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question data contains no questions")]
    Empty,
}

/// A question range the user typed that does not fit the loaded questions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Please enter a valid range (1-{max})")]
    Invalid { max: u32 },
}

/// Errors emitted while writing the save file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SaveError {
    #[error("save data has no backing file")]
    NoPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Encode(#[from] bincode::error::EncodeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors emitted by a scripture text lookup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LookupError {
    #[error("scripture service returned an empty passage")]
    Empty,
    #[error("scripture request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while resolving the command line.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid scripture service url {url}: {reason}")]
    ScriptureUrl { url: String, reason: String },
    #[error("no state directory available; pass --state-dir")]
    NoStateDir,
    #[error(transparent)]
    Prompt(#[from] dialoguer::Error),
}
