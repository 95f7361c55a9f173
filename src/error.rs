//! Error handling
//!
//! One taxonomy for the whole crate. Every variant is recoverable by the
//! caller and raised synchronously from the call that detected it; nothing
//! is retried internally. Units dispatched through the task pool catch
//! these at the unit boundary and log them instead (see `pool`).

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // Source errors (load side)
    #[error("dataset '{dataset_id}': source file '{path}' does not exist")]
    SourceNotFound { dataset_id: String, path: PathBuf },

    #[error("dataset '{dataset_id}': source path '{path}' is not a file")]
    SourceNotAFile { dataset_id: String, path: PathBuf },

    #[error("dataset '{dataset_id}': source '{path}' is empty or invalid: {reason}")]
    EmptyOrInvalidSource {
        dataset_id: String,
        path: PathBuf,
        reason: String,
    },

    #[error("dataset '{dataset_id}': unsupported data format '{format}'")]
    UnsupportedFormat { dataset_id: String, format: String },

    // Validation errors
    #[error("dataset '{dataset_id}': mandatory columns missing: {}", missing.join(", "))]
    MandatoryFieldsMissing {
        dataset_id: String,
        missing: Vec<String>,
    },

    #[error("dataset '{dataset_id}': search columns not found: {}", missing.join(", "))]
    SearchColumnsMissing {
        dataset_id: String,
        missing: Vec<String>,
    },

    #[error("dataset '{dataset_id}': data not loaded")]
    DataNotLoaded { dataset_id: String },

    // Destination errors (save side)
    #[error("dataset '{dataset_id}': destination '{path}' exists and is not a file")]
    InvalidDestination { dataset_id: String, path: PathBuf },

    #[error("dataset '{dataset_id}': destination '{path}' is not writable: {reason}")]
    DestinationUnwritable {
        dataset_id: String,
        path: PathBuf,
        reason: String,
    },

    // Scoring errors
    #[error("no base risk score defined for event pattern '{pattern}'")]
    UnscoredPatternName { pattern: String },

    // Pool errors
    #[error("task pool busy: {outstanding} tracked unit(s) still outstanding")]
    PoolBusy { outstanding: usize },
}
