use std::path::PathBuf;

use thiserror::Error;

/// Error type for decoding failures.
///
/// Every variant is a per-file condition: the update driver logs it and moves
/// on to the next file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to parse GPX file: {0}")]
    GpxError(String),
    #[error("Failed to parse FIT file: {0}")]
    FitError(String),
    #[error("Required field missing: {0}")]
    MissingField(&'static str),
    #[error("No track points found")]
    Empty,
    #[error("Unsupported file format")]
    UnsupportedFormat,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Segment definitions not found at {0}")]
    MissingDefinitions(PathBuf),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricError {
    /// The time-weighted population is too small for a sample standard deviation.
    #[error("Need at least 2 weighted samples, got {samples}")]
    NotEnoughSamples { samples: usize },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
