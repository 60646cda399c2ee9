//! Error types for the pf-app service layer.

use std::path::PathBuf;

/// Application error wrapping the backend crates' errors for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Polar not found in store: {0}")]
    PolarNotFound(String),

    #[error("Interpolation error: {0}")]
    Polar(String),

    #[error(transparent)]
    Batch(#[from] pf_batch::BatchError),

    #[error("Store error: {0}")]
    Results(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<pf_polars::PolarError> for AppError {
    fn from(err: pf_polars::PolarError) -> Self {
        AppError::Polar(err.to_string())
    }
}

impl From<pf_results::ResultsError> for AppError {
    fn from(err: pf_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}
