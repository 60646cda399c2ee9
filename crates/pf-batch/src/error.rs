//! Error types for batch planning and execution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a batch before or while it is dispatched.
///
/// A single solver invocation that fails is not a `BatchError`; it is
/// reported as [`crate::JobOutcome::Failure`] and never aborts siblings.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Invalid configuration: {what}")]
    InvalidConfiguration { what: String },

    #[error("Too many jobs: {requested} requested, limit is {limit}")]
    TooManyJobs { requested: usize, limit: usize },

    #[error("Solver unavailable at {}: {reason}", path.display())]
    SolverUnavailable { path: PathBuf, reason: String },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Batch dispatcher panicked")]
    DispatcherPanicked,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        Self::InvalidConfiguration { what: what.into() }
    }
}

pub type BatchResult<T> = Result<T, BatchError>;
