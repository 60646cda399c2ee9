//! Polar and interpolation errors.

use pf_core::PfError;
use thiserror::Error;

/// Result type for polar operations.
pub type PolarResult<T> = Result<T, PolarError>;

/// Errors raised while building or querying reference polars.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolarError {
    /// Malformed interpolation inputs (empty sets, unsorted axes, degenerate spans).
    #[error("Invalid configuration: {what}")]
    InvalidConfiguration { what: String },

    /// A sample or query carried NaN or infinity.
    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}

impl PolarError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        Self::InvalidConfiguration { what: what.into() }
    }
}

impl From<PfError> for PolarError {
    fn from(err: PfError) -> Self {
        match err {
            PfError::NonFinite { what, value } => PolarError::NonFinite { what, value },
        }
    }
}
