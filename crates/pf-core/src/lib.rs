//! pf-core: stable foundation for polarflow.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - units (uom angle/time types + constructors)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{PfError, PfResult};
pub use numeric::*;
pub use units::*;
