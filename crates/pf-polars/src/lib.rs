//! pf-polars: reference polars and coefficient interpolation for polarflow.
//!
//! Provides:
//! - `ReferenceCurve`: one lift/drag/moment polar versus angle of attack
//! - Reynolds-number interpolation across a polar family
//! - Deflection state sets for flow-control-augmented sections
//! - Spanwise control-surface interpolation between two anchored sets
//! - Boundary-layer detail records and operating points
//!
//! Interpolation is synchronous and allocation-free per query; all inputs are
//! validated when the tables are built.
//!
//! # Example
//!
//! ```
//! use pf_polars::{FlowConditions, PolarSample, ReferenceCurve, interpolate_reynolds};
//!
//! let polar = |re: f64, cl: f64| {
//!     ReferenceCurve::new(
//!         format!("foil_{re}"),
//!         "foil",
//!         FlowConditions { reynolds: re, ..FlowConditions::default() },
//!         vec![PolarSample::new(0.0, cl, 0.01, 0.0), PolarSample::new(10.0, cl + 1.0, 0.02, 0.0)],
//!     )
//!     .unwrap()
//! };
//! let family = vec![polar(1e5, 0.0), polar(1e6, 0.2)];
//! let c = interpolate_reynolds(0.0, 5.5e5, &family).unwrap();
//! assert!((c.cl - 0.1).abs() < 1e-12);
//! ```

pub mod boundary_layer;
pub mod bracket;
pub mod control_surface;
pub mod curve;
pub mod deflection;
pub mod error;
pub mod reynolds;

// Re-exports for ergonomics
pub use boundary_layer::{BoundaryLayerRecord, OperatingPoint, Side, StationSample};
pub use bracket::Bracket;
pub use control_surface::{BETA_SLOPE_STEP_DEG, ControlSurfaceContext, DeflectionMotion};
pub use curve::{Coefficients, FlowConditions, PolarSample, ReferenceCurve};
pub use deflection::{DeflectionState, DeflectionStateSet};
pub use error::{PolarError, PolarResult};
pub use reynolds::interpolate_reynolds;
