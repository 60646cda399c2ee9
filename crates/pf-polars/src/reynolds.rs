//! Reynolds-number interpolation across a family of polars.

use pf_core::ensure_finite;

use crate::bracket::{Bracket, is_ascending, locate};
use crate::curve::{Coefficients, ReferenceCurve};
use crate::error::{PolarError, PolarResult};

/// Interpolate coefficients at `alpha` [deg] and `reynolds` across `curves`.
///
/// `curves` must be non-empty and sorted by ascending Reynolds number. Queries
/// at or beyond either end return that end's polar unmodified (no
/// extrapolation); interior queries blend the bracketing pair linearly, one
/// coefficient at a time. A single curve is returned as-is for any Reynolds
/// number.
pub fn interpolate_reynolds<C: AsRef<ReferenceCurve>>(
    alpha: f64,
    reynolds: f64,
    curves: &[C],
) -> PolarResult<Coefficients> {
    ensure_finite(alpha, "alpha")?;
    ensure_finite(reynolds, "reynolds")?;
    if !is_ascending(curves, |c| c.as_ref().reynolds()) {
        return Err(PolarError::config(
            "reference polars are not sorted by ascending Reynolds number",
        ));
    }
    match locate(curves, |c| c.as_ref().reynolds(), reynolds) {
        None => Err(PolarError::config("no reference polars to interpolate")),
        Some(Bracket::Clamped(i)) => Ok(curves[i].as_ref().coefficients_at(alpha)),
        Some(Bracket::Between { lo, hi, t }) => {
            let c_lo = curves[lo].as_ref().coefficients_at(alpha);
            let c_hi = curves[hi].as_ref().coefficients_at(alpha);
            Ok(c_lo.lerp(c_hi, t))
        }
    }
}
