//! Control-surface deflection states, each backed by its own Reynolds family.

use std::sync::Arc;

use pf_core::ensure_finite;

use crate::bracket::{Bracket, locate};
use crate::curve::{Coefficients, ReferenceCurve};
use crate::error::{PolarError, PolarResult};
use crate::reynolds::interpolate_reynolds;

/// One discrete control-surface angle with its polar family.
#[derive(Debug, Clone)]
pub struct DeflectionState {
    /// Control-surface deflection [deg]
    pub deflection: f64,
    /// Pitch offset subtracted from the query angle of attack [deg]
    pub pitch_offset: f64,
    curves: Vec<Arc<ReferenceCurve>>,
}

impl DeflectionState {
    /// Create a state. Curves are sorted by ascending Reynolds number.
    pub fn new(
        deflection: f64,
        pitch_offset: f64,
        mut curves: Vec<Arc<ReferenceCurve>>,
    ) -> PolarResult<Self> {
        ensure_finite(deflection, "deflection")?;
        ensure_finite(pitch_offset, "pitch_offset")?;
        if curves.is_empty() {
            return Err(PolarError::config(format!(
                "deflection state {deflection} has no reference polars"
            )));
        }
        curves.sort_by(|a, b| a.reynolds().total_cmp(&b.reynolds()));
        Ok(Self {
            deflection,
            pitch_offset,
            curves,
        })
    }

    pub fn curves(&self) -> &[Arc<ReferenceCurve>] {
        &self.curves
    }

    /// Coefficients of this state at the query angle of attack, after
    /// removing the state's pitch offset.
    pub fn coefficients(&self, alpha: f64, reynolds: f64) -> PolarResult<Coefficients> {
        interpolate_reynolds(alpha - self.pitch_offset, reynolds, &self.curves)
    }
}

/// Ordered set of deflection states, strictly increasing in deflection.
///
/// An empty set is representable so configuration can be assembled
/// incrementally; it is rejected when used for interpolation.
#[derive(Debug, Clone, Default)]
pub struct DeflectionStateSet {
    states: Vec<DeflectionState>,
}

impl DeflectionStateSet {
    pub fn new(states: Vec<DeflectionState>) -> PolarResult<Self> {
        if states.windows(2).any(|w| w[1].deflection <= w[0].deflection) {
            return Err(PolarError::config(
                "deflection states must be strictly increasing in deflection",
            ));
        }
        Ok(Self { states })
    }

    pub fn states(&self) -> &[DeflectionState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Coefficients at `(alpha, reynolds)` for an arbitrary `deflection`.
    ///
    /// Deflections outside the tabulated range clamp to the nearest state;
    /// interior deflections blend the two bracketing states.
    pub fn coefficients(
        &self,
        alpha: f64,
        reynolds: f64,
        deflection: f64,
    ) -> PolarResult<Coefficients> {
        ensure_finite(deflection, "deflection")?;
        match locate(&self.states, |s| s.deflection, deflection) {
            None => Err(PolarError::config("deflection state set is empty")),
            Some(Bracket::Clamped(i)) => self.states[i].coefficients(alpha, reynolds),
            Some(Bracket::Between { lo, hi, t }) => {
                let c_lo = self.states[lo].coefficients(alpha, reynolds)?;
                let c_hi = self.states[hi].coefficients(alpha, reynolds)?;
                Ok(c_lo.lerp(c_hi, t))
            }
        }
    }
}
