//! Spanwise control-surface interpolation between two anchored state sets.
//!
//! A [`ControlSurfaceContext`] owns two [`DeflectionStateSet`]s anchored at
//! spanwise positions `pos_a` and `pos_b`. A query first resolves each side at
//! the requested deflection (clamped on the deflection axis), then blends the
//! two sides linearly along the span. The spanwise blend is not
//! clamped: stations outside `[pos_a, pos_b]` extrapolate.
//!
//! The context also carries the live deflection state, advanced once per
//! simulation step by its single owner. Callers that share a context must not
//! interpolate against it while a step update is in progress.

use std::sync::Arc;

use pf_core::{Angle, Time, as_deg, as_s, ensure_finite, fraction};
use tracing::debug;

use crate::curve::Coefficients;
use crate::deflection::DeflectionStateSet;
use crate::error::{PolarError, PolarResult};

/// Deflection step used by [`ControlSurfaceContext::beta_slope`] [deg].
pub const BETA_SLOPE_STEP_DEG: f64 = 1.0;

/// Live deflection and its first and second time derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeflectionMotion {
    /// Deflection [deg]
    pub state: f64,
    /// Deflection rate [deg/s]
    pub state_dt: f64,
    /// Deflection acceleration [deg/s²]
    pub state_dt_dt: f64,
}

#[derive(Debug, Clone)]
pub struct ControlSurfaceContext {
    set_a: Arc<DeflectionStateSet>,
    set_b: Arc<DeflectionStateSet>,
    pos_a: f64,
    pos_b: f64,
    motion: DeflectionMotion,
}

impl ControlSurfaceContext {
    /// Build a context from two state sets and their spanwise anchors.
    ///
    /// Fails with `InvalidConfiguration` when either set is empty or the
    /// anchors coincide.
    pub fn new(
        set_a: Arc<DeflectionStateSet>,
        pos_a: f64,
        set_b: Arc<DeflectionStateSet>,
        pos_b: f64,
    ) -> PolarResult<Self> {
        ensure_finite(pos_a, "pos_a")?;
        ensure_finite(pos_b, "pos_b")?;
        if set_a.is_empty() {
            return Err(PolarError::config("state set A is empty"));
        }
        if set_b.is_empty() {
            return Err(PolarError::config("state set B is empty"));
        }
        if pos_a == pos_b {
            return Err(PolarError::config(format!(
                "spanwise anchors coincide at {pos_a}"
            )));
        }
        debug!(
            pos_a,
            pos_b,
            states_a = set_a.len(),
            states_b = set_b.len(),
            "control surface context created"
        );
        Ok(Self {
            set_a,
            set_b,
            pos_a,
            pos_b,
            motion: DeflectionMotion::default(),
        })
    }

    pub fn positions(&self) -> (f64, f64) {
        (self.pos_a, self.pos_b)
    }

    pub fn motion(&self) -> DeflectionMotion {
        self.motion
    }

    /// Current deflection [deg].
    pub fn deflection(&self) -> f64 {
        self.motion.state
    }

    /// Coefficients at an arbitrary spanwise station and deflection [deg].
    pub fn interpolate(
        &self,
        alpha: f64,
        spanwise_position: f64,
        reynolds: f64,
        deflection: f64,
    ) -> PolarResult<Coefficients> {
        ensure_finite(spanwise_position, "spanwise_position")?;
        let side_a = self.set_a.coefficients(alpha, reynolds, deflection)?;
        let side_b = self.set_b.coefficients(alpha, reynolds, deflection)?;
        let t = fraction(spanwise_position, self.pos_a, self.pos_b);
        Ok(side_a.lerp(side_b, t))
    }

    /// Coefficients at the context's current deflection.
    pub fn interpolate_current(
        &self,
        alpha: f64,
        spanwise_position: f64,
        reynolds: f64,
    ) -> PolarResult<Coefficients> {
        self.interpolate(alpha, spanwise_position, reynolds, self.motion.state)
    }

    /// Local lift sensitivity to deflection, dCl/dβ [1/deg], by central
    /// difference of ±[`BETA_SLOPE_STEP_DEG`] around the current deflection at
    /// the supplied operating point.
    pub fn beta_slope(
        &self,
        alpha: f64,
        spanwise_position: f64,
        reynolds: f64,
    ) -> PolarResult<f64> {
        let beta = self.motion.state;
        let up = self.interpolate(alpha, spanwise_position, reynolds, beta + BETA_SLOPE_STEP_DEG)?;
        let down =
            self.interpolate(alpha, spanwise_position, reynolds, beta - BETA_SLOPE_STEP_DEG)?;
        Ok((up.cl - down.cl) / (2.0 * BETA_SLOPE_STEP_DEG))
    }

    /// Advance the live deflection by one simulation step using backward
    /// differences for rate and acceleration.
    pub fn update_state(&mut self, new_deflection: Angle, time_step: Time) -> PolarResult<()> {
        let new = ensure_finite(as_deg(new_deflection), "new_deflection")?;
        let dt = ensure_finite(as_s(time_step), "time_step")?;
        if dt <= 0.0 {
            return Err(PolarError::config(format!(
                "time step must be positive, got {dt}"
            )));
        }
        let state_dt = (new - self.motion.state) / dt;
        let state_dt_dt = (state_dt - self.motion.state_dt) / dt;
        self.motion = DeflectionMotion {
            state: new,
            state_dt,
            state_dt_dt,
        };
        Ok(())
    }
}
