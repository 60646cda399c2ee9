//! Analysis jobs and the parameter ranges they are expanded from.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BatchError, BatchResult};

/// Slack added before flooring a sample count so that ranges such as
/// `0.5..=1.0 step 0.1` keep their last sample despite rounding.
const SAMPLE_COUNT_EPS: f64 = 1e-9;

/// An inclusive `min..=max` range walked in `step` increments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SweepRange {
    pub fn new(min: f64, max: f64, step: f64) -> BatchResult<Self> {
        let range = Self { min, max, step };
        range.validate("range")?;
        Ok(range)
    }

    /// A range holding the single value `v`.
    pub fn single(v: f64) -> Self {
        Self {
            min: v,
            max: v,
            step: 1.0,
        }
    }

    /// Check bounds and step; `what` names the range in the error.
    pub fn validate(&self, what: &str) -> BatchResult<()> {
        if !(self.min.is_finite() && self.max.is_finite() && self.step.is_finite()) {
            return Err(BatchError::config(format!("{what} has non-finite bounds")));
        }
        if self.max < self.min {
            return Err(BatchError::config(format!(
                "{what} max {} is below min {}",
                self.max, self.min
            )));
        }
        if self.max > self.min && self.step <= 0.0 {
            return Err(BatchError::config(format!(
                "{what} step must be positive, got {}",
                self.step
            )));
        }
        Ok(())
    }

    /// `floor((max - min) / step) + 1`.
    pub fn sample_count(&self) -> usize {
        if self.max <= self.min {
            return 1;
        }
        let steps = ((self.max - self.min) / self.step + SAMPLE_COUNT_EPS).floor();
        // `as` saturates at usize::MAX for huge step counts
        (steps as usize).saturating_add(1)
    }

    pub fn points(&self) -> Vec<f64> {
        (0..self.sample_count())
            .map(|i| self.min + i as f64 * self.step)
            .collect()
    }
}

impl fmt::Display for SweepRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={} step {}", self.min, self.max, self.step)
    }
}

/// Parameters held constant across a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConstants {
    pub mach: f64,
    /// Critical amplification factor
    pub ncrit: f64,
    /// Forced transition, upper surface (x/c)
    pub xtr_top: f64,
    /// Forced transition, lower surface (x/c)
    pub xtr_bot: f64,
    /// Retain per-angle boundary-layer records
    pub keep_details: bool,
}

impl Default for AnalysisConstants {
    fn default() -> Self {
        Self {
            mach: 0.0,
            ncrit: 9.0,
            xtr_top: 1.0,
            xtr_bot: 1.0,
            keep_details: false,
        }
    }
}

/// Deterministic store key for a polar of `subject` at the given conditions.
///
/// Reynolds is encoded in millions to three decimals, so conditions that
/// differ by less than 500 in Reynolds number share a name.
pub fn canonical_name(subject: &str, reynolds: f64, mach: f64, ncrit: f64) -> String {
    format!(
        "{subject}_Re{:.3}_M{:.2}_N{:.1}",
        reynolds / 1.0e6,
        mach,
        ncrit
    )
}

/// One pending external analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub name: String,
    pub subject: String,
    pub reynolds: f64,
    pub alpha: SweepRange,
    pub constants: AnalysisConstants,
}

impl AnalysisJob {
    pub fn new(
        subject: impl Into<String>,
        reynolds: f64,
        alpha: SweepRange,
        constants: AnalysisConstants,
    ) -> Self {
        let subject = subject.into();
        let name = canonical_name(&subject, reynolds, constants.mach, constants.ncrit);
        Self {
            name,
            subject,
            reynolds,
            alpha,
            constants,
        }
    }
}
