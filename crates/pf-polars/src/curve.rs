//! Reference polars: one aerodynamic coefficient curve versus angle of attack.

use pf_core::{ensure_finite, fraction, lerp};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

use crate::error::{PolarError, PolarResult};

/// Lift, drag and pitching-moment coefficients at one condition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coefficients {
    pub cl: f64,
    pub cd: f64,
    pub cm: f64,
}

impl Coefficients {
    pub const fn new(cl: f64, cd: f64, cm: f64) -> Self {
        Self { cl, cd, cm }
    }

    /// Per-coefficient linear blend. `t` outside `[0, 1]` extrapolates.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            cl: lerp(self.cl, other.cl, t),
            cd: lerp(self.cd, other.cd, t),
            cm: lerp(self.cm, other.cm, t),
        }
    }
}

impl Add for Coefficients {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.cl + rhs.cl, self.cd + rhs.cd, self.cm + rhs.cm)
    }
}

impl Sub for Coefficients {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.cl - rhs.cl, self.cd - rhs.cd, self.cm - rhs.cm)
    }
}

impl Mul<f64> for Coefficients {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.cl * rhs, self.cd * rhs, self.cm * rhs)
    }
}

/// One polar sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarSample {
    /// Angle of attack [deg]
    pub alpha: f64,
    pub cl: f64,
    pub cd: f64,
    pub cm: f64,
}

impl PolarSample {
    pub const fn new(alpha: f64, cl: f64, cd: f64, cm: f64) -> Self {
        Self { alpha, cl, cd, cm }
    }

    pub fn coefficients(&self) -> Coefficients {
        Coefficients::new(self.cl, self.cd, self.cm)
    }
}

/// Free-stream and transition settings a polar was computed at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowConditions {
    pub reynolds: f64,
    pub mach: f64,
    /// Critical amplification factor of the e^n transition model
    pub ncrit: f64,
    /// Forced transition location on the upper surface (x/c)
    pub xtr_top: f64,
    /// Forced transition location on the lower surface (x/c)
    pub xtr_bot: f64,
}

impl Default for FlowConditions {
    fn default() -> Self {
        Self {
            reynolds: 1.0e6,
            mach: 0.0,
            ncrit: 9.0,
            xtr_top: 1.0,
            xtr_bot: 1.0,
        }
    }
}

/// An immutable aerodynamic polar owned by an airfoil (`subject`).
///
/// Samples are sorted by strictly increasing angle of attack; construction
/// rejects anything else so queries never need to re-check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurveRepr")]
pub struct ReferenceCurve {
    name: String,
    subject: String,
    conditions: FlowConditions,
    samples: Vec<PolarSample>,
}

impl ReferenceCurve {
    pub fn new(
        name: impl Into<String>,
        subject: impl Into<String>,
        conditions: FlowConditions,
        samples: Vec<PolarSample>,
    ) -> PolarResult<Self> {
        let name = name.into();
        if samples.is_empty() {
            return Err(PolarError::config(format!("polar '{name}' has no samples")));
        }
        ensure_finite(conditions.reynolds, "reynolds")?;
        ensure_finite(conditions.mach, "mach")?;
        for s in &samples {
            ensure_finite(s.alpha, "alpha")?;
            ensure_finite(s.cl, "cl")?;
            ensure_finite(s.cd, "cd")?;
            ensure_finite(s.cm, "cm")?;
        }
        if samples.windows(2).any(|w| w[1].alpha <= w[0].alpha) {
            return Err(PolarError::config(format!(
                "polar '{name}' samples are not strictly increasing in alpha"
            )));
        }
        Ok(Self {
            name,
            subject: subject.into(),
            conditions,
            samples,
        })
    }

    /// Canonical store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning airfoil identity.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn conditions(&self) -> &FlowConditions {
        &self.conditions
    }

    pub fn reynolds(&self) -> f64 {
        self.conditions.reynolds
    }

    pub fn mach(&self) -> f64 {
        self.conditions.mach
    }

    pub fn samples(&self) -> &[PolarSample] {
        &self.samples
    }

    /// Sampled angle-of-attack range `(first, last)`.
    pub fn alpha_range(&self) -> (f64, f64) {
        // non-empty by construction
        let first = self.samples[0].alpha;
        let last = self.samples[self.samples.len() - 1].alpha;
        (first, last)
    }

    /// Coefficients at `alpha`, linear between samples, clamped outside the sampled range.
    /// A NaN `alpha` yields the first sample.
    pub fn coefficients_at(&self, alpha: f64) -> Coefficients {
        let (first, last) = self.alpha_range();
        // NaN compares false everywhere; treat it as below the range
        if alpha <= first || alpha.is_nan() {
            return self.samples[0].coefficients();
        }
        if alpha >= last {
            return self.samples[self.samples.len() - 1].coefficients();
        }
        // first index whose alpha exceeds the query; 1..len by the checks above
        let hi = self.samples.partition_point(|s| s.alpha <= alpha);
        let lo = hi - 1;
        let (a, b) = (&self.samples[lo], &self.samples[hi]);
        let t = fraction(alpha, a.alpha, b.alpha);
        a.coefficients().lerp(b.coefficients(), t)
    }
}

/// Unchecked wire shape; deserialization goes through [`ReferenceCurve::new`].
#[derive(Deserialize)]
struct CurveRepr {
    name: String,
    subject: String,
    conditions: FlowConditions,
    samples: Vec<PolarSample>,
}

impl TryFrom<CurveRepr> for ReferenceCurve {
    type Error = PolarError;

    fn try_from(raw: CurveRepr) -> PolarResult<Self> {
        Self::new(raw.name, raw.subject, raw.conditions, raw.samples)
    }
}

impl AsRef<ReferenceCurve> for ReferenceCurve {
    fn as_ref(&self) -> &ReferenceCurve {
        self
    }
}
