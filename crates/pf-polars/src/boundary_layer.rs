//! Per-angle boundary-layer detail records and operating points.

use serde::{Deserialize, Serialize};

use crate::error::{PolarError, PolarResult};

/// Airfoil surface a station belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Top,
    Bottom,
}

/// Boundary-layer quantities at one surface station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationSample {
    /// Chordwise position (x/c)
    pub x: f64,
    /// Edge velocity ratio Ue/Vinf
    pub ue: f64,
    /// Displacement thickness δ*/c
    pub dstar: f64,
    /// Momentum thickness θ/c
    pub theta: f64,
    /// Skin-friction coefficient
    pub cf: f64,
    /// Shape parameter H = δ*/θ
    pub h: f64,
    /// Pressure coefficient
    pub cp: f64,
}

/// Boundary-layer detail at one angle of attack of a polar.
///
/// Solvers emit records with no parent; the merger attaches them to the polar
/// they were produced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryLayerRecord {
    pub name: String,
    pub parent: Option<String>,
    pub reynolds: f64,
    /// Angle of attack [deg]
    pub alpha: f64,
    pub top: Vec<StationSample>,
    pub bottom: Vec<StationSample>,
}

impl BoundaryLayerRecord {
    pub fn new(
        name: impl Into<String>,
        reynolds: f64,
        alpha: f64,
        top: Vec<StationSample>,
        bottom: Vec<StationSample>,
    ) -> Self {
        Self {
            name: name.into(),
            parent: None,
            reynolds,
            alpha,
            top,
            bottom,
        }
    }

    /// Canonical record name for `alpha` under polar `curve_name`.
    pub fn canonical_name(curve_name: &str, alpha: f64) -> String {
        format!("{curve_name}_a{alpha:.3}")
    }

    pub fn stations(&self, side: Side) -> &[StationSample] {
        match side {
            Side::Top => &self.top,
            Side::Bottom => &self.bottom,
        }
    }

    /// Attach the record to `parent`, renaming it canonically under that parent.
    pub fn reparent(&mut self, parent: &str) {
        self.name = Self::canonical_name(parent, self.alpha);
        self.parent = Some(parent.to_string());
    }
}

/// An operating point: either a full detail record or only the two scalars
/// that identify it.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatingPoint {
    Detailed(BoundaryLayerRecord),
    ScalarOnly { reynolds: f64, alpha: f64 },
}

impl OperatingPoint {
    pub fn reynolds(&self) -> f64 {
        match self {
            Self::Detailed(record) => record.reynolds,
            Self::ScalarOnly { reynolds, .. } => *reynolds,
        }
    }

    pub fn alpha(&self) -> f64 {
        match self {
            Self::Detailed(record) => record.alpha,
            Self::ScalarOnly { alpha, .. } => *alpha,
        }
    }

    pub fn is_detailed(&self) -> bool {
        matches!(self, Self::Detailed(_))
    }

    /// Station `index` on `side`; only detailed points carry stations.
    pub fn station(&self, side: Side, index: usize) -> PolarResult<&StationSample> {
        match self {
            Self::Detailed(record) => {
                let stations = record.stations(side);
                stations.get(index).ok_or_else(|| {
                    PolarError::config(format!(
                        "station {index} out of range ({} stations on {side:?})",
                        stations.len()
                    ))
                })
            }
            Self::ScalarOnly { .. } => Err(PolarError::config(
                "operating point carries no boundary-layer stations",
            )),
        }
    }
}
