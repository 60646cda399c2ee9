//! Coefficient queries against a store.

use std::sync::Arc;

use pf_core::units::{deg, s};
use pf_polars::{
    Coefficients, ControlSurfaceContext, DeflectionMotion, DeflectionState, DeflectionStateSet,
    interpolate_reynolds,
};
use pf_results::SharedStore;

use crate::config::{ControlSurfaceDef, DeflectionStateDef};
use crate::error::{AppError, AppResult};

/// Interpolate `subject`'s polars at one Mach number and amplification factor.
pub fn query_reynolds(
    store: &SharedStore,
    subject: &str,
    mach: f64,
    ncrit: f64,
    alpha: f64,
    reynolds: f64,
) -> AppResult<Coefficients> {
    let family = store.reynolds_family(subject, mach, ncrit);
    if family.is_empty() {
        return Err(AppError::PolarNotFound(format!(
            "{subject} at M{mach:.2} N{ncrit:.1}"
        )));
    }
    Ok(interpolate_reynolds(alpha, reynolds, &family)?)
}

fn build_set(defs: &[DeflectionStateDef], store: &SharedStore) -> AppResult<DeflectionStateSet> {
    let states = defs
        .iter()
        .map(|def| {
            let curves = def
                .curves
                .iter()
                .map(|name| {
                    store
                        .get_by_name(name)
                        .ok_or_else(|| AppError::PolarNotFound(name.clone()))
                })
                .collect::<AppResult<Vec<_>>>()?;
            Ok(DeflectionState::new(def.deflection, def.pitch_offset, curves)?)
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok(DeflectionStateSet::new(states)?)
}

/// Resolve a control-surface definition's polar names against `store`.
pub fn build_control_surface(
    def: &ControlSurfaceDef,
    store: &SharedStore,
) -> AppResult<ControlSurfaceContext> {
    let set_a = build_set(&def.side_a, store)?;
    let set_b = build_set(&def.side_b, store)?;
    Ok(ControlSurfaceContext::new(
        Arc::new(set_a),
        def.pos_a,
        Arc::new(set_b),
        def.pos_b,
    )?)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlapQuery {
    pub alpha: f64,
    pub span: f64,
    pub reynolds: f64,
    /// Deflection to move to before evaluating [deg]
    pub deflection: Option<f64>,
    /// Time taken by that move [s]
    pub dt_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlapAnswer {
    pub coefficients: Coefficients,
    /// dCl/dβ [1/deg]
    pub beta_slope: f64,
    pub motion: DeflectionMotion,
}

/// Optionally step the surface to a new deflection, then evaluate it there.
pub fn query_flap(ctx: &mut ControlSurfaceContext, query: &FlapQuery) -> AppResult<FlapAnswer> {
    if let Some(target) = query.deflection {
        ctx.update_state(deg(target), s(query.dt_s))?;
    }
    let coefficients = ctx.interpolate_current(query.alpha, query.span, query.reynolds)?;
    let beta_slope = ctx.beta_slope(query.alpha, query.span, query.reynolds)?;
    Ok(FlapAnswer {
        coefficients,
        beta_slope,
        motion: ctx.motion(),
    })
}
