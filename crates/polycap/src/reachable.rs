//! First-order approximation of the task-space positions reachable within a
//! time horizon.
//!
//! Model
//! - Over a sub-step `dt` the joint displacement from velocity limits is the
//!   box `[dq_min·dt, dq_max·dt]`; its Jacobian image `S_v` is added each step.
//! - From rest, constant torque limits bound the displacement at time `t` by
//!   `½t² · J·M⁺ · [t_min − t_bias, t_max − t_bias]` (`S_a(t)`).
//! - Joint position limits clip everything through `C = J · [q_min − q0,
//!   q_max − q0]`.
//! - `R_0 = {0}`, `R_k = (R_{k−1} ⊕ S_v) ∩ S_a(t_k) ∩ C`, translated by the
//!   current position `x0` at the end.
//!
//! This linearizes the kinematics at `q0` and ignores velocity-dependent
//! dynamics. It is an approximation, not a reachable-set computation.

use nalgebra::{DMatrix, DVector};

use crate::algebra::{intersection, minkowski_sum};
use crate::boxpoly::{BoxPolytope, Bounds};
use crate::cfg::HullCfg;
use crate::error::{CapacityError, Result};
use crate::hull::ConvexHull;
use crate::linalg::{ensure_finite, pseudo_inverse};
use crate::polytope::Polytope;
use crate::projector::project_box;

/// Relative slack when checking `q0` against its position bounds.
const CONFIG_SLACK: f64 = 1e-12;

/// Cutoff for the inertia pseudo-inverse.
pub(crate) const INERTIA_RTOL: f64 = 1e-12;

/// External collaborator: configuration → task-space position.
pub trait ForwardKinematics {
    fn position(&self, q: &DVector<f64>) -> DVector<f64>;
}

impl<F> ForwardKinematics for F
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    fn position(&self, q: &DVector<f64>) -> DVector<f64> {
        self(q)
    }
}

/// Number of horizon sub-steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReachableCfg {
    pub steps: usize,
}

impl Default for ReachableCfg {
    fn default() -> Self {
        Self { steps: 1 }
    }
}

/// Inputs of a reachable-space query.
///
/// Position bounds are required; at least one of `velocity` and `torque` must
/// be present. The bias of `position` is ignored, the bias of `velocity` is a
/// joint velocity offset and the bias of `torque` is a load.
#[derive(Clone, Debug, PartialEq)]
pub struct ReachableQuery {
    pub inertia: DMatrix<f64>,
    pub jacobian: DMatrix<f64>,
    pub q0: DVector<f64>,
    pub horizon: f64,
    pub position: Bounds,
    pub velocity: Option<Bounds>,
    pub torque: Option<Bounds>,
}

/// Result of a reachable-space query.
#[derive(Clone, Debug, PartialEq)]
pub struct ReachableSpace {
    /// Reachable positions in task space (already translated by `x0`).
    pub polytope: Polytope,
    pub horizon: f64,
    pub steps: usize,
}

impl ReachableQuery {
    /// Every shape, ordering and range check; runs before any geometry.
    pub fn validate(&self) -> Result<()> {
        if !(self.horizon.is_finite() && self.horizon > 0.0) {
            return Err(CapacityError::InvalidHorizon {
                horizon: self.horizon,
            });
        }
        let (m, n) = self.jacobian.shape();
        if m == 0 {
            return Err(CapacityError::mismatch("jacobian rows", 1, 0));
        }
        if self.inertia.shape() != (n, n) {
            let found = if self.inertia.nrows() != n {
                self.inertia.nrows()
            } else {
                self.inertia.ncols()
            };
            return Err(CapacityError::mismatch("inertia", n, found));
        }
        if self.q0.len() != n {
            return Err(CapacityError::mismatch("configuration", n, self.q0.len()));
        }
        ensure_finite("jacobian", &self.jacobian)?;
        ensure_finite("inertia", &self.inertia)?;
        ensure_finite("configuration", &self.q0)?;
        self.position.validate(n)?;
        if let Some(v) = &self.velocity {
            v.validate(n)?;
        }
        if let Some(t) = &self.torque {
            t.validate(n)?;
        }
        if self.velocity.is_none() && self.torque.is_none() {
            return Err(CapacityError::MissingCapacityBounds);
        }
        for i in 0..n {
            let (lo, hi, q) = (self.position.lower[i], self.position.upper[i], self.q0[i]);
            let slack = CONFIG_SLACK * (hi - lo).abs().max(1.0);
            if !(q >= lo - slack && q <= hi + slack) {
                return Err(CapacityError::ConfigurationOutOfBounds {
                    index: i,
                    value: q,
                    lower: lo,
                    upper: hi,
                });
            }
        }
        Ok(())
    }
}

/// Joint displacement box allowed by the position bounds.
fn displacement_box(q: &ReachableQuery) -> Result<BoxPolytope> {
    let lo = &q.position.lower - &q.q0;
    let hi = &q.position.upper - &q.q0;
    BoxPolytope::new(lo, hi, None)
}

/// Approximate the positions reachable within `query.horizon`.
pub fn reachable_space<H, F>(
    query: &ReachableQuery,
    fk: &F,
    rcfg: &ReachableCfg,
    hull: &H,
    cfg: &HullCfg,
) -> Result<ReachableSpace>
where
    H: ConvexHull + ?Sized,
    F: ForwardKinematics + ?Sized,
{
    query.validate()?;
    let m = query.jacobian.nrows();
    let x0 = fk.position(&query.q0);
    if x0.len() != m {
        return Err(CapacityError::mismatch("forward kinematics output", m, x0.len()));
    }
    ensure_finite("forward kinematics output", &x0)?;
    let steps = rcfg.steps.max(1);
    let dt = query.horizon / steps as f64;
    let j = &query.jacobian;

    let clip = project_box(j, &displacement_box(query)?, None, hull, cfg)?;
    let step_velocity = match &query.velocity {
        Some(v) => Some(project_box(j, &v.to_box()?.scaled(dt), None, hull, cfg)?),
        None => None,
    };
    let unit_accel = match &query.torque {
        Some(t) => {
            let op = j * pseudo_inverse(&query.inertia, INERTIA_RTOL)?;
            Some(project_box(&op, &t.available_box()?, None, hull, cfg)?)
        }
        None => None,
    };

    let mut region = Polytope::point(&DVector::zeros(m));
    for k in 1..=steps {
        let t_k = k as f64 * dt;
        if let Some(sv) = &step_velocity {
            region = minkowski_sum(&region, sv, hull, cfg)?;
        }
        if let Some(sa) = &unit_accel {
            let bound = sa.scaled(0.5 * t_k * t_k);
            region = if step_velocity.is_some() {
                intersection(&region, &bound, hull, cfg)?
            } else {
                bound
            };
        }
        region = intersection(&region, &clip, hull, cfg)?;
        tracing::debug!(
            step = k,
            t = t_k,
            vertices = region.vertex_count(),
            outcome = ?region.outcome(),
            "reachable step"
        );
        if region.is_empty() {
            break;
        }
    }
    let polytope = region.translated(&x0)?;
    Ok(ReachableSpace {
        polytope,
        horizon: query.horizon,
        steps,
    })
}
