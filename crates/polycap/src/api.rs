//! Capacity query façade.
//!
//! Purpose
//! - Named operations over (Jacobian, inertia, bounds) that validate every
//!   shape and bound ordering first, then delegate to the geometry modules.
//!
//! Operators
//! - force: `(Jᵀ)⁺` applied to the torque box minus the torque bias.
//! - velocity: `J` applied to the joint velocity box.
//! - acceleration: `J·M⁺` applied to the torque box minus the torque bias.
//!
//! The free functions use `CapacityEngine::default()`; build an engine with
//! [`CapacityEngine::with_cfg`] to inject another hull backend or tolerances.

use nalgebra::{DMatrix, DVector};

pub use crate::boxpoly::Bounds;
use crate::cfg::HullCfg;
use crate::ellipsoid::{ellipsoid_from_box, Ellipsoid};
use crate::error::{CapacityError, Result};
use crate::hull::{ConvexHull, IncrementalHull};
use crate::linalg::{ensure_finite, pseudo_inverse};
use crate::polytope::Polytope;
use crate::reachable::{
    reachable_space, ForwardKinematics, ReachableCfg, ReachableQuery, ReachableSpace, INERTIA_RTOL,
};
use crate::{algebra, projector};

/// Entry point holding the hull backend and tolerances.
#[derive(Clone, Debug)]
pub struct CapacityEngine<H: ConvexHull = IncrementalHull> {
    pub hull: H,
    pub cfg: HullCfg,
    pub reachable: ReachableCfg,
}

impl Default for CapacityEngine<IncrementalHull> {
    fn default() -> Self {
        Self::with_cfg(IncrementalHull, HullCfg::default())
    }
}

/// `(rows, cols)` of a Jacobian; both must be positive and every entry finite.
fn jacobian_shape(j: &DMatrix<f64>) -> Result<(usize, usize)> {
    let (m, n) = j.shape();
    if m == 0 {
        return Err(CapacityError::mismatch("jacobian rows", 1, 0));
    }
    if n == 0 {
        return Err(CapacityError::mismatch("jacobian columns", 1, 0));
    }
    ensure_finite("jacobian", j)?;
    Ok((m, n))
}

fn check_inertia(inertia: &DMatrix<f64>, n: usize) -> Result<()> {
    if inertia.nrows() != n {
        return Err(CapacityError::mismatch("inertia rows", n, inertia.nrows()));
    }
    if inertia.ncols() != n {
        return Err(CapacityError::mismatch("inertia columns", n, inertia.ncols()));
    }
    ensure_finite("inertia", inertia)
}

fn check_radius(radius: &DVector<f64>, n: usize) -> Result<Bounds> {
    let b = Bounds::symmetric(radius.clone());
    b.validate(n)?;
    Ok(b)
}

impl<H: ConvexHull> CapacityEngine<H> {
    pub fn with_cfg(hull: H, cfg: HullCfg) -> Self {
        Self {
            hull,
            cfg,
            reachable: ReachableCfg::default(),
        }
    }

    pub fn with_reachable_cfg(mut self, reachable: ReachableCfg) -> Self {
        self.reachable = reachable;
        self
    }

    fn force_operator(&self, j: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        pseudo_inverse(&j.transpose(), self.cfg.rank_rtol)
    }

    fn acceleration_operator(
        &self,
        j: &DMatrix<f64>,
        inertia: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>> {
        Ok(j * pseudo_inverse(inertia, INERTIA_RTOL)?)
    }

    /// Task-space forces achievable within the torque limits.
    pub fn force_polytope(&self, j: &DMatrix<f64>, torque: &Bounds) -> Result<Polytope> {
        let (_, n) = jacobian_shape(j)?;
        torque.validate(n)?;
        let op = self.force_operator(j)?;
        projector::project_box(&op, &torque.available_box()?, None, &self.hull, &self.cfg)
    }

    /// Task-space velocities achievable within the joint velocity limits.
    pub fn velocity_polytope(&self, j: &DMatrix<f64>, velocity: &Bounds) -> Result<Polytope> {
        let (_, n) = jacobian_shape(j)?;
        velocity.validate(n)?;
        projector::project_box(j, &velocity.to_box()?, None, &self.hull, &self.cfg)
    }

    /// Task-space accelerations achievable within the torque limits.
    pub fn acceleration_polytope(
        &self,
        j: &DMatrix<f64>,
        inertia: &DMatrix<f64>,
        torque: &Bounds,
    ) -> Result<Polytope> {
        let (_, n) = jacobian_shape(j)?;
        check_inertia(inertia, n)?;
        torque.validate(n)?;
        let op = self.acceleration_operator(j, inertia)?;
        projector::project_box(&op, &torque.available_box()?, None, &self.hull, &self.cfg)
    }

    /// Force ellipsoid for symmetric torque limits `[-t_max, t_max]`.
    pub fn force_ellipsoid(&self, j: &DMatrix<f64>, t_max: &DVector<f64>) -> Result<Ellipsoid> {
        let (_, n) = jacobian_shape(j)?;
        let b = check_radius(t_max, n)?;
        let op = self.force_operator(j)?;
        ellipsoid_from_box(&op, &b.to_box()?)
    }

    /// Velocity ellipsoid for symmetric limits `[-dq_max, dq_max]`.
    pub fn velocity_ellipsoid(&self, j: &DMatrix<f64>, dq_max: &DVector<f64>) -> Result<Ellipsoid> {
        let (_, n) = jacobian_shape(j)?;
        let b = check_radius(dq_max, n)?;
        ellipsoid_from_box(j, &b.to_box()?)
    }

    /// Acceleration ellipsoid for symmetric torque limits `[-t_max, t_max]`.
    pub fn acceleration_ellipsoid(
        &self,
        j: &DMatrix<f64>,
        inertia: &DMatrix<f64>,
        t_max: &DVector<f64>,
    ) -> Result<Ellipsoid> {
        let (_, n) = jacobian_shape(j)?;
        check_inertia(inertia, n)?;
        let b = check_radius(t_max, n)?;
        let op = self.acceleration_operator(j, inertia)?;
        ellipsoid_from_box(&op, &b.to_box()?)
    }

    fn check_pair(
        &self,
        j1: &DMatrix<f64>,
        torque1: &Bounds,
        j2: &DMatrix<f64>,
        torque2: &Bounds,
    ) -> Result<()> {
        let (m1, n1) = jacobian_shape(j1)?;
        let (m2, n2) = jacobian_shape(j2)?;
        if m1 != m2 {
            return Err(CapacityError::mismatch("task dimension of second jacobian", m1, m2));
        }
        torque1.validate(n1)?;
        torque2.validate(n2)?;
        Ok(())
    }

    /// Forces achievable by both mechanisms at once (e.g. two arms holding
    /// one object, each within its own limits).
    pub fn force_polytope_intersection(
        &self,
        j1: &DMatrix<f64>,
        torque1: &Bounds,
        j2: &DMatrix<f64>,
        torque2: &Bounds,
    ) -> Result<Polytope> {
        self.check_pair(j1, torque1, j2, torque2)?;
        let p = self.force_polytope(j1, torque1)?;
        let q = self.force_polytope(j2, torque2)?;
        self.intersection(&p, &q)
    }

    /// Forces achievable by combining two mechanisms' contributions.
    pub fn force_polytope_sum(
        &self,
        j1: &DMatrix<f64>,
        torque1: &Bounds,
        j2: &DMatrix<f64>,
        torque2: &Bounds,
    ) -> Result<Polytope> {
        self.check_pair(j1, torque1, j2, torque2)?;
        let p = self.force_polytope(j1, torque1)?;
        let q = self.force_polytope(j2, torque2)?;
        self.minkowski_sum(&p, &q)
    }

    pub fn intersection(&self, p: &Polytope, q: &Polytope) -> Result<Polytope> {
        algebra::intersection(p, q, &self.hull, &self.cfg)
    }

    pub fn minkowski_sum(&self, p: &Polytope, q: &Polytope) -> Result<Polytope> {
        algebra::minkowski_sum(p, q, &self.hull, &self.cfg)
    }

    /// First-order reachable-space approximation; see [`crate::reachable`].
    pub fn reachable_space_approximation<F: ForwardKinematics + ?Sized>(
        &self,
        query: &ReachableQuery,
        fk: &F,
    ) -> Result<ReachableSpace> {
        reachable_space(query, fk, &self.reachable, &self.hull, &self.cfg)
    }
}

fn engine() -> CapacityEngine {
    CapacityEngine::default()
}

pub fn force_polytope(j: &DMatrix<f64>, torque: &Bounds) -> Result<Polytope> {
    engine().force_polytope(j, torque)
}

pub fn velocity_polytope(j: &DMatrix<f64>, velocity: &Bounds) -> Result<Polytope> {
    engine().velocity_polytope(j, velocity)
}

pub fn acceleration_polytope(
    j: &DMatrix<f64>,
    inertia: &DMatrix<f64>,
    torque: &Bounds,
) -> Result<Polytope> {
    engine().acceleration_polytope(j, inertia, torque)
}

pub fn force_ellipsoid(j: &DMatrix<f64>, t_max: &DVector<f64>) -> Result<Ellipsoid> {
    engine().force_ellipsoid(j, t_max)
}

pub fn velocity_ellipsoid(j: &DMatrix<f64>, dq_max: &DVector<f64>) -> Result<Ellipsoid> {
    engine().velocity_ellipsoid(j, dq_max)
}

pub fn acceleration_ellipsoid(
    j: &DMatrix<f64>,
    inertia: &DMatrix<f64>,
    t_max: &DVector<f64>,
) -> Result<Ellipsoid> {
    engine().acceleration_ellipsoid(j, inertia, t_max)
}

pub fn force_polytope_intersection(
    j1: &DMatrix<f64>,
    torque1: &Bounds,
    j2: &DMatrix<f64>,
    torque2: &Bounds,
) -> Result<Polytope> {
    engine().force_polytope_intersection(j1, torque1, j2, torque2)
}

pub fn force_polytope_sum(
    j1: &DMatrix<f64>,
    torque1: &Bounds,
    j2: &DMatrix<f64>,
    torque2: &Bounds,
) -> Result<Polytope> {
    engine().force_polytope_sum(j1, torque1, j2, torque2)
}

pub fn intersection(p: &Polytope, q: &Polytope) -> Result<Polytope> {
    engine().intersection(p, q)
}

pub fn minkowski_sum(p: &Polytope, q: &Polytope) -> Result<Polytope> {
    engine().minkowski_sum(p, q)
}

/// Single-step approximation with the default engine.
pub fn reachable_space_approximation<F: ForwardKinematics + ?Sized>(
    query: &ReachableQuery,
    fk: &F,
) -> Result<ReachableSpace> {
    engine().reachable_space_approximation(query, fk)
}
