//! Capacity polytopes and ellipsoids for robotic manipulators.
//!
//! The engine maps joint-space boxes (torque, velocity or acceleration limits)
//! through a linear operator (the Jacobian, possibly combined with the inertia
//! matrix) into task space and returns exact polytopes, ellipsoid
//! approximations, their intersections and Minkowski sums, or a first-order
//! approximation of the positions reachable within a time horizon.
//!
//! Layering (leaf-first)
//! - `linalg`: SVD, rank, pseudo-inverse, complements.
//! - `boxpoly`: joint-space boxes with deterministic 2^N vertex enumeration.
//! - `hull`: injected convex-hull capability and H→V enumeration.
//! - `projector`, `ellipsoid`: linear images of boxes.
//! - `algebra`, `reachable`: compositions.
//! - `api`: validated entry points (`CapacityEngine`).
//!
//! Every call is a pure function of its inputs; nothing is cached across calls.

pub mod algebra;
pub mod api;
pub mod boxpoly;
pub mod cfg;
pub mod ellipsoid;
pub mod error;
pub mod hull;
pub mod linalg;
pub mod polytope;
pub mod projector;
pub mod reachable;
pub mod sample;

#[cfg(test)]
mod tests;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use api::{Bounds, CapacityEngine};
pub use error::{CapacityError, Result};

/// Common exports for callers.
pub mod prelude {
    pub use crate::api::{
        acceleration_ellipsoid, acceleration_polytope, force_ellipsoid, force_polytope,
        force_polytope_intersection, force_polytope_sum, intersection, minkowski_sum,
        reachable_space_approximation, velocity_ellipsoid, velocity_polytope, Bounds,
        CapacityEngine,
    };
    pub use crate::boxpoly::BoxPolytope;
    pub use crate::cfg::HullCfg;
    pub use crate::ellipsoid::Ellipsoid;
    pub use crate::error::{CapacityError, Result};
    pub use crate::hull::{ConvexHull, HullOutput, IncrementalHull};
    pub use crate::polytope::{HalfspaceSystem, Polytope, PolytopeOutcome};
    pub use crate::reachable::{ForwardKinematics, ReachableCfg, ReachableQuery, ReachableSpace};
    pub use nalgebra::{DMatrix, DVector};
}
