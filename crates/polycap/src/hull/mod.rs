//! Convex hull capability (V→H) and vertex enumeration (H→V).
//!
//! The engine never calls a specific hull algorithm directly: everything goes
//! through [`ConvexHull`], so a different backend (or a stub in tests) can be
//! injected through [`crate::CapacityEngine`].
//!
//! Contract of a backend
//! - Input: a non-empty cloud of points of equal length `m`.
//! - Output: indices of the extreme points (deduplicated to tolerance), a
//!   half-space system describing the hull in R^m (lower-dimensional hulls
//!   include equality pairs), facets as lists of positions into
//!   `vertex_indices`, and the affine dimension of the cloud.
//! - Rank deficiency is never an error.

mod enumerate;
mod incremental;

pub use enumerate::{clip_vertices, enumerate_vertices};
pub use incremental::IncrementalHull;

use nalgebra::{DMatrix, DVector};

use crate::cfg::HullCfg;
use crate::error::{CapacityError, Result};
use crate::linalg::ensure_finite;
use crate::polytope::{HalfspaceSystem, Polytope};

/// Output of a hull backend.
#[derive(Clone, Debug)]
pub struct HullOutput {
    /// Indices into the input cloud of the extreme points.
    pub vertex_indices: Vec<usize>,
    pub halfspaces: HalfspaceSystem,
    /// Facets as positions into `vertex_indices`.
    pub faces: Vec<Vec<usize>>,
    pub effective_dim: usize,
}

/// Point cloud → minimal vertex set + half-space system.
pub trait ConvexHull {
    fn hull(&self, points: &[DVector<f64>], cfg: &HullCfg) -> Result<HullOutput>;
}

impl<T: ConvexHull + ?Sized> ConvexHull for &T {
    fn hull(&self, points: &[DVector<f64>], cfg: &HullCfg) -> Result<HullOutput> {
        (**self).hull(points, cfg)
    }
}

/// Build a [`Polytope`] in R^dim from a point cloud via `hull`.
///
/// An empty cloud yields the empty polytope; a NaN or infinite coordinate is
/// `NonFiniteInput` and never reaches the backend.
pub fn polytope_from_points<H: ConvexHull + ?Sized>(
    hull: &H,
    points: &[DVector<f64>],
    dim: usize,
    cfg: &HullCfg,
) -> Result<Polytope> {
    if let Some(p) = points.iter().find(|p| p.len() != dim) {
        return Err(CapacityError::mismatch("point dimension", dim, p.len()));
    }
    if points.is_empty() {
        return Ok(Polytope::empty(dim, HalfspaceSystem::infeasible(dim)));
    }
    for p in points {
        ensure_finite("point", p)?;
    }
    let out = hull.hull(points, cfg)?;
    if out.vertex_indices.iter().any(|&i| i >= points.len()) {
        return Err(CapacityError::hull("vertex index out of range"));
    }
    if out.halfspaces.dim() != dim {
        return Err(CapacityError::mismatch(
            "hull half-space dimension",
            dim,
            out.halfspaces.dim(),
        ));
    }
    if out
        .faces
        .iter()
        .flatten()
        .any(|&f| f >= out.vertex_indices.len())
    {
        return Err(CapacityError::hull("face refers to a missing vertex"));
    }
    let vertices = DMatrix::from_fn(dim, out.vertex_indices.len(), |r, c| {
        points[out.vertex_indices[c]][r]
    });
    tracing::debug!(
        points = points.len(),
        vertices = out.vertex_indices.len(),
        halfspaces = out.halfspaces.len(),
        effective_dim = out.effective_dim,
        "hull"
    );
    Ok(Polytope {
        vertices,
        halfspaces: out.halfspaces,
        faces: out.faces,
        dim,
        effective_dim: Some(out.effective_dim),
    })
}
