//! Polytope algebra: intersection (via H-rep) and Minkowski sum (via V-rep).
//!
//! Both results are passed through the hull backend again so the output obeys
//! the same invariants as a projected box: minimal deduplicated vertices and a
//! half-space system derived from them.

use nalgebra::DVector;

use crate::cfg::{HullCfg, SCALE_FLOOR};
use crate::error::{CapacityError, Result};
use crate::hull::{clip_vertices, polytope_from_points, ConvexHull};
use crate::polytope::util::centroid_and_scale;
use crate::polytope::Polytope;

/// Floor on the side-of-cut tolerance, relative to the largest coordinate.
const ROUNDOFF: f64 = 64.0 * f64::EPSILON;

fn check_same_dim(p: &Polytope, q: &Polytope) -> Result<()> {
    if p.dim != q.dim {
        return Err(CapacityError::mismatch("polytope dimension", p.dim, q.dim));
    }
    Ok(())
}

/// `p ∩ q`: the vertices of the stacked half-space system, re-hulled.
///
/// The operand with the smaller extent is clipped by the other's half-spaces
/// (see [`clip_vertices`]). Tolerances follow that extent, so regions of any
/// size (newtons or nanometres) give the same outcome. Disjoint operands give
/// [`Polytope::empty`] carrying the stacked system. The result does not depend
/// on the operand order beyond facet ordering.
pub fn intersection<H: ConvexHull + ?Sized>(
    p: &Polytope,
    q: &Polytope,
    hull: &H,
    cfg: &HullCfg,
) -> Result<Polytope> {
    check_same_dim(p, q)?;
    let stacked = p.halfspaces.stack(&q.halfspaces)?;
    if p.is_empty() || q.is_empty() {
        return Ok(Polytope::empty(p.dim, stacked));
    }
    let (_, p_scale) = centroid_and_scale(&p.vertex_list(), p.dim);
    let (_, q_scale) = centroid_and_scale(&q.vertex_list(), q.dim);
    let (start, cut, start_scale, cut_scale) = if q_scale < p_scale {
        (q, p, q_scale, p_scale)
    } else {
        (p, q, p_scale, q_scale)
    };
    // a point operand borrows the other's extent
    let extent = if start_scale > SCALE_FLOOR { start_scale } else { cut_scale };
    let magnitude = p.vertices.amax().max(q.vertices.amax());
    let tol = cfg.abs_tol(extent).max(ROUNDOFF * magnitude);
    let verts = clip_vertices(start, &cut.halfspaces, tol, cfg);
    tracing::debug!(
        dim = p.dim,
        rows = stacked.len(),
        extent,
        vertices = verts.len(),
        "intersection"
    );
    if verts.is_empty() {
        return Ok(Polytope::empty(p.dim, stacked));
    }
    polytope_from_points(hull, &verts, p.dim, cfg)
}

/// `p ⊕ q`: hull of all pairwise vertex sums (|V_p|·|V_q| candidates).
pub fn minkowski_sum<H: ConvexHull + ?Sized>(
    p: &Polytope,
    q: &Polytope,
    hull: &H,
    cfg: &HullCfg,
) -> Result<Polytope> {
    check_same_dim(p, q)?;
    if p.is_empty() || q.is_empty() {
        let stacked = p.halfspaces.stack(&q.halfspaces)?;
        return Ok(Polytope::empty(p.dim, stacked));
    }
    let mut sums: Vec<DVector<f64>> = Vec::with_capacity(p.vertex_count() * q.vertex_count());
    for a in p.vertices.column_iter() {
        for b in q.vertices.column_iter() {
            sums.push(a + b);
        }
    }
    let out = polytope_from_points(hull, &sums, p.dim, cfg)?;
    tracing::debug!(
        dim = p.dim,
        candidates = sums.len(),
        vertices = out.vertex_count(),
        "minkowski sum"
    );
    Ok(out)
}
