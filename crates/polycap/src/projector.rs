//! Linear images of boxes and vertex sets.
//!
//! Purpose
//! - Map every vertex of a joint-space box through an operator `M × N`, then
//!   reduce the mapped cloud to its convex hull in task space.
//!
//! Complexity
//! - 2^N matrix–vector products (inherent to boxes) plus one hull call.
//!
//! Degeneracy
//! - `M = 1` yields an interval; a rank-deficient operator yields a
//!   lower-dimensional polytope; the zero operator yields a point. None of
//!   these are errors.

use nalgebra::{DMatrix, DVector};

use crate::boxpoly::BoxPolytope;
use crate::cfg::HullCfg;
use crate::error::{CapacityError, Result};
use crate::hull::{polytope_from_points, ConvexHull};
use crate::polytope::Polytope;

/// `op · v (+ post_bias)` for every column `v` of `verts`.
pub fn project_points(
    op: &DMatrix<f64>,
    verts: &DMatrix<f64>,
    post_bias: Option<&DVector<f64>>,
) -> Result<Vec<DVector<f64>>> {
    if op.ncols() != verts.nrows() {
        return Err(CapacityError::mismatch(
            "operator columns",
            verts.nrows(),
            op.ncols(),
        ));
    }
    if let Some(t) = post_bias {
        if t.len() != op.nrows() {
            return Err(CapacityError::mismatch("post-mapping bias", op.nrows(), t.len()));
        }
    }
    let mapped = op * verts;
    Ok(mapped
        .column_iter()
        .map(|c| match post_bias {
            Some(t) => c + t,
            None => c.into_owned(),
        })
        .collect())
}

/// Image of `bx` under `op`, optionally shifted by `post_bias` (length M).
pub fn project_box<H: ConvexHull + ?Sized>(
    op: &DMatrix<f64>,
    bx: &BoxPolytope,
    post_bias: Option<&DVector<f64>>,
    hull: &H,
    cfg: &HullCfg,
) -> Result<Polytope> {
    if op.ncols() != bx.dim() {
        return Err(CapacityError::mismatch("operator columns", bx.dim(), op.ncols()));
    }
    let verts = bx.vertices()?;
    let cloud = project_points(op, &verts, post_bias)?;
    let poly = polytope_from_points(hull, &cloud, op.nrows(), cfg)?;
    tracing::debug!(
        joints = bx.dim(),
        task_dim = op.nrows(),
        mapped = cloud.len(),
        vertices = poly.vertex_count(),
        outcome = ?poly.outcome(),
        "projected box"
    );
    Ok(poly)
}

/// Image of an existing polytope's vertex set under `op`.
///
/// An empty polytope maps to the empty polytope in R^M.
pub fn project_polytope<H: ConvexHull + ?Sized>(
    op: &DMatrix<f64>,
    poly: &Polytope,
    post_bias: Option<&DVector<f64>>,
    hull: &H,
    cfg: &HullCfg,
) -> Result<Polytope> {
    let cloud = project_points(op, &poly.vertices, post_bias)?;
    polytope_from_points(hull, &cloud, op.nrows(), cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hull::IncrementalHull;
    use crate::polytope::PolytopeOutcome;
    use nalgebra::{dmatrix, dvector};

    fn unit_box(n: usize) -> BoxPolytope {
        BoxPolytope::new(DVector::zeros(n), DVector::from_element(n, 1.0), None).unwrap()
    }

    fn image(op: &DMatrix<f64>, bx: &BoxPolytope, bias: Option<&DVector<f64>>) -> Result<Polytope> {
        project_box(op, bx, bias, &IncrementalHull, &HullCfg::default())
    }

    #[test]
    fn identity_image_is_the_box() {
        let p = image(&DMatrix::identity(3, 3), &unit_box(3), None).unwrap();
        assert_eq!(p.vertex_count(), 8);
        assert_eq!(p.halfspaces.len(), 6);
        assert_eq!(p.outcome(), PolytopeOutcome::FullDimensional);
    }

    #[test]
    fn single_row_operator_gives_interval() {
        let p = image(&dmatrix![1.0, -2.0, 0.5], &unit_box(3), None).unwrap();
        assert_eq!(p.dim, 1);
        assert_eq!(p.outcome(), PolytopeOutcome::FullDimensional);
        let mut v: Vec<f64> = p.vertices.iter().copied().collect();
        v.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(v, vec![-2.0, 1.5]);
    }

    #[test]
    fn rank_deficient_operator_is_degenerate() {
        // second row is twice the first: image is a segment in R^2
        let op = dmatrix![1.0, 1.0, 0.0; 2.0, 2.0, 0.0];
        let p = image(&op, &unit_box(3), None).unwrap();
        assert_eq!(p.outcome(), PolytopeOutcome::Degenerate { effective_dim: 1 });
        assert!(p.is_degenerate());
        assert_eq!(p.vertex_count(), 2);
        assert!(p.contains(&dvector![1.0, 2.0], 1e-9));
        assert!(!p.contains(&dvector![1.0, 1.0], 1e-9));
    }

    #[test]
    fn zero_operator_gives_point_at_post_bias() {
        let bias = dvector![0.5, -1.0];
        let p = image(&DMatrix::zeros(2, 4), &unit_box(4), Some(&bias)).unwrap();
        assert_eq!(p.outcome(), PolytopeOutcome::Degenerate { effective_dim: 0 });
        assert_eq!(p.vertex(0), bias);
    }

    #[test]
    fn shape_errors_are_reported() {
        let op = DMatrix::identity(2, 2);
        assert!(matches!(
            image(&op, &unit_box(3), None),
            Err(CapacityError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            image(&op, &unit_box(2), Some(&dvector![1.0])),
            Err(CapacityError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn non_finite_operator_is_an_error() {
        let op = dmatrix![1.0, f64::NAN; 0.0, 1.0];
        assert!(matches!(
            image(&op, &unit_box(2), None),
            Err(CapacityError::NonFiniteInput { what: "point", .. })
        ));
        let inf_bias = dvector![f64::INFINITY, 0.0];
        assert!(matches!(
            image(&DMatrix::identity(2, 2), &unit_box(2), Some(&inf_bias)),
            Err(CapacityError::NonFiniteInput { .. })
        ));
    }

    #[test]
    fn polytope_projection_drops_a_coordinate() {
        let cube = image(&DMatrix::identity(3, 3), &unit_box(3), None).unwrap();
        assert!(!cube.is_degenerate());
        let drop_z = dmatrix![1.0, 0.0, 0.0; 0.0, 1.0, 0.0];
        let sq = project_polytope(&drop_z, &cube, None, &IncrementalHull, &HullCfg::default())
            .unwrap();
        assert_eq!(sq.vertex_count(), 4);
        assert_eq!(sq.outcome(), PolytopeOutcome::FullDimensional);
    }
}
