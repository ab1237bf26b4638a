//! Ellipsoid approximation of a box image via SVD.
//!
//! For `op` (M × N) and a box with half-extents `h` the ellipsoid is the image
//! of the unit ball under `op · diag(h)`: left singular vectors give the axis
//! directions and singular values the radii. Cost is one SVD, O(M·N²).
//!
//! This is a surrogate, not the exact image. For an isotropic box `[-r, r]^N`
//! the radii are exactly `σ_i · r`. The ellipsoid is the image of the largest
//! axis-aligned ellipsoid inside the box, so it sits inside the polytope image
//! but is neither tight nor an outer bound; for anisotropic boxes the gap can
//! be large.

use nalgebra::{DMatrix, DVector};

use crate::boxpoly::BoxPolytope;
use crate::cfg::SCALE_FLOOR;
use crate::error::{CapacityError, Result};
use crate::linalg::{orthonormal_complement, svd};

/// Relative cutoff below which a radius counts as zero.
const RADIUS_RTOL: f64 = 1e-12;

/// Ellipsoid `{center + axes · diag(radii) · u : |u| <= 1}` in R^M.
///
/// `axes` is M × M orthonormal; `radii` has length M, descending, with zeros
/// along directions the operator does not reach.
#[derive(Clone, Debug, PartialEq)]
pub struct Ellipsoid {
    pub center: DVector<f64>,
    pub axes: DMatrix<f64>,
    pub radii: DVector<f64>,
}

impl Ellipsoid {
    #[inline]
    pub fn dim(&self) -> usize {
        self.center.len()
    }

    /// Semi-axis vectors (direction × length) as columns.
    pub fn semi_axes(&self) -> DMatrix<f64> {
        let mut out = self.axes.clone();
        for (j, mut col) in out.column_iter_mut().enumerate() {
            col *= self.radii[j];
        }
        out
    }

    /// Number of non-zero radii.
    pub fn rank(&self) -> usize {
        let rmax = self.radii.iter().cloned().fold(0.0_f64, f64::max);
        if rmax <= SCALE_FLOOR {
            return 0;
        }
        self.radii.iter().filter(|&&r| r > RADIUS_RTOL * rmax).count()
    }

    /// Membership with relative slack `tol`. In the collapsed directions the
    /// point must lie on the centre's affine subspace.
    pub fn contains(&self, x: &DVector<f64>, tol: f64) -> bool {
        if x.len() != self.dim() {
            return false;
        }
        let rmax = self.radii.iter().cloned().fold(0.0_f64, f64::max);
        let y = self.axes.transpose() * (x - &self.center);
        let mut q = 0.0;
        for (yi, &ri) in y.iter().zip(self.radii.iter()) {
            if ri > RADIUS_RTOL * rmax.max(SCALE_FLOOR) {
                q += (yi / ri).powi(2);
            } else if yi.abs() > tol * rmax.max(1.0) {
                return false;
            }
        }
        q <= 1.0 + tol
    }
}

/// Ellipsoid of `op · box`: SVD of `op · diag(half_extents)`, centre
/// `op · (box.center() + bias)`.
pub fn ellipsoid_from_box(op: &DMatrix<f64>, bx: &BoxPolytope) -> Result<Ellipsoid> {
    if op.ncols() != bx.dim() {
        return Err(CapacityError::mismatch("operator columns", bx.dim(), op.ncols()));
    }
    let m = op.nrows();
    let h = bx.half_extents();
    let scaled = op * DMatrix::from_diagonal(&h);
    let parts = svd(&scaled)?;
    let k = parts.singular_values.len();
    let complement = orthonormal_complement(&parts.u, m);
    let axes = DMatrix::from_fn(m, m, |r, c| {
        if c < k {
            parts.u[(r, c)]
        } else {
            complement[(r, c - k)]
        }
    });
    let radii = DVector::from_fn(m, |i, _| if i < k { parts.singular_values[i] } else { 0.0 });
    let center = op * (bx.center() + bx.bias());
    tracing::debug!(task_dim = m, joints = bx.dim(), rank = k.min(m), "ellipsoid");
    Ok(Ellipsoid {
        center,
        axes,
        radii,
    })
}
