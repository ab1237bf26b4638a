//! Linear algebra primitives: sorted SVD, rank, pseudo-inverse, complements.
//!
//! Everything works on dynamically sized `nalgebra` matrices. Relative cutoffs
//! (`rtol`) are always taken against the largest singular value.

use nalgebra::storage::RawStorage;
use nalgebra::{DMatrix, DVector, Dim, Matrix};

use crate::cfg::SCALE_FLOOR;
use crate::error::{CapacityError, Result};

/// Thin SVD `m = u · diag(singular_values) · v_t`, singular values descending.
#[derive(Clone, Debug)]
pub struct SvdParts {
    pub u: DMatrix<f64>,
    pub singular_values: DVector<f64>,
    pub v_t: DMatrix<f64>,
}

impl SvdParts {
    /// Number of singular values above `rtol * σ_max`.
    pub fn rank(&self, rtol: f64) -> usize {
        count_above(&self.singular_values, rtol)
    }
}

/// `NonFiniteInput` at the first NaN or infinite entry (column-major scan).
pub(crate) fn ensure_finite<R: Dim, C: Dim, S: RawStorage<f64, R, C>>(
    what: &'static str,
    m: &Matrix<f64, R, C, S>,
) -> Result<()> {
    match m.iter().position(|x| !x.is_finite()) {
        Some(i) => Err(CapacityError::NonFiniteInput {
            what,
            row: i % m.nrows(),
            col: i / m.nrows(),
        }),
        None => Ok(()),
    }
}

/// Thin SVD with singular values sorted in descending order.
///
/// Errors with `NonFiniteInput` instead of handing NaN to the decomposition.
pub fn svd(m: &DMatrix<f64>) -> Result<SvdParts> {
    ensure_finite("matrix", m)?;
    let (rows, cols) = m.shape();
    let k = rows.min(cols);
    if k == 0 {
        return Ok(SvdParts {
            u: DMatrix::zeros(rows, 0),
            singular_values: DVector::zeros(0),
            v_t: DMatrix::zeros(0, cols),
        });
    }
    let dec = m.clone().svd(true, true);
    let (u, v_t) = match (dec.u, dec.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(CapacityError::hull("SVD did not return singular vectors")),
    };
    let s = dec.singular_values;
    let mut order: Vec<usize> = (0..s.len()).collect();
    order.sort_by(|&a, &b| s[b].partial_cmp(&s[a]).unwrap_or(std::cmp::Ordering::Equal));
    let u_sorted = DMatrix::from_fn(rows, order.len(), |i, j| u[(i, order[j])]);
    let v_t_sorted = DMatrix::from_fn(order.len(), cols, |i, j| v_t[(order[i], j)]);
    let s_sorted = DVector::from_fn(order.len(), |i, _| s[order[i]]);
    Ok(SvdParts {
        u: u_sorted,
        singular_values: s_sorted,
        v_t: v_t_sorted,
    })
}

fn count_above(s: &DVector<f64>, rtol: f64) -> usize {
    let smax = s.iter().cloned().fold(0.0_f64, f64::max);
    if smax <= SCALE_FLOOR {
        return 0;
    }
    s.iter().filter(|&&x| x > rtol * smax).count()
}

/// Numerical rank. The zero matrix (and any empty matrix) has rank 0, and so
/// does a matrix with a non-finite entry.
pub fn rank(m: &DMatrix<f64>, rtol: f64) -> usize {
    if m.nrows() == 0 || m.ncols() == 0 || ensure_finite("matrix", m).is_err() {
        return 0;
    }
    count_above(&m.singular_values(), rtol)
}

/// Moore–Penrose pseudo-inverse; singular values below `rtol * σ_max` are
/// treated as zero. The result has shape `cols × rows`.
pub fn pseudo_inverse(m: &DMatrix<f64>, rtol: f64) -> Result<DMatrix<f64>> {
    let parts = svd(m)?;
    let r = parts.rank(rtol);
    let mut out = DMatrix::zeros(m.ncols(), m.nrows());
    for i in 0..r {
        let inv = 1.0 / parts.singular_values[i];
        let v = parts.v_t.row(i).transpose();
        let u = parts.u.column(i);
        out += (v * u.transpose()) * inv;
    }
    Ok(out)
}

/// Complete the orthonormal columns of `basis` (dim × k) to a basis of R^dim.
///
/// Returns only the added columns (dim × (dim − k)), built by Gram–Schmidt
/// over the standard basis.
pub fn orthonormal_complement(basis: &DMatrix<f64>, dim: usize) -> DMatrix<f64> {
    let mut cols: Vec<DVector<f64>> = basis.column_iter().map(|c| c.into_owned()).collect();
    let target = dim.saturating_sub(cols.len());
    let mut added: Vec<DVector<f64>> = Vec::with_capacity(target);
    for axis in 0..dim {
        if added.len() == target {
            break;
        }
        let mut t = DVector::zeros(dim);
        t[axis] = 1.0;
        // two passes keep the residual orthogonal in floating point
        for _ in 0..2 {
            for c in &cols {
                let alpha = c.dot(&t);
                t -= c * alpha;
            }
        }
        let norm = t.norm();
        if norm > 1e-6 {
            let unit = t / norm;
            cols.push(unit.clone());
            added.push(unit);
        }
    }
    if added.is_empty() {
        return DMatrix::zeros(dim, 0);
    }
    DMatrix::from_columns(&added)
}

/// Unit normal of the hyperplane spanned by `k − 1` difference vectors in R^k.
///
/// Cofactor expansion: `n_j = (-1)^j det(D without column j)` where the rows of
/// `D` are the differences. Returns `None` when the differences are dependent.
pub fn hyperplane_normal(diffs: &[DVector<f64>]) -> Option<DVector<f64>> {
    let k = diffs.len() + 1;
    if k < 2 || diffs.iter().any(|d| d.len() != k) {
        return None;
    }
    let d = DMatrix::from_fn(k - 1, k, |i, j| diffs[i][j]);
    let mut n = DVector::zeros(k);
    for j in 0..k {
        let minor = d.clone().remove_column(j);
        let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
        n[j] = sign * minor.determinant();
    }
    let scale: f64 = diffs.iter().map(|v| v.norm()).product();
    let norm = n.norm();
    if !norm.is_finite() || norm <= 1e-12 * scale.max(SCALE_FLOOR) {
        return None;
    }
    Some(n / norm)
}
