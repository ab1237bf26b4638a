//! Joint-space boxes: lower/upper bounds plus an optional bias shift.
//!
//! The vertex set has exactly 2^N vertices in binary-counter order: column `k`
//! takes `upper[j]` where bit `j` of `k` is set and `lower[j]` otherwise, then
//! adds `bias`. Identical inputs always reproduce identical vertex order.

use nalgebra::{DMatrix, DVector};

use crate::error::{CapacityError, Result};
use crate::polytope::HalfspaceSystem;

/// Largest dimension whose 2^N vertices we agree to enumerate.
pub const MAX_BOX_DIM: usize = 30;

/// Axis-aligned box `[lower, upper] + bias` in R^N.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxPolytope {
    lower: DVector<f64>,
    upper: DVector<f64>,
    bias: DVector<f64>,
}

impl BoxPolytope {
    /// Validate and build. A missing bias is the zero vector.
    ///
    /// Errors: `DimensionMismatch` on length disagreement, `InfeasibleBounds`
    /// when some `lower[i] > upper[i]` or an entry is not finite.
    pub fn new(
        lower: DVector<f64>,
        upper: DVector<f64>,
        bias: Option<DVector<f64>>,
    ) -> Result<Self> {
        let n = lower.len();
        if upper.len() != n {
            return Err(CapacityError::mismatch("upper bound", n, upper.len()));
        }
        let bias = match bias {
            Some(b) if b.len() != n => {
                return Err(CapacityError::mismatch("bias", n, b.len()));
            }
            Some(b) => b,
            None => DVector::zeros(n),
        };
        check_ordered(&lower, &upper)?;
        if let Some(i) = bias.iter().position(|x| !x.is_finite()) {
            return Err(CapacityError::InfeasibleBounds {
                index: i,
                lower: bias[i],
                upper: bias[i],
            });
        }
        Ok(Self { lower, upper, bias })
    }

    /// Symmetric box `[-radius, radius]`.
    pub fn symmetric(radius: DVector<f64>) -> Result<Self> {
        Self::new(-radius.clone(), radius, None)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn lower(&self) -> &DVector<f64> {
        &self.lower
    }

    pub fn upper(&self) -> &DVector<f64> {
        &self.upper
    }

    pub fn bias(&self) -> &DVector<f64> {
        &self.bias
    }

    /// Midpoint of `[lower, upper]` (bias not included).
    pub fn center(&self) -> DVector<f64> {
        (&self.lower + &self.upper) * 0.5
    }

    pub fn half_extents(&self) -> DVector<f64> {
        (&self.upper - &self.lower) * 0.5
    }

    /// `Some(r)` iff the box is `[-r, r]^N` with zero bias.
    pub fn isotropic_radius(&self) -> Option<f64> {
        let r = *self.upper.iter().next()?;
        let same = |x: f64| (x - r).abs() <= 1e-12 * r.abs().max(1.0);
        let iso = self.upper.iter().all(|&u| same(u))
            && self.lower.iter().all(|&l| same(-l))
            && self.bias.iter().all(|&b| b == 0.0);
        iso.then_some(r)
    }

    /// Number of vertices, `2^N`.
    pub fn vertex_count(&self) -> Result<usize> {
        if self.dim() > MAX_BOX_DIM {
            return Err(CapacityError::BoxTooLarge {
                dim: self.dim(),
                max: MAX_BOX_DIM,
            });
        }
        Ok(1usize << self.dim())
    }

    /// All 2^N vertices as columns, binary-counter order.
    ///
    /// Complexity: O(N·2^N). The count is a property of boxes, not of this
    /// implementation; keep N in the range of robot joint counts.
    pub fn vertices(&self) -> Result<DMatrix<f64>> {
        let count = self.vertex_count()?;
        let n = self.dim();
        let verts = DMatrix::from_fn(n, count, |j, k| {
            let corner = if (k >> j) & 1 == 1 {
                self.upper[j]
            } else {
                self.lower[j]
            };
            corner + self.bias[j]
        });
        tracing::trace!(dim = n, vertices = count, "box vertices");
        Ok(verts)
    }

    /// H-rep with 2N rows: `e_j·x <= upper_j + bias_j`, `-e_j·x <= -(lower_j + bias_j)`.
    pub fn halfspaces(&self) -> HalfspaceSystem {
        let n = self.dim();
        let a = DMatrix::from_fn(2 * n, n, |r, c| match (r / 2 == c, r % 2) {
            (true, 0) => 1.0,
            (true, _) => -1.0,
            _ => 0.0,
        });
        let b = DVector::from_fn(2 * n, |r, _| {
            let j = r / 2;
            if r % 2 == 0 {
                self.upper[j] + self.bias[j]
            } else {
                -(self.lower[j] + self.bias[j])
            }
        });
        HalfspaceSystem { a, b }
    }

    pub fn contains(&self, x: &DVector<f64>, tol: f64) -> bool {
        x.len() == self.dim()
            && (0..self.dim()).all(|j| {
                let y = x[j] - self.bias[j];
                y >= self.lower[j] - tol && y <= self.upper[j] + tol
            })
    }

    /// Same box scaled by `s >= 0` (bounds and bias).
    pub fn scaled(&self, s: f64) -> Self {
        Self {
            lower: &self.lower * s,
            upper: &self.upper * s,
            bias: &self.bias * s,
        }
    }
}

/// Bound pair as supplied by callers, with an optional bias.
///
/// For torque bounds the bias is a load (e.g. gravity torque) that consumes
/// part of the actuator range; see [`Bounds::available_box`].
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
    pub bias: Option<DVector<f64>>,
}

impl Bounds {
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> Self {
        Self {
            lower,
            upper,
            bias: None,
        }
    }

    /// `[-max, max]`.
    pub fn symmetric(max: DVector<f64>) -> Self {
        Self::new(-max.clone(), max)
    }

    pub fn with_bias(mut self, bias: DVector<f64>) -> Self {
        self.bias = Some(bias);
        self
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Shape and ordering checks against an expected dimension.
    pub fn validate(&self, dim: usize) -> Result<()> {
        if self.lower.len() != dim {
            return Err(CapacityError::mismatch("lower bound", dim, self.lower.len()));
        }
        if self.upper.len() != dim {
            return Err(CapacityError::mismatch("upper bound", dim, self.upper.len()));
        }
        if let Some(b) = &self.bias {
            if b.len() != dim {
                return Err(CapacityError::mismatch("bias", dim, b.len()));
            }
        }
        check_ordered(&self.lower, &self.upper)
    }

    /// `[lower, upper] + bias`.
    pub fn to_box(&self) -> Result<BoxPolytope> {
        BoxPolytope::new(self.lower.clone(), self.upper.clone(), self.bias.clone())
    }

    /// `[lower − bias, upper − bias]`: the range left once the bias load is
    /// paid for.
    pub fn available_box(&self) -> Result<BoxPolytope> {
        BoxPolytope::new(
            self.lower.clone(),
            self.upper.clone(),
            self.bias.as_ref().map(|b| -b),
        )
    }
}

/// Component-wise `lower <= upper`, all finite.
pub(crate) fn check_ordered(lower: &DVector<f64>, upper: &DVector<f64>) -> Result<()> {
    if lower.len() != upper.len() {
        return Err(CapacityError::mismatch("upper bound", lower.len(), upper.len()));
    }
    for (i, (&lo, &hi)) in lower.iter().zip(upper.iter()).enumerate() {
        if !(lo.is_finite() && hi.is_finite()) || lo > hi {
            return Err(CapacityError::InfeasibleBounds {
                index: i,
                lower: lo,
                upper: hi,
            });
        }
    }
    Ok(())
}
