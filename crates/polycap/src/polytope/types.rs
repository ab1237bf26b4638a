//! Core types: half-space systems and polytopes with both representations.

use nalgebra::{DMatrix, DVector};

use crate::error::{CapacityError, Result};

/// Half-space system `{x : a·x <= b}` (one inequality per row of `a`).
#[derive(Clone, Debug, PartialEq)]
pub struct HalfspaceSystem {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
}

impl HalfspaceSystem {
    pub fn new(a: DMatrix<f64>, b: DVector<f64>) -> Result<Self> {
        if a.nrows() != b.len() {
            return Err(CapacityError::mismatch(
                "half-space offsets",
                a.nrows(),
                b.len(),
            ));
        }
        Ok(Self { a, b })
    }

    /// No constraints in R^dim.
    pub fn unconstrained(dim: usize) -> Self {
        Self {
            a: DMatrix::zeros(0, dim),
            b: DVector::zeros(0),
        }
    }

    /// A system with no solution in R^dim (`x_0 <= -1` and `-x_0 <= -1`).
    pub fn infeasible(dim: usize) -> Self {
        let a = DMatrix::from_fn(2, dim, |r, c| match (c, r) {
            (0, 0) => 1.0,
            (0, _) => -1.0,
            _ => 0.0,
        });
        Self {
            a,
            b: DVector::from_element(2, -1.0),
        }
    }

    /// The single point `p`, as `±e_i · x <= ±p_i` for every axis.
    pub fn point(p: &DVector<f64>) -> Self {
        let dim = p.len();
        let a = DMatrix::from_fn(2 * dim, dim, |r, c| match (r / 2 == c, r % 2) {
            (true, 0) => 1.0,
            (true, _) => -1.0,
            _ => 0.0,
        });
        let b = DVector::from_fn(2 * dim, |r, _| if r % 2 == 0 { p[r / 2] } else { -p[r / 2] });
        Self { a, b }
    }

    /// Build from rows `(normal, offset)`; all normals must have length `dim`.
    pub fn from_rows(dim: usize, rows: &[(DVector<f64>, f64)]) -> Self {
        let a = DMatrix::from_fn(rows.len(), dim, |r, c| rows[r].0[c]);
        let b = DVector::from_fn(rows.len(), |r, _| rows[r].1);
        Self { a, b }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.a.ncols()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.a.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.a.nrows() == 0
    }

    /// Row `i` as `(normal, offset)`.
    pub fn row(&self, i: usize) -> (DVector<f64>, f64) {
        (self.a.row(i).transpose(), self.b[i])
    }

    /// Membership with slack `tol`.
    pub fn contains(&self, x: &DVector<f64>, tol: f64) -> bool {
        if x.len() != self.dim() {
            return false;
        }
        let ax = &self.a * x;
        ax.iter().zip(self.b.iter()).all(|(l, r)| *l <= *r + tol)
    }

    /// Largest violation `max_i (a_i·x − b_i)`; negative when strictly inside.
    pub fn max_violation(&self, x: &DVector<f64>) -> f64 {
        let ax = &self.a * x;
        ax.iter()
            .zip(self.b.iter())
            .map(|(l, r)| l - r)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Rows of `self` followed by rows of `other`.
    pub fn stack(&self, other: &Self) -> Result<Self> {
        if self.dim() != other.dim() {
            return Err(CapacityError::mismatch(
                "stacked half-space dimension",
                self.dim(),
                other.dim(),
            ));
        }
        let n = self.len();
        let m = other.len();
        let a = DMatrix::from_fn(n + m, self.dim(), |r, c| {
            if r < n {
                self.a[(r, c)]
            } else {
                other.a[(r - n, c)]
            }
        });
        let b = DVector::from_fn(n + m, |r, _| if r < n { self.b[r] } else { other.b[r - n] });
        Ok(Self { a, b })
    }

    /// Image under `x ↦ x + t`: `a·(y − t) <= b` becomes `a·y <= b + a·t`.
    pub fn translated(&self, t: &DVector<f64>) -> Self {
        Self {
            a: self.a.clone(),
            b: &self.b + &self.a * t,
        }
    }

    /// Image under `x ↦ s·x` for `s != 0`: `sign(s)·a·y <= |s|·b`.
    pub(crate) fn scaled_nonzero(&self, s: f64) -> Self {
        Self {
            a: &self.a * s.signum(),
            b: &self.b * s.abs(),
        }
    }
}

/// Geometric outcome attached to every polytope result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolytopeOutcome {
    /// No feasible point (e.g. disjoint capacity regions were intersected).
    Empty,
    /// Lower-dimensional image (rank-deficient operator, point, segment...).
    Degenerate { effective_dim: usize },
    /// Image spans the whole task space.
    FullDimensional,
}

/// Convex polytope in R^dim with redundant H/V representations.
///
/// Invariants:
/// - `vertices` is `dim × V`; every vertex satisfies `halfspaces`.
/// - `faces[f]` lists vertex (column) indices on facet `f`; cyclic in 3-D.
/// - `effective_dim` is `None` iff the polytope is empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Polytope {
    pub vertices: DMatrix<f64>,
    pub halfspaces: HalfspaceSystem,
    pub faces: Vec<Vec<usize>>,
    pub dim: usize,
    pub effective_dim: Option<usize>,
}

impl Polytope {
    /// Empty polytope in R^dim; `halfspaces` records the infeasible system.
    pub fn empty(dim: usize, halfspaces: HalfspaceSystem) -> Self {
        Self {
            vertices: DMatrix::zeros(dim, 0),
            halfspaces,
            faces: Vec::new(),
            dim,
            effective_dim: None,
        }
    }

    /// The single point `p`.
    pub fn point(p: &DVector<f64>) -> Self {
        Self {
            vertices: DMatrix::from_column_slice(p.len(), 1, p.as_slice()),
            halfspaces: HalfspaceSystem::point(p),
            faces: Vec::new(),
            dim: p.len(),
            effective_dim: Some(0),
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.ncols()
    }

    #[inline]
    pub fn vertex(&self, i: usize) -> DVector<f64> {
        self.vertices.column(i).into_owned()
    }

    pub fn vertex_list(&self) -> Vec<DVector<f64>> {
        self.vertices.column_iter().map(|c| c.into_owned()).collect()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.effective_dim.is_none()
    }

    /// True for non-empty polytopes of dimension below `dim`.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        matches!(self.effective_dim, Some(k) if k < self.dim)
    }

    pub fn outcome(&self) -> PolytopeOutcome {
        match self.effective_dim {
            None => PolytopeOutcome::Empty,
            Some(k) if self.is_degenerate() => PolytopeOutcome::Degenerate { effective_dim: k },
            Some(_) => PolytopeOutcome::FullDimensional,
        }
    }

    /// Membership via the H-rep with slack `tol`. Always false when empty.
    pub fn contains(&self, x: &DVector<f64>, tol: f64) -> bool {
        !self.is_empty() && self.halfspaces.contains(x, tol)
    }

    /// Translate by `t` (length `dim`).
    pub fn translated(&self, t: &DVector<f64>) -> Result<Self> {
        if t.len() != self.dim {
            return Err(CapacityError::mismatch("translation", self.dim, t.len()));
        }
        let mut vertices = self.vertices.clone();
        for mut col in vertices.column_iter_mut() {
            col += t;
        }
        Ok(Self {
            vertices,
            halfspaces: self.halfspaces.translated(t),
            faces: self.faces.clone(),
            dim: self.dim,
            effective_dim: self.effective_dim,
        })
    }

    /// Scale about the origin by `s`; `s == 0` collapses to the origin.
    pub fn scaled(&self, s: f64) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        if s == 0.0 {
            return Self::point(&DVector::zeros(self.dim));
        }
        Self {
            vertices: &self.vertices * s,
            halfspaces: self.halfspaces.scaled_nonzero(s),
            faces: self.faces.clone(),
            dim: self.dim,
            effective_dim: self.effective_dim,
        }
    }
}
