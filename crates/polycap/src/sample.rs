//! Seeded random fixtures: operators, inertia matrices and bound pairs.
//!
//! Used by tests, benchmarks and the CLI's synthetic queries. Every generator
//! takes an explicit seed so a run can be replayed exactly.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::boxpoly::Bounds;

/// `rows × cols` operator with entries uniform in `[-1, 1)`.
///
/// Full rank with probability one.
pub fn random_operator(rows: usize, cols: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(-1.0..1.0))
}

/// Symmetric positive-definite `n × n` matrix `AᵀA + I` with `A` uniform.
pub fn random_spd_inertia(n: usize, seed: u64) -> DMatrix<f64> {
    let a = random_operator(n, n, seed);
    a.transpose() * &a + DMatrix::identity(n, n)
}

/// Bounds `[-u, u]` with `u_i` uniform in `[lo, hi)`.
pub fn random_symmetric_bounds(n: usize, lo: f64, hi: f64, seed: u64) -> Bounds {
    let mut rng = StdRng::seed_from_u64(seed);
    let u = DVector::from_fn(n, |_, _| if hi > lo { rng.gen_range(lo..hi) } else { lo });
    Bounds::symmetric(u)
}
