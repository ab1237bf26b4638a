//! Force polytope and ellipsoid of a planar 3-link arm.
//!
//! Usage:
//!   cargo run -p polycap --example force_polytope
//!
//! Prints the polytope's vertices and half-spaces next to the ellipsoid radii.

use nalgebra::{DMatrix, DVector};
use polycap::prelude::*;

/// Position Jacobian of a planar arm with unit links at joint angles `q`.
fn planar_jacobian(q: &[f64]) -> DMatrix<f64> {
    let n = q.len();
    let mut j = DMatrix::zeros(2, n);
    for col in 0..n {
        let mut angle = 0.0;
        for (i, qi) in q.iter().enumerate() {
            angle += qi;
            if i >= col {
                j[(0, col)] -= angle.sin();
                j[(1, col)] += angle.cos();
            }
        }
    }
    j
}

fn main() -> Result<()> {
    let j = planar_jacobian(&[0.3, 0.6, -0.4]);
    let t_max = DVector::from_vec(vec![20.0, 15.0, 10.0]);
    let torque = Bounds::symmetric(t_max.clone());

    let p = force_polytope(&j, &torque)?;
    println!("outcome: {:?}", p.outcome());
    for (i, v) in p.vertex_list().iter().enumerate() {
        println!("v{i}: [{:8.3}, {:8.3}]", v[0], v[1]);
    }
    for i in 0..p.halfspaces.len() {
        let (n, c) = p.halfspaces.row(i);
        println!("h{i}: {:6.3}·x + {:6.3}·y <= {:8.3}", n[0], n[1], c);
    }

    let e = force_ellipsoid(&j, &t_max)?;
    println!("ellipsoid radii: {:?}", e.radii.as_slice());
    Ok(())
}
