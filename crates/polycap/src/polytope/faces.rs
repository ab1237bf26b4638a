//! Cyclic ordering of facet vertices in 3-D (for renderers downstream).

use nalgebra::{DMatrix, DVector, Vector3};

use crate::linalg::orthonormal_complement;

/// Order the 3-D points `pts` (all on one facet with outward unit `normal`)
/// counterclockwise as seen from outside. Returns a permutation of `0..len`.
///
/// Angles are measured around the facet centroid in an orthonormal chart of
/// the facet plane.
pub(crate) fn order_face_cyclic(pts: &[DVector<f64>], normal: &DVector<f64>) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..pts.len()).collect();
    if pts.len() < 3 || normal.len() != 3 {
        return idx;
    }
    let n = DMatrix::from_column_slice(3, 1, normal.as_slice());
    let chart = orthonormal_complement(&n, 3);
    if chart.ncols() != 2 {
        return idx;
    }
    let mut u1: Vector3<f64> = Vector3::new(chart[(0, 0)], chart[(1, 0)], chart[(2, 0)]);
    let mut u2: Vector3<f64> = Vector3::new(chart[(0, 1)], chart[(1, 1)], chart[(2, 1)]);
    let n3 = Vector3::new(normal[0], normal[1], normal[2]);
    if u1.cross(&u2).dot(&n3) < 0.0 {
        std::mem::swap(&mut u1, &mut u2);
    }
    let mut centroid = Vector3::zeros();
    for p in pts {
        centroid += Vector3::new(p[0], p[1], p[2]);
    }
    centroid /= pts.len() as f64;
    let angles: Vec<f64> = pts
        .iter()
        .map(|p| {
            let rel = Vector3::new(p[0], p[1], p[2]) - centroid;
            u2.dot(&rel).atan2(u1.dot(&rel))
        })
        .collect();
    idx.sort_by(|&a, &b| {
        angles[a]
            .partial_cmp(&angles[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    idx
}
