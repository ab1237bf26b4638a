//! Small utilities: combinations, cloud scale, tolerance dedup.

use nalgebra::DVector;

/// k-combinations of `0..n` in lexicographic order, streamed to `f`.
///
/// Streaming avoids materializing `C(n, k)` index vectors for vertex
/// enumeration.
pub(crate) fn for_each_combination(n: usize, k: usize, mut f: impl FnMut(&[usize])) {
    if k == 0 || k > n {
        return;
    }
    let mut idxs: Vec<usize> = (0..k).collect();
    loop {
        f(&idxs);
        // advance the rightmost index that still has room
        let mut i = k;
        loop {
            if i == 0 {
                return;
            }
            i -= 1;
            if idxs[i] != i + n - k {
                break;
            }
            if i == 0 {
                return;
            }
        }
        idxs[i] += 1;
        for j in i + 1..k {
            idxs[j] = idxs[j - 1] + 1;
        }
    }
}

/// Centroid and scale (largest absolute coordinate deviation) of a cloud.
pub(crate) fn centroid_and_scale(points: &[DVector<f64>], dim: usize) -> (DVector<f64>, f64) {
    let mut c = DVector::zeros(dim);
    if points.is_empty() {
        return (c, 0.0);
    }
    for p in points {
        c += p;
    }
    c /= points.len() as f64;
    let scale = points
        .iter()
        .map(|p| (p - &c).amax())
        .fold(0.0_f64, f64::max);
    (c, scale)
}

/// Lexicographic order on coordinates; NaN compares equal.
pub(crate) fn lex_cmp(a: &DVector<f64>, b: &DVector<f64>) -> std::cmp::Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal) {
            std::cmp::Ordering::Equal => continue,
            o => return o,
        }
    }
    std::cmp::Ordering::Equal
}

/// Indices of a deduplicated subset of `points` (first occurrence wins).
///
/// Lexicographic sort, then adjacent points closer than `tol` (max-norm)
/// collapse. The returned indices are in ascending order.
pub(crate) fn dedup_indices(points: &[DVector<f64>], tol: f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| lex_cmp(&points[a], &points[b]).then(a.cmp(&b)));
    let mut keep: Vec<usize> = Vec::with_capacity(order.len());
    for idx in order {
        let dup = keep
            .iter()
            .rev()
            .take_while(|&&k| (points[idx][0] - points[k][0]).abs() <= tol)
            .any(|&k| (&points[idx] - &points[k]).amax() <= tol);
        if !dup {
            keep.push(idx);
        }
    }
    keep.sort_unstable();
    keep
}

/// Deduplicate a point list in place (order of survivors preserved).
pub(crate) fn dedup_points_in_place(points: &mut Vec<DVector<f64>>, tol: f64) {
    if points.len() < 2 {
        return;
    }
    let keep = dedup_indices(points, tol);
    let kept: Vec<DVector<f64>> = keep.into_iter().map(|i| points[i].clone()).collect();
    *points = kept;
}
