//! H→V: vertices of half-space systems.
//!
//! - [`enumerate_vertices`] solves every `d`-subset of (normalized,
//!   parallel-deduplicated) rows as an equality system. Cost is
//!   O(C(H, d) · H · d) for H rows in R^d; meant for small standalone systems.
//! - [`clip_vertices`] starts from a polytope whose vertices are already known
//!   and adds half-spaces one row at a time (double description). Cost follows
//!   the number of intermediate vertices, so intersecting two 6-D capacity
//!   polytopes with dozens of facets each stays cheap.

use nalgebra::{DMatrix, DVector};

use crate::cfg::HullCfg;
use crate::polytope::util::{
    centroid_and_scale, dedup_points_in_place, for_each_combination, lex_cmp,
};
use crate::polytope::{HalfspaceSystem, Polytope};

/// Minimum |det| of a basis of unit rows for it to define a vertex.
const BASIS_DET_EPS: f64 = 1e-10;

/// Normals shorter than this are zero rows.
const ZERO_NORMAL: f64 = 1e-12;

/// Row `i` scaled to a unit normal; `None` for a zero row.
fn unit_row(system: &HalfspaceSystem, i: usize) -> Option<(DVector<f64>, f64)> {
    let (n, c) = system.row(i);
    let norm = n.norm();
    if norm <= ZERO_NORMAL {
        return None;
    }
    Some((n / norm, c / norm))
}

/// Unit rows with zero rows dropped; `None` when a zero row is violated.
fn normalized_rows(system: &HalfspaceSystem, tol: f64) -> Option<Vec<(DVector<f64>, f64)>> {
    let mut rows: Vec<(DVector<f64>, f64)> = Vec::with_capacity(system.len());
    for i in 0..system.len() {
        let Some((n, c)) = unit_row(system, i) else {
            if system.b[i] < -tol {
                return None;
            }
            continue;
        };
        // parallel rows: keep the tighter offset
        match rows.iter_mut().find(|(m, _)| (m - &n).amax() <= ZERO_NORMAL) {
            Some(existing) => existing.1 = existing.1.min(c),
            None => rows.push((n, c)),
        }
    }
    Some(rows)
}

/// Largest distance of a hyperplane of `system` from the origin.
fn offset_scale(system: &HalfspaceSystem) -> f64 {
    (0..system.len())
        .filter_map(|i| {
            let norm = system.a.row(i).norm();
            (norm > ZERO_NORMAL).then(|| system.b[i].abs() / norm)
        })
        .fold(0.0_f64, f64::max)
}

/// All vertices of the system, deduplicated and in lexicographic order.
///
/// Returns an empty list when the system is infeasible or has no vertex
/// (unbounded along some direction). Stacked systems produce the same sorted
/// list regardless of row order. The tolerance is relative to the largest
/// hyperplane offset, so a system scaled by `s` gives the scaled vertices.
pub fn enumerate_vertices(system: &HalfspaceSystem, cfg: &HullCfg) -> Vec<DVector<f64>> {
    let d = system.dim();
    let tol = cfg.abs_tol(offset_scale(system));
    let rows = match normalized_rows(system, tol) {
        Some(rows) => rows,
        None => return Vec::new(),
    };
    if d == 0 || rows.len() < d {
        return Vec::new();
    }
    let hs = HalfspaceSystem::from_rows(d, &rows);

    let mut out: Vec<DVector<f64>> = Vec::new();
    let mut bases = 0usize;
    for_each_combination(rows.len(), d, |comb| {
        bases += 1;
        let a = DMatrix::from_fn(d, d, |r, c| rows[comb[r]].0[c]);
        if a.determinant().abs() <= BASIS_DET_EPS {
            return;
        }
        let rhs = DVector::from_fn(d, |r, _| rows[comb[r]].1);
        if let Some(x) = a.lu().solve(&rhs) {
            if hs.max_violation(&x) <= tol {
                out.push(x);
            }
        }
    });
    dedup_points_in_place(&mut out, tol);
    out.sort_by(lex_cmp);
    tracing::trace!(rows = rows.len(), dim = d, bases, vertices = out.len(), "enumerate vertices");
    out
}

/// Position of a vertex relative to a cutting hyperplane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Inside,
    On,
    Outside,
}

impl Side {
    fn of(slack: f64, tol: f64) -> Self {
        if slack > tol {
            Self::Outside
        } else if slack < -tol {
            Self::Inside
        } else {
            Self::On
        }
    }
}

/// Set of row indices, one bit per row.
#[derive(Clone, Debug, PartialEq, Eq)]
struct RowSet(Vec<u64>);

impl RowSet {
    fn with_rows(n: usize) -> Self {
        Self(vec![0; n.div_ceil(64)])
    }

    fn insert(&mut self, i: usize) {
        self.0[i / 64] |= 1u64 << (i % 64);
    }

    fn contains(&self, i: usize) -> bool {
        self.0[i / 64] & (1u64 << (i % 64)) != 0
    }

    fn intersection(&self, other: &Self) -> Self {
        Self(self.0.iter().zip(&other.0).map(|(a, b)| a & b).collect())
    }

    fn union_with(&mut self, other: &Self) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= b;
        }
    }

    fn is_subset(&self, other: &Self) -> bool {
        self.0.iter().zip(&other.0).all(|(a, b)| a & !b == 0)
    }

    fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// A vertex and the rows it is tight on.
#[derive(Clone, Debug)]
struct Corner {
    x: DVector<f64>,
    tight: RowSet,
}

/// Vertices of `start ∩ {x : cuts}`, deduplicated and in lexicographic order.
///
/// `start` must list exactly its extreme points, and they must satisfy its own
/// half-space system (as every hull-built polytope does). Rows of `cuts` are
/// added one at a time: vertices inside survive, vertices on the hyperplane
/// stay, and every edge from an inside to an outside vertex contributes its
/// crossing point. Two vertices span an edge iff no third vertex is tight on
/// every row they share.
///
/// `tol` decides the side of a cut; tightness on `start`'s own rows uses the
/// on-facet tolerance of `start`'s extent. An empty list means the
/// intersection is empty.
pub fn clip_vertices(
    start: &Polytope,
    cuts: &HalfspaceSystem,
    tol: f64,
    cfg: &HullCfg,
) -> Vec<DVector<f64>> {
    let d = start.dim;
    if start.is_empty() || start.vertex_count() == 0 || cuts.dim() != d {
        return Vec::new();
    }
    let start_pts = start.vertex_list();
    let (_, start_scale) = centroid_and_scale(&start_pts, d);
    let start_tol = cfg.tight_tol(start_scale).max(tol);

    // rows of `start` first, then the cuts; all unit length
    let mut rows: Vec<(DVector<f64>, f64)> =
        Vec::with_capacity(start.halfspaces.len() + cuts.len());
    rows.extend((0..start.halfspaces.len()).filter_map(|i| unit_row(&start.halfspaces, i)));
    let first_cut = rows.len();
    for i in 0..cuts.len() {
        match unit_row(cuts, i) {
            Some(row) => rows.push(row),
            None if cuts.b[i] < -tol => return Vec::new(),
            None => {}
        }
    }
    let total = rows.len();
    let row_tol = |r: usize| if r < first_cut { start_tol } else { tol };
    let tight_on = |x: &DVector<f64>, upto: usize| {
        let mut set = RowSet::with_rows(total);
        for (r, (a, b)) in rows[..upto].iter().enumerate() {
            if (a.dot(x) - b).abs() <= row_tol(r) {
                set.insert(r);
            }
        }
        set
    };

    let mut corners: Vec<Corner> = start_pts
        .into_iter()
        .map(|x| {
            let tight = tight_on(&x, first_cut);
            Corner { x, tight }
        })
        .collect();
    let mut edges = 0usize;

    for j in first_cut..total {
        let (a, b) = &rows[j];
        let slack: Vec<f64> = corners.iter().map(|c| a.dot(&c.x) - b).collect();
        let side: Vec<Side> = slack.iter().map(|&s| Side::of(s, tol)).collect();
        let outside: Vec<usize> = (0..corners.len())
            .filter(|&i| side[i] == Side::Outside)
            .collect();
        if outside.len() == corners.len() {
            tracing::trace!(row = j - first_cut, "clip emptied the polytope");
            return Vec::new();
        }
        if outside.is_empty() {
            for (c, s) in corners.iter_mut().zip(&side) {
                if *s == Side::On {
                    c.tight.insert(j);
                }
            }
            continue;
        }

        let mut next: Vec<Corner> = Vec::with_capacity(corners.len());
        for (c, s) in corners.iter().zip(&side) {
            match s {
                Side::Inside => next.push(c.clone()),
                Side::On => {
                    let mut c = c.clone();
                    c.tight.insert(j);
                    next.push(c);
                }
                Side::Outside => {}
            }
        }
        let inside = (0..corners.len()).filter(|&i| side[i] == Side::Inside);
        for p in inside {
            for &o in &outside {
                let shared = corners[p].tight.intersection(&corners[o].tight);
                // an edge in R^d lies on at least d − 1 independent rows
                if shared.len() + 1 < d {
                    continue;
                }
                let blocked = corners
                    .iter()
                    .enumerate()
                    .any(|(t, c)| t != p && t != o && shared.is_subset(&c.tight));
                if blocked {
                    continue;
                }
                edges += 1;
                let lambda = slack[p] / (slack[p] - slack[o]);
                let x = &corners[p].x + (&corners[o].x - &corners[p].x) * lambda;
                let mut tight = shared;
                tight.union_with(&tight_on(&x, j));
                tight.insert(j);
                // only corners on this cut can coincide with a crossing point
                match next
                    .iter_mut()
                    .find(|c| c.tight.contains(j) && (&c.x - &x).amax() <= tol)
                {
                    Some(c) => c.tight.union_with(&tight),
                    None => next.push(Corner { x, tight }),
                }
            }
        }
        corners = next;
    }

    let mut out: Vec<DVector<f64>> = corners.into_iter().map(|c| c.x).collect();
    dedup_points_in_place(&mut out, tol);
    out.sort_by(lex_cmp);
    tracing::trace!(
        start_rows = first_cut,
        cut_rows = total - first_cut,
        edges,
        vertices = out.len(),
        "clip vertices"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxpoly::BoxPolytope;
    use crate::hull::{polytope_from_points, IncrementalHull};
    use crate::projector::project_box;
    use crate::sample::random_operator;
    use nalgebra::dvector;

    fn unit_square() -> Polytope {
        let pts = vec![
            dvector![0.0, 0.0],
            dvector![1.0, 0.0],
            dvector![1.0, 1.0],
            dvector![0.0, 1.0],
        ];
        polytope_from_points(&IncrementalHull, &pts, 2, &HullCfg::default()).unwrap()
    }

    #[test]
    fn unit_square_vertices_sorted() {
        let b = BoxPolytope::new(dvector![0.0, 0.0], dvector![1.0, 1.0], None).unwrap();
        let v = enumerate_vertices(&b.halfspaces(), &HullCfg::default());
        assert_eq!(
            v,
            vec![
                dvector![0.0, 0.0],
                dvector![0.0, 1.0],
                dvector![1.0, 0.0],
                dvector![1.0, 1.0]
            ]
        );
    }

    #[test]
    fn redundant_and_scaled_rows_do_not_duplicate_vertices() {
        let rows = vec![
            (dvector![1.0, 0.0], 1.0),
            (dvector![2.0, 0.0], 2.0),
            (dvector![-1.0, 0.0], 1.0),
            (dvector![0.0, 1.0], 1.0),
            (dvector![0.0, -1.0], 1.0),
            (dvector![1.0, 1.0], 2.0),
            (dvector![0.0, 0.0], 0.0),
        ];
        let v = enumerate_vertices(&HalfspaceSystem::from_rows(2, &rows), &HullCfg::default());
        assert_eq!(v.len(), 4);
    }

    #[test]
    fn infeasible_system_has_no_vertices() {
        let v = enumerate_vertices(&HalfspaceSystem::infeasible(3), &HullCfg::default());
        assert!(v.is_empty());
        let zero_violated = HalfspaceSystem::from_rows(1, &[(dvector![0.0], -1.0)]);
        assert!(enumerate_vertices(&zero_violated, &HullCfg::default()).is_empty());
    }

    #[test]
    fn unbounded_halfplane_has_no_vertices() {
        let h = HalfspaceSystem::from_rows(2, &[(dvector![1.0, 0.0], 1.0)]);
        assert!(enumerate_vertices(&h, &HullCfg::default()).is_empty());
    }

    #[test]
    fn row_order_does_not_change_result() {
        let b = BoxPolytope::symmetric(dvector![1.0, 2.0, 0.5]).unwrap();
        let h = b.halfspaces();
        let rev_rows: Vec<(DVector<f64>, f64)> = (0..h.len()).rev().map(|i| h.row(i)).collect();
        let h_rev = HalfspaceSystem::from_rows(3, &rev_rows);
        let cfg = HullCfg::default();
        assert_eq!(enumerate_vertices(&h, &cfg), enumerate_vertices(&h_rev, &cfg));
        assert_eq!(enumerate_vertices(&h, &cfg).len(), 8);
    }

    #[test]
    fn nanometre_box_keeps_its_corners() {
        let s = 1e-9;
        let overlap = BoxPolytope::new(dvector![0.5 * s, 0.5 * s], dvector![s, s], None).unwrap();
        let v = enumerate_vertices(&overlap.halfspaces(), &HullCfg::default());
        assert_eq!(v.len(), 4);
        assert!((&v[3] - dvector![s, s]).amax() < 1e-20);

        let left = BoxPolytope::new(dvector![0.0, 0.0], dvector![s, s], None).unwrap();
        let right = BoxPolytope::new(dvector![1.2 * s, 0.0], dvector![2.0 * s, s], None).unwrap();
        let gap = left.halfspaces().stack(&right.halfspaces()).unwrap();
        assert!(enumerate_vertices(&gap, &HullCfg::default()).is_empty());
    }

    #[test]
    fn clipping_a_corner_off_the_square() {
        let cut = HalfspaceSystem::from_rows(2, &[(dvector![1.0, 1.0], 1.5)]);
        let v = clip_vertices(&unit_square(), &cut, 1e-12, &HullCfg::default());
        let expected = [
            dvector![0.0, 0.0],
            dvector![0.0, 1.0],
            dvector![0.5, 1.0],
            dvector![1.0, 0.0],
            dvector![1.0, 0.5],
        ];
        assert_eq!(v.len(), expected.len());
        for (got, want) in v.iter().zip(expected.iter()) {
            assert!((got - want).amax() < 1e-12, "{got} vs {want}");
        }
    }

    #[test]
    fn clipping_keeps_or_removes_everything() {
        let sq = unit_square();
        let cfg = HullCfg::default();
        let loose = HalfspaceSystem::from_rows(2, &[(dvector![1.0, 0.0], 5.0)]);
        assert_eq!(clip_vertices(&sq, &loose, 1e-12, &cfg).len(), 4);
        let away = HalfspaceSystem::from_rows(2, &[(dvector![-1.0, 0.0], -2.0)]);
        assert!(clip_vertices(&sq, &away, 1e-12, &cfg).is_empty());
        let zero_violated = HalfspaceSystem::from_rows(2, &[(dvector![0.0, 0.0], -1.0)]);
        assert!(clip_vertices(&sq, &zero_violated, 1e-12, &cfg).is_empty());
        // a cut through one corner only leaves that corner
        let corner = HalfspaceSystem::from_rows(2, &[(dvector![-1.0, -1.0], -2.0)]);
        assert_eq!(clip_vertices(&sq, &corner, 1e-12, &cfg), vec![dvector![1.0, 1.0]]);
    }

    #[test]
    fn clipping_a_segment_embedded_in_the_plane() {
        let cfg = HullCfg::default();
        let seg = polytope_from_points(
            &IncrementalHull,
            &[dvector![0.0, 0.0], dvector![1.0, 1.0]],
            2,
            &cfg,
        )
        .unwrap();
        let cut = HalfspaceSystem::from_rows(2, &[(dvector![1.0, 0.0], 0.5)]);
        let v = clip_vertices(&seg, &cut, 1e-12, &cfg);
        assert_eq!(v.len(), 2);
        assert!((&v[1] - dvector![0.5, 0.5]).amax() < 1e-12);
    }

    #[test]
    fn clipping_agrees_with_basis_enumeration() {
        let cfg = HullCfg::default();
        let bx = BoxPolytope::symmetric(DVector::from_element(4, 1.0)).unwrap();
        for seed in 0..6 {
            let p = project_box(&random_operator(3, 4, seed), &bx, None, &IncrementalHull, &cfg)
                .unwrap();
            let shift = dvector![0.4, -0.3, 0.2];
            let q = project_box(
                &random_operator(3, 4, seed + 50),
                &bx,
                Some(&shift),
                &IncrementalHull,
                &cfg,
            )
            .unwrap();
            let clipped = clip_vertices(&p, &q.halfspaces, 1e-9, &cfg);
            let brute = enumerate_vertices(&p.halfspaces.stack(&q.halfspaces).unwrap(), &cfg);
            assert_eq!(clipped.len(), brute.len(), "seed {seed}");
            for v in &brute {
                assert!(clipped.iter().any(|c| (c - v).amax() < 1e-7), "seed {seed}");
            }
        }
    }
}
