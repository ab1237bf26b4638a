//! Default hull backend: beneath–beyond in the affine hull of the cloud.
//!
//! Algorithm
//! - Dedup the cloud to tolerance and find its affine hull via SVD of the
//!   centred points. The number of significant singular values is the
//!   effective dimension `k`.
//! - `k = 0` (point) and `k = 1` (segment) are closed form.
//! - Otherwise project to R^k, seed a simplex from far-apart points and add the
//!   rest farthest-first. Each added point replaces the facets it sees by cones
//!   over the horizon ridges (ridges owned by exactly one visible facet).
//! - Coplanar simplicial facets are merged into one half-space; a point is a
//!   vertex iff the normals of the merged facets it saturates span R^k.
//! - Half-spaces are lifted back to R^m; every direction orthogonal to the
//!   affine hull contributes an equality pair.
//!
//! Complexity: O(V·F·k) for V points and F simplicial facets, plus one SVD of
//! the `m × V` cloud.

use std::collections::{BTreeSet, HashMap};

use nalgebra::{DMatrix, DVector};

use super::{ConvexHull, HullOutput};
use crate::cfg::{HullCfg, SCALE_FLOOR};
use crate::error::{CapacityError, Result};
use crate::linalg::{hyperplane_normal, orthonormal_complement, rank, svd};
use crate::polytope::util::{centroid_and_scale, dedup_indices};
use crate::polytope::{order_face_cyclic, HalfspaceSystem};

/// Relative cutoff for "tight normals span R^k".
const SPAN_RTOL: f64 = 1e-6;

/// Incremental convex hull; stateless, so one instance can serve every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct IncrementalHull;

/// Simplicial facet `normal · y <= offset` through `verts` (k indices).
#[derive(Clone, Debug)]
struct Facet {
    verts: Vec<usize>,
    normal: DVector<f64>,
    offset: f64,
}

/// Merged coplanar facets.
#[derive(Clone, Debug)]
struct Plane {
    normal: DVector<f64>,
    offset: f64,
    members: BTreeSet<usize>,
}

impl ConvexHull for IncrementalHull {
    fn hull(&self, points: &[DVector<f64>], cfg: &HullCfg) -> Result<HullOutput> {
        let first = points
            .first()
            .ok_or_else(|| CapacityError::hull("empty point cloud"))?;
        let m = first.len();
        let (_, raw_scale) = centroid_and_scale(points, m);
        let unique = dedup_indices(points, cfg.abs_tol(raw_scale));
        let cloud: Vec<DVector<f64>> = unique.iter().map(|&i| points[i].clone()).collect();
        let (center, scale) = centroid_and_scale(&cloud, m);
        if cloud.len() == 1 || scale <= SCALE_FLOOR {
            return Ok(point_output(unique[0], &points[unique[0]]));
        }

        let centered = DMatrix::from_fn(m, cloud.len(), |i, j| cloud[j][i] - center[i]);
        let parts = svd(&centered)?;
        let k = parts.rank(cfg.rank_rtol);
        if k == 0 {
            return Ok(point_output(unique[0], &points[unique[0]]));
        }
        let basis = parts.u.columns(0, k).into_owned();
        let equalities = equality_rows(&basis, &center, m);

        if k == 1 {
            return Ok(interval_output(&cloud, &unique, &basis, &center, equalities));
        }

        let ys: Vec<DVector<f64>> = cloud
            .iter()
            .map(|x| basis.transpose() * (x - &center))
            .collect();
        let tol = cfg.abs_tol(scale);
        let tight = cfg.tight_tol(scale);
        let facets = beneath_beyond(&ys, k, tol)?;
        let planes = merge_coplanar(&facets, tight, cfg.normal_tol);
        let mut extreme = extreme_points(&ys, &planes, k, tight);
        if k == 2 {
            extreme = order_polygon(&ys, &extreme);
        }
        let position: HashMap<usize, usize> =
            extreme.iter().enumerate().map(|(p, &j)| (j, p)).collect();

        let mut rows: Vec<(DVector<f64>, f64)> =
            Vec::with_capacity(planes.len() + equalities.len());
        let mut faces: Vec<Vec<usize>> = Vec::with_capacity(planes.len());
        for plane in &planes {
            let n_x = &basis * &plane.normal;
            let c_x = plane.offset + n_x.dot(&center);
            let on_face: Vec<usize> = extreme
                .iter()
                .copied()
                .filter(|&j| (plane.normal.dot(&ys[j]) - plane.offset).abs() <= tight)
                .collect();
            let face = if k == 3 {
                let (pts, normal) = if m == 3 {
                    (
                        on_face.iter().map(|&j| cloud[j].clone()).collect::<Vec<_>>(),
                        n_x.clone(),
                    )
                } else {
                    (
                        on_face.iter().map(|&j| ys[j].clone()).collect::<Vec<_>>(),
                        plane.normal.clone(),
                    )
                };
                order_face_cyclic(&pts, &normal)
                    .into_iter()
                    .map(|i| position[&on_face[i]])
                    .collect()
            } else {
                on_face.iter().map(|j| position[j]).collect()
            };
            rows.push((n_x, c_x));
            faces.push(face);
        }
        rows.extend(equalities);

        tracing::trace!(
            unique = cloud.len(),
            effective_dim = k,
            simplicial_facets = facets.len(),
            planes = planes.len(),
            vertices = extreme.len(),
            "incremental hull"
        );
        Ok(HullOutput {
            vertex_indices: extreme.iter().map(|&j| unique[j]).collect(),
            halfspaces: HalfspaceSystem::from_rows(m, &rows),
            faces,
            effective_dim: k,
        })
    }
}

fn point_output(index: usize, p: &DVector<f64>) -> HullOutput {
    HullOutput {
        vertex_indices: vec![index],
        halfspaces: HalfspaceSystem::point(p),
        faces: Vec::new(),
        effective_dim: 0,
    }
}

/// `w·x <= w·center` and `-w·x <= -w·center` for each direction `w`
/// orthogonal to the affine hull.
fn equality_rows(
    basis: &DMatrix<f64>,
    center: &DVector<f64>,
    m: usize,
) -> Vec<(DVector<f64>, f64)> {
    let complement = orthonormal_complement(basis, m);
    let mut rows = Vec::with_capacity(2 * complement.ncols());
    for w in complement.column_iter() {
        let w = w.into_owned();
        let c = w.dot(center);
        rows.push((w.clone(), c));
        rows.push((-w, -c));
    }
    rows
}

fn interval_output(
    cloud: &[DVector<f64>],
    unique: &[usize],
    basis: &DMatrix<f64>,
    center: &DVector<f64>,
    equalities: Vec<(DVector<f64>, f64)>,
) -> HullOutput {
    let mut u: DVector<f64> = basis.column(0).into_owned();
    // canonical sign: first significant component positive
    if let Some(&lead) = u.iter().find(|x| x.abs() > 1e-12) {
        if lead < 0.0 {
            u = -u;
        }
    }
    let ts: Vec<f64> = cloud.iter().map(|x| u.dot(&(x - center))).collect();
    let (mut jmin, mut jmax) = (0usize, 0usize);
    for (j, &t) in ts.iter().enumerate() {
        if t < ts[jmin] {
            jmin = j;
        }
        if t > ts[jmax] {
            jmax = j;
        }
    }
    let uc = u.dot(center);
    let mut rows = vec![(u.clone(), ts[jmax] + uc), (-u, -(ts[jmin] + uc))];
    rows.extend(equalities);
    HullOutput {
        vertex_indices: vec![unique[jmin], unique[jmax]],
        halfspaces: HalfspaceSystem::from_rows(center.len(), &rows),
        faces: vec![vec![0], vec![1]],
        effective_dim: 1,
    }
}

fn make_facet(ys: &[DVector<f64>], verts: Vec<usize>, interior: &DVector<f64>) -> Option<Facet> {
    let base = &ys[verts[0]];
    let diffs: Vec<DVector<f64>> = verts[1..].iter().map(|&i| &ys[i] - base).collect();
    let mut normal = hyperplane_normal(&diffs)?;
    let mut offset = normal.dot(base);
    if normal.dot(interior) > offset {
        normal = -normal;
        offset = -offset;
    }
    Some(Facet {
        verts,
        normal,
        offset,
    })
}

/// `k + 1` affinely independent points, greedily far apart.
fn seed_simplex(ys: &[DVector<f64>], k: usize, tol: f64) -> Option<Vec<usize>> {
    let first = (0..ys.len()).min_by(|&a, &b| {
        ys[a][0]
            .partial_cmp(&ys[b][0])
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    let mut chosen = vec![first];
    let mut span: Vec<DVector<f64>> = Vec::with_capacity(k);
    while chosen.len() < k + 1 {
        let mut best: Option<(usize, DVector<f64>, f64)> = None;
        for (j, y) in ys.iter().enumerate() {
            if chosen.contains(&j) {
                continue;
            }
            let mut r = y - &ys[first];
            for s in &span {
                let alpha = s.dot(&r);
                r -= s * alpha;
            }
            let nr = r.norm();
            if nr > tol && best.as_ref().map_or(true, |b| nr > b.2) {
                best = Some((j, r, nr));
            }
        }
        let (j, r, nr) = best?;
        span.push(r / nr);
        chosen.push(j);
    }
    Some(chosen)
}

fn beneath_beyond(ys: &[DVector<f64>], k: usize, tol: f64) -> Result<Vec<Facet>> {
    let simplex = seed_simplex(ys, k, tol)
        .ok_or_else(|| CapacityError::hull("could not seed an initial simplex"))?;
    let mut interior = DVector::zeros(k);
    for &i in &simplex {
        interior += &ys[i];
    }
    interior /= simplex.len() as f64;

    let mut facets: Vec<Facet> = Vec::new();
    for skip in 0..simplex.len() {
        let verts: Vec<usize> = simplex
            .iter()
            .enumerate()
            .filter(|&(p, _)| p != skip)
            .map(|(_, &i)| i)
            .collect();
        let f = make_facet(ys, verts, &interior)
            .ok_or_else(|| CapacityError::hull("degenerate initial simplex"))?;
        facets.push(f);
    }

    let mut rest: Vec<usize> = (0..ys.len()).filter(|i| !simplex.contains(i)).collect();
    let dist: Vec<f64> = ys.iter().map(|y| (y - &interior).norm()).collect();
    rest.sort_by(|&a, &b| {
        dist[b]
            .partial_cmp(&dist[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    for p in rest {
        let y = &ys[p];
        let visible: Vec<usize> = facets
            .iter()
            .enumerate()
            .filter(|(_, f)| f.normal.dot(y) - f.offset > tol)
            .map(|(i, _)| i)
            .collect();
        if visible.is_empty() {
            continue;
        }
        // ridges seen once among visible facets form the horizon
        let mut counts: HashMap<Vec<usize>, usize> = HashMap::new();
        let mut ridges: Vec<Vec<usize>> = Vec::new();
        for &fi in &visible {
            let verts = &facets[fi].verts;
            for skip in 0..verts.len() {
                let mut ridge: Vec<usize> = verts
                    .iter()
                    .enumerate()
                    .filter(|&(q, _)| q != skip)
                    .map(|(_, &v)| v)
                    .collect();
                ridge.sort_unstable();
                let count = counts.entry(ridge.clone()).or_insert(0);
                if *count == 0 {
                    ridges.push(ridge);
                }
                *count += 1;
            }
        }
        let visible_set: BTreeSet<usize> = visible.into_iter().collect();
        let mut next: Vec<Facet> = facets
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !visible_set.contains(i))
            .map(|(_, f)| f)
            .collect();
        for ridge in ridges {
            if counts.get(&ridge) != Some(&1) {
                continue;
            }
            let mut verts = ridge;
            verts.push(p);
            match make_facet(ys, verts, &interior) {
                Some(f) => next.push(f),
                None => tracing::trace!(point = p, "skipped flat cone facet"),
            }
        }
        facets = next;
    }
    Ok(facets)
}

fn merge_coplanar(facets: &[Facet], tight: f64, normal_tol: f64) -> Vec<Plane> {
    let mut planes: Vec<Plane> = Vec::new();
    for f in facets {
        let hit = planes.iter_mut().find(|pl| {
            (&pl.normal - &f.normal).amax() <= normal_tol && (pl.offset - f.offset).abs() <= tight
        });
        match hit {
            Some(pl) => pl.members.extend(f.verts.iter().copied()),
            None => planes.push(Plane {
                normal: f.normal.clone(),
                offset: f.offset,
                members: f.verts.iter().copied().collect(),
            }),
        }
    }
    planes
}

/// Points whose saturated planes have normals spanning R^k, ascending.
fn extreme_points(ys: &[DVector<f64>], planes: &[Plane], k: usize, tight: f64) -> Vec<usize> {
    let candidates: BTreeSet<usize> =
        planes.iter().flat_map(|p| p.members.iter().copied()).collect();
    candidates
        .into_iter()
        .filter(|&j| {
            let tight_normals: Vec<&DVector<f64>> = planes
                .iter()
                .filter(|p| (p.normal.dot(&ys[j]) - p.offset).abs() <= tight)
                .map(|p| &p.normal)
                .collect();
            if tight_normals.len() < k {
                return false;
            }
            let n = DMatrix::from_fn(tight_normals.len(), k, |r, c| tight_normals[r][c]);
            rank(&n, SPAN_RTOL) == k
        })
        .collect()
}

/// Counterclockwise order of polygon vertices in the 2-D chart.
fn order_polygon(ys: &[DVector<f64>], idx: &[usize]) -> Vec<usize> {
    if idx.is_empty() {
        return Vec::new();
    }
    let mut c = DVector::zeros(2);
    for &j in idx {
        c += &ys[j];
    }
    c /= idx.len() as f64;
    let mut out = idx.to_vec();
    let angle = |j: usize| (ys[j][1] - c[1]).atan2(ys[j][0] - c[0]);
    out.sort_by(|&a, &b| angle(a).partial_cmp(&angle(b)).unwrap_or(std::cmp::Ordering::Equal));
    out
}
