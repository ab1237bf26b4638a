//! End-to-end scenarios over the façade.

use std::cell::Cell;

use nalgebra::{dmatrix, dvector, DMatrix, DVector};
use proptest::prelude::*;

use crate::prelude::*;
use crate::sample::{random_operator, random_spd_inertia, random_symmetric_bounds};

fn unit_bounds(n: usize) -> Bounds {
    Bounds::new(DVector::zeros(n), DVector::from_element(n, 1.0))
}

fn lex_sorted(mut pts: Vec<DVector<f64>>) -> Vec<DVector<f64>> {
    pts.sort_by(|a, b| {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| x.partial_cmp(y).unwrap())
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pts
}

/// Delegates to `IncrementalHull` and counts calls.
#[derive(Default)]
struct CountingHull {
    calls: Cell<usize>,
}

impl ConvexHull for CountingHull {
    fn hull(&self, points: &[DVector<f64>], cfg: &HullCfg) -> Result<HullOutput> {
        self.calls.set(self.calls.get() + 1);
        IncrementalHull.hull(points, cfg)
    }
}

struct BrokenHull;

impl ConvexHull for BrokenHull {
    fn hull(&self, _: &[DVector<f64>], _: &HullCfg) -> Result<HullOutput> {
        Err(CapacityError::HullFailure {
            reason: "stub".into(),
        })
    }
}

#[test]
fn five_joints_three_outputs_is_full_dimensional() {
    let j = random_operator(3, 5, 42);
    assert_eq!(crate::linalg::rank(&j, 1e-9), 3);
    let p = force_polytope(&j, &unit_bounds(5)).unwrap();
    assert!(!p.is_empty());
    assert_eq!(p.dim, 3);
    assert_eq!(p.outcome(), PolytopeOutcome::FullDimensional);
    assert!(p.vertex_count() >= 4 && p.vertex_count() <= 32);
    for v in p.vertex_list() {
        assert!(p.halfspaces.contains(&v, 1e-9));
    }
}

#[test]
fn disjoint_biased_force_polytopes_do_not_intersect() {
    let j = DMatrix::identity(3, 3);
    let positive = Bounds::new(DVector::from_element(3, 1.0), DVector::from_element(3, 2.0));
    let negative = positive.clone().with_bias(DVector::from_element(3, 3.0));
    let r = force_polytope_intersection(&j, &positive, &j, &negative).unwrap();
    assert_eq!(r.outcome(), PolytopeOutcome::Empty);
    assert_eq!(r.vertex_count(), 0);
    assert_eq!(r.dim, 3);
}

#[test]
fn single_row_jacobian_flows_through_every_operation() {
    let j = dmatrix![1.0, 0.5, -0.25];
    let torque = Bounds::symmetric(dvector![1.0, 1.0, 1.0]);
    let p = force_polytope(&j, &torque).unwrap();
    assert_eq!(p.dim, 1);
    assert_eq!(p.vertex_count(), 2);
    let v = velocity_polytope(&j, &Bounds::symmetric(dvector![1.0, 2.0, 4.0])).unwrap();
    assert!(v.contains(&dvector![3.0], 1e-9));
    assert!(!v.contains(&dvector![3.1], 1e-9));

    let both = intersection(&p, &v).unwrap();
    assert_eq!(both.dim, 1);
    assert!(!both.is_empty());
    let sum = minkowski_sum(&p, &v).unwrap();
    assert_eq!(sum.vertex_count(), 2);
    let e = velocity_ellipsoid(&j, &dvector![1.0, 1.0, 1.0]).unwrap();
    assert_eq!(e.radii.len(), 1);
    let s = force_polytope_sum(&j, &torque, &j, &torque).unwrap();
    assert_eq!(s.dim, 1);
}

#[test]
fn velocity_ellipsoid_radii_follow_singular_values() {
    let j = random_operator(3, 6, 9);
    let r = 0.75;
    let e = velocity_ellipsoid(&j, &DVector::from_element(6, r)).unwrap();
    let s = crate::linalg::svd(&j).unwrap().singular_values;
    for i in 0..3 {
        assert!((e.radii[i] - r * s[i]).abs() < 1e-9);
    }
}

#[test]
fn force_and_acceleration_ellipsoids_use_their_operators() {
    let j = dmatrix![1.0, 0.0; 0.0, 2.0];
    let f = force_ellipsoid(&j, &dvector![1.0, 1.0]).unwrap();
    // (Jᵀ)⁺ = diag(1, 0.5)
    assert!((f.radii[0] - 1.0).abs() < 1e-12);
    assert!((f.radii[1] - 0.5).abs() < 1e-12);

    let m = dmatrix![2.0, 0.0; 0.0, 4.0];
    let a = acceleration_ellipsoid(&j, &m, &dvector![2.0, 2.0]).unwrap();
    // J·M⁻¹ = diag(0.5, 0.5)
    assert!((a.radii[0] - 1.0).abs() < 1e-12);
    assert!((a.radii[1] - 1.0).abs() < 1e-12);
}

#[test]
fn acceleration_polytope_subtracts_the_load() {
    let j = DMatrix::identity(2, 2);
    let m = random_spd_inertia(2, 4);
    let plain = Bounds::symmetric(dvector![1.0, 1.0]);
    let loaded = plain.clone().with_bias(dvector![0.5, 0.0]);
    let p = acceleration_polytope(&j, &m, &plain).unwrap();
    let q = acceleration_polytope(&j, &m, &loaded).unwrap();
    let m_inv = m.clone().try_inverse().unwrap();
    // the load shifts the region by -M⁻¹·bias
    let shift = -(&m_inv * dvector![0.5, 0.0]);
    let moved = p.translated(&shift).unwrap();
    for v in q.vertex_list() {
        assert!(moved.contains(&v, 1e-9));
    }
}

#[test]
fn doubled_force_sum_scales_the_polytope() {
    let j = dmatrix![1.0, 0.3, 0.0; 0.0, 1.0, 0.2];
    let torque = Bounds::symmetric(dvector![1.0, 2.0, 1.0]);
    let p = force_polytope(&j, &torque).unwrap();
    let s = force_polytope_sum(&j, &torque, &j, &torque).unwrap();
    assert_eq!(s.vertex_count(), p.vertex_count());
    let doubled = p.scaled(2.0);
    for v in s.vertex_list() {
        assert!(doubled.contains(&v, 1e-9));
    }
}

#[test]
fn injected_hull_backend_is_used() {
    let counting = CountingHull::default();
    let engine = CapacityEngine::with_cfg(&counting, HullCfg::default());
    let j = random_operator(2, 3, 1);
    engine.velocity_polytope(&j, &unit_bounds(3)).unwrap();
    assert_eq!(counting.calls.get(), 1);
    engine
        .force_polytope_intersection(&j, &unit_bounds(3), &j, &unit_bounds(3))
        .unwrap();
    assert!(counting.calls.get() >= 4);

    let broken = CapacityEngine::with_cfg(BrokenHull, HullCfg::default());
    assert!(matches!(
        broken.velocity_polytope(&j, &unit_bounds(3)),
        Err(CapacityError::HullFailure { .. })
    ));
}

#[test]
fn validation_runs_before_any_geometry() {
    let counting = CountingHull::default();
    let engine = CapacityEngine::with_cfg(&counting, HullCfg::default());
    let j = random_operator(2, 3, 1);
    let swapped = Bounds::new(dvector![0.0, 1.0, 0.0], dvector![1.0, 0.0, 1.0]);
    assert_eq!(
        engine
            .force_polytope_intersection(&j, &unit_bounds(3), &j, &swapped)
            .unwrap_err(),
        CapacityError::InfeasibleBounds {
            index: 1,
            lower: 1.0,
            upper: 0.0
        }
    );
    let j3 = random_operator(3, 3, 2);
    assert!(matches!(
        engine.force_polytope_sum(&j, &unit_bounds(3), &j3, &unit_bounds(3)),
        Err(CapacityError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        engine.acceleration_polytope(&j, &DMatrix::identity(2, 2), &unit_bounds(3)),
        Err(CapacityError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        engine.velocity_ellipsoid(&j, &dvector![1.0, -1.0, 1.0]),
        Err(CapacityError::InfeasibleBounds { index: 1, .. })
    ));
    assert!(matches!(
        engine.velocity_polytope(&DMatrix::zeros(0, 3), &unit_bounds(3)),
        Err(CapacityError::DimensionMismatch { .. })
    ));
    assert_eq!(counting.calls.get(), 0);
}

#[test]
fn rank_deficient_jacobian_reports_degeneracy() {
    // third task row is the sum of the first two
    let j = dmatrix![1.0, 0.0, 1.0; 0.0, 1.0, 1.0; 1.0, 1.0, 2.0];
    let p = velocity_polytope(&j, &Bounds::symmetric(dvector![1.0, 1.0, 1.0])).unwrap();
    assert_eq!(p.outcome(), PolytopeOutcome::Degenerate { effective_dim: 2 });
    assert!(p.contains(&dvector![1.0, 1.0, 2.0], 1e-9));
    assert!(!p.contains(&dvector![1.0, 1.0, 1.0], 1e-9));
    let zero = velocity_polytope(&DMatrix::zeros(3, 3), &unit_bounds(3)).unwrap();
    assert_eq!(zero.outcome(), PolytopeOutcome::Degenerate { effective_dim: 0 });
}

#[test]
fn reachable_space_grows_with_the_horizon() {
    let j = random_operator(2, 3, 17);
    let query = |horizon: f64| ReachableQuery {
        inertia: random_spd_inertia(3, 5),
        jacobian: j.clone(),
        q0: DVector::zeros(3),
        horizon,
        position: Bounds::symmetric(DVector::from_element(3, 3.0)),
        velocity: Some(random_symmetric_bounds(3, 0.5, 1.5, 8)),
        torque: Some(Bounds::symmetric(DVector::from_element(3, 5.0))),
    };
    let fk = |q: &DVector<f64>| &j * q;
    let engine =
        CapacityEngine::<IncrementalHull>::default().with_reachable_cfg(ReachableCfg { steps: 3 });
    let short = engine.reachable_space_approximation(&query(0.2), &fk).unwrap();
    let long = engine.reachable_space_approximation(&query(0.6), &fk).unwrap();
    assert_eq!(short.steps, 3);
    assert!(!short.polytope.is_empty());
    for v in short.polytope.vertex_list() {
        assert!(long.polytope.contains(&v, 1e-8));
    }
    let single = reachable_space_approximation(&query(0.6), &fk).unwrap();
    assert_eq!(single.steps, 1);
}

#[test]
fn non_finite_operators_are_rejected_by_every_entry_point() {
    let counting = CountingHull::default();
    let engine = CapacityEngine::with_cfg(&counting, HullCfg::default());
    let nan_j = dmatrix![1.0, f64::NAN, 0.0; 0.0, 1.0, 0.0];
    let good_j = random_operator(2, 3, 4);
    let m = DMatrix::identity(3, 3);
    let mut inf_m = m.clone();
    inf_m[(2, 0)] = f64::INFINITY;
    let t = unit_bounds(3);
    let r = dvector![1.0, 1.0, 1.0];
    let is_jacobian = |e: CapacityError| {
        e == CapacityError::NonFiniteInput {
            what: "jacobian",
            row: 0,
            col: 1,
        }
    };

    assert!(is_jacobian(engine.force_polytope(&nan_j, &t).unwrap_err()));
    assert!(is_jacobian(engine.velocity_polytope(&nan_j, &t).unwrap_err()));
    assert!(is_jacobian(engine.acceleration_polytope(&nan_j, &m, &t).unwrap_err()));
    assert!(is_jacobian(engine.force_ellipsoid(&nan_j, &r).unwrap_err()));
    assert!(is_jacobian(engine.velocity_ellipsoid(&nan_j, &r).unwrap_err()));
    assert!(is_jacobian(engine.acceleration_ellipsoid(&nan_j, &m, &r).unwrap_err()));
    assert!(is_jacobian(
        engine
            .force_polytope_intersection(&good_j, &t, &nan_j, &t)
            .unwrap_err()
    ));
    assert!(is_jacobian(engine.force_polytope_sum(&nan_j, &t, &good_j, &t).unwrap_err()));
    assert_eq!(
        engine.acceleration_polytope(&good_j, &inf_m, &t).unwrap_err(),
        CapacityError::NonFiniteInput {
            what: "inertia",
            row: 2,
            col: 0
        }
    );
    assert!(matches!(
        engine.acceleration_ellipsoid(&good_j, &inf_m, &r),
        Err(CapacityError::NonFiniteInput { what: "inertia", .. })
    ));
    let query = ReachableQuery {
        inertia: m.clone(),
        jacobian: nan_j.clone(),
        q0: DVector::zeros(3),
        horizon: 0.1,
        position: Bounds::symmetric(DVector::from_element(3, 1.0)),
        velocity: Some(unit_bounds(3)),
        torque: None,
    };
    let fk = |_: &DVector<f64>| DVector::zeros(2);
    assert!(is_jacobian(engine.reachable_space_approximation(&query, &fk).unwrap_err()));
    assert_eq!(counting.calls.get(), 0);

    // polytopes built by hand reach the hull, which refuses them
    let mut bad = velocity_polytope(&good_j, &t).unwrap();
    bad.vertices[(0, 0)] = f64::NAN;
    let fine = velocity_polytope(&good_j, &t).unwrap();
    assert!(matches!(
        minkowski_sum(&bad, &fine),
        Err(CapacityError::NonFiniteInput { .. })
    ));
}

#[test]
fn six_axis_intersection_of_seven_joint_arms() {
    let j1 = random_operator(6, 7, 31);
    let j2 = random_operator(6, 7, 32);
    let torque = Bounds::symmetric(DVector::from_element(7, 1.0));
    let p = force_polytope(&j1, &torque).unwrap();
    let q = force_polytope(&j2, &torque).unwrap();
    let started = std::time::Instant::now();
    let both = force_polytope_intersection(&j1, &torque, &j2, &torque).unwrap();
    assert!(started.elapsed() < std::time::Duration::from_secs(60));
    // both wrench polytopes are symmetric about the origin
    assert_eq!(both.outcome(), PolytopeOutcome::FullDimensional);
    assert!(both.contains(&DVector::zeros(6), 1e-12));
    for v in both.vertex_list() {
        assert!(p.contains(&v, 1e-7));
        assert!(q.contains(&v, 1e-7));
    }
    // every vertex of either operand inside the other survives
    for v in p.vertex_list().into_iter().filter(|v| q.contains(v, -1e-7)) {
        assert!(both.vertex_list().iter().any(|w| (w - &v).amax() < 1e-7));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn image_vertices_come_from_box_vertices(
        seed in 0u64..1_000,
        rows in 1usize..4,
        cols in 1usize..6,
    ) {
        let op = random_operator(rows, cols, seed);
        let bounds = random_symmetric_bounds(cols, 0.1, 2.0, seed + 1);
        let bx = bounds.to_box().unwrap();
        let p = velocity_polytope(&op, &bounds).unwrap();
        let mapped = &op * bx.vertices().unwrap();
        for v in p.vertex_list() {
            let found = mapped.column_iter().any(|c| (c - &v).amax() < 1e-12);
            prop_assert!(found);
        }
        for c in mapped.column_iter() {
            prop_assert!(p.halfspaces.contains(&c.into_owned(), 1e-8));
        }
    }

    #[test]
    fn intersection_is_commutative(seed in 0u64..1_000, shift in -0.5f64..0.5) {
        let j1 = random_operator(2, 3, seed);
        let j2 = random_operator(2, 3, seed + 7);
        let p = velocity_polytope(&j1, &unit_bounds(3)).unwrap();
        let q = velocity_polytope(&j2, &Bounds::symmetric(DVector::from_element(3, 1.0)))
            .unwrap()
            .translated(&dvector![shift, 0.0])
            .unwrap();
        let pq = intersection(&p, &q).unwrap();
        let qp = intersection(&q, &p).unwrap();
        prop_assert_eq!(pq.outcome(), qp.outcome());
        prop_assert_eq!(pq.vertex_count(), qp.vertex_count());
        let a = lex_sorted(pq.vertex_list());
        let b = lex_sorted(qp.vertex_list());
        for (x, y) in a.iter().zip(b.iter()) {
            prop_assert!((x - y).amax() < 1e-7);
        }
        prop_assert_eq!(pq.halfspaces.len(), qp.halfspaces.len());
    }

    #[test]
    fn minkowski_sum_contains_pair_sums(seed in 0u64..1_000) {
        let p = velocity_polytope(&random_operator(3, 3, seed), &unit_bounds(3)).unwrap();
        let q = force_polytope(&random_operator(3, 4, seed + 3), &unit_bounds(4)).unwrap();
        let s = minkowski_sum(&p, &q).unwrap();
        prop_assert!(s.vertex_count() <= p.vertex_count() * q.vertex_count());
        for a in p.vertices.column_iter() {
            for b in q.vertices.column_iter() {
                prop_assert!(s.halfspaces.contains(&(a + b), 1e-8));
            }
        }
    }
}
