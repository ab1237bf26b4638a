//! JSON query descriptions and their serializable results.
//!
//! Matrices travel as lists of rows. A query names one façade operation:
//!
//! ```json
//! { "name": "arm", "kind": "force_polytope",
//!   "jacobian": [[1.0, 0.0, 0.5], [0.0, 1.0, 0.5]],
//!   "torque": { "lower": [-1, -1, -1], "upper": [1, 1, 1] } }
//! ```

use anyhow::{bail, Context, Result};
use nalgebra::{DMatrix, DVector};
use polycap::prelude::*;
use serde::{Deserialize, Serialize};

pub type Rows = Vec<Vec<f64>>;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BoundsSpec {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias: Option<Vec<f64>>,
}

impl BoundsSpec {
    fn to_bounds(&self) -> Bounds {
        let b = Bounds::new(
            DVector::from_vec(self.lower.clone()),
            DVector::from_vec(self.upper.clone()),
        );
        match &self.bias {
            Some(bias) => b.with_bias(DVector::from_vec(bias.clone())),
            None => b,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryKind {
    ForcePolytope {
        jacobian: Rows,
        torque: BoundsSpec,
    },
    VelocityPolytope {
        jacobian: Rows,
        velocity: BoundsSpec,
    },
    AccelerationPolytope {
        jacobian: Rows,
        inertia: Rows,
        torque: BoundsSpec,
    },
    ForceEllipsoid {
        jacobian: Rows,
        t_max: Vec<f64>,
    },
    VelocityEllipsoid {
        jacobian: Rows,
        dq_max: Vec<f64>,
    },
    AccelerationEllipsoid {
        jacobian: Rows,
        inertia: Rows,
        t_max: Vec<f64>,
    },
    ForcePolytopeIntersection {
        jacobian1: Rows,
        torque1: BoundsSpec,
        jacobian2: Rows,
        torque2: BoundsSpec,
    },
    ForcePolytopeSum {
        jacobian1: Rows,
        torque1: BoundsSpec,
        jacobian2: Rows,
        torque2: BoundsSpec,
    },
    /// Forward kinematics is the constant `x0` (origin when omitted).
    ReachableSpace {
        jacobian: Rows,
        inertia: Rows,
        q0: Vec<f64>,
        horizon: f64,
        position: BoundsSpec,
        #[serde(default)]
        velocity: Option<BoundsSpec>,
        #[serde(default)]
        torque: Option<BoundsSpec>,
        #[serde(default)]
        steps: Option<usize>,
        #[serde(default)]
        x0: Option<Vec<f64>>,
    },
}

impl QueryKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ForcePolytope { .. } => "force_polytope",
            Self::VelocityPolytope { .. } => "velocity_polytope",
            Self::AccelerationPolytope { .. } => "acceleration_polytope",
            Self::ForceEllipsoid { .. } => "force_ellipsoid",
            Self::VelocityEllipsoid { .. } => "velocity_ellipsoid",
            Self::AccelerationEllipsoid { .. } => "acceleration_ellipsoid",
            Self::ForcePolytopeIntersection { .. } => "force_polytope_intersection",
            Self::ForcePolytopeSum { .. } => "force_polytope_sum",
            Self::ReachableSpace { .. } => "reachable_space",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QuerySpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: QueryKind,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HalfspacesOut {
    pub a: Rows,
    pub b: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryOutput {
    Polytope {
        outcome: String,
        dim: usize,
        effective_dim: Option<usize>,
        vertices: Rows,
        halfspaces: HalfspacesOut,
        faces: Vec<Vec<usize>>,
    },
    Ellipsoid {
        center: Vec<f64>,
        radii: Vec<f64>,
        /// Semi-axis vectors, one per entry.
        semi_axes: Rows,
    },
}

impl QueryOutput {
    pub fn dim(&self) -> usize {
        match self {
            Self::Polytope { dim, .. } => *dim,
            Self::Ellipsoid { center, .. } => center.len(),
        }
    }
}

fn matrix(what: &str, rows: &Rows) -> Result<DMatrix<f64>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        bail!("{what}: row {i} has {} entries, expected {ncols}", r.len());
    }
    Ok(DMatrix::from_fn(rows.len(), ncols, |r, c| rows[r][c]))
}

fn outcome_label(outcome: PolytopeOutcome) -> String {
    match outcome {
        PolytopeOutcome::Empty => "empty".to_string(),
        PolytopeOutcome::Degenerate { effective_dim } => format!("degenerate({effective_dim})"),
        PolytopeOutcome::FullDimensional => "full".to_string(),
    }
}

fn columns(m: &DMatrix<f64>) -> Rows {
    m.column_iter().map(|c| c.iter().copied().collect()).collect()
}

impl From<&Polytope> for QueryOutput {
    fn from(p: &Polytope) -> Self {
        let a = (0..p.halfspaces.len())
            .map(|i| p.halfspaces.a.row(i).iter().copied().collect())
            .collect();
        Self::Polytope {
            outcome: outcome_label(p.outcome()),
            dim: p.dim,
            effective_dim: p.effective_dim,
            vertices: columns(&p.vertices),
            halfspaces: HalfspacesOut {
                a,
                b: p.halfspaces.b.iter().copied().collect(),
            },
            faces: p.faces.clone(),
        }
    }
}

impl From<&Ellipsoid> for QueryOutput {
    fn from(e: &Ellipsoid) -> Self {
        Self::Ellipsoid {
            center: e.center.iter().copied().collect(),
            radii: e.radii.iter().copied().collect(),
            semi_axes: columns(&e.semi_axes()),
        }
    }
}

/// Run one query against `engine`.
pub fn run_query(engine: &CapacityEngine, spec: &QuerySpec) -> Result<QueryOutput> {
    let label = spec.kind.label();
    let out: QueryOutput = match &spec.kind {
        QueryKind::ForcePolytope { jacobian, torque } => {
            let j = matrix("jacobian", jacobian)?;
            (&engine.force_polytope(&j, &torque.to_bounds())?).into()
        }
        QueryKind::VelocityPolytope { jacobian, velocity } => {
            let j = matrix("jacobian", jacobian)?;
            (&engine.velocity_polytope(&j, &velocity.to_bounds())?).into()
        }
        QueryKind::AccelerationPolytope {
            jacobian,
            inertia,
            torque,
        } => {
            let j = matrix("jacobian", jacobian)?;
            let m = matrix("inertia", inertia)?;
            (&engine.acceleration_polytope(&j, &m, &torque.to_bounds())?).into()
        }
        QueryKind::ForceEllipsoid { jacobian, t_max } => {
            let j = matrix("jacobian", jacobian)?;
            (&engine.force_ellipsoid(&j, &DVector::from_vec(t_max.clone()))?).into()
        }
        QueryKind::VelocityEllipsoid { jacobian, dq_max } => {
            let j = matrix("jacobian", jacobian)?;
            (&engine.velocity_ellipsoid(&j, &DVector::from_vec(dq_max.clone()))?).into()
        }
        QueryKind::AccelerationEllipsoid {
            jacobian,
            inertia,
            t_max,
        } => {
            let j = matrix("jacobian", jacobian)?;
            let m = matrix("inertia", inertia)?;
            (&engine.acceleration_ellipsoid(&j, &m, &DVector::from_vec(t_max.clone()))?).into()
        }
        QueryKind::ForcePolytopeIntersection {
            jacobian1,
            torque1,
            jacobian2,
            torque2,
        } => {
            let j1 = matrix("jacobian1", jacobian1)?;
            let j2 = matrix("jacobian2", jacobian2)?;
            (&engine.force_polytope_intersection(
                &j1,
                &torque1.to_bounds(),
                &j2,
                &torque2.to_bounds(),
            )?)
                .into()
        }
        QueryKind::ForcePolytopeSum {
            jacobian1,
            torque1,
            jacobian2,
            torque2,
        } => {
            let j1 = matrix("jacobian1", jacobian1)?;
            let j2 = matrix("jacobian2", jacobian2)?;
            (&engine.force_polytope_sum(&j1, &torque1.to_bounds(), &j2, &torque2.to_bounds())?)
                .into()
        }
        QueryKind::ReachableSpace {
            jacobian,
            inertia,
            q0,
            horizon,
            position,
            velocity,
            torque,
            steps,
            x0,
        } => {
            let jac = matrix("jacobian", jacobian)?;
            let x0 = match x0 {
                Some(x) => DVector::from_vec(x.clone()),
                None => DVector::zeros(jac.nrows()),
            };
            let query = ReachableQuery {
                inertia: matrix("inertia", inertia)?,
                jacobian: jac,
                q0: DVector::from_vec(q0.clone()),
                horizon: *horizon,
                position: position.to_bounds(),
                velocity: velocity.as_ref().map(BoundsSpec::to_bounds),
                torque: torque.as_ref().map(BoundsSpec::to_bounds),
            };
            let fk = move |_: &DVector<f64>| x0.clone();
            let engine = engine
                .clone()
                .with_reachable_cfg(ReachableCfg {
                    steps: steps.unwrap_or(1),
                });
            (&engine.reachable_space_approximation(&query, &fk)?.polytope).into()
        }
    };
    tracing::info!(name = ?spec.name, kind = label, dim = out.dim(), "query done");
    Ok(out)
}

/// Parse a single query or a list of queries.
pub fn parse_queries(text: &str) -> Result<Vec<QuerySpec>> {
    let value: serde_json::Value = serde_json::from_str(text).context("parsing query JSON")?;
    if value.is_array() {
        serde_json::from_value(value).context("decoding query list")
    } else {
        Ok(vec![serde_json::from_value(value).context("decoding query")?])
    }
}
