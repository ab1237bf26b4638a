//! Task-space polytopes in redundant H/V form.
//!
//! Conventions
//! - Half-spaces use `a_i · x <= b_i`. Systems produced by the hull carry unit
//!   normals; systems supplied by callers are accepted as-is.
//! - Vertices are stored column-wise (`dim × V`) and are minimal and
//!   deduplicated when they come out of a hull.
//! - Degenerate (lower-dimensional) polytopes are valid; their H-rep contains
//!   an equality pair (`w·x <= c`, `-w·x <= -c`) per missing direction.
//! - An empty polytope has zero vertices and `effective_dim == None`.

mod faces;
mod types;
pub(crate) mod util;

pub(crate) use faces::order_face_cyclic;
pub use types::{HalfspaceSystem, Polytope, PolytopeOutcome};
