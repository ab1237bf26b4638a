//! Error taxonomy for capacity queries.
//!
//! Only malformed input is an error. An empty intersection or a rank-deficient
//! image is a valid result and is reported through
//! [`crate::polytope::PolytopeOutcome`] instead.

use thiserror::Error;

/// Errors surfaced by the engine. All are raised before any geometry runs,
/// except `HullFailure`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapacityError {
    /// Shape disagreement between operators, bounds and vectors.
    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// `lower > upper` (or a non-finite entry) at component `index`.
    #[error("infeasible bounds at index {index}: lower {lower} > upper {upper}")]
    InfeasibleBounds { index: usize, lower: f64, upper: f64 },
    /// NaN or infinite entry in an operator, inertia matrix or vector.
    #[error("non-finite entry in {what} at ({row}, {col})")]
    NonFiniteInput {
        what: &'static str,
        row: usize,
        col: usize,
    },
    /// Time horizon must be positive and finite.
    #[error("invalid horizon {horizon}: must be positive and finite")]
    InvalidHorizon { horizon: f64 },
    /// A reachable-space query needs velocity or torque bounds to integrate.
    #[error("reachable space needs velocity bounds, torque bounds, or both")]
    MissingCapacityBounds,
    /// Starting configuration lies outside the position bounds.
    #[error("configuration q[{index}] = {value} lies outside [{lower}, {upper}]")]
    ConfigurationOutOfBounds {
        index: usize,
        value: f64,
        lower: f64,
        upper: f64,
    },
    /// 2^dim box vertices cannot be enumerated.
    #[error("box of dimension {dim} has too many vertices to enumerate (max dimension {max})")]
    BoxTooLarge { dim: usize, max: usize },
    /// Numerical breakdown inside a hull backend.
    #[error("convex hull failed: {reason}")]
    HullFailure { reason: String },
}

impl CapacityError {
    pub(crate) fn mismatch(what: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            found,
        }
    }

    pub(crate) fn hull(reason: impl Into<String>) -> Self {
        Self::HullFailure {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CapacityError>;
