//! Tolerance defaults for hull extraction and vertex enumeration.
//!
//! Policy
//! - Tolerances are relative to the scale of the point cloud being processed
//!   (largest absolute deviation from its centroid), so that capacity regions
//!   in newtons and reachable regions in millimetres behave alike.
//! - Defaults are fixed constants; callers rarely need to touch them.

/// Clouds whose scale falls below this are treated as a single point.
pub(crate) const SCALE_FLOOR: f64 = 1e-300;

/// Factor between the feasibility tolerance and the "tight" (on-facet)
/// tolerance used when merging coplanar facets and testing saturation.
pub(crate) const TIGHT_FACTOR: f64 = 100.0;

/// Geometry configuration (tolerances).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HullCfg {
    /// Relative tolerance for point dedup, facet visibility and feasibility.
    pub rel_tol: f64,
    /// Relative singular-value cutoff for rank and affine-dimension decisions.
    pub rank_rtol: f64,
    /// Max distance between unit normals treated as the same facet direction.
    pub normal_tol: f64,
}

impl Default for HullCfg {
    fn default() -> Self {
        Self {
            rel_tol: 1e-9,
            rank_rtol: 1e-9,
            normal_tol: 1e-7,
        }
    }
}

impl HullCfg {
    /// Absolute tolerance for a cloud of the given scale.
    #[inline]
    pub fn abs_tol(&self, scale: f64) -> f64 {
        self.rel_tol * scale.max(SCALE_FLOOR)
    }

    /// On-facet tolerance for a cloud of the given scale.
    #[inline]
    pub fn tight_tol(&self, scale: f64) -> f64 {
        TIGHT_FACTOR * self.abs_tol(scale)
    }
}
