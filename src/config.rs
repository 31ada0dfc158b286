//! Pipeline configuration: one struct bundling every tolerance and
//! opt-in-expensive-check knob the pipeline driver consults, rather than
//! scattering constants through `Domain`.

use serde::{Deserialize, Serialize};

/// Global tolerance configuration for geometric comparisons. The volume
/// tolerance τ used by the intersection core is this type's `coincidence`
/// field generalized to 6x tet volumes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tolerance {
    /// Points closer than this are considered coincident (meters).
    pub coincidence: f64,
    /// Angles smaller than this (radians) are considered zero.
    pub angular: f64,
    /// Parameter-space tolerance for curve/surface evaluations.
    pub parametric: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            coincidence: 1e-7,
            angular: 1e-10,
            parametric: 1e-9,
        }
    }
}

impl Tolerance {
    pub fn points_coincident(&self, a: &crate::geometry::point::Point3d, b: &crate::geometry::point::Point3d) -> bool {
        a.distance_to(b) < self.coincidence
    }

    pub fn is_zero_length(&self, length: f64) -> bool {
        length.abs() < self.coincidence
    }

    /// Default degeneracy tolerance for a mesh of the given length scale:
    /// 1e-12 · max-extent³.
    pub fn volume_tolerance(&self, max_extent: f64) -> f64 {
        crate::geometry::volume::default_volume_tolerance(max_extent)
    }
}

/// Knobs consulted by [`crate::domain::Domain::run`]. Bundles the
/// caller-supplied near-tree query cap and the opt-in `verify_paint` pass
/// alongside tolerance rather than scattering them as free function
/// arguments.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub tolerance: Tolerance,
    /// Cap passed to every [`crate::spatial::neartree::NearTree::query`]
    /// call while gathering cut candidates.
    pub near_tree_query_cap: usize,
    /// Run [`crate::mask::Mask::verify_paint`] on every mask immediately
    /// after painting, converting a failure into
    /// [`crate::error::DomainError::NonWatertightSurface`] rather than
    /// letting bad regions propagate silently into emission.
    pub verify_after_paint: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            near_tree_query_cap: 4096,
            verify_after_paint: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_verifies_paint() {
        let cfg = PipelineConfig::default();
        assert!(cfg.verify_after_paint);
        assert!(cfg.near_tree_query_cap > 0);
    }
}
