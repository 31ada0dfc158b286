//! Exact-sign volume kernel.
//!
//! `volume6` is the single primitive every classification in this crate is
//! built on (component B's sign test, the activation step in `Poly`). It is
//! deliberately the only place that computes a signed tetrahedral volume so
//! that sign conventions stay in one spot.

use super::point::Point3d;

/// 6 × signed volume of the tetrahedron (a, b, c, d), via the determinant of
/// (b-d, c-d, a-d). Callers classify the result against a tolerance; this
/// function never rounds to zero itself.
pub fn volume6(a: Point3d, b: Point3d, c: Point3d, d: Point3d) -> f64 {
    let ad = a - d;
    let bd = b - d;
    let cd = c - d;
    bd.cross(&cd).dot(&ad)
}

/// Default degeneracy tolerance for a mesh of the given length scale:
/// 1e-12 · max-extent³.
pub fn default_volume_tolerance(max_extent: f64) -> f64 {
    1e-12 * max_extent.powi(3)
}

/// Classification of a signed volume against a tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeSign {
    Positive,
    Negative,
    Degenerate,
}

pub fn classify_volume(v: f64, tolerance: f64) -> VolumeSign {
    if v.abs() < tolerance {
        VolumeSign::Degenerate
    } else if v > 0.0 {
        VolumeSign::Positive
    } else {
        VolumeSign::Negative
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_volume_unit_tet() {
        let a = Point3d::new(0.0, 0.0, 0.0);
        let b = Point3d::new(1.0, 0.0, 0.0);
        let c = Point3d::new(0.0, 1.0, 0.0);
        let d = Point3d::new(0.0, 0.0, 1.0);
        // Volume of this tet is 1/6; 6x is 1.
        assert_relative_eq!(volume6(a, b, c, d).abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_volume_sign_symmetry_swap_pair() {
        let a = Point3d::new(0.3, 0.1, 0.7);
        let b = Point3d::new(1.0, 0.2, 0.0);
        let c = Point3d::new(0.0, 1.0, 0.4);
        let d = Point3d::new(0.1, 0.0, 1.0);
        // Swapping any two vertices negates the sign.
        assert!((volume6(a, b, c, d) + volume6(b, a, c, d)).abs() < 1e-9);
        assert!((volume6(a, b, c, d) + volume6(a, b, d, c)).abs() < 1e-9);
    }

    #[test]
    fn test_volume_even_permutation_preserves_sign() {
        let a = Point3d::new(0.3, 0.1, 0.7);
        let b = Point3d::new(1.0, 0.2, 0.0);
        let c = Point3d::new(0.0, 1.0, 0.4);
        let d = Point3d::new(0.1, 0.0, 1.0);
        // A cyclic permutation of 3 vertices is an even permutation.
        assert!((volume6(a, b, c, d) - volume6(b, c, a, d)).abs() < 1e-9);
    }

    #[test]
    fn test_classify_volume_degenerate() {
        assert_eq!(classify_volume(1e-15, 1e-12), VolumeSign::Degenerate);
        assert_eq!(classify_volume(1.0, 1e-12), VolumeSign::Positive);
        assert_eq!(classify_volume(-1.0, 1e-12), VolumeSign::Negative);
    }
}
