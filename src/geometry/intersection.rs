//! Intersection core.
//!
//! Classifies a directed segment against a triangle using six volume6
//! sign tests (component A). This is the only place in the crate that
//! decides HIT / NO_INT / DEGENERATE for a triangle/segment pair; cut
//! establishment (crate::entities::cut) calls it once per segment/triangle
//! combination and never re-derives the sign test itself.

use super::point::Point3d;
use super::volume::{classify_volume, volume6, VolumeSign};

/// Barycentric hit of a segment against a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Parameter along the segment, in (0, 1).
    pub t: f64,
    /// Barycentric weights against the triangle's three corners, summing to 1.
    pub uvw: (f64, f64, f64),
}

/// Outcome of classifying a segment against a triangle. `NO_INT` is
/// not an error — it's the ordinary negative result of a miss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntersectionOutcome {
    Hit(TriangleHit),
    NoIntersection,
    Degenerate,
}

/// Classify a directed segment (s0 -> s1) against triangle (t0, t1, t2).
///
/// Two "top/bottom" sign tests against the segment endpoints, then three
/// side tests against the triangle's edges. All three side tests agreeing
/// in sign (and disagreeing with top/bottom) is a hit; any volume landing
/// inside `tolerance` of zero is escalated to `Degenerate` rather than
/// silently resolved — coordinates are never perturbed to guess intent.
pub fn segment_triangle(
    t0: Point3d,
    t1: Point3d,
    t2: Point3d,
    s0: Point3d,
    s1: Point3d,
    tolerance: f64,
) -> IntersectionOutcome {
    let top_v = volume6(t0, t1, t2, s0);
    let bot_v = volume6(t0, t1, t2, s1);

    let top_sign = classify_volume(top_v, tolerance);
    let bot_sign = classify_volume(bot_v, tolerance);
    if top_sign == VolumeSign::Degenerate || bot_sign == VolumeSign::Degenerate {
        return IntersectionOutcome::Degenerate;
    }
    if top_sign == bot_sign {
        return IntersectionOutcome::NoIntersection;
    }

    let verts = [t0, t1, t2];
    let mut sides = [0.0f64; 3];
    for i in 0..3 {
        let a = verts[i];
        let b = verts[(i + 1) % 3];
        sides[i] = volume6(a, b, s0, s1);
    }

    let mut side_signs = [VolumeSign::Degenerate; 3];
    for i in 0..3 {
        side_signs[i] = classify_volume(sides[i], tolerance);
        if side_signs[i] == VolumeSign::Degenerate {
            return IntersectionOutcome::Degenerate;
        }
    }

    if side_signs[0] != side_signs[1] || side_signs[1] != side_signs[2] {
        return IntersectionOutcome::NoIntersection;
    }

    let t = top_v / (top_v - bot_v);
    let sum = sides[0] + sides[1] + sides[2];
    // sides[i] = volume6(verts[i], verts[i+1], s0, s1) is proportional to the
    // weight of the corner opposite that edge, i.e. verts[i+2] — so side 0
    // weights t2, side 1 weights t0, side 2 weights t1.
    let uvw = (sides[1] / sum, sides[2] / sum, sides[0] / sum);

    IntersectionOutcome::Hit(TriangleHit { t, uvw })
}

/// Evaluate a point on the segment and a point in the triangle's barycentric
/// frame from a hit; used by the intersection-round-trip test.
pub fn interpolate_segment(s0: Point3d, s1: Point3d, t: f64) -> Point3d {
    s0.lerp(&s1, t)
}

pub fn interpolate_barycentric(t0: Point3d, t1: Point3d, t2: Point3d, uvw: (f64, f64, f64)) -> Point3d {
    Point3d::new(
        uvw.0 * t0.x + uvw.1 * t1.x + uvw.2 * t2.x,
        uvw.0 * t0.y + uvw.1 * t1.y + uvw.2 * t2.y,
        uvw.0 * t0.z + uvw.1 * t1.z + uvw.2 * t2.z,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_hits_triangle_center() {
        let t0 = Point3d::new(0.0, 0.0, 0.0);
        let t1 = Point3d::new(2.0, 0.0, 0.0);
        let t2 = Point3d::new(0.0, 2.0, 0.0);
        let s0 = Point3d::new(0.3, 0.3, -1.0);
        let s1 = Point3d::new(0.3, 0.3, 1.0);

        let result = segment_triangle(t0, t1, t2, s0, s1, 1e-9);
        match result {
            IntersectionOutcome::Hit(hit) => {
                assert!((hit.t - 0.5).abs() < 1e-9);
                let sum = hit.uvw.0 + hit.uvw.1 + hit.uvw.2;
                assert!((sum - 1.0).abs() < 1e-9);
            }
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn test_segment_misses_triangle() {
        let t0 = Point3d::new(0.0, 0.0, 0.0);
        let t1 = Point3d::new(1.0, 0.0, 0.0);
        let t2 = Point3d::new(0.0, 1.0, 0.0);
        let s0 = Point3d::new(5.0, 5.0, -1.0);
        let s1 = Point3d::new(5.0, 5.0, 1.0);

        let result = segment_triangle(t0, t1, t2, s0, s1, 1e-9);
        assert_eq!(result, IntersectionOutcome::NoIntersection);
    }

    #[test]
    fn test_segment_both_above_no_intersection() {
        let t0 = Point3d::new(0.0, 0.0, 0.0);
        let t1 = Point3d::new(1.0, 0.0, 0.0);
        let t2 = Point3d::new(0.0, 1.0, 0.0);
        let s0 = Point3d::new(0.2, 0.2, 1.0);
        let s1 = Point3d::new(0.2, 0.2, 2.0);

        let result = segment_triangle(t0, t1, t2, s0, s1, 1e-9);
        assert_eq!(result, IntersectionOutcome::NoIntersection);
    }

    #[test]
    fn test_segment_tangent_through_vertex_is_degenerate() {
        let t0 = Point3d::new(0.0, 0.0, 0.0);
        let t1 = Point3d::new(1.0, 0.0, 0.0);
        let t2 = Point3d::new(0.0, 1.0, 0.0);
        // Segment passes exactly through vertex t0.
        let s0 = Point3d::new(0.0, 0.0, -1.0);
        let s1 = Point3d::new(0.0, 0.0, 1.0);

        let result = segment_triangle(t0, t1, t2, s0, s1, 1e-9);
        assert_eq!(result, IntersectionOutcome::Degenerate);
    }

    #[test]
    fn test_intersection_round_trip() {
        let t0 = Point3d::new(0.0, 0.0, 0.0);
        let t1 = Point3d::new(2.0, 0.0, 0.0);
        let t2 = Point3d::new(0.0, 2.0, 0.0);
        let s0 = Point3d::new(0.6, 0.5, -1.0);
        let s1 = Point3d::new(0.6, 0.5, 1.0);

        if let IntersectionOutcome::Hit(hit) = segment_triangle(t0, t1, t2, s0, s1, 1e-9) {
            let from_segment = interpolate_segment(s0, s1, hit.t);
            let from_triangle = interpolate_barycentric(t0, t1, t2, hit.uvw);
            assert!(from_segment.distance_to(&from_triangle) < 1e-9);
        } else {
            panic!("expected a hit");
        }
    }
}
