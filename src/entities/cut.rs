//! Cut establishment between a dual triangle and a
//! cutting-surface triangle.

use crate::error::CutFailure;
use crate::geometry::intersection::{segment_triangle, IntersectionOutcome};

use super::{CutId, EntityStore, TriangleId, TriangleKind};

/// Classify every segment of `tri_domain` against `tri_surface` and vice
/// versa, `Ok(None)` for a clean miss, `Ok(Some(cut))`
/// when exactly two intersections were found, or `Err` for a tangent
/// (1-hit) or coplanar/repeated (>=3-hit) degeneracy. Any single volume
/// test landing on the tolerance boundary escalates the whole pair to
/// `Err` immediately rather than guessing intent.
pub fn establish_between(
    store: &mut EntityStore,
    tri_domain: TriangleId,
    tri_surface: TriangleId,
    tolerance: f64,
) -> Result<Option<CutId>, CutFailure> {
    let domain_verts = store.triangle_vertices(tri_domain);
    let surface_verts = store.triangle_vertices(tri_surface);

    // (triangle the hit is recorded against, segment tested, outcome)
    let mut hits: Vec<(TriangleId, crate::entities::SegmentId, f64, (f64, f64, f64))> = Vec::new();

    let domain_segments = store.triangles[tri_domain].segments;
    for seg in domain_segments {
        let (s0, s1) = store.segment_endpoints(seg);
        match segment_triangle(
            surface_verts[0],
            surface_verts[1],
            surface_verts[2],
            s0,
            s1,
            tolerance,
        ) {
            IntersectionOutcome::Hit(hit) => hits.push((tri_surface, seg, hit.t, hit.uvw)),
            IntersectionOutcome::NoIntersection => {}
            IntersectionOutcome::Degenerate => {
                return Err(CutFailure::Degenerate {
                    domain_tri: tri_domain,
                    surface_tri: tri_surface,
                    hit_count: hits.len(),
                })
            }
        }
    }

    let surface_segments = store.triangles[tri_surface].segments;
    for seg in surface_segments {
        let (s0, s1) = store.segment_endpoints(seg);
        match segment_triangle(
            domain_verts[0],
            domain_verts[1],
            domain_verts[2],
            s0,
            s1,
            tolerance,
        ) {
            IntersectionOutcome::Hit(hit) => hits.push((tri_domain, seg, hit.t, hit.uvw)),
            IntersectionOutcome::NoIntersection => {}
            IntersectionOutcome::Degenerate => {
                return Err(CutFailure::Degenerate {
                    domain_tri: tri_domain,
                    surface_tri: tri_surface,
                    hit_count: hits.len(),
                })
            }
        }
    }

    match hits.len() {
        0 => Ok(None),
        1 => Err(CutFailure::Degenerate {
            domain_tri: tri_domain,
            surface_tri: tri_surface,
            hit_count: 1,
        }),
        2 => {
            let (t0, seg0, p0, uvw0) = hits[0];
            let (t1, seg1, p1, uvw1) = hits[1];
            let i0 = store.create_intersection(t0, seg0, p0, uvw0);
            let i1 = store.create_intersection(t1, seg1, p1, uvw1);
            let cut = store.create_cut(i0, i1, tri_domain, tri_surface);
            Ok(Some(cut))
        }
        n => Err(CutFailure::Degenerate {
            domain_tri: tri_domain,
            surface_tri: tri_surface,
            hit_count: n,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Point3d;

    #[test]
    fn test_establish_between_clean_miss() {
        let mut store = EntityStore::new();
        let a = store.create_node(Point3d::new(0.0, 0.0, 0.0));
        let b = store.create_node(Point3d::new(1.0, 0.0, 0.0));
        let c = store.create_node(Point3d::new(0.0, 1.0, 0.0));
        let domain_tri = store.create_triangle([a, b, c], None, TriangleKind::DualBoundary);

        let d = store.create_node(Point3d::new(10.0, 10.0, 10.0));
        let e = store.create_node(Point3d::new(11.0, 10.0, 10.0));
        let f = store.create_node(Point3d::new(10.0, 11.0, 10.0));
        let surface_tri = store.create_triangle([d, e, f], None, TriangleKind::Surface);

        let result = establish_between(&mut store, domain_tri, surface_tri, 1e-9);
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn test_establish_between_produces_cut() {
        let mut store = EntityStore::new();
        // One face of the unit tet (0,0,0),(1,0,0),(0,1,0),(0,0,1): the
        // y=0 face, with one vertical edge and one sloped edge.
        let a = store.create_node(Point3d::new(0.0, 0.0, 0.0));
        let b = store.create_node(Point3d::new(1.0, 0.0, 0.0));
        let c = store.create_node(Point3d::new(0.0, 0.0, 1.0));
        let domain_tri = store.create_triangle([a, b, c], None, TriangleKind::DualBoundary);

        // Horizontal cutter plane z=0.5, wide enough to cover the domain
        // triangle's footprint.
        let d = store.create_node(Point3d::new(-1.0, -1.0, 0.5));
        let e = store.create_node(Point3d::new(2.0, -1.0, 0.5));
        let f = store.create_node(Point3d::new(0.5, 2.0, 0.5));
        let surface_tri = store.create_triangle([d, e, f], None, TriangleKind::Surface);

        let result = establish_between(&mut store, domain_tri, surface_tri, 1e-9);
        match result {
            Ok(Some(cut_id)) => {
                let cut = store.cuts[cut_id];
                assert_eq!(cut.triangle_a, domain_tri);
                assert_eq!(cut.triangle_b, surface_tri);
                assert!(store.triangles[domain_tri].cuts.contains(&cut_id));
                assert!(store.triangles[surface_tri].cuts.contains(&cut_id));
            }
            other => panic!("expected a cut, got {other:?}"),
        }
    }
}
