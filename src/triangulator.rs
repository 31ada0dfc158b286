//! Per-triangle constrained triangulation.
//!
//! Starting from the one-subtri "whole triangle" state every [`Triangle`]
//! is created with, [`triangulate`] inserts every boundary intersection on
//! the triangle's three segments (ascending parameter order, per segment),
//! then every cut chord registered on the triangle (registration order),
//! producing a planar sub-triangulation: a list of subnodes (corners or
//! intersections) and subtris carrying a reference-area weight that sums
//! to 1 after every insertion step.
//!
//! Chord insertion here works by excising every subtri whose interior the
//! chord's open segment passes through and re-fanning the resulting hole
//! from each endpoint, rather than pairwise diagonal flips — both converge
//! on the same end state (the chord exists as a subtri edge, total weight
//! unchanged), and the re-fan is the simpler of the two to get right
//! without a full half-edge adjacency structure. See DESIGN.md for the
//! grounding.

use std::collections::HashMap;

use crate::entities::{EntityStore, IntersectionId, SubNode, SubTri, TriangleId};

/// Local 2-D reference frame for one triangle: corner 0 at the origin,
/// corner 1 at (1, 0), corner 2 at (0, 1). Every subnode position used for
/// area/side computations during triangulation is expressed in this frame;
/// it exists only for the duration of one [`triangulate`] call.
const CORNER_LOCAL: [(f64, f64); 3] = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];

fn cross2(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

fn lerp2(a: (f64, f64), b: (f64, f64), t: f64) -> (f64, f64) {
    (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))
}

/// Twice the signed area of (a, b, c) in the local frame; reference weight
/// is this divided by the reference triangle's own signed area (1.0, since
/// corners are (0,0),(1,0),(0,1)).
fn signed_area2(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    0.5 * cross2(a, b, c)
}

/// Re-triangulate one triangle from scratch: clears any prior sub-
/// triangulation and rebuilds it by inserting every segment intersection
/// and every registered cut chord, the ordering rule.
pub fn triangulate(store: &mut EntityStore, tri: TriangleId) {
    let segments = store.triangles[tri].segments;
    let cuts = store.triangles[tri].cuts.clone();

    // subnodes (mirrors store.triangles[tri].sub.subnodes) and their local
    // 2-D positions, kept in lockstep.
    let mut subnodes: Vec<SubNode> = vec![SubNode::Corner(0), SubNode::Corner(1), SubNode::Corner(2)];
    let mut local: Vec<(f64, f64)> = CORNER_LOCAL.to_vec();
    let mut subtris: Vec<SubTri> = vec![SubTri {
        nodes: [0, 1, 2],
        weight: 1.0,
    }];
    let mut by_intersection: HashMap<IntersectionId, usize> = HashMap::new();

    // --- Phase 1: boundary intersections, per segment, ascending t. ------
    for k in 0..3 {
        let seg = segments[k];
        let (seg_a, _seg_b) = {
            let s = &store.segments[seg];
            (s.node_a.unwrap(), s.node_b.unwrap())
        };
        let corner_k = store.triangles[tri].corners[k];
        let forward = corner_k == seg_a;

        let mut on_edge: Vec<(f64, IntersectionId)> = store.segments[seg]
            .intersections
            .iter()
            .copied()
            .filter(|&int_id| store.intersections[int_id].segment == seg)
            .map(|int_id| {
                let t = store.intersections[int_id].t;
                let s = if forward { t } else { 1.0 - t };
                (s, int_id)
            })
            .collect();
        on_edge.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("NaN parameter"));

        let corner_a_local = CORNER_LOCAL[k];
        let corner_b_local = CORNER_LOCAL[(k + 1) % 3];

        for (s, int_id) in on_edge {
            let point = lerp2(corner_a_local, corner_b_local, s);
            let new_idx = subnodes.len();
            subnodes.push(SubNode::Intersection(int_id));
            local.push(point);
            by_intersection.insert(int_id, new_idx);
            insert_edge_point(&mut subtris, &local, new_idx, point);
        }
    }

    // --- Phase 2: cut chords, registration order. ------------------------
    for cut_id in cuts {
        let cut = store.cuts[cut_id];
        for &int_id in &[cut.i0, cut.i1] {
            if by_intersection.contains_key(&int_id) {
                continue;
            }
            let intersection = store.intersections[int_id];
            if intersection.triangle == tri {
                // Interior point: position given directly by its barycentric
                // uvw against this triangle's own corners.
                let (u, v, w) = intersection.uvw;
                let point = (
                    u * CORNER_LOCAL[0].0 + v * CORNER_LOCAL[1].0 + w * CORNER_LOCAL[2].0,
                    u * CORNER_LOCAL[0].1 + v * CORNER_LOCAL[1].1 + w * CORNER_LOCAL[2].1,
                );
                let new_idx = subnodes.len();
                subnodes.push(SubNode::Intersection(int_id));
                local.push(point);
                by_intersection.insert(int_id, new_idx);
                insert_interior_point(&mut subtris, &local, new_idx, point);
            }
            // Otherwise this endpoint belongs to this triangle's boundary
            // but was somehow not captured in phase 1 (e.g. a segment whose
            // intersection list was appended after this triangle's segment
            // loop ran); treat it the same as an interior point using its
            // barycentric coordinates in the triangle it was computed
            // against is not possible here since it is relative to the
            // *other* triangle — this only happens for cut endpoints whose
            // `segment` is one of `tri`'s own segments, which phase 1
            // already covers by construction of `establish_between`.
        }
        let a = by_intersection[&cut.i0];
        let b = by_intersection[&cut.i1];
        insert_chord(&mut subtris, &local, a, b);
    }

    store.triangles[tri].sub.subnodes = subnodes;
    store.triangles[tri].sub.subtris = subtris;
}

/// Split whichever subtri has `(prev, next)` — the two existing subnodes
/// bracketing `point` along the original straight edge — as a side, fanning
/// the new point against that subtri's third vertex. Valid because the
/// bracketing points and the new point are collinear: splitting a straight
/// base preserves total area regardless of the apex.
fn insert_edge_point(subtris: &mut Vec<SubTri>, local: &[(f64, f64)], new_idx: usize, point: (f64, f64)) {
    let found = subtris.iter().position(|s| {
        let pts: Vec<(f64, f64)> = s.nodes.iter().map(|&n| local[n]).collect();
        s.nodes.iter().enumerate().any(|(i, _)| {
            let j = (i + 1) % 3;
            let (pa, pb) = (pts[i], pts[j]);
            on_segment(pa, pb, point)
        })
    });
    let Some(idx) = found else {
        debug_assert!(false, "edge point does not lie on any current subtri boundary");
        return;
    };
    let tri = subtris.swap_remove(idx);
    let pts: Vec<(f64, f64)> = tri.nodes.iter().map(|&n| local[n]).collect();
    let edge_i = (0..3)
        .find(|&i| on_segment(pts[i], pts[(i + 1) % 3], point))
        .expect("edge located above");
    let apex_i = (edge_i + 2) % 3;
    let (prev, next, apex) = (tri.nodes[edge_i], tri.nodes[(edge_i + 1) % 3], tri.nodes[apex_i]);
    let (p_prev, p_next, p_apex) = (local[prev], local[next], local[apex]);
    let total = signed_area2(p_prev, p_next, p_apex).abs();
    let frac = if total.abs() < 1e-300 {
        0.5
    } else {
        signed_area2(p_prev, point, p_apex).abs() / total
    };
    subtris.push(SubTri {
        nodes: [prev, new_idx, apex],
        weight: tri.weight * frac,
    });
    subtris.push(SubTri {
        nodes: [new_idx, next, apex],
        weight: tri.weight * (1.0 - frac),
    });
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let cross = cross2(a, b, p);
    if cross.abs() > 1e-9 {
        return false;
    }
    let dot = (p.0 - a.0) * (b.0 - a.0) + (p.1 - a.1) * (b.1 - a.1);
    let len2 = (b.0 - a.0).powi(2) + (b.1 - a.1).powi(2);
    dot >= -1e-9 && dot <= len2 + 1e-9
}

/// Split whichever subtri currently contains `point` in its interior into
/// three, fanning from the new point to each of its three vertices.
fn insert_interior_point(subtris: &mut Vec<SubTri>, local: &[(f64, f64)], new_idx: usize, point: (f64, f64)) {
    let found = subtris.iter().position(|s| point_in_triangle(local, s.nodes, point));
    let Some(idx) = found else {
        debug_assert!(false, "interior point not contained by any current subtri");
        return;
    };
    let tri = subtris.swap_remove(idx);
    let [n0, n1, n2] = tri.nodes;
    let (p0, p1, p2) = (local[n0], local[n1], local[n2]);
    let total = signed_area2(p0, p1, p2).abs();
    let a01 = signed_area2(p0, p1, point).abs();
    let a12 = signed_area2(p1, p2, point).abs();
    let a20 = signed_area2(p2, p0, point).abs();
    let (w01, w12, w20) = if total.abs() < 1e-300 {
        (tri.weight / 3.0, tri.weight / 3.0, tri.weight / 3.0)
    } else {
        (
            tri.weight * a01 / total,
            tri.weight * a12 / total,
            tri.weight * a20 / total,
        )
    };
    subtris.push(SubTri { nodes: [n0, n1, new_idx], weight: w01 });
    subtris.push(SubTri { nodes: [n1, n2, new_idx], weight: w12 });
    subtris.push(SubTri { nodes: [n2, n0, new_idx], weight: w20 });
}

fn point_in_triangle(local: &[(f64, f64)], nodes: [usize; 3], p: (f64, f64)) -> bool {
    let (a, b, c) = (local[nodes[0]], local[nodes[1]], local[nodes[2]]);
    let d1 = cross2(a, b, p);
    let d2 = cross2(b, c, p);
    let d3 = cross2(c, a, p);
    let has_neg = d1 < -1e-9 || d2 < -1e-9 || d3 < -1e-9;
    let has_pos = d1 > 1e-9 || d2 > 1e-9 || d3 > 1e-9;
    !(has_neg && has_pos)
}

/// Insert chord `(a, b)` as a constraint: remove every subtri whose open
/// interior the segment crosses, and re-fan the resulting polygonal hole
/// from `a`, which necessarily produces `(a, b)` as a shared edge of the two
/// subtris flanking `b` in the fan.
fn insert_chord(subtris: &mut Vec<SubTri>, local: &[(f64, f64)], a: usize, b: usize) {
    if a == b {
        return;
    }
    if subtris.iter().any(|s| has_edge(s, a, b)) {
        return;
    }
    let (pa, pb) = (local[a], local[b]);
    let dir = (pb.0 - pa.0, pb.1 - pa.1);
    let proj = |p: (f64, f64)| (p.0 - pa.0) * dir.0 + (p.1 - pa.1) * dir.1;

    let mut upper: Vec<(f64, usize)> = Vec::new();
    let mut lower: Vec<(f64, usize)> = Vec::new();
    let mut kept = Vec::with_capacity(subtris.len());
    let mut total_weight_removed = 0.0;

    for sub in subtris.drain(..) {
        if subtri_crosses_chord(local, &sub, pa, pb, a, b) {
            total_weight_removed += sub.weight;
            for &n in &sub.nodes {
                if n == a || n == b {
                    continue;
                }
                let side = cross2(pa, pb, local[n]);
                let t = proj(local[n]);
                if side >= 0.0 {
                    if !upper.iter().any(|&(_, idx)| idx == n) {
                        upper.push((t, n));
                    }
                } else if !lower.iter().any(|&(_, idx)| idx == n) {
                    lower.push((t, n));
                }
            }
        } else {
            kept.push(sub);
        }
    }
    upper.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap());
    lower.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap());

    let mut polygon: Vec<usize> = Vec::with_capacity(upper.len() + lower.len() + 2);
    polygon.push(a);
    polygon.extend(upper.iter().map(|&(_, idx)| idx));
    polygon.push(b);
    polygon.extend(lower.iter().rev().map(|&(_, idx)| idx));

    let mut fanned = Vec::new();
    let mut fanned_weight = 0.0;
    for i in 1..polygon.len() - 1 {
        let (n1, n2) = (polygon[i], polygon[i + 1]);
        let area = signed_area2(local[a], local[n1], local[n2]).abs();
        fanned_weight += area;
        fanned.push((n1, n2, area));
    }
    let scale = if fanned_weight.abs() < 1e-300 {
        0.0
    } else {
        total_weight_removed / fanned_weight
    };
    for (n1, n2, area) in fanned {
        kept.push(SubTri {
            nodes: [a, n1, n2],
            weight: area * scale,
        });
    }
    *subtris = kept;
}

fn has_edge(sub: &SubTri, a: usize, b: usize) -> bool {
    let n = sub.nodes;
    (n[0] == a && n[1] == b)
        || (n[1] == a && n[0] == b)
        || (n[1] == a && n[2] == b)
        || (n[2] == a && n[1] == b)
        || (n[2] == a && n[0] == b)
        || (n[0] == a && n[2] == b)
}

/// A subtri is touched by the chord if at least one of its vertices (other
/// than the chord's own endpoints) is strictly on the line through `(a, b)`
/// within the subtri's footprint, detected here via: the subtri has a
/// vertex on each side of the infinite line through `(pa, pb)`, and is not
/// entirely beyond either endpoint along the chord direction.
fn subtri_crosses_chord(
    local: &[(f64, f64)],
    sub: &SubTri,
    pa: (f64, f64),
    pb: (f64, f64),
    a: usize,
    b: usize,
) -> bool {
    if sub.nodes.contains(&a) || sub.nodes.contains(&b) {
        // Touches an endpoint directly: still part of the affected region
        // unless the subtri lies entirely on one side (i.e. is unrelated,
        // sharing only the vertex by coincidence of triangulation order).
        let others: Vec<usize> = sub.nodes.iter().copied().filter(|&n| n != a && n != b).collect();
        if others.is_empty() {
            return true;
        }
        return others.iter().any(|&n| {
            let t = {
                let dir = (pb.0 - pa.0, pb.1 - pa.1);
                (local[n].0 - pa.0) * dir.0 + (local[n].1 - pa.1) * dir.1
            };
            let len2 = (pb.0 - pa.0).powi(2) + (pb.1 - pa.1).powi(2);
            t > -1e-9 && t < len2 + 1e-9
        });
    }
    let signs: Vec<f64> = sub.nodes.iter().map(|&n| cross2(pa, pb, local[n])).collect();
    let has_pos = signs.iter().any(|&s| s > 1e-9);
    let has_neg = signs.iter().any(|&s| s < -1e-9);
    has_pos && has_neg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{establish_between, TriangleKind};
    use crate::geometry::point::Point3d;

    #[test]
    fn test_triangulate_no_cuts_is_single_whole_subtri() {
        let mut store = EntityStore::new();
        let a = store.create_node(Point3d::new(0.0, 0.0, 0.0));
        let b = store.create_node(Point3d::new(1.0, 0.0, 0.0));
        let c = store.create_node(Point3d::new(0.0, 1.0, 0.0));
        let tri = store.create_triangle([a, b, c], None, TriangleKind::DualBoundary);
        triangulate(&mut store, tri);
        let sub = &store.triangles[tri].sub;
        assert_eq!(sub.subtris.len(), 1);
        assert!((sub.total_weight() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_triangulate_with_cut_preserves_weight_sum() {
        let mut store = EntityStore::new();
        // One face of the unit tet (0,0,0),(1,0,0),(0,1,0),(0,0,1).
        let a = store.create_node(Point3d::new(0.0, 0.0, 0.0));
        let b = store.create_node(Point3d::new(1.0, 0.0, 0.0));
        let c = store.create_node(Point3d::new(0.0, 0.0, 1.0));
        let domain_tri = store.create_triangle([a, b, c], None, TriangleKind::DualBoundary);

        // Horizontal cutter plane z=0.5, wide enough to cover the face.
        let d = store.create_node(Point3d::new(-1.0, -1.0, 0.5));
        let e = store.create_node(Point3d::new(2.0, -1.0, 0.5));
        let f = store.create_node(Point3d::new(0.5, 2.0, 0.5));
        let surface_tri = store.create_triangle([d, e, f], None, TriangleKind::Surface);

        establish_between(&mut store, domain_tri, surface_tri, 1e-9)
            .expect("classification should not error")
            .expect("expected a cut");

        triangulate(&mut store, domain_tri);
        triangulate(&mut store, surface_tri);

        let domain_sub = &store.triangles[domain_tri].sub;
        assert!((domain_sub.total_weight() - 1.0).abs() < 1e-9);
        assert!(domain_sub.subtris.len() >= 2);

        let surface_sub = &store.triangles[surface_tri].sub;
        assert!((surface_sub.total_weight() - 1.0).abs() < 1e-9);
    }
}
