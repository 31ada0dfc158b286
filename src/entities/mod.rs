//! The Node/Segment/Triangle entity graph and Cut establishment. Cyclic
//! references (segment<->triangle, intersection<->triangle+segment,
//! cut<->two triangles) are broken by storing every entity in a per-
//! [`EntityStore`] `slotmap::SlotMap` arena and referencing other entities
//! by key rather than by pointer or `Rc`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;

pub mod cut;
pub use cut::establish_between;

new_key_type! {
    pub struct NodeId;
    pub struct SegmentId;
    pub struct TriangleId;
    pub struct IntersectionId;
    pub struct CutId;
    pub struct PolyId;
}

/// A 3-D point, immutable after creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Node {
    pub point: Point3d,
}

/// An ordered pair of nodes. Owns its intersection list in insertion order;
/// `triangles` is a back-reference, not ownership.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Segment {
    pub node_a: Option<NodeId>,
    pub node_b: Option<NodeId>,
    pub intersections: Vec<IntersectionId>,
    pub triangles: Vec<TriangleId>,
}

impl Segment {
    fn new(node_a: NodeId, node_b: NodeId) -> Self {
        Self {
            node_a: Some(node_a),
            node_b: Some(node_b),
            intersections: Vec::new(),
            triangles: Vec::new(),
        }
    }
}

/// Reference held by a subnode: either one of the triangle's three corners
/// or an intersection created by cut establishment (component E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubNode {
    Corner(u8),
    Intersection(IntersectionId),
}

/// One sub-triangle of a triangle's sub-triangulation: three subnode
/// indices (into `SubTriangulation::subnodes`) plus a reference-area weight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubTri {
    pub nodes: [usize; 3],
    /// Planar area of this subtri divided by the parent triangle's area.
    /// Sums to 1 over all subtris of a triangle.
    pub weight: f64,
}

/// A triangle's planar sub-triangulation, produced by component F.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTriangulation {
    pub subnodes: Vec<SubNode>,
    pub subtris: Vec<SubTri>,
}

impl SubTriangulation {
    /// The initial one-subtri state before any intersection or cut is
    /// inserted: the whole triangle, weight 1.
    fn whole_triangle() -> Self {
        Self {
            subnodes: vec![SubNode::Corner(0), SubNode::Corner(1), SubNode::Corner(2)],
            subtris: vec![SubTri { nodes: [0, 1, 2], weight: 1.0 }],
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.subtris.iter().map(|s| s.weight).sum()
    }
}

/// Which side of the cut pipeline a triangle came from. Distinguishes the
/// median-dual boundary (one triangle per `Mask` in a `Poly`'s boundary
/// list) from the cutting surface (gathered into `Poly::surf`), so adjacency
/// lookups (e.g. the cutting surface's own triangle-to-triangle walk used by
/// region gathering) never cross into the dual mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriangleKind {
    DualBoundary,
    Surface,
}

/// Three segments in order, an optional boundary-face tag, a cut list, and
/// a sub-triangulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Triangle {
    pub corners: [NodeId; 3],
    pub segments: [SegmentId; 3],
    /// `None` for interior dual triangles.
    pub face_tag: Option<u32>,
    pub kind: TriangleKind,
    pub cuts: Vec<CutId>,
    pub sub: SubTriangulation,
}

impl Triangle {
    fn new(
        corners: [NodeId; 3],
        segments: [SegmentId; 3],
        face_tag: Option<u32>,
        kind: TriangleKind,
    ) -> Self {
        Self {
            corners,
            segments,
            face_tag,
            kind,
            cuts: Vec::new(),
            sub: SubTriangulation::whole_triangle(),
        }
    }
}

/// Pairing (triangle T, segment S, parameter t along S, barycentric uvw in
/// T). Created only when component B returns a hit; shared-immutable
/// between S's intersection list and T's reference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Intersection {
    pub triangle: TriangleId,
    pub segment: SegmentId,
    pub t: f64,
    pub uvw: (f64, f64, f64),
}

/// Ordered pair of intersections shared by two crossing triangles.
/// Appended to both triangles' cut lists on creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cut {
    pub i0: IntersectionId,
    pub i1: IntersectionId,
    pub triangle_a: TriangleId,
    pub triangle_b: TriangleId,
}

/// Arena owning every Node/Segment/Triangle/Intersection/Cut for one
/// [`crate::domain::Domain`] instance. Segments are deduplicated via an
/// adjacency lookup keyed by the pair of endpoint node ids.
#[derive(Debug, Default)]
pub struct EntityStore {
    pub nodes: SlotMap<NodeId, Node>,
    pub segments: SlotMap<SegmentId, Segment>,
    pub triangles: SlotMap<TriangleId, Triangle>,
    pub intersections: SlotMap<IntersectionId, Intersection>,
    pub cuts: SlotMap<CutId, Cut>,
    segment_lookup: HashMap<(NodeId, NodeId), SegmentId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_node(&mut self, point: Point3d) -> NodeId {
        self.nodes.insert(Node { point })
    }

    /// Return the existing segment between `a` and `b` if one was already
    /// created, otherwise create and register a new one under both
    /// orderings of the key.
    pub fn get_or_create_segment(&mut self, a: NodeId, b: NodeId) -> SegmentId {
        if let Some(&id) = self.segment_lookup.get(&(a, b)) {
            return id;
        }
        let id = self.segments.insert(Segment::new(a, b));
        self.segment_lookup.insert((a, b), id);
        self.segment_lookup.insert((b, a), id);
        id
    }

    pub fn create_triangle(
        &mut self,
        corners: [NodeId; 3],
        face_tag: Option<u32>,
        kind: TriangleKind,
    ) -> TriangleId {
        let segments = [
            self.get_or_create_segment(corners[0], corners[1]),
            self.get_or_create_segment(corners[1], corners[2]),
            self.get_or_create_segment(corners[2], corners[0]),
        ];
        let id = self
            .triangles
            .insert(Triangle::new(corners, segments, face_tag, kind));
        for seg in segments {
            self.segments[seg].triangles.push(id);
        }
        id
    }

    pub fn triangle_vertices(&self, tri: TriangleId) -> [Point3d; 3] {
        let t = &self.triangles[tri];
        [
            self.nodes[t.corners[0]].point,
            self.nodes[t.corners[1]].point,
            self.nodes[t.corners[2]].point,
        ]
    }

    /// Real-world area of the triangle's three corners, used to turn the
    /// triangulator's reference-area weights into absolute
    /// areas during emission.
    pub fn triangle_area(&self, tri: TriangleId) -> f64 {
        let v = self.triangle_vertices(tri);
        0.5 * (v[1] - v[0]).cross(&(v[2] - v[0])).length()
    }

    /// Outward-facing (corner-winding) unit normal of the triangle's plane.
    pub fn triangle_normal(&self, tri: TriangleId) -> Vec3 {
        let v = self.triangle_vertices(tri);
        (v[1] - v[0]).cross(&(v[2] - v[0])).normalize()
    }

    pub fn segment_endpoints(&self, seg: SegmentId) -> (Point3d, Point3d) {
        let s = &self.segments[seg];
        (
            self.nodes[s.node_a.expect("segment missing node_a")].point,
            self.nodes[s.node_b.expect("segment missing node_b")].point,
        )
    }

    /// The other triangle sharing `segment` with `tri`, if any — every
    /// non-boundary segment is referenced by exactly two triangles.
    pub fn segment_other_triangle(&self, segment: SegmentId, tri: TriangleId) -> Option<TriangleId> {
        self.segments[segment]
            .triangles
            .iter()
            .copied()
            .find(|&t| t != tri)
    }

    /// World-space points of one subtri of `tri`'s sub-triangulation.
    pub fn subtri_points(&self, tri: TriangleId, subtri_idx: usize) -> [Point3d; 3] {
        let nodes = self.triangles[tri].sub.subtris[subtri_idx].nodes;
        [
            self.subnode_point(tri, self.triangles[tri].sub.subnodes[nodes[0]]),
            self.subnode_point(tri, self.triangles[tri].sub.subnodes[nodes[1]]),
            self.subnode_point(tri, self.triangles[tri].sub.subnodes[nodes[2]]),
        ]
    }

    /// Centroid (plain vertex average) of one subtri of `tri`.
    pub fn subtri_centroid(&self, tri: TriangleId, subtri_idx: usize) -> Point3d {
        let p = self.subtri_points(tri, subtri_idx);
        Point3d::new(
            (p[0].x + p[1].x + p[2].x) / 3.0,
            (p[0].y + p[1].y + p[2].y) / 3.0,
            (p[0].z + p[1].z + p[2].z) / 3.0,
        )
    }

    /// Resolve a subnode reference within `tri` to a world-space point.
    pub fn subnode_point(&self, tri: TriangleId, subnode: SubNode) -> Point3d {
        match subnode {
            SubNode::Corner(i) => self.triangle_vertices(tri)[i as usize],
            SubNode::Intersection(int_id) => {
                let intersection = &self.intersections[int_id];
                let verts = self.triangle_vertices(intersection.triangle);
                let (u, v, w) = intersection.uvw;
                Point3d::new(
                    u * verts[0].x + v * verts[1].x + w * verts[2].x,
                    u * verts[0].y + v * verts[1].y + w * verts[2].y,
                    u * verts[0].z + v * verts[1].z + w * verts[2].z,
                )
            }
        }
    }

    /// Register an intersection: append to the segment's ordered list and
    /// stamp it onto the triangle's incoming reference (the triangle side
    /// is a read, not ownership — the triangle never stores the id itself
    /// outside of a [`Cut`]).
    pub fn create_intersection(
        &mut self,
        triangle: TriangleId,
        segment: SegmentId,
        t: f64,
        uvw: (f64, f64, f64),
    ) -> IntersectionId {
        let id = self.intersections.insert(Intersection { triangle, segment, t, uvw });
        self.segments[segment].intersections.push(id);
        id
    }

    /// Create a cut between `i0` and `i1` and append it to both triangles'
    /// cut lists.
    pub fn create_cut(
        &mut self,
        i0: IntersectionId,
        i1: IntersectionId,
        triangle_a: TriangleId,
        triangle_b: TriangleId,
    ) -> CutId {
        let id = self.cuts.insert(Cut { i0, i1, triangle_a, triangle_b });
        self.triangles[triangle_a].cuts.push(id);
        self.triangles[triangle_b].cuts.push(id);
        id
    }
}
