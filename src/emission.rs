//! The emission interface: for each poly, its region count, per-region
//! centroid/volume, and the active sub-triangle fragments (boundary and
//! cutting-surface) with enough provenance for an external exporter to
//! reconstruct geometry and trace surface sensitivity back to the
//! originating surface triangle/intersection. This module produces data
//! only — it writes nothing to disk and knows nothing about any file
//! format.

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::entities::{EntityStore, SubNode};
use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;
use crate::mask::Mask;
use crate::poly::{Poly, Topology};

/// One intersection bounding an active surface sub-triangle, described well
/// enough for an external caller to re-derive sensitivity without walking
/// this crate's own arena: the parameter/barycentric pair plus, when the
/// intersection's segment belongs to the cutting surface itself, the
/// external node ids of that segment's two endpoints (via
/// `Surface::node_index`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionDescriptor {
    pub t: f64,
    pub uvw: (f64, f64, f64),
    pub surface_segment_nodes: Option<(usize, usize)>,
}

/// One active sub-triangle of a median-dual boundary mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryFragment {
    pub xyz: [Point3d; 3],
    pub area: f64,
    pub normal: Vec3,
    pub face_tag: Option<u32>,
    pub region: u32,
}

/// One active sub-triangle of a cutting-surface mask gathered into a poly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceFragment {
    pub xyz: [Point3d; 3],
    pub area: f64,
    pub normal: Vec3,
    pub region: u32,
    /// External surface-triangle index (`Surface::triangle_index`) this
    /// fragment's parent triangle came from.
    pub parent_triangle: Option<usize>,
    pub parent_intersections: Vec<IntersectionDescriptor>,
}

/// Centroid/volume of one connected region within a poly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: u32,
    pub centroid: Point3d,
    pub volume: f64,
}

/// The full structured emission for one poly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolyEmission {
    pub region_count: usize,
    pub regions: Vec<RegionSummary>,
    pub boundary_fragments: Vec<BoundaryFragment>,
    pub surface_fragments: Vec<SurfaceFragment>,
}

/// Build the emission for `poly`. An `Interior` poly was never painted (no
/// cut ever touched it), so its boundary masks carry no active/region
/// state; this walks every subtri of every boundary mask as a single
/// region 1 instead — the emission of an uncut dual is just the whole
/// boundary. `Exterior` and `Ghost` polys emit nothing — the exterior is
/// deactivated, and ghost polys (outside the local partition) are never
/// emitted.
pub(crate) fn emit(domain: &Domain<'_>, poly: &Poly) -> PolyEmission {
    let store = domain.store();

    match poly.topology {
        Topology::Exterior | Topology::Ghost => {
            return PolyEmission::default();
        }
        Topology::Interior => {
            let mut boundary_fragments = Vec::new();
            for mask in &poly.boundary {
                collect_boundary_whole(store, mask, &mut boundary_fragments);
            }
            let (centroid, volume) = whole_centroid_volume(store, &poly.boundary);
            return PolyEmission {
                region_count: 1,
                regions: vec![RegionSummary { region: 1, centroid, volume }],
                boundary_fragments,
                surface_fragments: Vec::new(),
            };
        }
        Topology::Cut => {}
    }

    let mut boundary_fragments = Vec::new();
    for mask in &poly.boundary {
        collect_boundary(store, mask, &mut boundary_fragments);
    }
    let mut surface_fragments = Vec::new();
    for mask in &poly.surf {
        collect_surface(domain, store, mask, &mut surface_fragments);
    }
    let regions = (1..=poly.region_count as u32)
        .map(|r| {
            let (centroid, volume) = poly.centroid_volume(store, r, Point3d::ORIGIN);
            RegionSummary { region: r, centroid, volume }
        })
        .collect();

    PolyEmission {
        region_count: poly.region_count,
        regions,
        boundary_fragments,
        surface_fragments,
    }
}

fn collect_boundary(store: &EntityStore, mask: &Mask, out: &mut Vec<BoundaryFragment>) {
    let triangle = &store.triangles[mask.triangle];
    let area_total = store.triangle_area(mask.triangle);
    let normal = oriented_normal(store, mask);
    for (i, subtri) in triangle.sub.subtris.iter().enumerate() {
        if !mask.active[i] {
            continue;
        }
        out.push(BoundaryFragment {
            xyz: store.subtri_points(mask.triangle, i),
            area: area_total * subtri.weight,
            normal,
            face_tag: triangle.face_tag,
            region: mask.region[i],
        });
    }
}

fn collect_boundary_whole(store: &EntityStore, mask: &Mask, out: &mut Vec<BoundaryFragment>) {
    let triangle = &store.triangles[mask.triangle];
    let area_total = store.triangle_area(mask.triangle);
    let normal = oriented_normal(store, mask);
    for (i, subtri) in triangle.sub.subtris.iter().enumerate() {
        out.push(BoundaryFragment {
            xyz: store.subtri_points(mask.triangle, i),
            area: area_total * subtri.weight,
            normal,
            face_tag: triangle.face_tag,
            region: 1,
        });
    }
}

fn collect_surface(domain: &Domain<'_>, store: &EntityStore, mask: &Mask, out: &mut Vec<SurfaceFragment>) {
    let triangle = &store.triangles[mask.triangle];
    let parent_triangle = domain.external_surface_triangle(mask.triangle);
    let area_total = store.triangle_area(mask.triangle);
    let normal = oriented_normal(store, mask);
    for (i, subtri) in triangle.sub.subtris.iter().enumerate() {
        if !mask.active[i] {
            continue;
        }
        let mut parent_intersections = Vec::new();
        for &node_idx in &subtri.nodes {
            if let SubNode::Intersection(int_id) = triangle.sub.subnodes[node_idx] {
                let intersection = &store.intersections[int_id];
                let segment = &store.segments[intersection.segment];
                let surface_segment_nodes = segment.node_a.zip(segment.node_b).and_then(|(a, b)| {
                    Some((domain.external_surface_node(a)?, domain.external_surface_node(b)?))
                });
                parent_intersections.push(IntersectionDescriptor {
                    t: intersection.t,
                    uvw: intersection.uvw,
                    surface_segment_nodes,
                });
            }
        }
        out.push(SurfaceFragment {
            xyz: store.subtri_points(mask.triangle, i),
            area: area_total * subtri.weight,
            normal,
            region: mask.region[i],
            parent_triangle,
            parent_intersections,
        });
    }
}

fn oriented_normal(store: &EntityStore, mask: &Mask) -> Vec3 {
    let normal = store.triangle_normal(mask.triangle);
    if mask.inward {
        -normal
    } else {
        normal
    }
}

/// Centroid/volume over every subtri of an uncut poly's boundary masks
/// (every subtri counts, since nothing was painted inactive).
fn whole_centroid_volume(store: &EntityStore, boundary: &[Mask]) -> (Point3d, f64) {
    let mut volume = 0.0;
    let mut weighted = Vec3::ZERO;
    let mut centers_sum = Vec3::ZERO;
    let mut centers_count = 0usize;
    for mask in boundary {
        let subtris = &store.triangles[mask.triangle].sub.subtris;
        for i in 0..subtris.len() {
            let pts = store.subtri_points(mask.triangle, i);
            let mut contrib = crate::geometry::volume::volume6(pts[0], pts[1], pts[2], Point3d::ORIGIN) / 6.0;
            if mask.inward {
                contrib = -contrib;
            }
            volume += contrib;
            let centroid = store.subtri_centroid(mask.triangle, i);
            weighted = weighted + centroid.to_vec3() * contrib;
            centers_sum = centers_sum + centroid.to_vec3();
            centers_count += 1;
        }
    }
    if volume.abs() < 1e-14 {
        if centers_count == 0 {
            return (Point3d::ORIGIN, 0.0);
        }
        let avg = centers_sum / (centers_count as f64);
        return (Point3d::from_array(avg.to_array()), volume);
    }
    (Point3d::from_array((weighted / volume).to_array()), volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::domain::{Lookup, Primal, Surface};

    struct UnitTetPrimal;
    const TET_FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 2, 3], [0, 1, 3], [0, 1, 2]];
    const TET_EDGES: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];
    const TET_PTS: [(f64, f64, f64); 4] =
        [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (0.0, 0.0, 1.0)];

    impl Primal for UnitTetPrimal {
        fn ncell(&self) -> usize {
            1
        }
        fn ntri(&self) -> usize {
            4
        }
        fn nedge(&self) -> usize {
            6
        }
        fn nface(&self) -> usize {
            4
        }
        fn nnode(&self) -> usize {
            4
        }
        fn nnode0(&self) -> usize {
            4
        }
        fn cell(&self, _i: usize) -> [usize; 4] {
            [0, 1, 2, 3]
        }
        fn tri(&self, i: usize) -> [usize; 3] {
            TET_FACES[i]
        }
        fn edge(&self, i: usize) -> [usize; 2] {
            TET_EDGES[i]
        }
        fn face(&self, i: usize) -> ([usize; 3], Option<u32>) {
            (self.tri(i), Some(i as u32))
        }
        fn xyz(&self, node: usize) -> (f64, f64, f64) {
            TET_PTS[node]
        }
        fn c2t(&self, _cell: usize, side: usize) -> Lookup {
            Lookup::Found(side)
        }
        fn c2e(&self, _cell: usize, _slot: usize) -> Lookup {
            Lookup::NotFound
        }
        fn find_edge(&self, _n0: usize, _n1: usize) -> Lookup {
            Lookup::NotFound
        }
        fn find_tri(&self, _nodes: [usize; 3]) -> Lookup {
            Lookup::NotFound
        }
        fn find_face_side(&self, _cell: usize, _face_nodes: [usize; 3]) -> Lookup {
            Lookup::NotFound
        }
        fn find_tri_side(&self, _cell: usize, _tri_nodes: [usize; 3]) -> Lookup {
            Lookup::NotFound
        }
        fn find_cell_side(&self, _cell: usize, _neighbour: usize) -> Lookup {
            Lookup::NotFound
        }
        fn cells_by_node(&self, _node: usize) -> Vec<usize> {
            vec![0]
        }
        fn faces_by_node(&self, node: usize) -> Vec<usize> {
            (0..4).filter(|&f| self.tri(f).contains(&node)).collect()
        }
    }

    struct FlatTriangleSurface {
        pts: [(f64, f64, f64); 3],
    }

    impl Surface for FlatTriangleSurface {
        fn ntriangle(&self) -> usize {
            1
        }
        fn nsegment(&self) -> usize {
            3
        }
        fn nnode(&self) -> usize {
            3
        }
        fn triangle(&self, _i: usize) -> [usize; 3] {
            [0, 1, 2]
        }
        fn segment(&self, i: usize) -> [usize; 2] {
            [i, (i + 1) % 3]
        }
        fn node(&self, i: usize) -> (f64, f64, f64) {
            self.pts[i]
        }
        fn node_index(&self, node: usize) -> usize {
            node
        }
        fn triangle_index(&self, tri: usize) -> usize {
            tri
        }
    }

    #[test]
    fn test_emit_missed_surface_yields_whole_uncut_boundary() {
        let primal = UnitTetPrimal;
        let surface = FlatTriangleSurface {
            pts: [(-10.0, -10.0, 5.0), (10.0, -10.0, 5.0), (0.0, 10.0, 5.0)],
        };
        let mut domain = Domain::new(&primal, &surface, PipelineConfig::default());
        domain.run().unwrap();

        let emission = domain.emit_poly(0).expect("poly 0 exists");
        assert_eq!(emission.region_count, 1);
        assert!(emission.surface_fragments.is_empty());
        assert!(!emission.boundary_fragments.is_empty());
        assert!(emission.boundary_fragments.iter().all(|f| f.region == 1));
    }

    #[test]
    fn test_emit_cut_poly_surface_fragments_carry_parent_triangle() {
        let primal = UnitTetPrimal;
        let surface = FlatTriangleSurface {
            pts: [(-1.0, -1.0, 0.5), (2.0, -1.0, 0.5), (0.5, 2.0, 0.5)],
        };
        let mut domain = Domain::new(&primal, &surface, PipelineConfig::default());
        domain.run().unwrap();

        let cut_node = (0..4).find(|&n| domain.poly(n).unwrap().topology == Topology::Cut).unwrap();
        let emission = domain.emit_poly(cut_node).unwrap();
        assert!(emission.region_count >= 1);
        for frag in &emission.surface_fragments {
            assert_eq!(frag.parent_triangle, Some(0));
        }
    }
}
