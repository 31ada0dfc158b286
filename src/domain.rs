//! Domain — the pipeline driver.
//!
//! Drives dual-entity construction from a read-only primal-mesh interface,
//! builds the near-tree over a read-only cutting-surface interface, runs
//! cut establishment and triangulation, paints every cut poly, and sweeps
//! topology to a fixed point. One struct owning the arena plus collaborator
//! references, one `#[instrument]`-able entry point, structured `tracing`
//! at every stage transition.

use std::collections::HashMap;

use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::entities::{establish_between, EntityStore, NodeId, PolyId, TriangleId, TriangleKind};
use crate::error::DomainError;
use crate::geometry::bounds::BoundingBox;
use crate::geometry::point::Point3d;
use crate::poly::{Poly, Topology};
use crate::spatial::neartree::NearTree;
use crate::triangulator::triangulate;

/// Outcome of an adjacency lookup on the primal mesh: each accessor
/// returns success or a `NotFound` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(usize),
    NotFound,
}

/// Read-only primal-mesh interface consumed by `Domain`.
pub trait Primal {
    fn ncell(&self) -> usize;
    fn ntri(&self) -> usize;
    fn nedge(&self) -> usize;
    fn nface(&self) -> usize;
    fn nnode(&self) -> usize;
    /// Size of the local partition; nodes beyond this are ghost.
    fn nnode0(&self) -> usize;

    fn cell(&self, i: usize) -> [usize; 4];
    fn tri(&self, i: usize) -> [usize; 3];
    fn edge(&self, i: usize) -> [usize; 2];
    /// Face corners plus its face-id tag (`None` for an interior face).
    fn face(&self, i: usize) -> ([usize; 3], Option<u32>);
    fn xyz(&self, node: usize) -> (f64, f64, f64);

    fn c2t(&self, cell: usize, side: usize) -> Lookup;
    fn c2e(&self, cell: usize, slot: usize) -> Lookup;
    fn find_edge(&self, n0: usize, n1: usize) -> Lookup;
    fn find_tri(&self, nodes: [usize; 3]) -> Lookup;
    fn find_face_side(&self, cell: usize, face_nodes: [usize; 3]) -> Lookup;
    fn find_tri_side(&self, cell: usize, tri_nodes: [usize; 3]) -> Lookup;
    fn find_cell_side(&self, cell: usize, neighbour: usize) -> Lookup;

    fn cells_by_node(&self, node: usize) -> Vec<usize>;
    fn faces_by_node(&self, node: usize) -> Vec<usize>;
}

/// Read-only cutting-surface interface consumed by `Domain`.
pub trait Surface {
    fn ntriangle(&self) -> usize;
    fn nsegment(&self) -> usize;
    fn nnode(&self) -> usize;

    fn triangle(&self, i: usize) -> [usize; 3];
    fn segment(&self, i: usize) -> [usize; 2];
    fn node(&self, i: usize) -> (f64, f64, f64);

    /// External node id used when reporting intersection descriptors during
    /// emission.
    fn node_index(&self, node: usize) -> usize;
    fn triangle_index(&self, tri: usize) -> usize;
}

/// Key for lazy-with-caching dual-point allocation: cell centroids, face
/// centroids, and edge midpoints are each allocated as a dual `Node` on
/// first reference and cached thereafter, rather than eagerly building a
/// full dual mesh up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DualPointKey {
    CellCentroid(usize),
    FaceCentroid(usize, usize),
    EdgeMidpoint(usize, usize),
    PrimalNode(usize),
}

/// The cut-cell pipeline driver. Owns a single `EntityStore` shared by both
/// the dual mesh and the cutting surface, one `Poly` per
/// elected primal node, and the near-tree built once over the cutting
/// surface.
pub struct Domain<'a> {
    primal: &'a dyn Primal,
    surface: &'a dyn Surface,
    config: PipelineConfig,
    store: EntityStore,
    dual_points: HashMap<DualPointKey, NodeId>,
    surface_nodes: Vec<NodeId>,
    surface_triangles: Vec<TriangleId>,
    polys: HashMap<usize, Poly>,
    near_tree: NearTree,
    /// Reverse lookup from an arena node/triangle back to the external
    /// surface index the `Surface` interface addressed it by, consulted
    /// only during emission (`crate::emission`) when reporting parent
    /// triangle ids and intersection descriptors.
    surface_node_index: HashMap<NodeId, usize>,
    surface_triangle_index: HashMap<TriangleId, usize>,
}

impl<'a> Domain<'a> {
    pub fn new(primal: &'a dyn Primal, surface: &'a dyn Surface, config: PipelineConfig) -> Self {
        Self {
            primal,
            surface,
            config,
            store: EntityStore::new(),
            dual_points: HashMap::new(),
            surface_nodes: Vec::new(),
            surface_triangles: Vec::new(),
            polys: HashMap::new(),
            near_tree: NearTree::new(),
            surface_node_index: HashMap::new(),
            surface_triangle_index: HashMap::new(),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn poly(&self, primal_node: usize) -> Option<&Poly> {
        self.polys.get(&primal_node)
    }

    pub fn surface(&self) -> &'a dyn Surface {
        self.surface
    }

    /// External surface index (the `i` the `Surface` interface addressed a
    /// node by) for an arena node, if it came from the cutting surface.
    pub(crate) fn external_surface_node(&self, node: NodeId) -> Option<usize> {
        self.surface_node_index.get(&node).copied()
    }

    /// External surface index for an arena triangle, if it came from the
    /// cutting surface.
    pub(crate) fn external_surface_triangle(&self, tri: TriangleId) -> Option<usize> {
        self.surface_triangle_index.get(&tri).copied()
    }

    /// Structured per-poly emission: region summaries, active boundary
    /// sub-triangles, and active surface sub-triangles with
    /// parent-triangle/intersection provenance. `None` if no poly was ever
    /// created at `primal_node`.
    pub fn emit_poly(&self, primal_node: usize) -> Option<crate::emission::PolyEmission> {
        let poly = self.polys.get(&primal_node)?;
        Some(crate::emission::emit(self, poly))
    }

    /// Directed-area contributions for every primal edge incident to
    /// `primal_node`, keyed by the neighbour node at the other end of the
    /// edge.
    pub fn directed_areas(&self, primal_node: usize) -> Vec<(usize, crate::geometry::vector::Vec3)> {
        let Some(poly) = self.polys.get(&primal_node) else { return Vec::new() };
        let mut out = Vec::new();
        for edge_idx in 0..self.primal.nedge() {
            let [n0, n1] = self.primal.edge(edge_idx);
            let other = if n0 == primal_node {
                n1
            } else if n1 == primal_node {
                n0
            } else {
                continue;
            };
            let (lo, hi) = if n0 < n1 { (n0, n1) } else { (n1, n0) };
            if let Some(&mid) = self.dual_points.get(&DualPointKey::EdgeMidpoint(lo, hi)) {
                out.push((other, poly.directed_area_about_node(&self.store, mid)));
            }
        }
        out
    }

    fn dual_node(&mut self, key: DualPointKey, point: Point3d) -> NodeId {
        if let Some(&id) = self.dual_points.get(&key) {
            return id;
        }
        let id = self.store.create_node(point);
        self.dual_points.insert(key, id);
        id
    }

    fn centroid(points: &[Point3d]) -> Point3d {
        let n = points.len() as f64;
        let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
        for p in points {
            x += p.x;
            y += p.y;
            z += p.z;
        }
        Point3d::new(x / n, y / n, z / n)
    }

    /// Build the median-dual boundary triangles for every cell in the
    /// primal mesh. For each tet cell and each of its 4 faces (p, q, r), the wedge
    /// nearest vertex p is the two triangles (cell_centroid, mid(p,q),
    /// face_centroid) and (cell_centroid, face_centroid, mid(r,p)); summed
    /// over every incident cell/face, these tile the closed boundary of the
    /// median dual polyhedron around p.
    #[instrument(skip(self))]
    fn build_dual_boundary(&mut self) {
        const FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 2, 3], [0, 1, 3], [0, 1, 2]];

        for cell_idx in 0..self.primal.ncell() {
            let cell = self.primal.cell(cell_idx);
            let cell_points: Vec<Point3d> = cell
                .iter()
                .map(|&n| {
                    let (x, y, z) = self.primal.xyz(n);
                    Point3d::new(x, y, z)
                })
                .collect();
            let cell_centroid = Self::centroid(&cell_points);
            let cell_centroid_id = self.dual_node(DualPointKey::CellCentroid(cell_idx), cell_centroid);

            for (face_slot, face_locals) in FACES.iter().enumerate() {
                let face_global: [usize; 3] = [
                    cell[face_locals[0]],
                    cell[face_locals[1]],
                    cell[face_locals[2]],
                ];
                let face_points: Vec<Point3d> = face_global
                    .iter()
                    .map(|&n| {
                        let (x, y, z) = self.primal.xyz(n);
                        Point3d::new(x, y, z)
                    })
                    .collect();
                let face_centroid = Self::centroid(&face_points);
                let face_centroid_id =
                    self.dual_node(DualPointKey::FaceCentroid(cell_idx, face_slot), face_centroid);

                for i in 0..3 {
                    let p = face_global[i];
                    let q = face_global[(i + 1) % 3];
                    let r = face_global[(i + 2) % 3];

                    let (px, py, pz) = self.primal.xyz(p);
                    let (qx, qy, qz) = self.primal.xyz(q);
                    let (rx, ry, rz) = self.primal.xyz(r);
                    let p_pt = Point3d::new(px, py, pz);
                    let q_pt = Point3d::new(qx, qy, qz);
                    let r_pt = Point3d::new(rx, ry, rz);

                    let (lo_pq, hi_pq) = if p < q { (p, q) } else { (q, p) };
                    let mid_pq = self.dual_node(
                        DualPointKey::EdgeMidpoint(lo_pq, hi_pq),
                        p_pt.midpoint(&q_pt),
                    );
                    let (lo_rp, hi_rp) = if r < p { (r, p) } else { (p, r) };
                    let mid_rp = self.dual_node(
                        DualPointKey::EdgeMidpoint(lo_rp, hi_rp),
                        r_pt.midpoint(&p_pt),
                    );

                    let t0 = self.store.create_triangle(
                        [cell_centroid_id, mid_pq, face_centroid_id],
                        None,
                        TriangleKind::DualBoundary,
                    );
                    let t1 = self.store.create_triangle(
                        [cell_centroid_id, face_centroid_id, mid_rp],
                        None,
                        TriangleKind::DualBoundary,
                    );

                    let poly = self.polys.entry(p).or_insert_with(|| Poly::new(PolyId::default()));
                    poly.push_boundary_mask(crate::mask::Mask::new(&self.store, t0, false));
                    poly.push_boundary_mask(crate::mask::Mask::new(&self.store, t1, false));
                }
            }
        }
    }

    /// Import every cutting-surface node and triangle into the shared
    /// entity store.
    #[instrument(skip(self))]
    fn build_surface(&mut self) -> Result<(), DomainError> {
        if self.surface.ntriangle() == 0 {
            return Err(DomainError::EmptySurface);
        }
        self.surface_nodes = (0..self.surface.nnode())
            .map(|i| {
                let (x, y, z) = self.surface.node(i);
                let id = self.store.create_node(Point3d::new(x, y, z));
                self.surface_node_index.insert(id, self.surface.node_index(i));
                id
            })
            .collect();
        self.surface_triangles = (0..self.surface.ntriangle())
            .map(|i| {
                let tri = self.surface.triangle(i);
                let corners = [
                    self.surface_nodes[tri[0]],
                    self.surface_nodes[tri[1]],
                    self.surface_nodes[tri[2]],
                ];
                let id = self
                    .store
                    .create_triangle(corners, None, TriangleKind::Surface);
                self.surface_triangle_index.insert(id, self.surface.triangle_index(i));
                id
            })
            .collect();
        Ok(())
    }

    /// Build the near-tree over the cutting surface's triangles, one sphere
    /// per triangle (centroid, circumscribing radius).
    #[instrument(skip(self))]
    fn build_near_tree(&mut self) {
        for (i, &tri) in self.surface_triangles.iter().enumerate() {
            let verts = self.store.triangle_vertices(tri);
            let centroid = Self::centroid(&verts);
            let radius = verts
                .iter()
                .map(|v| v.distance_to(&centroid))
                .fold(0.0_f64, f64::max);
            self.near_tree.insert(i, centroid, radius);
        }
    }

    /// Cut establishment over every dual boundary triangle: query the
    /// near-tree for overlapping surface triangles, call
    /// `establish_between` for each, abort on any degeneracy.
    #[instrument(skip(self))]
    fn establish_cuts(&mut self) -> Result<(), DomainError> {
        let dual_tris: Vec<TriangleId> = self
            .polys
            .values()
            .flat_map(|p| p.boundary.iter().map(|m| m.triangle))
            .collect();

        let max_extent = self.bounding_extent();
        let tolerance = self.config.tolerance.volume_tolerance(max_extent);

        for dual_tri in dual_tris {
            let verts = self.store.triangle_vertices(dual_tri);
            let centroid = Self::centroid(&verts);
            let radius = verts
                .iter()
                .map(|v| v.distance_to(&centroid))
                .fold(0.0_f64, f64::max);
            let hits = self
                .near_tree
                .query(centroid, radius, self.config.near_tree_query_cap);
            if hits.truncated {
                warn!(?dual_tri, "near-tree query truncated at cap");
            }
            for &surface_slot in &hits.candidates {
                let surface_tri = self.surface_triangles[surface_slot];
                match establish_between(&mut self.store, dual_tri, surface_tri, tolerance) {
                    Ok(_) => {}
                    Err(source) => {
                        return Err(DomainError::DegenerateIntersection { source });
                    }
                }
            }
        }
        Ok(())
    }

    fn bounding_extent(&self) -> f64 {
        let mut bounds = BoundingBox::empty();
        for node in self.store.nodes.values() {
            bounds.expand_to_include(node.point);
        }
        if bounds.is_valid() {
            bounds.max_extent()
        } else {
            1.0
        }
    }

    /// Triangulate every dual triangle and every surface triangle (design
    /// (triangulation step).
    #[instrument(skip(self))]
    fn triangulate_all(&mut self) {
        let dual_tris: Vec<TriangleId> = self
            .polys
            .values()
            .flat_map(|p| p.boundary.iter().map(|m| m.triangle))
            .collect();
        for tri in dual_tris {
            triangulate(&mut self.store, tri);
        }
        for &tri in &self.surface_triangles.clone() {
            triangulate(&mut self.store, tri);
        }
    }

    /// For each poly with any cut, gather its surf masks and run the
    /// activation/paint/collapse pipeline, then mark it CUT.
    #[instrument(skip(self))]
    fn paint_cut_polys(&mut self) -> Result<(), DomainError> {
        let max_extent = self.bounding_extent();
        let tolerance = self.config.tolerance.volume_tolerance(max_extent);
        let cut_nodes: Vec<usize> = self
            .polys
            .iter()
            .filter(|(_, p)| p.has_any_cut(&self.store))
            .map(|(&n, _)| n)
            .collect();

        for node in cut_nodes {
            let poly = self.polys.get_mut(&node).expect("poly present");
            // Every cutting surface in this crate is consumed with an
            // outward-facing winding (scenarios 1, 4, 6 all describe
            // "outward normal" or "inward-normal=+z" cutters) — surfaces
            // are outward by convention unless the caller's mesh adapter
            // says otherwise; this crate has no config knob for it yet.
            poly.determine_active_subtri(&self.store, tolerance, false)?;
            poly.topology = Topology::Cut;

            if self.config.verify_after_paint && !poly.verify_paint(&self.store) {
                return Err(DomainError::NonWatertightSurface { poly: poly.id });
            }
        }
        Ok(())
    }

    /// Topology propagation sweep: any primal edge with
    /// one CUT/EXTERIOR endpoint and one INTERIOR endpoint propagates
    /// EXTERIOR when the CUT side has no activity reaching the edge's
    /// midpoint node; GHOST polys act as INTERIOR for propagation but are
    /// never themselves flipped to EXTERIOR or emitted.
    #[instrument(skip(self))]
    fn propagate_topology(&mut self) {
        loop {
            let mut changed = false;
            for edge_idx in 0..self.primal.nedge() {
                let [n0, n1] = self.primal.edge(edge_idx);
                let t0 = self.polys.get(&n0).map(|p| p.topology);
                let t1 = self.polys.get(&n1).map(|p| p.topology);
                let (Some(t0), Some(t1)) = (t0, t1) else { continue };

                if t0 == Topology::Exterior && t1 == Topology::Interior {
                    self.polys.get_mut(&n1).unwrap().topology = Topology::Exterior;
                    changed = true;
                    continue;
                }
                if t1 == Topology::Exterior && t0 == Topology::Interior {
                    self.polys.get_mut(&n0).unwrap().topology = Topology::Exterior;
                    changed = true;
                    continue;
                }

                if t0 == Topology::Cut && t1 == Topology::Interior {
                    let (lo, hi) = if n0 < n1 { (n0, n1) } else { (n1, n0) };
                    if let Some(&mid) = self.dual_points.get(&DualPointKey::EdgeMidpoint(lo, hi)) {
                        let active = self.mask_surrounding_node_activity(n0, mid);
                        if !active {
                            self.polys.get_mut(&n1).unwrap().topology = Topology::Exterior;
                            changed = true;
                        }
                    }
                }
                if t1 == Topology::Cut && t0 == Topology::Interior {
                    let (lo, hi) = if n0 < n1 { (n0, n1) } else { (n1, n0) };
                    if let Some(&mid) = self.dual_points.get(&DualPointKey::EdgeMidpoint(lo, hi)) {
                        let active = self.mask_surrounding_node_activity(n1, mid);
                        if !active {
                            self.polys.get_mut(&n0).unwrap().topology = Topology::Exterior;
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        for (&node, poly) in self.polys.iter_mut() {
            if node >= self.primal.nnode0() {
                poly.topology = Topology::Ghost;
            }
        }
    }

    /// `P0.mask_surrounding_node_activity(N)`: true iff
    /// any boundary mask of the poly at `cut_node` has an active subtri
    /// touching dual node `mid`.
    fn mask_surrounding_node_activity(&self, cut_node: usize, mid: NodeId) -> bool {
        let Some(poly) = self.polys.get(&cut_node) else { return false };
        for mask in &poly.boundary {
            let triangle = &self.store.triangles[mask.triangle];
            if !triangle.corners.contains(&mid) {
                continue;
            }
            for (i, _) in triangle.sub.subtris.iter().enumerate() {
                if mask.active[i] {
                    return true;
                }
            }
        }
        false
    }

    /// Drive the whole pipeline to completion.
    #[instrument(skip(self))]
    pub fn run(&mut self) -> Result<(), DomainError> {
        if self.primal.ncell() == 0 {
            return Err(DomainError::NullPrimal);
        }
        info!(ncell = self.primal.ncell(), "building dual boundary");
        self.build_dual_boundary();

        info!(ntriangle = self.surface.ntriangle(), "importing cutting surface");
        self.build_surface()?;

        info!("building near-tree over cutting surface");
        self.build_near_tree();

        info!("establishing cuts");
        self.establish_cuts()?;

        info!("triangulating touched triangles");
        self.triangulate_all();

        info!("painting cut polys");
        self.paint_cut_polys()?;

        info!("propagating topology");
        self.propagate_topology();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A single tetrahedron, nodes (0,0,0),(1,0,0),(0,1,0),(0,0,1) (design
    /// One cell, no interior adjacency.
    struct UnitTetPrimal;

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
            const FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 2, 3], [0, 1, 3], [0, 1, 2]];
            FACES[i]
        }
        fn edge(&self, i: usize) -> [usize; 2] {
            const EDGES: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];
            EDGES[i]
        }
        fn face(&self, i: usize) -> ([usize; 3], Option<u32>) {
            (self.tri(i), Some(i as u32))
        }
        fn xyz(&self, node: usize) -> (f64, f64, f64) {
            const PTS: [(f64, f64, f64); 4] = [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (0.0, 0.0, 1.0)];
            PTS[node]
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

    /// the cutter: a wide horizontal plane z=0.5.
    struct HorizontalPlaneSurface;

    impl Surface for HorizontalPlaneSurface {
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
            const PTS: [(f64, f64, f64); 3] = [(-1.0, -1.0, 0.5), (2.0, -1.0, 0.5), (0.5, 2.0, 0.5)];
            PTS[i]
        }
        fn node_index(&self, node: usize) -> usize {
            node
        }
        fn triangle_index(&self, tri: usize) -> usize {
            tri
        }
    }

    /// A cutter entirely above the tet — a clean miss.
    struct FarAwaySurface;

    impl Surface for FarAwaySurface {
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
            const PTS: [(f64, f64, f64); 3] = [(-10.0, -10.0, 5.0), (10.0, -10.0, 5.0), (0.0, 10.0, 5.0)];
            PTS[i]
        }
        fn node_index(&self, node: usize) -> usize {
            node
        }
        fn triangle_index(&self, tri: usize) -> usize {
            tri
        }
    }

    #[test]
    fn test_run_missed_surface_leaves_all_polys_interior() {
        let primal = UnitTetPrimal;
        let surface = FarAwaySurface;
        let mut domain = Domain::new(&primal, &surface, PipelineConfig::default());
        domain.run().expect("pipeline should not fail on a clean miss");
        for node in 0..4 {
            assert_eq!(domain.poly(node).unwrap().topology, Topology::Interior);
        }
    }

    #[test]
    fn test_run_axis_plane_cut_produces_cut_poly_at_origin() {
        let primal = UnitTetPrimal;
        let surface = HorizontalPlaneSurface;
        let mut domain = Domain::new(&primal, &surface, PipelineConfig::default());
        domain.run().expect("pipeline should succeed on a transversal cut");

        // Node 3 = (0,0,1) sits entirely above the cutter; node 0 = origin
        // and nodes 1,2 straddle it through their incident tet faces.
        let topologies: Vec<Topology> = (0..4).map(|n| domain.poly(n).unwrap().topology).collect();
        assert!(topologies.contains(&Topology::Cut));
    }

    #[test]
    fn test_run_empty_surface_is_fatal() {
        struct EmptySurface;
        impl Surface for EmptySurface {
            fn ntriangle(&self) -> usize {
                0
            }
            fn nsegment(&self) -> usize {
                0
            }
            fn nnode(&self) -> usize {
                0
            }
            fn triangle(&self, _i: usize) -> [usize; 3] {
                unreachable!()
            }
            fn segment(&self, _i: usize) -> [usize; 2] {
                unreachable!()
            }
            fn node(&self, _i: usize) -> (f64, f64, f64) {
                unreachable!()
            }
            fn node_index(&self, node: usize) -> usize {
                node
            }
            fn triangle_index(&self, tri: usize) -> usize {
                tri
            }
        }

        let primal = UnitTetPrimal;
        let surface = EmptySurface;
        let mut domain = Domain::new(&primal, &surface, PipelineConfig::default());
        let result = domain.run();
        assert!(matches!(result, Err(DomainError::EmptySurface)));
    }
}
