//! Poly — the region painter, the algorithmic heart of the
//! pipeline. A Poly owns two ordered lists of masks (the fixed
//! median-dual boundary and the cutting-surface masks gathered while
//! walking cuts), activates sub-regions at each cut via `volume6` probes,
//! paints each mask, collapses regions to a fixed point across three
//! adjacency rules, and finally computes per-region centroid/volume.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::entities::{
    CutId, EntityStore, IntersectionId, PolyId, SubNode, TriangleId, TriangleKind,
};
use crate::error::DomainError;
use crate::geometry::point::Point3d;
use crate::geometry::volume::{classify_volume, volume6, VolumeSign};
use crate::mask::Mask;

/// Topology tag a poly ends up with after the domain's propagation sweep
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Topology {
    Interior,
    Cut,
    Exterior,
    Ghost,
}

/// The dual polyhedron around one primal node: a fixed boundary plus a
/// gathered, growing set of cutting-surface masks.
#[derive(Debug, Clone)]
pub struct Poly {
    pub id: PolyId,
    pub boundary: Vec<Mask>,
    pub surf: Vec<Mask>,
    pub topology: Topology,
    /// Per-poly region-id counter, scoped to the poly itself rather than
    /// process-wide so that multiple `Domain`s can coexist — region ids are
    /// never compared across polys, so there's no need for a wider scope.
    next_region: u32,
    /// Count of distinct regions after the most recent `compact_labels`.
    pub region_count: usize,
}

impl Poly {
    pub fn new(id: PolyId) -> Self {
        Self {
            id,
            boundary: Vec::new(),
            surf: Vec::new(),
            topology: Topology::Interior,
            next_region: 1,
            region_count: 0,
        }
    }

    pub fn push_boundary_mask(&mut self, mask: Mask) {
        self.boundary.push(mask);
    }

    fn fresh_region(&mut self) -> u32 {
        let r = self.next_region;
        self.next_region += 1;
        r
    }

    pub fn has_any_cut(&self, store: &EntityStore) -> bool {
        self.boundary
            .iter()
            .any(|m| !store.triangles[m.triangle].cuts.is_empty())
    }

    fn ensure_surf_mask(&mut self, store: &EntityStore, tri: TriangleId, inward: bool) -> usize {
        if let Some(pos) = self.surf.iter().position(|m| m.triangle == tri) {
            return pos;
        }
        self.surf.push(Mask::new(store, tri, inward));
        self.surf.len() - 1
    }

    /// The subtri of `triangle` touching chord `(i0, i1)` that is currently
    /// active, and its region, if any.
    fn active_region_touching_chord(
        store: &EntityStore,
        mask: &Mask,
        triangle: TriangleId,
        i0: IntersectionId,
        i1: IntersectionId,
    ) -> Option<u32> {
        let sub = &store.triangles[triangle].sub;
        let idx0 = sub
            .subnodes
            .iter()
            .position(|sn| matches!(sn, SubNode::Intersection(i) if *i == i0))?;
        let idx1 = sub
            .subnodes
            .iter()
            .position(|sn| matches!(sn, SubNode::Intersection(i) if *i == i1))?;
        for (k, subtri) in sub.subtris.iter().enumerate() {
            if subtri.nodes.contains(&idx0) && subtri.nodes.contains(&idx1) && mask.active[k] {
                return Some(mask.region[k]);
            }
        }
        None
    }

    /// **Activation at cuts**: for each cut on a boundary mask,
    /// locate (or create) the surf mask for the cutting-surface triangle on
    /// the other side, pick the larger-area side of each triangle as the
    /// other's probe, require the two signed probe volumes to disagree in
    /// sign and be non-degenerate, and activate one side of each triangle
    /// with a fresh region id chosen by orientation.
    pub fn activate_subtri_at_cuts(
        &mut self,
        store: &EntityStore,
        tolerance: f64,
        surface_inward: bool,
    ) -> Result<(), DomainError> {
        let mut work: Vec<CutId> = Vec::new();
        for mask in &self.boundary {
            for &cut in &store.triangles[mask.triangle].cuts {
                if !work.contains(&cut) {
                    work.push(cut);
                }
            }
        }

        for cut_id in work {
            let cut = store.cuts[cut_id];
            let t_domain = cut.triangle_a;
            let t_surface = cut.triangle_b;

            let bi = match self.boundary.iter().position(|m| m.triangle == t_domain) {
                Some(i) => i,
                None => continue,
            };
            let si = self.ensure_surf_mask(store, t_surface, surface_inward);

            let (d_pos, d_neg) = crate::mask::Mask::touching_subtris(store, t_domain, cut.i0, cut.i1)
                .ok_or_else(|| DomainError::Inconsistent {
                    detail: format!("cut {cut_id:?} chord not found on domain triangle {t_domain:?}"),
                })?;
            let (s_pos, s_neg) = crate::mask::Mask::touching_subtris(store, t_surface, cut.i0, cut.i1)
                .ok_or_else(|| DomainError::Inconsistent {
                    detail: format!("cut {cut_id:?} chord not found on surface triangle {t_surface:?}"),
                })?;

            // Probe for T: the larger-area side of T'.
            let s_probe = if store.triangles[t_surface].sub.subtris[s_pos].weight
                >= store.triangles[t_surface].sub.subtris[s_neg].weight
            {
                s_pos
            } else {
                s_neg
            };
            // Probe for T': the larger-area side of T.
            let d_probe = if store.triangles[t_domain].sub.subtris[d_pos].weight
                >= store.triangles[t_domain].sub.subtris[d_neg].weight
            {
                d_pos
            } else {
                d_neg
            };

            let c0 = store.subnode_point(t_domain, SubNode::Intersection(cut.i0));
            let c1 = store.subnode_point(t_domain, SubNode::Intersection(cut.i1));

            let s_probe_centroid = store.subtri_centroid(t_surface, s_probe);
            let v_pos = volume6(c0, c1, s_probe_centroid, store.subtri_centroid(t_domain, d_pos));
            let v_neg = volume6(c0, c1, s_probe_centroid, store.subtri_centroid(t_domain, d_neg));
            check_opposite_signs(v_pos, v_neg, tolerance, t_domain, t_surface)?;

            let d_probe_centroid = store.subtri_centroid(t_domain, d_probe);
            let w_pos = volume6(c0, c1, d_probe_centroid, store.subtri_centroid(t_surface, s_pos));
            let w_neg = volume6(c0, c1, d_probe_centroid, store.subtri_centroid(t_surface, s_neg));
            check_opposite_signs(w_pos, w_neg, tolerance, t_domain, t_surface)?;

            let m_prime_inward = self.surf[si].inward;
            let domain_region = self.fresh_region();
            let domain_positive_side = if m_prime_inward { v_pos > 0.0 } else { v_pos < 0.0 };
            self.boundary[bi].activate_subtri_by_intersections(
                store,
                cut.i0,
                cut.i1,
                domain_region,
                domain_positive_side,
            );

            let m_inward = self.boundary[bi].inward;
            let surf_region = self.fresh_region();
            let surf_positive_side = if m_inward { w_pos > 0.0 } else { w_pos < 0.0 };
            self.surf[si].activate_subtri_by_intersections(
                store,
                cut.i0,
                cut.i1,
                surf_region,
                surf_positive_side,
            );
        }
        Ok(())
    }

    /// Flood-fill every mask that has at least one seeded subtri.
    pub fn paint_all(&mut self, store: &EntityStore) {
        for mask in self.boundary.iter_mut() {
            if mask.regions_present().is_empty() {
                continue;
            }
            mask.paint(store, 0);
        }
        for mask in self.surf.iter_mut() {
            if mask.regions_present().is_empty() {
                continue;
            }
            mask.paint(store, 0);
        }
    }

    /// **Activate uncut masks**: a boundary mask with no cuts
    /// inherits a neighbour's region across a shared segment, to
    /// convergence.
    pub fn activate_uncut_boundary_masks(&mut self, store: &EntityStore) {
        loop {
            let mut changed = false;
            for bi in 0..self.boundary.len() {
                let triangle = self.boundary[bi].triangle;
                if !store.triangles[triangle].cuts.is_empty() {
                    continue;
                }
                if !self.boundary[bi].regions_present().is_empty() {
                    continue;
                }
                let mut found = None;
                for seg in store.triangles[triangle].segments {
                    if let Some(neighbour) = store.segment_other_triangle(seg, triangle) {
                        if let Some(ni) = self.boundary.iter().position(|m| m.triangle == neighbour) {
                            if let Some(&r) = self.boundary[ni].regions_present().first() {
                                found = Some(r);
                                break;
                            }
                        }
                    }
                }
                if let Some(r) = found {
                    self.boundary[bi].activate_all(r);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// **Gather cutting-surface masks**: BFS across the cutting
    /// surface's own triangle adjacency from every surf mask already present
    /// (created while activating cuts), pulling in uncut neighbours and
    /// inheriting the region of the active subtri they border.
    pub fn gather_surf(&mut self, store: &EntityStore) {
        let mut seen: HashSet<TriangleId> = self.surf.iter().map(|m| m.triangle).collect();
        let mut frontier: VecDeque<usize> = (0..self.surf.len()).collect();

        while let Some(idx) = frontier.pop_front() {
            let triangle = self.surf[idx].triangle;
            let inward = self.surf[idx].inward;
            let subtris = store.triangles[triangle].sub.subtris.clone();
            for (si, subtri) in subtris.iter().enumerate() {
                if !self.surf[idx].active[si] {
                    continue;
                }
                let region = self.surf[idx].region[si];
                for (a, b) in Mask::subtri_edges(subtri.nodes) {
                    let seg = match edge_boundary_segment(store, triangle, a, b) {
                        Some(s) => s,
                        None => continue,
                    };
                    let neighbour = match store.segment_other_triangle(seg, triangle) {
                        Some(n) => n,
                        None => continue,
                    };
                    if store.triangles[neighbour].kind != TriangleKind::Surface {
                        continue;
                    }
                    if !store.triangles[neighbour].cuts.is_empty() {
                        continue;
                    }
                    if !seen.insert(neighbour) {
                        continue;
                    }
                    let mut new_mask = Mask::new(store, neighbour, inward);
                    new_mask.activate_all(region);
                    self.surf.push(new_mask);
                    frontier.push_back(self.surf.len() - 1);
                }
            }
        }
    }

    fn collapse_region_everywhere(&mut self, a: u32, b: u32) {
        for m in self.boundary.iter_mut() {
            m.collapse_regions(a, b);
        }
        for m in self.surf.iter_mut() {
            m.collapse_regions(a, b);
        }
    }

    /// **Region collapse**: repeat the three adjacency rules
    /// until no region labels change.
    pub fn collapse_to_fixed_point(&mut self, store: &EntityStore) {
        loop {
            let mut changed = false;
            changed |= self.collapse_cut_pairs(store);
            changed |= self.collapse_neighbours(store, true);
            changed |= self.collapse_neighbours(store, false);
            if !changed {
                break;
            }
        }
    }

    fn collapse_cut_pairs(&mut self, store: &EntityStore) -> bool {
        let mut changed = false;
        for bi in 0..self.boundary.len() {
            let triangle = self.boundary[bi].triangle;
            let cuts = store.triangles[triangle].cuts.clone();
            for cut_id in cuts {
                let cut = store.cuts[cut_id];
                if cut.triangle_a != triangle {
                    continue;
                }
                let si = match self.surf.iter().position(|m| m.triangle == cut.triangle_b) {
                    Some(i) => i,
                    None => continue,
                };
                let d_region =
                    Self::active_region_touching_chord(store, &self.boundary[bi], triangle, cut.i0, cut.i1);
                let s_region = Self::active_region_touching_chord(
                    store,
                    &self.surf[si],
                    cut.triangle_b,
                    cut.i0,
                    cut.i1,
                );
                if let (Some(d), Some(s)) = (d_region, s_region) {
                    if d != 0 && s != 0 && d != s {
                        let (lo, hi) = (d.min(s), d.max(s));
                        self.collapse_region_everywhere(lo, hi);
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    fn collapse_neighbours(&mut self, store: &EntityStore, boundary_side: bool) -> bool {
        let mut changed = false;
        let len = if boundary_side { self.boundary.len() } else { self.surf.len() };
        for mi in 0..len {
            let triangle = if boundary_side { self.boundary[mi].triangle } else { self.surf[mi].triangle };
            for seg in store.triangles[triangle].segments {
                if !store.segments[seg].intersections.is_empty() {
                    continue;
                }
                let neighbour = match store.segment_other_triangle(seg, triangle) {
                    Some(n) => n,
                    None => continue,
                };
                let list = if boundary_side { &self.boundary } else { &self.surf };
                let nj = match list.iter().position(|m| m.triangle == neighbour) {
                    Some(i) => i,
                    None => continue,
                };
                if nj == mi {
                    continue;
                }
                let r1 = if boundary_side {
                    subtri_region_on_segment(store, &self.boundary[mi], triangle, seg)
                } else {
                    subtri_region_on_segment(store, &self.surf[mi], triangle, seg)
                };
                let r2 = if boundary_side {
                    subtri_region_on_segment(store, &self.boundary[nj], neighbour, seg)
                } else {
                    subtri_region_on_segment(store, &self.surf[nj], neighbour, seg)
                };
                if let (Some(r1), Some(r2)) = (r1, r2) {
                    if r1 != 0 && r2 != 0 && r1 != r2 {
                        let (lo, hi) = (r1.min(r2), r1.max(r2));
                        self.collapse_region_everywhere(lo, hi);
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// **Compact labels**: renumber regions 0..k in
    /// first-occurrence order across boundary then surf masks.
    pub fn compact_labels(&mut self) {
        let mut order: Vec<u32> = Vec::new();
        for m in self.boundary.iter().chain(self.surf.iter()) {
            for &r in &m.region {
                if r != 0 && !order.contains(&r) {
                    order.push(r);
                }
            }
        }
        let map: HashMap<u32, u32> = order.iter().enumerate().map(|(i, &r)| (r, (i + 1) as u32)).collect();
        for m in self.boundary.iter_mut().chain(self.surf.iter_mut()) {
            for r in m.region.iter_mut() {
                if *r != 0 {
                    *r = map[r];
                }
            }
        }
        self.region_count = order.len();
    }

    /// Run the determine-active-subtri pipeline for one cut poly: gather
    /// surf masks, activate at cuts, paint, activate uncut boundary masks,
    /// collapse to a fixed point, compact labels.
    pub fn determine_active_subtri(
        &mut self,
        store: &EntityStore,
        tolerance: f64,
        surface_inward: bool,
    ) -> Result<(), DomainError> {
        self.activate_subtri_at_cuts(store, tolerance, surface_inward)?;
        self.gather_surf(store);
        self.paint_all(store);
        self.activate_uncut_boundary_masks(store);
        self.collapse_to_fixed_point(store);
        self.compact_labels();
        Ok(())
    }

    /// `verify_paint` across every mask in the poly (the paint
    /// consistency property).
    pub fn verify_paint(&self, store: &EntityStore) -> bool {
        self.boundary.iter().all(|m| m.verify_paint(store)) && self.surf.iter().all(|m| m.verify_paint(store))
    }

    /// **Volumes and centroids**: accumulate
    /// `volume6(x0,x1,x2,origin)/6` over every active subtri in `region`,
    /// negated when the owning mask is inward-pointing, with a DIV-ZERO
    /// fallback to the unweighted average of sub-triangle centers.
    pub fn centroid_volume(&self, store: &EntityStore, region: u32, origin: Point3d) -> (Point3d, f64) {
        let mut volume = 0.0;
        let mut weighted = crate::geometry::vector::Vec3::ZERO;
        let mut centers_sum = crate::geometry::vector::Vec3::ZERO;
        let mut centers_count = 0usize;

        for mask in self.boundary.iter().chain(self.surf.iter()) {
            let subtris = &store.triangles[mask.triangle].sub.subtris;
            for (i, _subtri) in subtris.iter().enumerate() {
                if !mask.active[i] || mask.region[i] != region {
                    continue;
                }
                let pts = store.subtri_points(mask.triangle, i);
                let mut contrib = volume6(pts[0], pts[1], pts[2], origin) / 6.0;
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
                return (origin, 0.0);
            }
            let avg = centers_sum / (centers_count as f64);
            return (Point3d::from_array(avg.to_array()), volume);
        }
        let centroid = weighted / volume;
        (Point3d::from_array(centroid.to_array()), volume)
    }

    /// **Directed areas about an edge center**: for node `n`
    /// sitting at a primal-edge midpoint, sum `area * normal` (signed by
    /// inward flag) over every mask in `self.boundary` whose triangle
    /// touches `n`.
    pub fn directed_area_about_node(&self, store: &EntityStore, node: crate::entities::NodeId) -> crate::geometry::vector::Vec3 {
        let mut total = crate::geometry::vector::Vec3::ZERO;
        for mask in &self.boundary {
            let triangle = &store.triangles[mask.triangle];
            if !triangle.corners.contains(&node) {
                continue;
            }
            for (i, subtri) in triangle.sub.subtris.iter().enumerate() {
                if !mask.active[i] {
                    continue;
                }
                let area = store.triangle_area(mask.triangle) * subtri.weight;
                let mut normal = store.triangle_normal(mask.triangle);
                if mask.inward {
                    normal = -normal;
                }
                total = total + normal * area;
            }
        }
        total
    }
}

fn check_opposite_signs(
    v_a: f64,
    v_b: f64,
    tolerance: f64,
    t_domain: TriangleId,
    t_surface: TriangleId,
) -> Result<(), DomainError> {
    if classify_volume(v_a, tolerance) == VolumeSign::Degenerate
        || classify_volume(v_b, tolerance) == VolumeSign::Degenerate
    {
        return Err(DomainError::Inconsistent {
            detail: format!(
                "degenerate activation probe between domain triangle {t_domain:?} and surface \
                 triangle {t_surface:?}"
            ),
        });
    }
    let same_sign = (v_a > 0.0) == (v_b > 0.0);
    if same_sign {
        return Err(DomainError::Inconsistent {
            detail: format!(
                "activation probe volumes agree in sign between domain triangle {t_domain:?} and \
                 surface triangle {t_surface:?} (expected opposite signs on the two chord sides)"
            ),
        });
    }
    Ok(())
}

/// The segments of `triangle` that subnode `idx` lies on: a corner lies on
/// its two incident segments; an intersection subnode lies on its own
/// `.segment` field only when that segment belongs to `triangle` itself
/// (the dual-role distinction documented on `crate::entities::Intersection`).
fn subnode_segments(store: &EntityStore, triangle: TriangleId, idx: usize) -> Vec<crate::entities::SegmentId> {
    let t = &store.triangles[triangle];
    match t.sub.subnodes[idx] {
        SubNode::Corner(c) => vec![t.segments[c as usize], t.segments[(c as usize + 2) % 3]],
        SubNode::Intersection(i) => {
            let seg = store.intersections[i].segment;
            if t.segments.contains(&seg) {
                vec![seg]
            } else {
                Vec::new()
            }
        }
    }
}

/// The original triangle segment that subtri edge `(a, b)` lies exactly on,
/// if any (as opposed to an internal fan or chord edge).
fn edge_boundary_segment(
    store: &EntityStore,
    triangle: TriangleId,
    a: usize,
    b: usize,
) -> Option<crate::entities::SegmentId> {
    let sa = subnode_segments(store, triangle, a);
    let sb = subnode_segments(store, triangle, b);
    sa.into_iter().find(|s| sb.contains(s))
}

/// The region of the subtri bordering `seg` (the whole, un-subdivided
/// segment — callers only use this when `seg` carries no intersections).
fn subtri_region_on_segment(store: &EntityStore, mask: &Mask, triangle: TriangleId, seg: crate::entities::SegmentId) -> Option<u32> {
    let t = &store.triangles[triangle];
    let k = t.segments.iter().position(|&s| s == seg)?;
    let c0 = k as u8;
    let c1 = ((k + 1) % 3) as u8;
    let idx0 = t.sub.subnodes.iter().position(|sn| matches!(sn, SubNode::Corner(c) if *c == c0))?;
    let idx1 = t.sub.subnodes.iter().position(|sn| matches!(sn, SubNode::Corner(c) if *c == c1))?;
    for (i, subtri) in t.sub.subtris.iter().enumerate() {
        if subtri.nodes.contains(&idx0) && subtri.nodes.contains(&idx1) {
            return Some(mask.region[i]);
        }
    }
    None
}
