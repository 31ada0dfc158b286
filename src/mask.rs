//! Mask — a triangle plus orientation plus a per-subtri
//! (active, region) label.
//!
//! A mask's subtri-adjacency graph connects two subtris of the same
//! triangle whenever they share a sub-edge that is *not* one of the
//! triangle's registered cut chords. Chord edges are the only internal
//! boundaries a mask's own flood fill respects; everything else (fan edges
//! left over from inserting an intersection or a chord's own star polygon,
//! per `crate::triangulator`) floods freely.

use std::collections::VecDeque;

use crate::entities::{CutId, EntityStore, IntersectionId, SubNode, TriangleId};

/// One triangle wrapped with orientation and per-subtri activity/region
/// state.
#[derive(Debug, Clone)]
pub struct Mask {
    pub triangle: TriangleId,
    /// `true` when the triangle's stored winding faces into the poly it
    /// belongs to (the "inward-pointing" orientation flag).
    pub inward: bool,
    pub active: Vec<bool>,
    pub region: Vec<u32>,
}

impl Mask {
    /// Build a mask sized to `triangle`'s current sub-triangulation, all
    /// subtris inactive. Must be constructed after `crate::triangulator`
    /// has produced its final sub-triangulation for this triangle.
    pub fn new(store: &EntityStore, triangle: TriangleId, inward: bool) -> Self {
        let n = store.triangles[triangle].sub.subtris.len();
        Self {
            triangle,
            inward,
            active: vec![false; n],
            region: vec![0; n],
        }
    }

    pub fn deactivate_all(&mut self) {
        for a in self.active.iter_mut() {
            *a = false;
        }
        for r in self.region.iter_mut() {
            *r = 0;
        }
    }

    pub fn activate_all(&mut self, region: u32) {
        for a in self.active.iter_mut() {
            *a = true;
        }
        for r in self.region.iter_mut() {
            *r = region;
        }
    }

    /// The two subtris touching chord `(i0, i1)` within `triangle`, as
    /// (positive_side, negative_side) per the same cross-product sign
    /// convention `activate_subtri_by_intersections` uses. Used by
    /// `crate::poly` to compare sides consistently across both triangles of
    /// a cut.
    pub(crate) fn touching_subtris(
        store: &EntityStore,
        triangle: TriangleId,
        i0: IntersectionId,
        i1: IntersectionId,
    ) -> Option<(usize, usize)> {
        let sub = &store.triangles[triangle].sub;
        let idx0 = sub
            .subnodes
            .iter()
            .position(|sn| matches!(sn, SubNode::Intersection(i) if *i == i0))?;
        let idx1 = sub
            .subnodes
            .iter()
            .position(|sn| matches!(sn, SubNode::Intersection(i) if *i == i1))?;
        let p0 = store.subnode_point(triangle, sub.subnodes[idx0]);
        let p1 = store.subnode_point(triangle, sub.subnodes[idx1]);
        let normal = store.triangle_normal(triangle);

        let mut positive = None;
        let mut negative = None;
        for (k, subtri) in sub.subtris.iter().enumerate() {
            if !(subtri.nodes.contains(&idx0) && subtri.nodes.contains(&idx1)) {
                continue;
            }
            let third = subtri.nodes.iter().copied().find(|&n| n != idx0 && n != idx1)?;
            let third_pt = store.subnode_point(triangle, sub.subnodes[third]);
            let side = (p1 - p0).cross(&(third_pt - p0)).dot(&normal);
            if side > 0.0 {
                positive = Some(k);
            } else {
                negative = Some(k);
            }
        }
        Some((positive?, negative?))
    }

    fn chord_subnode_pair(store: &EntityStore, triangle: TriangleId, cut: CutId) -> Option<(usize, usize)> {
        let c = store.cuts[cut];
        let sub = &store.triangles[triangle].sub;
        let idx = |want: IntersectionId| {
            sub.subnodes
                .iter()
                .position(|sn| matches!(sn, SubNode::Intersection(i) if *i == want))
        };
        Some((idx(c.i0)?, idx(c.i1)?))
    }

    /// The ordered set of subnode-index pairs that are this mask's chord
    /// edges (one per cut registered on the triangle).
    fn chord_edges(&self, store: &EntityStore) -> Vec<(usize, usize)> {
        store.triangles[self.triangle]
            .cuts
            .iter()
            .filter_map(|&cut| Self::chord_subnode_pair(store, self.triangle, cut))
            .map(|(a, b)| if a < b { (a, b) } else { (b, a) })
            .collect()
    }

    pub(crate) fn subtri_edges(nodes: [usize; 3]) -> [(usize, usize); 3] {
        let pair = |a: usize, b: usize| if a < b { (a, b) } else { (b, a) };
        [
            pair(nodes[0], nodes[1]),
            pair(nodes[1], nodes[2]),
            pair(nodes[2], nodes[0]),
        ]
    }

    /// Build the non-chord subtri-adjacency graph: subtris `i` and `j` are
    /// adjacent iff they share an edge that is not a chord edge.
    fn adjacency(&self, store: &EntityStore) -> Vec<Vec<usize>> {
        let chords = self.chord_edges(store);
        let subtris = &store.triangles[self.triangle].sub.subtris;
        let mut adj = vec![Vec::new(); subtris.len()];
        for i in 0..subtris.len() {
            let edges_i = Self::subtri_edges(subtris[i].nodes);
            for j in (i + 1)..subtris.len() {
                let edges_j = Self::subtri_edges(subtris[j].nodes);
                let shares = edges_i.iter().any(|e| edges_j.contains(e));
                if shares {
                    let shared_edge = edges_i.iter().find(|e| edges_j.contains(e)).unwrap();
                    if !chords.contains(shared_edge) {
                        adj[i].push(j);
                        adj[j].push(i);
                    }
                }
            }
        }
        adj
    }

    /// Activate the subtri touching chord `(i0, i1)` that lies on the side
    /// matching `positive_side`, per a consistent sign convention: the
    /// subtri's third vertex is on the positive side of the chord when
    /// `(p1 - p0) x (third - p0)` agrees in sign with the triangle's own
    /// normal (the `activate_subtri_by_intersections`, with the side
    /// selection driven by `crate::poly`'s activation-at-cuts step).
    pub fn activate_subtri_by_intersections(
        &mut self,
        store: &EntityStore,
        i0: IntersectionId,
        i1: IntersectionId,
        region: u32,
        positive_side: bool,
    ) -> Option<usize> {
        let sub = &store.triangles[self.triangle].sub;
        let idx0 = sub
            .subnodes
            .iter()
            .position(|sn| matches!(sn, SubNode::Intersection(i) if *i == i0))?;
        let idx1 = sub
            .subnodes
            .iter()
            .position(|sn| matches!(sn, SubNode::Intersection(i) if *i == i1))?;

        let p0 = store.subnode_point(self.triangle, sub.subnodes[idx0]);
        let p1 = store.subnode_point(self.triangle, sub.subnodes[idx1]);
        let normal = store.triangle_normal(self.triangle);

        for (k, subtri) in sub.subtris.iter().enumerate() {
            let has0 = subtri.nodes.contains(&idx0);
            let has1 = subtri.nodes.contains(&idx1);
            if !(has0 && has1) {
                continue;
            }
            let third = subtri
                .nodes
                .iter()
                .copied()
                .find(|&n| n != idx0 && n != idx1)?;
            let third_pt = store.subnode_point(self.triangle, sub.subnodes[third]);
            let side = (p1 - p0).cross(&(third_pt - p0)).dot(&normal);
            let is_positive = side > 0.0;
            if is_positive == positive_side {
                self.active[k] = true;
                self.region[k] = region;
                return Some(k);
            }
        }
        None
    }

    /// Flood-fill every subtri that already carries a non-zero region (the
    /// seeds left by `activate_subtri_by_intersections` or `activate_all`)
    /// out across non-chord edges, activating and labelling every subtri it
    /// reaches with that seed's region. A chord edge is never crossed, so a
    /// seed on one side of a cut never bleeds into the other side; subtris
    /// with no path back to any seed stay inactive, so every active subtri
    /// reachable without crossing a chord shares a region id. `region_seed`
    /// is accepted for API symmetry with `activate_all` but unused here —
    /// the actual seed labels already live in `self.region` by the time
    /// `paint` runs.
    pub fn paint(&mut self, store: &EntityStore, _region_seed: u32) {
        let adj = self.adjacency(store);
        let mut queue: VecDeque<usize> = (0..self.region.len())
            .filter(|&i| self.region[i] != 0)
            .collect();
        let mut visited = vec![false; self.region.len()];
        for &i in &queue {
            visited[i] = true;
            self.active[i] = true;
        }
        while let Some(i) = queue.pop_front() {
            let region = self.region[i];
            for &j in &adj[i] {
                if visited[j] {
                    continue;
                }
                visited[j] = true;
                self.active[j] = true;
                self.region[j] = region;
                queue.push_back(j);
            }
        }
    }

    /// the paint-consistency property: every active subtri carries a
    /// region, and every pair of adjacent active subtris (not across a
    /// chord) shares a region.
    pub fn verify_paint(&self, store: &EntityStore) -> bool {
        if self.active.iter().enumerate().any(|(i, &a)| a && self.region[i] == 0) {
            return false;
        }
        let adj = self.adjacency(store);
        for (i, neighbours) in adj.iter().enumerate() {
            if !self.active[i] {
                continue;
            }
            for &j in neighbours {
                if self.active[j] && self.region[i] != self.region[j] {
                    return false;
                }
            }
        }
        true
    }

    /// Replace every occurrence of region `b` with `a`.
    pub fn collapse_regions(&mut self, a: u32, b: u32) {
        if a == b {
            return;
        }
        for r in self.region.iter_mut() {
            if *r == b {
                *r = a;
            }
        }
    }

    /// All distinct non-zero region labels currently present.
    pub fn regions_present(&self) -> Vec<u32> {
        let mut regions: Vec<u32> = self.region.iter().copied().filter(|&r| r != 0).collect();
        regions.sort_unstable();
        regions.dedup();
        regions
    }
}
