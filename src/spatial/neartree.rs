//! Near-tree spatial index.
//!
//! A binary tree of bounding spheres supporting incremental insert and
//! range query by overlapping sphere, :
//! there is no rebalance and no delete, matching the single-pass pipeline
//! driver (component I) that builds it once over the cutting surface's
//! triangles and queries it once per dual triangle.

use crate::geometry::point::Point3d;

#[derive(Debug, Clone, Copy)]
struct NearTreeNode {
    /// Caller-supplied payload index (e.g. a triangle index).
    index: usize,
    center: Point3d,
    radius: f64,
    left: Option<usize>,
    right: Option<usize>,
    /// Max over the left subtree of distance(this.center, x.center) + x.radius.
    left_bound: f64,
    right_bound: f64,
}

/// Bounding-sphere binary tree. Built incrementally via `insert`; queried
/// read-only thereafter. No rebalance, no delete.
#[derive(Debug, Clone, Default)]
pub struct NearTree {
    nodes: Vec<NearTreeNode>,
    root: Option<usize>,
}

/// Result of a range query, capped by the caller-supplied `cap`.
#[derive(Debug, Clone)]
pub struct NearTreeQuery {
    pub candidates: Vec<usize>,
    /// `true` if the cap was hit before the search completed.
    pub truncated: bool,
}

impl NearTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Insert a bounding sphere (center, radius) tagged with `index`.
    /// Descends into the closer child at each level, updating that child's
    /// bound along the way.
    pub fn insert(&mut self, index: usize, center: Point3d, radius: f64) {
        let new_idx = self.nodes.len();
        self.nodes.push(NearTreeNode {
            index,
            center,
            radius,
            left: None,
            right: None,
            left_bound: 0.0,
            right_bound: 0.0,
        });
        match self.root {
            None => self.root = Some(new_idx),
            Some(root_idx) => self.insert_into(root_idx, new_idx),
        }
    }

    fn insert_into(&mut self, current_idx: usize, new_idx: usize) {
        let current_center = self.nodes[current_idx].center;
        let new_center = self.nodes[new_idx].center;
        let new_radius = self.nodes[new_idx].radius;
        let contribution = current_center.distance_to(&new_center) + new_radius;

        let go_left = match (self.nodes[current_idx].left, self.nodes[current_idx].right) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(l), Some(r)) => {
                let dl = self.nodes[l].center.distance_to(&new_center);
                let dr = self.nodes[r].center.distance_to(&new_center);
                dl <= dr
            }
        };

        if go_left {
            self.nodes[current_idx].left_bound = self.nodes[current_idx].left_bound.max(contribution);
            match self.nodes[current_idx].left {
                None => self.nodes[current_idx].left = Some(new_idx),
                Some(l) => self.insert_into(l, new_idx),
            }
        } else {
            self.nodes[current_idx].right_bound = self.nodes[current_idx].right_bound.max(contribution);
            match self.nodes[current_idx].right {
                None => self.nodes[current_idx].right = Some(new_idx),
                Some(r) => self.insert_into(r, new_idx),
            }
        }
    }

    /// Find every indexed sphere overlapping the query sphere
    /// (target_center, target_radius), capped at `cap` results.
    pub fn query(&self, target_center: Point3d, target_radius: f64, cap: usize) -> NearTreeQuery {
        let mut candidates = Vec::new();
        let mut truncated = false;
        if let Some(root) = self.root {
            self.query_at(root, target_center, target_radius, cap, &mut candidates, &mut truncated);
        }
        NearTreeQuery { candidates, truncated }
    }

    fn query_at(
        &self,
        node_idx: usize,
        target_center: Point3d,
        target_radius: f64,
        cap: usize,
        results: &mut Vec<usize>,
        truncated: &mut bool,
    ) {
        if *truncated {
            return;
        }
        let node = &self.nodes[node_idx];
        let dist = node.center.distance_to(&target_center);

        if node.radius >= dist - target_radius {
            if results.len() >= cap {
                *truncated = true;
                return;
            }
            results.push(node.index);
        }

        if let Some(l) = node.left {
            if dist - target_radius <= node.left_bound {
                self.query_at(l, target_center, target_radius, cap, results, truncated);
            }
        }
        if *truncated {
            return;
        }
        if let Some(r) = node.right {
            if dist - target_radius <= node.right_bound {
                self.query_at(r, target_center, target_radius, cap, results, truncated);
            }
        }
    }
}
