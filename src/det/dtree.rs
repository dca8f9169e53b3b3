//! Density estimation tree
//!
//! A binary partition of feature space into axis-aligned boxes. Each leaf
//! estimates the density of the training set as `count / (N * volume)`.
//! Splits are chosen to minimize the integrated squared error of this
//! piecewise-constant estimate, whose contribution from a node `t` is
//! `R(t) = -count² / (N² * volume)`.
//!
//! Nodes live in an arena addressed by index. Collapsing a subtree during
//! pruning hands its slots back to a free list.

use crate::core::{Result, Split, TreeError};
use crate::utils::validation;
use log::debug;
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Smallest log-space gain that counts as an improving split
const IMPROVEMENT_TOLERANCE: f64 = 1e-10;

/// Alpha stored on nodes that cannot collapse any further
pub const LEAF_ALPHA: f64 = f64::MAX;

/// A node of a density estimation tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DTreeNode {
    /// Lower corner of the node's box
    pub min_vals: Vec<f64>,
    /// Upper corner of the node's box
    pub max_vals: Vec<f64>,
    /// First position of the node's points in the tree's point order
    pub start: usize,
    /// One past the last position of the node's points
    pub end: usize,
    /// Split of an internal node, `None` for leaves
    pub split: Option<Split>,
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub parent: Option<usize>,
    /// Log of the box volume; zero-width dimensions contribute a unit factor
    pub log_volume: f64,
    /// Density estimate of the node treated as a leaf
    pub density: f64,
    /// `R(t)`: error of the node treated as a leaf
    pub error: f64,
    /// Sum of `R` over the current leaves below this node
    pub subtree_error: f64,
    /// Number of current leaves below this node
    pub subtree_leaves: usize,
    /// Complexity of the subtree (leaf count, or volume weighted)
    pub subtree_complexity: f64,
    /// Cost-complexity ratio at which this subtree collapses
    pub alpha: f64,
    /// Tag assigned by [`DensityTree::tag_tree`]
    pub tag: Option<usize>,
}

impl DTreeNode {
    /// Number of training points in the node
    pub fn count(&self) -> usize {
        self.end - self.start
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none()
    }

    /// Whether a point lies inside the node's box (bounds inclusive)
    pub fn contains(&self, point: ArrayView1<f64>) -> bool {
        point
            .iter()
            .zip(self.min_vals.iter().zip(self.max_vals.iter()))
            .all(|(&x, (&lo, &hi))| x >= lo && x <= hi)
    }
}

/// Event emitted by [`DensityTree::walk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEvent {
    Enter { node: usize, parent: Option<usize> },
    Leave { node: usize, parent: Option<usize> },
}

/// Best split found for a node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    split: Split,
    left_count: usize,
    /// `ln(Σ c²/V)` over the two children, comparable to the parent's `ln(c²/V)`
    log_score: f64,
}

/// Density estimation tree over a D×N dataset (columns are points)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityTree {
    nodes: Vec<DTreeNode>,
    free: Vec<usize>,
    root: usize,
    n_dims: usize,
    total_points: usize,
    /// Permutation of training point indices; node `t` owns `start..end`
    point_order: Vec<usize>,
    root_log_volume: f64,
    use_volume_reg: bool,
}

impl DensityTree {
    /// Grow a full density tree on `data`
    ///
    /// A node becomes a leaf when it holds fewer than `2 * min_leaf_size`
    /// points, when no split leaves `min_leaf_size` points on both sides, or
    /// when it holds at most `max_leaf_size` points and the best split does
    /// not reduce the error.
    pub fn grow(
        data: ArrayView2<f64>,
        max_leaf_size: usize,
        min_leaf_size: usize,
        use_volume_reg: bool,
    ) -> Result<Self> {
        validation::check_leaf_sizes(max_leaf_size, min_leaf_size)?;
        validation::check_dataset(data)?;

        let n_dims = data.nrows();
        let total_points = data.ncols();
        let (min_vals, max_vals) = validation::bounding_box(data);
        let root_log_volume = log_volume(&min_vals, &max_vals);

        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: 0,
            n_dims,
            total_points,
            point_order: (0..total_points).collect(),
            root_log_volume,
            use_volume_reg,
        };
        tree.root = tree.new_node(min_vals, max_vals, 0, total_points, None);

        let mut pending = vec![tree.root];
        while let Some(idx) = pending.pop() {
            let count = tree.nodes[idx].count();
            if count < 2 * min_leaf_size {
                continue;
            }

            let candidate = match tree.find_split(data, idx, min_leaf_size) {
                Some(candidate) => candidate,
                None => continue,
            };

            let own_score = ((count * count) as f64).ln() - tree.nodes[idx].log_volume;
            if count <= max_leaf_size && candidate.log_score <= own_score + IMPROVEMENT_TOLERANCE {
                continue;
            }

            let (left, right) = tree.split_node(data, idx, candidate);
            pending.push(right);
            pending.push(left);
        }

        tree.refresh_all();
        debug!(
            "Grew density tree: {} points, {} dims, {} leaves",
            total_points,
            n_dims,
            tree.num_leaves()
        );
        Ok(tree)
    }

    /// Index of the root node
    pub fn root(&self) -> usize {
        self.root
    }

    /// Access a node by index
    pub fn node(&self, idx: usize) -> &DTreeNode {
        &self.nodes[idx]
    }

    pub fn n_dims(&self) -> usize {
        self.n_dims
    }

    /// Number of points the tree was trained on
    pub fn total_points(&self) -> usize {
        self.total_points
    }

    pub fn uses_volume_reg(&self) -> bool {
        self.use_volume_reg
    }

    /// Number of leaves in the current pruning
    pub fn num_leaves(&self) -> usize {
        self.nodes[self.root].subtree_leaves
    }

    /// Number of arena slots released by pruning and available for reuse
    pub fn num_free_slots(&self) -> usize {
        self.free.len()
    }

    pub fn is_leaf(&self, idx: usize) -> bool {
        self.nodes[idx].is_leaf()
    }

    /// Training point indices covered by a node
    pub fn point_indices(&self, idx: usize) -> &[usize] {
        let node = &self.nodes[idx];
        &self.point_order[node.start..node.end]
    }

    /// Live nodes in pre-order (left subtree before right)
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            let node = &self.nodes[idx];
            if let (Some(left), Some(right)) = (node.left, node.right) {
                stack.push(right);
                stack.push(left);
            }
        }
        order
    }

    /// Current leaves, left to right
    pub fn leaves(&self) -> Vec<usize> {
        self.preorder()
            .into_iter()
            .filter(|&idx| self.nodes[idx].is_leaf())
            .collect()
    }

    /// Leaf reached by descending the splits, without checking the root box
    pub fn find_leaf(&self, point: ArrayView1<f64>) -> usize {
        let mut idx = self.root;
        while let Some(split) = self.nodes[idx].split {
            let node = &self.nodes[idx];
            idx = match (split.goes_left(point[split.dim]), node.left, node.right) {
                (true, Some(left), _) => left,
                (false, _, Some(right)) => right,
                _ => break,
            };
        }
        idx
    }

    /// Density estimate at `point`; zero outside the root box
    pub fn compute_value(&self, point: ArrayView1<f64>) -> Result<f64> {
        if point.len() != self.n_dims {
            return Err(TreeError::DimensionMismatch {
                expected: self.n_dims,
                actual: point.len(),
            });
        }
        if !self.nodes[self.root].contains(point) {
            return Ok(0.0);
        }
        Ok(self.nodes[self.find_leaf(point)].density)
    }

    /// Natural log of the density estimate (`-inf` outside the root box)
    pub fn log_density(&self, point: ArrayView1<f64>) -> Result<f64> {
        Ok(self.compute_value(point)?.ln())
    }

    /// Density estimate of every column of `data`
    pub fn compute_values(&self, data: ArrayView2<f64>) -> Result<Vec<f64>> {
        data.columns()
            .into_iter()
            .map(|point| self.compute_value(point))
            .collect()
    }

    /// Tag of the leaf containing `point`, descending splits only
    ///
    /// Requires a prior call to [`DensityTree::tag_tree`].
    pub fn leaf_tag(&self, point: ArrayView1<f64>) -> Option<usize> {
        self.nodes[self.find_leaf(point)].tag
    }

    /// Assign tags in pre-order and return how many were assigned
    ///
    /// With `every_node` all live nodes are tagged, otherwise only leaves
    /// (numbered `0..num_leaves()` from left to right).
    pub fn tag_tree(&mut self, every_node: bool) -> usize {
        for node in &mut self.nodes {
            node.tag = None;
        }
        let mut next = 0;
        for idx in self.preorder() {
            if every_node || self.nodes[idx].is_leaf() {
                self.nodes[idx].tag = Some(next);
                next += 1;
            }
        }
        next
    }

    /// Depth-first walk emitting enter/leave events for every live node
    pub fn walk<F: FnMut(&Self, WalkEvent)>(&self, mut visit: F) {
        let mut stack = vec![WalkEvent::Enter {
            node: self.root,
            parent: None,
        }];
        while let Some(event) = stack.pop() {
            visit(self, event);
            if let WalkEvent::Enter { node, parent } = event {
                stack.push(WalkEvent::Leave { node, parent });
                let current = &self.nodes[node];
                if let (Some(left), Some(right)) = (current.left, current.right) {
                    stack.push(WalkEvent::Enter {
                        node: right,
                        parent: Some(node),
                    });
                    stack.push(WalkEvent::Enter {
                        node: left,
                        parent: Some(node),
                    });
                }
            }
        }
    }

    /// Node reached by applying left (`true`) / right (`false`) decisions from the root
    pub fn follow_path(&self, decisions: &[bool]) -> Option<usize> {
        let mut idx = self.root;
        for &go_left in decisions {
            let node = &self.nodes[idx];
            idx = if go_left { node.left? } else { node.right? };
        }
        Some(idx)
    }

    /// Per-dimension sum of the error reduction of every current split
    pub fn variable_importance(&self) -> Vec<f64> {
        let mut importance = vec![0.0; self.n_dims];
        for idx in self.preorder() {
            let node = &self.nodes[idx];
            if let (Some(split), Some(left), Some(right)) = (node.split, node.left, node.right) {
                let children = self.nodes[left].error + self.nodes[right].error;
                importance[split.dim] += node.error - children;
            }
        }
        importance
    }

    /// Internal node with the smallest alpha, first in pre-order on ties
    pub fn weakest_link(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for idx in self.preorder() {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                continue;
            }
            if best.map_or(true, |(_, alpha)| node.alpha < alpha) {
                best = Some((idx, node.alpha));
            }
        }
        best
    }

    /// Turn an internal node into a leaf, releasing its descendants
    pub(crate) fn collapse(&mut self, idx: usize) {
        let left = self.nodes[idx].left.take();
        let right = self.nodes[idx].right.take();
        self.nodes[idx].split = None;
        for child in [left, right].into_iter().flatten() {
            self.release(child);
        }

        let complexity = self.leaf_complexity(self.nodes[idx].log_volume);
        let node = &mut self.nodes[idx];
        node.subtree_error = node.error;
        node.subtree_leaves = 1;
        node.subtree_complexity = complexity;
        node.alpha = LEAF_ALPHA;

        let mut ancestor = self.nodes[idx].parent;
        while let Some(parent) = ancestor {
            self.refresh(parent);
            ancestor = self.nodes[parent].parent;
        }
    }

    fn release(&mut self, idx: usize) {
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current];
            stack.extend(node.left.take());
            stack.extend(node.right.take());
            node.split = None;
            node.parent = None;
            self.free.push(current);
        }
    }

    fn alloc(&mut self, node: DTreeNode) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn leaf_complexity(&self, log_volume: f64) -> f64 {
        if self.use_volume_reg {
            (self.root_log_volume - log_volume).exp()
        } else {
            1.0
        }
    }

    fn new_node(
        &mut self,
        min_vals: Vec<f64>,
        max_vals: Vec<f64>,
        start: usize,
        end: usize,
        parent: Option<usize>,
    ) -> usize {
        let log_volume = log_volume(&min_vals, &max_vals);
        let count = (end - start) as f64;
        let log_n = (self.total_points as f64).ln();
        let density = (count.ln() - log_n - log_volume).exp();
        let error = -((count * count).ln() - 2.0 * log_n - log_volume).exp();
        let complexity = self.leaf_complexity(log_volume);

        self.alloc(DTreeNode {
            min_vals,
            max_vals,
            start,
            end,
            split: None,
            left: None,
            right: None,
            parent,
            log_volume,
            density,
            error,
            subtree_error: error,
            subtree_leaves: 1,
            subtree_complexity: complexity,
            alpha: LEAF_ALPHA,
            tag: None,
        })
    }

    /// Scan every dimension for the split with the largest `Σ c²/V`
    ///
    /// Candidates are midpoints between consecutive distinct sorted
    /// coordinates. Dimensions of zero width are skipped. Ties keep the first
    /// candidate found (lowest dimension, then lowest value).
    fn find_split(
        &self,
        data: ArrayView2<f64>,
        idx: usize,
        min_leaf_size: usize,
    ) -> Option<SplitCandidate> {
        let node = &self.nodes[idx];
        let count = node.count();
        let mut best: Option<SplitCandidate> = None;

        for dim in 0..self.n_dims {
            let lo = node.min_vals[dim];
            let hi = node.max_vals[dim];
            let width = hi - lo;
            if width <= 0.0 {
                continue;
            }

            let mut coords: Vec<f64> = self.point_order[node.start..node.end]
                .iter()
                .map(|&j| data[[dim, j]])
                .collect();
            coords.sort_by(|a, b| a.total_cmp(b));

            let log_volume_without_dim = node.log_volume - width.ln();
            let mut dim_best: Option<(f64, f64, usize)> = None;

            for i in (min_leaf_size - 1)..(count - min_leaf_size) {
                if coords[i] == coords[i + 1] {
                    continue;
                }
                let mut value = 0.5 * (coords[i] + coords[i + 1]);
                if !(value >= coords[i] && value < coords[i + 1]) {
                    value = coords[i];
                }
                if value <= lo || value >= hi {
                    continue;
                }

                let left = (i + 1) as f64;
                let right = (count - i - 1) as f64;
                let score = left * left / (value - lo) + right * right / (hi - value);
                if dim_best.map_or(true, |(best_score, _, _)| score > best_score) {
                    dim_best = Some((score, value, i + 1));
                }
            }

            if let Some((score, value, left_count)) = dim_best {
                let log_score = score.ln() - log_volume_without_dim;
                if best.map_or(true, |b| log_score > b.log_score) {
                    best = Some(SplitCandidate {
                        split: Split::new(dim, value),
                        left_count,
                        log_score,
                    });
                }
            }
        }

        best
    }

    fn split_node(
        &mut self,
        data: ArrayView2<f64>,
        idx: usize,
        candidate: SplitCandidate,
    ) -> (usize, usize) {
        let split = candidate.split;
        let (start, end) = (self.nodes[idx].start, self.nodes[idx].end);

        let (left_points, right_points): (Vec<usize>, Vec<usize>) = self.point_order[start..end]
            .iter()
            .partition(|&&j| split.goes_left(data[[split.dim, j]]));
        debug_assert_eq!(left_points.len(), candidate.left_count);
        let middle = start + left_points.len();
        self.point_order[start..middle].copy_from_slice(&left_points);
        self.point_order[middle..end].copy_from_slice(&right_points);

        let mut left_max = self.nodes[idx].max_vals.clone();
        left_max[split.dim] = split.value;
        let left_min = self.nodes[idx].min_vals.clone();
        let mut right_min = self.nodes[idx].min_vals.clone();
        right_min[split.dim] = split.value;
        let right_max = self.nodes[idx].max_vals.clone();

        let left = self.new_node(left_min, left_max, start, middle, Some(idx));
        let right = self.new_node(right_min, right_max, middle, end, Some(idx));

        let node = &mut self.nodes[idx];
        node.split = Some(split);
        node.left = Some(left);
        node.right = Some(right);
        (left, right)
    }

    /// Recompute subtree statistics of an internal node from its children
    fn refresh(&mut self, idx: usize) {
        let (left, right) = match (self.nodes[idx].left, self.nodes[idx].right) {
            (Some(left), Some(right)) => (left, right),
            _ => return,
        };
        let subtree_error = self.nodes[left].subtree_error + self.nodes[right].subtree_error;
        let subtree_leaves = self.nodes[left].subtree_leaves + self.nodes[right].subtree_leaves;
        let subtree_complexity =
            self.nodes[left].subtree_complexity + self.nodes[right].subtree_complexity;
        let own_complexity = self.leaf_complexity(self.nodes[idx].log_volume);

        let node = &mut self.nodes[idx];
        node.subtree_error = subtree_error;
        node.subtree_leaves = subtree_leaves;
        node.subtree_complexity = subtree_complexity;

        let gain = (node.error - subtree_error).max(0.0);
        let complexity_drop = subtree_complexity - own_complexity;
        node.alpha = if complexity_drop > 0.0 {
            gain / complexity_drop
        } else {
            0.0
        };
    }

    fn refresh_all(&mut self) {
        for idx in self.preorder().into_iter().rev() {
            self.refresh(idx);
        }
    }
}

/// Log volume of a box; zero-width dimensions contribute a unit factor
fn log_volume(min_vals: &[f64], max_vals: &[f64]) -> f64 {
    min_vals
        .iter()
        .zip(max_vals)
        .map(|(lo, hi)| hi - lo)
        .filter(|&width| width > 0.0)
        .map(f64::ln)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn square_corners() -> Array2<f64> {
        // Columns are the points (0,0), (0,1), (1,0), (1,1)
        array![[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]]
    }

    fn grid(n: usize) -> Array2<f64> {
        let mut data = Array2::zeros((2, n * n));
        for i in 0..n {
            for j in 0..n {
                let col = i * n + j;
                data[[0, col]] = i as f64 + 0.1 * j as f64;
                data[[1, col]] = (j * j) as f64 * 0.3 + 0.05 * i as f64;
            }
        }
        data
    }

    fn leaf_count_sum(tree: &DensityTree) -> usize {
        tree.leaves().iter().map(|&l| tree.node(l).count()).sum()
    }

    #[test]
    fn test_square_corners_split_on_first_dimension() {
        let data = square_corners();
        let tree = DensityTree::grow(data.view(), 2, 1, false).unwrap();

        assert_eq!(tree.num_leaves(), 2);
        let root = tree.node(tree.root());
        assert_eq!(root.split, Some(Split::new(0, 0.5)));

        for leaf in tree.leaves() {
            assert_eq!(tree.node(leaf).count(), 2);
            assert_relative_eq!(tree.node(leaf).density, 1.0);
        }
    }

    #[test]
    fn test_leaf_counts_sum_to_total() {
        let data = grid(7);
        let tree = DensityTree::grow(data.view(), 4, 2, false).unwrap();
        assert!(tree.num_leaves() > 1);
        assert_eq!(leaf_count_sum(&tree), 49);
    }

    #[test]
    fn test_leaves_partition_root_box() {
        let data = grid(6);
        let tree = DensityTree::grow(data.view(), 3, 1, false).unwrap();

        let root_volume = tree.node(tree.root()).log_volume.exp();
        let leaf_volume: f64 = tree
            .leaves()
            .iter()
            .map(|&l| tree.node(l).log_volume.exp())
            .sum();
        assert_relative_eq!(leaf_volume, root_volume, max_relative = 1e-9);

        // Every training point falls in exactly one leaf box, the leaf that owns it
        for (col, point) in data.columns().into_iter().enumerate() {
            let containing: Vec<usize> = tree
                .leaves()
                .into_iter()
                .filter(|&l| {
                    let node = tree.node(l);
                    let root = tree.node(tree.root());
                    point.iter().enumerate().all(|(d, &x)| {
                        (x > node.min_vals[d] || node.min_vals[d] == root.min_vals[d])
                            && x <= node.max_vals[d]
                    })
                })
                .collect();
            assert_eq!(containing.len(), 1, "point {} in {:?}", col, containing);
            assert!(tree.point_indices(containing[0]).contains(&col));
            assert_eq!(tree.find_leaf(point), containing[0]);
        }
    }

    #[test]
    fn test_children_partition_parent() {
        let data = grid(5);
        let tree = DensityTree::grow(data.view(), 2, 1, false).unwrap();
        for idx in tree.preorder() {
            let node = tree.node(idx);
            if let (Some(split), Some(l), Some(r)) = (node.split, node.left, node.right) {
                let (left, right) = (tree.node(l), tree.node(r));
                assert_eq!(left.count() + right.count(), node.count());
                assert_eq!(left.max_vals[split.dim], split.value);
                assert_eq!(right.min_vals[split.dim], split.value);
                assert_eq!(left.min_vals[split.dim], node.min_vals[split.dim]);
                assert_eq!(right.max_vals[split.dim], node.max_vals[split.dim]);
            }
        }
    }

    #[test]
    fn test_min_leaf_size_respected() {
        let data = grid(6);
        let tree = DensityTree::grow(data.view(), 5, 3, false).unwrap();
        for leaf in tree.leaves() {
            assert!(tree.node(leaf).count() >= 3);
        }
    }

    #[test]
    fn test_all_dimensions_degenerate_forces_leaf() {
        let data = Array2::from_elem((3, 20), 4.2);
        let tree = DensityTree::grow(data.view(), 2, 1, false).unwrap();
        assert_eq!(tree.num_leaves(), 1);
        assert!(tree.node(tree.root()).density.is_finite());
    }

    #[test]
    fn test_degenerate_dimension_never_split() {
        // Second dimension is constant
        let data = array![[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], [7.0, 7.0, 7.0, 7.0, 7.0, 7.0]];
        let tree = DensityTree::grow(data.view(), 1, 1, false).unwrap();
        for idx in tree.preorder() {
            if let Some(split) = tree.node(idx).split {
                assert_eq!(split.dim, 0);
            }
        }
        assert_eq!(leaf_count_sum(&tree), 6);
    }

    #[test]
    fn test_growth_is_deterministic() {
        let data = grid(6);
        let a = DensityTree::grow(data.view(), 3, 1, false).unwrap();
        let b = DensityTree::grow(data.view(), 3, 1, false).unwrap();
        let splits_a: Vec<_> = a.preorder().iter().map(|&i| a.node(i).split).collect();
        let splits_b: Vec<_> = b.preorder().iter().map(|&i| b.node(i).split).collect();
        assert_eq!(splits_a, splits_b);
    }

    #[test]
    fn test_compute_value_outside_and_mismatch() {
        let data = square_corners();
        let tree = DensityTree::grow(data.view(), 2, 1, false).unwrap();

        assert_eq!(tree.compute_value(array![5.0, 5.0].view()).unwrap(), 0.0);
        assert_relative_eq!(tree.compute_value(array![0.25, 0.5].view()).unwrap(), 1.0);
        assert_relative_eq!(tree.log_density(array![0.25, 0.5].view()).unwrap(), 0.0);
        assert!(matches!(
            tree.compute_value(array![0.5].view()),
            Err(TreeError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_invalid_leaf_sizes() {
        let data = square_corners();
        assert!(matches!(
            DensityTree::grow(data.view(), 1, 2, false),
            Err(TreeError::InvalidParameter(_))
        ));
        assert!(matches!(
            DensityTree::grow(data.view(), 2, 0, false),
            Err(TreeError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_empty_dataset() {
        let data = Array2::<f64>::zeros((2, 0));
        assert!(matches!(
            DensityTree::grow(data.view(), 2, 1, false),
            Err(TreeError::EmptyDataset)
        ));
    }

    #[test]
    fn test_tagging_modes() {
        let data = grid(5);
        let mut tree = DensityTree::grow(data.view(), 3, 1, false).unwrap();

        let leaves = tree.tag_tree(false);
        assert_eq!(leaves, tree.num_leaves());
        let tags: Vec<_> = tree.leaves().iter().map(|&l| tree.node(l).tag).collect();
        assert_eq!(tags, (0..leaves).map(Some).collect::<Vec<_>>());
        assert_eq!(tree.node(tree.root()).tag, None);

        let all = tree.tag_tree(true);
        assert_eq!(all, tree.preorder().len());
        assert_eq!(tree.node(tree.root()).tag, Some(0));
    }

    #[test]
    fn test_walk_events_balanced() {
        let data = grid(4);
        let tree = DensityTree::grow(data.view(), 2, 1, false).unwrap();

        let mut depth = 0i32;
        let mut entered = 0;
        tree.walk(|_, event| match event {
            WalkEvent::Enter { .. } => {
                depth += 1;
                entered += 1;
            }
            WalkEvent::Leave { .. } => depth -= 1,
        });
        assert_eq!(depth, 0);
        assert_eq!(entered, tree.preorder().len());
    }

    #[test]
    fn test_follow_path() {
        let data = square_corners();
        let tree = DensityTree::grow(data.view(), 2, 1, false).unwrap();
        let left = tree.follow_path(&[true]).unwrap();
        assert_eq!(Some(left), tree.node(tree.root()).left);
        assert_eq!(tree.follow_path(&[]), Some(tree.root()));
        assert_eq!(tree.follow_path(&[true, true]), None);
    }

    #[test]
    fn test_collapse_releases_slots() {
        let data = grid(5);
        let mut tree = DensityTree::grow(data.view(), 2, 1, false).unwrap();
        let before = tree.preorder().len();
        let root = tree.root();
        tree.collapse(root);

        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.num_free_slots(), before - 1);
        assert_eq!(tree.node(root).alpha, LEAF_ALPHA);
        assert_relative_eq!(tree.node(root).density * tree.node(root).log_volume.exp(), 1.0);
    }

    #[test]
    fn test_alpha_non_negative() {
        let data = grid(6);
        let tree = DensityTree::grow(data.view(), 3, 1, true).unwrap();
        for idx in tree.preorder() {
            assert!(tree.node(idx).alpha >= 0.0);
        }
    }

    #[test]
    fn test_variable_importance() {
        // Points spread along dimension 0 only
        let data = array![[0.0, 0.1, 0.2, 5.0, 5.1, 5.2], [1.0, 1.0, 1.0, 1.0, 1.0, 1.0]];
        let tree = DensityTree::grow(data.view(), 3, 1, false).unwrap();
        let importance = tree.variable_importance();
        assert_eq!(importance.len(), 2);
        assert!(importance[0] > 0.0);
        assert_eq!(importance[1], 0.0);
    }
}
