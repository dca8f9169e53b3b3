//! Cover tree over a kernel-dependent metric
//!
//! Kernels that are inner products in some feature space are indexed under
//! `d(x, y) = sqrt(K(x, x) + K(y, y) - 2 K(x, y))`; every other kernel is
//! indexed under the Euclidean distance (see [`Metric`]). A node at scale `s`
//! covers its descendants within `base^s`; its children sit at lower scales.
//! The first child of every internal node is a "self-child" sharing the
//! node's point, so every point appears as exactly one leaf.
//!
//! Each node records the largest distance from its point to any
//! descendant, which is what the search bounds use.

use crate::core::{Result, TreeError};
use crate::fastmks::bounds::{KernelBound, Metric};
use crate::kernel::{squared_distance, Kernel, KernelFunction};
use crate::utils::validation;
use log::debug;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Scale assigned to leaves
pub const LEAF_SCALE: i32 = i32::MIN;

/// Default expansion constant
pub const DEFAULT_BASE: f64 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverTreeNode {
    /// Index of the node's point in the indexed dataset
    pub point: usize,
    pub scale: i32,
    pub children: Vec<usize>,
    /// Distance from the parent's point to this node's point
    pub parent_distance: f64,
    /// Largest distance from `point` to any descendant point
    pub furthest_descendant_distance: f64,
    /// Start of this node's points in the tree's leaf order
    pub leaf_begin: usize,
    /// Number of points below this node
    pub leaf_count: usize,
}

impl CoverTreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Cover tree over the columns of a D×N dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverTree {
    nodes: Vec<CoverTreeNode>,
    base: f64,
    /// Points in leaf (depth-first) order
    leaf_order: Vec<usize>,
    metric: Metric,
    /// Norm of every indexed point in the metric's space
    norms: Vec<f64>,
}

impl CoverTree {
    /// Build a cover tree, rooted at point 0, over the columns of `data`
    pub fn build(data: ArrayView2<f64>, kernel: &KernelFunction, base: f64) -> Result<Self> {
        if !(base > 1.0) || !base.is_finite() {
            return Err(TreeError::InvalidParameter(format!(
                "Cover tree base must be greater than 1, got: {}",
                base
            )));
        }
        validation::check_dataset(data)?;

        let bound = KernelBound::new(*kernel);
        let mut builder = Builder {
            data,
            kernel: *kernel,
            metric: bound.metric(),
            norms: data.columns().into_iter().map(|x| bound.norm(x)).collect(),
            base,
            nodes: Vec::with_capacity(2 * data.ncols()),
            leaf_order: Vec::with_capacity(data.ncols()),
        };

        let candidates: Vec<(usize, f64)> = (1..data.ncols())
            .map(|i| (i, builder.distance(0, i)))
            .collect();
        builder.build_node(0, candidates, 0.0);

        let tree = Self {
            nodes: builder.nodes,
            base,
            leaf_order: builder.leaf_order,
            metric: builder.metric,
            norms: builder.norms,
        };
        debug!(
            "Built cover tree: {} points, {} nodes, {:?} metric, base {}, root scale {}",
            tree.n_points(),
            tree.num_nodes(),
            tree.metric,
            base,
            tree.nodes[0].scale
        );
        Ok(tree)
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn node(&self, idx: usize) -> &CoverTreeNode {
        &self.nodes[idx]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_points(&self) -> usize {
        self.leaf_order.len()
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    /// Points below a node
    pub fn points(&self, idx: usize) -> &[usize] {
        let node = &self.nodes[idx];
        &self.leaf_order[node.leaf_begin..node.leaf_begin + node.leaf_count]
    }

    /// Metric the tree was built with
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Norm of an indexed point: `sqrt(K(x, x))` under the feature-space
    /// metric, `||x||` under the Euclidean one
    pub fn norm(&self, point: usize) -> f64 {
        self.norms[point]
    }

    /// Number of levels from the root to the deepest leaf
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root(), 1)];
        while let Some((idx, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(self.nodes[idx].children.iter().map(|&c| (c, depth + 1)));
        }
        deepest
    }
}

struct Builder<'a> {
    data: ArrayView2<'a, f64>,
    kernel: KernelFunction,
    metric: Metric,
    norms: Vec<f64>,
    base: f64,
    nodes: Vec<CoverTreeNode>,
    leaf_order: Vec<usize>,
}

impl Builder<'_> {
    fn distance(&self, a: usize, b: usize) -> f64 {
        let (x, y) = (self.data.column(a), self.data.column(b));
        match self.metric {
            Metric::FeatureSpace => {
                let (na, nb) = (self.norms[a], self.norms[b]);
                (na * na + nb * nb - 2.0 * self.kernel.compute(x, y))
                    .max(0.0)
                    .sqrt()
            }
            Metric::Euclidean => squared_distance(x, y).sqrt(),
        }
    }

    /// Build the subtree of `point` over `candidates` (index, distance to `point`)
    fn build_node(
        &mut self,
        point: usize,
        candidates: Vec<(usize, f64)>,
        parent_distance: f64,
    ) -> usize {
        let idx = self.nodes.len();
        let leaf_begin = self.leaf_order.len();
        self.nodes.push(CoverTreeNode {
            point,
            scale: LEAF_SCALE,
            children: Vec::new(),
            parent_distance,
            furthest_descendant_distance: 0.0,
            leaf_begin,
            leaf_count: 1,
        });

        if candidates.is_empty() {
            self.leaf_order.push(point);
            return idx;
        }

        let max_distance = candidates.iter().map(|c| c.1).fold(0.0, f64::max);
        let mut children = Vec::new();
        let scale;

        if max_distance <= 0.0 {
            // Duplicates of `point` all become leaves
            scale = LEAF_SCALE + 1;
            children.push(self.build_node(point, Vec::new(), 0.0));
            for (duplicate, _) in candidates {
                children.push(self.build_node(duplicate, Vec::new(), 0.0));
            }
        } else {
            scale = scale_for(max_distance, self.base);
            let radius = self.base.powi(scale - 1);
            let (near, mut far): (Vec<_>, Vec<_>) =
                candidates.into_iter().partition(|c| c.1 <= radius);

            children.push(self.build_node(point, near, 0.0));

            // Greedily cover the remaining points in index order
            while let Some(&(center, center_distance)) = far.first() {
                let mut group = Vec::new();
                let mut rest = Vec::new();
                for &(candidate, to_point) in &far[1..] {
                    let d = self.distance(center, candidate);
                    if d <= radius {
                        group.push((candidate, d));
                    } else {
                        rest.push((candidate, to_point));
                    }
                }
                far = rest;
                children.push(self.build_node(center, group, center_distance));
            }
        }

        let leaf_count = self.leaf_order.len() - leaf_begin;
        let node = &mut self.nodes[idx];
        node.scale = scale;
        node.children = children;
        node.furthest_descendant_distance = max_distance;
        node.leaf_count = leaf_count;
        idx
    }
}

/// Smallest scale `s` with `base^s >= distance`
fn scale_for(distance: f64, base: f64) -> i32 {
    let mut scale = (distance.ln() / base.ln()).ceil() as i32;
    while base.powi(scale) < distance {
        scale += 1;
    }
    while base.powi(scale - 1) >= distance {
        scale -= 1;
    }
    scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{GaussianKernel, HyperbolicTangentKernel, LinearKernel};
    use ndarray::{array, Array2};

    fn scattered(n: usize) -> Array2<f64> {
        let mut data = Array2::zeros((3, n));
        for j in 0..n {
            let t = j as f64;
            data[[0, j]] = (t * 0.7).sin() * 3.0;
            data[[1, j]] = (t * 1.9).cos() * 2.0;
            data[[2, j]] = (t * 0.31).sin() + 0.1 * t;
        }
        data
    }

    fn linear() -> KernelFunction {
        KernelFunction::Linear(LinearKernel::new())
    }

    #[test]
    fn test_every_point_is_one_leaf() {
        let data = scattered(50);
        let tree = CoverTree::build(data.view(), &linear(), 2.0).unwrap();

        let mut seen = vec![0; 50];
        for idx in 0..tree.num_nodes() {
            if tree.node(idx).is_leaf() {
                seen[tree.node(idx).point] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));

        let mut order = tree.points(tree.root()).to_vec();
        order.sort_unstable();
        assert_eq!(order, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_descendants_within_furthest_distance() {
        let data = scattered(40);
        let kernels = [
            linear(),
            KernelFunction::Gaussian(GaussianKernel::new(0.5)),
            KernelFunction::Hyptan(HyperbolicTangentKernel::new(0.5, 0.3)),
        ];
        for kernel in kernels {
            let bound = KernelBound::new(kernel);
            let tree = CoverTree::build(data.view(), &kernel, 1.5).unwrap();

            for idx in 0..tree.num_nodes() {
                let node = tree.node(idx);
                for &p in tree.points(idx) {
                    let d = bound.distance(data.column(node.point), data.column(p));
                    assert!(d <= node.furthest_descendant_distance + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_metric_follows_kernel() {
        let data = scattered(10);
        let tree = CoverTree::build(data.view(), &linear(), 2.0).unwrap();
        assert_eq!(tree.metric(), Metric::FeatureSpace);

        // The Gaussian feature space is bounded; its tree uses input distances
        let kernel = KernelFunction::Gaussian(GaussianKernel::new(0.5));
        let tree = CoverTree::build(data.view(), &kernel, 2.0).unwrap();
        assert_eq!(tree.metric(), Metric::Euclidean);
        assert!(tree.node(tree.root()).furthest_descendant_distance > 2.0);
    }

    #[test]
    fn test_children_structure() {
        let data = scattered(40);
        let tree = CoverTree::build(data.view(), &linear(), 2.0).unwrap();

        for idx in 0..tree.num_nodes() {
            let node = tree.node(idx);
            if node.is_leaf() {
                assert_eq!(node.scale, LEAF_SCALE);
                continue;
            }
            let first = tree.node(node.children[0]);
            assert_eq!(first.point, node.point);
            assert_eq!(first.parent_distance, 0.0);

            let covered: usize = node.children.iter().map(|&c| tree.node(c).leaf_count).sum();
            assert_eq!(covered, node.leaf_count);
            for &child in &node.children {
                assert!(tree.node(child).scale < node.scale);
            }
        }
    }

    #[test]
    fn test_duplicate_points() {
        let data = Array2::from_elem((2, 6), 1.5);
        let tree = CoverTree::build(data.view(), &linear(), 2.0).unwrap();
        let root = tree.node(tree.root());
        assert_eq!(root.children.len(), 6);
        assert_eq!(root.furthest_descendant_distance, 0.0);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_single_point() {
        let data = array![[1.0], [2.0]];
        let tree = CoverTree::build(data.view(), &linear(), 2.0).unwrap();
        assert_eq!(tree.num_nodes(), 1);
        assert!(tree.node(0).is_leaf());
        assert_eq!(tree.points(0), &[0]);
    }

    #[test]
    fn test_invalid_base_and_empty_data() {
        let data = scattered(5);
        for base in [1.0, 0.5, -2.0, f64::NAN] {
            assert!(matches!(
                CoverTree::build(data.view(), &linear(), base),
                Err(TreeError::InvalidParameter(_))
            ));
        }
        let empty = Array2::<f64>::zeros((3, 0));
        assert!(matches!(
            CoverTree::build(empty.view(), &linear(), 2.0),
            Err(TreeError::EmptyDataset)
        ));
    }

    #[test]
    fn test_norms_follow_metric() {
        let data = scattered(10);
        let kernel = KernelFunction::Gaussian(GaussianKernel::new(0.5));
        let tree = CoverTree::build(data.view(), &kernel, 2.0).unwrap();
        for p in 0..10 {
            let x = data.column(p);
            assert!((tree.norm(p) - x.dot(&x).sqrt()).abs() < 1e-12);
        }

        let tree = CoverTree::build(data.view(), &linear(), 2.0).unwrap();
        for p in 0..10 {
            let x = data.column(p);
            assert!((tree.norm(p) - x.dot(&x).sqrt()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_scale_for() {
        assert_eq!(scale_for(1.0, 2.0), 0);
        assert_eq!(scale_for(1.5, 2.0), 1);
        assert_eq!(scale_for(4.0, 2.0), 2);
        assert_eq!(scale_for(0.3, 2.0), -1);
    }
}
