//! Core type definitions shared by density trees and max-kernel search

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for cross-validated density tree training
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Number of cross-validation folds (1 disables cross-validation)
    pub folds: usize,
    /// Use the volume-weighted complexity term during pruning
    pub use_volume_reg: bool,
    /// Maximum number of points in a leaf before a split is forced
    pub max_leaf_size: usize,
    /// Minimum number of points each child of a split must hold
    pub min_leaf_size: usize,
    /// Where to write the density of every training point under the unpruned tree
    pub unpruned_tree_output: Option<PathBuf>,
    /// Return the unpruned tree without cross-validation
    pub skip_pruning: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            folds: 10,
            use_volume_reg: false,
            max_leaf_size: 10,
            min_leaf_size: 5,
            unpruned_tree_output: None,
            skip_pruning: false,
        }
    }
}

/// Axis-aligned split of a density tree node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Dimension the node is split on
    pub dim: usize,
    /// Points with `x[dim] <= value` go left
    pub value: f64,
}

impl Split {
    pub fn new(dim: usize, value: f64) -> Self {
        Self { dim, value }
    }

    /// Whether a coordinate on the split dimension belongs to the left child
    pub fn goes_left(&self, coordinate: f64) -> bool {
        coordinate <= self.value
    }
}

/// Result of a max-kernel search
///
/// Column `j` holds the results for query `j`; row `i` is the i-th best match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    /// Reference indices, shape `(k, n_queries)`
    pub indices: Array2<usize>,
    /// Kernel values, shape `(k, n_queries)`
    pub kernels: Array2<f64>,
}

impl SearchResults {
    /// Empty result for `n_queries` queries with `k` rows each
    pub fn with_shape(k: usize, n_queries: usize) -> Self {
        Self {
            indices: Array2::zeros((k, n_queries)),
            kernels: Array2::zeros((k, n_queries)),
        }
    }

    /// Number of results per query
    pub fn k(&self) -> usize {
        self.indices.nrows()
    }

    /// Number of queries answered
    pub fn n_queries(&self) -> usize {
        self.indices.ncols()
    }
}
