//! Utility functions shared by the tree builders

use crate::core::{Result, TreeError};
use ndarray::{Array2, ArrayView2, Axis};

/// Dataset and parameter validation
pub mod validation {
    use super::*;

    /// Check that a D×N dataset has points and only finite coordinates
    pub fn check_dataset(data: ArrayView2<f64>) -> Result<()> {
        if data.ncols() == 0 {
            return Err(TreeError::EmptyDataset);
        }
        if data.nrows() == 0 {
            return Err(TreeError::InvalidDataset(
                "Points must have at least one dimension".to_string(),
            ));
        }
        if let Some(((dim, point), value)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(TreeError::InvalidDataset(format!(
                "Non-finite value {} at point {}, dimension {}",
                value, point, dim
            )));
        }
        Ok(())
    }

    /// Check the leaf size limits used when growing density trees
    pub fn check_leaf_sizes(max_leaf_size: usize, min_leaf_size: usize) -> Result<()> {
        if min_leaf_size == 0 {
            return Err(TreeError::InvalidParameter(
                "Minimum leaf size must be at least 1".to_string(),
            ));
        }
        if min_leaf_size > max_leaf_size {
            return Err(TreeError::InvalidParameter(format!(
                "Minimum leaf size ({}) must not exceed maximum leaf size ({})",
                min_leaf_size, max_leaf_size
            )));
        }
        Ok(())
    }

    /// Check that two point sets share dimensionality
    pub fn check_same_dims(expected: usize, actual: usize) -> Result<()> {
        if expected != actual {
            return Err(TreeError::DimensionMismatch { expected, actual });
        }
        Ok(())
    }

    /// Tight per-dimension bounds of the points
    pub fn bounding_box(data: ArrayView2<f64>) -> (Vec<f64>, Vec<f64>) {
        let mins = data
            .axis_iter(Axis(0))
            .map(|row| row.iter().fold(f64::INFINITY, |a, &b| a.min(b)))
            .collect();
        let maxs = data
            .axis_iter(Axis(0))
            .map(|row| row.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)))
            .collect();
        (mins, maxs)
    }
}

/// Cross-validation fold helpers
pub mod folds {
    use super::*;

    /// Contiguous `[start, end)` ranges splitting `n` points into `k` folds
    ///
    /// Fold sizes differ by at most one point; every point belongs to exactly
    /// one fold.
    pub fn fold_ranges(n: usize, k: usize) -> Vec<(usize, usize)> {
        (0..k).map(|f| (f * n / k, (f + 1) * n / k)).collect()
    }

    /// Split the columns of `data` into the points outside and inside `range`
    pub fn split_columns(
        data: ArrayView2<f64>,
        range: (usize, usize),
    ) -> (Array2<f64>, Array2<f64>) {
        let (start, end) = range;
        let train: Vec<usize> = (0..start).chain(end..data.ncols()).collect();
        let test: Vec<usize> = (start..end).collect();
        (data.select(Axis(1), &train), data.select(Axis(1), &test))
    }
}

/// Memory management utilities
pub mod memory {
    /// Bytes needed to cache every query/reference pair a search can evaluate
    pub fn estimate_pair_memory(n_queries: usize, n_references: usize, entry_bytes: usize) -> usize {
        n_queries.saturating_mul(n_references).saturating_mul(entry_bytes)
    }

    /// Recommend a kernel cache size in bytes for the given budget
    pub fn recommend_cache_size(
        n_queries: usize,
        n_references: usize,
        entry_bytes: usize,
        available_memory_mb: usize,
    ) -> usize {
        let available_bytes = available_memory_mb.saturating_mul(1024 * 1024);
        let full_cache_size = estimate_pair_memory(n_queries, n_references, entry_bytes);

        // Use at most 50% of available memory for cache
        full_cache_size.min(available_bytes / 2)
    }
}
