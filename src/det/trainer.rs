//! Cross-validated density tree training
//!
//! ```rust,no_run
//! use rtrees::det::Trainer;
//! use ndarray::Array2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = Array2::<f64>::zeros((2, 100));
//! let tree = Trainer::new()
//!     .with_folds(5)
//!     .with_leaf_sizes(10, 5)
//!     .train(data.view())?;
//! println!("{} leaves", tree.num_leaves());
//! # Ok(())
//! # }
//! ```

use crate::core::{Result, TreeError, TrainerConfig};
use crate::det::dtree::DensityTree;
use crate::utils::{folds, validation};
use log::{debug, info, warn};
use ndarray::{ArrayView2, Axis};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Builder for cross-validated density tree training
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    /// Create a trainer with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Set the number of cross-validation folds
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.config.folds = folds;
        self
    }

    /// Set maximum and minimum leaf sizes
    pub fn with_leaf_sizes(mut self, max_leaf_size: usize, min_leaf_size: usize) -> Self {
        self.config.max_leaf_size = max_leaf_size;
        self.config.min_leaf_size = min_leaf_size;
        self
    }

    /// Use volume-weighted complexity when pruning
    pub fn with_volume_regularization(mut self, enabled: bool) -> Self {
        self.config.use_volume_reg = enabled;
        self
    }

    /// Write training point densities under the unpruned tree to `path`
    pub fn with_unpruned_output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.unpruned_tree_output = Some(path.into());
        self
    }

    /// Return the unpruned tree without cross-validation
    pub fn with_skip_pruning(mut self, skip: bool) -> Self {
        self.config.skip_pruning = skip;
        self
    }

    /// Train on a D×N dataset and return the selected tree
    ///
    /// The full-data tree's pruning sequence provides candidate alphas. Each
    /// fold grows a tree on the remaining points, prunes it at every
    /// candidate's cutoff and scores the held-out points by average
    /// log-density. The candidate with the highest summed score wins, ties
    /// going to the larger alpha.
    pub fn train(&self, data: ArrayView2<f64>) -> Result<DensityTree> {
        self.validate(data)?;
        let config = &self.config;
        let n_points = data.ncols();

        info!(
            "Training density tree on {} points ({} dims), leaf sizes [{}, {}]",
            n_points,
            data.nrows(),
            config.min_leaf_size,
            config.max_leaf_size
        );

        let mut full = DensityTree::grow(
            data,
            config.max_leaf_size,
            config.min_leaf_size,
            config.use_volume_reg,
        )?;
        info!("Unpruned tree has {} leaves", full.num_leaves());

        if let Some(path) = &config.unpruned_tree_output {
            write_densities(&full, data, path)?;
        }

        if config.skip_pruning || config.folds == 1 {
            debug!("Skipping cross-validated pruning");
            full.tag_tree(false);
            return Ok(full);
        }

        let sequence = full.pruning_sequence();
        if sequence.len() < 2 {
            full.tag_tree(false);
            return Ok(full);
        }

        // The final single-leaf state is never a candidate
        let n_candidates = sequence.len() - 1;
        let cutoffs: Vec<f64> = (0..n_candidates)
            .filter_map(|i| sequence.cutoff(i))
            .collect();

        let ranges = folds::fold_ranges(n_points, config.folds);
        let fold_scores = ranges
            .par_iter()
            .map(|&range| self.score_fold(data, range, &cutoffs))
            .collect::<Result<Vec<_>>>()?;

        let mut totals = vec![0.0; n_candidates];
        for (fold, scores) in fold_scores.iter().enumerate() {
            let mut scored = false;
            for (total, score) in totals.iter_mut().zip(scores) {
                if let Some(score) = score {
                    *total += score;
                    scored = true;
                }
            }
            if !scored {
                warn!("Fold {} had no held-out points inside its tree's support", fold);
            }
        }

        let best = select_best(&totals);
        let alpha = sequence.step(best).map_or(0.0, |s| s.alpha);
        debug!("Cross-validation scores: {:?}", totals);

        let mut tree = full.pruned_to_step(&sequence, best)?;
        tree.tag_tree(false);
        info!(
            "Selected pruning step {} (alpha = {:e}): {} leaves",
            best,
            alpha,
            tree.num_leaves()
        );
        Ok(tree)
    }

    fn validate(&self, data: ArrayView2<f64>) -> Result<()> {
        let config = &self.config;
        validation::check_dataset(data)?;
        validation::check_leaf_sizes(config.max_leaf_size, config.min_leaf_size)?;
        if config.folds == 0 {
            return Err(TreeError::InvalidParameter(
                "Number of folds must be at least 1".to_string(),
            ));
        }
        if config.folds > data.ncols() {
            return Err(TreeError::InvalidParameter(format!(
                "Number of folds ({}) exceeds number of points ({})",
                config.folds,
                data.ncols()
            )));
        }
        Ok(())
    }

    /// Average held-out log-density for every candidate cutoff
    ///
    /// `None` marks cutoffs where no held-out point has positive density.
    fn score_fold(
        &self,
        data: ArrayView2<f64>,
        range: (usize, usize),
        cutoffs: &[f64],
    ) -> Result<Vec<Option<f64>>> {
        let (train, test) = folds::split_columns(data, range);
        let mut tree = DensityTree::grow(
            train.view(),
            self.config.max_leaf_size,
            self.config.min_leaf_size,
            self.config.use_volume_reg,
        )?;

        let mut scores = Vec::with_capacity(cutoffs.len());
        for &cutoff in cutoffs {
            tree.prune_below(cutoff);
            scores.push(held_out_log_likelihood(&tree, test.view())?);
        }
        Ok(scores)
    }
}

/// Mean natural-log density of points inside the tree's support
fn held_out_log_likelihood(tree: &DensityTree, test: ArrayView2<f64>) -> Result<Option<f64>> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for point in test.axis_iter(Axis(1)) {
        let density = tree.compute_value(point)?;
        if density > 0.0 {
            sum += density.ln();
            count += 1;
        }
    }
    Ok((count > 0).then(|| sum / count as f64))
}

/// Index of the highest score, preferring later (simpler) candidates on ties
fn select_best(totals: &[f64]) -> usize {
    let mut best = 0;
    for (i, &score) in totals.iter().enumerate() {
        if score >= totals[best] {
            best = i;
        }
    }
    best
}

/// Write the density of every training point, one per line
fn write_densities(tree: &DensityTree, data: ArrayView2<f64>, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for value in tree.compute_values(data)? {
        writeln!(writer, "{}", value)?;
    }
    writer.flush()?;
    info!("Wrote unpruned densities to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};
    use tempfile::tempdir;

    fn bimodal(n: usize) -> Array2<f64> {
        let mut data = Array2::zeros((2, n));
        for j in 0..n {
            let t = j as f64;
            let center = if j % 2 == 0 { 0.0 } else { 8.0 };
            data[[0, j]] = center + (t * 1.7).sin();
            data[[1, j]] = center * 0.5 + (t * 0.9).cos();
        }
        data
    }

    #[test]
    fn test_square_corners_scenario() {
        let data = array![[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]];
        let tree = Trainer::new()
            .with_folds(2)
            .with_leaf_sizes(2, 1)
            .train(data.view())
            .unwrap();

        assert_eq!(tree.num_leaves(), 2);
        for leaf in tree.leaves() {
            assert_eq!(tree.node(leaf).count(), 2);
            assert!(tree.node(leaf).density > 0.0);
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let data = bimodal(10);
        let cases = [
            Trainer::new().with_leaf_sizes(2, 3),
            Trainer::new().with_folds(11),
            Trainer::new().with_folds(0),
            Trainer::new().with_leaf_sizes(2, 0),
        ];
        for trainer in cases {
            assert!(matches!(
                trainer.train(data.view()),
                Err(TreeError::InvalidParameter(_))
            ));
        }

        let empty = Array2::<f64>::zeros((2, 0));
        assert!(matches!(
            Trainer::new().train(empty.view()),
            Err(TreeError::EmptyDataset)
        ));
    }

    #[test]
    fn test_single_fold_returns_unpruned_tree() {
        let data = bimodal(80);
        let unpruned = DensityTree::grow(data.view(), 6, 3, false).unwrap();
        let tree = Trainer::new()
            .with_folds(1)
            .with_leaf_sizes(6, 3)
            .train(data.view())
            .unwrap();
        assert_eq!(tree.num_leaves(), unpruned.num_leaves());

        let skipped = Trainer::new()
            .with_folds(5)
            .with_leaf_sizes(6, 3)
            .with_skip_pruning(true)
            .train(data.view())
            .unwrap();
        assert_eq!(skipped.num_leaves(), unpruned.num_leaves());
    }

    #[test]
    fn test_cross_validation_prunes_and_tags() {
        let data = bimodal(120);
        let unpruned = DensityTree::grow(data.view(), 6, 3, false).unwrap();
        let tree = Trainer::new()
            .with_folds(4)
            .with_leaf_sizes(6, 3)
            .train(data.view())
            .unwrap();

        assert!(tree.num_leaves() >= 2);
        assert!(tree.num_leaves() <= unpruned.num_leaves());
        let tags: Vec<_> = tree.leaves().iter().map(|&l| tree.node(l).tag).collect();
        assert_eq!(tags, (0..tree.num_leaves()).map(Some).collect::<Vec<_>>());
    }

    #[test]
    fn test_training_is_deterministic() {
        let data = bimodal(90);
        let trainer = Trainer::new().with_folds(3).with_leaf_sizes(8, 2);
        let a = trainer.train(data.view()).unwrap();
        let b = trainer.train(data.view()).unwrap();

        assert_eq!(a.num_leaves(), b.num_leaves());
        let splits = |t: &DensityTree| -> Vec<_> {
            t.preorder().iter().map(|&i| t.node(i).split).collect()
        };
        assert_eq!(splits(&a), splits(&b));
    }

    #[test]
    fn test_unpruned_output_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("unpruned.txt");
        let data = bimodal(30);

        Trainer::new()
            .with_folds(3)
            .with_leaf_sizes(4, 2)
            .with_unpruned_output(&path)
            .train(data.view())
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let values: Vec<f64> = contents.lines().map(|l| l.parse().unwrap()).collect();
        assert_eq!(values.len(), 30);
        assert!(values.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_volume_regularization_trains() {
        let data = bimodal(60);
        let tree = Trainer::new()
            .with_folds(3)
            .with_leaf_sizes(6, 3)
            .with_volume_regularization(true)
            .train(data.view())
            .unwrap();
        let total: usize = tree.leaves().iter().map(|&l| tree.node(l).count()).sum();
        assert_eq!(total, 60);
    }

    #[test]
    fn test_select_best_prefers_later_on_ties() {
        assert_eq!(select_best(&[1.0, 3.0, 3.0, 2.0]), 2);
        assert_eq!(select_best(&[-1.0]), 0);
    }

    #[test]
    fn test_held_out_log_likelihood_skips_outside_points() {
        let data = array![[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]];
        let tree = DensityTree::grow(data.view(), 2, 1, false).unwrap();

        let outside = array![[5.0], [5.0]];
        assert_eq!(held_out_log_likelihood(&tree, outside.view()).unwrap(), None);

        let mixed = array![[0.25, 5.0], [0.5, 5.0]];
        let score = held_out_log_likelihood(&tree, mixed.view()).unwrap().unwrap();
        assert_relative_eq!(score, 0.0, epsilon = 1e-12);
    }
}
