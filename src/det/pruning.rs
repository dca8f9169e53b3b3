//! Minimal cost-complexity pruning
//!
//! The weakest link of a tree is the internal node whose collapse costs the
//! least error per unit of complexity removed:
//!
//! ```text
//! g(t) = (R(t) - R(T_t)) / (C(T_t) - C(t))
//! ```
//!
//! Collapsing weakest links one at a time yields a nested sequence of trees
//! with non-decreasing alpha, ending at the single-leaf tree.

use crate::core::{Result, TreeError};
use crate::det::dtree::DensityTree;
use log::debug;
use serde::{Deserialize, Serialize};

/// One state of the pruning sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruningStep {
    /// Complexity parameter at which this state is reached
    pub alpha: f64,
    /// Node collapsed to reach this state from the previous one
    pub collapsed: Option<usize>,
    /// Leaves remaining in this state
    pub num_leaves: usize,
    /// Sum of leaf errors in this state
    pub error: f64,
}

/// Ordered pruning states, from the unpruned tree to a single leaf
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PruningSequence {
    steps: Vec<PruningStep>,
}

impl PruningSequence {
    /// Compute the weakest-link sequence of `tree` without modifying it
    ///
    /// Step 0 is the tree itself at alpha 0. Each later step collapses exactly
    /// one node, the one with the smallest alpha (first in pre-order on ties).
    pub fn compute(tree: &DensityTree) -> Self {
        let mut work = tree.clone();
        let root = work.root();
        let mut steps = vec![PruningStep {
            alpha: 0.0,
            collapsed: None,
            num_leaves: work.num_leaves(),
            error: work.node(root).subtree_error,
        }];

        let mut last_alpha = 0.0;
        while let Some((idx, alpha)) = work.weakest_link() {
            work.collapse(idx);
            // Clamp rounding noise so the sequence stays monotone
            let alpha = alpha.max(last_alpha);
            last_alpha = alpha;
            steps.push(PruningStep {
                alpha,
                collapsed: Some(idx),
                num_leaves: work.num_leaves(),
                error: work.node(root).subtree_error,
            });
        }

        debug!(
            "Pruning sequence: {} states, alpha range [0, {}]",
            steps.len(),
            last_alpha
        );
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[PruningStep] {
        &self.steps
    }

    pub fn step(&self, i: usize) -> Option<&PruningStep> {
        self.steps.get(i)
    }

    pub fn alphas(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.alpha).collect()
    }

    /// Representative alpha of state `i`: the midpoint to the next state's alpha
    pub fn cutoff(&self, i: usize) -> Option<f64> {
        let current = self.steps.get(i)?.alpha;
        Some(match self.steps.get(i + 1) {
            Some(next) => 0.5 * (current + next.alpha),
            None => current,
        })
    }
}

impl DensityTree {
    /// Weakest-link pruning sequence of this tree
    pub fn pruning_sequence(&self) -> PruningSequence {
        PruningSequence::compute(self)
    }

    /// Copy of this tree pruned to state `step` of `sequence`
    ///
    /// `sequence` must have been computed from this tree.
    pub fn pruned_to_step(&self, sequence: &PruningSequence, step: usize) -> Result<DensityTree> {
        if step >= sequence.len() {
            return Err(TreeError::InvalidParameter(format!(
                "Pruning step {} out of range (sequence has {} states)",
                step,
                sequence.len()
            )));
        }
        let mut pruned = self.clone();
        for state in &sequence.steps()[1..=step] {
            if let Some(idx) = state.collapsed {
                pruned.collapse(idx);
            }
        }
        Ok(pruned)
    }

    /// Collapse weakest links while their alpha is strictly below `cutoff`
    ///
    /// Returns the number of nodes collapsed.
    pub fn prune_below(&mut self, cutoff: f64) -> usize {
        let mut collapsed = 0;
        while let Some((idx, alpha)) = self.weakest_link() {
            if alpha >= cutoff {
                break;
            }
            self.collapse(idx);
            collapsed += 1;
        }
        collapsed
    }
}
