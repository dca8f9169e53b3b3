//! FastMKS model: reference set, kernel and search configuration

use crate::core::{Result, SearchResults, TreeError};
use crate::fastmks::cover_tree::{CoverTree, DEFAULT_BASE};
use crate::fastmks::search::{dual_tree_search, naive_search, single_tree_search};
use crate::kernel::KernelFunction;
use crate::utils::validation;
use log::{info, warn};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// A reference set indexed for max-kernel search
///
/// In naive mode no cover tree is kept. Otherwise queries are answered by
/// single-tree search (`single_mode`) or dual-tree search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastMksModel {
    kernel: KernelFunction,
    reference: Array2<f64>,
    tree: Option<CoverTree>,
    naive: bool,
    single_mode: bool,
    base: f64,
}

impl FastMksModel {
    /// Build a model over the columns of `reference`
    pub fn build(
        reference: Array2<f64>,
        kernel: KernelFunction,
        single_mode: bool,
        naive: bool,
        base: f64,
    ) -> Result<Self> {
        validation::check_dataset(reference.view())?;
        check_base(base)?;
        if naive && single_mode {
            warn!("Single-tree mode is ignored because naive search was requested");
        }

        let tree = if naive {
            None
        } else {
            Some(CoverTree::build(reference.view(), &kernel, base)?)
        };

        info!(
            "Built FastMKS model: {} reference points, kernel {}, {} search",
            reference.ncols(),
            kernel,
            mode_name(naive, single_mode)
        );
        Ok(Self {
            kernel,
            reference,
            tree,
            naive,
            single_mode,
            base,
        })
    }

    /// Build with dual-tree search and the default base
    pub fn with_kernel(reference: Array2<f64>, kernel: KernelFunction) -> Result<Self> {
        Self::build(reference, kernel, false, false, DEFAULT_BASE)
    }

    pub fn kernel(&self) -> &KernelFunction {
        &self.kernel
    }

    pub fn reference(&self) -> ArrayView2<f64> {
        self.reference.view()
    }

    pub fn tree(&self) -> Option<&CoverTree> {
        self.tree.as_ref()
    }

    pub fn naive(&self) -> bool {
        self.naive
    }

    pub fn single_mode(&self) -> bool {
        self.single_mode
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    /// Switch search strategy, building the cover tree if it is now needed
    pub fn set_search_mode(&mut self, naive: bool, single_mode: bool) -> Result<()> {
        if naive && single_mode {
            warn!("Single-tree mode is ignored because naive search was requested");
        }
        if !naive && self.tree.is_none() {
            info!("Building cover tree for {} search", mode_name(naive, single_mode));
            self.tree = Some(CoverTree::build(self.reference.view(), &self.kernel, self.base)?);
        }
        self.naive = naive;
        self.single_mode = single_mode;
        Ok(())
    }

    /// Find the `k` references with the largest kernel value for each query
    ///
    /// Without `queries` the reference set is searched against itself,
    /// excluding each point from its own results.
    pub fn search(&self, queries: Option<ArrayView2<f64>>, k: usize) -> Result<SearchResults> {
        self.search_with_base(queries, k, self.base)
    }

    /// Like [`FastMksModel::search`], building the query tree with `query_base`
    pub fn search_with_base(
        &self,
        queries: Option<ArrayView2<f64>>,
        k: usize,
        query_base: f64,
    ) -> Result<SearchResults> {
        check_base(query_base)?;
        let reference = self.reference.view();
        if self.naive {
            return naive_search(&self.kernel, reference, queries, k);
        }

        let tree = self.tree.as_ref().ok_or_else(|| {
            TreeError::InvalidParameter("Model has no cover tree for tree search".to_string())
        })?;
        if self.single_mode {
            single_tree_search(&self.kernel, reference, tree, queries, k)
        } else {
            dual_tree_search(&self.kernel, reference, tree, queries, query_base, k)
        }
    }
}

fn check_base(base: f64) -> Result<()> {
    if base > 1.0 && base.is_finite() {
        Ok(())
    } else {
        Err(TreeError::InvalidParameter(format!(
            "Cover tree base must be greater than 1, got: {}",
            base
        )))
    }
}

fn mode_name(naive: bool, single_mode: bool) -> &'static str {
    match (naive, single_mode) {
        (true, _) => "naive",
        (false, true) => "single-tree",
        (false, false) => "dual-tree",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{CosineKernel, LinearKernel};
    use approx::assert_relative_eq;
    use ndarray::array;

    fn reference() -> Array2<f64> {
        Array2::from_shape_fn((2, 30), |(i, j)| {
            let t = j as f64 + 0.5 * i as f64;
            (t * 0.91).sin() * 3.0 + (t * 0.07).cos()
        })
    }

    #[test]
    fn test_linear_scenario_naive() {
        let data = array![[1.0, 0.0, 1.0], [0.0, 1.0, 1.0]];
        let model = FastMksModel::build(
            data,
            KernelFunction::Linear(LinearKernel::new()),
            false,
            true,
            2.0,
        )
        .unwrap();
        assert!(model.tree().is_none());

        let query = array![[1.0], [1.0]];
        let results = model.search(Some(query.view()), 1).unwrap();
        assert_eq!(results.indices[[0, 0]], 2);
        assert_relative_eq!(results.kernels[[0, 0]], 2.0);
    }

    #[test]
    fn test_modes_agree() {
        let kernel = KernelFunction::Cosine(CosineKernel::new());
        let mut model = FastMksModel::build(reference(), kernel, false, true, 2.0).unwrap();
        let naive = model.search(None, 4).unwrap();

        model.set_search_mode(false, true).unwrap();
        assert!(model.tree().is_some());
        let single = model.search(None, 4).unwrap();

        model.set_search_mode(false, false).unwrap();
        let dual = model.search(None, 4).unwrap();

        assert_eq!(naive, single);
        assert_eq!(single, dual);
    }

    #[test]
    fn test_invalid_base() {
        let kernel = KernelFunction::default();
        assert!(matches!(
            FastMksModel::build(reference(), kernel, false, false, 1.0),
            Err(TreeError::InvalidParameter(_))
        ));

        let model = FastMksModel::with_kernel(reference(), kernel).unwrap();
        assert!(model.search_with_base(None, 1, 0.9).is_err());
    }

    #[test]
    fn test_empty_reference_rejected() {
        let empty = Array2::<f64>::zeros((2, 0));
        assert!(matches!(
            FastMksModel::with_kernel(empty, KernelFunction::default()),
            Err(TreeError::EmptyDataset)
        ));
    }

    #[test]
    fn test_serialization_preserves_results() {
        let model = FastMksModel::with_kernel(reference(), KernelFunction::default()).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: FastMksModel = serde_json::from_str(&json).unwrap();

        assert!(restored.tree().is_some());
        assert_eq!(restored.kernel(), model.kernel());
        assert_eq!(
            restored.search(None, 3).unwrap(),
            model.search(None, 3).unwrap()
        );
    }
}
