//! Density estimation trees and fast max-kernel search
//!
//! Two tree-based methods over dense point sets (D×N matrices, one column
//! per point):
//!
//! - [`det`]: density estimation trees grown by minimizing integrated
//!   squared error, pruned by cross-validated cost-complexity pruning.
//! - [`fastmks`]: top-k max-kernel search over a cover tree built in the
//!   kernel's feature space, with naive, single-tree and dual-tree modes.
//!
//! ```rust,no_run
//! use rtrees::{FastMksModel, KernelFunction, KernelParams, Trainer};
//! use ndarray::Array2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = Array2::<f64>::zeros((3, 500));
//! let tree = Trainer::new().with_folds(10).train(data.view())?;
//!
//! let kernel = KernelFunction::from_name("gaussian", &KernelParams::default())?;
//! let model = FastMksModel::with_kernel(data, kernel)?;
//! let results = model.search(None, 5)?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod core;
pub mod data;
pub mod det;
pub mod fastmks;
pub mod kernel;
pub mod persistence;
pub mod utils;

// Re-export main types for convenience
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::error::*;
pub use crate::core::types::*;
pub use crate::data::CsvDataset;
pub use crate::det::{DensityTree, PathCacher, PathFormat, PruningSequence, Trainer};
pub use crate::fastmks::{CoverTree, FastMksModel};
pub use crate::kernel::{Kernel, KernelFunction, KernelParams};
pub use crate::persistence::{ModelFile, ModelMetadata, PersistentModel};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
