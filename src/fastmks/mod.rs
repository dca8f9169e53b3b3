//! Fast max-kernel search
//!
//! A [`CoverTree`] indexes the reference set under the metric the kernel's
//! search bounds need (see [`bounds`]); [`FastMksModel`] answers top-k
//! max-kernel queries naively or by single- or dual-tree search.

pub mod bounds;
pub mod cover_tree;
pub mod model;
pub mod search;

pub use self::bounds::{BoundKind, KernelBound, Metric};
pub use self::cover_tree::{CoverTree, CoverTreeNode, DEFAULT_BASE, LEAF_SCALE};
pub use self::model::FastMksModel;
pub use self::search::{
    dual_tree_search, naive_search, single_tree_search, CandidateList, SearchStats,
};
