//! Density estimation trees
//!
//! [`DensityTree`] grows the partition, [`PruningSequence`] orders its
//! weakest-link prunings, [`Trainer`] picks a pruning by cross-validation and
//! [`PathCacher`] records where every leaf sits.

pub mod dtree;
pub mod path_cacher;
pub mod pruning;
pub mod report;
pub mod trainer;

pub use self::dtree::{DTreeNode, DensityTree, WalkEvent, LEAF_ALPHA};
pub use self::path_cacher::{decode_path, PathCacher, PathFormat};
pub use self::pruning::{PruningSequence, PruningStep};
pub use self::report::{leaf_membership, print_leaf_membership, print_variable_importance};
pub use self::trainer::Trainer;
