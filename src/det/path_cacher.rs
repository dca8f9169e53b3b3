//! Root-to-leaf path cache for a tagged density tree
//!
//! A single walk over the tree records, for every leaf tag, the chain of
//! left/right decisions from the root and the tag of the leaf's parent.
//! Afterwards the path of any leaf can be reported without descending the
//! tree again. The cache goes stale if the tree is pruned further.

use crate::core::{Result, TreeError};
use crate::det::dtree::{DensityTree, WalkEvent};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How branch decisions are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathFormat {
    /// `L` / `R` only
    #[default]
    Lr,
    /// Decision followed by the parent's tag, e.g. `L0R1`
    LrId,
    /// Parent's tag followed by the decision, e.g. `0L1R`
    IdLr,
}

impl FromStr for PathFormat {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lr" => Ok(Self::Lr),
            "lr-id" | "lr_id" => Ok(Self::LrId),
            "id-lr" | "id_lr" => Ok(Self::IdLr),
            other => Err(TreeError::InvalidParameter(format!(
                "Unknown path format '{}' (expected lr, lr-id or id-lr)",
                other
            ))),
        }
    }
}

impl fmt::Display for PathFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lr => "lr",
            Self::LrId => "lr-id",
            Self::IdLr => "id-lr",
        };
        f.write_str(name)
    }
}

/// One branch taken on the way down: direction and the tag of the node left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Marker {
    left: bool,
    parent_tag: Option<usize>,
}

#[derive(Debug, Clone)]
struct CachedPath {
    parent: Option<usize>,
    path: String,
}

/// Cache of formatted root-to-leaf paths keyed by leaf tag
#[derive(Debug, Clone)]
pub struct PathCacher {
    format: PathFormat,
    stack: Vec<Marker>,
    cache: BTreeMap<usize, CachedPath>,
}

impl PathCacher {
    /// Tag every node of `tree` in pre-order and cache the path of each leaf
    pub fn new(format: PathFormat, tree: &mut DensityTree) -> Self {
        tree.tag_tree(true);
        let mut cacher = Self::empty(format);
        tree.walk(|tree, event| match event {
            WalkEvent::Enter { node, parent } => cacher.enter(tree, node, parent),
            WalkEvent::Leave { node, parent } => cacher.leave(tree, node, parent),
        });
        cacher
    }

    /// Empty cache, to be filled by [`PathCacher::enter`] / [`PathCacher::leave`]
    pub fn empty(format: PathFormat) -> Self {
        Self {
            format,
            stack: Vec::new(),
            cache: BTreeMap::new(),
        }
    }

    pub fn format(&self) -> PathFormat {
        self.format
    }

    /// Record entry into `node`; leaves get their path cached
    pub fn enter(&mut self, tree: &DensityTree, node: usize, parent: Option<usize>) {
        if let Some(parent) = parent {
            let parent_node = tree.node(parent);
            self.stack.push(Marker {
                left: parent_node.left == Some(node),
                parent_tag: parent_node.tag,
            });
        }

        let current = tree.node(node);
        if current.is_leaf() {
            if let Some(tag) = current.tag {
                let path = self.build_string();
                let parent = parent.and_then(|p| tree.node(p).tag);
                self.cache.insert(tag, CachedPath { parent, path });
            }
        }
    }

    /// Record leaving `node`
    pub fn leave(&mut self, _tree: &DensityTree, _node: usize, parent: Option<usize>) {
        if parent.is_some() {
            self.stack.pop();
        }
    }

    /// Formatted path of the leaf with `tag`
    pub fn path_for(&self, tag: usize) -> Result<&str> {
        self.cache
            .get(&tag)
            .map(|entry| entry.path.as_str())
            .ok_or(TreeError::TagNotFound(tag))
    }

    /// Tag of the parent of the leaf with `tag` (`None` for a root leaf)
    pub fn parent_of(&self, tag: usize) -> Result<Option<usize>> {
        self.cache
            .get(&tag)
            .map(|entry| entry.parent)
            .ok_or(TreeError::TagNotFound(tag))
    }

    /// Number of cached leaves
    pub fn num_nodes(&self) -> usize {
        self.cache.len()
    }

    /// Cached tags in increasing order
    pub fn tags(&self) -> impl Iterator<Item = usize> + '_ {
        self.cache.keys().copied()
    }

    fn build_string(&self) -> String {
        let mut out = String::new();
        for marker in &self.stack {
            let direction = if marker.left { 'L' } else { 'R' };
            let id = marker.parent_tag.map(|t| t.to_string()).unwrap_or_default();
            match self.format {
                PathFormat::Lr => out.push(direction),
                PathFormat::LrId => {
                    out.push(direction);
                    out.push_str(&id);
                }
                PathFormat::IdLr => {
                    out.push_str(&id);
                    out.push(direction);
                }
            }
        }
        out
    }
}

/// Recover the left (`true`) / right (`false`) decisions of a cached path
pub fn decode_path(format: PathFormat, path: &str) -> Result<Vec<bool>> {
    let mut decisions = Vec::new();
    for c in path.chars() {
        match c {
            'L' => decisions.push(true),
            'R' => decisions.push(false),
            d if d.is_ascii_digit() && format != PathFormat::Lr => {}
            other => {
                return Err(TreeError::ParseError(format!(
                    "Unexpected character '{}' in {} path '{}'",
                    other, format, path
                )))
            }
        }
    }
    Ok(decisions)
}
