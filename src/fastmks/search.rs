//! Max-kernel search strategies
//!
//! All strategies return the same answer: for every query, the `k` reference
//! points with the largest kernel value, ordered by value (descending) and
//! then by reference index (ascending).
//!
//! The tree strategies skip a reference node when an upper bound on the
//! kernel over everything below it cannot beat the current k-th best value.
//! [`KernelBound`] picks the bound for the kernel and the metric the cover
//! trees must be built with; a tree built for another metric is rejected.
//! Kernels without a valid bound are still searched exactly, nothing is
//! pruned.

use crate::cache::KernelCache;
use crate::core::{Result, SearchResults, TreeError};
use crate::fastmks::bounds::{KernelBound, PairValue};
use crate::fastmks::cover_tree::CoverTree;
use crate::kernel::{Kernel, KernelFunction};
use crate::utils::{memory, validation};
use log::debug;
use ndarray::{ArrayView1, ArrayView2};
use std::cmp::Ordering;

/// Relative slack applied before pruning on a bound
const BOUND_TOLERANCE: f64 = 1e-10;

/// Memory budget for the dual-tree kernel cache
const DUAL_CACHE_MB: usize = 64;

/// Best `k` (value, index) pairs seen so far, best first
#[derive(Debug, Clone)]
pub struct CandidateList {
    k: usize,
    items: Vec<(f64, usize)>,
}

impl CandidateList {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k + 1),
        }
    }

    /// Offer a candidate; it is kept only if it ranks among the best `k`
    pub fn insert(&mut self, value: f64, index: usize) {
        if self.items.len() == self.k {
            match self.items.last() {
                Some(&worst) if rank(&(value, index), &worst) == Ordering::Less => {}
                _ => return,
            }
        }
        let position = self
            .items
            .partition_point(|item| rank(item, &(value, index)) == Ordering::Less);
        self.items.insert(position, (value, index));
        self.items.truncate(self.k);
    }

    /// Value a new candidate must reach to enter the list
    pub fn threshold(&self) -> f64 {
        if self.items.len() < self.k {
            f64::NEG_INFINITY
        } else {
            self.items.last().map_or(f64::NEG_INFINITY, |item| item.0)
        }
    }

    pub fn items(&self) -> &[(f64, usize)] {
        &self.items
    }
}

/// Total order on candidates: larger value first, then smaller index
fn rank(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    b.0.total_cmp(&a.0).then(a.1.cmp(&b.1))
}

/// Whether a bound proves that nothing below it can beat `threshold`
fn can_prune(bound: f64, threshold: f64) -> bool {
    threshold.is_finite() && bound < threshold - BOUND_TOLERANCE * (1.0 + threshold.abs())
}

/// Counters reported after a tree search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub base_cases: usize,
    pub prunes: usize,
}

/// Check `k` and resolve the query set; `true` marks self-search
fn prepare<'v>(
    reference: &'v ArrayView2<'_, f64>,
    queries: &'v Option<ArrayView2<'_, f64>>,
    k: usize,
) -> Result<(ArrayView2<'v, f64>, bool)> {
    let (queries, self_search) = match queries {
        Some(queries) => (queries.view(), false),
        None => (reference.view(), true),
    };
    validation::check_same_dims(reference.nrows(), queries.nrows())?;

    let available = if self_search {
        reference.ncols().saturating_sub(1)
    } else {
        reference.ncols()
    };
    if k == 0 || k > available {
        return Err(TreeError::InvalidParameter(format!(
            "k must be between 1 and {} (number of usable reference points), got: {}",
            available, k
        )));
    }
    Ok((queries, self_search))
}

/// Check that `tree` indexes `reference` under the metric `bound` needs
fn check_tree(
    bound: &KernelBound,
    reference: &ArrayView2<'_, f64>,
    tree: &CoverTree,
) -> Result<()> {
    if tree.metric() != bound.metric() {
        return Err(TreeError::InvalidParameter(format!(
            "Cover tree uses the {:?} metric, the {} kernel needs {:?}",
            tree.metric(),
            bound.kernel(),
            bound.metric()
        )));
    }
    if tree.n_points() != reference.ncols() {
        return Err(TreeError::InvalidParameter(format!(
            "Cover tree indexes {} points, reference set has {}",
            tree.n_points(),
            reference.ncols()
        )));
    }
    Ok(())
}

fn collect_results(lists: &[CandidateList], k: usize) -> SearchResults {
    let mut results = SearchResults::with_shape(k, lists.len());
    for (j, list) in lists.iter().enumerate() {
        for (i, &(value, index)) in list.items().iter().enumerate() {
            results.indices[[i, j]] = index;
            results.kernels[[i, j]] = value;
        }
    }
    results
}

/// Brute-force search over every query/reference pair
///
/// Without `queries` the reference set is searched against itself and each
/// point is excluded from its own results.
pub fn naive_search(
    kernel: &KernelFunction,
    reference: ArrayView2<f64>,
    queries: Option<ArrayView2<f64>>,
    k: usize,
) -> Result<SearchResults> {
    let (queries, self_search) = prepare(&reference, &queries, k)?;

    let lists: Vec<CandidateList> = queries
        .columns()
        .into_iter()
        .enumerate()
        .map(|(q, query)| {
            let mut list = CandidateList::new(k);
            for (r, point) in reference.columns().into_iter().enumerate() {
                if self_search && q == r {
                    continue;
                }
                list.insert(kernel.compute(query, point), r);
            }
            list
        })
        .collect();

    Ok(collect_results(&lists, k))
}

/// Search each query independently down the reference cover tree
pub fn single_tree_search(
    kernel: &KernelFunction,
    reference: ArrayView2<f64>,
    tree: &CoverTree,
    queries: Option<ArrayView2<f64>>,
    k: usize,
) -> Result<SearchResults> {
    let bound = KernelBound::new(*kernel);
    check_tree(&bound, &reference, tree)?;
    let (queries, self_search) = prepare(&reference, &queries, k)?;
    let mut stats = SearchStats::default();

    let lists: Vec<CandidateList> = queries
        .columns()
        .into_iter()
        .enumerate()
        .map(|(q, query)| {
            let mut search = SingleTree {
                bound: &bound,
                reference: reference.view(),
                tree,
                query,
                query_norm: bound.norm(query),
                excluded: self_search.then_some(q),
                list: CandidateList::new(k),
                stats: &mut stats,
            };
            let root = tree.root();
            let pair = bound.evaluate(query, reference.column(tree.node(root).point));
            search.visit(root, pair);
            search.list
        })
        .collect();

    debug!(
        "Single-tree search ({:?} bound): {} base cases, {} prunes",
        bound.kind(),
        stats.base_cases,
        stats.prunes
    );
    Ok(collect_results(&lists, k))
}

struct SingleTree<'t, 'q, 's> {
    bound: &'t KernelBound,
    reference: ArrayView2<'t, f64>,
    tree: &'t CoverTree,
    query: ArrayView1<'q, f64>,
    query_norm: f64,
    excluded: Option<usize>,
    list: CandidateList,
    stats: &'s mut SearchStats,
}

impl SingleTree<'_, '_, '_> {
    fn bound(&self, node: usize, pair: PairValue) -> f64 {
        let radius = self.tree.node(node).furthest_descendant_distance;
        self.bound.bound(pair, self.query_norm, 0.0, 0.0, radius)
    }

    /// Visit `node`, whose point evaluates to `pair` against the query
    fn visit(&mut self, node: usize, pair: PairValue) {
        if can_prune(self.bound(node, pair), self.list.threshold()) {
            self.stats.prunes += 1;
            return;
        }

        let tree = self.tree;
        let current = tree.node(node);
        if current.is_leaf() {
            self.stats.base_cases += 1;
            if self.excluded != Some(current.point) {
                self.list.insert(pair.kernel, current.point);
            }
            return;
        }

        let mut children: Vec<(usize, PairValue, f64)> = current
            .children
            .iter()
            .map(|&child| {
                let point = tree.node(child).point;
                let child_pair = if point == current.point {
                    pair
                } else {
                    self.bound.evaluate(self.query, self.reference.column(point))
                };
                (child, child_pair, self.bound(child, child_pair))
            })
            .collect();
        children.sort_by(|a, b| b.2.total_cmp(&a.2));

        for (child, child_pair, _) in children {
            self.visit(child, child_pair);
        }
    }
}

/// Jointly traverse a query cover tree and the reference cover tree
///
/// Without `queries` the reference tree doubles as the query tree and each
/// point is excluded from its own results. Otherwise a query tree is built
/// with expansion constant `query_base`.
pub fn dual_tree_search(
    kernel: &KernelFunction,
    reference: ArrayView2<f64>,
    tree: &CoverTree,
    queries: Option<ArrayView2<f64>>,
    query_base: f64,
    k: usize,
) -> Result<SearchResults> {
    let bound = KernelBound::new(*kernel);
    check_tree(&bound, &reference, tree)?;
    let (query_data, self_search) = prepare(&reference, &queries, k)?;
    if query_data.ncols() == 0 {
        return Ok(SearchResults::with_shape(k, 0));
    }

    let built;
    let query_tree = if self_search {
        tree
    } else {
        built = CoverTree::build(query_data.view(), kernel, query_base)?;
        &built
    };

    let cache_bytes = memory::recommend_cache_size(
        query_data.ncols(),
        reference.ncols(),
        KernelCache::<PairValue>::ENTRY_BYTES,
        DUAL_CACHE_MB,
    );
    let mut search = DualTree {
        bound,
        reference: reference.view(),
        queries: query_data.view(),
        reference_tree: tree,
        query_tree,
        self_search,
        lists: vec![CandidateList::new(k); query_data.ncols()],
        node_thresholds: vec![f64::NEG_INFINITY; query_tree.num_nodes()],
        cache: KernelCache::with_memory_limit(cache_bytes, self_search),
        stats: SearchStats::default(),
    };

    let (q_root, r_root) = (query_tree.root(), tree.root());
    let pair = search.evaluate(q_root, r_root);
    search.visit(q_root, r_root, pair);

    let cache = search.cache.stats();
    debug!(
        "Dual-tree search ({:?} bound): {} base cases, {} prunes, cache {} hits / {} misses ({:.1}%), {} of {} entries used",
        search.bound.kind(),
        search.stats.base_cases,
        search.stats.prunes,
        cache.hits,
        cache.misses,
        search.cache.hit_rate() * 100.0,
        cache.size,
        cache.capacity
    );
    Ok(collect_results(&search.lists, k))
}

struct DualTree<'d, 't> {
    bound: KernelBound,
    reference: ArrayView2<'d, f64>,
    queries: ArrayView2<'d, f64>,
    reference_tree: &'t CoverTree,
    query_tree: &'t CoverTree,
    self_search: bool,
    lists: Vec<CandidateList>,
    /// Lower bound on the k-th best value of every query below an internal
    /// query node, refreshed after each visit of the node
    node_thresholds: Vec<f64>,
    cache: KernelCache<PairValue>,
    stats: SearchStats,
}

impl DualTree<'_, '_> {
    /// Pair value between the points of a query node and a reference node
    fn evaluate(&mut self, query_node: usize, reference_node: usize) -> PairValue {
        let q = self.query_tree.node(query_node).point;
        let r = self.reference_tree.node(reference_node).point;
        let (bound, queries, reference) = (&self.bound, self.queries, self.reference);
        self.cache.get_or_compute(q, r, || {
            bound.evaluate(queries.column(q), reference.column(r))
        })
    }

    fn bound(&self, query_node: usize, reference_node: usize, pair: PairValue) -> f64 {
        let q = self.query_tree.node(query_node);
        let r = self.reference_tree.node(reference_node);
        self.bound.bound(
            pair,
            self.query_tree.norm(q.point),
            q.furthest_descendant_distance,
            self.reference_tree.norm(r.point),
            r.furthest_descendant_distance,
        )
    }

    /// Value every query below a query node must already reach
    fn threshold(&self, query_node: usize) -> f64 {
        let node = self.query_tree.node(query_node);
        if node.is_leaf() {
            self.lists[node.point].threshold()
        } else {
            self.node_thresholds[query_node]
        }
    }

    fn refresh_threshold(&mut self, query_node: usize) {
        let threshold = self
            .query_tree
            .node(query_node)
            .children
            .iter()
            .map(|&child| self.threshold(child))
            .fold(f64::INFINITY, f64::min);
        self.node_thresholds[query_node] = threshold;
    }

    fn visit(&mut self, query_node: usize, reference_node: usize, pair: PairValue) {
        if can_prune(
            self.bound(query_node, reference_node, pair),
            self.threshold(query_node),
        ) {
            self.stats.prunes += 1;
            return;
        }

        let (query_tree, reference_tree) = (self.query_tree, self.reference_tree);
        let q = query_tree.node(query_node);
        let r = reference_tree.node(reference_node);

        if q.is_leaf() && r.is_leaf() {
            self.stats.base_cases += 1;
            if !(self.self_search && q.point == r.point) {
                self.lists[q.point].insert(pair.kernel, r.point);
            }
            return;
        }

        if !r.is_leaf() && (q.is_leaf() || r.scale >= q.scale) {
            let mut children: Vec<(usize, PairValue, f64)> = r
                .children
                .iter()
                .map(|&child| {
                    let child_pair = if reference_tree.node(child).point == r.point {
                        pair
                    } else {
                        self.evaluate(query_node, child)
                    };
                    (child, child_pair, self.bound(query_node, child, child_pair))
                })
                .collect();
            children.sort_by(|a, b| b.2.total_cmp(&a.2));
            for (child, child_pair, _) in children {
                self.visit(query_node, child, child_pair);
            }
        } else {
            for &child in &q.children {
                let child_pair = if query_tree.node(child).point == q.point {
                    pair
                } else {
                    self.evaluate(child, reference_node)
                };
                self.visit(child, reference_node, child_pair);
            }
        }

        if !q.is_leaf() {
            self.refresh_threshold(query_node);
        }
    }
}
