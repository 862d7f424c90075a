use super::bvh_heuristic::BvhHeuristic;
use super::{BvhChild, BvhNode, PARALLEL_BUILD_THRESHOLD};
use alloc::vec::Vec;
use core::iter::{Copied, Once};
use core::slice::Iter;
use either::Either;

/// Parameters of the one-time build of the tree.
///
/// ```
/// # use nbvh::partitioning::{BvhBuildOptions, BvhHeuristic};
/// let options = BvhBuildOptions::default()
///     .with_heuristic(BvhHeuristic::BoxPerimeter)
///     .with_reorder(true)
///     .with_max_items_per_leaf(8);
/// assert!(options.reorder);
/// ```
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct BvhBuildOptions {
    /// The cost function minimized when splitting item ranges.
    pub heuristic: BvhHeuristic,
    /// If `true`, small item ranges are stored as contiguous runs of
    /// [`Bvh::item_order`] instead of being split down to single items.
    pub reorder: bool,
    /// The largest item run a single leaf slot can reference in reordered mode.
    pub max_items_per_leaf: usize,
    /// Subtrees with more items than this are built as independent parallel tasks.
    ///
    /// Set to `usize::MAX` to build serially. The built tree does not depend on this
    /// value.
    pub parallel_threshold: usize,
}

impl Default for BvhBuildOptions {
    fn default() -> Self {
        Self {
            heuristic: BvhHeuristic::default(),
            reorder: false,
            max_items_per_leaf: 4,
            parallel_threshold: PARALLEL_BUILD_THRESHOLD,
        }
    }
}

impl BvhBuildOptions {
    /// Sets the splitting heuristic.
    pub fn with_heuristic(mut self, heuristic: BvhHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Enables or disables the reordered mode.
    pub fn with_reorder(mut self, reorder: bool) -> Self {
        self.reorder = reorder;
        self
    }

    /// Sets the maximum number of items per leaf slot in reordered mode.
    pub fn with_max_items_per_leaf(mut self, max_items_per_leaf: usize) -> Self {
        self.max_items_per_leaf = max_items_per_leaf;
        self
    }

    /// Sets the item count above which subtrees are built in parallel.
    pub fn with_parallel_threshold(mut self, parallel_threshold: usize) -> Self {
        self.parallel_threshold = parallel_threshold;
        self
    }
}

/// The external indices referenced by one leaf slot, see [`Bvh::leaf_items`].
pub type LeafItems<'a> = Either<Once<u32>, Copied<Iter<'a, u32>>>;

/// An `N`-ary Bounding Volume Hierarchy over a fixed set of items.
///
/// The nodes are stored in a flat arena in depth-first pre-order: node `0` is the root
/// and every node is immediately followed by the subtrees of its internal children, in
/// slot order. The number of nodes of a child subtree is thus the index of its next
/// internal sibling (or the end of its parent's subtree) minus its own index.
///
/// The tree does not store any bounding box. Call [`Bvh::node_aabbs`] or
/// [`Bvh::simd_node_aabbs`] to compute the boxes needed by queries.
///
/// Build it with [`Bvh::from_aabbs`] or [`Bvh::from_indexed_aabbs`]. There is no
/// incremental update: rebuild the tree when the items change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bvh<const N: usize> {
    pub(super) nodes: Vec<BvhNode<N>>,
    pub(super) item_order: Vec<u32>,
    pub(super) node_item_counts: Vec<[u32; N]>,
    pub(super) reordered: bool,
}

impl<const N: usize> Default for Bvh<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Bvh<N> {
    /// An empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            item_order: Vec::new(),
            node_item_counts: Vec::new(),
            reordered: false,
        }
    }

    /// The number of nodes of this tree.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The number of items indexed by this tree.
    ///
    /// Items with non-finite boxes excluded at build time are not counted.
    pub fn num_items(&self) -> usize {
        self.item_order.len()
    }

    /// Does this tree index no item at all?
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node arena, in depth-first pre-order.
    pub fn nodes(&self) -> &[BvhNode<N>] {
        &self.nodes
    }

    /// The root node, if the tree isn't empty.
    pub fn root(&self) -> Option<&BvhNode<N>> {
        self.nodes.first()
    }

    /// The final order of the items: the external index of the item at each tree position.
    ///
    /// In reordered mode, leaf slots reference runs of this array.
    pub fn item_order(&self) -> &[u32] {
        &self.item_order
    }

    /// The number of items represented by each slot of each node.
    ///
    /// This is `None` unless the tree was built in reordered mode. Otherwise, it holds
    /// `1` for single items, the run length for leaf ranges, and the total subtree item
    /// count for internal slots.
    pub fn node_item_counts(&self) -> Option<&[[u32; N]]> {
        if self.reordered {
            Some(&self.node_item_counts)
        } else {
            None
        }
    }

    /// Was this tree built in reordered mode?
    pub fn is_reordered(&self) -> bool {
        self.reordered
    }

    /// The external indices of the items referenced by the leaf slot `slot` of `node`.
    ///
    /// Yields nothing if that slot isn't a leaf.
    pub fn leaf_items(&self, node: u32, slot: usize) -> LeafItems<'_> {
        match self.nodes[node as usize].children[slot] {
            BvhChild::Item(item) => self.leaf_slot_items(node, slot, item),
            _ => Either::Right(self.item_order[..0].iter().copied()),
        }
    }

    #[inline]
    pub(super) fn leaf_slot_items(&self, node: u32, slot: usize, item: u32) -> LeafItems<'_> {
        if self.reordered {
            let start = item as usize;
            let count = self.node_item_counts[node as usize][slot] as usize;
            Either::Right(self.item_order[start..start + count].iter().copied())
        } else {
            Either::Left(core::iter::once(item))
        }
    }

    /// One past the index of the last node of the subtree rooted at `node`.
    ///
    /// The subtree occupies the contiguous index range `node..self.subtree_end(node)`.
    pub fn subtree_end(&self, node: u32) -> u32 {
        let mut curr = node;
        while let Some(last) = self.nodes[curr as usize]
            .children
            .iter()
            .rev()
            .find_map(|c| c.internal())
        {
            curr = last;
        }
        curr + 1
    }

    /// The end index of the subtree of each child slot of `node`, given the end of the
    /// subtree of `node` itself. Non-internal slots get `0`.
    #[inline]
    pub(super) fn child_subtree_ends(&self, node: u32, node_end: u32) -> [u32; N] {
        let children = &self.nodes[node as usize].children;
        let mut ends = [0; N];
        let mut next_start = node_end;

        for slot in (0..N).rev() {
            if let BvhChild::Internal(child) = children[slot] {
                ends[slot] = next_start;
                next_start = child;
            }
        }

        ends
    }

    /// The depth of the subtree rooted at `node`. A node with only leaves has depth 1.
    pub fn subtree_depth(&self, node: u32) -> u32 {
        let children = &self.nodes[node as usize].children;
        1 + children
            .iter()
            .filter_map(|c| c.internal())
            .map(|child| self.subtree_depth(child))
            .max()
            .unwrap_or(0)
    }

    /// The depth of the whole tree. Zero for an empty tree.
    pub fn depth(&self) -> u32 {
        if self.nodes.is_empty() {
            0
        } else {
            self.subtree_depth(0)
        }
    }

    /// A stack for explicit depth-first traversals.
    #[inline]
    pub(super) fn traversal_stack<E>() -> smallvec::SmallVec<[E; 32]> {
        Default::default()
    }
}
