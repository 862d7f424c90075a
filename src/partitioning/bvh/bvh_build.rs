use super::bvh_split::SubRange;
use super::{
    AabbSource, BoxArea, BoxPerimeter, BoxRadius, BoxRadius2, BoxRadius3, BoxVolume, Bvh,
    BvhBuildOptions, BvhChild, BvhHeuristic, BvhNode, MedianMaxAxis, SplitHeuristic,
};
use crate::bounding_volume::Aabb;
use crate::math::Real;
use alloc::vec::Vec;
use arrayvec::ArrayVec;
use core::marker::PhantomData;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// The default item count above which subtrees are built as independent parallel tasks.
pub const PARALLEL_BUILD_THRESHOLD: usize = 1024;
#[cfg(feature = "parallel")]
/// Item count above which non-finite boxes are filtered out in parallel.
const PARALLEL_FILTER_THRESHOLD: usize = 4096;
#[cfg(feature = "parallel")]
/// Item count above which the root bounding box is computed in parallel.
const PARALLEL_BOUNDS_THRESHOLD: usize = 65536;
#[cfg(feature = "parallel")]
/// Number of items processed by each task of the parallel filter and bounds passes.
const PARALLEL_CHUNK_SIZE: usize = 2048;

/// Error indicating invalid inputs or options given to the BVH builder.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum BvhBuildError {
    /// An item index given to the builder does not match any box.
    #[error("the item index {index} is out of bounds of the {len} input boxes.")]
    ItemIndexOutOfBounds {
        /// The invalid index.
        index: u32,
        /// The number of input boxes.
        len: usize,
    },
    /// The item indices must fit in a `u32`.
    #[error("cannot index {0} items: item indices must fit in a u32.")]
    TooManyItems(usize),
    /// The branching factor must be between 2 and 32.
    #[error("the branching factor must be between 2 and 32, found {0}.")]
    InvalidBranchingFactor(usize),
    /// A leaf slot must be able to hold at least one item.
    #[error("the maximum number of items per leaf must be at least 1.")]
    InvalidMaxItemsPerLeaf,
}

/// Nodes and per-slot item counts of a tree or of a subtree under construction.
///
/// Internal references are local to the arena: its root is node `0`.
#[derive(Default)]
pub(super) struct SubArena<const N: usize> {
    pub nodes: Vec<BvhNode<N>>,
    pub counts: Vec<[u32; N]>,
}

impl<const N: usize> SubArena<N> {
    /// Appends `other` at the end of this arena and returns the index of its root.
    fn append(&mut self, other: SubArena<N>) -> u32 {
        let base = self.nodes.len() as u32;
        self.nodes
            .extend(other.nodes.into_iter().map(|node| node.offset_internal(base)));
        self.counts.extend(other.counts);
        base
    }
}

impl<const N: usize> Bvh<N> {
    /// Builds a tree over all the boxes of `boxes`.
    ///
    /// Items with a NaN or infinite bound are left out of the tree.
    ///
    /// # Panics
    ///
    /// Panics if `N` isn't in `2..=32`, if `options.max_items_per_leaf` is zero, or if
    /// there are more boxes than a `u32` can index. See [`Bvh::try_from_aabbs`] for a
    /// non-panicking version.
    pub fn from_aabbs<T, const D: usize, B>(boxes: &B, options: BvhBuildOptions) -> Self
    where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        match Self::try_from_aabbs(boxes, options) {
            Ok(bvh) => bvh,
            Err(err) => panic!("failed to build the BVH: {err}"),
        }
    }

    /// Builds a tree over all the boxes of `boxes`, or reports invalid inputs.
    pub fn try_from_aabbs<T, const D: usize, B>(
        boxes: &B,
        options: BvhBuildOptions,
    ) -> Result<Self, BvhBuildError>
    where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        Self::try_build(boxes, None, options)
    }

    /// Builds a tree over the subset `indices` of the boxes of `boxes`.
    ///
    /// Leaves and [`Bvh::item_order`] reference the values of `indices`.
    ///
    /// # Panics
    ///
    /// Same as [`Bvh::from_aabbs`], and if an index is out of bounds of `boxes`.
    pub fn from_indexed_aabbs<T, const D: usize, B>(
        boxes: &B,
        indices: &[u32],
        options: BvhBuildOptions,
    ) -> Self
    where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        match Self::try_from_indexed_aabbs(boxes, indices, options) {
            Ok(bvh) => bvh,
            Err(err) => panic!("failed to build the BVH: {err}"),
        }
    }

    /// Builds a tree over the subset `indices` of the boxes of `boxes`, or reports
    /// invalid inputs.
    pub fn try_from_indexed_aabbs<T, const D: usize, B>(
        boxes: &B,
        indices: &[u32],
        options: BvhBuildOptions,
    ) -> Result<Self, BvhBuildError>
    where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        Self::try_build(boxes, Some(indices), options)
    }

    fn try_build<T, const D: usize, B>(
        boxes: &B,
        indices: Option<&[u32]>,
        options: BvhBuildOptions,
    ) -> Result<Self, BvhBuildError>
    where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        if !(2..=32).contains(&N) {
            return Err(BvhBuildError::InvalidBranchingFactor(N));
        }

        if options.max_items_per_leaf == 0 {
            return Err(BvhBuildError::InvalidMaxItemsPerLeaf);
        }

        let len = boxes.len();
        let mut indices = match indices {
            Some(indices) => {
                if indices.len() > u32::MAX as usize {
                    return Err(BvhBuildError::TooManyItems(indices.len()));
                }

                if let Some(&index) = indices.iter().find(|i| **i as usize >= len) {
                    return Err(BvhBuildError::ItemIndexOutOfBounds { index, len });
                }

                indices.to_vec()
            }
            None => {
                if len > u32::MAX as usize {
                    return Err(BvhBuildError::TooManyItems(len));
                }

                (0..len as u32).collect()
            }
        };

        let parallel = options.parallel_threshold != usize::MAX;
        let excluded = retain_finite(boxes, &mut indices, parallel);
        if excluded > 0 {
            log::debug!(
                "{} items with non-finite bounding boxes are excluded from the BVH.",
                excluded
            );
        }

        if indices.is_empty() {
            return Ok(Self {
                reordered: options.reorder,
                ..Self::new()
            });
        }

        let aabb = union_aabb(boxes, &indices, parallel);
        let arena = match options.heuristic {
            BvhHeuristic::BoxPerimeter => {
                BvhBuilder::<T, D, N, BoxPerimeter, B>::new(boxes, &options)
                    .build(&mut indices, aabb)
            }
            BvhHeuristic::BoxArea => {
                BvhBuilder::<T, D, N, BoxArea, B>::new(boxes, &options).build(&mut indices, aabb)
            }
            BvhHeuristic::BoxVolume => {
                BvhBuilder::<T, D, N, BoxVolume, B>::new(boxes, &options).build(&mut indices, aabb)
            }
            BvhHeuristic::BoxRadius => {
                BvhBuilder::<T, D, N, BoxRadius, B>::new(boxes, &options).build(&mut indices, aabb)
            }
            BvhHeuristic::BoxRadius2 => {
                BvhBuilder::<T, D, N, BoxRadius2, B>::new(boxes, &options)
                    .build(&mut indices, aabb)
            }
            BvhHeuristic::BoxRadius3 => {
                BvhBuilder::<T, D, N, BoxRadius3, B>::new(boxes, &options)
                    .build(&mut indices, aabb)
            }
            BvhHeuristic::MedianMaxAxis => {
                BvhBuilder::<T, D, N, MedianMaxAxis, B>::new(boxes, &options)
                    .build(&mut indices, aabb)
            }
        };

        log::debug!(
            "Built a {}-ary BVH with {} nodes over {} items ({:?}, reorder: {}).",
            N,
            arena.nodes.len(),
            indices.len(),
            options.heuristic,
            options.reorder
        );

        Ok(Self {
            nodes: arena.nodes,
            item_order: indices,
            node_item_counts: if options.reorder {
                arena.counts
            } else {
                Vec::new()
            },
            reordered: options.reorder,
        })
    }
}

/// Removes the items with non-finite boxes from `indices`, preserving the order of the
/// others. Returns the number of removed items.
fn retain_finite<T, const D: usize, B>(boxes: &B, indices: &mut Vec<u32>, parallel: bool) -> usize
where
    T: Real,
    B: AabbSource<T, D> + ?Sized,
{
    let len = indices.len();

    #[cfg(feature = "parallel")]
    {
        if parallel && len >= PARALLEL_FILTER_THRESHOLD {
            let chunks: Vec<Vec<u32>> = indices
                .par_chunks(PARALLEL_CHUNK_SIZE)
                .map(|chunk| {
                    chunk
                        .iter()
                        .copied()
                        .filter(|i| boxes.aabb(*i as usize).is_finite())
                        .collect()
                })
                .collect();

            let mut kept = 0;
            for chunk in &chunks {
                indices[kept..kept + chunk.len()].copy_from_slice(chunk);
                kept += chunk.len();
            }
            indices.truncate(kept);
            return len - kept;
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    indices.retain(|i| boxes.aabb(*i as usize).is_finite());
    len - indices.len()
}

/// The union of the boxes of the given items.
fn union_aabb<T, const D: usize, B>(boxes: &B, indices: &[u32], parallel: bool) -> Aabb<T, D>
where
    T: Real,
    B: AabbSource<T, D> + ?Sized,
{
    let union_of = |chunk: &[u32]| {
        let mut aabb = Aabb::new_invalid();
        for i in chunk {
            aabb.merge(&boxes.aabb(*i as usize));
        }
        aabb
    };

    #[cfg(feature = "parallel")]
    {
        if parallel && indices.len() >= PARALLEL_BOUNDS_THRESHOLD {
            return indices
                .par_chunks(PARALLEL_CHUNK_SIZE)
                .map(union_of)
                .reduce(Aabb::new_invalid, |a, b| a.merged(&b));
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    union_of(indices)
}

/// Recursive top-down builder, monomorphized over the splitting heuristic `H`.
pub(super) struct BvhBuilder<'a, T, const D: usize, const N: usize, H, B: ?Sized> {
    pub boxes: &'a B,
    pub reorder: bool,
    pub max_items_per_leaf: usize,
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    pub parallel_threshold: usize,
    _phantom: PhantomData<fn() -> (T, H)>,
}

impl<'a, T, const D: usize, const N: usize, H, B> BvhBuilder<'a, T, D, N, H, B>
where
    T: Real,
    H: SplitHeuristic,
    B: AabbSource<T, D> + ?Sized,
{
    pub fn new(boxes: &'a B, options: &BvhBuildOptions) -> Self {
        Self {
            boxes,
            reorder: options.reorder,
            max_items_per_leaf: options.max_items_per_leaf,
            parallel_threshold: options.parallel_threshold,
            _phantom: PhantomData,
        }
    }

    /// Builds the tree over `indices` (all finite, non-empty), whose union box is `aabb`.
    ///
    /// `indices` is permuted into the final item order.
    pub fn build(&self, indices: &mut [u32], aabb: Aabb<T, D>) -> SubArena<N> {
        log::trace!(
            "Splitting {} items with the {:?} heuristic.",
            indices.len(),
            H::KIND
        );
        let mut arena = SubArena::default();
        let _ = self.build_node(indices, 0, aabb, &mut arena);
        arena
    }

    /// Builds the subtree over `indices`, which starts at the position `offset` of the
    /// final item order. Returns the index of its root in `arena`.
    fn build_node(
        &self,
        indices: &mut [u32],
        offset: usize,
        aabb: Aabb<T, D>,
        arena: &mut SubArena<N>,
    ) -> u32 {
        let node_id = arena.nodes.len();
        arena.nodes.push(BvhNode::empty());
        arena.counts.push([0; N]);

        let mut node = BvhNode::empty();
        let mut counts = [0; N];

        if indices.len() <= N {
            for (slot, item) in indices.iter().enumerate() {
                node.children[slot] = self.leaf_child(*item, offset + slot);
                counts[slot] = 1;
            }
        } else {
            let mut ranges = self.split_n_way(indices, aabb);

            if self.reorder {
                self.move_leaf_ranges_first(indices, &mut ranges);
            }

            self.build_children(indices, offset, &ranges, arena, &mut node, &mut counts);
        }

        arena.nodes[node_id] = node;
        arena.counts[node_id] = counts;
        node_id as u32
    }

    #[inline]
    fn leaf_child(&self, item: u32, position: usize) -> BvhChild {
        if self.reorder {
            BvhChild::Item(position as u32)
        } else {
            BvhChild::Item(item)
        }
    }

    #[inline]
    fn is_leaf_range(&self, len: usize) -> bool {
        len == 1 || (self.reorder && len <= self.max_items_per_leaf)
    }

    /// Moves the ranges small enough to be leaves before the others, keeping the
    /// relative order within both groups.
    fn move_leaf_ranges_first(
        &self,
        indices: &mut [u32],
        ranges: &mut ArrayVec<SubRange<T, D>, N>,
    ) {
        let first_internal = ranges.iter().position(|r| !self.is_leaf_range(r.len));
        let needs_move = match first_internal {
            Some(first) => ranges[first..].iter().any(|r| self.is_leaf_range(r.len)),
            None => false,
        };

        if !needs_move {
            return;
        }

        let mut sorted: ArrayVec<SubRange<T, D>, N> = ArrayVec::new();
        sorted.extend(ranges.iter().copied().filter(|r| self.is_leaf_range(r.len)));
        sorted.extend(ranges.iter().copied().filter(|r| !self.is_leaf_range(r.len)));

        let mut moved = Vec::with_capacity(indices.len());
        let mut start = 0;
        for range in sorted.iter_mut() {
            moved.extend_from_slice(&indices[range.start..range.start + range.len]);
            range.start = start;
            start += range.len;
        }

        indices.copy_from_slice(&moved);
        *ranges = sorted;
    }

    fn build_children(
        &self,
        indices: &mut [u32],
        offset: usize,
        ranges: &ArrayVec<SubRange<T, D>, N>,
        arena: &mut SubArena<N>,
        node: &mut BvhNode<N>,
        counts: &mut [u32; N],
    ) {
        let mut subtrees: ArrayVec<usize, N> = ArrayVec::new();

        for (slot, range) in ranges.iter().enumerate() {
            counts[slot] = range.len as u32;

            if self.is_leaf_range(range.len) {
                node.children[slot] = self.leaf_child(indices[range.start], offset + range.start);
            } else {
                subtrees.push(slot);
            }
        }

        #[cfg(feature = "parallel")]
        {
            let num_large = subtrees
                .iter()
                .filter(|slot| ranges[**slot].len > self.parallel_threshold)
                .count();

            if num_large >= 2 {
                log::trace!(
                    "Building {} of the {} subtrees of a {}-item range in parallel.",
                    num_large,
                    subtrees.len(),
                    indices.len()
                );
                self.build_children_parallel(indices, offset, ranges, &subtrees, arena, node);
                return;
            }
        }

        for slot in subtrees {
            let range = &ranges[slot];
            let child = self.build_node(
                &mut indices[range.start..range.start + range.len],
                offset + range.start,
                range.aabb,
                arena,
            );
            node.children[slot] = BvhChild::Internal(child);
        }
    }

    /// Builds every subtree of `subtrees` into its own arena (the large ones as
    /// parallel tasks) then splices them into `arena` in slot order.
    ///
    /// This yields exactly the same nodes as building them in sequence.
    #[cfg(feature = "parallel")]
    fn build_children_parallel(
        &self,
        indices: &mut [u32],
        offset: usize,
        ranges: &ArrayVec<SubRange<T, D>, N>,
        subtrees: &[usize],
        arena: &mut SubArena<N>,
        node: &mut BvhNode<N>,
    ) {
        let mut slot_indices: ArrayVec<&mut [u32], N> = ArrayVec::new();
        let mut rest = indices;
        for range in ranges {
            let (head, tail) = core::mem::take(&mut rest).split_at_mut(range.len);
            slot_indices.push(head);
            rest = tail;
        }

        let mut built: [Option<SubArena<N>>; N] = core::array::from_fn(|_| None);
        let mut large = Vec::new();

        for (slot, slot_indices) in slot_indices.into_iter().enumerate() {
            if !subtrees.contains(&slot) {
                continue;
            }

            let range = &ranges[slot];
            if range.len > self.parallel_threshold {
                large.push((slot, slot_indices));
            } else {
                let mut sub = SubArena::default();
                let _ = self.build_node(slot_indices, offset + range.start, range.aabb, &mut sub);
                built[slot] = Some(sub);
            }
        }

        let large_built: Vec<(usize, SubArena<N>)> = large
            .into_par_iter()
            .map(|(slot, slot_indices)| {
                let range = &ranges[slot];
                let mut sub = SubArena::default();
                let _ = self.build_node(slot_indices, offset + range.start, range.aabb, &mut sub);
                (slot, sub)
            })
            .collect();

        for (slot, sub) in large_built {
            built[slot] = Some(sub);
        }

        for slot in subtrees {
            if let Some(sub) = built[*slot].take() {
                node.children[*slot] = BvhChild::Internal(arena.append(sub));
            }
        }
    }
}
