use super::{AabbSource, Bvh, BvhVisitor};
use crate::bounding_volume::{Aabb, SimdAabb};
use crate::math::{Real, SIMD_WIDTH};
use alloc::vec;
use alloc::vec::Vec;
use core::marker::PhantomData;

/// Enlargement applied to every box written by the node-box materializer.
///
/// Each stored box is grown by `epsilon + fraction * extent` on both sides of each axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NodeAabbOptions<T> {
    /// Absolute enlargement.
    pub epsilon: T,
    /// Enlargement relative to the box extents.
    pub fraction: T,
}

impl<T: Real> Default for NodeAabbOptions<T> {
    fn default() -> Self {
        Self {
            epsilon: T::zero(),
            fraction: T::zero(),
        }
    }
}

impl<T: Real> NodeAabbOptions<T> {
    /// Options growing the boxes by `epsilon` only.
    pub fn with_epsilon(epsilon: T) -> Self {
        Self {
            epsilon,
            fraction: T::zero(),
        }
    }
}

/// The per-node entry of a node-box table.
pub trait NodeAabbLayout<T: Real, const D: usize>: Copy + Send {
    /// An entry with no box.
    fn empty() -> Self;

    /// The entry of a node whose non-empty slots have the given boxes.
    fn from_children(children: &[Aabb<T, D>], options: &NodeAabbOptions<T>) -> Self;
}

/// Plain layout: the box of the node itself.
impl<T: Real, const D: usize> NodeAabbLayout<T, D> for Aabb<T, D> {
    fn empty() -> Self {
        Aabb::new_invalid()
    }

    fn from_children(children: &[Aabb<T, D>], options: &NodeAabbOptions<T>) -> Self {
        let mut result = Aabb::new_invalid();
        for child in children {
            result.merge(child);
        }
        result.dilated(options.epsilon, options.fraction)
    }
}

/// Interleaved layout: the boxes of the children of the node, one per lane.
impl<T: Real, const D: usize> NodeAabbLayout<T, D> for SimdAabb<T, D> {
    fn empty() -> Self {
        SimdAabb::new_invalid()
    }

    fn from_children(children: &[Aabb<T, D>], options: &NodeAabbOptions<T>) -> Self {
        let mut result = SimdAabb::from_aabbs(children);
        result.dilate(options.epsilon, options.fraction);
        result
    }
}

/// Computes the boxes of every slot bottom-up. The data of a slot is its
/// (non-enlarged) bounding box.
struct NodeAabbVisitor<'a, T, const D: usize, const N: usize, B: ?Sized, L> {
    bvh: &'a Bvh<N>,
    boxes: &'a B,
    options: NodeAabbOptions<T>,
    _layout: PhantomData<fn() -> L>,
}

impl<T, const D: usize, const N: usize, B, L> BvhVisitor<N> for NodeAabbVisitor<'_, T, D, N, B, L>
where
    T: Real,
    B: AabbSource<T, D> + ?Sized,
    L: NodeAabbLayout<T, D>,
{
    type Data = Aabb<T, D>;
    type Output = L;

    fn item(&self, item: u32, parent: u32, slot: usize, data: &mut Self::Data) {
        for i in self.bvh.leaf_slot_items(parent, slot, item) {
            data.merge(&self.boxes.aabb(i as usize));
        }
    }

    fn post(
        &self,
        _node: u32,
        _parent: Option<u32>,
        data: &mut Self::Data,
        children: &[Self::Data],
        output: &mut Self::Output,
    ) {
        for child in children {
            data.merge(child);
        }
        *output = L::from_children(children, &self.options);
    }
}

impl<const N: usize> Bvh<N> {
    /// Computes the bounding box of every node (plain layout).
    ///
    /// `boxes` must be the box source the tree was built from. Entry `i` is the union
    /// of the boxes of the items under node `i`, enlarged as specified by `options`.
    pub fn node_aabbs<T, const D: usize, B>(
        &self,
        boxes: &B,
        options: NodeAabbOptions<T>,
    ) -> Vec<Aabb<T, D>>
    where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        self.materialize(boxes, options, None)
    }

    /// Parallel version of [`Bvh::node_aabbs`]. Gives the same result.
    pub fn node_aabbs_parallel<T, const D: usize, B>(
        &self,
        boxes: &B,
        options: NodeAabbOptions<T>,
        threshold: usize,
    ) -> Vec<Aabb<T, D>>
    where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        self.materialize(boxes, options, Some(threshold))
    }

    /// Computes the bounding boxes of the children of every node (interleaved layout).
    ///
    /// `boxes` must be the box source the tree was built from. Entry `i` holds the box
    /// of slot `k` of node `i` in its lane `k`, enlarged as specified by `options`, and
    /// an invalid box in the lanes of empty slots. This is the table expected by the
    /// queries.
    ///
    /// # Panics
    ///
    /// Panics if `N` is larger than `SIMD_WIDTH`.
    pub fn simd_node_aabbs<T, const D: usize, B>(
        &self,
        boxes: &B,
        options: NodeAabbOptions<T>,
    ) -> Vec<SimdAabb<T, D>>
    where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        Self::assert_simd_compatible();
        self.materialize(boxes, options, None)
    }

    /// Parallel version of [`Bvh::simd_node_aabbs`]. Gives the same result.
    ///
    /// # Panics
    ///
    /// Panics if `N` is larger than `SIMD_WIDTH`.
    pub fn simd_node_aabbs_parallel<T, const D: usize, B>(
        &self,
        boxes: &B,
        options: NodeAabbOptions<T>,
        threshold: usize,
    ) -> Vec<SimdAabb<T, D>>
    where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        Self::assert_simd_compatible();
        self.materialize(boxes, options, Some(threshold))
    }

    pub(super) fn assert_simd_compatible() {
        assert!(
            N <= SIMD_WIDTH,
            "SIMD node boxes require a branching factor of at most {}, found {}.",
            SIMD_WIDTH,
            N
        );
    }

    fn materialize<T, const D: usize, B, L>(
        &self,
        boxes: &B,
        options: NodeAabbOptions<T>,
        parallel_threshold: Option<usize>,
    ) -> Vec<L>
    where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
        L: NodeAabbLayout<T, D>,
    {
        let visitor = NodeAabbVisitor {
            bvh: self,
            boxes,
            options,
            _layout: PhantomData,
        };
        let mut outputs = vec![L::empty(); self.nodes.len()];

        let _root_aabb = match parallel_threshold {
            Some(threshold) => self.traverse_parallel(&visitor, threshold, &mut outputs),
            None => self.traverse(&visitor, &mut outputs),
        };

        outputs
    }
}
