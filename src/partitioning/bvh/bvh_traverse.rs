use super::{Bvh, BvhChild};
use crate::math::mask_bits;

#[cfg(feature = "parallel")]
use {alloc::vec::Vec, arrayvec::ArrayVec, rayon::prelude::*};

/// The default subtree node count above which [`Bvh::traverse_parallel`] visits
/// sibling subtrees concurrently.
pub const PARALLEL_TRAVERSAL_THRESHOLD: usize = 256;

/// A depth-first visitor of the nodes and items of a [`Bvh`].
///
/// Each visited node (and item) gets a fresh `Data`, initialized with `Default`. The
/// data of the children of a node are handed to [`BvhVisitor::post`] once they have
/// all been visited, so results can be aggregated bottom-up.
///
/// Under [`Bvh::traverse_parallel`], sibling subtrees may be visited concurrently and
/// in any order, so visitors must not rely on the order of sibling calls.
pub trait BvhVisitor<const N: usize> {
    /// Per-node data, flowing from the children to their parent.
    type Data: Default + Send;
    /// Per-node output, written into the caller-provided table.
    type Output: Send;

    /// Called before visiting the children of `node`. Return `false` to skip them
    /// (`post` is then skipped too).
    fn pre(&self, _node: u32, _data: &mut Self::Data) -> bool {
        true
    }

    /// Called for each leaf slot `slot` of `parent`. `item` is the raw slot value (see
    /// [`BvhChild::Item`]).
    fn item(&self, item: u32, parent: u32, slot: usize, data: &mut Self::Data);

    /// Called after visiting the children of `node`, with the data of its non-empty
    /// slots and the table entry of `node`.
    fn post(
        &self,
        node: u32,
        parent: Option<u32>,
        data: &mut Self::Data,
        children: &[Self::Data],
        output: &mut Self::Output,
    );
}

/// A depth-first visitor selecting the children to visit with a bitmask.
///
/// This suits visitors testing all the children of a node at once, e.g., with a
/// [`SimdAabb`](crate::bounding_volume::SimdAabb).
pub trait BvhMaskVisitor<const N: usize> {
    /// Per-node data, flowing from the children to their parent.
    type Data: Default;

    /// Called before visiting the children of `node`. Returns the mask of the slots to
    /// visit: bit `i` set means that slot `i` is visited.
    fn pre(&mut self, node: u32, data: &mut Self::Data) -> u32;

    /// Called for each selected leaf slot `slot` of `parent`.
    fn item(&mut self, item: u32, parent: u32, slot: usize, data: &mut Self::Data);

    /// Called after visiting the selected children of `node`. `children` holds the data
    /// of every non-empty slot; the unselected ones keep their default value.
    fn post(
        &mut self,
        _node: u32,
        _parent: Option<u32>,
        _data: &mut Self::Data,
        _mask: u32,
        _children: &[Self::Data],
    ) {
    }
}

impl<const N: usize> Bvh<N> {
    /// Visits the tree depth-first, serially.
    ///
    /// `outputs` is the per-node output table: `outputs[i]` is handed to the `post` call
    /// of node `i`. Returns the data of the root.
    ///
    /// # Panics
    ///
    /// Panics if `outputs.len()` differs from [`Bvh::num_nodes`].
    pub fn traverse<V: BvhVisitor<N>>(&self, visitor: &V, outputs: &mut [V::Output]) -> V::Data {
        assert_eq!(
            outputs.len(),
            self.nodes.len(),
            "the output table must have one entry per node"
        );
        let mut data = V::Data::default();

        if !self.nodes.is_empty() {
            self.traverse_serial_recursive(visitor, 0, None, &mut data, outputs);
        }

        data
    }

    fn traverse_serial_recursive<V: BvhVisitor<N>>(
        &self,
        visitor: &V,
        node: u32,
        parent: Option<u32>,
        data: &mut V::Data,
        outputs: &mut [V::Output],
    ) {
        if !visitor.pre(node, data) {
            return;
        }

        let children = self.nodes[node as usize].used_children();
        let mut children_data: [V::Data; N] = core::array::from_fn(|_| V::Data::default());

        let slots = children.iter().zip(children_data.iter_mut()).enumerate();
        for (slot, (child, child_data)) in slots {
            match *child {
                BvhChild::Item(item) => visitor.item(item, node, slot, child_data),
                BvhChild::Internal(child) => {
                    self.traverse_serial_recursive(visitor, child, Some(node), child_data, outputs)
                }
                BvhChild::Empty => {}
            }
        }

        visitor.post(
            node,
            parent,
            data,
            &children_data[..children.len()],
            &mut outputs[node as usize],
        );
    }

    /// Visits the tree depth-first, running large sibling subtrees concurrently.
    ///
    /// The children of a node with at least `threshold` nodes in their subtree are
    /// visited as parallel tasks, provided there are at least two of them. The other
    /// children are visited first, serially. Each task writes into its own slice of
    /// `outputs` since subtrees are contiguous in the node arena.
    ///
    /// Without the `parallel` feature, this is [`Bvh::traverse`].
    ///
    /// # Panics
    ///
    /// Panics if `outputs.len()` differs from [`Bvh::num_nodes`].
    #[cfg(feature = "parallel")]
    pub fn traverse_parallel<V>(
        &self,
        visitor: &V,
        threshold: usize,
        outputs: &mut [V::Output],
    ) -> V::Data
    where
        V: BvhVisitor<N> + Sync,
    {
        assert_eq!(
            outputs.len(),
            self.nodes.len(),
            "the output table must have one entry per node"
        );
        let mut data = V::Data::default();

        if !self.nodes.is_empty() {
            let threshold = threshold.max(1);
            self.traverse_parallel_recursive(visitor, 0, None, &mut data, outputs, threshold);
        }

        data
    }

    /// Visits the tree depth-first, running large sibling subtrees concurrently.
    ///
    /// Without the `parallel` feature, this is [`Bvh::traverse`].
    #[cfg(not(feature = "parallel"))]
    pub fn traverse_parallel<V>(
        &self,
        visitor: &V,
        _threshold: usize,
        outputs: &mut [V::Output],
    ) -> V::Data
    where
        V: BvhVisitor<N> + Sync,
    {
        self.traverse(visitor, outputs)
    }

    /// `outputs` is the output table of the subtree of `node`, starting with the entry
    /// of `node` itself.
    #[cfg(feature = "parallel")]
    fn traverse_parallel_recursive<V>(
        &self,
        visitor: &V,
        node: u32,
        parent: Option<u32>,
        data: &mut V::Data,
        outputs: &mut [V::Output],
        threshold: usize,
    ) where
        V: BvhVisitor<N> + Sync,
    {
        if !visitor.pre(node, data) {
            return;
        }

        let Some((output, mut rest)) = outputs.split_first_mut() else {
            return;
        };

        let children = self.nodes[node as usize].used_children();
        let mut children_data: [V::Data; N] = core::array::from_fn(|_| V::Data::default());
        let mut children_outputs: [&mut [V::Output]; N] =
            core::array::from_fn(|_| Default::default());
        let mut num_large = 0;

        // Carve the output table of each child subtree, in slot order.
        let node_end = node + 1 + rest.len() as u32;
        let ends = self.child_subtree_ends(node, node_end);
        for (slot, child) in children.iter().enumerate() {
            if let BvhChild::Internal(child) = *child {
                let size = (ends[slot] - child) as usize;
                let (head, tail) = core::mem::take(&mut rest).split_at_mut(size);
                children_outputs[slot] = head;
                rest = tail;
                num_large += (size >= threshold) as usize;
            }
        }

        let run_parallel = num_large >= 2;
        let mut tasks: ArrayVec<(u32, &mut V::Data, &mut [V::Output]), N> = ArrayVec::new();

        for (slot, ((child, child_data), child_outputs)) in children
            .iter()
            .zip(children_data.iter_mut())
            .zip(children_outputs.iter_mut())
            .enumerate()
        {
            match *child {
                BvhChild::Item(item) => visitor.item(item, node, slot, child_data),
                BvhChild::Internal(child) => {
                    let child_outputs = core::mem::take(child_outputs);
                    if run_parallel && child_outputs.len() >= threshold {
                        tasks.push((child, child_data, child_outputs));
                    } else {
                        self.traverse_parallel_recursive(
                            visitor,
                            child,
                            Some(node),
                            child_data,
                            child_outputs,
                            threshold,
                        );
                    }
                }
                BvhChild::Empty => {}
            }
        }

        // The tasks borrow `children_data`, they must be consumed before `post`.
        let tasks: Vec<_> = tasks.into_iter().collect();
        if !tasks.is_empty() {
            log::trace!(
                "Visiting {} subtrees of node {} in parallel.",
                tasks.len(),
                node
            );
        }
        tasks
            .into_par_iter()
            .for_each(|(child, child_data, child_outputs)| {
                self.traverse_parallel_recursive(
                    visitor,
                    child,
                    Some(node),
                    child_data,
                    child_outputs,
                    threshold,
                )
            });

        visitor.post(node, parent, data, &children_data[..children.len()], output);
    }

    /// Visits the tree depth-first, descending only into the children selected by the
    /// mask returned by [`BvhMaskVisitor::pre`]. Returns the data of the root.
    pub fn traverse_vectorized<V: BvhMaskVisitor<N>>(&self, visitor: &mut V) -> V::Data {
        let mut data = V::Data::default();

        if !self.nodes.is_empty() {
            self.traverse_vectorized_recursive(visitor, 0, None, &mut data);
        }

        data
    }

    fn traverse_vectorized_recursive<V: BvhMaskVisitor<N>>(
        &self,
        visitor: &mut V,
        node: u32,
        parent: Option<u32>,
        data: &mut V::Data,
    ) {
        let children = self.nodes[node as usize].used_children();
        let mask = visitor.pre(node, data) & self.nodes[node as usize].used_mask();
        let mut children_data: [V::Data; N] = core::array::from_fn(|_| V::Data::default());

        for slot in mask_bits(mask) {
            match children[slot] {
                BvhChild::Item(item) => visitor.item(item, node, slot, &mut children_data[slot]),
                BvhChild::Internal(child) => self.traverse_vectorized_recursive(
                    visitor,
                    child,
                    Some(node),
                    &mut children_data[slot],
                ),
                BvhChild::Empty => {}
            }
        }

        visitor.post(node, parent, data, mask, &children_data[..children.len()]);
    }
}
