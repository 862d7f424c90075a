use super::{AabbSource, Bvh, BvhChild, BvhMaskVisitor};
use crate::bounding_volume::{Aabb, SimdAabb};
use crate::math::{first_lanes_mask, mask_bits, Real};
use alloc::vec::Vec;
use na::{SimdBool as _, SimdValue};

/// The maximum number of queries run by a single pass of [`Bvh::intersect_aabbs`].
pub const MAX_BATCHED_QUERIES: usize = 32;

impl<const N: usize> Bvh<N> {
    /// Appends to `out` the external index of every item whose box intersects `query`.
    ///
    /// `node_aabbs` must be the table computed by [`Bvh::simd_node_aabbs`] from `boxes`.
    /// The order of the results is unspecified. Single-item leaves are tested with their
    /// (possibly dilated) lane box. In reordered mode, the items of a leaf range are
    /// then tested one by one against their own box from `boxes`.
    pub fn intersect_aabb<T, const D: usize, B>(
        &self,
        node_aabbs: &[SimdAabb<T, D>],
        boxes: &B,
        query: &Aabb<T, D>,
        out: &mut Vec<u32>,
    ) where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        if self.nodes.is_empty() {
            return;
        }

        debug_assert_eq!(node_aabbs.len(), self.nodes.len());
        let mut stack = Self::traversal_stack();
        let mut curr = 0;

        loop {
            let node = &self.nodes[curr as usize];
            let hits = node_aabbs[curr as usize].intersects_aabb(query).bitmask() as u32;
            let mut next = None;

            for slot in mask_bits(hits & node.used_mask()) {
                match node.children[slot] {
                    BvhChild::Item(item) => {
                        self.push_leaf_hits(boxes, query, curr, slot, item, out)
                    }
                    BvhChild::Internal(child) => {
                        if next.is_none() {
                            next = Some(child);
                        } else {
                            stack.push(child);
                        }
                    }
                    BvhChild::Empty => {}
                }
            }

            match next.or_else(|| stack.pop()) {
                Some(node) => curr = node,
                None => return,
            }
        }
    }

    /// Runs several box queries in a single traversal per batch of
    /// [`MAX_BATCHED_QUERIES`] queries.
    ///
    /// The results of `queries[i]` are appended to `out[i]`, with the same semantics as
    /// [`Bvh::intersect_aabb`].
    ///
    /// # Panics
    ///
    /// Panics if `queries` and `out` have different lengths.
    pub fn intersect_aabbs<T, const D: usize, B>(
        &self,
        node_aabbs: &[SimdAabb<T, D>],
        boxes: &B,
        queries: &[Aabb<T, D>],
        out: &mut [Vec<u32>],
    ) where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        assert_eq!(
            queries.len(),
            out.len(),
            "there must be one output vector per query"
        );

        if self.nodes.is_empty() {
            return;
        }

        debug_assert_eq!(node_aabbs.len(), self.nodes.len());

        for (queries, out) in queries
            .chunks(MAX_BATCHED_QUERIES)
            .zip(out.chunks_mut(MAX_BATCHED_QUERIES))
        {
            // Each stack entry is a node with the mask of the queries hitting it.
            let mut stack = Self::traversal_stack();
            stack.push((0u32, first_lanes_mask(queries.len())));

            while let Some((curr, live)) = stack.pop() {
                let node = &self.nodes[curr as usize];
                let used = node.used_mask();
                let mut children_live = [0u32; N];

                for query_id in mask_bits(live) {
                    let aabbs = &node_aabbs[curr as usize];
                    let hits = aabbs.intersects_aabb(&queries[query_id]).bitmask() as u32;
                    for slot in mask_bits(hits & used) {
                        children_live[slot] |= 1 << query_id;
                    }
                }

                for (slot, child_live) in children_live.iter().enumerate() {
                    if *child_live == 0 {
                        continue;
                    }

                    match node.children[slot] {
                        BvhChild::Item(item) => {
                            for query_id in mask_bits(*child_live) {
                                let query = &queries[query_id];
                                let hits = &mut out[query_id];
                                self.push_leaf_hits(boxes, query, curr, slot, item, hits);
                            }
                        }
                        BvhChild::Internal(child) => stack.push((child, *child_live)),
                        BvhChild::Empty => {}
                    }
                }
            }
        }
    }

    /// Appends to `out` the items of the leaf slot `slot` of `node` that intersect
    /// `query`. The lane box of that slot must intersect `query`.
    fn push_leaf_hits<T, const D: usize, B>(
        &self,
        boxes: &B,
        query: &Aabb<T, D>,
        node: u32,
        slot: usize,
        item: u32,
        out: &mut Vec<u32>,
    ) where
        T: Real,
        B: AabbSource<T, D> + ?Sized,
    {
        if self.reordered {
            let items = self.leaf_slot_items(node, slot, item);
            out.extend(items.filter(|i| boxes.aabb(*i as usize).intersects(query)));
        } else {
            out.push(item);
        }
    }

    /// Coarse box query returning tree slots instead of individual items.
    ///
    /// The descent stops at any node whose box intersects `query` and either has a
    /// smaller [axis sum](Aabb::axis_sum) than `query` or only leaf children. Such nodes
    /// are reported as [`BvhChild::Internal`], and the leaves reached before that as
    /// [`BvhChild::Item`] (raw slot values, see [`BvhChild::Item`]). Every item whose
    /// leaf box intersects `query` is covered by the result, which can also cover items
    /// that do not.
    pub fn intersect_aabb_nodes<T: Real, const D: usize>(
        &self,
        node_aabbs: &[SimdAabb<T, D>],
        query: &Aabb<T, D>,
        out: &mut Vec<BvhChild>,
    ) {
        if self.nodes.is_empty() {
            return;
        }

        debug_assert_eq!(node_aabbs.len(), self.nodes.len());
        let query_size = query.axis_sum();
        let root_aabb = node_aabbs[0].to_merged_aabb();

        if root_aabb.intersects(query)
            && (root_aabb.axis_sum() < query_size || self.nodes[0].has_only_leaves())
        {
            out.push(BvhChild::Internal(0));
            return;
        }

        let mut visitor = NodeIntersectVisitor {
            bvh: self,
            node_aabbs,
            query,
            query_size,
            out,
        };
        self.traverse_vectorized(&mut visitor);
    }
}

struct NodeIntersectVisitor<'a, T: Real, const D: usize, const N: usize> {
    bvh: &'a Bvh<N>,
    node_aabbs: &'a [SimdAabb<T, D>],
    query: &'a Aabb<T, D>,
    query_size: T,
    out: &'a mut Vec<BvhChild>,
}

impl<T: Real, const D: usize, const N: usize> BvhMaskVisitor<N>
    for NodeIntersectVisitor<'_, T, D, N>
{
    type Data = ();

    fn pre(&mut self, node: u32, _: &mut ()) -> u32 {
        let aabbs = &self.node_aabbs[node as usize];
        let children = &self.bvh.nodes[node as usize].children;
        let sizes = aabbs.axis_sum();
        let mut mask = aabbs.intersects_aabb(self.query).bitmask() as u32;

        for slot in mask_bits(mask & self.bvh.nodes[node as usize].internal_mask()) {
            if let BvhChild::Internal(child) = children[slot] {
                if sizes.extract(slot) < self.query_size
                    || self.bvh.nodes[child as usize].has_only_leaves()
                {
                    self.out.push(BvhChild::Internal(child));
                    mask &= !(1 << slot);
                }
            }
        }

        mask
    }

    fn item(&mut self, item: u32, _: u32, _: usize, _: &mut ()) {
        self.out.push(BvhChild::Item(item));
    }
}
