use super::{Bvh, BvhChild};
use alloc::vec;
use alloc::vec::Vec;

impl<const N: usize> Bvh<N> {
    /// Counts the number of items that can be reached from the node at index `id`.
    ///
    /// This is mostly a utility for debugging.
    pub fn reachable_item_count(&self, id: u32) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let node = &self.nodes[id as usize];
        node.used_children()
            .iter()
            .enumerate()
            .map(|(slot, child)| match *child {
                BvhChild::Item(item) => self.leaf_slot_items(id, slot, item).count(),
                BvhChild::Internal(child) => self.reachable_item_count(child),
                BvhChild::Empty => 0,
            })
            .sum()
    }

    /// Panics if the tree isn’t well-formed.
    ///
    /// The tree is well-formed if its nodes are stored in depth-first pre-order, empty
    /// slots only appear at the end of nodes, every item of [`Bvh::item_order`] is
    /// referenced by exactly one leaf slot, and (in reordered mode) the per-slot item
    /// counts match the subtrees.
    pub fn assert_well_formed(&self) {
        if self.nodes.is_empty() {
            assert!(self.item_order.is_empty());
            return;
        }

        if self.reordered {
            assert_eq!(self.node_item_counts.len(), self.nodes.len());
        }

        self.assert_is_depth_first();

        let mut covered = vec![false; self.item_order.len()];
        let mut external = Vec::new();
        let count = self.assert_well_formed_recurse(0, &mut covered, &mut external);
        assert_eq!(count, self.item_order.len());

        if self.reordered {
            assert!(covered.iter().all(|c| *c), "some items aren't referenced.");
        } else {
            let mut expected = self.item_order.clone();
            expected.sort_unstable();
            external.sort_unstable();
            assert_eq!(external, expected, "leaves and item order mismatch.");
        }
    }

    fn assert_well_formed_recurse(
        &self,
        node_id: u32,
        covered: &mut [bool],
        external: &mut Vec<u32>,
    ) -> usize {
        let node = &self.nodes[node_id as usize];
        let num_children = node.child_count();
        assert!(num_children > 0, "node {} is empty.", node_id);
        assert!(
            node.children[num_children..].iter().all(|c| c.is_empty()),
            "node {} has a used slot after an empty one.",
            node_id
        );

        let mut total = 0;
        for (slot, child) in node.used_children().iter().enumerate() {
            let count = match *child {
                BvhChild::Item(item) => {
                    if self.reordered {
                        let start = item as usize;
                        let len = self.node_item_counts[node_id as usize][slot] as usize;
                        assert!(len > 0);
                        for position in start..start + len {
                            assert!(!covered[position], "item {} is referenced twice.", position);
                            covered[position] = true;
                        }
                        len
                    } else {
                        external.push(item);
                        1
                    }
                }
                BvhChild::Internal(child) => {
                    assert!(child > node_id);
                    let count = self.assert_well_formed_recurse(child, covered, external);
                    assert!(count > 1, "node {} has a single item.", child);
                    count
                }
                BvhChild::Empty => unreachable!(),
            };

            if self.reordered {
                assert_eq!(self.node_item_counts[node_id as usize][slot] as usize, count);
            }

            total += count;
        }

        total
    }

    /// Panics if the nodes of `self` are not stored in depth-first pre-order, with the
    /// children subtrees in slot order.
    pub fn assert_is_depth_first(&self) {
        if self.nodes.is_empty() {
            return;
        }

        let mut stack = vec![0];
        let mut loop_id = 0;

        while let Some(id) = stack.pop() {
            assert_eq!(loop_id, id, "nodes aren't stored in depth-first order.");
            loop_id += 1;

            let node = &self.nodes[id as usize];
            for child in node.children.iter().rev() {
                if let BvhChild::Internal(child) = *child {
                    stack.push(child);
                }
            }
        }

        assert_eq!(loop_id as usize, self.nodes.len());
    }
}
