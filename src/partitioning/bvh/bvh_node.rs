use crate::math::first_lanes_mask;

/// The content of one child slot of a [`BvhNode`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BvhChild {
    /// An unused slot. Empty slots only appear after all the used slots of a node.
    #[default]
    Empty,
    /// A leaf slot.
    ///
    /// In standard mode this is the external index of the item. In reordered mode
    /// this is the position, in [`Bvh::item_order`](super::Bvh::item_order), of the
    /// first item of a contiguous run whose length is given by
    /// [`Bvh::node_item_counts`](super::Bvh::node_item_counts).
    Item(u32),
    /// The index of a child node in the node arena.
    Internal(u32),
}

static_assertions::assert_eq_size!(BvhChild, u64);

impl BvhChild {
    /// Is this slot unused?
    #[inline]
    pub fn is_empty(self) -> bool {
        self == BvhChild::Empty
    }

    /// Is this slot a leaf?
    #[inline]
    pub fn is_item(self) -> bool {
        matches!(self, BvhChild::Item(_))
    }

    /// Is this slot referencing a child node?
    #[inline]
    pub fn is_internal(self) -> bool {
        matches!(self, BvhChild::Internal(_))
    }

    /// The value of this leaf slot, if it is one.
    #[inline]
    pub fn item(self) -> Option<u32> {
        match self {
            BvhChild::Item(item) => Some(item),
            _ => None,
        }
    }

    /// The child node referenced by this slot, if it is one.
    #[inline]
    pub fn internal(self) -> Option<u32> {
        match self {
            BvhChild::Internal(node) => Some(node),
            _ => None,
        }
    }
}

/// A node of an `N`-ary BVH.
///
/// The bounding boxes of the children are not stored here. They are computed on demand
/// by [`Bvh::node_aabbs`](super::Bvh::node_aabbs) and
/// [`Bvh::simd_node_aabbs`](super::Bvh::simd_node_aabbs).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BvhNode<const N: usize> {
    /// The child slots of this node.
    pub children: [BvhChild; N],
}

impl<const N: usize> Default for BvhNode<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const N: usize> BvhNode<N> {
    /// A node with only empty slots.
    #[inline]
    pub fn empty() -> Self {
        Self {
            children: [BvhChild::Empty; N],
        }
    }

    /// The number of non-empty slots.
    #[inline]
    pub fn child_count(&self) -> usize {
        self.children.iter().take_while(|c| !c.is_empty()).count()
    }

    /// The non-empty slots of this node.
    #[inline]
    pub fn used_children(&self) -> &[BvhChild] {
        &self.children[..self.child_count()]
    }

    /// Bitmask of the non-empty slots.
    #[inline]
    pub fn used_mask(&self) -> u32 {
        first_lanes_mask(self.child_count())
    }

    /// Bitmask of the leaf slots.
    #[inline]
    pub fn leaf_mask(&self) -> u32 {
        self.mask_where(BvhChild::is_item)
    }

    /// Bitmask of the slots referencing child nodes.
    #[inline]
    pub fn internal_mask(&self) -> u32 {
        self.mask_where(BvhChild::is_internal)
    }

    /// Are all the non-empty slots of this node leaves?
    #[inline]
    pub fn has_only_leaves(&self) -> bool {
        self.internal_mask() == 0
    }

    fn mask_where(&self, pred: impl Fn(BvhChild) -> bool) -> u32 {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, c)| pred(**c))
            .fold(0, |mask, (slot, _)| mask | (1 << slot))
    }

    /// Returns a copy of this node where every child node index is shifted by `base`.
    ///
    /// Used when splicing a subtree built in its own arena into a parent arena.
    #[inline]
    pub(super) fn offset_internal(mut self, base: u32) -> Self {
        for child in self.children.iter_mut() {
            if let BvhChild::Internal(node) = child {
                *node += base;
            }
        }
        self
    }
}
