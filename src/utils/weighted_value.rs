use crate::math::Real;
use core::cmp::Ordering;

/// A value packed with a scalar cost.
///
/// Values are ordered by increasing cost, then by increasing value, so a
/// `BinaryHeap<WeightedValue<_, _>>` is a max-heap keeping the highest cost (and,
/// among equal costs, the highest value) on top.
#[derive(Copy, Clone, Debug)]
pub struct WeightedValue<T, V> {
    /// The packed value.
    pub value: V,
    /// The cost the value is sorted by.
    pub cost: T,
}

impl<T, V> WeightedValue<T, V> {
    /// Creates a new value packed with a cost value.
    #[inline]
    pub fn new(value: V, cost: T) -> Self {
        WeightedValue { value, cost }
    }
}

impl<T: Real, V: Ord> PartialEq for WeightedValue<T, V> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Real, V: Ord> Eq for WeightedValue<T, V> {}

impl<T: Real, V: Ord> PartialOrd for WeightedValue<T, V> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Real, V: Ord> Ord for WeightedValue<T, V> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        if self.cost < other.cost {
            Ordering::Less
        } else if self.cost > other.cost {
            Ordering::Greater
        } else {
            self.value.cmp(&other.value)
        }
    }
}
