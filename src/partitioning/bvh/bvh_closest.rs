use super::{Bvh, BvhChild, PointSource, RadiusSource};
use crate::bounding_volume::SimdAabb;
use crate::math::{Point, Real, SimdReal, SIMD_WIDTH};
use crate::utils::WeightedValue;
use alloc::collections::BinaryHeap;
use alloc::vec::Vec;
use arrayvec::ArrayVec;
use na::{SimdPartialOrd, SimdValue};

/// Parameters of a [`Bvh::closest_points`] query.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClosestPointsOptions<T> {
    /// The maximum number of points returned.
    pub max_points: usize,
    /// Distance bound, in squared distance units.
    ///
    /// This is the maximum distance of the returned points or, in `farthest` mode, their
    /// minimum distance.
    pub max_dist_squared: Option<T>,
    /// Search the farthest points instead of the closest ones.
    pub farthest: bool,
}

impl<T> ClosestPointsOptions<T> {
    /// Searches the `max_points` closest points, without distance bound.
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points,
            max_dist_squared: None,
            farthest: false,
        }
    }

    /// Sets the squared distance bound.
    pub fn with_max_dist_squared(mut self, max_dist_squared: T) -> Self {
        self.max_dist_squared = Some(max_dist_squared);
        self
    }

    /// Searches the farthest points instead of the closest ones.
    pub fn farthest(mut self) -> Self {
        self.farthest = true;
        self
    }
}

/// Item and node costs of a search. Lower is better in both modes: the farthest
/// search negates its distances.
struct ClosestPointsCost<'a, T: Real, const D: usize, P: ?Sized> {
    positions: &'a P,
    radii: Option<&'a dyn RadiusSource<T>>,
    query: &'a Point<T, D>,
    farthest: bool,
}

impl<T: Real, const D: usize, P: PointSource<T, D> + ?Sized> ClosestPointsCost<'_, T, D, P> {
    fn item_cost(&self, item: u32) -> T {
        let point = self.positions.point(item as usize);
        let dist_sq = na::distance_squared(&point, self.query);

        match (self.radii, self.farthest) {
            (None, false) => dist_sq,
            (None, true) => -dist_sq,
            (Some(radii), false) => {
                let dist = dist_sq.sqrt() - radii.radius(item as usize).abs();
                dist * dist.abs()
            }
            (Some(radii), true) => {
                let dist = dist_sq.sqrt() + radii.radius(item as usize).abs();
                -(dist * dist)
            }
        }
    }

    /// Lower bounds of the cost of the items under each lane.
    fn lane_costs(&self, aabbs: &SimdAabb<T, D>) -> SimdReal<T> {
        if self.farthest {
            -aabbs.max_distance_squared_to_point(self.query)
        } else {
            let dists = aabbs.distance_squared_to_point(self.query);
            if self.radii.is_some() {
                // The query may be inside of a sphere, making the cost negative.
                let zero = SimdReal::<T>::splat(T::zero());
                dists.select(dists.simd_gt(zero), SimdReal::<T>::splat(-T::INFINITY))
            } else {
                dists
            }
        }
    }

    fn to_distance(&self, cost: T) -> T {
        if self.farthest {
            -cost
        } else {
            cost
        }
    }
}

impl<const N: usize> Bvh<N> {
    /// Finds the points closest to (or farthest from) `query`.
    ///
    /// Returns at most `options.max_points` pairs `(external index, distance)`, sorted
    /// from best to worst, with ties broken by smaller index. The distance is squared.
    ///
    /// With `radii`, each item is the sphere centered at its position, and the distance
    /// to the sphere is used. In closest mode it is `|query - center| - |radius|`
    /// (negative inside of the sphere), reported as the signed square `d * |d|`. In
    /// farthest mode it is `|query - center| + |radius|`, reported squared.
    ///
    /// `node_aabbs` must be the table computed by [`Bvh::simd_node_aabbs`] for boxes
    /// containing the items: the positions, or the spheres if `radii` are given (see
    /// [`SphereAabbs`](super::SphereAabbs)). Leaf ranges of reordered trees are
    /// searched item by item.
    pub fn closest_points<T, const D: usize, P>(
        &self,
        node_aabbs: &[SimdAabb<T, D>],
        positions: &P,
        radii: Option<&dyn RadiusSource<T>>,
        query: &Point<T, D>,
        options: &ClosestPointsOptions<T>,
    ) -> Vec<(u32, T)>
    where
        T: Real,
        P: PointSource<T, D> + ?Sized,
    {
        if self.nodes.is_empty() || options.max_points == 0 {
            return Vec::new();
        }

        debug_assert_eq!(node_aabbs.len(), self.nodes.len());
        debug_assert!(N <= SIMD_WIDTH);

        let costs = ClosestPointsCost {
            positions,
            radii,
            query,
            farthest: options.farthest,
        };
        let limit = match options.max_dist_squared {
            Some(bound) if options.farthest => -bound,
            Some(bound) => bound,
            None => T::INFINITY,
        };

        // Max-heap of the best candidates found so far: the worst one is on top.
        let mut best: BinaryHeap<WeightedValue<T, u32>> = BinaryHeap::new();
        let max_points = options.max_points;
        let bound = |best: &BinaryHeap<WeightedValue<T, u32>>| {
            if best.len() == max_points {
                best.peek().map_or(limit, |worst| worst.cost)
            } else {
                limit
            }
        };

        let mut stack = Self::traversal_stack::<(T, u32)>();
        let mut next = Some(0);

        loop {
            let curr = match next.take() {
                Some(curr) => curr,
                None => {
                    // Skip the nodes that can't improve the result anymore.
                    let mut popped = None;
                    while let Some((cost, node)) = stack.pop() {
                        if cost <= bound(&best) {
                            popped = Some(node);
                            break;
                        }
                    }

                    match popped {
                        Some(node) => node,
                        None => break,
                    }
                }
            };

            let node = &self.nodes[curr as usize];
            let lane_costs = costs.lane_costs(&node_aabbs[curr as usize]);
            let mut internal: ArrayVec<(T, u32), N> = ArrayVec::new();

            for (slot, child) in node.used_children().iter().enumerate() {
                match *child {
                    BvhChild::Item(item) => {
                        if lane_costs.extract(slot) > bound(&best) {
                            continue;
                        }

                        for item in self.leaf_slot_items(curr, slot, item) {
                            let candidate = WeightedValue::new(item, costs.item_cost(item));
                            if candidate.cost > limit {
                                continue;
                            }

                            if best.len() < max_points {
                                best.push(candidate);
                            } else if best.peek().is_some_and(|worst| candidate < *worst) {
                                let _ = best.pop();
                                best.push(candidate);
                            }
                        }
                    }
                    BvhChild::Internal(child) => {
                        internal.push((lane_costs.extract(slot), child))
                    }
                    BvhChild::Empty => {}
                }
            }

            internal.retain(|(cost, _)| *cost <= bound(&best));
            internal.sort_unstable_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(core::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            });

            // Continue with the most promising child, the others are pushed
            // farthest first so the next best is popped first.
            let mut internal = internal.into_iter();
            next = internal.next().map(|(_, child)| child);
            for entry in internal.rev() {
                stack.push(entry);
            }
        }

        best.into_sorted_vec()
            .into_iter()
            .map(|candidate| (candidate.value, costs.to_distance(candidate.cost)))
            .collect()
    }
}
