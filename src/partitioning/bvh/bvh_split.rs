//! Range partitioning used by the builder.
//!
//! Ranges of at most [`SMALL_LIMIT`] items are bisected exhaustively. Larger ranges
//! are binned along the longest axis of their bounding box, then split at the span
//! boundary with the lowest heuristic cost among those leaving at least
//! `n / MIN_FRACTION` items on each side.

use super::bvh_build::BvhBuilder;
use super::{AabbSource, SplitHeuristic};
use crate::bounding_volume::Aabb;
use crate::math::{real_from_usize, Real};
use arrayvec::ArrayVec;
use core::cmp::Ordering;

/// Number of equal-width spans item centers are binned into.
pub const NUM_SPANS: usize = 16;
/// Each side of a binned split holds at least `max(1, n / MIN_FRACTION)` items.
pub const MIN_FRACTION: usize = 16;
/// Ranges with at most this many items are bisected exhaustively.
pub const SMALL_LIMIT: usize = 6;

/// A contiguous run of the index array being partitioned, with its bounding box.
#[derive(Copy, Clone, Debug)]
pub(super) struct SubRange<T: Real, const D: usize> {
    pub start: usize,
    pub len: usize,
    pub aabb: Aabb<T, D>,
}

#[derive(Copy, Clone)]
struct Span<T: Real, const D: usize> {
    aabb: Aabb<T, D>,
    count: usize,
}

/// The result of a bisection: the first `left_len` indices form the left part.
struct Bisection<T: Real, const D: usize> {
    left_len: usize,
    left: Aabb<T, D>,
    right: Aabb<T, D>,
}

impl<T, const D: usize, const N: usize, H, B> BvhBuilder<'_, T, D, N, H, B>
where
    T: Real,
    H: SplitHeuristic,
    B: AabbSource<T, D> + ?Sized,
{
    /// The bounding box of the given items.
    pub(super) fn aabb_of(&self, indices: &[u32]) -> Aabb<T, D> {
        let mut result = Aabb::new_invalid();
        for i in indices {
            result.merge(&self.boxes.aabb(*i as usize));
        }
        result
    }

    /// Partitions `indices` (more than `N` items) into `N` contiguous non-empty ranges.
    ///
    /// The range with the highest `cost × count` (or the most populated one for
    /// median splits) is bisected until there are `N` ranges. Ties go to the most
    /// populated range, then to the first one.
    pub(super) fn split_n_way(
        &self,
        indices: &mut [u32],
        aabb: Aabb<T, D>,
    ) -> ArrayVec<SubRange<T, D>, N> {
        let mut ranges = ArrayVec::new();
        ranges.push(SubRange {
            start: 0,
            len: indices.len(),
            aabb,
        });

        while ranges.len() < N {
            let mut best: Option<(usize, T, usize)> = None;

            for (i, range) in ranges.iter().enumerate() {
                if range.len < 2 {
                    continue;
                }

                let score = if H::MEDIAN_SPLIT {
                    T::zero()
                } else {
                    H::cost(&range.aabb) * real_from_usize(range.len)
                };

                let better = match best {
                    None => true,
                    Some((_, best_score, best_len)) => {
                        score > best_score || (score == best_score && range.len > best_len)
                    }
                };

                if better {
                    best = Some((i, score, range.len));
                }
            }

            let Some((i, _, _)) = best else {
                break;
            };

            let range = ranges[i];
            let range_indices = &mut indices[range.start..range.start + range.len];
            let split = self.bisect(range_indices, &range.aabb);
            ranges[i] = SubRange {
                start: range.start,
                len: split.left_len,
                aabb: split.left,
            };
            ranges.insert(
                i + 1,
                SubRange {
                    start: range.start + split.left_len,
                    len: range.len - split.left_len,
                    aabb: split.right,
                },
            );
        }

        ranges
    }

    /// Splits `indices` (at least two items) into two non-empty parts.
    fn bisect(&self, indices: &mut [u32], aabb: &Aabb<T, D>) -> Bisection<T, D> {
        debug_assert!(indices.len() >= 2);
        let axis = aabb.largest_axis();

        if aabb.extent(axis) <= T::zero() {
            // All the centers coincide.
            self.split_at(indices, indices.len() / 2)
        } else if H::MEDIAN_SPLIT {
            self.split_at_order_statistic(indices, axis, indices.len() / 2)
        } else if indices.len() <= SMALL_LIMIT {
            self.split_exhaustive(indices)
        } else {
            self.split_binned(indices, aabb, axis)
        }
    }

    /// Tries every bipartition with the first item on the left side, and keeps the
    /// first one with the lowest cost. The parts keep their relative order.
    fn split_exhaustive(&self, indices: &mut [u32]) -> Bisection<T, D> {
        let n = indices.len();
        let aabbs: ArrayVec<Aabb<T, D>, SMALL_LIMIT> =
            indices.iter().map(|i| self.boxes.aabb(*i as usize)).collect();

        let mut best: Option<(u32, T, Aabb<T, D>, Aabb<T, D>)> = None;

        // Bit `j - 1` of the mask is set if the item `j` goes right.
        for mask in 1u32..(1 << (n - 1)) {
            let mut left = aabbs[0];
            let mut right = Aabb::new_invalid();
            let right_count = mask.count_ones() as usize;

            for (j, aabb) in aabbs.iter().enumerate().skip(1) {
                if mask & (1 << (j - 1)) != 0 {
                    right.merge(aabb);
                } else {
                    left.merge(aabb);
                }
            }

            let cost = H::cost(&left) * real_from_usize(n - right_count)
                + H::cost(&right) * real_from_usize(right_count);

            if best.map_or(true, |(_, best_cost, _, _)| cost < best_cost) {
                best = Some((mask, cost, left, right));
            }
        }

        let Some((mask, _, left, right)) = best else {
            return self.split_at(indices, n / 2);
        };

        let mut lhs: ArrayVec<u32, SMALL_LIMIT> = ArrayVec::new();
        let mut rhs: ArrayVec<u32, SMALL_LIMIT> = ArrayVec::new();
        for (j, i) in indices.iter().enumerate() {
            if j > 0 && mask & (1 << (j - 1)) != 0 {
                rhs.push(*i);
            } else {
                lhs.push(*i);
            }
        }

        indices[..lhs.len()].copy_from_slice(&lhs);
        indices[lhs.len()..].copy_from_slice(&rhs);

        Bisection {
            left_len: lhs.len(),
            left,
            right,
        }
    }

    /// Bins the item centers into [`NUM_SPANS`] spans along `axis` and splits at the
    /// cheapest balanced span boundary.
    fn split_binned(
        &self,
        indices: &mut [u32],
        aabb: &Aabb<T, D>,
        axis: usize,
    ) -> Bisection<T, D> {
        let n = indices.len();
        let min = aabb.mins[axis];
        let extent = aabb.extent(axis);
        let num_spans = real_from_usize::<T>(NUM_SPANS);
        let span_of = |i: u32| -> usize {
            let center = self.boxes.aabb(i as usize).center_along(axis);
            ((center - min) / extent * num_spans)
                .floor()
                .to_usize()
                .unwrap_or(0)
                .min(NUM_SPANS - 1)
        };

        let mut spans = [Span {
            aabb: Aabb::new_invalid(),
            count: 0,
        }; NUM_SPANS];

        for i in indices.iter() {
            let span = &mut spans[span_of(*i)];
            span.aabb.merge(&self.boxes.aabb(*i as usize));
            span.count += 1;
        }

        // Suffix boxes and counts: `right_spans[b]` covers `spans[b..]`.
        let mut right_spans = spans;
        for b in (0..NUM_SPANS - 1).rev() {
            let next = right_spans[b + 1];
            right_spans[b].aabb.merge(&next.aabb);
            right_spans[b].count += next.count;
        }

        let min_count = (n / MIN_FRACTION).max(1);
        let mut best: Option<(usize, T, Span<T, D>)> = None;
        let mut best_unbalanced: Option<(T, usize)> = None;
        let mut left = Span {
            aabb: Aabb::new_invalid(),
            count: 0,
        };

        for b in 1..NUM_SPANS {
            left.aabb.merge(&spans[b - 1].aabb);
            left.count += spans[b - 1].count;
            let right = &right_spans[b];

            if left.count == 0 || right.count == 0 {
                continue;
            }

            let cost = H::cost(&left.aabb) * real_from_usize(left.count)
                + H::cost(&right.aabb) * real_from_usize(right.count);

            if left.count >= min_count && right.count >= min_count {
                if best.map_or(true, |(_, best_cost, _)| cost < best_cost) {
                    best = Some((b, cost, left));
                }
            } else if best_unbalanced.map_or(true, |(best_cost, _)| cost < best_cost) {
                best_unbalanced = Some((cost, left.count));
            }
        }

        if let Some((b, _, left)) = best {
            let mut lo = 0;
            let mut hi = n;
            while lo < hi {
                if span_of(indices[lo]) < b {
                    lo += 1;
                } else {
                    hi -= 1;
                    indices.swap(lo, hi);
                }
            }
            debug_assert_eq!(lo, left.count);

            return Bisection {
                left_len: left.count,
                left: left.aabb,
                right: right_spans[b].aabb,
            };
        }

        // No balanced boundary: split by order statistic at the count closest to the
        // best boundary that satisfies the balance bound.
        let k = match best_unbalanced {
            Some((_, left_count)) if left_count < min_count => min_count,
            Some(_) => n - min_count,
            None => n / 2,
        };

        self.split_at_order_statistic(indices, axis, k)
    }

    /// Puts the `k` items with the smallest centers along `axis` first. Ties between
    /// centers are broken by item index.
    fn split_at_order_statistic(
        &self,
        indices: &mut [u32],
        axis: usize,
        k: usize,
    ) -> Bisection<T, D> {
        debug_assert!(k > 0 && k < indices.len());
        let key = |i: u32| {
            let aabb = self.boxes.aabb(i as usize);
            aabb.mins[axis] + aabb.maxs[axis]
        };

        let _ = indices.select_nth_unstable_by(k, |a, b| {
            key(*a)
                .partial_cmp(&key(*b))
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(b))
        });

        self.split_at(indices, k)
    }

    /// Splits `indices` at `k` without moving anything.
    fn split_at(&self, indices: &[u32], k: usize) -> Bisection<T, D> {
        Bisection {
            left_len: k,
            left: self.aabb_of(&indices[..k]),
            right: self.aabb_of(&indices[k..]),
        }
    }
}
