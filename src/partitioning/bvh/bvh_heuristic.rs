use crate::bounding_volume::Aabb;
use crate::math::Real;

/// The cost function used to split item ranges while building the tree.
///
/// The builder minimizes `cost(left) * left_count + cost(right) * right_count` over the
/// candidate bipartitions of each range.
#[derive(Default, Clone, Debug, Copy, PartialEq, Eq, Hash)]
pub enum BvhHeuristic {
    /// The sum of the box extents (see [`BoxPerimeter`]).
    BoxPerimeter,
    /// Half the surface area of the box (see [`BoxArea`]). This is the classic SAH and
    /// the recommended default.
    #[default]
    BoxArea,
    /// The volume of the box (see [`BoxVolume`]).
    BoxVolume,
    /// The radius of the box's circumscribed sphere (see [`BoxRadius`]).
    BoxRadius,
    /// The squared radius of the box's circumscribed sphere (see [`BoxRadius2`]).
    BoxRadius2,
    /// The cubed radius of the box's circumscribed sphere (see [`BoxRadius3`]).
    BoxRadius3,
    /// No cost: ranges are split at the median of their longest axis (see
    /// [`MedianMaxAxis`]).
    ///
    /// This is experimental. It bounds the tree depth but gives poorer query
    /// performance than the cost-based heuristics.
    MedianMaxAxis,
}

/// A splitting cost function, monomorphized into the builder.
pub trait SplitHeuristic: Copy + Send + Sync + 'static {
    /// The runtime tag of this heuristic.
    const KIND: BvhHeuristic;
    /// If `true`, ranges are bisected at their median instead of at the lowest cost.
    const MEDIAN_SPLIT: bool = false;

    /// The cost of a box. Must be zero for inverted boxes.
    fn cost<T: Real, const D: usize>(aabb: &Aabb<T, D>) -> T;
}

/// Splits on [`Aabb::axis_sum`].
#[derive(Copy, Clone, Debug, Default)]
pub struct BoxPerimeter;
/// Splits on [`Aabb::half_surface_area`].
#[derive(Copy, Clone, Debug, Default)]
pub struct BoxArea;
/// Splits on [`Aabb::volume`].
#[derive(Copy, Clone, Debug, Default)]
pub struct BoxVolume;
/// Splits on [`Aabb::radius`].
#[derive(Copy, Clone, Debug, Default)]
pub struct BoxRadius;
/// Splits on [`Aabb::radius_squared`].
#[derive(Copy, Clone, Debug, Default)]
pub struct BoxRadius2;
/// Splits on [`Aabb::radius_cubed`].
#[derive(Copy, Clone, Debug, Default)]
pub struct BoxRadius3;
/// Splits at the median along the longest axis of the most populated range.
#[derive(Copy, Clone, Debug, Default)]
pub struct MedianMaxAxis;

impl SplitHeuristic for BoxPerimeter {
    const KIND: BvhHeuristic = BvhHeuristic::BoxPerimeter;

    #[inline]
    fn cost<T: Real, const D: usize>(aabb: &Aabb<T, D>) -> T {
        aabb.axis_sum()
    }
}

impl SplitHeuristic for BoxArea {
    const KIND: BvhHeuristic = BvhHeuristic::BoxArea;

    #[inline]
    fn cost<T: Real, const D: usize>(aabb: &Aabb<T, D>) -> T {
        aabb.half_surface_area()
    }
}

impl SplitHeuristic for BoxVolume {
    const KIND: BvhHeuristic = BvhHeuristic::BoxVolume;

    #[inline]
    fn cost<T: Real, const D: usize>(aabb: &Aabb<T, D>) -> T {
        aabb.volume()
    }
}

impl SplitHeuristic for BoxRadius {
    const KIND: BvhHeuristic = BvhHeuristic::BoxRadius;

    #[inline]
    fn cost<T: Real, const D: usize>(aabb: &Aabb<T, D>) -> T {
        aabb.radius()
    }
}

impl SplitHeuristic for BoxRadius2 {
    const KIND: BvhHeuristic = BvhHeuristic::BoxRadius2;

    #[inline]
    fn cost<T: Real, const D: usize>(aabb: &Aabb<T, D>) -> T {
        aabb.radius_squared()
    }
}

impl SplitHeuristic for BoxRadius3 {
    const KIND: BvhHeuristic = BvhHeuristic::BoxRadius3;

    #[inline]
    fn cost<T: Real, const D: usize>(aabb: &Aabb<T, D>) -> T {
        aabb.radius_cubed()
    }
}

impl SplitHeuristic for MedianMaxAxis {
    const KIND: BvhHeuristic = BvhHeuristic::MedianMaxAxis;
    const MEDIAN_SPLIT: bool = true;

    // Unused: ranges are picked by item count and split at their median.
    #[inline]
    fn cost<T: Real, const D: usize>(aabb: &Aabb<T, D>) -> T {
        aabb.axis_sum()
    }
}
