use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, SimdBool, SimdReal, Vector, SIMD_WIDTH};
use na::{SimdComplexField, SimdPartialOrd, SimdValue};

/// Four AABBs represented as a single SoA AABB with SIMD components.
///
/// The hierarchy stores one of these per node, holding the boxes of the node's
/// children. Lanes without a child hold [`Aabb::new_invalid`], which never intersects
/// anything.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SimdAabb<T: Real, const D: usize> {
    /// The min coordinates of the AABBs.
    pub mins: Point<SimdReal<T>, D>,
    /// The max coordinates of the AABBs.
    pub maxs: Point<SimdReal<T>, D>,
}

impl<T: Real, const D: usize> SimdAabb<T, D> {
    /// An invalid AABB on every lane.
    pub fn new_invalid() -> Self {
        Self::splat(Aabb::new_invalid())
    }

    /// Builds an SIMD aabb composed of four identical aabbs.
    pub fn splat(aabb: Aabb<T, D>) -> Self {
        Self {
            mins: Point::splat(aabb.mins),
            maxs: Point::splat(aabb.maxs),
        }
    }

    /// Builds an SIMD aabb from up to `SIMD_WIDTH` aabbs. Missing lanes are set to
    /// the invalid AABB.
    ///
    /// # Panics
    ///
    /// Panics if `aabbs` contains more than `SIMD_WIDTH` elements.
    pub fn from_aabbs(aabbs: &[Aabb<T, D>]) -> Self {
        assert!(
            aabbs.len() <= SIMD_WIDTH,
            "a SimdAabb holds at most {} boxes",
            SIMD_WIDTH
        );
        let mut result = Self::new_invalid();
        for (lane, aabb) in aabbs.iter().enumerate() {
            result.replace(lane, *aabb);
        }
        result
    }

    /// Replace the `i-th` AABB of this SIMD AABB by the given value.
    #[inline]
    pub fn replace(&mut self, lane: usize, aabb: Aabb<T, D>) {
        self.mins.replace(lane, aabb.mins);
        self.maxs.replace(lane, aabb.maxs);
    }

    /// Extracts the AABB stored in the given lane.
    #[inline]
    pub fn extract(&self, lane: usize) -> Aabb<T, D> {
        Aabb::new(self.mins.extract(lane), self.maxs.extract(lane))
    }

    /// Lanes where `mins <= maxs` along every axis.
    #[inline]
    pub fn is_valid(&self) -> SimdBool {
        let mut result = SimdBool::splat(true);
        for i in 0..D {
            result = result & self.mins[i].simd_le(self.maxs[i]);
        }
        result
    }

    /// Dilate every valid lane by `epsilon` plus its extents multiplied by `fraction`.
    pub fn dilate(&mut self, epsilon: T, fraction: T) {
        // Invalid lanes hold `Real::MAX` bounds: their extents overflow, so the margin
        // is selected away instead of being computed from them.
        let is_valid = self.is_valid();
        let zero = SimdReal::<T>::splat(T::zero());
        let epsilon = SimdReal::<T>::splat(epsilon);
        let fraction = SimdReal::<T>::splat(fraction);

        for i in 0..D {
            let extent = (self.maxs[i] - self.mins[i]).simd_max(zero);
            let margin = (extent * fraction + epsilon).select(is_valid, zero);
            self.mins[i] -= margin;
            self.maxs[i] += margin;
        }
    }

    /// Lanewise check which AABB represented by `self` intersects the given set of
    /// `other` aabbs.
    #[inline]
    pub fn intersects(&self, other: &Self) -> SimdBool {
        let mut result = SimdBool::splat(true);
        for i in 0..D {
            result = result
                & self.mins[i].simd_le(other.maxs[i])
                & other.mins[i].simd_le(self.maxs[i]);
        }
        result
    }

    /// Check which AABB represented by `self` intersects the single box `aabb`.
    #[inline]
    pub fn intersects_aabb(&self, aabb: &Aabb<T, D>) -> SimdBool {
        self.intersects(&Self::splat(*aabb))
    }

    /// Check which AABB represented by `self` contains the given `point`.
    #[inline]
    pub fn contains_point(&self, point: &Point<T, D>) -> SimdBool {
        let point = Point::<SimdReal<T>, D>::splat(*point);
        let mut result = SimdBool::splat(true);
        for i in 0..D {
            result = result & self.mins[i].simd_le(point[i]) & self.maxs[i].simd_ge(point[i]);
        }
        result
    }

    /// The squared distances between `point` and the closest point of each AABB.
    #[inline]
    pub fn distance_squared_to_point(&self, point: &Point<T, D>) -> SimdReal<T> {
        let point = Point::<SimdReal<T>, D>::splat(*point);
        let mins_point = self.mins - point;
        let point_maxs = point - self.maxs;
        let shift = mins_point.sup(&point_maxs).sup(&Vector::zeros());
        shift.norm_squared()
    }

    /// The squared distances between `point` and the farthest point of each AABB.
    #[inline]
    pub fn max_distance_squared_to_point(&self, point: &Point<T, D>) -> SimdReal<T> {
        let point = Point::<SimdReal<T>, D>::splat(*point);
        let mins_point = (self.mins - point).map(|e| e.simd_abs());
        let point_maxs = (point - self.maxs).map(|e| e.simd_abs());
        mins_point.sup(&point_maxs).norm_squared()
    }

    /// The axis sum (see [`Aabb::axis_sum`]) of each AABB.
    #[inline]
    pub fn axis_sum(&self) -> SimdReal<T> {
        let zero = SimdReal::<T>::splat(T::zero());
        (self.maxs - self.mins)
            .iter()
            .fold(zero, |sum, extent| sum + extent.simd_max(zero))
    }

    /// Merge all the AABB represented by `self` into a single one.
    pub fn to_merged_aabb(&self) -> Aabb<T, D> {
        Aabb::new(
            self.mins.coords.map(|e| e.simd_horizontal_min()).into(),
            self.maxs.coords.map(|e| e.simd_horizontal_max()).into(),
        )
    }
}

impl<T: Real, const D: usize> Default for SimdAabb<T, D> {
    fn default() -> Self {
        Self::new_invalid()
    }
}
