//! Axis Aligned Bounding Box.

use crate::math::{half, Point, Real, Vector};

/// An Axis-Aligned Bounding Box (AABB) with `D` axes.
///
/// An AABB is the simplest bounding volume, defined by its minimum and maximum corners.
/// It's called "axis-aligned" because its edges are always parallel to the coordinate
/// axes, making it very fast to test and to merge.
///
/// # Structure
///
/// - **mins**: the smallest coordinate of the box along each axis.
/// - **maxs**: the largest coordinate of the box along each axis.
/// - **Invariant**: `mins[i] <= maxs[i]` for every axis `i` of a valid box.
///
/// A box with `mins[i] > maxs[i]` on some axis is *inverted*. The inverted box
/// returned by [`Aabb::new_invalid`] is the neutral element of [`Aabb::merge`] and is
/// used as an empty accumulator: it never intersects anything and all its size
/// measures are zero.
///
/// # Example
///
/// ```
/// # use nbvh::bounding_volume::Aabb;
/// # use nbvh::na::Point3;
/// let mut aabb = Aabb::<f32, 3>::new_invalid();
/// aabb.merge(&Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)));
/// aabb.merge(&Aabb::new(Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 1.0, 1.0)));
///
/// assert_eq!(aabb.mins, Point3::new(0.0, 0.0, 0.0));
/// assert_eq!(aabb.maxs, Point3::new(3.0, 1.0, 1.0));
/// assert_eq!(aabb.volume(), 3.0);
/// ```
#[derive(Debug, PartialEq, Copy, Clone)]
#[repr(C)]
pub struct Aabb<T: Real, const D: usize> {
    /// The smallest coordinates of the box along each axis.
    pub mins: Point<T, D>,
    /// The largest coordinates of the box along each axis.
    pub maxs: Point<T, D>,
}

impl<T: Real, const D: usize> Aabb<T, D> {
    /// Creates a new AABB from its minimum and maximum corners.
    ///
    /// The corners are not checked: `mins` should be smaller than `maxs` along each
    /// axis for the box to be valid.
    #[inline]
    pub fn new(mins: Point<T, D>, maxs: Point<T, D>) -> Self {
        Self { mins, maxs }
    }

    /// Creates an invalid AABB with `mins` set to the largest finite value and `maxs`
    /// set to the smallest one.
    ///
    /// Merging any box into it yields that box.
    #[inline]
    pub fn new_invalid() -> Self {
        Self::new(
            Vector::<T, D>::repeat(T::MAX).into(),
            Vector::<T, D>::repeat(-T::MAX).into(),
        )
    }

    /// Creates the degenerate AABB containing only `point`.
    #[inline]
    pub fn from_point(point: Point<T, D>) -> Self {
        Self::new(point, point)
    }

    /// Creates an AABB from its center and its half-extents.
    #[inline]
    pub fn from_half_extents(center: Point<T, D>, half_extents: Vector<T, D>) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Creates the smallest AABB containing all the given points.
    ///
    /// Returns an invalid AABB if the iterator is empty.
    pub fn from_points(points: impl IntoIterator<Item = Point<T, D>>) -> Self {
        let mut result = Self::new_invalid();
        for point in points {
            result.take_point(point);
        }
        result
    }

    /// Does this AABB have `mins <= maxs` along every axis?
    #[inline]
    pub fn is_valid(&self) -> bool {
        na::partial_le(&self.mins, &self.maxs)
    }

    /// Are all the bounds of this AABB finite (neither NaN nor infinite)?
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.mins.iter().chain(self.maxs.iter()).all(|x| x.is_finite())
    }

    /// The center of this AABB.
    #[inline]
    pub fn center(&self) -> Point<T, D> {
        na::center(&self.mins, &self.maxs)
    }

    /// The coordinate of the center of this AABB along the given axis.
    #[inline]
    pub fn center_along(&self, axis: usize) -> T {
        (self.mins[axis] + self.maxs[axis]) * half()
    }

    /// The width of this AABB along the given axis.
    ///
    /// This is zero for inverted axes.
    #[inline]
    pub fn extent(&self, axis: usize) -> T {
        (self.maxs[axis] - self.mins[axis]).max(T::zero())
    }

    /// The widths of this AABB along each axis, with inverted axes counting as zero.
    #[inline]
    pub fn extents(&self) -> Vector<T, D> {
        (self.maxs - self.mins).sup(&Vector::zeros())
    }

    /// The half-widths of this AABB along each axis.
    #[inline]
    pub fn half_extents(&self) -> Vector<T, D> {
        self.extents() * half::<T>()
    }

    /// The axis along which this AABB is the widest.
    ///
    /// Ties are broken in favor of the lowest axis.
    pub fn largest_axis(&self) -> usize {
        self.extents().imax()
    }

    /// Enlarges this AABB so it also contains `other`.
    #[inline]
    pub fn merge(&mut self, other: &Self) {
        self.mins = self.mins.inf(&other.mins);
        self.maxs = self.maxs.sup(&other.maxs);
    }

    /// Returns the smallest AABB containing both `self` and `other`.
    #[inline]
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self::new(self.mins.inf(&other.mins), self.maxs.sup(&other.maxs))
    }

    /// Enlarges this AABB so it also contains the given point.
    #[inline]
    pub fn take_point(&mut self, point: Point<T, D>) {
        self.mins = self.mins.inf(&point);
        self.maxs = self.maxs.sup(&point);
    }

    /// Computes the intersection of this AABB with `other`.
    ///
    /// The result is computed axis by axis (max of the minima, min of the maxima), so
    /// it is an inverted box if the two boxes are disjoint.
    #[inline]
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self::new(self.mins.sup(&other.mins), self.maxs.inf(&other.maxs))
    }

    /// Do these two AABBs overlap? Touching boxes intersect.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        na::partial_le(&self.mins, &other.maxs) && na::partial_ge(&self.maxs, &other.mins)
    }

    /// Does this AABB fully contain `other`?
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        na::partial_le(&self.mins, &other.mins) && na::partial_ge(&self.maxs, &other.maxs)
    }

    /// Does this AABB contain the given point (boundary included)?
    #[inline]
    pub fn contains_point(&self, point: &Point<T, D>) -> bool {
        na::partial_le(&self.mins, point) && na::partial_ge(&self.maxs, point)
    }

    /// The squared distance between `point` and the closest point of this AABB.
    ///
    /// This is zero if the point is inside of the box.
    #[inline]
    pub fn distance_squared_to_point(&self, point: &Point<T, D>) -> T {
        let mins_point = self.mins - point;
        let point_maxs = point - self.maxs;
        let shift = mins_point.sup(&point_maxs).sup(&Vector::zeros());
        shift.norm_squared()
    }

    /// The squared distance between `point` and the farthest point of this AABB.
    #[inline]
    pub fn max_distance_squared_to_point(&self, point: &Point<T, D>) -> T {
        let mins_point = (self.mins - point).abs();
        let point_maxs = (point - self.maxs).abs();
        mins_point.sup(&point_maxs).norm_squared()
    }

    /// The sum of the extents of this AABB, i.e., half its perimeter in 2D.
    #[inline]
    pub fn axis_sum(&self) -> T {
        self.extents().sum()
    }

    /// Half the surface area of this AABB: the sum over each axis of the product of
    /// the extents along all the other axes.
    ///
    /// In 3D this is `wh + hd + dw`, in 2D this is the sum of the extents.
    pub fn half_surface_area(&self) -> T {
        let extents = self.extents();
        (0..D).fold(T::zero(), |acc, skipped| {
            let face = extents
                .iter()
                .enumerate()
                .filter(|(axis, _)| *axis != skipped)
                .fold(T::one(), |face, (_, extent)| face * *extent);
            acc + face
        })
    }

    /// The volume of this AABB: the product of its extents.
    #[inline]
    pub fn volume(&self) -> T {
        self.extents().product()
    }

    /// The squared length of the diagonal of this AABB.
    #[inline]
    pub fn diameter_squared(&self) -> T {
        self.extents().norm_squared()
    }

    /// The squared radius of the sphere circumscribing this AABB.
    #[inline]
    pub fn radius_squared(&self) -> T {
        self.half_extents().norm_squared()
    }

    /// The radius of the sphere circumscribing this AABB.
    #[inline]
    pub fn radius(&self) -> T {
        self.half_extents().norm()
    }

    /// The cubed radius of the sphere circumscribing this AABB.
    #[inline]
    pub fn radius_cubed(&self) -> T {
        let radius = self.radius();
        radius * radius * radius
    }

    /// Returns this AABB enlarged by `epsilon` plus `fraction` times its extent on
    /// each side of each axis.
    ///
    /// Inverted boxes are returned unchanged.
    #[must_use]
    pub fn dilated(&self, epsilon: T, fraction: T) -> Self {
        if !self.is_valid() {
            return *self;
        }

        let margin = self.extents() * fraction + Vector::<T, D>::repeat(epsilon);
        Self::new(self.mins - margin, self.maxs + margin)
    }
}

impl<T: Real, const D: usize> Default for Aabb<T, D> {
    /// The invalid AABB, i.e., an empty accumulator.
    fn default() -> Self {
        Self::new_invalid()
    }
}
