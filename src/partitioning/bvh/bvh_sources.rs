//! Indexed inputs of the hierarchy: item boxes, point positions and radii.

use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, Vector};
use alloc::vec::Vec;

/// A collection of item bounding boxes, indexed by external item index.
pub trait AabbSource<T: Real, const D: usize>: Sync {
    /// The number of items.
    fn len(&self) -> usize;

    /// Is this collection empty?
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bounding box of the `i`-th item.
    fn aabb(&self, i: usize) -> Aabb<T, D>;
}

/// A collection of points, indexed by external item index.
pub trait PointSource<T: Real, const D: usize>: Sync {
    /// The number of points.
    fn len(&self) -> usize;

    /// Is this collection empty?
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `i`-th point.
    fn point(&self, i: usize) -> Point<T, D>;
}

/// Per-item radii, indexed by external item index.
pub trait RadiusSource<T: Real>: Sync {
    /// The radius of the `i`-th item. Only its absolute value is used.
    fn radius(&self, i: usize) -> T;
}

impl<T: Real, const D: usize> AabbSource<T, D> for [Aabb<T, D>] {
    #[inline]
    fn len(&self) -> usize {
        <[Aabb<T, D>]>::len(self)
    }

    #[inline]
    fn aabb(&self, i: usize) -> Aabb<T, D> {
        self[i]
    }
}

impl<T: Real, const D: usize> AabbSource<T, D> for Vec<Aabb<T, D>> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn aabb(&self, i: usize) -> Aabb<T, D> {
        self[i]
    }
}

/// Points are indexed as degenerate boxes.
impl<T: Real, const D: usize> AabbSource<T, D> for [[T; D]] {
    #[inline]
    fn len(&self) -> usize {
        <[[T; D]]>::len(self)
    }

    #[inline]
    fn aabb(&self, i: usize) -> Aabb<T, D> {
        Aabb::from_point(self[i].into())
    }
}

impl<T: Real, const D: usize> AabbSource<T, D> for Vec<[T; D]> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn aabb(&self, i: usize) -> Aabb<T, D> {
        Aabb::from_point(self[i].into())
    }
}

impl<T: Real, const D: usize> AabbSource<T, D> for [Point<T, D>] {
    #[inline]
    fn len(&self) -> usize {
        <[Point<T, D>]>::len(self)
    }

    #[inline]
    fn aabb(&self, i: usize) -> Aabb<T, D> {
        Aabb::from_point(self[i])
    }
}

impl<T: Real, const D: usize> AabbSource<T, D> for Vec<Point<T, D>> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn aabb(&self, i: usize) -> Aabb<T, D> {
        Aabb::from_point(self[i])
    }
}

impl<T: Real, const D: usize> PointSource<T, D> for [[T; D]] {
    #[inline]
    fn len(&self) -> usize {
        <[[T; D]]>::len(self)
    }

    #[inline]
    fn point(&self, i: usize) -> Point<T, D> {
        self[i].into()
    }
}

impl<T: Real, const D: usize> PointSource<T, D> for Vec<[T; D]> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn point(&self, i: usize) -> Point<T, D> {
        self[i].into()
    }
}

impl<T: Real, const D: usize> PointSource<T, D> for [Point<T, D>] {
    #[inline]
    fn len(&self) -> usize {
        <[Point<T, D>]>::len(self)
    }

    #[inline]
    fn point(&self, i: usize) -> Point<T, D> {
        self[i]
    }
}

impl<T: Real, const D: usize> PointSource<T, D> for Vec<Point<T, D>> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn point(&self, i: usize) -> Point<T, D> {
        self[i]
    }
}

impl<T: Real> RadiusSource<T> for [T] {
    #[inline]
    fn radius(&self, i: usize) -> T {
        self[i]
    }
}

impl<T: Real> RadiusSource<T> for Vec<T> {
    #[inline]
    fn radius(&self, i: usize) -> T {
        self[i]
    }
}

/// The same radius for every item.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UniformRadius<T>(pub T);

impl<T: Real> RadiusSource<T> for UniformRadius<T> {
    #[inline]
    fn radius(&self, _: usize) -> T {
        self.0
    }
}

/// The bounding boxes of spheres given by a set of positions and radii.
///
/// Use this to build and materialize a hierarchy queried by
/// [`Bvh::closest_points`](super::Bvh::closest_points) with radii: the node boxes
/// must enclose the spheres, not only their centers.
pub struct SphereAabbs<'a, P: ?Sized, R: ?Sized> {
    positions: &'a P,
    radii: &'a R,
}

impl<'a, P: ?Sized, R: ?Sized> SphereAabbs<'a, P, R> {
    /// Indexes the spheres with the given centers and radii.
    pub fn new(positions: &'a P, radii: &'a R) -> Self {
        Self { positions, radii }
    }
}

impl<T, const D: usize, P, R> AabbSource<T, D> for SphereAabbs<'_, P, R>
where
    T: Real,
    P: PointSource<T, D> + ?Sized,
    R: RadiusSource<T> + ?Sized,
{
    #[inline]
    fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    fn aabb(&self, i: usize) -> Aabb<T, D> {
        let radius = self.radii.radius(i).abs();
        Aabb::from_half_extents(self.positions.point(i), Vector::repeat(radius))
    }
}
