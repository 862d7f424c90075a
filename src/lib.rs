/*!
nbvh
========

**nbvh** is an N-ary bounding volume hierarchy written with the rust programming
language. It indexes axis-aligned boxes (or points) in any dimension and answers
box-intersection and k-nearest-neighbor queries.

The tree is built once from a slice of boxes, possibly in parallel, and stored as a
flat depth-first arena. Query-time bounding boxes are materialized separately so the
same topology can serve several box layouts.

```
use nbvh::bounding_volume::Aabb;
use nbvh::na::Point3;
use nbvh::partitioning::{Bvh, BvhBuildOptions, NodeAabbOptions};

let boxes: Vec<Aabb<f32, 3>> = (0..10)
    .map(|i| Aabb::new(Point3::new(i as f32, 0.0, 0.0), Point3::new(i as f32 + 1.0, 1.0, 1.0)))
    .collect();
let bvh = Bvh::<4>::from_aabbs(&boxes[..], BvhBuildOptions::default());
let node_aabbs = bvh.simd_node_aabbs(&boxes[..], NodeAabbOptions::default());

let query = Aabb::new(Point3::new(4.5, 0.0, 0.0), Point3::new(5.5, 1.0, 1.0));
let mut hits = Vec::new();
bvh.intersect_aabb(&node_aabbs, &boxes[..], &query, &mut hits);
hits.sort();
assert_eq!(hits, [4, 5]);
```
*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_inception)]
#![allow(clippy::manual_range_contains)] // This usually makes it way more verbose that it could be.
#![allow(clippy::type_complexity)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
extern crate num_traits as num;
extern crate simba;

pub extern crate either;
pub extern crate nalgebra as na;

pub mod bounding_volume;
pub mod partitioning;
pub mod utils;

mod real {
    use super::simd::SimdBool;
    use na::{SimdPartialOrd, SimdRealField};

    /// The scalar types (`f32` and `f64`) the hierarchy can be built over.
    pub trait Real: na::RealField + Copy + num::ToPrimitive {
        /// The SIMD number with `SIMD_WIDTH` lanes of this scalar.
        type Simd: SimdRealField<Element = Self, SimdBool = SimdBool> + SimdPartialOrd + Copy;

        /// The largest finite value.
        const MAX: Self;
        /// The positive infinity.
        const INFINITY: Self;
    }

    impl Real for f32 {
        type Simd = simba::simd::AutoF32x4;

        const MAX: Self = f32::MAX;
        const INFINITY: Self = f32::INFINITY;
    }

    impl Real for f64 {
        type Simd = simba::simd::AutoF64x4;

        const MAX: Self = f64::MAX;
        const INFINITY: Self = f64::INFINITY;
    }

    /// Converts a count to a scalar.
    #[inline]
    pub(crate) fn real_from_usize<T: Real>(n: usize) -> T {
        na::convert(n as f64)
    }

    /// The scalar `1/2`.
    #[inline]
    pub(crate) fn half<T: Real>() -> T {
        na::convert(0.5)
    }
}

mod simd {
    use simba::simd::AutoBoolx4;

    /// The number of lanes of a SIMD number.
    pub const SIMD_WIDTH: usize = 4;
    /// SIMD_WIDTH - 1
    pub const SIMD_LAST_INDEX: usize = 3;

    /// A SIMD float with SIMD_WIDTH lanes.
    pub type SimdReal<T> = <T as super::real::Real>::Simd;

    /// A SIMD bool with SIMD_WIDTH lanes.
    pub type SimdBool = AutoBoolx4;

    /// The mask with the `n` first bits set.
    #[inline]
    pub fn first_lanes_mask(n: usize) -> u32 {
        if n >= 32 {
            u32::MAX
        } else {
            (1u32 << n) - 1
        }
    }

    /// Iterates through the indices of the set bits of `mask`, lowest first.
    #[inline]
    pub fn mask_bits(mask: u32) -> MaskBits {
        MaskBits(mask)
    }

    /// Iterator returned by [`mask_bits`].
    #[derive(Copy, Clone, Debug)]
    pub struct MaskBits(u32);

    impl Iterator for MaskBits {
        type Item = usize;

        #[inline]
        fn next(&mut self) -> Option<usize> {
            if self.0 == 0 {
                None
            } else {
                let bit = self.0.trailing_zeros() as usize;
                self.0 &= self.0 - 1;
                Some(bit)
            }
        }
    }
}

/// Compilation flags dependent aliases for mathematical types.
pub mod math {
    pub(crate) use super::real::{half, real_from_usize};
    pub use super::real::Real;
    pub use super::simd::*;

    /// The point type.
    pub type Point<T, const D: usize> = na::Point<T, D>;

    /// The vector type.
    pub type Vector<T, const D: usize> = na::SVector<T, D>;
}
