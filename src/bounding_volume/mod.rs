//! Bounding volumes.

#[doc(inline)]
pub use crate::bounding_volume::aabb::Aabb;
pub use crate::bounding_volume::simd_aabb::SimdAabb;

#[doc(hidden)]
pub mod aabb;
mod simd_aabb;
