//! Spatial partitioning tools.

pub use self::bvh::{
    AabbSource, BoxArea, BoxPerimeter, BoxRadius, BoxRadius2, BoxRadius3, BoxVolume, Bvh,
    BvhBuildError, BvhBuildOptions, BvhChild, BvhHeuristic, BvhMaskVisitor, BvhNode, BvhVisitor,
    ClosestPointsOptions, LeafItems, MedianMaxAxis, NodeAabbLayout, NodeAabbOptions,
    PointSource, RadiusSource, SphereAabbs, SplitHeuristic, UniformRadius, MAX_BATCHED_QUERIES,
    MIN_FRACTION, NUM_SPANS, PARALLEL_BUILD_THRESHOLD, PARALLEL_TRAVERSAL_THRESHOLD, SMALL_LIMIT,
};

mod bvh;
