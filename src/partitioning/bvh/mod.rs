pub use bvh_build::{BvhBuildError, PARALLEL_BUILD_THRESHOLD};
pub use bvh_closest::ClosestPointsOptions;
pub use bvh_intersect::MAX_BATCHED_QUERIES;
pub use bvh_heuristic::{
    BoxArea, BoxPerimeter, BoxRadius, BoxRadius2, BoxRadius3, BoxVolume, BvhHeuristic,
    MedianMaxAxis, SplitHeuristic,
};
pub use bvh_node::{BvhChild, BvhNode};
pub use bvh_split::{MIN_FRACTION, NUM_SPANS, SMALL_LIMIT};
pub use bvh_node_aabbs::{NodeAabbLayout, NodeAabbOptions};
pub use bvh_sources::{AabbSource, PointSource, RadiusSource, SphereAabbs, UniformRadius};
pub use bvh_traverse::{BvhMaskVisitor, BvhVisitor, PARALLEL_TRAVERSAL_THRESHOLD};
pub use bvh_tree::{Bvh, BvhBuildOptions, LeafItems};

mod bvh_build;
mod bvh_closest;
mod bvh_heuristic;
mod bvh_intersect;
mod bvh_node;
mod bvh_node_aabbs;
mod bvh_sources;
mod bvh_split;
mod bvh_traverse;
mod bvh_tree;
mod bvh_validation;
