use nbvh::bounding_volume::Aabb;
use nbvh::na::{Point2, Point3};
use nbvh::partitioning::{
    Bvh, BvhBuildOptions, BvhChild, BvhHeuristic, ClosestPointsOptions, NodeAabbOptions,
};

fn unit_boxes_along_x() -> Vec<Aabb<f32, 3>> {
    (0..10)
        .map(|i| Aabb::new(Point3::new(i as f32, 0.0, 0.0), Point3::new(i as f32 + 1.0, 1.0, 1.0)))
        .collect()
}

#[test]
fn ten_boxes() {
    let boxes = unit_boxes_along_x();

    for heuristic in crate::HEURISTICS {
        for reorder in [false, true] {
            let options = BvhBuildOptions::default()
                .with_heuristic(heuristic)
                .with_reorder(reorder);
            let bvh = Bvh::<4>::from_aabbs(&boxes[..], options);
            bvh.assert_well_formed();
            assert_eq!(bvh.num_items(), 10);

            let node_aabbs = bvh.simd_node_aabbs(&boxes[..], NodeAabbOptions::default());
            assert_eq!(
                node_aabbs[0].to_merged_aabb(),
                Aabb::new(Point3::origin(), Point3::new(10.0, 1.0, 1.0))
            );

            let mut hits = Vec::new();
            let query = Aabb::new(Point3::new(4.5, 0.0, 0.0), Point3::new(5.5, 1.0, 1.0));
            bvh.intersect_aabb(&node_aabbs, &boxes[..], &query, &mut hits);
            hits.sort_unstable();
            assert_eq!(hits, [4, 5]);

            // The boxes as points: their centers.
            let query = Point3::new(4.5, 0.5, 0.5);
            let centers: Vec<Point3<f32>> = boxes.iter().map(|b| b.center()).collect();
            let point_bvh = Bvh::<4>::from_aabbs(&centers[..], options);
            let point_aabbs = point_bvh.simd_node_aabbs(&centers[..], NodeAabbOptions::default());
            let closest = point_bvh.closest_points(
                &point_aabbs,
                &centers[..],
                None,
                &query,
                &ClosestPointsOptions::new(1),
            );
            assert_eq!(closest, [(4, 0.0)]);

            let farthest = point_bvh.closest_points(
                &point_aabbs,
                &centers[..],
                None,
                &query,
                &ClosestPointsOptions::new(2).farthest(),
            );
            assert_eq!(farthest, [(9, 25.0), (0, 16.0)]);

            // The min corners: items 4 and 5 are equally close.
            let corners: Vec<Point3<f32>> = boxes.iter().map(|b| b.mins).collect();
            let corner_bvh = Bvh::<4>::from_aabbs(&corners[..], options);
            let corner_aabbs = corner_bvh.simd_node_aabbs(&corners[..], NodeAabbOptions::default());
            let closest = corner_bvh.closest_points(
                &corner_aabbs,
                &corners[..],
                None,
                &query,
                &ClosestPointsOptions::new(1),
            );
            assert_eq!(closest, [(4, 0.75)]);
        }
    }
}

#[test]
fn binary_tree_of_four_boxes() {
    let boxes: Vec<Aabb<f64, 2>> = vec![
        Aabb::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)),
        Aabb::new(Point2::new(10.0, 0.0), Point2::new(11.0, 1.0)),
        Aabb::new(Point2::new(1.0, 0.0), Point2::new(2.0, 1.0)),
        Aabb::new(Point2::new(11.0, 0.0), Point2::new(12.0, 1.0)),
    ];
    let options = BvhBuildOptions::default().with_heuristic(BvhHeuristic::BoxPerimeter);
    let bvh = Bvh::<2>::from_aabbs(&boxes[..], options);
    bvh.assert_well_formed();

    // The two clusters end up in distinct subtrees.
    assert_eq!(bvh.num_nodes(), 3);
    assert_eq!(bvh.depth(), 2);
    let root = bvh.root().copied().unwrap();
    assert!(root.children.iter().all(|c| c.is_internal()));

    let mut left: Vec<u32> = (0..2).flat_map(|slot| bvh.leaf_items(1, slot)).collect();
    let mut right: Vec<u32> = (0..2).flat_map(|slot| bvh.leaf_items(2, slot)).collect();
    left.sort_unstable();
    right.sort_unstable();
    let mut clusters = [left, right];
    clusters.sort();
    assert_eq!(clusters, [vec![0, 2], vec![1, 3]]);

    let node_aabbs = bvh.node_aabbs(&boxes[..], NodeAabbOptions::default());
    assert_eq!(
        node_aabbs[0],
        Aabb::new(Point2::new(0.0, 0.0), Point2::new(12.0, 1.0))
    );
    assert!(matches!(root.children[0], BvhChild::Internal(1)));
}

#[test]
fn high_branching_factor() {
    let boxes = unit_boxes_along_x();
    let bvh = Bvh::<16>::from_aabbs(&boxes[..], BvhBuildOptions::default());
    bvh.assert_well_formed();
    assert_eq!(bvh.num_nodes(), 1);
    assert_eq!(bvh.root().map(|r| r.child_count()), Some(10));

    let node_aabbs = bvh.node_aabbs(&boxes[..], NodeAabbOptions::with_epsilon(1.0));
    let expected = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(11.0, 2.0, 2.0));
    assert_eq!(node_aabbs, [expected]);
}
