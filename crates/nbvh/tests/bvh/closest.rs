use crate::random_point;
use approx::assert_relative_eq;
use nbvh::bounding_volume::Aabb;
use nbvh::na::{self, Point3};
use nbvh::partitioning::{
    Bvh, BvhBuildOptions, BvhHeuristic, ClosestPointsOptions, NodeAabbOptions, RadiusSource,
    SphereAabbs, UniformRadius,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Reference search ranking every point.
fn brute_force(
    points: &[Point3<f64>],
    radii: Option<&[f64]>,
    query: &Point3<f64>,
    options: &ClosestPointsOptions<f64>,
) -> Vec<(u32, f64)> {
    let mut all: Vec<(u32, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let dist_sq = na::distance_squared(point, query);
            let cost = match (radii, options.farthest) {
                (None, _) => dist_sq,
                (Some(radii), false) => {
                    let dist = dist_sq.sqrt() - radii[i].abs();
                    dist * dist.abs()
                }
                (Some(radii), true) => {
                    let dist = dist_sq.sqrt() + radii[i].abs();
                    dist * dist
                }
            };
            (i as u32, cost)
        })
        .filter(|(_, cost)| match options.max_dist_squared {
            Some(bound) if options.farthest => *cost >= bound,
            Some(bound) => *cost <= bound,
            None => true,
        })
        .collect();

    all.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap();
        let ord = if options.farthest { ord.reverse() } else { ord };
        ord.then(a.0.cmp(&b.0))
    });
    all.truncate(options.max_points);
    all
}

fn assert_same_results(result: &[(u32, f64)], expected: &[(u32, f64)]) {
    assert_eq!(result.len(), expected.len());
    for (r, e) in result.iter().zip(expected.iter()) {
        assert_eq!(r.0, e.0);
        assert_relative_eq!(r.1, e.1, epsilon = 1.0e-9);
    }
}

fn random_points(rng: &mut StdRng, len: usize) -> Vec<Point3<f64>> {
    (0..len).map(|_| random_point(rng, 100.0)).collect()
}

#[test]
fn closest_points_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(0);

    for len in [1, 3, 10, 100, 2000, 10_000] {
        let points = random_points(&mut rng, len);
        let num_queries = if len > 2000 { 5 } else { 20 };

        for heuristic in [BvhHeuristic::BoxArea, BvhHeuristic::MedianMaxAxis] {
            for reorder in [false, true] {
                let options = BvhBuildOptions::default()
                    .with_heuristic(heuristic)
                    .with_reorder(reorder);
                let bvh = Bvh::<4>::from_aabbs(&points[..], options);
                let node_aabbs = bvh.simd_node_aabbs(&points[..], NodeAabbOptions::default());

                for _ in 0..num_queries {
                    let query = random_point(&mut rng, 120.0);

                    for k in [1, 5, len] {
                        for farthest in [false, true] {
                            let mut options = ClosestPointsOptions::new(k);
                            options.farthest = farthest;

                            let result = bvh.closest_points(
                                &node_aabbs,
                                &points[..],
                                None,
                                &query,
                                &options,
                            );
                            let expected = brute_force(&points, None, &query, &options);
                            assert_same_results(&result, &expected);
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn closest_points_with_max_distance() {
    let mut rng = StdRng::seed_from_u64(1);
    let points = random_points(&mut rng, 1000);
    let bvh = Bvh::<4>::from_aabbs(&points[..], BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&points[..], NodeAabbOptions::default());

    for _ in 0..50 {
        let query = random_point(&mut rng, 100.0);
        let max_dist_squared = rng.gen_range(0.0..10_000.0);

        for options in [
            ClosestPointsOptions::new(20).with_max_dist_squared(max_dist_squared),
            ClosestPointsOptions::new(20)
                .with_max_dist_squared(max_dist_squared * 4.0)
                .farthest(),
        ] {
            let result = bvh.closest_points(&node_aabbs, &points[..], None, &query, &options);
            let expected = brute_force(&points, None, &query, &options);
            assert_same_results(&result, &expected);
        }
    }

    // Nothing within reach.
    let options = ClosestPointsOptions::new(5).with_max_dist_squared(1.0);
    let far = Point3::new(1000.0, 1000.0, 1000.0);
    let result = bvh.closest_points(&node_aabbs, &points[..], None, &far, &options);
    assert!(result.is_empty());
}

#[test]
fn closest_points_with_radii() {
    let mut rng = StdRng::seed_from_u64(2);
    let points = random_points(&mut rng, 1500);
    let radii: Vec<f64> = (0..points.len()).map(|_| rng.gen_range(0.0..15.0)).collect();
    let spheres = SphereAabbs::new(&points[..], &radii[..]);

    for reorder in [false, true] {
        let options = BvhBuildOptions::default().with_reorder(reorder);
        let bvh = Bvh::<4>::from_aabbs(&spheres, options);
        let node_aabbs = bvh.simd_node_aabbs(&spheres, NodeAabbOptions::default());
        let radii_source: &dyn RadiusSource<f64> = &radii;

        for _ in 0..30 {
            let query = random_point(&mut rng, 100.0);

            for k in [1, 5, 50] {
                for farthest in [false, true] {
                    let mut options = ClosestPointsOptions::new(k);
                    options.farthest = farthest;

                    let result = bvh.closest_points(
                        &node_aabbs,
                        &points[..],
                        Some(radii_source),
                        &query,
                        &options,
                    );
                    let expected = brute_force(&points, Some(&radii[..]), &query, &options);
                    assert_same_results(&result, &expected);
                }
            }
        }
    }
}

#[test]
fn closest_points_inside_spheres() {
    let points = [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [4.0, 0.0, 0.0]];
    let radius = UniformRadius(2.0);
    let radius_source: &dyn RadiusSource<f64> = &radius;
    let spheres = SphereAabbs::new(&points[..], &radius);
    let bvh = Bvh::<2>::from_aabbs(&spheres, BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&spheres, NodeAabbOptions::default());

    // 0.5 inside of the first sphere, 0.5 outside of the third one.
    let query = Point3::new(1.5, 0.0, 0.0);
    let result = bvh.closest_points(
        &node_aabbs,
        &points[..],
        Some(radius_source),
        &query,
        &ClosestPointsOptions::new(3),
    );

    assert_eq!(result.len(), 3);
    assert_eq!(result[0].0, 0);
    assert_relative_eq!(result[0].1, -0.25);
    assert_eq!(result[1].0, 2);
    assert_relative_eq!(result[1].1, 0.25);
    assert_eq!(result[2].0, 1);
    assert_relative_eq!(result[2].1, 6.5 * 6.5);
}

#[test]
fn closest_points_ties_prefer_smaller_indices() {
    // Every point is at distance 1 from the origin.
    let points = [
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [-1.0, 0.0, 0.0],
        [0.0, -1.0, 0.0],
        [0.0, 0.0, -1.0],
    ];
    let bvh = Bvh::<2>::from_aabbs(&points[..], BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&points[..], NodeAabbOptions::default());

    let origin = Point3::origin();
    for options in [ClosestPointsOptions::new(3), ClosestPointsOptions::new(3).farthest()] {
        let result = bvh.closest_points(&node_aabbs, &points[..], None, &origin, &options);
        assert_eq!(result, [(0, 1.0), (1, 1.0), (2, 1.0)]);
    }
}

#[test]
fn closest_points_degenerate_requests() {
    let points = [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];
    let bvh = Bvh::<4>::from_aabbs(&points[..], BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&points[..], NodeAabbOptions::default());

    let origin = Point3::origin();
    let none = ClosestPointsOptions::new(0);
    assert!(bvh
        .closest_points(&node_aabbs, &points[..], None, &origin, &none)
        .is_empty());

    // Asking for more points than there are.
    let result = bvh.closest_points(
        &node_aabbs,
        &points[..],
        None,
        &origin,
        &ClosestPointsOptions::new(10),
    );
    assert_eq!(result, [(0, 0.0), (1, 3.0)]);

    let empty: Vec<[f64; 3]> = Vec::new();
    let bvh = Bvh::<4>::from_aabbs(&empty[..], BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&empty[..], NodeAabbOptions::default());
    assert!(bvh
        .closest_points(&node_aabbs, &empty[..], None, &origin, &ClosestPointsOptions::new(3))
        .is_empty());
}

#[test]
fn closest_points_f32() {
    let mut rng = StdRng::seed_from_u64(3);
    let points: Vec<Point3<f32>> = (0..500)
        .map(|_| {
            Point3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            )
        })
        .collect();
    let bvh = Bvh::<3>::from_aabbs(&points[..], BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&points[..], NodeAabbOptions::default());

    let query = Point3::new(0.5f32, -0.5, 2.0);
    let result = bvh.closest_points(
        &node_aabbs,
        &points[..],
        None,
        &query,
        &ClosestPointsOptions::new(1),
    );

    let expected = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as u32, na::distance_squared(p, &query)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)));

    assert_eq!(result.len(), 1);
    let expected = expected.unwrap();
    assert_eq!(result[0].0, expected.0);
    assert_relative_eq!(result[0].1, expected.1, epsilon = 1.0e-4);

    // Boxes built from the points themselves.
    let aabb = Aabb::from_points(points.iter().copied());
    assert_eq!(node_aabbs[0].to_merged_aabb(), aabb);
}
