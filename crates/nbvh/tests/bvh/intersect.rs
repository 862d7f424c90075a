use crate::{aabb, clustered_aabbs, grid_aabbs, random_query, uniform_aabbs, HEURISTICS};
use nbvh::bounding_volume::{Aabb, SimdAabb};
use nbvh::na::Vector3;
use nbvh::partitioning::{Bvh, BvhBuildOptions, BvhChild, NodeAabbOptions, MAX_BATCHED_QUERIES};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn brute_force(aabbs: &[Aabb<f64, 3>], query: &Aabb<f64, 3>) -> Vec<u32> {
    aabbs
        .iter()
        .enumerate()
        .filter(|(_, aabb)| aabb.intersects(query))
        .map(|(i, _)| i as u32)
        .collect()
}

fn intersect(
    bvh: &Bvh<4>,
    node_aabbs: &[SimdAabb<f64, 3>],
    aabbs: &[Aabb<f64, 3>],
    query: &Aabb<f64, 3>,
) -> Vec<u32> {
    let mut result = Vec::new();
    bvh.intersect_aabb(node_aabbs, aabbs, query, &mut result);
    result.sort_unstable();
    result
}

fn check_dataset(aabbs: &[Aabb<f64, 3>], queries: &[Aabb<f64, 3>]) {
    for heuristic in HEURISTICS {
        let options = BvhBuildOptions::default().with_heuristic(heuristic);
        let bvh = Bvh::<4>::from_aabbs(aabbs, options);
        let node_aabbs = bvh.simd_node_aabbs(aabbs, NodeAabbOptions::default());

        for query in queries {
            assert_eq!(
                intersect(&bvh, &node_aabbs, aabbs, query),
                brute_force(aabbs, query),
                "heuristic: {:?}, query: {:?}",
                heuristic,
                query
            );
        }
    }
}

#[test]
fn intersect_uniform() {
    let mut rng = StdRng::seed_from_u64(0);
    for len in [1, 2, 5, 17, 100, 1000] {
        let aabbs = uniform_aabbs(&mut rng, len);
        let queries: Vec<_> = (0..100).map(|_| random_query(&mut rng, 60.0, 10.0)).collect();
        check_dataset(&aabbs, &queries);
    }
}

#[test]
fn intersect_clustered() {
    let mut rng = StdRng::seed_from_u64(1);
    let aabbs = clustered_aabbs(&mut rng, 2000);
    let mut queries: Vec<_> = (0..100).map(|_| random_query(&mut rng, 100.0, 20.0)).collect();
    // Queries centered on the clusters.
    queries.extend(
        aabbs
            .iter()
            .step_by(97)
            .map(|aabb| Aabb::from_half_extents(aabb.center(), Vector3::repeat(0.3))),
    );
    check_dataset(&aabbs, &queries);
}

#[test]
fn intersect_touching() {
    let mut rng = StdRng::seed_from_u64(2);
    let aabbs = grid_aabbs(10);
    let mut queries: Vec<_> = (0..100).map(|_| random_query(&mut rng, 12.0, 3.0)).collect();
    // Queries exactly on grid faces, edges and corners.
    queries.push(aabb([3.0, 0.0, 0.0], [3.0, 10.0, 10.0]));
    queries.push(aabb([3.0, 3.0, 0.0], [3.0, 3.0, 10.0]));
    queries.push(aabb([5.0; 3], [5.0; 3]));
    queries.push(aabb([10.0; 3], [11.0; 3]));
    check_dataset(&aabbs, &queries);

    let bvh = Bvh::<4>::from_aabbs(&aabbs[..], BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&aabbs[..], NodeAabbOptions::default());
    let corner = intersect(&bvh, &node_aabbs, &aabbs, &aabb([5.0; 3], [5.0; 3]));
    assert_eq!(corner.len(), 8);
}

#[test]
fn intersect_misses() {
    let mut rng = StdRng::seed_from_u64(3);
    let aabbs = uniform_aabbs(&mut rng, 500);
    let bvh = Bvh::<4>::from_aabbs(&aabbs[..], BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&aabbs[..], NodeAabbOptions::default());

    let far = aabb([1000.0; 3], [1001.0; 3]);
    assert!(intersect(&bvh, &node_aabbs, &aabbs, &far).is_empty());

    let everything = aabb([-1000.0; 3], [1000.0; 3]);
    assert_eq!(intersect(&bvh, &node_aabbs, &aabbs, &everything).len(), 500);
}

#[test]
fn intersect_reordered() {
    let mut rng = StdRng::seed_from_u64(4);
    let aabbs = uniform_aabbs(&mut rng, 1500);
    let queries: Vec<_> = (0..100).map(|_| random_query(&mut rng, 60.0, 5.0)).collect();

    for max_items_per_leaf in [1, 4, 8] {
        let options = BvhBuildOptions::default()
            .with_reorder(true)
            .with_max_items_per_leaf(max_items_per_leaf);
        let bvh = Bvh::<4>::from_aabbs(&aabbs[..], options);
        let node_aabbs = bvh.simd_node_aabbs(&aabbs[..], NodeAabbOptions::default());

        for query in &queries {
            assert_eq!(
                intersect(&bvh, &node_aabbs, &aabbs, query),
                brute_force(&aabbs, query),
                "max items per leaf: {}, query: {:?}",
                max_items_per_leaf,
                query
            );
        }
    }
}

#[test]
fn intersect_reordered_leaf_gaps() {
    // Half-width boxes along x: the union box of a leaf range covers the gaps between
    // its items.
    let aabbs: Vec<_> = (0..64)
        .map(|i| aabb([i as f64, 0.0, 0.0], [i as f64 + 0.5, 1.0, 1.0]))
        .collect();
    let options = BvhBuildOptions::default()
        .with_reorder(true)
        .with_max_items_per_leaf(8);
    let bvh = Bvh::<4>::from_aabbs(&aabbs[..], options);
    let node_aabbs = bvh.simd_node_aabbs(&aabbs[..], NodeAabbOptions::default());

    let gap = aabb([10.6, 0.0, 0.0], [10.9, 1.0, 1.0]);
    let straddling = aabb([10.2, 0.0, 0.0], [11.1, 1.0, 1.0]);
    assert!(intersect(&bvh, &node_aabbs, &aabbs, &gap).is_empty());
    assert_eq!(intersect(&bvh, &node_aabbs, &aabbs, &straddling), [10, 11]);

    let mut results = vec![Vec::new(); 2];
    bvh.intersect_aabbs(&node_aabbs, &aabbs[..], &[gap, straddling], &mut results);
    results[1].sort_unstable();
    assert!(results[0].is_empty());
    assert_eq!(results[1], [10, 11]);
}

#[test]
fn intersect_batched() {
    let mut rng = StdRng::seed_from_u64(5);
    let aabbs = clustered_aabbs(&mut rng, 1000);

    for reorder in [false, true] {
        let options = BvhBuildOptions::default().with_reorder(reorder);
        let bvh = Bvh::<4>::from_aabbs(&aabbs[..], options);
        let node_aabbs = bvh.simd_node_aabbs(&aabbs[..], NodeAabbOptions::default());

        // More than a single batch.
        let queries: Vec<_> = (0..MAX_BATCHED_QUERIES * 2 + 5)
            .map(|_| random_query(&mut rng, 100.0, 30.0))
            .collect();
        let mut results = vec![Vec::new(); queries.len()];
        bvh.intersect_aabbs(&node_aabbs, &aabbs[..], &queries, &mut results);

        for (query, result) in queries.iter().zip(results.iter_mut()) {
            result.sort_unstable();
            assert_eq!(*result, intersect(&bvh, &node_aabbs, &aabbs, query));
        }
    }
}

#[test]
#[should_panic]
fn intersect_batched_output_mismatch() {
    let aabbs = grid_aabbs(2);
    let bvh = Bvh::<4>::from_aabbs(&aabbs[..], BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&aabbs[..], NodeAabbOptions::default());
    let queries = [aabb([0.0; 3], [1.0; 3]); 3];
    let mut results = vec![Vec::new(); 2];
    bvh.intersect_aabbs(&node_aabbs, &aabbs[..], &queries, &mut results);
}

/// All the items of the subtree rooted at `node`.
fn subtree_items(bvh: &Bvh<4>, node: u32, out: &mut Vec<u32>) {
    for (slot, child) in bvh.nodes()[node as usize].used_children().iter().enumerate() {
        match *child {
            BvhChild::Internal(child) => subtree_items(bvh, child, out),
            _ => out.extend(bvh.leaf_items(node, slot)),
        }
    }
}

#[test]
fn intersect_nodes_covers_the_results() {
    let mut rng = StdRng::seed_from_u64(6);
    let aabbs = uniform_aabbs(&mut rng, 3000);
    let bvh = Bvh::<4>::from_aabbs(&aabbs[..], BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&aabbs[..], NodeAabbOptions::default());

    for max_half_extent in [0.5, 5.0, 50.0] {
        for _ in 0..50 {
            let query = random_query(&mut rng, 60.0, max_half_extent);
            let mut nodes = Vec::new();
            bvh.intersect_aabb_nodes(&node_aabbs, &query, &mut nodes);

            let mut covered = Vec::new();
            for child in &nodes {
                match *child {
                    BvhChild::Item(item) => covered.push(item),
                    BvhChild::Internal(node) => subtree_items(&bvh, node, &mut covered),
                    BvhChild::Empty => panic!("empty slot reported"),
                }
            }
            covered.sort_unstable();

            for item in brute_force(&aabbs, &query) {
                assert!(covered.binary_search(&item).is_ok());
            }

            let mut deduped = covered.clone();
            deduped.dedup();
            assert_eq!(deduped.len(), covered.len());
        }
    }

    let mut nodes = Vec::new();
    bvh.intersect_aabb_nodes(&node_aabbs, &aabb([-1000.0; 3], [1000.0; 3]), &mut nodes);
    assert_eq!(nodes, [BvhChild::Internal(0)]);

    nodes.clear();
    bvh.intersect_aabb_nodes(&node_aabbs, &aabb([1000.0; 3], [1001.0; 3]), &mut nodes);
    assert!(nodes.is_empty());
}

#[test]
fn intersect_empty_tree() {
    let aabbs: Vec<Aabb<f64, 3>> = Vec::new();
    let bvh = Bvh::<4>::from_aabbs(&aabbs[..], BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&aabbs[..], NodeAabbOptions::default());
    let query = aabb([0.0; 3], [1.0; 3]);

    assert!(intersect(&bvh, &node_aabbs, &aabbs, &query).is_empty());

    let mut results = vec![Vec::new(); 2];
    bvh.intersect_aabbs(&node_aabbs, &aabbs[..], &[query, query], &mut results);
    assert!(results.iter().all(|r| r.is_empty()));

    let mut nodes = Vec::new();
    bvh.intersect_aabb_nodes(&node_aabbs, &query, &mut nodes);
    assert!(nodes.is_empty());
}

#[test]
fn intersect_dilated_node_aabbs() {
    let aabbs = grid_aabbs(4);
    let bvh = Bvh::<4>::from_aabbs(&aabbs[..], BvhBuildOptions::default());
    let node_aabbs = bvh.simd_node_aabbs(&aabbs[..], NodeAabbOptions::with_epsilon(0.25));

    // Misses the cubes by 0.2 but hits their enlarged boxes.
    let query = aabb([-0.5; 3], [-0.2; 3]);
    assert!(brute_force(&aabbs, &query).is_empty());
    assert_eq!(intersect(&bvh, &node_aabbs, &aabbs, &query), [0]);
}
