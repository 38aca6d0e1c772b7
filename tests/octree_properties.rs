//! Integration tests for the structural and numerical guarantees of the octree

use approx::assert_relative_eq;
use octoforce::config::{OctreeConfig, PointDistribution};
use octoforce::physics::distribution::{SharedRng, generate_points};
use octoforce::physics::math::{Scalar, Vector, direct_forces, pairwise_force};
use octoforce::physics::octree::{Octree, OctreeBuilder, OctreeError, OctreeNode, octant_index};
use octoforce::physics::point::Point;

fn random_points(count: usize, seed: u64) -> Vec<Point> {
    let mut rng = SharedRng::from_seed(seed);
    generate_points(&mut rng, count, PointDistribution::Ball, 100.0, 6.0)
}

fn visit_leaves<'t, 'a>(node: &'t OctreeNode<'a>, depth: usize, f: &mut impl FnMut(&'t [&'a Point], usize)) {
    match node {
        OctreeNode::Internal { children, .. } => {
            for child in children.iter() {
                visit_leaves(child, depth + 1, f);
            }
        }
        OctreeNode::Leaf { points, .. } => f(points.as_slice(), depth),
    }
}

#[test]
fn test_two_points_single_leaf_matches_kernel() {
    let points = vec![
        Point::new(Vector::new(0.0, 0.0, 0.0), 1.0),
        Point::new(Vector::new(1.0, 0.0, 0.0), 1.0),
    ];
    let octree = Octree::build(&points, 4).unwrap();

    assert!(octree.root().is_leaf(), "Two points under threshold 4 must stay one leaf");

    let force = octree.force_on(&points[0], 1.0).unwrap();
    let expected = pairwise_force(points[0].position, 1.0, points[1].position, 1.0);

    assert_eq!(force, expected);
}

#[test]
fn test_mass_conservation() {
    let points = random_points(5000, 11);
    let expected: Scalar = points.iter().map(|p| p.weight).sum();

    for threshold in [1, 2, 8, 32] {
        let octree = Octree::build(&points, threshold).unwrap();

        assert_relative_eq!(octree.total_weight(), expected, max_relative = 1e-12);
        assert_eq!(octree.describe().point_count, points.len());
    }
}

#[test]
fn test_aggregates_independent_of_insertion_order() {
    let points = random_points(3000, 5);
    let mut reversed = points.clone();
    reversed.reverse();

    let forward = Octree::build(&points, 8).unwrap();
    let backward = Octree::build(&reversed, 8).unwrap();

    assert_relative_eq!(
        forward.total_weight(),
        backward.total_weight(),
        max_relative = 1e-12
    );
    let (a, b) = (forward.barycenter(), backward.barycenter());
    assert_relative_eq!(a.x, b.x, epsilon = 1e-9, max_relative = 1e-10);
    assert_relative_eq!(a.y, b.y, epsilon = 1e-9, max_relative = 1e-10);
    assert_relative_eq!(a.z, b.z, epsilon = 1e-9, max_relative = 1e-10);
}

#[test]
fn test_leaf_capacity_invariant() {
    let mut points = random_points(4000, 21);
    // A coincident cluster larger than the threshold.
    points.extend(std::iter::repeat_n(
        Point::new(Vector::new(7.0, 7.0, 7.0), 2.0),
        40,
    ));
    let threshold = 6;
    let octree = Octree::build(&points, threshold).unwrap();

    visit_leaves(octree.root(), 0, &mut |leaf, depth| {
        let coincident = leaf
            .iter()
            .all(|point| point.position == leaf[0].position);
        assert!(
            leaf.len() <= threshold || coincident || depth == octree.max_depth(),
            "Leaf at depth {depth} holds {} non-coincident points",
            leaf.len()
        );
    });
}

#[test]
fn test_every_point_reachable_exactly_once() {
    let points = random_points(2000, 3);
    let octree = Octree::build(&points, 4).unwrap();

    let mut seen = vec![0usize; points.len()];
    let base = points.as_ptr();
    visit_leaves(octree.root(), 0, &mut |leaf, _| {
        for point in leaf {
            let index = (*point as *const Point as usize - base as usize) / size_of::<Point>();
            seen[index] += 1;
        }
    });

    assert!(seen.iter().all(|&count| count == 1));
}

/// Exact force from the points of a subtree that does not hold `query`.
fn exact_from(node: &OctreeNode, query: &Point) -> Vector {
    match node {
        OctreeNode::Internal { children, .. } => children
            .iter()
            .fold(Vector::ZERO, |force, child| force + exact_from(child, query)),
        OctreeNode::Leaf { points, .. } => points.iter().fold(Vector::ZERO, |force, other| {
            force + pairwise_force(query.position, query.weight, other.position, other.weight)
        }),
    }
}

/// Force on `query` when every subtree off its root-to-leaf path is lumped
/// into one mass: siblings along the path contribute their aggregate (or their
/// points, for leaves), and the query's own leaf contributes its other points.
fn lumped_along_path(node: &OctreeNode, query: &Point) -> Vector {
    match node {
        OctreeNode::Internal {
            split_center,
            children,
            ..
        } => {
            let own = octant_index(query.position, *split_center);
            children
                .iter()
                .enumerate()
                .fold(Vector::ZERO, |force, (index, child)| {
                    let contribution = match child {
                        _ if index == own => lumped_along_path(child, query),
                        OctreeNode::Internal { aggregate, .. } if aggregate.bounds.is_some() => {
                            pairwise_force(
                                query.position,
                                query.weight,
                                aggregate.barycenter,
                                aggregate.weight,
                            )
                        }
                        OctreeNode::Internal { .. } => Vector::ZERO,
                        OctreeNode::Leaf { .. } => exact_from(child, query),
                    };
                    force + contribution
                })
        }
        OctreeNode::Leaf { points, .. } => points
            .iter()
            .filter(|other| !std::ptr::eq(**other, query))
            .fold(Vector::ZERO, |force, other| {
                force + pairwise_force(query.position, query.weight, other.position, other.weight)
            }),
    }
}

#[test]
fn test_self_exclusion_for_any_theta() {
    let points = random_points(500, 8);

    for threshold in [1, 4, 16] {
        let octree = Octree::build(&points, threshold).unwrap();
        for theta in [0.1, 0.7, 2.0, 50.0] {
            for point in points.iter().take(50) {
                let force = octree.force_on(point, theta).unwrap();
                assert!(force.is_finite());
            }
        }

        // With an unbounded opening angle only the nodes holding the query
        // are opened, so the result is fully determined by its path.
        for point in points.iter().take(100) {
            let force = octree.force_on(point, 1e12).unwrap();
            let expected = lumped_along_path(octree.root(), point);

            assert_relative_eq!(force.x, expected.x, epsilon = 1e-12, max_relative = 1e-12);
            assert_relative_eq!(force.y, expected.y, epsilon = 1e-12, max_relative = 1e-12);
            assert_relative_eq!(force.z, expected.z, epsilon = 1e-12, max_relative = 1e-12);
        }
    }

    // An isolated point has nothing but itself to interact with.
    let lonely = vec![Point::new(Vector::new(1.0, 1.0, 1.0), 9.0)];
    let octree = Octree::build(&lonely, 1).unwrap();
    for theta in [0.1, 1.0, 100.0] {
        assert_eq!(octree.force_on(&lonely[0], theta).unwrap(), Vector::ZERO);
    }
}

#[test]
fn test_self_exclusion_with_huge_theta() {
    // The root collapses to a point mass only if the query's own weight is
    // folded in; the result must instead be the exact pairwise force.
    let points = vec![
        Point::new(Vector::new(0.0, 0.0, 0.0), 1.0),
        Point::new(Vector::new(1.0, 0.0, 0.0), 1.0),
    ];

    for threshold in [1, 2] {
        let octree = Octree::build(&points, threshold).unwrap();
        assert!(!octree.root().is_leaf());

        let force = octree.force_on(&points[0], 1e6).unwrap();
        let expected = pairwise_force(points[0].position, 1.0, points[1].position, 1.0);

        assert_eq!(force, expected);
    }
}

#[test]
fn test_near_zero_theta_matches_direct_summation() {
    let points = random_points(800, 17);
    let octree = Octree::build(&points, 8).unwrap();

    let approximate = octree.compute_forces(&points, 1e-12).unwrap();
    let exact = direct_forces(&points);

    for (a, e) in approximate.iter().zip(&exact) {
        assert_relative_eq!(a.x, e.x, epsilon = 1e-9, max_relative = 1e-8);
        assert_relative_eq!(a.y, e.y, epsilon = 1e-9, max_relative = 1e-8);
        assert_relative_eq!(a.z, e.z, epsilon = 1e-9, max_relative = 1e-8);
    }
}

#[test]
fn test_larger_theta_trades_accuracy() {
    let points = random_points(1500, 23);
    let exact = direct_forces(&points);
    let octree = Octree::build(&points, 8).unwrap();

    let mean_error = |theta: Scalar| {
        let forces = octree.compute_forces(&points, theta).unwrap();
        forces
            .iter()
            .zip(&exact)
            .map(|(a, e)| (*a - *e).length() / e.length().max(Scalar::EPSILON))
            .sum::<Scalar>()
            / points.len() as Scalar
    };

    let tight = mean_error(0.2);
    let loose = mean_error(1.0);

    assert!(tight < 0.05, "Mean relative error {tight} too large for theta 0.2");
    assert!(loose >= tight);
}

#[test]
fn test_compute_forces_aligned_with_force_on() {
    let points = random_points(400, 2);
    let octree = Octree::build(&points, 4).unwrap();

    let forces = octree.compute_forces(&points, 0.7).unwrap();

    assert_eq!(forces.len(), points.len());
    for (point, force) in points.iter().zip(&forces) {
        assert_eq!(*force, octree.force_on(point, 0.7).unwrap());
    }
}

#[test]
fn test_coincident_cluster_builds_and_queries() {
    let points = vec![Point::new(Vector::new(-3.0, 2.0, 1.0), 1.5); 1000];
    let octree = Octree::build(&points, 4).unwrap();
    let stats = octree.describe();

    assert_eq!(stats.leaf_count, 1);
    assert_eq!(stats.oversized_leaf_count, 1);
    assert_eq!(stats.max_leaf_occupancy, 1000);
    assert_relative_eq!(octree.total_weight(), 1500.0);
    assert_eq!(octree.force_on(&points[0], 0.7).unwrap(), Vector::ZERO);
}

#[test]
fn test_near_coincident_cluster_is_depth_bounded() {
    let base: f64 = 1.0;
    let points: Vec<Point> = (0..200)
        .map(|i| {
            let x = f64::from_bits(base.to_bits() + (i % 2) as u64);
            Point::new(Vector::new(x, 0.0, 0.0), 1.0)
        })
        .collect();
    let config = OctreeConfig {
        leaf_threshold: 4,
        max_depth: 12,
        ..OctreeConfig::default()
    };
    let octree = Octree::build_with_config(&points, &config).unwrap();
    let stats = octree.describe();

    assert!(stats.max_depth <= 12);
    assert_eq!(stats.point_count, 200);
    assert_relative_eq!(octree.total_weight(), 200.0);
}

#[test]
fn test_validation_errors() {
    let points = random_points(10, 1);

    assert_eq!(
        Octree::build(&points, 0).unwrap_err(),
        OctreeError::InvalidThreshold(0)
    );
    assert!(OctreeBuilder::new(0).is_err());

    let negative_weight = vec![Point::new(Vector::ZERO, 1.0), Point::new(Vector::X, -2.0)];
    assert_eq!(
        Octree::build(&negative_weight, 4).unwrap_err(),
        OctreeError::InvalidPoint { index: 1 }
    );

    let octree = Octree::build(&points, 4).unwrap();
    assert_eq!(
        octree.force_on(&points[0], 0.0).unwrap_err(),
        OctreeError::InvalidTheta(0.0)
    );
}
