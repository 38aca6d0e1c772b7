use std::sync::PoisonError;

use rayon::prelude::*;

use super::builder::{BuildNode, OctreeBuilder};
use super::{Octree, OctreeNode};
use crate::physics::aabb3d::Aabb3d;
use crate::physics::math::{Scalar, Vector};
use crate::physics::point::Point;

/// Bottom-up summary of a subtree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub weight: Scalar,
    /// Weighted mean position. Falls back to the bounds center when the
    /// subtree has points but no weight.
    pub barycenter: Vector,
    /// `None` for a subtree without points.
    pub bounds: Option<Aabb3d>,
    /// Mean extent of `bounds`.
    pub size: Scalar,
}

impl Aggregate {
    pub const EMPTY: Aggregate = Aggregate {
        weight: 0.0,
        barycenter: Vector::ZERO,
        bounds: None,
        size: 0.0,
    };

    fn from_points(points: &[&Point]) -> Self {
        let Some(bounds) = Aabb3d::from_points(points.iter().map(|point| point.position)) else {
            return Self::EMPTY;
        };

        let (weight, weighted_sum) = points
            .iter()
            .fold((0.0, Vector::ZERO), |(weight_acc, pos_acc), point| {
                (
                    weight_acc + point.weight,
                    pos_acc + point.position * point.weight,
                )
            });

        Self::finish(weight, weighted_sum, bounds)
    }

    /// Combines child summaries; empty children are skipped entirely.
    fn from_children<'n, 'a: 'n>(children: impl IntoIterator<Item = &'n OctreeNode<'a>>) -> Self {
        let mut weight = 0.0;
        let mut weighted_sum = Vector::ZERO;
        let mut bounds: Option<Aabb3d> = None;

        for child in children {
            let aggregate = child.aggregate();
            let Some(child_bounds) = aggregate.bounds else {
                continue;
            };
            bounds = Some(match bounds {
                Some(bounds) => bounds.union(child_bounds),
                None => child_bounds,
            });
            weight += aggregate.weight;
            weighted_sum += aggregate.barycenter * aggregate.weight;
        }

        match bounds {
            Some(bounds) => Self::finish(weight, weighted_sum, bounds),
            None => Self::EMPTY,
        }
    }

    fn finish(weight: Scalar, weighted_sum: Vector, bounds: Aabb3d) -> Self {
        let barycenter = if weight > 0.0 {
            weighted_sum / weight
        } else {
            bounds.center()
        };

        Self {
            weight,
            barycenter,
            bounds: Some(bounds),
            size: bounds.mean_extent(),
        }
    }
}

impl<'a> OctreeBuilder<'a> {
    /// Ends the insertion phase and aggregates weight, barycenter, and bounds
    /// bottom-up.
    ///
    /// Children of nodes shallower than `parallel_depth` are aggregated on the
    /// rayon pool; deeper levels recurse sequentially. Passing `0` runs the
    /// whole pass on the calling thread.
    pub fn compute_statistics(self, parallel_depth: usize) -> Octree<'a> {
        let root = freeze(self.root, 0, parallel_depth);
        Octree::from_root(root, self.leaf_threshold, self.max_depth)
    }
}

fn freeze<'a>(node: BuildNode<'a>, depth: usize, parallel_depth: usize) -> OctreeNode<'a> {
    let leaf = node.leaf.into_inner().unwrap_or_else(PoisonError::into_inner);

    match node.split.into_inner() {
        Some(split) => {
            let children = freeze_children(*split.children, depth + 1, parallel_depth);
            OctreeNode::Internal {
                aggregate: Aggregate::from_children(children.iter()),
                split_center: split.center,
                children,
            }
        }
        None => OctreeNode::Leaf {
            aggregate: Aggregate::from_points(&leaf.points),
            points: leaf.points,
        },
    }
}

fn freeze_children<'a>(
    children: [BuildNode<'a>; 8],
    depth: usize,
    parallel_depth: usize,
) -> Box<[OctreeNode<'a>; 8]> {
    if depth <= parallel_depth {
        let mut frozen: Box<[OctreeNode<'a>; 8]> = Box::default();
        frozen
            .par_iter_mut()
            .zip(children.into_par_iter())
            .for_each(|(slot, child)| *slot = freeze(child, depth, parallel_depth));
        frozen
    } else {
        Box::new(children.map(|child| freeze(child, depth, parallel_depth)))
    }
}
