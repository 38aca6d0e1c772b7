use rayon::prelude::*;

use super::{Octree, OctreeError, OctreeNode, validate_theta};
use crate::physics::math::{Scalar, Vector, pairwise_force};
use crate::physics::point::Point;

impl Octree<'_> {
    /// Approximate net force on `point` from every other point in the tree.
    ///
    /// A subtree is replaced by a single mass at its barycenter when
    /// `size / distance < theta` and `point` lies outside the subtree's bounds;
    /// otherwise its children are visited. Points are skipped by identity, so a
    /// point only ever excludes itself, never a coincident neighbor.
    pub fn force_on(&self, point: &Point, theta: Scalar) -> Result<Vector, OctreeError> {
        validate_theta(theta)?;
        Ok(self.root.force_on(point, theta))
    }

    /// Forces on every point of `points`, computed in parallel and aligned by index.
    pub fn compute_forces(&self, points: &[Point], theta: Scalar) -> Result<Vec<Vector>, OctreeError> {
        validate_theta(theta)?;
        Ok(points
            .par_iter()
            .map(|point| self.root.force_on(point, theta))
            .collect())
    }
}

impl OctreeNode<'_> {
    fn force_on(&self, point: &Point, theta: Scalar) -> Vector {
        match self {
            OctreeNode::Internal {
                aggregate,
                children,
                ..
            } => {
                let Some(bounds) = aggregate.bounds else {
                    return Vector::ZERO;
                };

                let distance = point.position.distance(aggregate.barycenter);

                // Barnes-Hut criterion: if s/d < theta, treat as single body.
                // A node containing the query is always opened so its own mass
                // never folds into the approximation.
                if !bounds.contains(point.position) && aggregate.size / distance < theta {
                    pairwise_force(
                        point.position,
                        point.weight,
                        aggregate.barycenter,
                        aggregate.weight,
                    )
                } else {
                    children
                        .iter()
                        .fold(Vector::ZERO, |force, child| force + child.force_on(point, theta))
                }
            }
            OctreeNode::Leaf { points, .. } => points
                .iter()
                .filter(|other| !std::ptr::eq(**other, point))
                .fold(Vector::ZERO, |force, other| {
                    force + pairwise_force(point.position, point.weight, other.position, other.weight)
                }),
        }
    }
}
