use crate::physics::math::{Scalar, Vector};

/// A weighted point owned by the caller for the duration of one step.
///
/// The octree only ever borrows points; `velocity` is carried for the
/// integrator and is never read or written by the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub position: Vector,
    pub weight: Scalar,
    pub velocity: Vector,
}

impl Point {
    pub fn new(position: Vector, weight: Scalar) -> Self {
        Self {
            position,
            weight,
            velocity: Vector::ZERO,
        }
    }

    /// Finite position and a finite, non-negative weight.
    pub fn is_valid(&self) -> bool {
        self.position.is_finite() && self.weight.is_finite() && self.weight >= 0.0
    }
}
