use std::fmt;

use crate::physics::math::{Scalar, Vector};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3d {
    pub min: Vector,
    pub max: Vector,
}

impl Aabb3d {
    pub fn new(min: Vector, max: Vector) -> Self {
        Self { min, max }
    }

    /// Degenerate box containing exactly one position.
    pub fn from_point(position: Vector) -> Self {
        Self::new(position, position)
    }

    /// Smallest box containing every position, or `None` for an empty iterator.
    pub fn from_points(positions: impl IntoIterator<Item = Vector>) -> Option<Self> {
        let mut positions = positions.into_iter();
        let first = positions.next()?;
        Some(positions.fold(Self::from_point(first), |bounds, position| {
            bounds.grow(position)
        }))
    }

    #[inline]
    pub fn grow(self, position: Vector) -> Self {
        Self::new(self.min.min(position), self.max.max(position))
    }

    #[inline]
    pub fn union(self, other: Aabb3d) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    #[inline]
    pub fn center(&self) -> Vector {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vector {
        self.max - self.min
    }

    /// Mean of the three extents; the opening-angle numerator.
    #[inline]
    pub fn mean_extent(&self) -> Scalar {
        let size = self.size();
        (size.x + size.y + size.z) / 3.0
    }

    pub fn contains(&self, position: Vector) -> bool {
        position.cmpge(self.min).all() && position.cmple(self.max).all()
    }
}

impl fmt::Display for Aabb3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bbox[({}, {}, {}), ({}, {}, {})]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}
