//! Spatial octree for approximating gravitational forces using the Barnes-Hut algorithm.
//!
//! A tree lives for exactly one simulation step:
//!
//! 1. [`OctreeBuilder`] accepts concurrent inserts from any number of threads.
//! 2. [`OctreeBuilder::compute_statistics`] consumes the builder and produces an
//!    immutable [`Octree`] with per-node weight, barycenter, and bounds.
//! 3. [`Octree::force_on`] and [`Octree::compute_forces`] query the frozen tree
//!    concurrently without any locking.

mod builder;
mod diagnostics;
mod force;
mod statistics;

pub use builder::OctreeBuilder;
pub use diagnostics::{OctreeDump, OctreeStats};
pub use statistics::Aggregate;

use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::config::OctreeConfig;
use crate::physics::math::{Scalar, Vector};
use crate::physics::point::Point;

pub const DEFAULT_LEAF_THRESHOLD: usize = 8;
pub const DEFAULT_THETA: Scalar = 0.7;
/// Depth past which a full leaf keeps accepting points instead of splitting.
pub const DEFAULT_MAX_DEPTH: usize = 48;
/// Tree levels whose children are aggregated in parallel.
pub const DEFAULT_STATISTICS_PARALLEL_DEPTH: usize = 2;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OctreeError {
    #[error("leaf threshold must be at least 1, got {0}")]
    InvalidThreshold(usize),
    #[error("opening angle theta must be finite and positive, got {0}")]
    InvalidTheta(Scalar),
    #[error("maximum tree depth must be at least 1, got {0}")]
    InvalidMaxDepth(usize),
    #[error("point {index} has a non-finite position or a negative or non-finite weight")]
    InvalidPoint { index: usize },
}

pub(crate) fn validate_theta(theta: Scalar) -> Result<(), OctreeError> {
    if theta.is_finite() && theta > 0.0 {
        Ok(())
    } else {
        Err(OctreeError::InvalidTheta(theta))
    }
}

/// Rejects the first point with a non-finite position or an invalid weight.
pub(crate) fn validate_points(points: &[Point]) -> Result<(), OctreeError> {
    match points.par_iter().position_first(|point| !point.is_valid()) {
        Some(index) => Err(OctreeError::InvalidPoint { index }),
        None => Ok(()),
    }
}

/// Maps the three below-center comparisons onto a child slot.
///
/// Bit 0 is set when `x` is below the split center, bit 1 for `y`, bit 2 for `z`.
#[inline]
pub fn octant_index(position: Vector, center: Vector) -> usize {
    ((position.x < center.x) as usize)
        | (((position.y < center.y) as usize) << 1)
        | (((position.z < center.z) as usize) << 2)
}

#[derive(Debug)]
pub enum OctreeNode<'a> {
    Internal {
        aggregate: Aggregate,
        split_center: Vector,
        children: Box<[OctreeNode<'a>; 8]>,
    },
    Leaf {
        aggregate: Aggregate,
        points: Vec<&'a Point>,
    },
}

impl Default for OctreeNode<'_> {
    fn default() -> Self {
        OctreeNode::Leaf {
            aggregate: Aggregate::EMPTY,
            points: Vec::new(),
        }
    }
}

impl<'a> OctreeNode<'a> {
    pub fn aggregate(&self) -> &Aggregate {
        match self {
            OctreeNode::Internal { aggregate, .. } => aggregate,
            OctreeNode::Leaf { aggregate, .. } => aggregate,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, OctreeNode::Leaf { .. })
    }

    /// True for a leaf that never received a point.
    pub fn is_empty(&self) -> bool {
        matches!(self, OctreeNode::Leaf { points, .. } if points.is_empty())
    }
}

/// A fully built tree with aggregate statistics, ready for force queries.
#[derive(Debug)]
pub struct Octree<'a> {
    root: OctreeNode<'a>,
    leaf_threshold: usize,
    max_depth: usize,
}

impl<'a> Octree<'a> {
    /// Inserts every point in parallel and runs the statistics pass with
    /// default settings for everything but the leaf threshold.
    pub fn build(points: &'a [Point], leaf_threshold: usize) -> Result<Self, OctreeError> {
        let config = OctreeConfig {
            leaf_threshold,
            ..OctreeConfig::default()
        };
        Self::build_with_config(points, &config)
    }

    pub fn build_with_config(points: &'a [Point], config: &OctreeConfig) -> Result<Self, OctreeError> {
        config.validate()?;

        validate_points(points)?;

        let builder = OctreeBuilder::from_config(config)?;
        builder.insert_all(points);
        let octree = builder.compute_statistics(config.statistics_parallel_depth);

        debug!(
            points = points.len(),
            leaf_threshold = config.leaf_threshold,
            total_weight = octree.total_weight(),
            "Octree built"
        );

        Ok(octree)
    }

    pub(crate) fn from_root(root: OctreeNode<'a>, leaf_threshold: usize, max_depth: usize) -> Self {
        Self {
            root,
            leaf_threshold,
            max_depth,
        }
    }

    pub fn root(&self) -> &OctreeNode<'a> {
        &self.root
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn total_weight(&self) -> Scalar {
        self.root.aggregate().weight
    }

    pub fn barycenter(&self) -> Vector {
        self.root.aggregate().barycenter
    }
}
