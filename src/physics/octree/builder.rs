use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use rayon::prelude::*;
use tracing::trace;

use super::{OctreeError, octant_index};
use crate::config::OctreeConfig;
use crate::physics::math::{Scalar, Vector};
use crate::physics::point::Point;

/// Concurrent insertion phase of an octree.
///
/// Every method takes `&self`, so one builder can be shared across threads
/// (for example from a rayon `for_each`). Each leaf carries its own lock and
/// only the leaf currently being appended to is ever locked; routing through
/// internal nodes is lock-free because a node's split center and children
/// never change once published.
///
/// A full leaf splits into eight children around the mean position of the
/// points it holds, unless all of those points share one exact position or
/// the leaf already sits at the maximum depth. Such leaves keep growing past
/// the threshold so coincident clusters cannot drive unbounded subdivision.
#[derive(Debug)]
pub struct OctreeBuilder<'a> {
    pub(super) root: BuildNode<'a>,
    pub(super) leaf_threshold: usize,
    pub(super) max_depth: usize,
}

#[derive(Debug, Default)]
pub(super) struct BuildNode<'a> {
    /// Set exactly once, while `leaf` is locked, when this node stops being a leaf.
    pub(super) split: OnceLock<Split<'a>>,
    pub(super) leaf: Mutex<LeafPoints<'a>>,
}

#[derive(Debug)]
pub(super) struct Split<'a> {
    pub(super) center: Vector,
    pub(super) children: Box<[BuildNode<'a>; 8]>,
}

#[derive(Debug, Default)]
pub(super) struct LeafPoints<'a> {
    pub(super) points: Vec<&'a Point>,
    /// Every held point shares the first point's exact position.
    coincident: bool,
}

impl<'a> LeafPoints<'a> {
    fn push(&mut self, point: &'a Point) {
        self.coincident = match self.points.first() {
            Some(first) => self.coincident && first.position == point.position,
            None => true,
        };
        self.points.push(point);
    }

    fn mean_position(&self) -> Vector {
        let sum = self
            .points
            .iter()
            .fold(Vector::ZERO, |sum, point| sum + point.position);
        sum / self.points.len() as Scalar
    }
}

impl<'a> BuildNode<'a> {
    fn lock_leaf(&self) -> MutexGuard<'_, LeafPoints<'a>> {
        // A panic while holding the lock cannot leave the vector half-pushed.
        self.leaf.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<'a> OctreeBuilder<'a> {
    pub fn new(leaf_threshold: usize) -> Result<Self, OctreeError> {
        Self::from_config(&OctreeConfig {
            leaf_threshold,
            ..OctreeConfig::default()
        })
    }

    pub fn from_config(config: &OctreeConfig) -> Result<Self, OctreeError> {
        config.validate()?;
        Ok(Self {
            root: BuildNode::default(),
            leaf_threshold: config.leaf_threshold,
            max_depth: config.max_depth,
        })
    }

    /// Routes `point` to its leaf. Safe to call from many threads at once.
    pub fn insert(&self, point: &'a Point) {
        self.insert_from(&self.root, point, 0);
    }

    /// Inserts every point, in parallel, into this tree.
    pub fn insert_all(&self, points: &'a [Point]) {
        points.par_iter().for_each(|point| self.insert(point));
    }

    fn insert_from(&self, start: &BuildNode<'a>, point: &'a Point, start_depth: usize) {
        let mut node = start;
        let mut depth = start_depth;

        loop {
            if let Some(split) = node.split.get() {
                node = &split.children[octant_index(point.position, split.center)];
                depth += 1;
                continue;
            }

            let mut leaf = node.lock_leaf();

            // Promoted by another inserter while we waited for the lock.
            if node.split.get().is_some() {
                drop(leaf);
                continue;
            }

            leaf.push(point);
            if leaf.points.len() < self.leaf_threshold {
                return;
            }

            if leaf.coincident || depth >= self.max_depth {
                if leaf.points.len() == self.leaf_threshold {
                    trace!(
                        depth,
                        coincident = leaf.coincident,
                        "Leaf held back from splitting"
                    );
                }
                return;
            }

            let center = leaf.mean_position();
            let held = std::mem::take(&mut *leaf);
            let split = node.split.get_or_init(|| Split {
                center,
                children: Box::default(),
            });
            drop(leaf);

            // The children are fresh, so every reinsert lands at most one level
            // down before contending with concurrent inserters.
            for held_point in held.points {
                let child = &split.children[octant_index(held_point.position, split.center)];
                self.insert_from(child, held_point, depth + 1);
            }
            return;
        }
    }
}
