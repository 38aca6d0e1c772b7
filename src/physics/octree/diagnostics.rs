use std::fmt;

use super::{Octree, OctreeNode};

/// Shape summary of a built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeStats {
    /// Depth of the deepest leaf; a lone root leaf has depth 0.
    pub max_depth: usize,
    pub leaf_count: usize,
    pub internal_count: usize,
    /// Leaves that never received a point.
    pub empty_leaf_count: usize,
    pub max_leaf_occupancy: usize,
    /// Leaves holding more points than the threshold because their points are
    /// coincident or they sit at the depth limit.
    pub oversized_leaf_count: usize,
    pub point_count: usize,
}

impl Octree<'_> {
    pub fn describe(&self) -> OctreeStats {
        let mut stats = OctreeStats::default();
        self.root.describe(&mut stats, 0, self.leaf_threshold);
        stats
    }

    /// Indented dump of every non-empty node, optionally listing leaf points.
    pub fn dump(&self, include_points: bool) -> OctreeDump<'_> {
        OctreeDump {
            root: &self.root,
            include_points,
        }
    }
}

impl OctreeNode<'_> {
    fn describe(&self, stats: &mut OctreeStats, depth: usize, leaf_threshold: usize) {
        match self {
            OctreeNode::Internal { children, .. } => {
                stats.internal_count += 1;
                for child in children.iter() {
                    child.describe(stats, depth + 1, leaf_threshold);
                }
            }
            OctreeNode::Leaf { points, .. } => {
                stats.leaf_count += 1;
                stats.max_depth = stats.max_depth.max(depth);
                stats.max_leaf_occupancy = stats.max_leaf_occupancy.max(points.len());
                stats.point_count += points.len();
                if points.is_empty() {
                    stats.empty_leaf_count += 1;
                }
                if points.len() > leaf_threshold {
                    stats.oversized_leaf_count += 1;
                }
            }
        }
    }
}

impl fmt::Display for OctreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "maxDepth {} numLeafs {} numInternalNodes {} maxNumNodes {} emptyLeafs {} oversizedLeafs {} points {}",
            self.max_depth,
            self.leaf_count,
            self.internal_count,
            self.max_leaf_occupancy,
            self.empty_leaf_count,
            self.oversized_leaf_count,
            self.point_count
        )
    }
}

pub struct OctreeDump<'t> {
    root: &'t OctreeNode<'t>,
    include_points: bool,
}

impl OctreeDump<'_> {
    fn write_node(&self, f: &mut fmt::Formatter<'_>, node: &OctreeNode, level: usize) -> fmt::Result {
        if node.is_empty() {
            return Ok(());
        }

        let aggregate = node.aggregate();
        let indent = level;
        write!(f, "{:indent$}Level {level} ", "")?;
        match node {
            OctreeNode::Internal { .. } => write!(f, "NODE ")?,
            OctreeNode::Leaf { points, .. } => write!(f, "LEAF {} ", points.len())?,
        }
        if let Some(bounds) = aggregate.bounds {
            write!(f, "{bounds} ")?;
        }
        writeln!(
            f,
            "BC ({}, {}, {}) W {} size {}",
            aggregate.barycenter.x,
            aggregate.barycenter.y,
            aggregate.barycenter.z,
            aggregate.weight,
            aggregate.size
        )?;

        match node {
            OctreeNode::Internal { children, .. } => {
                for child in children.iter() {
                    self.write_node(f, child, level + 1)?;
                }
            }
            OctreeNode::Leaf { points, .. } if self.include_points => {
                let indent = level + 1;
                for point in points {
                    writeln!(
                        f,
                        "{:indent$}({}, {}, {}) {}",
                        "", point.position.x, point.position.y, point.position.z, point.weight
                    )?;
                }
            }
            OctreeNode::Leaf { .. } => {}
        }

        Ok(())
    }
}

impl fmt::Display for OctreeDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.root, 0)
    }
}
