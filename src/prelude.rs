//! octoforce prelude module
//!
//! Re-exports the types most callers need to build a tree and query forces.

pub use crate::config::{OctreeConfig, PointDistribution, SimulationConfig, SimulationParams};
pub use crate::physics::aabb3d::Aabb3d;
pub use crate::physics::math::{Scalar, Vector, pairwise_force};
pub use crate::physics::octree::{Octree, OctreeBuilder, OctreeError, OctreeNode, OctreeStats};
pub use crate::physics::point::Point;
pub use crate::simulation::{Simulation, StepReport, StepTimings};
