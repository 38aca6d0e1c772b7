pub mod aabb3d;
pub mod distribution;
pub mod math;
pub mod octree;
pub mod point;
