//! octoforce library
//!
//! A concurrent Barnes-Hut octree: points are inserted from many threads,
//! aggregated bottom-up, then queried for approximate pairwise forces.

pub mod cli;
pub mod config;
pub mod physics;
pub mod prelude;
pub mod simulation;
