//! Fixed-step driver around the octree: rebuild, query, integrate.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::physics::distribution::{SharedRng, generate_from_params};
use crate::physics::math::{Scalar, Vector, direct_force, relative_error};
use crate::physics::octree::{OctreeBuilder, OctreeError, OctreeStats, validate_points};
use crate::physics::point::Point;

/// Wall-clock time spent in each phase of one step.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepTimings {
    pub insert: Duration,
    pub statistics: Duration,
    pub forces: Duration,
    pub update: Duration,
}

impl StepTimings {
    pub fn total(&self) -> Duration {
        self.insert + self.statistics + self.forces + self.update
    }
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: usize,
    pub timings: StepTimings,
    pub stats: OctreeStats,
    pub total_weight: Scalar,
    pub barycenter: Vector,
    /// Tree dump, captured when requested.
    pub dump: Option<String>,
}

pub struct Simulation {
    config: SimulationConfig,
    points: Vec<Point>,
    step: usize,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, OctreeError> {
        config.octree.validate()?;
        let mut rng = SharedRng::from_optional_seed(config.simulation.initial_seed);
        let points = generate_from_params(&mut rng, &config.simulation);
        Ok(Self::with_points(config, points))
    }

    pub fn with_points(config: SimulationConfig, points: Vec<Point>) -> Self {
        Self {
            config,
            points,
            step: 0,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Builds a fresh tree, applies its forces, and advances every point.
    pub fn step(&mut self, capture_dump: bool) -> Result<StepReport, OctreeError> {
        let octree_config = &self.config.octree;
        validate_points(&self.points)?;
        let mut timings = StepTimings::default();

        let start = Instant::now();
        let builder = OctreeBuilder::from_config(octree_config)?;
        builder.insert_all(&self.points);
        timings.insert = start.elapsed();

        let start = Instant::now();
        let octree = builder.compute_statistics(octree_config.statistics_parallel_depth);
        timings.statistics = start.elapsed();

        let stats = octree.describe();
        let dump = capture_dump.then(|| octree.dump(true).to_string());
        let total_weight = octree.total_weight();
        let barycenter = octree.barycenter();

        let start = Instant::now();
        let forces = octree.compute_forces(&self.points, octree_config.theta)?;
        timings.forces = start.elapsed();
        drop(octree);

        let start = Instant::now();
        let dt = self.config.simulation.time_step;
        self.points
            .par_iter_mut()
            .zip(forces.par_iter())
            .for_each(|(point, force)| {
                point.velocity += *force * dt;
                point.position += point.velocity * dt;
            });
        timings.update = start.elapsed();

        let report = StepReport {
            step: self.step,
            timings,
            stats,
            total_weight,
            barycenter,
            dump,
        };
        self.step += 1;

        debug!(step = report.step, "{}", report.stats);
        Ok(report)
    }

    /// Largest relative error of tree forces against direct summation over
    /// the first `sample` points.
    pub fn max_force_error(&self, sample: usize) -> Result<Scalar, OctreeError> {
        let octree_config = &self.config.octree;
        validate_points(&self.points)?;
        let builder = OctreeBuilder::from_config(octree_config)?;
        builder.insert_all(&self.points);
        let octree = builder.compute_statistics(octree_config.statistics_parallel_depth);

        let sample = sample.min(self.points.len());
        let approximate = octree.compute_forces(&self.points[..sample], octree_config.theta)?;

        Ok(approximate
            .par_iter()
            .enumerate()
            .map(|(index, force)| relative_error(*force, direct_force(&self.points, index)))
            .reduce(|| 0.0, Scalar::max))
    }

    /// Runs the configured number of steps, logging per-phase timings.
    pub fn run(&mut self, print_tree: bool) -> Result<StepTimings, OctreeError> {
        let mut totals = StepTimings::default();
        for _ in 0..self.config.simulation.iterations {
            let report = self.step(print_tree)?;
            info!(
                step = report.step,
                insert = ?report.timings.insert,
                stats = ?report.timings.statistics,
                forces = ?report.timings.forces,
                update = ?report.timings.update,
                "Step complete"
            );
            info!("debug {}", report.stats);
            if let Some(dump) = &report.dump {
                info!("\n{dump}");
            }

            totals.insert += report.timings.insert;
            totals.statistics += report.timings.statistics;
            totals.forces += report.timings.forces;
            totals.update += report.timings.update;
        }
        Ok(totals)
    }
}
