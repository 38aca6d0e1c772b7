//! Command line interface for the octoforce driver

use clap::Parser;
use thiserror::Error;
use tracing::info;

use crate::config::{PointDistribution, SimulationConfig};
use crate::physics::octree::OctreeError;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")");

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file could not be written
    #[error("Failed to save configuration: {0}")]
    ConfigSave(String),
    /// Octree parameters or point set rejected
    #[error(transparent)]
    Octree(#[from] OctreeError),
    /// Worker pool could not be created
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// octoforce - Barnes-Hut force approximation driver
#[derive(Parser, Debug, Default)]
#[command(version, long_version = LONG_VERSION, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Number of points to simulate (overrides config file)
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub bodies: Option<usize>,

    /// Leaf split threshold (overrides config file)
    #[arg(short = 't', long, value_name = "COUNT")]
    pub threshold: Option<usize>,

    /// Barnes-Hut opening angle (overrides config file)
    #[arg(short = 'e', long, value_name = "THETA")]
    pub theta: Option<f64>,

    /// Number of simulation steps (overrides config file)
    #[arg(short = 'i', long, value_name = "COUNT")]
    pub iterations: Option<usize>,

    /// Random seed for point generation
    #[arg(short = 's', long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Initial point distribution
    #[arg(long, value_enum, value_name = "SHAPE")]
    pub distribution: Option<DistributionArg>,

    /// Worker threads (defaults to one per core)
    #[arg(long, value_name = "COUNT")]
    pub threads: Option<usize>,

    /// Print the tree after every build
    #[arg(short = 'p', long)]
    pub print_tree: bool,

    /// Compare tree forces against direct summation for this many points
    #[arg(long, value_name = "COUNT")]
    pub verify: Option<usize>,

    /// Write the effective configuration to this path and continue
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistributionArg {
    Ball,
    Disk,
    Shell,
}

impl From<DistributionArg> for PointDistribution {
    fn from(arg: DistributionArg) -> Self {
        match arg {
            DistributionArg::Ball => PointDistribution::Ball,
            DistributionArg::Disk => PointDistribution::Disk,
            DistributionArg::Shell => PointDistribution::Shell,
        }
    }
}

/// Loads configuration from file or defaults, then applies command-line overrides
pub fn load_and_apply_config(args: &Args) -> Result<SimulationConfig, CliError> {
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {config_path}");
        SimulationConfig::load_or_default(config_path)
    } else {
        SimulationConfig::load_from_user_config()
    };

    if let Some(body_count) = args.bodies {
        info!("Overriding body count to: {body_count}");
        config.simulation.body_count = body_count;
    }

    if let Some(threshold) = args.threshold {
        info!("Overriding leaf threshold to: {threshold}");
        config.octree.leaf_threshold = threshold;
    }

    if let Some(theta) = args.theta {
        info!("Overriding theta to: {theta}");
        config.octree.theta = theta;
    }

    if let Some(iterations) = args.iterations {
        info!("Overriding iterations to: {iterations}");
        config.simulation.iterations = iterations;
    }

    if let Some(seed) = args.seed {
        info!("Using random seed: {seed}");
        config.simulation.initial_seed = Some(seed);
    }

    if let Some(distribution) = args.distribution {
        info!("Using distribution: {distribution:?}");
        config.simulation.distribution = distribution.into();
    }

    config.octree.validate()?;

    if let Some(path) = &args.save_config {
        config
            .save(path)
            .map_err(|e| CliError::ConfigSave(e.to_string()))?;
        info!("Configuration saved to: {path}");
    }

    Ok(config)
}

/// Pins the global rayon pool size when `--threads` is given.
pub fn configure_thread_pool(args: &Args) -> Result<(), CliError> {
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
        info!("Using {threads} worker threads");
    }
    Ok(())
}
