use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use octoforce::cli::{self, Args, CliError};
use octoforce::simulation::Simulation;

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: &Args) -> Result<(), CliError> {
    cli::configure_thread_pool(args)?;
    let config = cli::load_and_apply_config(args)?;

    info!(
        nodes = config.simulation.body_count,
        threshold = config.octree.leaf_threshold,
        theta = config.octree.theta,
        iterations = config.simulation.iterations,
        "Starting"
    );

    let mut simulation = Simulation::new(config)?;

    if let Some(sample) = args.verify {
        let error = simulation.max_force_error(sample)?;
        info!(sample, max_relative_error = error, "Force verification");
    }

    let totals = simulation.run(args.print_tree)?;
    info!(
        insert = ?totals.insert,
        stats = ?totals.statistics,
        forces = ?totals.forces,
        update = ?totals.update,
        total = ?totals.total(),
        "Iterations complete"
    );

    Ok(())
}
