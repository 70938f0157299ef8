//! disksim command line driver.
//!
//! Runs one simulation and writes `static.txt` and `dynamic.txt` under
//! `$DISKSIM_DATA_DIR/simulations/<name>/` (default data root `../data`).

use anyhow::{Context, Result};
use clap::Parser;
use disksim::config::SimConfig;
use disksim::output::FileSink;
use disksim::run_from_config;
use std::path::PathBuf;
use tracing::info;

const DATA_DIR_ENV: &str = "DISKSIM_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "../data";

#[derive(Parser)]
#[command(name = "disksim")]
#[command(version, about = "Event-driven hard-disk gas in a chamber with an aperture", long_about = None)]
struct Cli {
    /// Simulation name; output goes to <data>/simulations/<name>/
    name: String,

    /// Number of disks N
    particles: usize,

    /// Aperture height L, in (0, 0.09)
    aperture: f64,

    /// Number of event clusters to resolve T
    steps: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = SimConfig {
        name: cli.name,
        num_particles: cli.particles,
        aperture: cli.aperture,
        steps: cli.steps,
        ..SimConfig::default()
    };
    config.validate().context("invalid simulation parameters")?;

    let root = std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let dir = root.join("simulations").join(&config.name);
    let mut sink = FileSink::create(&dir)
        .with_context(|| format!("failed to prepare output directory {}", dir.display()))?;

    let summary = run_from_config(&config, &mut sink).context("simulation failed")?;
    info!(
        dir = %sink.dir().display(),
        steps = summary.steps,
        t = summary.final_time,
        "output written"
    );
    Ok(())
}
