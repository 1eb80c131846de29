use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rusgrav::engine::{set_field_trace, toggle_debug_text, ExecutionBackend, FieldScene};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::probe_run::ProbeRun;

mod probe_run;

/// Headless run of the batched gravity field against scattered bodies
#[derive(Parser, Debug)]
#[command(name = "field_probe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scene file with arrows and field config
    #[arg(short, long, default_value = "scenes/planetoid.json")]
    scene: PathBuf,

    /// Bodies to spawn, at most the scene's batch capacity
    #[arg(short, long, default_value_t = 1500)]
    bodies: usize,

    /// Simulation ticks to run
    #[arg(short, long, default_value_t = 60)]
    ticks: usize,

    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Run both stages on the calling thread
    #[arg(long)]
    serial: bool,

    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level: Level = cli
        .log_level
        .parse()
        .with_context(|| format!("unknown log level {}", cli.log_level))?;
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to install logger")?;

    #[cfg(debug_assertions)]
    {
        toggle_debug_text();
        set_field_trace(true);
    }

    let mut scene = FieldScene::load(&cli.scene)
        .with_context(|| format!("loading {}", cli.scene.display()))?;
    if cli.serial {
        scene.config.backend = ExecutionBackend::Serial;
    }
    if cli.bodies > scene.config.capacity() {
        bail!(
            "{} bodies do not fit the scene's capacity of {}",
            cli.bodies,
            scene.config.capacity()
        );
    }

    let mut run = ProbeRun::new(&scene, cli.bodies, cli.seed)?;
    run.run(cli.ticks)?;
    run.report();
    Ok(())
}
