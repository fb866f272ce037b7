use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cubestate_engine::tick::TickDriver;
use cubestate_engine::world::World;
use cubestate_engine::world::position::WorldId;
use cubestate_sim::config::SimConfig;
use cubestate_sim::metrics::Metrics;
use cubestate_sim::{materials, simulation, worldgen};

/// Run a flat voxel region through fixed ticks with ambient simulation layers.
#[derive(Debug, Parser)]
#[command(name = "cubestate-sim", version)]
struct Args {
    /// Simulation config (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many ticks; overrides `max_ticks` (0 = until Ctrl+C).
    #[arg(long)]
    ticks: Option<u64>,

    /// Print the final counters as JSON on stdout.
    #[arg(long)]
    stats_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(ticks) = args.ticks {
        config.max_ticks = ticks;
    }

    tracing::info!("cubestate -- tiered block-state simulation host");

    let registry = Arc::new(materials::load(config.materials.as_deref())?);
    let world = Arc::new(World::with_config(
        WorldId(0),
        registry,
        config.world_config(),
    ));

    tracing::info!(radius = config.region_radius, "generating flat world...");
    let flat = worldgen::generate_flat(&world, config.region_radius)?;
    tracing::info!("world ready: {} chunks loaded", world.chunk_count());

    let tasks = simulation::build_layers(&config, &flat, world.registry())?;
    let driver = TickDriver {
        max_updates_per_tick: config.max_updates_per_tick,
    };
    let metrics = Arc::new(Metrics::new());

    let ticks = simulation::run(
        Arc::clone(&world),
        driver,
        tasks,
        Arc::clone(&metrics),
        config.tick_interval(),
        config.max_ticks,
    )
    .await?;

    let snapshot = metrics.snapshot(world.chunk_count() as u64);
    tracing::info!(
        ticks,
        updates = snapshot.updates,
        cells_promoted = snapshot.cells_promoted,
        hook_faults = snapshot.hook_faults,
        mean_tick_us = snapshot.mean_tick_us,
        "simulation stopped"
    );
    if args.stats_json {
        let json = serde_json::to_string_pretty(&snapshot).context("serializing metrics")?;
        println!("{json}");
    }
    Ok(())
}
