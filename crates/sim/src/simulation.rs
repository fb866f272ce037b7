//! Ambient simulation layers and the host tick loop.
//!
//! Each [`SimulationLayer`] runs inside the tick's work phase, in parallel
//! with every other layer. Layers read the snapshot and issue delayed writes;
//! the driver dispatches the physics updates those writes queue and promotes
//! at the tick boundary.
//!
//! # Adding a new layer
//!
//! 1. Implement [`SimulationLayer`] for your struct.
//! 2. Push it through [`Layer::new`] in [`build_layers`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cubestate_engine::hooks::{self, PlacementOutcome};
use cubestate_engine::material::{Material, MaterialRegistry};
use cubestate_engine::tick::{TickDriver, TickTask};
use cubestate_engine::world::World;
use cubestate_engine::world::access::Source;
use cubestate_engine::world::position::{BlockFace, BlockPos};
use cubestate_engine::world::state::MaterialId;
use cubestate_engine::{DelayedWrite, SnapshotRead};
use tokio::time::MissedTickBehavior;

use crate::config::SimConfig;
use crate::metrics::Metrics;
use crate::worldgen::FlatWorld;

/// A pluggable layer of ambient world activity.
///
/// Layers are expected to be cheap per tick: heavy work should be spread
/// across ticks with [`every_ticks`](Self::every_ticks).
pub trait SimulationLayer: Send + Sync + 'static {
    /// Used for logging and as the [`Source`] of the layer's writes.
    fn name(&self) -> &'static str;

    /// Run on ticks divisible by this. Treated as 1 if zero.
    fn every_ticks(&self) -> u64 {
        1
    }

    /// `tick` is the snapshot generation being read.
    fn run(&self, world: &World, tick: u64);
}

/// Runs a [`SimulationLayer`] as a [`TickTask`] on its cadence.
pub struct Layer(Box<dyn SimulationLayer>);

impl Layer {
    pub fn new(layer: impl SimulationLayer) -> Self {
        Self(Box::new(layer))
    }
}

impl TickTask for Layer {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn run(&self, world: &World, tick: u64) {
        if tick % self.0.every_ticks().max(1) == 0 {
            self.0.run(world, tick);
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in layers
// ---------------------------------------------------------------------------

/// Drops sand at random columns of the region through the placement hook.
pub struct SandRain {
    sand: Arc<Material>,
    /// Inclusive block bounds on x and z.
    x: (i64, i64),
    z: (i64, i64),
    drop_y: i64,
    per_run: usize,
    every: u64,
    seed: u64,
}

impl SandRain {
    pub fn new(sand: Arc<Material>, flat: &FlatWorld, drop_y: i64) -> Self {
        Self {
            sand,
            x: (flat.min.x as i64 * 16, flat.max.x as i64 * 16 + 15),
            z: (flat.min.z as i64 * 16, flat.max.z as i64 * 16 + 15),
            drop_y,
            per_run: 4,
            every: 5,
            seed: 0x5eed,
        }
    }

    pub fn with_rate(mut self, per_run: usize, every: u64) -> Self {
        self.per_run = per_run;
        self.every = every;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl SimulationLayer for SandRain {
    fn name(&self) -> &'static str {
        "sand_rain"
    }

    fn every_ticks(&self) -> u64 {
        self.every
    }

    fn run(&self, world: &World, tick: u64) {
        // Seeded per tick so a run is reproducible without shared state.
        let mut rng = fastrand::Rng::with_seed(self.seed ^ tick);
        let source = Source::Simulation(self.name());
        for _ in 0..self.per_run {
            let pos = BlockPos::new(
                rng.i64(self.x.0..=self.x.1),
                self.drop_y,
                rng.i64(self.z.0..=self.z.1),
            );
            if world.block(pos).material_id() != MaterialId::AIR {
                continue;
            }
            match hooks::place(world, pos, &self.sand, 0, BlockFace::Top, &source) {
                PlacementOutcome::Placed => world.schedule_update(pos),
                PlacementOutcome::Rejected | PlacementOutcome::Faulted => {
                    tracing::debug!(?pos, "sand drop not placed");
                }
            }
        }
    }
}

/// Toggles the block light of every lamp between off and its material's
/// light level.
pub struct LightFlicker {
    lamps: Vec<BlockPos>,
    every: u64,
}

impl LightFlicker {
    pub fn new(lamps: Vec<BlockPos>, every: u64) -> Self {
        Self { lamps, every }
    }
}

impl SimulationLayer for LightFlicker {
    fn name(&self) -> &'static str {
        "light_flicker"
    }

    fn every_ticks(&self) -> u64 {
        self.every
    }

    fn run(&self, world: &World, _tick: u64) {
        for &pos in &self.lamps {
            let block = world.block(pos);
            let emits = match block.material() {
                Ok(material) => material.light_level(),
                Err(err) => {
                    tracing::warn!(?pos, %err, "lamp skipped");
                    continue;
                }
            };
            if emits == 0 {
                continue;
            }
            let next = if block.block_light() == 0 { emits } else { 0 };
            if let Err(err) = block.set_block_light(next) {
                tracing::warn!(?pos, %err, "lamp toggle failed");
            }
        }
    }
}

/// Sweeps sky light over the surface of the region in a triangle wave,
/// 0 up to 15 and back, once per `period` ticks.
pub struct SkyCycle {
    columns: Vec<(i64, i64)>,
    y: i64,
    period: u64,
    every: u64,
}

impl SkyCycle {
    pub fn new(flat: &FlatWorld, period: u64, every: u64) -> Self {
        Self {
            columns: flat.columns().collect(),
            y: flat.surface_y + 1,
            period: period.max(2),
            every,
        }
    }

    /// Sky light level for `tick`.
    pub fn level_at(&self, tick: u64) -> u8 {
        let half = self.period / 2;
        let phase = tick % self.period;
        let rising = if phase < half { phase } else { self.period - phase };
        (rising.min(half) * 15 / half) as u8
    }
}

impl SimulationLayer for SkyCycle {
    fn name(&self) -> &'static str {
        "sky_cycle"
    }

    fn every_ticks(&self) -> u64 {
        self.every
    }

    fn run(&self, world: &World, tick: u64) {
        let level = self.level_at(tick);
        let mut changed = 0usize;
        for &(x, z) in &self.columns {
            let block = world.block(BlockPos::new(x, self.y, z));
            if block.sky_light() == level {
                continue;
            }
            match block.set_sky_light(level) {
                Ok(_) => changed += 1,
                Err(err) => tracing::warn!(x, z, %err, "sky light write failed"),
            }
        }
        tracing::trace!(tick, level, changed, "sky light swept");
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Build the layers enabled in `config` over the generated region.
pub fn build_layers(
    config: &SimConfig,
    flat: &FlatWorld,
    registry: &MaterialRegistry,
) -> anyhow::Result<Vec<Box<dyn TickTask>>> {
    let mut tasks: Vec<Box<dyn TickTask>> = Vec::new();
    if config.layers.sand_rain {
        let sand = registry
            .get_by_name("sand")
            .context("sand_rain layer needs a `sand` material")?;
        tasks.push(Box::new(Layer::new(SandRain::new(
            Arc::clone(sand),
            flat,
            flat.surface_y + 12,
        ))));
    }
    if config.layers.light_flicker {
        tasks.push(Box::new(Layer::new(LightFlicker::new(flat.lamps.clone(), 10))));
    }
    if config.layers.sky_cycle {
        tasks.push(Box::new(Layer::new(SkyCycle::new(flat, 600, 20))));
    }
    for task in &tasks {
        tracing::info!(layer = task.name(), "simulation layer enabled");
    }
    Ok(tasks)
}

/// Drive `world` at a fixed interval until `max_ticks` have run (0 = no
/// limit) or Ctrl+C. Each step runs on the blocking pool so the rayon work
/// inside it never stalls the runtime. Returns the number of ticks run.
pub async fn run(
    world: Arc<World>,
    driver: TickDriver,
    tasks: Vec<Box<dyn TickTask>>,
    metrics: Arc<Metrics>,
    interval: Duration,
    max_ticks: u64,
) -> anyhow::Result<u64> {
    let driver = Arc::new(driver);
    let tasks: Arc<[Box<dyn TickTask>]> = tasks.into();

    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut ticks = 0u64;
    while max_ticks == 0 || ticks < max_ticks {
        tokio::select! {
            _ = timer.tick() => {}
            _ = &mut shutdown => {
                tracing::info!(ticks, "Ctrl+C received, stopping tick loop");
                break;
            }
        }

        let (world, driver, tasks) = (Arc::clone(&world), Arc::clone(&driver), Arc::clone(&tasks));
        let report = tokio::task::spawn_blocking(move || driver.step(&world, &tasks))
            .await
            .context("tick worker panicked")?;

        if report.task_faults > 0 || report.hook_faults > 0 {
            tracing::warn!(
                tick = report.promotion.tick,
                task_faults = report.task_faults,
                hook_faults = report.hook_faults,
                "faults contained this tick"
            );
        }
        if report.elapsed > interval {
            tracing::warn!(
                tick = report.promotion.tick,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "tick overran its interval"
            );
        }
        metrics.record_tick(&report);
        ticks += 1;
    }
    Ok(ticks)
}
