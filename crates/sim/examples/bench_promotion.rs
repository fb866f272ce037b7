//! Benchmark: parallel delayed-write throughput vs tick-boundary promotion.
//!
//! Fills a flat region with light writes from many threads, times the
//! promotion that publishes them, then drops sand columns and times the tick
//! driver to quiescence.
//! Run with: `cargo run --release -p cubestate-sim --example bench_promotion`

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use cubestate_engine::tick::TickDriver;
use cubestate_engine::world::World;
use cubestate_engine::world::position::{BlockPos, WorldId};
use cubestate_engine::{DelayedWrite, SnapshotRead};
use cubestate_sim::materials::{self, SAND};
use cubestate_sim::worldgen::{self, FlatWorld};

fn main() -> anyhow::Result<()> {
    let radius = 8;
    let threads = thread::available_parallelism().map_or(4, |n| n.get());
    let rounds = 4;

    println!("=== cubestate: promotion benchmark ===\n");

    let world = build_world()?;
    let flat = worldgen::generate_flat(&world, radius)?;
    let columns: Vec<(i64, i64)> = flat.columns().collect();
    println!(
        "  {} chunks, {} columns, {} writer threads\n",
        flat.chunk_count(),
        columns.len(),
        threads
    );

    // --- Parallel delayed writes, then promotion ---
    for round in 0..rounds {
        let level = (round % 15 + 1) as u8;
        let y = flat.surface_y + 1 + round as i64;
        let t0 = Instant::now();
        thread::scope(|s| {
            for part in columns.chunks(columns.len().div_ceil(threads)) {
                let world = &world;
                s.spawn(move || {
                    for &(x, z) in part {
                        let block = world.block(BlockPos::new(x, y, z));
                        // In-range positions of a loaded world never fail.
                        let _ = block.set_sky_light(level);
                        let _ = block.set_block_light(level);
                    }
                });
            }
        });
        let dt_write = t0.elapsed();

        let t0 = Instant::now();
        let promotion = world.promote();
        let dt_promote = t0.elapsed();

        let writes = columns.len() * 2;
        println!(
            "  round {}: {:>7} writes in {:>9.2?} ({:>6.1} M/s), promoted {} sections / {} cells in {:>9.2?}",
            round,
            writes,
            dt_write,
            writes as f64 / dt_write.as_secs_f64() / 1e6,
            promotion.sections,
            promotion.cells_changed,
            dt_promote
        );
    }

    // --- Sand to quiescence ---
    let drops = drop_sand(&world, &flat);
    let driver = TickDriver::new();
    let t0 = Instant::now();
    let ticks = driver.run_until_quiet(&world, 1_000);
    let dt = t0.elapsed();
    println!("\n  {} sand drops settled in {} ticks, {:>8.2?}", drops.len(), ticks, dt);

    let landed = drops
        .iter()
        .filter(|pos| world.block(BlockPos::new(pos.x, flat.surface_y + 1, pos.z)).material_id() == SAND)
        .count();
    if landed == drops.len() {
        println!("  Verification: PASS (every drop landed on the surface)");
    } else {
        println!("  Verification: FAIL ({} of {} landed)", landed, drops.len());
    }
    Ok(())
}

fn build_world() -> anyhow::Result<World> {
    let registry = Arc::new(materials::builtin()?);
    Ok(World::new(WorldId(0), registry))
}

/// One sand block per 4x4 cell of every chunk, 10 blocks above the surface,
/// skipping the lamp at each chunk's center.
fn drop_sand(world: &World, flat: &FlatWorld) -> Vec<BlockPos> {
    let y = flat.surface_y + 10;
    let drops: Vec<BlockPos> = flat
        .columns()
        .filter(|&(x, z)| x.rem_euclid(4) == 2 && z.rem_euclid(4) == 2)
        .map(|(x, z)| BlockPos::new(x, y, z))
        .collect();
    for &pos in &drops {
        if world.write_material(pos, SAND, 0).is_ok() {
            world.schedule_update(pos);
        }
    }
    drops
}
