//! Flat terrain for the host's loaded region.

use anyhow::{Context, bail};
use cubestate_engine::material::MaterialRegistry;
use cubestate_engine::world::World;
use cubestate_engine::world::chunk::SECTION_SIZE;
use cubestate_engine::world::position::{BlockPos, ChunkPos, LocalBlockPos};
use cubestate_engine::world::state::{BlockState, MaterialId};

/// Layout of a generated flat region.
#[derive(Debug, Clone)]
pub struct FlatWorld {
    /// Chunk columns, inclusive.
    pub min: ChunkPos,
    pub max: ChunkPos,
    /// y of the grass layer; open air starts one above.
    pub surface_y: i64,
    /// One glowstone lamp on the surface at the center of every column.
    pub lamps: Vec<BlockPos>,
}

impl FlatWorld {
    pub fn chunk_count(&self) -> usize {
        let w = (self.max.x - self.min.x + 1) as usize;
        let d = (self.max.z - self.min.z + 1) as usize;
        w * d
    }

    /// Every (x, z) block column in the region.
    pub fn columns(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        let (x0, x1) = (self.min.x as i64 * 16, self.max.x as i64 * 16 + 15);
        let (z0, z1) = (self.min.z as i64 * 16, self.max.z as i64 * 16 + 15);
        (x0..=x1).flat_map(move |x| (z0..=z1).map(move |z| (x, z)))
    }
}

fn id_of(registry: &MaterialRegistry, name: &str) -> anyhow::Result<MaterialId> {
    registry
        .get_by_name(name)
        .map(|m| m.id())
        .with_context(|| format!("flat terrain needs a `{name}` material"))
}

/// Fill every column within `radius` chunks of the origin: three layers of
/// stone at the bottom of the world, then dirt, then grass, plus a glowstone
/// lamp in the middle of each column.
pub fn generate_flat(world: &World, radius: i32) -> anyhow::Result<FlatWorld> {
    let registry = world.registry();
    let stone = BlockState::of(id_of(registry, "stone")?);
    let dirt = BlockState::of(id_of(registry, "dirt")?);
    let grass = BlockState::of(id_of(registry, "grass")?);
    let glowstone = id_of(registry, "glowstone")?;
    let lamp_light = registry
        .get_by_name("glowstone")
        .map_or(0, |m| m.light_level());

    let base = world.config().min_y();
    let surface_y = base + 4;
    if surface_y + 2 >= world.config().max_y() {
        bail!(
            "world height {}..{} is too small for flat terrain",
            base,
            world.config().max_y()
        );
    }

    let mut lamps = Vec::new();
    for cx in -radius..=radius {
        for cz in -radius..=radius {
            let mut chunk = world.new_chunk();
            for x in 0..SECTION_SIZE as u8 {
                for z in 0..SECTION_SIZE as u8 {
                    for y in base..base + 3 {
                        chunk.set_block(LocalBlockPos { x, y, z }, stone);
                    }
                    chunk.set_block(LocalBlockPos { x, y: base + 3, z }, dirt);
                    chunk.set_block(LocalBlockPos { x, y: surface_y, z }, grass);
                }
            }
            let lamp = LocalBlockPos {
                x: 8,
                y: surface_y + 1,
                z: 8,
            };
            chunk.set_block(lamp, BlockState::new(glowstone, 0, lamp_light, 0));

            let pos = ChunkPos::new(cx, cz);
            world.insert_chunk(pos, chunk);
            let origin = pos.block_origin(surface_y + 1);
            lamps.push(BlockPos::new(origin.x + 8, origin.y, origin.z + 8));
        }
    }

    let flat = FlatWorld {
        min: ChunkPos::new(-radius, -radius),
        max: ChunkPos::new(radius, radius),
        surface_y,
        lamps,
    };
    tracing::info!(
        chunks = flat.chunk_count(),
        surface_y,
        "flat terrain generated"
    );
    Ok(flat)
}
