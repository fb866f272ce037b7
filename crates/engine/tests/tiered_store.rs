//! Snapshot / live / delayed-write semantics of the world store and block
//! handles.

use std::sync::Arc;

use cubestate_engine::error::StoreError;
use cubestate_engine::material::{Material, MaterialRegistry};
use cubestate_engine::world::chunk::SECTION_SIZE;
use cubestate_engine::world::position::{BlockPos, ChunkPos, Coordinate, LocalBlockPos, WorldId};
use cubestate_engine::world::state::{BlockState, MaterialId};
use cubestate_engine::world::{World, WorldConfig};
use cubestate_engine::{Block, DelayedWrite, LiveRead, SnapshotRead};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const STONE: MaterialId = MaterialId(1);
const DIRT: MaterialId = MaterialId(3);
const GLASS: MaterialId = MaterialId(20);
const WOOL: MaterialId = MaterialId(300);
const STICK: MaterialId = MaterialId(200);

fn registry() -> Arc<MaterialRegistry> {
    let mut reg = MaterialRegistry::with_air();
    reg.register(Material::block("stone", STONE.0)).unwrap();
    reg.register(Material::block("dirt", DIRT.0)).unwrap();
    let glass = reg.register(Material::block("glass", GLASS.0)).unwrap();
    glass.set_opacity(0);
    for data in 0..4 {
        reg.register(Material::block_subtype(format!("wool_{data}"), WOOL.0, data))
            .unwrap();
    }
    reg.register(Material::item("stick", STICK.0)).unwrap();
    Arc::new(reg)
}

fn world() -> World {
    World::new(WorldId(7), registry())
}

// ---------------------------------------------------------------------------
// Snapshot vs live
// ---------------------------------------------------------------------------

#[test]
fn unwritten_slots_read_empty_in_both_tiers() {
    let world = world();
    let block = world.block(BlockPos::new(3, 10, -4));
    assert_eq!(block.material_id(), MaterialId::AIR);
    assert_eq!(block.live_material_id(), MaterialId::AIR);
    assert_eq!(block.block_light(), 0);
    assert_eq!(block.live_sky_light(), 0);
    assert_eq!(block.material().unwrap().name(), "air");
    assert_eq!(world.chunk_count(), 0);
}

#[test]
fn snapshot_is_stable_until_promotion() {
    let world = world();
    let block = world.block(BlockPos::new(0, 64, 0));

    for id in [STONE, DIRT, GLASS, STONE, DIRT] {
        block.set_material_id(id).unwrap();
        assert_eq!(block.material_id(), MaterialId::AIR, "snapshot moved mid-tick");
    }

    world.promote();
    assert_eq!(block.material_id(), DIRT, "last write wins at promotion");
}

#[test]
fn live_read_sees_write_immediately() {
    let world = world();
    let block = world.block(BlockPos::new(5, 0, 5));

    block.set_material_id(STONE).unwrap();
    assert_eq!(block.live_material_id(), STONE);
    assert_eq!(block.live_material().unwrap().name(), "stone");

    block.set_block_light(9).unwrap();
    assert_eq!(block.live_block_light(), 9);
    assert_eq!(block.block_light(), 0);
}

#[test]
fn setters_return_prior_snapshot_value() {
    let world = world();
    let block = world.block(BlockPos::new(1, 2, 3));

    assert_eq!(block.set_material_id(STONE).unwrap(), MaterialId::AIR);
    // Still the snapshot value, not the stone we just wrote.
    assert_eq!(block.set_material_id(DIRT).unwrap(), MaterialId::AIR);
    world.promote();
    assert_eq!(block.set_material_id(STONE).unwrap(), DIRT);

    assert_eq!(block.set_sky_light(12).unwrap(), 0);
    assert_eq!(block.set_sky_light(3).unwrap(), 0);
    world.promote();
    assert_eq!(block.set_sky_light(1).unwrap(), 3);
}

#[test]
fn set_material_returns_prior_snapshot_material() {
    let world = world();
    let registry = Arc::clone(world.registry());
    let stone = registry.get_by_name("stone").unwrap();
    let glass = registry.get_by_name("glass").unwrap();
    let block = world.block(BlockPos::new(-8, 30, 8));

    let prior = block.set_material(stone).unwrap();
    assert_eq!(prior.name(), "air");
    world.promote();

    let prior = block.set_material(glass).unwrap();
    assert!(Arc::ptr_eq(&prior, stone));
    assert_eq!(block.material().unwrap().name(), "stone");
    assert_eq!(block.live_material().unwrap().name(), "glass");
}

#[test]
fn light_setters_mask_to_four_bits() {
    let world = world();
    let block = world.block(BlockPos::new(0, 0, 0));
    for v in 0..=u8::MAX {
        block.set_block_light(v).unwrap();
        block.set_sky_light(v.wrapping_add(1)).unwrap();
        world.promote();
        assert_eq!(block.block_light(), v & 0xF);
        assert_eq!(block.sky_light(), v.wrapping_add(1) & 0xF);
    }
}

#[test]
fn fields_are_written_independently() {
    let world = world();
    let block = world.block(BlockPos::new(2, 2, 2));
    block.set_material_id(STONE).unwrap();
    block.set_block_light(7).unwrap();
    block.set_sky_light(15).unwrap();
    world.promote();

    let state = world.snapshot_state(block.position());
    assert_eq!(state, BlockState::new(STONE, 0, 7, 15));
}

// ---------------------------------------------------------------------------
// Rejected writes
// ---------------------------------------------------------------------------

#[test]
fn unknown_material_is_rejected_and_changes_nothing() {
    let world = world();
    let pos = BlockPos::new(4, 4, 4);
    let block = world.block(pos);
    block.set_material_id(STONE).unwrap();
    block.set_block_light(5).unwrap();
    world.promote();
    block.set_material_id(DIRT).unwrap();

    let snap_before = world.snapshot_state(pos);
    let live_before = world.live_state(pos);

    let err = block.set_material_id(MaterialId(77)).unwrap_err();
    assert_eq!(
        err,
        StoreError::UnknownMaterial {
            id: MaterialId(77),
            data: 0
        }
    );
    assert_eq!(world.snapshot_state(pos), snap_before);
    assert_eq!(world.live_state(pos), live_before);
}

#[test]
fn custom_id_requires_registered_subtype() {
    let world = world();
    let pos = BlockPos::new(0, 70, 0);
    let block = world.block(pos);

    // Live data is 0, and wool subtype 0 exists.
    assert!(block.set_material_id(WOOL).is_ok());
    assert_eq!(block.live_material().unwrap().name(), "wool_0");

    // Data 9 has no wool subtype.
    world.write_material(pos, STONE, 9).unwrap();
    let err = block.set_material_id(WOOL).unwrap_err();
    assert_eq!(err, StoreError::UnknownMaterial { id: WOOL, data: 9 });
    assert_eq!(block.live_material_id(), STONE);
}

#[test]
fn item_only_materials_cannot_be_written() {
    let world = world();
    let block = world.block(BlockPos::new(1, 1, 1));
    let err = block.set_material_id(STICK).unwrap_err();
    assert!(matches!(err, StoreError::NotPlaceable { id, .. } if id == STICK));
    assert!(!block.is_pending());
}

#[test]
fn writes_outside_vertical_range_fail() {
    let world = World::with_config(
        WorldId(1),
        registry(),
        WorldConfig {
            min_section: 0,
            section_count: 2,
        },
    );
    let too_high = BlockPos::new(0, 32, 0);
    let too_low = BlockPos::new(0, -1, 0);
    assert_eq!(
        world.block(too_high).set_block_light(3),
        Err(StoreError::OutOfBounds { pos: too_high })
    );
    assert!(world.block(too_low).set_material_id(STONE).is_err());
    assert_eq!(world.live_state(too_high), BlockState::EMPTY);
    assert!(world.block(BlockPos::new(0, 31, 0)).set_block_light(3).is_ok());
}

#[test]
fn set_material_rejects_unknown_and_item_materials() {
    let world = world();
    let pos = BlockPos::new(6, 6, 6);
    let block = world.block(pos);
    block.set_material_id(STONE).unwrap();
    world.promote();
    block.set_material_id(DIRT).unwrap();

    let snap_before = world.snapshot_state(pos);
    let live_before = world.live_state(pos);
    let dirty_before = world.dirty_count();

    let ghost = Material::block("ghost", 99);
    let err = block.set_material(&ghost).unwrap_err();
    assert_eq!(
        err,
        StoreError::UnknownMaterial {
            id: MaterialId(99),
            data: 0
        }
    );

    let stick = Arc::clone(world.registry().get_by_name("stick").unwrap());
    let err = block.set_material(&stick).unwrap_err();
    assert!(matches!(err, StoreError::NotPlaceable { id, .. } if id == STICK));

    assert_eq!(world.snapshot_state(pos), snap_before);
    assert_eq!(world.live_state(pos), live_before);
    assert_eq!(world.dirty_count(), dirty_before);
}

#[test]
fn far_coordinates_never_alias_loaded_cells() {
    let world = world();
    let far_x = BlockPos::new(1 << 36, 10, 0);
    assert!(!world.in_bounds(far_x));
    assert_eq!(
        world.block(far_x).set_material_id(STONE),
        Err(StoreError::OutOfBounds { pos: far_x })
    );
    world.promote();
    assert_eq!(world.block(BlockPos::new(0, 10, 0)).live_material_id(), MaterialId::AIR);
    assert_eq!(world.block(BlockPos::new(0, 10, 0)).material_id(), MaterialId::AIR);
    assert_eq!(world.chunk_count(), 0);

    let near = BlockPos::new(0, 5, 0);
    world.block(near).set_material_id(STONE).unwrap();
    world.promote();
    let far_y = BlockPos::new(0, (1 << 36) + 5, 0);
    assert_eq!(world.snapshot_state(far_y), BlockState::EMPTY);
    assert_eq!(world.live_state(far_y), BlockState::EMPTY);
    assert!(!world.is_pending(far_y));
    assert_eq!(world.block(near).material_id(), STONE);
}

#[test]
fn writes_at_coordinate_extremes_fail_without_panicking() {
    let world = world();
    for pos in [
        BlockPos::new(i64::MAX, 0, 0),
        BlockPos::new(i64::MIN, 0, i64::MIN),
        BlockPos::new(0, i64::MAX, 0),
    ] {
        assert_eq!(world.snapshot_state(pos), BlockState::EMPTY);
        assert!(world.block(pos).set_block_light(1).is_err());
    }
    // The last column whose index still fits in i32 is addressable.
    let edge = BlockPos::new((i32::MAX as i64) * 16 + 15, 0, 0);
    assert!(world.block(edge).set_material_id(STONE).is_ok());
    assert_eq!(world.live_state(edge).material, STONE);
}

// ---------------------------------------------------------------------------
// State machine and promotion bookkeeping
// ---------------------------------------------------------------------------

#[test]
fn pending_state_follows_writes_and_promotion() {
    let world = world();
    let block = world.block(BlockPos::new(9, 9, 9));
    assert!(!block.is_pending());

    block.set_material_id(STONE).unwrap();
    assert!(block.is_pending());

    world.promote();
    assert!(!block.is_pending());

    // Writing the value the snapshot already holds is not a pending change.
    block.set_material_id(STONE).unwrap();
    assert!(!block.is_pending());
}

#[test]
fn promotion_reports_dirty_sections_and_changed_cells() {
    let world = world();
    assert_eq!(world.tick(), 0);

    world.block(BlockPos::new(0, 0, 0)).set_material_id(STONE).unwrap();
    world.block(BlockPos::new(1, 0, 0)).set_material_id(STONE).unwrap();
    world.block(BlockPos::new(0, 40, 0)).set_material_id(DIRT).unwrap();
    world.block(BlockPos::new(100, 0, 0)).set_block_light(4).unwrap();
    assert_eq!(world.dirty_count(), 3);

    let promotion = world.promote();
    assert_eq!(promotion.tick, 1);
    assert_eq!(promotion.sections, 3);
    assert_eq!(promotion.cells_changed, 4);
    assert_eq!(world.dirty_count(), 0);

    let idle = world.promote();
    assert_eq!(idle.tick, 2);
    assert_eq!(idle.sections, 0);
    assert_eq!(world.tick(), 2);
}

// ---------------------------------------------------------------------------
// Region management
// ---------------------------------------------------------------------------

#[test]
fn inserted_chunk_is_visible_in_both_tiers() {
    let world = world();
    let mut chunk = world.new_chunk();
    assert_eq!(chunk.section_count(), 0, "sections are allocated lazily");
    chunk.set_block(LocalBlockPos { x: 0, y: 200, z: 0 }, BlockState::EMPTY);
    assert_eq!(chunk.section_count(), 0, "writing air does not allocate");
    for x in 0..SECTION_SIZE as u8 {
        for z in 0..SECTION_SIZE as u8 {
            chunk.set_block(LocalBlockPos { x, y: 0, z }, BlockState::of(STONE));
        }
    }
    assert_eq!(chunk.allocated_sections().collect::<Vec<_>>(), [0]);
    world.insert_chunk(ChunkPos::new(2, -1), chunk);

    let pos = ChunkPos::new(2, -1).block_origin(0);
    assert_eq!(world.snapshot_state(pos).material, STONE);
    assert_eq!(world.live_state(pos).material, STONE);
    assert!(!world.is_pending(pos));
}

#[test]
fn load_region_allocates_columns_once() {
    let world = world();
    assert_eq!(world.load_region(ChunkPos::new(-1, -1), ChunkPos::new(1, 1)), 9);
    assert_eq!(world.load_region(ChunkPos::new(0, 0), ChunkPos::new(2, 0)), 1);
    assert_eq!(world.chunk_count(), 10);
    assert!(world.has_chunk(ChunkPos::new(2, 0)));
}

#[test]
fn unloading_discards_pending_writes() {
    let world = world();
    let pos = BlockPos::new(20, 5, 20);
    world.block(pos).set_material_id(STONE).unwrap();
    assert!(world.unload_chunk(pos.chunk()).is_some());
    assert_eq!(world.dirty_count(), 0);

    let promotion = world.promote();
    assert_eq!(promotion.sections, 0);
    assert_eq!(world.block(pos).live_material_id(), MaterialId::AIR);
}

#[test]
fn handle_is_a_plain_address() {
    let world = world();
    let pos = BlockPos::new(-3, 12, 44);
    let block: Block<'_> = world.block(pos);
    let copy = block;
    assert_eq!(copy.coordinate(), Coordinate::new(WorldId(7), pos));
    assert_eq!(block.edge(), Block::EDGE);
    assert_eq!(Block::EDGE, 1.0);

    // Two handles to the same slot observe each other's writes.
    block.set_material_id(DIRT).unwrap();
    assert_eq!(world.block(pos).live_material_id(), DIRT);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_writers_all_land_after_promotion() {
    let world = world();
    let threads = 8;
    let per_thread = 256;

    std::thread::scope(|s| {
        for t in 0..threads {
            let world = &world;
            s.spawn(move || {
                for i in 0..per_thread {
                    let pos = BlockPos::new(t as i64 * 40, 0, i as i64);
                    world.block(pos).set_material_id(STONE).unwrap();
                    world.block(pos).set_block_light((i % 16) as u8).unwrap();
                }
            });
        }
    });

    let promotion = world.promote();
    assert_eq!(promotion.cells_changed, threads * per_thread);
    for t in 0..threads {
        for i in 0..per_thread {
            let block = world.block(BlockPos::new(t as i64 * 40, 0, i as i64));
            assert_eq!(block.material_id(), STONE);
            assert_eq!(block.block_light(), (i % 16) as u8);
        }
    }
}

#[test]
fn concurrent_field_writes_to_one_cell_do_not_clobber() {
    let world = world();
    let pos = BlockPos::new(0, 0, 0);

    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..1_000 {
                world.block(pos).set_block_light(11).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..1_000 {
                world.block(pos).set_sky_light(6).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..1_000 {
                world.block(pos).set_material_id(GLASS).unwrap();
            }
        });
    });

    assert_eq!(world.live_state(pos), BlockState::new(GLASS, 0, 11, 6));
}

#[test]
fn snapshot_reads_do_not_move_while_writers_run() {
    let world = world();
    let pos = BlockPos::new(3, 3, 3);
    world.block(pos).set_material_id(STONE).unwrap();
    world.promote();

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..2_000 {
                let id = if i % 2 == 0 { DIRT } else { GLASS };
                world.block(pos).set_material_id(id).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..2_000 {
                assert_eq!(world.block(pos).material_id(), STONE);
            }
        });
    });

    world.promote();
    assert_eq!(world.block(pos).material_id(), GLASS);
}

#[test]
fn promotion_waits_for_concurrent_writes() {
    let world = world();
    let writes = 4_000;

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..writes {
                world
                    .block(BlockPos::new(i % 64, 0, i / 64))
                    .set_material_id(STONE)
                    .unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..50 {
                world.promote();
            }
        });
    });

    // Whatever the interleaving, one more boundary publishes everything.
    world.promote();
    for i in 0..writes {
        assert_eq!(
            world.block(BlockPos::new(i % 64, 0, i / 64)).material_id(),
            STONE
        );
    }
}
