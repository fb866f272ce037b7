use std::collections::HashMap;
use std::sync::Arc;

use cubestate_engine::material::{Material, MaterialRegistry};
use cubestate_engine::world::World;
use cubestate_engine::world::position::{BlockFace, BlockPos, WorldId};
use cubestate_engine::world::state::{BlockState, MaterialId};
use cubestate_engine::{DelayedWrite, SnapshotRead};
use proptest::prelude::*;

fn coord() -> impl Strategy<Value = i64> {
    -40i64..=40
}

fn small_pos() -> impl Strategy<Value = BlockPos> {
    (-20i64..20, -8i64..8, -20i64..20).prop_map(|(x, y, z)| BlockPos::new(x, y, z))
}

#[derive(Debug, Clone)]
enum Write {
    Material(BlockPos, u16),
    BlockLight(BlockPos, u8),
    SkyLight(BlockPos, u8),
}

fn write() -> impl Strategy<Value = Write> {
    prop_oneof![
        (small_pos(), 0u16..4).prop_map(|(p, id)| Write::Material(p, id)),
        (small_pos(), any::<u8>()).prop_map(|(p, v)| Write::BlockLight(p, v)),
        (small_pos(), any::<u8>()).prop_map(|(p, v)| Write::SkyLight(p, v)),
    ]
}

fn world() -> World {
    let mut reg = MaterialRegistry::with_air();
    for (name, id) in [("stone", 1), ("grass", 2), ("dirt", 3)] {
        reg.register(Material::block(name, id)).unwrap();
    }
    World::new(WorldId(3), Arc::new(reg))
}

fn apply(world: &World, w: &Write, model: &mut HashMap<BlockPos, BlockState>) {
    let (pos, next) = match *w {
        Write::Material(pos, id) => {
            world.block(pos).set_material_id(MaterialId(id)).unwrap();
            (pos, model.get(&pos).copied().unwrap_or(BlockState::EMPTY).with_material_id(MaterialId(id)))
        }
        Write::BlockLight(pos, v) => {
            world.block(pos).set_block_light(v).unwrap();
            (pos, model.get(&pos).copied().unwrap_or(BlockState::EMPTY).with_block_light(v))
        }
        Write::SkyLight(pos, v) => {
            world.block(pos).set_sky_light(v).unwrap();
            (pos, model.get(&pos).copied().unwrap_or(BlockState::EMPTY).with_sky_light(v))
        }
    };
    model.insert(pos, next);
}

proptest! {
    // Every field is stored masked to its width, independently of the others
    #[test]
    fn state_fields_are_masked(id in any::<u16>(), data in any::<u16>(), bl in any::<u8>(), sl in any::<u8>()) {
        let s = BlockState::new(MaterialId(id), data, bl, sl);
        prop_assert_eq!(s.material, MaterialId(id));
        prop_assert_eq!(s.data, data);
        prop_assert_eq!(s.block_light(), bl & 0xF);
        prop_assert_eq!(s.sky_light(), sl & 0xF);
        prop_assert_eq!(BlockState::unpack(s.pack()), s);
    }

    // chunk() and local() decompose a position without loss
    #[test]
    fn chunk_and_local_recompose(x in coord(), y in coord(), z in coord()) {
        let pos = BlockPos::new(x, y, z);
        let origin = pos.chunk().block_origin(pos.local().y);
        let local = pos.local();
        prop_assert!(local.x < 16 && local.z < 16);
        prop_assert_eq!(BlockPos::new(origin.x + local.x as i64, origin.y, origin.z + local.z as i64), pos);
    }

    // Stepping out a face and back through its opposite is the identity
    #[test]
    fn opposite_faces_cancel(x in coord(), y in coord(), z in coord()) {
        let pos = BlockPos::new(x, y, z);
        for face in BlockFace::ALL {
            prop_assert_eq!(pos.offset(face).offset(face.opposite()), pos);
            prop_assert_ne!(pos.offset(face), pos);
        }
    }

    // Snapshot reads never move inside a tick; after promotion they equal
    // last-write-wins over the tick's writes
    #[test]
    fn snapshot_is_frozen_until_promotion(first in prop::collection::vec(write(), 1..40),
                                          second in prop::collection::vec(write(), 1..40)) {
        let world = world();
        let mut model = HashMap::new();

        for w in &first {
            apply(&world, w, &mut model);
        }
        for pos in model.keys() {
            prop_assert_eq!(world.snapshot_state(*pos), BlockState::EMPTY);
        }
        world.promote();
        let after_first = model.clone();

        for w in &second {
            apply(&world, w, &mut model);
            for (pos, state) in &after_first {
                prop_assert_eq!(world.snapshot_state(*pos), *state);
            }
        }
        world.promote();
        for (pos, state) in &model {
            prop_assert_eq!(world.snapshot_state(*pos), *state);
            prop_assert_eq!(world.live_state(*pos), *state);
            prop_assert!(!world.block(*pos).is_pending());
        }
    }
}
