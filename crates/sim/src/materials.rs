//! The built-in material set and the behaviors the host attaches to it.
//!
//! Ids below 256 follow the classic block numbering; wool lives at the custom
//! id 300 with one subtype per color.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use cubestate_engine::material::behavior::HookResult;
use cubestate_engine::material::config::{MaterialDef, MaterialsConfig};
use cubestate_engine::material::{Material, MaterialBehavior, MaterialRegistry};
use cubestate_engine::world::access::{Source, WorldAccess};
use cubestate_engine::world::position::{BlockFace, BlockPos};
use cubestate_engine::world::state::MaterialId;
use cubestate_engine::{HookError, RegistryError};

pub const AIR: MaterialId = MaterialId::AIR;
pub const STONE: MaterialId = MaterialId(1);
pub const GRASS: MaterialId = MaterialId(2);
pub const DIRT: MaterialId = MaterialId(3);
pub const SAND: MaterialId = MaterialId(12);
pub const GLASS: MaterialId = MaterialId(20);
pub const GLOWSTONE: MaterialId = MaterialId(89);
pub const STICK: MaterialId = MaterialId(280);
pub const WOOL: MaterialId = MaterialId(300);

/// Wool subtypes, indexed by data value.
pub const WOOL_COLORS: [&str; 16] = [
    "white",
    "orange",
    "magenta",
    "light_blue",
    "yellow",
    "lime",
    "pink",
    "gray",
    "light_gray",
    "cyan",
    "purple",
    "blue",
    "brown",
    "green",
    "red",
    "black",
];

/// Falls one block per update into air directly below.
///
/// Both moves are delayed writes with physics, so the new position is queued
/// for another update and the sand keeps falling on later ticks until it
/// rests on something. A fall out of the world's vertical range is refused
/// by the store, which leaves the sand where it is. If the old slot cannot be
/// cleared after the move, the hook fails so the fault is logged and counted.
pub struct Gravity;

impl MaterialBehavior for Gravity {
    fn on_update(&self, material: &Material, world: &dyn WorldAccess, pos: BlockPos) -> HookResult {
        let below = pos.offset(BlockFace::Bottom);
        if world.live_state(below).material != AIR {
            return Ok(());
        }
        let source = Source::Engine;
        if !world.set_block_id_and_data(below, material.id(), material.data(), true, &source) {
            return Ok(());
        }
        if !world.set_block_id_and_data(pos, AIR, 0, true, &source) {
            return Err(HookError::failed(format!(
                "{} moved below {pos:?} but its old slot could not be cleared",
                material.name()
            )));
        }
        Ok(())
    }
}

/// Behavior for entries of a loaded material table: anything with physics
/// falls.
pub fn behavior_for(def: &MaterialDef) -> Option<Arc<dyn MaterialBehavior>> {
    def.physics.then(|| Arc::new(Gravity) as Arc<dyn MaterialBehavior>)
}

pub fn builtin() -> Result<MaterialRegistry, RegistryError> {
    let mut reg = MaterialRegistry::with_air();

    reg.register(Material::block("stone", STONE.0))?
        .set_hardness(1.5);
    reg.register(Material::block("grass", GRASS.0))?
        .set_hardness(0.6);
    reg.register(Material::block("dirt", DIRT.0))?
        .set_hardness(0.5);
    reg.register(Material::block("sand", SAND.0).with_physics(true).with_behavior(Gravity))?
        .set_hardness(0.5);
    reg.register(Material::block("glass", GLASS.0))?
        .set_hardness(0.3)
        .set_opacity(0);
    reg.register(Material::block("glowstone", GLOWSTONE.0))?
        .set_hardness(0.3)
        .set_light_level(15);
    for (data, color) in WOOL_COLORS.iter().enumerate() {
        reg.register(Material::block_subtype(format!("{color}_wool"), WOOL.0, data as u16))?
            .set_hardness(0.8);
    }
    reg.register(Material::item_subtype("stick", STICK.0, 0))?;

    tracing::debug!(materials = reg.len(), "built-in materials registered");
    Ok(reg)
}

/// Load a material table from `path`, or the built-in set when `None`.
///
/// Air is added if the table does not define id 0, since unwritten slots read
/// as air.
pub fn load(path: Option<&Path>) -> anyhow::Result<MaterialRegistry> {
    let Some(path) = path else {
        return builtin().context("registering built-in materials");
    };

    let s = fs::read_to_string(path)
        .with_context(|| format!("reading materials {}", path.display()))?;
    let cfg: MaterialsConfig =
        toml::from_str(&s).with_context(|| format!("parsing materials {}", path.display()))?;

    let mut reg = if cfg.material.iter().any(|def| def.id == AIR.0) {
        MaterialRegistry::new()
    } else {
        MaterialRegistry::with_air()
    };
    reg.extend_from_config(cfg, behavior_for)
        .with_context(|| format!("registering materials from {}", path.display()))?;

    tracing::info!(materials = reg.len(), path = %path.display(), "materials loaded");
    Ok(reg)
}
