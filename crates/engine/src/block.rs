//! Block handles and the three consistency tiers.
//!
//! A [`Block`] is a cheap, copyable address (world + position) with nothing
//! cached inside; every call goes to the world store. Which view a call sees
//! is fixed by the trait it comes from:
//!
//! - [`SnapshotRead`]: the state as of the last tick boundary. Stable for the
//!   whole tick no matter how many writes are issued meanwhile.
//! - [`LiveRead`]: the state including every write issued so far this tick.
//!   Synchronizes with concurrent writers, so prefer snapshot reads on hot
//!   paths.
//! - [`DelayedWrite`]: writes land in the live view at once and reach the
//!   snapshot at the next tick boundary. Each setter returns the *prior
//!   snapshot* value, not the value just written.

use std::sync::Arc;

use crate::error::StoreError;
use crate::material::Material;
use crate::world::World;
use crate::world::position::{BlockPos, Coordinate};
use crate::world::state::MaterialId;

/// A unit cube in a world.
#[derive(Clone, Copy)]
pub struct Block<'w> {
    world: &'w World,
    pos: BlockPos,
}

impl<'w> Block<'w> {
    /// Edge length of every block.
    pub const EDGE: f32 = 1.0;

    pub fn new(world: &'w World, pos: BlockPos) -> Self {
        Self { world, pos }
    }

    pub fn world(&self) -> &'w World {
        self.world
    }

    pub fn position(&self) -> BlockPos {
        self.pos
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.world.id(), self.pos)
    }

    pub fn edge(&self) -> f32 {
        Self::EDGE
    }

    /// Whether writes to this block are waiting for the next tick boundary.
    pub fn is_pending(&self) -> bool {
        self.world.is_pending(self.pos)
    }
}

impl std::fmt::Debug for Block<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("world", &self.world.id())
            .field("pos", &self.pos)
            .finish()
    }
}

/// Reads of the stable per-tick view.
pub trait SnapshotRead {
    /// Fails only if the stored id no longer resolves.
    fn material(&self) -> Result<Arc<Material>, StoreError>;
    fn material_id(&self) -> MaterialId;
    fn block_light(&self) -> u8;
    fn sky_light(&self) -> u8;
}

/// Reads of the live view. May be noticeably slower than [`SnapshotRead`].
pub trait LiveRead {
    fn live_material(&self) -> Result<Arc<Material>, StoreError>;
    fn live_material_id(&self) -> MaterialId;
    fn live_block_light(&self) -> u8;
    fn live_sky_light(&self) -> u8;
}

/// Writes that become visible to snapshot reads after the next tick
/// boundary. A failed write changes nothing in either view.
pub trait DelayedWrite {
    /// Set material id and data from `material`. Returns the prior snapshot
    /// material.
    fn set_material(&self, material: &Material) -> Result<Arc<Material>, StoreError>;

    /// Set the material id, keeping the auxiliary data. Ids above 255 must
    /// name a registered custom subtype for that data. Returns the prior
    /// snapshot id.
    fn set_material_id(&self, id: MaterialId) -> Result<MaterialId, StoreError>;

    /// Masked to 4 bits. Returns the prior snapshot block light.
    fn set_block_light(&self, level: u8) -> Result<u8, StoreError>;

    /// Masked to 4 bits. Returns the prior snapshot sky light.
    fn set_sky_light(&self, level: u8) -> Result<u8, StoreError>;
}

impl SnapshotRead for Block<'_> {
    fn material(&self) -> Result<Arc<Material>, StoreError> {
        self.world.resolve_snapshot_material(self.pos)
    }

    fn material_id(&self) -> MaterialId {
        self.world.snapshot_state(self.pos).material
    }

    fn block_light(&self) -> u8 {
        self.world.snapshot_state(self.pos).block_light()
    }

    fn sky_light(&self) -> u8 {
        self.world.snapshot_state(self.pos).sky_light()
    }
}

impl LiveRead for Block<'_> {
    fn live_material(&self) -> Result<Arc<Material>, StoreError> {
        self.world.resolve_live_material(self.pos)
    }

    fn live_material_id(&self) -> MaterialId {
        self.world.live_state(self.pos).material
    }

    fn live_block_light(&self) -> u8 {
        self.world.live_state(self.pos).block_light()
    }

    fn live_sky_light(&self) -> u8 {
        self.world.live_state(self.pos).sky_light()
    }
}

impl DelayedWrite for Block<'_> {
    fn set_material(&self, material: &Material) -> Result<Arc<Material>, StoreError> {
        self.world.swap_material(self.pos, material)
    }

    fn set_material_id(&self, id: MaterialId) -> Result<MaterialId, StoreError> {
        self.world
            .write_material_id(self.pos, id)
            .map(|prior| prior.material)
    }

    fn set_block_light(&self, level: u8) -> Result<u8, StoreError> {
        self.world
            .write_block_light(self.pos, level)
            .map(|prior| prior.block_light())
    }

    fn set_sky_light(&self, level: u8) -> Result<u8, StoreError> {
        self.world
            .write_sky_light(self.pos, level)
            .map(|prior| prior.sky_light())
    }
}
