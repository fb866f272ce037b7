use super::Material;
use crate::error::HookError;
use crate::world::access::{Source, WorldAccess};
use crate::world::position::{BlockFace, BlockPos};

pub type HookResult = Result<(), HookError>;

/// Per-material reactions to world events. Every method has a default, so an
/// implementation overrides only what it cares about.
///
/// Hooks run on simulation worker threads and may be called concurrently for
/// different positions.
pub trait MaterialBehavior: Send + Sync {
    /// A face neighbor of `pos` changed. Only dispatched for materials with
    /// physics enabled.
    fn on_update(&self, _material: &Material, _world: &dyn WorldAccess, _pos: BlockPos) -> HookResult {
        Ok(())
    }

    /// The block at `pos` was removed.
    fn on_destroy(&self, _material: &Material, _world: &dyn WorldAccess, _pos: BlockPos) -> HookResult {
        Ok(())
    }

    /// Someone tries to place `material` at `pos` against face `against`.
    /// Returns whether the placement happened.
    ///
    /// The default hands straight to the world's generic id/data setter with
    /// physics enabled and passes its answer through unchanged.
    fn on_placement(
        &self,
        material: &Material,
        world: &dyn WorldAccess,
        pos: BlockPos,
        data: u16,
        _against: BlockFace,
        source: &Source,
    ) -> Result<bool, HookError> {
        Ok(world.set_block_id_and_data(pos, material.id(), data, true, source))
    }
}

/// Behavior with every hook left at its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBehavior;

impl MaterialBehavior for DefaultBehavior {}
