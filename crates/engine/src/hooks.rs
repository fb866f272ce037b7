//! Engine-side entry points for material hooks.
//!
//! Everything here contains failures at the hook boundary: a hook returning
//! an error, or panicking, is logged and its event skipped. Nothing a hook
//! does can propagate into the tick loop or into promotion.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::HookError;
use crate::material::Material;
use crate::world::World;
use crate::world::access::{Source, WorldAccess};
use crate::world::position::{BlockFace, BlockPos};
use crate::world::state::MaterialId;

/// How an update or destroy dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// The hook ran to completion.
    Completed,
    /// Nothing to do: no physics, nothing to remove, or the material did
    /// not resolve.
    Skipped,
    /// The hook failed; the event was dropped.
    Faulted,
}

/// How a placement attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    Placed,
    /// The hook declined. The world was not changed by the engine; callers
    /// must not assume the slot holds the new material.
    Rejected,
    Faulted,
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Run a hook, turning errors and panics into `None` after logging them.
pub(crate) fn contain<T, F>(hook: &'static str, name: &str, pos: BlockPos, f: F) -> Option<T>
where
    F: FnOnce() -> Result<T, HookError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            tracing::error!(hook, material = name, ?pos, %err, "material hook failed; event skipped");
            None
        }
        Err(payload) => {
            tracing::error!(
                hook,
                material = name,
                ?pos,
                panic = panic_message(payload.as_ref()),
                "material hook panicked; event skipped"
            );
            None
        }
    }
}

/// A neighbor of `pos` changed: run the live material's `on_update` if it has
/// physics.
pub fn dispatch_update(world: &World, pos: BlockPos) -> HookOutcome {
    let material = match world.resolve_live_material(pos) {
        Ok(material) => material,
        Err(err) => {
            tracing::warn!(?pos, %err, "update skipped");
            return HookOutcome::Skipped;
        }
    };
    if !material.has_physics() {
        return HookOutcome::Skipped;
    }
    match contain("on_update", material.name(), pos, || material.on_update(world, pos)) {
        Some(()) => HookOutcome::Completed,
        None => HookOutcome::Faulted,
    }
}

/// Run `material`'s `on_destroy` for a block already removed from `pos`.
pub fn dispatch_destroy(world: &World, pos: BlockPos, material: &Material) -> HookOutcome {
    match contain("on_destroy", material.name(), pos, || material.on_destroy(world, pos)) {
        Some(()) => HookOutcome::Completed,
        None => HookOutcome::Faulted,
    }
}

/// Remove the live block at `pos` (set it to air with physics), then run the
/// removed material's `on_destroy`.
pub fn destroy(world: &World, pos: BlockPos, source: &Source) -> HookOutcome {
    let material = match world.resolve_live_material(pos) {
        Ok(material) => material,
        Err(err) => {
            tracing::warn!(?pos, %err, "destroy skipped");
            return HookOutcome::Skipped;
        }
    };
    if material.id() == MaterialId::AIR {
        return HookOutcome::Skipped;
    }
    if !world.set_block_id_and_data(pos, MaterialId::AIR, 0, true, source) {
        return HookOutcome::Skipped;
    }
    dispatch_destroy(world, pos, &material)
}

/// Attempt to place `material` at `pos` through its `on_placement` hook.
pub fn place(
    world: &World,
    pos: BlockPos,
    material: &Material,
    data: u16,
    against: BlockFace,
    source: &Source,
) -> PlacementOutcome {
    let placed = contain("on_placement", material.name(), pos, || {
        material.on_placement(world, pos, data, against, source)
    });
    match placed {
        Some(true) => PlacementOutcome::Placed,
        Some(false) => {
            tracing::debug!(material = material.name(), ?pos, ?source, "placement rejected");
            PlacementOutcome::Rejected
        }
        None => PlacementOutcome::Faulted,
    }
}
