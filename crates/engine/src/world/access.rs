use super::position::{BlockPos, WorldId};
use super::state::{BlockState, MaterialId};

/// Who is responsible for a world mutation. Carried for attribution and
/// logging only; nothing in the engine authorizes on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// The engine itself (generation, physics cascades).
    Engine,
    /// A specific player connection.
    Player(u64),
    /// A named simulation layer.
    Simulation(&'static str),
}

/// The narrow world surface that material hooks are handed.
///
/// [`World`](super::World) is the real implementation; tests substitute stubs.
pub trait WorldAccess: Send + Sync {
    fn id(&self) -> WorldId;

    /// Stable state for the current tick.
    fn snapshot_state(&self, pos: BlockPos) -> BlockState;

    /// State including every write issued so far this tick. Higher cost than
    /// [`snapshot_state`](Self::snapshot_state).
    fn live_state(&self, pos: BlockPos) -> BlockState;

    /// Delayed write of material id and data. When `trigger_physics` is set the
    /// six neighbors are queued for `on_update`. Returns whether the write was
    /// accepted.
    fn set_block_id_and_data(
        &self,
        pos: BlockPos,
        id: MaterialId,
        data: u16,
        trigger_physics: bool,
        source: &Source,
    ) -> bool;
}
