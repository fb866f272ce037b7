//! Tiered block-state engine.
//!
//! Per-block state (material id, auxiliary data, block light, sky light) is
//! kept twice: a snapshot that stays fixed for a whole tick and a live copy
//! that takes every write immediately. Readers pick the tier through the API
//! ([`SnapshotRead`] or [`LiveRead`]); all writes are [`DelayedWrite`]s that
//! reach the snapshot at the next tick boundary ([`World::promote`]).

pub mod block;
pub mod error;
pub mod hooks;
pub mod material;
pub mod tick;
pub mod world;

pub use block::{Block, DelayedWrite, LiveRead, SnapshotRead};
pub use error::{HookError, RegistryError, StoreError};
pub use material::{Material, MaterialBehavior, MaterialRegistry};
pub use world::World;
