pub mod access;
pub mod chunk;
pub mod position;
pub mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use access::{Source, WorldAccess};
use chunk::{Chunk, ChunkSection};
use dashmap::mapref::one::Ref;
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use position::{BlockFace, BlockPos, ChunkPos, WorldId};
use rayon::prelude::*;
use state::{BlockState, MaterialId};

use crate::block::Block;
use crate::error::StoreError;
use crate::material::{Material, MaterialRegistry};

/// Vertical extent of every chunk column in a world, in sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldConfig {
    pub min_section: i32,
    pub section_count: u32,
}

impl WorldConfig {
    /// Lowest valid y (inclusive).
    pub const fn min_y(&self) -> i64 {
        (self.min_section as i64) * 16
    }

    /// Highest valid y (exclusive).
    pub const fn max_y(&self) -> i64 {
        (self.min_section as i64 + self.section_count as i64) * 16
    }
}

impl Default for WorldConfig {
    /// y in [-64, 320).
    fn default() -> Self {
        Self {
            min_section: -4,
            section_count: 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SectionKey {
    chunk: ChunkPos,
    section: i32,
}

/// Result of one tick-boundary promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Promotion {
    /// Tick number that just became the current snapshot.
    pub tick: u64,
    /// Sections that received writes and were copied.
    pub sections: usize,
    /// Cells whose snapshot value actually changed.
    pub cells_changed: usize,
}

/// The world state store: owns the snapshot and live arrays of every loaded
/// block slot. Thread-safe, lock-sharded by chunk column.
///
/// Three tiers of access:
///   - snapshot reads see the state as of the last [`promote`](Self::promote)
///     and are stable for the whole tick;
///   - live reads see every write issued so far;
///   - delayed writes land in the live array only and return the prior
///     snapshot value.
///
/// Delayed writes and snapshot reads share the promotion gate; `promote`
/// takes it exclusively, so it waits for in-flight writes and no snapshot
/// reader can straddle the copy. Live reads never touch the gate.
///
/// All operations take `&self`. Callers hold positions, never cells, so
/// unloading a column cannot leave anything dangling.
pub struct World {
    id: WorldId,
    config: WorldConfig,
    registry: Arc<MaterialRegistry>,
    chunks: DashMap<ChunkPos, Chunk>,
    /// Sections with live writes not yet promoted.
    dirty: DashSet<SectionKey>,
    /// Positions queued for `on_update` by physics-triggering writes.
    updates: DashSet<BlockPos>,
    gate: RwLock<()>,
    tick: AtomicU64,
}

impl World {
    pub fn new(id: WorldId, registry: Arc<MaterialRegistry>) -> Self {
        Self::with_config(id, registry, WorldConfig::default())
    }

    pub fn with_config(id: WorldId, registry: Arc<MaterialRegistry>, config: WorldConfig) -> Self {
        Self {
            id,
            config,
            registry,
            chunks: DashMap::new(),
            dirty: DashSet::new(),
            updates: DashSet::new(),
            gate: RwLock::new(()),
            tick: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn config(&self) -> WorldConfig {
        self.config
    }

    pub fn registry(&self) -> &Arc<MaterialRegistry> {
        &self.registry
    }

    /// A handle for the slot at `pos`.
    pub fn block(&self, pos: BlockPos) -> Block<'_> {
        Block::new(self, pos)
    }

    /// Number of promotions completed so far.
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Whether `pos` names a slot of this world: y inside the vertical range
    /// and a column index that fits in a [`ChunkPos`].
    pub fn in_bounds(&self, pos: BlockPos) -> bool {
        pos.y >= self.config.min_y() && pos.y < self.config.max_y() && pos.has_chunk_coords()
    }

    // ── Region management ──────────────────────────────────────────────

    /// An empty column sized for this world.
    pub fn new_chunk(&self) -> Chunk {
        Chunk::new(self.config.min_section, self.config.section_count)
    }

    /// Allocate every column in the inclusive rectangle `min..=max`.
    /// Returns how many columns were newly created.
    pub fn load_region(&self, min: ChunkPos, max: ChunkPos) -> usize {
        let mut created = 0;
        for x in min.x..=max.x {
            for z in min.z..=max.z {
                let pos = ChunkPos::new(x, z);
                if !self.chunks.contains_key(&pos) {
                    self.chunks.insert(pos, self.new_chunk());
                    created += 1;
                }
            }
        }
        tracing::debug!(world = self.id.0, created, "region loaded");
        created
    }

    /// Insert a prebuilt column (generation/loading). Its contents become both
    /// the snapshot and live state immediately. The column should come from
    /// [`new_chunk`](Self::new_chunk) so its vertical range matches.
    pub fn insert_chunk(&self, pos: ChunkPos, chunk: Chunk) {
        let _gate = self.gate.write();
        self.chunks.insert(pos, chunk);
        self.dirty.retain(|key| key.chunk != pos);
    }

    /// Drop a column. Unpromoted writes to it are discarded.
    pub fn unload_chunk(&self, pos: ChunkPos) -> Option<Chunk> {
        let _gate = self.gate.write();
        self.dirty.retain(|key| key.chunk != pos);
        self.chunks.remove(&pos).map(|(_, chunk)| chunk)
    }

    pub fn has_chunk(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of sections holding unpromoted writes.
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    // ── Snapshot tier ──────────────────────────────────────────────────

    /// Snapshot state at `pos`. Unloaded or out-of-range slots read as
    /// [`BlockState::EMPTY`].
    pub fn snapshot_state(&self, pos: BlockPos) -> BlockState {
        let _gate = self.gate.read();
        self.snapshot_unlocked(pos)
    }

    fn snapshot_unlocked(&self, pos: BlockPos) -> BlockState {
        if !self.in_bounds(pos) {
            return BlockState::EMPTY;
        }
        match self.chunks.get(&pos.chunk()) {
            Some(chunk) => chunk.snapshot_state(pos.local()),
            None => BlockState::EMPTY,
        }
    }

    pub fn resolve_snapshot_material(&self, pos: BlockPos) -> Result<Arc<Material>, StoreError> {
        let state = self.snapshot_state(pos);
        self.registry.resolve(state.material, state.data)
    }

    // ── Live tier ──────────────────────────────────────────────────────

    /// Live state at `pos`, including every write issued so far this tick.
    /// Unloaded or out-of-range slots read as [`BlockState::EMPTY`].
    pub fn live_state(&self, pos: BlockPos) -> BlockState {
        if !self.in_bounds(pos) {
            return BlockState::EMPTY;
        }
        match self.chunks.get(&pos.chunk()) {
            Some(chunk) => chunk.live_state(pos.local()),
            None => BlockState::EMPTY,
        }
    }

    pub fn resolve_live_material(&self, pos: BlockPos) -> Result<Arc<Material>, StoreError> {
        let state = self.live_state(pos);
        self.registry.resolve(state.material, state.data)
    }

    /// Whether the slot has live writes that the next promotion will publish.
    pub fn is_pending(&self, pos: BlockPos) -> bool {
        let _gate = self.gate.read();
        self.snapshot_unlocked(pos) != self.live_state(pos)
    }

    // ── Delayed writes ─────────────────────────────────────────────────

    fn chunk_for_write(&self, pos: ChunkPos) -> Ref<'_, ChunkPos, Chunk> {
        if let Some(chunk) = self.chunks.get(&pos) {
            return chunk;
        }
        self.chunks
            .entry(pos)
            .or_insert_with(|| self.new_chunk())
            .downgrade()
    }

    /// Core of every delayed write. Under the shared gate: read the prior
    /// snapshot and hand it to `prior`, then CAS the live word through
    /// `update`. Either closure failing leaves both tiers untouched.
    fn write_with<T, P, F>(&self, pos: BlockPos, prior: P, update: F) -> Result<T, StoreError>
    where
        P: FnOnce(BlockState) -> Result<T, StoreError>,
        F: FnMut(BlockState) -> Result<BlockState, StoreError>,
    {
        if !self.in_bounds(pos) {
            return Err(StoreError::OutOfBounds { pos });
        }
        let _gate = self.gate.read();
        let chunk = self.chunk_for_write(pos.chunk());
        let local = pos.local();
        let section_idx = local.section_index();
        let section = chunk
            .section_or_alloc(section_idx)
            .ok_or(StoreError::OutOfBounds { pos })?;
        let y = local.section_local_y();

        let out = prior(section.snapshot(local.x, y, local.z))?;
        section.update_live(local.x, y, local.z, update)?;
        self.dirty.insert(SectionKey {
            chunk: pos.chunk(),
            section: section_idx,
        });
        Ok(out)
    }

    fn placeable(material: Arc<Material>) -> Result<Arc<Material>, StoreError> {
        if material.is_placeable() {
            Ok(material)
        } else {
            Err(StoreError::NotPlaceable {
                id: material.id(),
                name: material.name().to_string(),
            })
        }
    }

    /// Set material id and data together. Returns the prior snapshot state.
    pub fn write_material(
        &self,
        pos: BlockPos,
        id: MaterialId,
        data: u16,
    ) -> Result<BlockState, StoreError> {
        Self::placeable(self.registry.resolve(id, data)?)?;
        self.write_with(pos, Ok, |cur| Ok(cur.with_material(id, data)))
    }

    /// Set the material id, keeping the slot's live data. The pair must
    /// resolve, so a custom id only succeeds if the current data names one
    /// of its subtypes.
    pub fn write_material_id(&self, pos: BlockPos, id: MaterialId) -> Result<BlockState, StoreError> {
        let registry = &self.registry;
        self.write_with(pos, Ok, |cur| {
            Self::placeable(registry.resolve(id, cur.data)?)?;
            Ok(cur.with_material_id(id))
        })
    }

    /// Replace the slot's material with `material`, returning the prior
    /// snapshot material. Both must resolve or nothing is written.
    pub fn swap_material(
        &self,
        pos: BlockPos,
        material: &Material,
    ) -> Result<Arc<Material>, StoreError> {
        let (id, data) = (material.id(), material.data());
        Self::placeable(self.registry.resolve(id, data)?)?;
        let registry = &self.registry;
        self.write_with(
            pos,
            |prior| registry.resolve(prior.material, prior.data),
            |cur| Ok(cur.with_material(id, data)),
        )
    }

    /// Set block light (masked to 4 bits). Returns the prior snapshot state.
    pub fn write_block_light(&self, pos: BlockPos, level: u8) -> Result<BlockState, StoreError> {
        self.write_with(pos, Ok, |cur| Ok(cur.with_block_light(level)))
    }

    /// Set sky light (masked to 4 bits). Returns the prior snapshot state.
    pub fn write_sky_light(&self, pos: BlockPos, level: u8) -> Result<BlockState, StoreError> {
        self.write_with(pos, Ok, |cur| Ok(cur.with_sky_light(level)))
    }

    // ── Tick boundary ──────────────────────────────────────────────────

    /// Publish the live state of every written section as the new snapshot.
    ///
    /// Blocks until all in-flight delayed writes have finished, then copies
    /// dirty sections in parallel. Snapshot readers either see entirely the
    /// old state or entirely the new one.
    pub fn promote(&self) -> Promotion {
        let _gate = self.gate.write();
        let keys: Vec<SectionKey> = self.dirty.iter().map(|key| *key).collect();
        self.dirty.clear();

        let cells_changed = keys
            .par_iter()
            .map(|key| {
                self.chunks
                    .get(&key.chunk)
                    .and_then(|chunk| chunk.section(key.section).map(ChunkSection::promote))
                    .unwrap_or(0)
            })
            .sum();

        let tick = self.tick.fetch_add(1, Ordering::AcqRel) + 1;
        let promotion = Promotion {
            tick,
            sections: keys.len(),
            cells_changed,
        };
        tracing::debug!(
            world = self.id.0,
            tick,
            sections = promotion.sections,
            cells = promotion.cells_changed,
            "snapshot promoted"
        );
        promotion
    }

    // ── Physics update queue ───────────────────────────────────────────

    pub fn schedule_update(&self, pos: BlockPos) {
        self.updates.insert(pos);
    }

    /// Queue `on_update` for the face neighbors of `pos`. Neighbors past
    /// the edge of the coordinate space are skipped.
    pub fn schedule_neighbor_updates(&self, pos: BlockPos) {
        for face in BlockFace::ALL {
            if let Some(neighbor) = pos.checked_offset(face) {
                self.updates.insert(neighbor);
            }
        }
    }

    /// Drain and return every queued update position (deduplicated).
    pub fn take_pending_updates(&self) -> Vec<BlockPos> {
        // Collect then remove; a position queued between the two steps stays
        // queued for the next drain.
        let pending: Vec<BlockPos> = self.updates.iter().map(|pos| *pos).collect();
        for pos in &pending {
            self.updates.remove(pos);
        }
        pending
    }

    pub fn pending_update_count(&self) -> usize {
        self.updates.len()
    }
}

impl WorldAccess for World {
    fn id(&self) -> WorldId {
        self.id
    }

    fn snapshot_state(&self, pos: BlockPos) -> BlockState {
        World::snapshot_state(self, pos)
    }

    fn live_state(&self, pos: BlockPos) -> BlockState {
        World::live_state(self, pos)
    }

    fn set_block_id_and_data(
        &self,
        pos: BlockPos,
        id: MaterialId,
        data: u16,
        trigger_physics: bool,
        source: &Source,
    ) -> bool {
        match self.write_material(pos, id, data) {
            Ok(_) => {
                if trigger_physics {
                    self.schedule_neighbor_updates(pos);
                }
                tracing::trace!(?pos, ?id, data, ?source, "block set");
                true
            }
            Err(err) => {
                tracing::debug!(?pos, ?source, %err, "block write rejected");
                false
            }
        }
    }
}
