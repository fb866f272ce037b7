use super::position::LocalBlockPos;
use super::state::BlockState;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of blocks along each axis of a chunk section.
pub const SECTION_SIZE: usize = 16;
/// Total block count in one section.
const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

fn cells(word: u64) -> Box<[AtomicU64]> {
    (0..SECTION_VOLUME).map(|_| AtomicU64::new(word)).collect()
}

/// A 16x16x16 cube of block slots, each holding a snapshot and a live word.
///
/// Stored as flat arrays in XZY order for cache-friendly vertical scans.
/// Every cell is a single atomic word, so a live read never sees a torn
/// state. The snapshot array is only written by [`ChunkSection::promote`],
/// which the world runs under its exclusive promotion gate; snapshot loads
/// can therefore be relaxed.
pub struct ChunkSection {
    snapshot: Box<[AtomicU64]>,
    live: Box<[AtomicU64]>,
}

impl ChunkSection {
    pub fn new_filled(state: BlockState) -> Self {
        let word = state.pack();
        Self {
            snapshot: cells(word),
            live: cells(word),
        }
    }

    pub fn new_empty() -> Self {
        Self::new_filled(BlockState::EMPTY)
    }

    #[inline]
    const fn index(x: u8, y: u8, z: u8) -> usize {
        (y as usize) * SECTION_SIZE * SECTION_SIZE + (z as usize) * SECTION_SIZE + (x as usize)
    }

    #[inline]
    pub fn snapshot(&self, x: u8, y: u8, z: u8) -> BlockState {
        BlockState::unpack(self.snapshot[Self::index(x, y, z)].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn live(&self, x: u8, y: u8, z: u8) -> BlockState {
        BlockState::unpack(self.live[Self::index(x, y, z)].load(Ordering::Acquire))
    }

    /// Apply `f` to the live word with a CAS loop. An error from `f` aborts
    /// without writing. Yields the live state the update replaced.
    ///
    /// `f` may run more than once under contention.
    pub(crate) fn update_live<E, F>(&self, x: u8, y: u8, z: u8, mut f: F) -> Result<BlockState, E>
    where
        F: FnMut(BlockState) -> Result<BlockState, E>,
    {
        let cell = &self.live[Self::index(x, y, z)];
        let mut current = cell.load(Ordering::Acquire);
        loop {
            let next = f(BlockState::unpack(current))?.pack();
            match cell.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(prev) => return Ok(BlockState::unpack(prev)),
                Err(actual) => current = actual,
            }
        }
    }

    /// Write both tiers at once. Only for generation/loading, before the
    /// section is visible to the simulation.
    pub(crate) fn store_both(&self, x: u8, y: u8, z: u8, state: BlockState) {
        let i = Self::index(x, y, z);
        let word = state.pack();
        self.snapshot[i].store(word, Ordering::Relaxed);
        self.live[i].store(word, Ordering::Relaxed);
    }

    /// Copy the live array into the snapshot array. Returns how many cells
    /// actually changed.
    pub(crate) fn promote(&self) -> usize {
        let mut changed = 0;
        for (snap, live) in self.snapshot.iter().zip(self.live.iter()) {
            let word = live.load(Ordering::Acquire);
            if snap.swap(word, Ordering::Relaxed) != word {
                changed += 1;
            }
        }
        changed
    }
}

/// A column of chunk sections covering a fixed vertical range.
///
/// Sections are allocated on first write; an unallocated section reads as
/// [`BlockState::EMPTY`] in both tiers.
pub struct Chunk {
    min_section: i32,
    sections: Box<[OnceLock<ChunkSection>]>,
}

impl Chunk {
    /// A column spanning `section_count` sections upward from `min_section`.
    pub fn new(min_section: i32, section_count: u32) -> Self {
        Self {
            min_section,
            sections: (0..section_count).map(|_| OnceLock::new()).collect(),
        }
    }

    fn slot(&self, section_idx: i32) -> Option<&OnceLock<ChunkSection>> {
        let rel = section_idx.checked_sub(self.min_section)?;
        usize::try_from(rel).ok().and_then(|i| self.sections.get(i))
    }

    /// Whether `pos` falls inside this column's vertical range.
    pub fn contains(&self, pos: LocalBlockPos) -> bool {
        self.slot(pos.section_index()).is_some()
    }

    pub(crate) fn section(&self, section_idx: i32) -> Option<&ChunkSection> {
        self.slot(section_idx).and_then(OnceLock::get)
    }

    /// The section holding `pos`, allocating it if needed. `None` when `pos`
    /// lies outside the column.
    pub(crate) fn section_or_alloc(&self, section_idx: i32) -> Option<&ChunkSection> {
        self.slot(section_idx)
            .map(|slot| slot.get_or_init(ChunkSection::new_empty))
    }

    pub fn snapshot_state(&self, pos: LocalBlockPos) -> BlockState {
        match self.section(pos.section_index()) {
            Some(section) => section.snapshot(pos.x, pos.section_local_y(), pos.z),
            None => BlockState::EMPTY,
        }
    }

    pub fn live_state(&self, pos: LocalBlockPos) -> BlockState {
        match self.section(pos.section_index()) {
            Some(section) => section.live(pos.x, pos.section_local_y(), pos.z),
            None => BlockState::EMPTY,
        }
    }

    /// Set both tiers of a slot directly, for building a column before it is
    /// inserted into a world. Positions outside the column are ignored.
    pub fn set_block(&mut self, pos: LocalBlockPos, state: BlockState) {
        if state == BlockState::EMPTY && self.section(pos.section_index()).is_none() {
            return;
        }
        if let Some(section) = self.section_or_alloc(pos.section_index()) {
            section.store_both(pos.x, pos.section_local_y(), pos.z, state);
        }
    }

    /// Section indices that are currently allocated.
    pub fn allocated_sections(&self) -> impl Iterator<Item = i32> + '_ {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(i, _)| self.min_section + i as i32)
    }

    pub fn section_count(&self) -> usize {
        self.allocated_sections().count()
    }
}
