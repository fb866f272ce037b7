/// Identity of a world. Block coordinates are only meaningful together with one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WorldId(pub u32);

/// Absolute block position in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl BlockPos {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// The chunk column this block belongs to. Truncates when the column
    /// index does not fit in `i32`; check [`has_chunk_coords`](Self::has_chunk_coords)
    /// first.
    pub const fn chunk(&self) -> ChunkPos {
        ChunkPos {
            x: (self.x >> 4) as i32,
            z: (self.z >> 4) as i32,
        }
    }

    /// Whether the column index of this position fits in a [`ChunkPos`].
    pub const fn has_chunk_coords(&self) -> bool {
        let (cx, cz) = (self.x >> 4, self.z >> 4);
        cx >= i32::MIN as i64 && cx <= i32::MAX as i64 && cz >= i32::MIN as i64 && cz <= i32::MAX as i64
    }

    /// Position within the chunk column (0..16 on x/z, unbounded y).
    pub const fn local(&self) -> LocalBlockPos {
        LocalBlockPos {
            x: (self.x & 0xF) as u8,
            y: self.y,
            z: (self.z & 0xF) as u8,
        }
    }

    /// The block one step away through `face`. Saturates at the `i64`
    /// extremes; such positions are never inside a world.
    pub const fn offset(&self, face: BlockFace) -> BlockPos {
        let (dx, dy, dz) = face.offset();
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.z.saturating_add(dz),
        )
    }

    /// Like [`offset`](Self::offset), but `None` when the step leaves the
    /// `i64` range.
    pub const fn checked_offset(&self, face: BlockFace) -> Option<BlockPos> {
        let (dx, dy, dz) = face.offset();
        match (
            self.x.checked_add(dx),
            self.y.checked_add(dy),
            self.z.checked_add(dz),
        ) {
            (Some(x), Some(y), Some(z)) => Some(Self::new(x, y, z)),
            _ => None,
        }
    }

    /// The six face neighbors, in `BlockFace::ALL` order.
    pub const fn neighbors(&self) -> [BlockPos; 6] {
        [
            self.offset(BlockFace::Bottom),
            self.offset(BlockFace::Top),
            self.offset(BlockFace::North),
            self.offset(BlockFace::South),
            self.offset(BlockFace::West),
            self.offset(BlockFace::East),
        ]
    }
}

/// A block slot address: world identity plus position. Plain value, no identity
/// beyond its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub world: WorldId,
    pub pos: BlockPos,
}

impl Coordinate {
    pub const fn new(world: WorldId, pos: BlockPos) -> Self {
        Self { world, pos }
    }
}

/// One of the six faces of a unit cube.
///
/// North is -Z, south is +Z, west is -X, east is +X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFace {
    Bottom,
    Top,
    North,
    South,
    West,
    East,
}

impl BlockFace {
    pub const ALL: [BlockFace; 6] = [
        BlockFace::Bottom,
        BlockFace::Top,
        BlockFace::North,
        BlockFace::South,
        BlockFace::West,
        BlockFace::East,
    ];

    pub const fn opposite(self) -> BlockFace {
        match self {
            BlockFace::Bottom => BlockFace::Top,
            BlockFace::Top => BlockFace::Bottom,
            BlockFace::North => BlockFace::South,
            BlockFace::South => BlockFace::North,
            BlockFace::West => BlockFace::East,
            BlockFace::East => BlockFace::West,
        }
    }

    /// Unit step `(dx, dy, dz)` out of this face.
    pub const fn offset(self) -> (i64, i64, i64) {
        match self {
            BlockFace::Bottom => (0, -1, 0),
            BlockFace::Top => (0, 1, 0),
            BlockFace::North => (0, 0, -1),
            BlockFace::South => (0, 0, 1),
            BlockFace::West => (-1, 0, 0),
            BlockFace::East => (1, 0, 0),
        }
    }
}

/// Chunk column position (each chunk is 16x16 blocks horizontally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub const fn block_origin(&self, y: i64) -> BlockPos {
        BlockPos::new((self.x as i64) << 4, y, (self.z as i64) << 4)
    }
}

/// Block position local to a chunk column (x, z in 0..16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalBlockPos {
    pub x: u8,
    pub y: i64,
    pub z: u8,
}

impl LocalBlockPos {
    pub const fn section_index(&self) -> i32 {
        (self.y >> 4) as i32
    }

    pub const fn section_local_y(&self) -> u8 {
        (self.y.rem_euclid(16)) as u8
    }
}
