/// Numeric material identifier stored in every cell.
///
/// Ids up to [`MaterialId::MAX_PLAIN`] may name a plain material. Anything
/// above is a custom id and only resolves through a registered subtype, keyed
/// by the cell's auxiliary data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct MaterialId(pub u16);

impl MaterialId {
    /// The universal "empty" material.
    pub const AIR: MaterialId = MaterialId(0);

    /// Highest id that can be registered without subtypes.
    pub const MAX_PLAIN: u16 = 255;

    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn is_custom(self) -> bool {
        self.0 > Self::MAX_PLAIN
    }
}

/// Light values and opacity are 4-bit quantities.
pub const NIBBLE_MASK: u8 = 0xF;

const DATA_SHIFT: u32 = 16;
const BLOCK_LIGHT_SHIFT: u32 = 32;
const SKY_LIGHT_SHIFT: u32 = 36;

/// The full state of one block slot.
///
/// Light fields are private so that every construction path masks them to
/// four bits; values above 15 are clamped by dropping the high bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockState {
    pub material: MaterialId,
    pub data: u16,
    block_light: u8,
    sky_light: u8,
}

impl BlockState {
    /// Air, no data, no light. Every cell starts here.
    pub const EMPTY: BlockState = BlockState {
        material: MaterialId::AIR,
        data: 0,
        block_light: 0,
        sky_light: 0,
    };

    pub const fn new(material: MaterialId, data: u16, block_light: u8, sky_light: u8) -> Self {
        Self {
            material,
            data,
            block_light: block_light & NIBBLE_MASK,
            sky_light: sky_light & NIBBLE_MASK,
        }
    }

    pub const fn of(material: MaterialId) -> Self {
        Self::new(material, 0, 0, 0)
    }

    pub const fn block_light(&self) -> u8 {
        self.block_light
    }

    pub const fn sky_light(&self) -> u8 {
        self.sky_light
    }

    pub const fn with_material(self, material: MaterialId, data: u16) -> Self {
        Self {
            material,
            data,
            ..self
        }
    }

    pub const fn with_material_id(self, material: MaterialId) -> Self {
        Self { material, ..self }
    }

    pub const fn with_block_light(self, level: u8) -> Self {
        Self {
            block_light: level & NIBBLE_MASK,
            ..self
        }
    }

    pub const fn with_sky_light(self, level: u8) -> Self {
        Self {
            sky_light: level & NIBBLE_MASK,
            ..self
        }
    }

    /// Pack into the single word a cell is stored as:
    /// `id:16 | data:16 | block_light:4 | sky_light:4`.
    pub const fn pack(self) -> u64 {
        (self.material.0 as u64)
            | ((self.data as u64) << DATA_SHIFT)
            | ((self.block_light as u64) << BLOCK_LIGHT_SHIFT)
            | ((self.sky_light as u64) << SKY_LIGHT_SHIFT)
    }

    pub const fn unpack(word: u64) -> Self {
        Self {
            material: MaterialId(word as u16),
            data: (word >> DATA_SHIFT) as u16,
            block_light: ((word >> BLOCK_LIGHT_SHIFT) as u8) & NIBBLE_MASK,
            sky_light: ((word >> SKY_LIGHT_SHIFT) as u8) & NIBBLE_MASK,
        }
    }
}
