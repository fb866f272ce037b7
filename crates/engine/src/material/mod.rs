//! Material descriptors: the shared, per-type properties and behavior hooks
//! that a block slot's `(id, data)` pair resolves to.
//!
//! A [`Material`] is created once while the [`MaterialRegistry`] is populated
//! and lives as long as the registry. Its tunable properties (friction,
//! hardness, opacity, light level) are stored in atomics so they can be
//! adjusted in place through any shared handle and are seen by every holder.

pub mod behavior;
pub mod config;
pub mod registry;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering::Relaxed};

pub use behavior::{DefaultBehavior, HookResult, MaterialBehavior};
pub use registry::MaterialRegistry;

use crate::error::HookError;
use crate::world::access::{Source, WorldAccess};
use crate::world::position::{BlockFace, BlockPos};
use crate::world::state::{MaterialId, NIBBLE_MASK};

/// Opacity of a block that lets no light through.
pub const FULLY_OPAQUE: u8 = 0xF;

/// Axis-aligned collision volume in block-local units. Stored and handed out
/// as-is; the engine does no geometry with it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    pub const UNIT: BoundingBox = BoundingBox {
        min: [0.0, 0.0, 0.0],
        max: [1.0, 1.0, 1.0],
    };

    pub const fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::UNIT
    }
}

/// An `f32` that can be replaced through a shared reference.
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(v: f32) -> Self {
        Self(AtomicU32::new(v.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Relaxed))
    }

    fn store(&self, v: f32) {
        self.0.store(v.to_bits(), Relaxed);
    }
}

/// Physical properties carried only by placeable materials.
pub struct BlockProperties {
    friction: AtomicF32,
    hardness: AtomicF32,
    opacity: AtomicU8,
    light_level: AtomicU8,
    bounding_box: BoundingBox,
    physics: bool,
    liquid: bool,
}

impl BlockProperties {
    /// Fully opaque, no light, no friction or hardness, unit bounding box,
    /// solid.
    pub fn new() -> Self {
        Self {
            friction: AtomicF32::new(0.0),
            hardness: AtomicF32::new(0.0),
            opacity: AtomicU8::new(FULLY_OPAQUE),
            light_level: AtomicU8::new(0),
            bounding_box: BoundingBox::UNIT,
            physics: false,
            liquid: false,
        }
    }

    pub fn friction(&self) -> f32 {
        self.friction.load()
    }

    pub fn set_friction(&self, friction: f32) -> &Self {
        self.friction.store(friction);
        self
    }

    pub fn hardness(&self) -> f32 {
        self.hardness.load()
    }

    pub fn set_hardness(&self, hardness: f32) -> &Self {
        self.hardness.store(hardness);
        self
    }

    /// Light blocked by this block; `0xF` is fully opaque.
    pub fn opacity(&self) -> u8 {
        self.opacity.load(Relaxed)
    }

    /// Values above 15 keep only their low four bits.
    pub fn set_opacity(&self, level: u8) -> &Self {
        self.opacity.store(level & NIBBLE_MASK, Relaxed);
        self
    }

    pub fn is_opaque(&self) -> bool {
        self.opacity() == FULLY_OPAQUE
    }

    /// Light emitted by this block.
    pub fn light_level(&self) -> u8 {
        self.light_level.load(Relaxed)
    }

    /// Values above 15 keep only their low four bits.
    pub fn set_light_level(&self, level: u8) -> &Self {
        self.light_level.store(level & NIBBLE_MASK, Relaxed);
        self
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Whether a neighbor change should trigger `on_update` here.
    pub fn has_physics(&self) -> bool {
        self.physics
    }

    pub fn is_liquid(&self) -> bool {
        self.liquid
    }
}

impl Default for BlockProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BlockProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockProperties")
            .field("friction", &self.friction())
            .field("hardness", &self.hardness())
            .field("opacity", &self.opacity())
            .field("light_level", &self.light_level())
            .field("bounding_box", &self.bounding_box)
            .field("physics", &self.physics)
            .field("liquid", &self.liquid)
            .finish()
    }
}

/// What a material can do.
#[derive(Debug)]
pub enum MaterialKind {
    /// Can occupy a block slot.
    Block(BlockProperties),
    /// Exists only as an item: no placement, no bounding volume.
    Item,
}

/// A shared material descriptor.
pub struct Material {
    id: MaterialId,
    data: u16,
    name: String,
    subtyped: bool,
    kind: MaterialKind,
    behavior: Arc<dyn MaterialBehavior>,
}

impl Material {
    fn with_kind(name: impl Into<String>, id: MaterialId, data: u16, subtyped: bool, kind: MaterialKind) -> Self {
        Self {
            id,
            data,
            name: name.into(),
            subtyped,
            kind,
            behavior: Arc::new(DefaultBehavior),
        }
    }

    /// A placeable material that resolves for any auxiliary data.
    pub fn block(name: impl Into<String>, id: u16) -> Self {
        Self::with_kind(name, MaterialId(id), 0, false, MaterialKind::Block(BlockProperties::new()))
    }

    /// A placeable material that only resolves for exactly `(id, data)`.
    pub fn block_subtype(name: impl Into<String>, id: u16, data: u16) -> Self {
        Self::with_kind(name, MaterialId(id), data, true, MaterialKind::Block(BlockProperties::new()))
    }

    /// An item-only material.
    pub fn item(name: impl Into<String>, id: u16) -> Self {
        Self::with_kind(name, MaterialId(id), 0, false, MaterialKind::Item)
    }

    /// An item-only material keyed by `(id, data)`.
    pub fn item_subtype(name: impl Into<String>, id: u16, data: u16) -> Self {
        Self::with_kind(name, MaterialId(id), data, true, MaterialKind::Item)
    }

    pub fn with_behavior(mut self, behavior: impl MaterialBehavior + 'static) -> Self {
        self.behavior = Arc::new(behavior);
        self
    }

    pub fn with_shared_behavior(mut self, behavior: Arc<dyn MaterialBehavior>) -> Self {
        self.behavior = behavior;
        self
    }

    /// No effect on item-only materials.
    pub fn with_physics(mut self, physics: bool) -> Self {
        if let MaterialKind::Block(props) = &mut self.kind {
            props.physics = physics;
        }
        self
    }

    /// No effect on item-only materials.
    pub fn with_liquid(mut self, liquid: bool) -> Self {
        if let MaterialKind::Block(props) = &mut self.kind {
            props.liquid = liquid;
        }
        self
    }

    /// No effect on item-only materials.
    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        if let MaterialKind::Block(props) = &mut self.kind {
            props.bounding_box = bounding_box;
        }
        self
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }

    /// Subtype data; 0 for plain materials.
    pub fn data(&self) -> u16 {
        self.data
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_subtyped(&self) -> bool {
        self.subtyped
    }

    pub fn kind(&self) -> &MaterialKind {
        &self.kind
    }

    pub fn is_placeable(&self) -> bool {
        matches!(self.kind, MaterialKind::Block(_))
    }

    pub fn block_properties(&self) -> Option<&BlockProperties> {
        match &self.kind {
            MaterialKind::Block(props) => Some(props),
            MaterialKind::Item => None,
        }
    }

    // ── Property surface shared by both kinds ──────────────────────────
    //
    // Item-only materials report neutral values and ignore setters.

    pub fn friction(&self) -> f32 {
        self.block_properties().map_or(0.0, BlockProperties::friction)
    }

    pub fn set_friction(&self, friction: f32) -> &Self {
        if let Some(props) = self.block_properties() {
            props.set_friction(friction);
        }
        self
    }

    pub fn hardness(&self) -> f32 {
        self.block_properties().map_or(0.0, BlockProperties::hardness)
    }

    pub fn set_hardness(&self, hardness: f32) -> &Self {
        if let Some(props) = self.block_properties() {
            props.set_hardness(hardness);
        }
        self
    }

    pub fn opacity(&self) -> u8 {
        self.block_properties().map_or(0, BlockProperties::opacity)
    }

    pub fn set_opacity(&self, level: u8) -> &Self {
        if let Some(props) = self.block_properties() {
            props.set_opacity(level);
        }
        self
    }

    pub fn is_opaque(&self) -> bool {
        self.opacity() == FULLY_OPAQUE
    }

    pub fn light_level(&self) -> u8 {
        self.block_properties().map_or(0, BlockProperties::light_level)
    }

    pub fn set_light_level(&self, level: u8) -> &Self {
        if let Some(props) = self.block_properties() {
            props.set_light_level(level);
        }
        self
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.block_properties().map(BlockProperties::bounding_box)
    }

    pub fn has_physics(&self) -> bool {
        self.block_properties().is_some_and(BlockProperties::has_physics)
    }

    pub fn is_liquid(&self) -> bool {
        self.block_properties().is_some_and(BlockProperties::is_liquid)
    }

    // ── Hooks ──────────────────────────────────────────────────────────
    //
    // Called by the surrounding engine (see `crate::hooks`), never by block
    // handles. Item-only materials ignore all of them.

    pub fn on_update(&self, world: &dyn WorldAccess, pos: BlockPos) -> HookResult {
        match self.kind {
            MaterialKind::Block(_) => self.behavior.on_update(self, world, pos),
            MaterialKind::Item => Ok(()),
        }
    }

    pub fn on_destroy(&self, world: &dyn WorldAccess, pos: BlockPos) -> HookResult {
        match self.kind {
            MaterialKind::Block(_) => self.behavior.on_destroy(self, world, pos),
            MaterialKind::Item => Ok(()),
        }
    }

    /// Returns whether the placement was accepted.
    pub fn on_placement(
        &self,
        world: &dyn WorldAccess,
        pos: BlockPos,
        data: u16,
        against: BlockFace,
        source: &Source,
    ) -> Result<bool, HookError> {
        match self.kind {
            MaterialKind::Block(_) => self
                .behavior
                .on_placement(self, world, pos, data, against, source),
            MaterialKind::Item => Ok(false),
        }
    }
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Material")
            .field("id", &self.id)
            .field("data", &self.data)
            .field("name", &self.name)
            .field("subtyped", &self.subtyped)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
