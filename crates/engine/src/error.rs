use crate::world::position::BlockPos;
use crate::world::state::MaterialId;

/// Failures on the read/write path of the block-state store. All of them are
/// returned to the direct caller and leave both tiers untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("unknown material {id:?} (data {data})")]
    UnknownMaterial { id: MaterialId, data: u16 },

    #[error("material {name} ({id:?}) is item-only and cannot be placed")]
    NotPlaceable { id: MaterialId, name: String },

    #[error("position {pos:?} is outside the world's bounds")]
    OutOfBounds { pos: BlockPos },
}

/// Failures while populating a [`MaterialRegistry`](crate::material::MaterialRegistry).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("material {id:?} (data {data}) is already registered")]
    Duplicate { id: MaterialId, data: u16 },

    #[error("custom id {id:?} must be registered with subtypes")]
    CustomIdRequiresSubtype { id: MaterialId },

    #[error("id {id:?} mixes plain and subtyped registrations")]
    MixedSubtyping { id: MaterialId },

    #[error("material name {0:?} is already taken")]
    DuplicateName(String),

    #[error("invalid material table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("reading material table: {0}")]
    Io(#[from] std::io::Error),
}

/// Raised by a material hook. The engine contains these at the hook boundary:
/// they are logged and the event is skipped.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Failed(String),
}

impl HookError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}
