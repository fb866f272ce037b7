use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::config::{KindDef, MaterialDef, MaterialsConfig};
use super::{Material, MaterialBehavior};
use crate::error::{RegistryError, StoreError};
use crate::world::state::MaterialId;

#[derive(Debug)]
enum Slot {
    /// One material for every data value.
    Plain(Arc<Material>),
    /// One material per registered data value.
    Subtyped(HashMap<u16, Arc<Material>>),
}

/// Maps `(id, data)` to material descriptors.
///
/// Built once at engine startup, then shared as `Arc<MaterialRegistry>` by
/// the world and anything else that resolves ids. There is no global
/// instance.
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    by_id: HashMap<MaterialId, Slot>,
    by_name: HashMap<String, Arc<Material>>,
    /// Registration order.
    all: Vec<Arc<Material>>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding only air (id 0, transparent).
    pub fn with_air() -> Self {
        let mut reg = Self::new();
        let air = Material::block("air", MaterialId::AIR.0);
        air.set_opacity(0);
        let registered = reg.register(air).is_ok();
        debug_assert!(registered, "air registers into an empty registry");
        reg
    }

    pub fn register(&mut self, material: Material) -> Result<Arc<Material>, RegistryError> {
        let (id, data) = (material.id(), material.data());
        if id.is_custom() && !material.is_subtyped() {
            return Err(RegistryError::CustomIdRequiresSubtype { id });
        }
        if self.by_name.contains_key(material.name()) {
            return Err(RegistryError::DuplicateName(material.name().to_string()));
        }

        let material = Arc::new(material);
        match self.by_id.get_mut(&id) {
            None => {
                let slot = if material.is_subtyped() {
                    Slot::Subtyped(HashMap::from([(data, Arc::clone(&material))]))
                } else {
                    Slot::Plain(Arc::clone(&material))
                };
                self.by_id.insert(id, slot);
            }
            Some(Slot::Plain(_)) if material.is_subtyped() => {
                return Err(RegistryError::MixedSubtyping { id });
            }
            Some(Slot::Plain(_)) => return Err(RegistryError::Duplicate { id, data }),
            Some(Slot::Subtyped(_)) if !material.is_subtyped() => {
                return Err(RegistryError::MixedSubtyping { id });
            }
            Some(Slot::Subtyped(subtypes)) => {
                if subtypes.contains_key(&data) {
                    return Err(RegistryError::Duplicate { id, data });
                }
                subtypes.insert(data, Arc::clone(&material));
            }
        }

        tracing::trace!(name = material.name(), ?id, data, "material registered");
        self.by_name
            .insert(material.name().to_string(), Arc::clone(&material));
        self.all.push(Arc::clone(&material));
        Ok(material)
    }

    /// Resolve a slot's `(id, data)`. Plain materials ignore `data`; subtyped
    /// ids only resolve for registered data values. Never substitutes a
    /// default.
    pub fn resolve(&self, id: MaterialId, data: u16) -> Result<Arc<Material>, StoreError> {
        let found = match self.by_id.get(&id) {
            Some(Slot::Plain(material)) => Some(material),
            Some(Slot::Subtyped(subtypes)) => subtypes.get(&data),
            None => None,
        };
        found
            .cloned()
            .ok_or(StoreError::UnknownMaterial { id, data })
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Arc<Material>> {
        self.by_name.get(name)
    }

    pub fn contains_id(&self, id: MaterialId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Material>> {
        self.all.iter()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    // ── Loading ────────────────────────────────────────────────────────

    pub fn from_toml_str(toml_str: &str) -> Result<Self, RegistryError> {
        Self::from_toml_str_with(toml_str, |_| None)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// Load a material table, asking `behavior_for` which behavior (if any)
    /// each entry should carry instead of the default.
    pub fn from_toml_str_with<F>(toml_str: &str, behavior_for: F) -> Result<Self, RegistryError>
    where
        F: Fn(&MaterialDef) -> Option<Arc<dyn MaterialBehavior>>,
    {
        let cfg: MaterialsConfig = toml::from_str(toml_str)?;
        let mut reg = Self::new();
        reg.extend_from_config(cfg, behavior_for)?;
        Ok(reg)
    }

    /// Register every entry of `cfg` into this registry.
    pub fn extend_from_config<F>(&mut self, cfg: MaterialsConfig, behavior_for: F) -> Result<(), RegistryError>
    where
        F: Fn(&MaterialDef) -> Option<Arc<dyn MaterialBehavior>>,
    {
        for def in cfg.material {
            let behavior = behavior_for(&def);
            let mut material = match (def.kind, def.data) {
                (KindDef::Block, None) => Material::block(def.name.clone(), def.id),
                (KindDef::Block, Some(data)) => Material::block_subtype(def.name.clone(), def.id, data),
                (KindDef::Item, None) => Material::item(def.name.clone(), def.id),
                (KindDef::Item, Some(data)) => Material::item_subtype(def.name.clone(), def.id, data),
            };
            material = material.with_physics(def.physics).with_liquid(def.liquid);
            if let Some(behavior) = behavior {
                material = material.with_shared_behavior(behavior);
            }
            if let Some(friction) = def.friction {
                material.set_friction(friction);
            }
            if let Some(hardness) = def.hardness {
                material.set_hardness(hardness);
            }
            if let Some(opacity) = def.opacity {
                material.set_opacity(opacity);
            }
            if let Some(light) = def.light {
                material.set_light_level(light);
            }
            self.register(material)?;
        }
        Ok(())
    }
}
