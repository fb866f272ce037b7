//! Host configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! tick_interval_ms = 50
//! max_ticks = 0          # 0 = run until Ctrl+C
//! region_radius = 4      # chunk columns in each direction from the origin
//! max_updates_per_tick = 10000
//! # materials = "materials.toml"
//!
//! [world]
//! min_section = -4
//! section_count = 24
//!
//! [layers]
//! sand_rain = true
//! light_flicker = true
//! sky_cycle = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use cubestate_engine::world::WorldConfig;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub tick_interval_ms: u64,
    pub max_ticks: u64,
    pub region_radius: i32,
    pub max_updates_per_tick: usize,
    /// Material table to load instead of the built-in set.
    pub materials: Option<PathBuf>,
    pub world: WorldSection,
    pub layers: LayerToggles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldSection {
    pub min_section: i32,
    pub section_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayerToggles {
    pub sand_rain: bool,
    pub light_flicker: bool,
    pub sky_cycle: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            max_ticks: 0,
            region_radius: 4,
            max_updates_per_tick: 10_000,
            materials: None,
            world: WorldSection::default(),
            layers: LayerToggles::default(),
        }
    }
}

impl Default for WorldSection {
    fn default() -> Self {
        let WorldConfig {
            min_section,
            section_count,
        } = WorldConfig::default();
        Self {
            min_section,
            section_count,
        }
    }
}

impl Default for LayerToggles {
    fn default() -> Self {
        Self {
            sand_rain: true,
            light_flicker: true,
            sky_cycle: true,
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: SimConfig = toml::from_str(s).context("parsing simulation config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file. A relative `materials` path is
    /// resolved against the config file's directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config =
            Self::from_toml_str(&s).with_context(|| format!("in config {}", path.display()))?;
        if let (Some(materials), Some(dir)) = (config.materials.as_mut(), path.parent()) {
            if materials.is_relative() {
                *materials = dir.join(&*materials);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be at least 1");
        }
        if !(0..=64).contains(&self.region_radius) {
            bail!("region_radius must be in 0..=64, got {}", self.region_radius);
        }
        // Flat generation needs one section of ground and one of open air.
        if self.world.section_count < 2 {
            bail!(
                "world.section_count must be at least 2, got {}",
                self.world.section_count
            );
        }
        if self.max_updates_per_tick == 0 {
            bail!("max_updates_per_tick must be at least 1");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            min_section: self.world.min_section,
            section_count: self.world.section_count,
        }
    }
}
