use serde::Deserialize;

/// A material table as read from TOML:
///
/// ```toml
/// [[material]]
/// name = "glowstone"
/// id = 89
/// hardness = 0.3
/// light = 15
///
/// [[material]]
/// name = "water"
/// id = 9
/// opacity = 3
/// liquid = true
///
/// [[material]]
/// name = "red_wool"
/// id = 300
/// data = 14
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialsConfig {
    #[serde(default)]
    pub material: Vec<MaterialDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialDef {
    pub name: String,
    pub id: u16,
    /// Present means the material is a subtype keyed by `(id, data)`.
    pub data: Option<u16>,
    #[serde(default)]
    pub kind: KindDef,
    pub friction: Option<f32>,
    pub hardness: Option<f32>,
    pub opacity: Option<u8>,
    pub light: Option<u8>,
    #[serde(default)]
    pub physics: bool,
    #[serde(default)]
    pub liquid: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindDef {
    #[default]
    Block,
    Item,
}
