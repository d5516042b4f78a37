//! Landuse map
//!
//! Per-metre grid of ground models painted onto the terrain. The config maps
//! ARGB colours to ground model names:
//!
//! ```text
//! [general]
//! texture = landuse.png
//! frictionconfig = extra_ground_models.cfg
//! defaultuse = grass
//!
//! [use-map]
//! 0xff00ff00 = grass
//! 0xff808080 = gravel
//! ```
//!
//! Decoding the texture is the host's job; the map is built from the decoded
//! colour grid.

use std::collections::HashMap;

use log::warn;

use super::adapters::LanduseAdapter;
use crate::error::ConfigError;
use crate::ground::config::ConfigFile;
use crate::ground::{GroundModelId, GroundModelRegistry};

/// Parsed landuse config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanduseConfig {
    /// Colour texture the host decodes
    pub texture: Option<String>,
    /// Extra ground model file to load before resolving the map
    pub friction_config: Option<String>,
    /// Model for positions outside the map
    pub default_use: Option<String>,
    /// ARGB colour to ground model name
    pub use_map: HashMap<u32, String>,
}

impl LanduseConfig {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let cfg = ConfigFile::parse(text)?;
        let mut out = LanduseConfig::default();

        for section in cfg.sections() {
            match section.name.as_str() {
                "general" | "config" => {
                    for entry in &section.entries {
                        match entry.key.as_str() {
                            "texture" => out.texture = Some(entry.value.clone()),
                            "frictionconfig" | "loadGroundModelsConfig" => {
                                out.friction_config = Some(entry.value.clone())
                            }
                            "defaultuse" => out.default_use = Some(entry.value.clone()),
                            other => warn!("landuse: unknown key '{}' on line {}", other, entry.line),
                        }
                    }
                }
                "use-map" => {
                    for entry in &section.entries {
                        // 0xAARRGGBB
                        let colour = entry
                            .key
                            .strip_prefix("0x")
                            .filter(|hex| entry.key.len() == 10 && hex.len() == 8)
                            .and_then(|hex| u32::from_str_radix(hex, 16).ok());
                        match colour {
                            Some(c) => {
                                out.use_map.insert(c, entry.value.clone());
                            }
                            None => warn!("landuse: invalid colour '{}' on line {}", entry.key, entry.line),
                        }
                    }
                }
                other => warn!("landuse: unknown section '{}'", other),
            }
        }
        Ok(out)
    }
}

/// Ground model per terrain metre.
#[derive(Debug, Clone, PartialEq)]
pub struct LanduseMap {
    width: usize,
    depth: usize,
    data: Vec<Option<GroundModelId>>,
    default_model: Option<GroundModelId>,
}

impl LanduseMap {
    /// Resolve a decoded ARGB colour grid (`colours[z * width + x]`) into
    /// ground models. Colours without a mapping, or mapped to an unknown
    /// model, resolve to `None`.
    pub fn new(
        config: &LanduseConfig,
        registry: &GroundModelRegistry,
        width: usize,
        depth: usize,
        colours: &[u32],
    ) -> Option<Self> {
        if colours.len() != width * depth {
            return None;
        }

        let default_model = config.default_use.as_deref().and_then(|name| {
            let id = registry.lookup(name);
            if id.is_none() {
                warn!("landuse: default ground model '{}' not found", name);
            }
            id
        });

        let mut resolved: HashMap<u32, Option<GroundModelId>> = HashMap::new();
        for (&colour, name) in &config.use_map {
            let id = registry.lookup(name);
            if id.is_none() {
                warn!("landuse: ground model '{}' for colour {:#010x} not found", name, colour);
            }
            resolved.insert(colour, id);
        }

        let data = colours
            .iter()
            .map(|c| resolved.get(c).copied().flatten())
            .collect();

        Some(Self {
            width,
            depth,
            data,
            default_model,
        })
    }

    pub fn default_model(&self) -> Option<GroundModelId> {
        self.default_model
    }
}

impl LanduseAdapter for LanduseMap {
    fn ground_model_at(&self, x: f32, z: f32) -> Option<GroundModelId> {
        let (ix, iz) = (x.floor(), z.floor());
        if ix < 0.0 || iz < 0.0 || ix >= self.width as f32 || iz >= self.depth as f32 {
            return self.default_model;
        }
        self.data[iz as usize * self.width + ix as usize]
    }
}
