//! Collision service configuration
//!
//! Defaults match the terrain format; a JSON document can override any
//! subset of fields:
//!
//! ```json
//! { "grid": { "cell_size": 4.0 }, "slab_depth": 0.15 }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::world::grid::GridConfig;

/// Depth of the contact band below a triangle (meters).
pub const DEFAULT_SLAB_DEPTH: f32 = 0.1;
/// Padding added around triangle bounds before hashing (meters).
pub const DEFAULT_TRI_SKIN: f32 = 0.1;
/// Standard gravity (m/s²).
pub const DEFAULT_GRAVITY: f32 = 9.807;

/// Tunables of the static collision index and its contact tests.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub grid: GridConfig,
    /// Contact band below each triangle. Coupled with `tri_skin`: the skin
    /// must be at least as deep as the slab or contacts near cell edges
    /// are lost.
    pub slab_depth: f32,
    pub tri_skin: f32,
    pub gravity: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            slab_depth: DEFAULT_SLAB_DEPTH,
            tri_skin: DEFAULT_TRI_SKIN,
            gravity: DEFAULT_GRAVITY,
        }
    }
}

impl CollisionConfig {
    /// Parse a JSON override document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: CollisionConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bad = |key: &str, value: String| ConfigError::InvalidValue {
            section: "collision".to_string(),
            key: key.to_string(),
            value,
            line: 0,
        };
        if !(self.grid.cell_size > 0.0) {
            return Err(bad("grid.cell_size", self.grid.cell_size.to_string()));
        }
        if self.grid.hash_power == 0 || self.grid.hash_power > 28 {
            return Err(bad("grid.hash_power", self.grid.hash_power.to_string()));
        }
        if !(0..=0x7FFF).contains(&self.grid.max_cell) {
            return Err(bad("grid.max_cell", self.grid.max_cell.to_string()));
        }
        if !(self.slab_depth > 0.0) {
            return Err(bad("slab_depth", self.slab_depth.to_string()));
        }
        if self.tri_skin < self.slab_depth {
            return Err(bad("tri_skin", self.tri_skin.to_string()));
        }
        Ok(())
    }
}
