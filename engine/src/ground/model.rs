//! Surface parameter sets (ground models)
//!
//! A ground model describes how a surface grips and how deep a fluid layer
//! sits on top of it. Friction follows a Stribeck curve between the static
//! coefficient `ms` and the sliding coefficient `mc`; fluids follow a power
//! law (`flow_consistency_index * |v|^(flow_behavior_index - 1)`).

use serde::Serialize;

/// Handle of a ground model inside a [`GroundModelRegistry`](super::GroundModelRegistry).
///
/// Handles are stable for the lifetime of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroundModelId(pub(crate) u32);

impl GroundModelId {
    /// Raw registry slot.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Particle/sound effect family of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FxType {
    #[default]
    None,
    /// Hard surface: rubber burning and sparks
    Hard,
    /// Dusty surface (with dust colour)
    Dusty,
    /// Throws clumps (e.g. snow, grass) with colour
    Clumpy,
    Particle,
}

impl FxType {
    /// Parse the config spelling (`PARTICLE`, `HARD`, `DUSTY`, `CLUMPY`).
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "PARTICLE" => Some(FxType::Particle),
            "HARD" => Some(FxType::Hard),
            "DUSTY" => Some(FxType::Dusty),
            "CLUMPY" => Some(FxType::Clumpy),
            _ => None,
        }
    }
}

/// Named surface parameters consumed by the contact solver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundModel {
    pub name: String,
    /// Adhesion velocity (m/s), strictly positive
    pub va: f32,
    /// Static friction coefficient
    pub ms: f32,
    /// Sliding friction coefficient
    pub mc: f32,
    /// Hydrodynamic friction (s/m)
    pub t2: f32,
    /// Stribeck velocity (m/s)
    pub vs: f32,
    /// Stribeck exponent
    pub alpha: f32,
    /// Scalar force multiplier
    pub strength: f32,

    /// Fluid density (kg/m³)
    pub fluid_density: f32,
    /// Power-law consistency index
    pub flow_consistency_index: f32,
    /// Power-law behaviour index (< 1 pseudoplastic, > 1 dilatant)
    pub flow_behavior_index: f32,
    /// Thickness of the fluid layer over solid ground (m)
    pub solid_ground_level: f32,
    /// 0 = fully anisotropic drag, 1 = isotropic
    pub drag_anisotropy: f32,

    pub fx_type: FxType,
    /// RGBA in 0..1
    pub fx_colour: [f32; 4],
    pub particle_name: String,
    pub fx_particle_amount: i32,
    pub fx_particle_min_velo: f32,
    pub fx_particle_max_velo: f32,
    pub fx_particle_fade: f32,
    pub fx_particle_timedelta: f32,
    pub fx_particle_velo_factor: f32,
    pub fx_particle_ttl: f32,

    /// Record this one was copied from before local overrides
    pub base_name: Option<String>,
}

impl GroundModel {
    /// A freshly declared model: zeroed physics with the config defaults
    /// (`alpha = 2`, `strength = 1`) and the default particle settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            va: 0.0,
            ms: 0.0,
            mc: 0.0,
            t2: 0.0,
            vs: 0.0,
            alpha: 2.0,
            strength: 1.0,
            fluid_density: 0.0,
            flow_consistency_index: 0.0,
            flow_behavior_index: 0.0,
            solid_ground_level: 0.0,
            drag_anisotropy: 0.0,
            fx_type: FxType::None,
            fx_colour: [0.0, 0.0, 0.0, 1.0],
            particle_name: String::new(),
            fx_particle_amount: 20,
            fx_particle_min_velo: 5.0,
            fx_particle_max_velo: 99999.0,
            fx_particle_fade: -1.0,
            fx_particle_timedelta: 1.0,
            fx_particle_velo_factor: 0.7,
            fx_particle_ttl: 2.0,
            base_name: None,
        }
    }

    /// Whether the surface carries a fluid layer over the solid ground.
    pub fn has_fluid_layer(&self) -> bool {
        self.solid_ground_level > 0.0
    }

    /// Checks the Stribeck-curve invariants.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.va > 0.0) {
            return Err(format!("adhesion velocity must be > 0 (got {})", self.va));
        }
        if self.mc > self.ms {
            return Err(format!(
                "sliding friction {} exceeds static friction {}",
                self.mc, self.ms
            ));
        }
        let physics = [
            self.ms,
            self.mc,
            self.t2,
            self.vs,
            self.alpha,
            self.strength,
            self.fluid_density,
            self.flow_consistency_index,
            self.flow_behavior_index,
            self.solid_ground_level,
            self.drag_anisotropy,
        ];
        if physics.iter().any(|v| !v.is_finite()) {
            return Err("non-finite coefficient".to_string());
        }
        Ok(())
    }
}
