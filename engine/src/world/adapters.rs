//! World sampling interfaces
//!
//! The collision service never owns terrain, water or landuse data. It reads
//! them through these small capability traits so the host (or a test) can
//! plug in whatever representation it has.

use glam::Vec3;

use crate::ground::GroundModelId;

/// Terrain surface sampler.
pub trait HeightfieldAdapter: Send + Sync {
    /// Terrain surface height at `(x, z)`.
    fn height_at(&self, x: f32, z: f32) -> f32;

    /// Unit surface normal at `(x, z)`. `y` is the probing height and may be
    /// ignored by implementations that only store a single layer.
    fn normal_at(&self, x: f32, y: f32, z: f32) -> Vec3;
}

/// Water surface sampler. Both methods are pure functions of position and time.
pub trait WaveAdapter: Send + Sync {
    /// Water surface height above `pos` at time `t` (seconds).
    fn height_at(&self, pos: Vec3, t: f32) -> f32;

    /// Velocity of the water surface at `pos` and time `t`.
    fn velocity_at(&self, pos: Vec3, t: f32) -> Vec3;
}

/// Maps a terrain position to the surface material painted there.
pub trait LanduseAdapter: Send + Sync {
    /// Ground model at `(x, z)`, or `None` when the map has no answer.
    fn ground_model_at(&self, x: f32, z: f32) -> Option<GroundModelId>;
}

/// Infinite flat plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlatHeightfield {
    pub height: f32,
}

impl FlatHeightfield {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl HeightfieldAdapter for FlatHeightfield {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }

    fn normal_at(&self, _x: f32, _y: f32, _z: f32) -> Vec3 {
        Vec3::Y
    }
}

/// Calm water at a fixed level.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StillWater {
    pub level: f32,
}

impl StillWater {
    pub fn new(level: f32) -> Self {
        Self { level }
    }
}

impl WaveAdapter for StillWater {
    fn height_at(&self, _pos: Vec3, _t: f32) -> f32 {
        self.level
    }

    fn velocity_at(&self, _pos: Vec3, _t: f32) -> Vec3 {
        Vec3::ZERO
    }
}

/// Landuse that answers the same model everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformLanduse(pub GroundModelId);

impl LanduseAdapter for UniformLanduse {
    fn ground_model_at(&self, _x: f32, _z: f32) -> Option<GroundModelId> {
        Some(self.0)
    }
}
