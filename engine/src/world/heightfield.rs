//! Sampled terrain heightfield
//!
//! Regular grid of height samples starting at `origin` with `spacing` meters
//! between samples. Heights are bilinearly interpolated; positions outside
//! the grid read the nearest edge sample.

use glam::Vec3;

use super::adapters::HeightfieldAdapter;

/// Height samples stored row-major (`heights[z * width + x]`).
#[derive(Debug, Clone, PartialEq)]
pub struct GridHeightfield {
    /// World X-Z of sample (0, 0)
    pub origin: (f32, f32),
    /// Distance between neighbouring samples (meters)
    pub spacing: f32,
    width: usize,
    depth: usize,
    heights: Vec<f32>,
}

impl GridHeightfield {
    /// Build from row-major samples. Returns `None` if the sample count does
    /// not match `width * depth`, either dimension is zero, or the spacing is
    /// not positive.
    pub fn new(origin: (f32, f32), spacing: f32, width: usize, depth: usize, heights: Vec<f32>) -> Option<Self> {
        if width == 0 || depth == 0 || heights.len() != width * depth || !(spacing > 0.0) {
            return None;
        }
        Some(Self {
            origin,
            spacing,
            width,
            depth,
            heights,
        })
    }

    /// Build by evaluating `f(x, z)` at every sample position.
    pub fn from_fn(
        origin: (f32, f32),
        spacing: f32,
        width: usize,
        depth: usize,
        f: impl Fn(f32, f32) -> f32,
    ) -> Option<Self> {
        let mut heights = Vec::with_capacity(width * depth);
        for iz in 0..depth {
            for ix in 0..width {
                let x = origin.0 + ix as f32 * spacing;
                let z = origin.1 + iz as f32 * spacing;
                heights.push(f(x, z));
            }
        }
        Self::new(origin, spacing, width, depth, heights)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Raw sample, clamped to the grid.
    pub fn sample(&self, ix: i64, iz: i64) -> f32 {
        let x = ix.clamp(0, self.width as i64 - 1) as usize;
        let z = iz.clamp(0, self.depth as i64 - 1) as usize;
        self.heights[z * self.width + x]
    }

    fn bilinear(&self, x: f32, z: f32) -> f32 {
        let gx = (x - self.origin.0) / self.spacing;
        let gz = (z - self.origin.1) / self.spacing;
        let x0 = gx.floor();
        let z0 = gz.floor();
        let fx = (gx - x0).clamp(0.0, 1.0);
        let fz = (gz - z0).clamp(0.0, 1.0);
        let (ix, iz) = (x0 as i64, z0 as i64);

        let h00 = self.sample(ix, iz);
        let h10 = self.sample(ix + 1, iz);
        let h01 = self.sample(ix, iz + 1);
        let h11 = self.sample(ix + 1, iz + 1);

        let near = h00 + (h10 - h00) * fx;
        let far = h01 + (h11 - h01) * fx;
        near + (far - near) * fz
    }
}

impl HeightfieldAdapter for GridHeightfield {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        self.bilinear(x, z)
    }

    fn normal_at(&self, x: f32, _y: f32, z: f32) -> Vec3 {
        // Central differences over one sample spacing
        let d = self.spacing;
        let dx = self.bilinear(x + d, z) - self.bilinear(x - d, z);
        let dz = self.bilinear(x, z + d) - self.bilinear(x, z - d);
        Vec3::new(-dx, 2.0 * d, -dz).normalize_or(Vec3::Y)
    }
}
