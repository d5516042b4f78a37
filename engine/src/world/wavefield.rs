//! Wave field
//!
//! Water surface built from a sum of sine wave trains. Each train is read
//! from one `wavefield.cfg` line:
//!
//! ```text
//! ; wavelength, amplitude, maxheight, direction (degrees)
//! 50, 0.2, 0.6, 0
//! 80, 0.3, 0.9, 45
//! ```
//!
//! Amplitude grows with the squared distance from the map centre, so the
//! open sea is rougher than the shore. Height and velocity are pure
//! functions of position and time; the host owns the clock.

use std::f32::consts::TAU;
use std::path::Path;

use glam::Vec3;
use log::{info, warn};

use super::adapters::WaveAdapter;
use crate::error::ConfigError;

/// Squared-distance divisor for the distance-based amplitude scale.
const WAVE_DISTANCE_SCALE: f32 = 3_000_000.0;

/// One sine component of the sea surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveTrain {
    pub wavelength: f32,
    pub amplitude: f32,
    /// Upper limit of this train's amplitude
    pub maxheight: f32,
    /// Heading in radians
    pub direction: f32,
    pub wavespeed: f32,
    dir_sin: f32,
    dir_cos: f32,
}

impl WaveTrain {
    /// `direction_deg` in degrees; wave speed follows the deep-water
    /// approximation `1.25 * sqrt(wavelength)`.
    pub fn new(wavelength: f32, amplitude: f32, maxheight: f32, direction_deg: f32) -> Self {
        let direction = direction_deg.to_radians();
        Self {
            wavelength,
            amplitude,
            maxheight,
            direction,
            wavespeed: 1.25 * wavelength.sqrt(),
            dir_sin: direction.sin(),
            dir_cos: direction.cos(),
        }
    }

    fn phase(&self, pos: Vec3, t: f32) -> f32 {
        TAU * ((t * self.wavespeed + self.dir_sin * pos.x + self.dir_cos * pos.z) / self.wavelength)
    }
}

/// Parse `wavefield.cfg` text. Lines with fewer than four numbers are skipped.
pub fn parse_wave_trains(text: &str) -> Vec<WaveTrain> {
    let mut trains = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        let values: Vec<f32> = line
            .split(',')
            .map_while(|part| part.trim().parse::<f32>().ok())
            .collect();
        if values.len() < 4 {
            warn!("wavefield line {}: expected 4 values, skipped: '{}'", idx + 1, line);
            continue;
        }
        if !(values[0] > 0.0) {
            warn!("wavefield line {}: wavelength must be positive, skipped", idx + 1);
            continue;
        }
        trains.push(WaveTrain::new(values[0], values[1], values[2], values[3]));
    }
    trains
}

/// Sum-of-sines sea surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Wavefield {
    /// Calm water level
    pub water_height: f32,
    /// Base amplitude factor added to the distance-based one
    pub waves_height: f32,
    map_size: (f32, f32),
    mesh_scale: f32,
    trains: Vec<WaveTrain>,
    max_ampl: f32,
}

impl Wavefield {
    /// Calm sea over a terrain of `map_size` (x, z) meters.
    pub fn new(map_size: (f32, f32), water_height: f32) -> Self {
        // Small maps get a wider water plane
        let mesh_scale = if map_size.0 < 1500.0 && map_size.1 < 1500.0 { 1.5 } else { 1.0 };
        Self {
            water_height,
            waves_height: 0.0,
            map_size,
            mesh_scale,
            trains: Vec::new(),
            max_ampl: 0.0,
        }
    }

    /// Builder-style train list.
    pub fn with_trains(mut self, trains: Vec<WaveTrain>) -> Self {
        self.set_trains(trains);
        self
    }

    pub fn set_trains(&mut self, trains: Vec<WaveTrain>) {
        self.max_ampl = trains.iter().map(|t| t.maxheight).sum();
        self.trains = trains;
    }

    /// Read wave trains from a `wavefield.cfg` file.
    pub fn load_trains(&mut self, path: impl AsRef<Path>) -> Result<usize, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let trains = parse_wave_trains(&text);
        info!("Loaded {} wave trains from {}", trains.len(), path.as_ref().display());
        let count = trains.len();
        self.set_trains(trains);
        Ok(count)
    }

    pub fn trains(&self) -> &[WaveTrain] {
        &self.trains
    }

    /// Sum of all train height limits.
    pub fn max_amplitude(&self) -> f32 {
        self.max_ampl
    }

    /// Amplitude factor at a position: distance from map centre plus the base.
    pub fn wave_scale(&self, pos: Vec3) -> f32 {
        let centre = Vec3::new(
            self.map_size.0 * self.mesh_scale * 0.5,
            self.water_height,
            self.map_size.1 * self.mesh_scale * 0.5,
        );
        (pos - centre).length_squared() / WAVE_DISTANCE_SCALE + self.waves_height
    }

    fn above_waves(&self, pos: Vec3) -> bool {
        pos.y > self.water_height + self.max_ampl
    }

    /// Whether `pos` is below the water surface at time `t`.
    pub fn is_under_water(&self, pos: Vec3, t: f32) -> bool {
        if self.above_waves(pos) {
            return false;
        }
        pos.y < self.height_at(pos, t)
    }
}

impl WaveAdapter for Wavefield {
    fn height_at(&self, pos: Vec3, t: f32) -> f32 {
        if self.above_waves(pos) {
            return self.water_height;
        }
        let scale = self.wave_scale(pos);
        self.trains.iter().fold(self.water_height, |acc, train| {
            let amp = (train.amplitude * scale).min(train.maxheight);
            acc + amp * train.phase(pos, t).sin()
        })
    }

    fn velocity_at(&self, pos: Vec3, t: f32) -> Vec3 {
        if self.above_waves(pos) {
            return Vec3::ZERO;
        }
        let scale = self.wave_scale(pos);
        let mut result = Vec3::ZERO;
        for train in &self.trains {
            let amp = (train.amplitude * scale).min(train.maxheight);
            let speed = TAU * amp / (train.wavelength / train.wavespeed);
            let coeff = train.phase(pos, t);
            result.y += speed * coeff.cos();
            result += Vec3::new(train.dir_sin, 0.0, train.dir_cos) * speed * coeff.sin();
        }
        result
    }
}
