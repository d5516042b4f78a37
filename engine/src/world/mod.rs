//! World Module
//!
//! Everything the collision service samples but does not own: the cell grid
//! layout, terrain heights, the water surface and the landuse map.
//!
//! ## Coordinates
//! Y is up. Terrain lives in the positive X-Z quadrant; see [`grid`].

pub mod adapters;
pub mod grid;
pub mod heightfield;
pub mod landuse;
pub mod wavefield;

pub use adapters::{FlatHeightfield, HeightfieldAdapter, LanduseAdapter, StillWater, UniformLanduse, WaveAdapter};
pub use grid::{CellRange, GridConfig, cell_id};
pub use heightfield::GridHeightfield;
pub use landuse::{LanduseConfig, LanduseMap};
pub use wavefield::{WaveTrain, Wavefield, parse_wave_trains};
