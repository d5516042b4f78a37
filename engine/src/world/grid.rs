//! Collision Grid Module
//!
//! Cell layout shared by the spatial hash and every broad-phase query.
//!
//! ## Cells
//! The X-Z plane is cut into square cells of `cell_size` meters.
//! Cell `(cx, cz)` covers `[cx * cell_size, (cx + 1) * cell_size)` on X and
//! the same on Z. Only the positive quadrant is indexed: cell coordinates are
//! clamped to `[0, max_cell]` at insert time, and queries outside that range
//! skip the broad phase entirely.
//!
//! ## Cell IDs
//! With `max_cell = 0x7FFF` a cell packs into a 32-bit id as `(cx << 16) + cz`,
//! which limits the indexed terrain to roughly 65km x 65km at 2m cells.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Default cell edge length in meters.
pub const DEFAULT_CELL_SIZE: f32 = 2.0;
/// Largest cell coordinate that still packs into a 32-bit cell id.
pub const MAX_CELL_COORD: i32 = 0x7FFF;
/// Default hash table size exponent (2^20 buckets).
pub const DEFAULT_HASH_POWER: u32 = 20;

/// Grid configuration for the static collision index.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cell edge length along X and Z (meters)
    pub cell_size: f32,
    /// Upper clamp for cell coordinates
    pub max_cell: i32,
    /// The hash table holds `2^hash_power` buckets
    pub hash_power: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            max_cell: MAX_CELL_COORD,
            hash_power: DEFAULT_HASH_POWER,
        }
    }
}

/// Inclusive rectangle of cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRange {
    pub x_lo: i32,
    pub x_hi: i32,
    pub z_lo: i32,
    pub z_hi: i32,
}

impl CellRange {
    /// Iterates every `(cx, cz)` in the range, X-major.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (self.x_lo..=self.x_hi).flat_map(move |x| (self.z_lo..=self.z_hi).map(move |z| (x, z)))
    }

    /// Number of cells in the range.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        ((self.x_hi - self.x_lo + 1) as usize) * ((self.z_hi - self.z_lo + 1) as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.x_hi < self.x_lo || self.z_hi < self.z_lo
    }
}

impl GridConfig {
    /// Create a grid config with a custom cell size and hash size.
    pub fn new(cell_size: f32, hash_power: u32) -> Self {
        Self {
            cell_size,
            max_cell: MAX_CELL_COORD,
            hash_power,
        }
    }

    /// Number of buckets in the hash table.
    pub fn hash_size(&self) -> usize {
        1usize << self.hash_power
    }

    /// Unclamped cell coordinate of a world coordinate.
    pub fn cell_coord(&self, v: f32) -> i32 {
        (v / self.cell_size).floor() as i32
    }

    /// Clamp a cell coordinate into the indexable range.
    pub fn clamp_cell(&self, c: i32) -> i32 {
        c.clamp(0, self.max_cell)
    }

    /// The cell owning a world point, or `None` outside the indexed quadrant.
    pub fn cell_of(&self, x: f32, z: f32) -> Option<(i32, i32)> {
        let cx = self.cell_coord(x);
        let cz = self.cell_coord(z);
        if cx < 0 || cz < 0 || cx > self.max_cell || cz > self.max_cell {
            return None;
        }
        Some((cx, cz))
    }

    /// Cells covered by the X-Z footprint of an AABB, clamped to the indexable range.
    ///
    /// Y is ignored.
    pub fn cell_cover(&self, lo: Vec3, hi: Vec3) -> CellRange {
        CellRange {
            x_lo: self.clamp_cell(self.cell_coord(lo.x)),
            x_hi: self.clamp_cell(self.cell_coord(hi.x)),
            z_lo: self.clamp_cell(self.cell_coord(lo.z)),
            z_hi: self.clamp_cell(self.cell_coord(hi.z)),
        }
    }

    /// World-space X-Z corner of a cell.
    pub fn cell_origin(&self, cx: i32, cz: i32) -> (f32, f32) {
        (cx as f32 * self.cell_size, cz as f32 * self.cell_size)
    }

    /// Edge length of the indexed square (meters).
    pub fn indexed_extent(&self) -> f32 {
        (self.max_cell + 1) as f32 * self.cell_size
    }
}

/// Pack a cell coordinate pair into its 32-bit id.
pub fn cell_id(cx: i32, cz: i32) -> u32 {
    ((cx as u32) << 16).wrapping_add(cz as u32)
}
