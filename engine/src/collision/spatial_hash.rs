//! Spatial hash for static collision elements
//!
//! Fixed-size open hash from packed cell ids to element handles. The table
//! never grows: every bucket is an append-only list of `(cell_id, element)`
//! entries and may hold entries of several cells that alias into the same
//! slot, so readers always compare `cell_id` before using an entry.
//!
//! Each bucket also tracks the highest world Y of anything mapped through it,
//! which lets height probes skip buckets that cannot raise the estimate.

use static_assertions::assert_eq_size;

use crate::world::grid::{CellRange, GridConfig, cell_id};

/// Element values at or above this encode triangles.
pub const TRI_BASE_INDEX: u32 = 1_000_000;

/// 256-entry substitution box for the cell id mixer.
const SBOX: [u32; 256] = [
    0xF53E_1837, 0x5F14_C86B, 0x9EE3_964C, 0xFA79_6D53,
    0x3222_3FC3, 0x4D82_BC98, 0xA0C7_FA62, 0x63E2_C982,
    0x2499_4A5B, 0x1ECE_7BEE, 0x292B_38EF, 0xD5CD_4E56,
    0x514F_4303, 0x7BE1_2B83, 0x7192_F195, 0x82DC_7300,
    0x0843_80B4, 0x480B_55D3, 0x5F43_0471, 0x13F7_5991,
    0x3F9C_F22C, 0x2FE0_907A, 0xFD8E_1E69, 0x7B1D_5DE8,
    0xD575_A85C, 0xAD01_C50A, 0x7EE0_0737, 0x3CE9_81E8,
    0x0E44_7EFA, 0x2308_9DD6, 0xB59F_149F, 0x1360_0EC7,
    0xE802_C8E6, 0x6709_21E4, 0x7207_EFF0, 0xE747_61B0,
    0x6903_5234, 0xBFA4_0F19, 0xF636_51A0, 0x29E6_4C26,
    0x1F98_CCA7, 0xD957_007E, 0xE71D_DC75, 0x3E72_9595,
    0x7580_B7CC, 0xD7FA_F60B, 0x9248_4323, 0xA441_13EB,
    0xE4CB_DE08, 0x3468_27C9, 0x3CF3_2AFA, 0x0B29_BCF1,
    0x6E29_F7DF, 0xB01E_71CB, 0x3BFB_C0D1, 0x62ED_C5B8,
    0xB7DE_789A, 0xA474_8EC9, 0xE17A_4C4F, 0x67E5_BD03,
    0xF3B3_3D1A, 0x97D8_D3E9, 0x0912_1BC0, 0x347B_2D2C,
    0x79A1_913C, 0x5041_72DE, 0x7F1F_8483, 0x13AC_3CF6,
    0x7A20_94DB, 0xC778_FA12, 0xADF7_469F, 0x2178_6B7B,
    0x71A4_45D0, 0xA889_6C1B, 0x656F_62FB, 0x83A0_59B3,
    0x972D_FE6E, 0x4122_000C, 0x97D9_DA19, 0x17D5_947B,
    0xB1AF_FD0C, 0x6EF8_3B97, 0xAF7F_780B, 0x4613_138A,
    0x7C3E_73A6, 0xCF15_E03D, 0x4157_6322, 0x672D_F292,
    0xB658_588D, 0x33EB_EFA9, 0x938C_BF06, 0x06B6_7381,
    0x07F1_92C6, 0x2BDA_5855, 0x348E_E0E8, 0x19DB_B6E3,
    0x3222_184B, 0xB69D_5DBA, 0x7E76_0B88, 0xAF4D_8154,
    0x007A_51AD, 0x3511_2500, 0xC9CD_2D7D, 0x4F4F_B761,
    0x6947_72E3, 0x694C_8351, 0x4A7E_3AF5, 0x67D6_5CE1,
    0x9287_DE92, 0x2518_DB3C, 0x8CB4_EC06, 0xD154_D38F,
    0xE19A_26BB, 0x295E_E439, 0xC50A_1104, 0x2153_C6A7,
    0x8236_6656, 0x0713_BC2F, 0x6462_215A, 0x21D9_BFCE,
    0xBA8E_ACE6, 0xAE2D_F4C1, 0x2A8D_5E80, 0x3F7E_52D1,
    0x2935_9399, 0xFEA1_D19C, 0x1887_9313, 0x455A_FA81,
    0xFADF_E838, 0x6260_9838, 0xD102_8839, 0x0736_E92F,
    0x3BCA_22A3, 0x1485_B08A, 0x2DA7_900B, 0x852C_156D,
    0xE8F2_4803, 0x0007_8472, 0x13F0_D332, 0x2ACF_D0CF,
    0x5F74_7F5C, 0x87BB_1E2F, 0xA7EF_CB63, 0x23F4_32F0,
    0xE6CE_7C5C, 0x1F95_4EF6, 0xB609_C91B, 0x3B45_71BF,
    0xEED1_7DC0, 0xE556_CDA0, 0xA784_6A8D, 0xFF10_5F94,
    0x52B7_CCDE, 0x0E33_E801, 0x6644_55EA, 0xF2C7_0414,
    0x73E7_B486, 0x8F83_0661, 0x8B59_E826, 0xBB8A_EDCA,
    0xF3D7_0AB9, 0xD739_F2B9, 0x4A04_C34A, 0x88D0_F089,
    0xE021_91A2, 0xD89D_9C78, 0x192C_2749, 0xFC43_A78F,
    0x0AAC_88CB, 0x9438_D42D, 0x9E28_0F7A, 0x3606_3802,
    0x38E8_D018, 0x1C42_A9CB, 0x92AA_FF6C, 0xA248_20C5,
    0x007F_077F, 0xCE5B_C543, 0x6966_8D58, 0x10D6_FF74,
    0xBE00_F621, 0x2130_0BBE, 0x2E9E_8F46, 0x5ACE_A629,
    0xFA1F_86C7, 0x52F2_06B8, 0x3EDF_1A75, 0x6DA8_D843,
    0xCF71_9928, 0x73E3_891F, 0xB4B9_5DD6, 0xB2A4_2D27,
    0xEDA2_0BBF, 0x1A58_DBDF, 0xA449_AD03, 0x6DDE_F22B,
    0x9005_31E6, 0x3D3B_FF35, 0x5B24_ABA2, 0x472B_3E4C,
    0x387F_2D75, 0x4D8D_BA36, 0x71CB_5641, 0xE347_3F3F,
    0xF6CD_4B7F, 0xBF7D_1428, 0x344B_64D0, 0xC5CD_FCB6,
    0xFE2E_0182, 0x2C37_A673, 0xDE4E_B7A3, 0x63FD_C933,
    0x01DC_4063, 0x611F_3571, 0xD167_BFAF, 0x4496_596F,
    0x3DEE_0689, 0xD870_4910, 0x7052_A114, 0x068C_9EC5,
    0x75D0_E766, 0x4D54_CC20, 0xB44E_CDE2, 0x4ABC_653E,
    0x2C55_0A21, 0x1A52_C0DB, 0xCFED_03D0, 0x119B_AFE2,
    0x876A_6133, 0xBC23_2088, 0x435B_A1B2, 0xAE99_BBFA,
    0xBB4F_08E4, 0xA62B_5F49, 0x1DA4_B695, 0x336B_84DE,
    0xDC81_3D31, 0x00C1_34FB, 0x397A_98E6, 0x151F_0E64,
    0xD9EB_3E69, 0xD3C7_DF60, 0xD2F2_C336, 0x2DDD_067B,
    0xBD12_2835, 0xB0B3_BD3A, 0xB0D5_4E46, 0x8641_F1E4,
    0xA0B3_8F96, 0x51D3_9199, 0x37A6_AD75, 0xDF84_EE41,
    0x3C03_4CBA, 0xACDA_62FC, 0x1192_3B8B, 0x45EF_170A,
];

/// Handle of a static element: a collision box or a collision triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementRef {
    Box(usize),
    Tri(usize),
}

impl ElementRef {
    fn encode(self) -> u32 {
        match self {
            ElementRef::Box(i) => i as u32,
            ElementRef::Tri(i) => i as u32 + TRI_BASE_INDEX,
        }
    }

    fn decode(raw: u32) -> Self {
        if raw >= TRI_BASE_INDEX {
            ElementRef::Tri((raw - TRI_BASE_INDEX) as usize)
        } else {
            ElementRef::Box(raw as usize)
        }
    }
}

/// One bucket slot: which cell it belongs to and what it points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct HashEntry {
    pub cell_id: u32,
    element: u32,
}

assert_eq_size!(HashEntry, u64);

impl HashEntry {
    pub fn element(&self) -> ElementRef {
        ElementRef::decode(self.element)
    }
}

/// Read view of one bucket.
#[derive(Clone, Copy, Debug)]
pub struct Bucket<'a> {
    index: usize,
    entries: &'a [HashEntry],
    /// Highest world Y of any element mapped through this bucket
    pub max_height: f32,
}

impl<'a> Bucket<'a> {
    /// Slot index in the table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// All entries, including aliases from other cells.
    pub fn entries(&self) -> &'a [HashEntry] {
        self.entries
    }

    /// Elements registered for exactly `cell`, in insertion order.
    pub fn elements_in(&self, cell: u32) -> impl Iterator<Item = ElementRef> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.cell_id == cell)
            .map(HashEntry::element)
    }
}

/// Occupancy summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HashStats {
    pub buckets: usize,
    pub used_buckets: usize,
    pub largest_bucket: usize,
    pub total_entries: usize,
}

/// The static collision index.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    grid: GridConfig,
    mask: u32,
    buckets: Vec<Vec<HashEntry>>,
    max_height: Vec<f32>,
}

impl SpatialHash {
    /// Allocate `2^grid.hash_power` empty buckets.
    pub fn new(grid: GridConfig) -> Self {
        let size = grid.hash_size();
        Self {
            grid,
            mask: (size - 1) as u32,
            buckets: vec![Vec::new(); size],
            max_height: vec![f32::NEG_INFINITY; size],
        }
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    /// Bucket slot of a packed cell id.
    pub fn slot_of(&self, cell: u32) -> usize {
        let mut hash: u32 = 0;
        for byte in cell.to_le_bytes() {
            hash ^= SBOX[byte as usize];
            hash = hash.wrapping_mul(3);
        }
        (hash & self.mask) as usize
    }

    /// Append `element` to the bucket of cell `(cx, cz)` and raise the
    /// bucket's max height to `top_y`.
    pub fn insert(&mut self, cx: i32, cz: i32, element: ElementRef, top_y: f32) {
        let cell = cell_id(cx, cz);
        let slot = self.slot_of(cell);
        self.buckets[slot].push(HashEntry {
            cell_id: cell,
            element: element.encode(),
        });
        self.max_height[slot] = self.max_height[slot].max(top_y);
    }

    /// Register `element` in every cell of `range`.
    pub fn insert_range(&mut self, range: CellRange, element: ElementRef, top_y: f32) {
        for (cx, cz) in range.iter() {
            self.insert(cx, cz, element, top_y);
        }
    }

    /// Bucket holding cell `(cx, cz)`.
    pub fn lookup(&self, cx: i32, cz: i32) -> Bucket<'_> {
        self.bucket(self.slot_of(cell_id(cx, cz)))
    }

    /// Bucket at a raw slot; `slot` must come from [`Self::slot_of`].
    pub(crate) fn bucket(&self, slot: usize) -> Bucket<'_> {
        Bucket {
            index: slot,
            entries: &self.buckets[slot],
            max_height: self.max_height[slot],
        }
    }

    /// Drop every entry, keeping the table allocation.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.max_height.fill(f32::NEG_INFINITY);
    }

    pub fn stats(&self) -> HashStats {
        let mut stats = HashStats {
            buckets: self.buckets.len(),
            ..Default::default()
        };
        for bucket in self.buckets.iter().filter(|b| !b.is_empty()) {
            stats.used_buckets += 1;
            stats.total_entries += bucket.len();
            stats.largest_bucket = stats.largest_bucket.max(bucket.len());
        }
        stats
    }
}
