//! # Tree Values
//!
//! Per-column tree classification and its packed `u16` form.
//!
//! ```text
//!  15 14 | 13 ............ 6 | 5 ..... 2 | 1 0
//!  dist  | trunk surface y   | height    | kind
//! ```
//!
//! The trunk surface is stored relative to [`SEA_LEVEL`]. Trees never grow at or
//! below `SEA_LEVEL + 1`, so the offset is always positive.

use num_derive::FromPrimitive;

use crate::engine_state::noise::hash_seed;
use crate::engine_state::noise::shape_maps::SEA_LEVEL;

const KIND_BITS: u16 = 2;
const HEIGHT_BITS: u16 = 4;
const SURFACE_BITS: u16 = 8;
const DISTANCE_BITS: u16 = 2;

const HEIGHT_SHIFT: u16 = KIND_BITS;
const SURFACE_SHIFT: u16 = HEIGHT_SHIFT + HEIGHT_BITS;
const DISTANCE_SHIFT: u16 = SURFACE_SHIFT + SURFACE_BITS;

const fn mask(bits: u16) -> u16 {
    (1 << bits) - 1
}

/// Probability of the extra leaf one above a trunk's tip.
const TIP_LEAF_PROBABILITY: f64 = 0.5;
/// Probability of a leaf on the sparse outer ring.
const OUTER_LEAF_PROBABILITY: f64 = 0.6;

/// What a column holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum TreeKind {
    Empty = 0,
    Trunk = 1,
    Leaf = 2,
}

/// Classification of one column.
///
/// Trunk columns store their own height and surface. Leaf columns store those of
/// the trunk that claimed them, plus their distance to it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TreeValue {
    pub kind: TreeKind,
    /// Trunk height, `0..=15`.
    pub trunk_height: u8,
    /// Trunk surface height minus [`SEA_LEVEL`].
    pub trunk_surface_offset: u8,
    /// Rounded distance to the trunk, `0..=3`. Zero for trunks.
    pub trunk_distance: u8,
}

impl TreeValue {
    pub const EMPTY: TreeValue = TreeValue {
        kind: TreeKind::Empty,
        trunk_height: 0,
        trunk_surface_offset: 0,
        trunk_distance: 0,
    };

    /// A trunk growing `height` voxels up from `surface_y`.
    ///
    /// Returns `None` when the surface cannot be stored.
    pub fn trunk(height: u8, surface_y: i32) -> Option<Self> {
        let offset = u8::try_from(surface_y - SEA_LEVEL).ok()?;
        Some(TreeValue {
            kind: TreeKind::Trunk,
            trunk_height: height & mask(HEIGHT_BITS) as u8,
            trunk_surface_offset: offset,
            trunk_distance: 0,
        })
    }

    /// A leaf column belonging to `trunk`, `distance` columns away from it.
    pub fn leaf_of(trunk: TreeValue, distance: u8) -> Self {
        TreeValue {
            kind: TreeKind::Leaf,
            trunk_distance: distance.min(mask(DISTANCE_BITS) as u8),
            ..trunk
        }
    }

    /// World height of the owning trunk's surface.
    pub fn trunk_surface_y(&self) -> i32 {
        SEA_LEVEL + self.trunk_surface_offset as i32
    }

    /// Height of the trunk tip, where the canopy is centred.
    fn top(&self) -> i32 {
        self.trunk_surface_y() + self.trunk_height as i32
    }

    /// Packs the value into its 16-bit form.
    pub fn pack(&self) -> u16 {
        (self.kind as u16 & mask(KIND_BITS))
            | ((self.trunk_height as u16 & mask(HEIGHT_BITS)) << HEIGHT_SHIFT)
            | ((self.trunk_surface_offset as u16 & mask(SURFACE_BITS)) << SURFACE_SHIFT)
            | ((self.trunk_distance as u16 & mask(DISTANCE_BITS)) << DISTANCE_SHIFT)
    }

    /// Unpacks a 16-bit value. Returns `None` for the unused kind `3`.
    pub fn unpack(packed: u16) -> Option<Self> {
        let kind = num::FromPrimitive::from_u16(packed & mask(KIND_BITS))?;
        Some(TreeValue {
            kind,
            trunk_height: ((packed >> HEIGHT_SHIFT) & mask(HEIGHT_BITS)) as u8,
            trunk_surface_offset: ((packed >> SURFACE_SHIFT) & mask(SURFACE_BITS)) as u8,
            trunk_distance: ((packed >> DISTANCE_SHIFT) & mask(DISTANCE_BITS)) as u8,
        })
    }

    /// Whether voxel height `y` of this column is trunk wood.
    pub fn is_trunk_at(&self, y: i32, surface_y: i32) -> bool {
        self.kind == TreeKind::Trunk && y >= surface_y && y < surface_y + self.trunk_height as i32
    }

    /// Whether voxel `(x, y, z)` of this column is a leaf.
    ///
    /// The canopy is a function of the packed fields and a per-voxel hash, so any
    /// holder of the value derives the same leaves.
    pub fn is_leaf_at(&self, seed: &str, x: i32, y: i32, z: i32) -> bool {
        let top = self.top();
        match (self.kind, self.trunk_distance) {
            (TreeKind::Empty, _) => false,
            (TreeKind::Trunk, _) => {
                y == top || (y == top + 1 && voxel_chance(seed, x, y, z) < TIP_LEAF_PROBABILITY)
            }
            (TreeKind::Leaf, 0 | 1) => (top - 3..=top).contains(&y),
            (TreeKind::Leaf, 2) => (top - 3..top).contains(&y),
            (TreeKind::Leaf, _) => {
                (top - 2..top).contains(&y) && voxel_chance(seed, x, y, z) < OUTER_LEAF_PROBABILITY
            }
        }
    }
}

impl Default for TreeValue {
    fn default() -> Self {
        TreeValue::EMPTY
    }
}

/// Deterministic value in `[0, 1)` for a voxel.
fn voxel_chance(seed: &str, x: i32, y: i32, z: i32) -> f64 {
    fastrand::Rng::with_seed(hash_seed(&format!("{seed}_{x}_{y}_{z}_leaf"))).f64()
}
