//! # Tree Footprint
//!
//! The packed tree classifications of one chunk column, computed on the
//! coordinating thread and shipped to a generation worker by value.

use super::tree_map::MAX_TRUNK_HEIGHT;
use super::tree_value::TreeValue;
use crate::engine_state::noise::shape_maps::{MAX_SURFACE_HEIGHT, SEA_LEVEL};
use crate::engine_state::voxels::chunk::{ChunkId, CHUNK_HEIGHT, CHUNK_WIDTH};

/// Packed classifications of a `CHUNK_WIDTH × CHUNK_WIDTH` column footprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeFootprint {
    seed: String,
    origin_x: i32,
    origin_z: i32,
    values: Vec<u16>,
}

impl TreeFootprint {
    /// A footprint with no trees.
    pub fn empty(seed: &str, origin_x: i32, origin_z: i32) -> Self {
        TreeFootprint {
            seed: seed.to_string(),
            origin_x,
            origin_z,
            values: vec![TreeValue::EMPTY.pack(); (CHUNK_WIDTH * CHUNK_WIDTH) as usize],
        }
    }

    /// Wraps packed values laid out `x + CHUNK_WIDTH * z`. Missing entries read as empty.
    pub fn from_packed(seed: &str, origin_x: i32, origin_z: i32, values: Vec<u16>) -> Self {
        TreeFootprint {
            seed: seed.to_string(),
            origin_x,
            origin_z,
            values,
        }
    }

    /// Whether any voxel of chunk `id` could belong to a tree.
    pub fn can_hold_trees(id: ChunkId) -> bool {
        let bottom = id.y * CHUNK_HEIGHT;
        let top = bottom + CHUNK_HEIGHT - 1;
        // trunks start at SEA_LEVEL + 2 at the lowest; the tip leaf sits one above the trunk top
        top >= SEA_LEVEL + 2 && bottom <= MAX_SURFACE_HEIGHT + MAX_TRUNK_HEIGHT as i32 + 1
    }

    /// Classification of world column `(x, z)`. Columns outside the footprint are empty.
    pub fn value_at(&self, x: i32, z: i32) -> TreeValue {
        let (lx, lz) = (x - self.origin_x, z - self.origin_z);
        if !(0..CHUNK_WIDTH).contains(&lx) || !(0..CHUNK_WIDTH).contains(&lz) {
            return TreeValue::EMPTY;
        }
        self.values
            .get((lx + CHUNK_WIDTH * lz) as usize)
            .and_then(|packed| TreeValue::unpack(*packed))
            .unwrap_or(TreeValue::EMPTY)
    }

    pub fn should_spawn_trunk(&self, x: i32, y: i32, z: i32, surface_y: i32) -> bool {
        self.value_at(x, z).is_trunk_at(y, surface_y)
    }

    pub fn should_spawn_leaf(&self, x: i32, y: i32, z: i32) -> bool {
        self.value_at(x, z).is_leaf_at(&self.seed, x, y, z)
    }

    /// Whether no column holds anything.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|packed| *packed == TreeValue::EMPTY.pack())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_span_gates_trees() {
        assert!(!TreeFootprint::can_hold_trees(ChunkId::new(0, -1, 0)));
        assert!(TreeFootprint::can_hold_trees(ChunkId::new(0, 0, 0)));
        assert!(TreeFootprint::can_hold_trees(ChunkId::new(0, 6, 0)));
        assert!(!TreeFootprint::can_hold_trees(ChunkId::new(0, 7, 0)));
    }

    #[test]
    fn outside_columns_are_empty() {
        let trunk = TreeValue::trunk(5, 10).unwrap();
        let mut values = vec![0; 256];
        values[0] = trunk.pack();
        let footprint = TreeFootprint::from_packed("abc", 16, 32, values);

        assert_eq!(footprint.value_at(16, 32), trunk);
        assert_eq!(footprint.value_at(15, 32), TreeValue::EMPTY);
        assert!(footprint.should_spawn_trunk(16, 12, 32, 10));
        assert!(!footprint.should_spawn_trunk(17, 12, 32, 10));
        assert!(!footprint.is_empty());
    }
}
