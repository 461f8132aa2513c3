//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world and their
//! rendering properties: transparency, base colour and atlas tiles.

use num_derive::FromPrimitive;

use super::block_side::BlockSide;
use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// The discriminants are the on-disk voxel bytes. Reordering them invalidates
/// every stored chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Empty space. Never meshed.
    AIR = 0,

    /// Surface block of dry land below the snow line.
    GRASS = 1,

    /// The few blocks under the grass.
    DIRT = 2,

    /// Everything deeper.
    STONE = 3,

    /// Beaches and sea floor.
    SAND = 4,

    /// Fills air below sea level. Only its top face at sea level is meshed.
    WATER = 5,

    /// Tree trunks.
    WOOD = 6,

    /// Tree canopy.
    LEAVES = 7,

    /// Surface block above the snow line.
    SNOW = 8,
}

/// Atlas tile per face, in [`BlockSide`] order `[FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]`,
/// indexed by block type.
pub static BLOCK_TYPE_TO_TEXTURE_INDICES: [[u32; 6]; 9] = [
    [0, 0, 0, 0, 0, 0],       // AIR (unused)
    [2, 2, 1, 3, 2, 2],       // GRASS (top: 3, bottom: dirt, sides: 2)
    [1, 1, 1, 1, 1, 1],       // DIRT
    [4, 4, 4, 4, 4, 4],       // STONE
    [5, 5, 5, 5, 5, 5],       // SAND
    [6, 6, 6, 6, 6, 6],       // WATER
    [8, 8, 9, 9, 8, 8],       // WOOD (rings on top and bottom)
    [10, 10, 10, 10, 10, 10], // LEAVES
    [12, 12, 1, 11, 12, 12],  // SNOW (top: 11, bottom: dirt)
];

impl BlockType {
    /// Decodes a stored voxel byte. Returns `None` for bytes no block type uses.
    pub fn from_id(id: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_u8(id)
    }

    /// The voxel byte of this type.
    pub fn id(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Whether the block produces any geometry at all.
    pub fn is_visible(self) -> bool {
        self != BlockType::AIR
    }

    /// Whether faces behind this block can be seen through it.
    ///
    /// Transparent blocks are meshed into the transparent buffer, and they never
    /// hide the faces of their neighbours.
    pub fn is_transparent(self) -> bool {
        matches!(self, BlockType::AIR | BlockType::WATER | BlockType::LEAVES)
    }

    /// Whether the block fully hides the faces behind it.
    pub fn is_opaque(self) -> bool {
        !self.is_transparent()
    }

    /// Base vertex colour, before ambient occlusion.
    pub fn color(self) -> [f32; 3] {
        match self {
            BlockType::AIR => [0.0, 0.0, 0.0],
            BlockType::GRASS => [0.42, 0.71, 0.29],
            BlockType::DIRT => [0.55, 0.38, 0.24],
            BlockType::STONE => [0.5, 0.5, 0.52],
            BlockType::SAND => [0.86, 0.8, 0.56],
            BlockType::WATER => [0.2, 0.4, 0.8],
            BlockType::WOOD => [0.45, 0.33, 0.2],
            BlockType::LEAVES => [0.25, 0.55, 0.2],
            BlockType::SNOW => [0.95, 0.96, 0.98],
        }
    }

    /// Atlas tile index of one face.
    pub fn texture_index(self, side: BlockSide) -> u32 {
        BLOCK_TYPE_TO_TEXTURE_INDICES[self as usize][side as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for id in 0..=8 {
            let block_type = BlockType::from_id(id).unwrap();
            assert_eq!(block_type.id(), id);
        }
        assert_eq!(BlockType::from_id(9), None);
        assert_eq!(BlockType::from_id(255), None);
    }

    #[test]
    fn water_and_leaves_are_transparent() {
        assert!(BlockType::WATER.is_transparent());
        assert!(BlockType::LEAVES.is_transparent());
        assert!(BlockType::STONE.is_opaque());
        assert!(!BlockType::AIR.is_visible());
    }

    #[test]
    fn grass_top_differs_from_sides() {
        assert_ne!(
            BlockType::GRASS.texture_index(BlockSide::TOP),
            BlockType::GRASS.texture_index(BlockSide::FRONT)
        );
        assert_eq!(
            BlockType::GRASS.texture_index(BlockSide::BOTTOM),
            BlockType::DIRT.texture_index(BlockSide::TOP)
        );
    }
}
