//! # Block Module
//!
//! This module provides the core block-related functionality for the voxel engine.
//! It includes block type definitions, block face handling, and the compact block
//! cell stored by chunks.

use block_type::BlockType;

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in memory.
/// This is used for efficient storage and serialization of block data.
pub type BlockTypeSize = u8;

/// Represents a single voxel block in the world.
///
/// This is a lightweight structure that stores only the essential block data.
/// The actual block properties are looked up from the block type.
///
/// # Memory Layout
/// The `#[repr(C)]` attribute and the `Pod` derive let a slice of blocks be viewed
/// as the raw voxel byte array used for persistence, without copying.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq, Eq)]
pub struct Block {
    /// The type of this block, encoded as a `BlockTypeSize` for compact storage.
    pub block_type: BlockTypeSize,
}

impl Block {
    /// Creates a new block of the specified type.
    pub fn new(block_type: BlockType) -> Self {
        Block {
            block_type: block_type as BlockTypeSize,
        }
    }

    /// Decodes the block type. Unknown bytes read as air; chunks validate their
    /// bytes when restored, so this only matters for hand-built blocks.
    pub fn block_type(&self) -> BlockType {
        BlockType::from_id(self.block_type).unwrap_or(BlockType::AIR)
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::new(BlockType::AIR)
    }
}
