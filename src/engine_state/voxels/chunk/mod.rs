//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a fixed `16×16×16` grid of voxels, the
//! unit of generation, meshing and persistence.
//!
//! ## Storage
//!
//! - `blocks`: one byte per voxel, flat-indexed `x + W * (z + W * y)`. O(1) reads and
//!   writes, and viewable as the raw byte array that storage persists.
//! - `solid_array`: one bit per voxel, set for every non-air block. Mesh building walks
//!   its set bits and skips air without decoding blocks.
//!
//! ## Coordinates
//!
//! Chunk ids are world coordinates floor-divided by the chunk dimensions, so voxel
//! `-1` lives in chunk `-1` at local coordinate `15`. Reads outside a chunk's own
//! bounds return `None`, never an error: mesh building probes one voxel past every
//! face and treats `None` as unknown.

use std::fmt;

use bitvec::prelude::BitVec;
use cgmath::Point3;
use serde::{Deserialize, Serialize};

use super::block::block_type::BlockType;
use super::block::Block;
use crate::error::StorageError;

pub mod chunk_creation;
pub mod chunk_iteration;

/// Width and depth of a chunk in blocks.
pub const CHUNK_WIDTH: i32 = 16;
/// Height of a chunk in blocks.
pub const CHUNK_HEIGHT: i32 = 16;
/// The number of blocks in a single horizontal plane of a chunk.
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_WIDTH * CHUNK_WIDTH;
/// The total number of blocks in a chunk.
pub const CHUNK_SIZE: usize = (CHUNK_PLANE_SIZE * CHUNK_HEIGHT) as usize;

/// Identifies a chunk by its position in chunk units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkId {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        ChunkId { x, y, z }
    }

    /// Chunk containing the voxel at world block position `block`.
    pub fn from_block(block: Point3<i32>) -> Self {
        ChunkId {
            x: block.x.div_euclid(CHUNK_WIDTH),
            y: block.y.div_euclid(CHUNK_HEIGHT),
            z: block.z.div_euclid(CHUNK_WIDTH),
        }
    }

    /// Chunk containing a continuous world position.
    pub fn from_world(position: Point3<f32>) -> Self {
        Self::from_block(block_at(position))
    }

    /// World position of the chunk's `(0, 0, 0)` voxel.
    pub fn origin(&self) -> Point3<i32> {
        Point3::new(
            self.x * CHUNK_WIDTH,
            self.y * CHUNK_HEIGHT,
            self.z * CHUNK_WIDTH,
        )
    }

    /// The id `(dx, dy, dz)` chunks away.
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        ChunkId::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Whether world block `block` lies inside this chunk.
    pub fn contains(&self, block: Point3<i32>) -> bool {
        Self::from_block(block) == *self
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Voxel containing a continuous world position.
pub fn block_at(position: Point3<f32>) -> Point3<i32> {
    Point3::new(
        position.x.floor() as i32,
        position.y.floor() as i32,
        position.z.floor() as i32,
    )
}

/// Represents a 16x16x16 collection of voxel blocks in the world.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    /// The id of this chunk, in chunk coordinates.
    pub id: ChunkId,

    /// One bit per voxel, set where the block is not air.
    solid_array: BitVec,

    /// Every voxel of the chunk, flat-indexed by [`Chunk::local_index`].
    blocks: Vec<Block>,

    /// Set once the chunk is edited after generation or restore. Dirty chunks are
    /// persisted before they are dropped.
    dirty: bool,
}

impl Chunk {
    /// Creates a new, completely empty chunk (all blocks are air).
    pub fn empty(id: ChunkId) -> Self {
        Chunk {
            id,
            solid_array: BitVec::repeat(false, CHUNK_SIZE),
            blocks: vec![Block::default(); CHUNK_SIZE],
            dirty: false,
        }
    }

    /// Rebuilds a chunk from its persisted voxel bytes.
    ///
    /// # Errors
    /// `StorageError::Corrupt` if the byte count is wrong or a byte is not a block type.
    pub fn from_bytes(id: ChunkId, bytes: &[u8]) -> Result<Self, StorageError> {
        if bytes.len() != CHUNK_SIZE {
            return Err(StorageError::Corrupt {
                id,
                reason: format!("expected {} voxel bytes, found {}", CHUNK_SIZE, bytes.len()),
            });
        }

        let mut solid_array = BitVec::with_capacity(CHUNK_SIZE);
        for (index, byte) in bytes.iter().enumerate() {
            let block_type = BlockType::from_id(*byte).ok_or_else(|| StorageError::Corrupt {
                id,
                reason: format!("unknown block type {} at voxel {}", byte, index),
            })?;
            solid_array.push(block_type.is_visible());
        }

        Ok(Chunk {
            id,
            solid_array,
            blocks: bytemuck::cast_slice::<u8, Block>(bytes).to_vec(),
            dirty: false,
        })
    }

    /// The voxel bytes of this chunk, in flat-index order.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.blocks)
    }

    /// Flat index of local coordinates. Callers guarantee they are in bounds.
    pub fn local_index(x: i32, y: i32, z: i32) -> usize {
        (x + CHUNK_WIDTH * (z + CHUNK_WIDTH * y)) as usize
    }

    /// Whether local coordinates lie inside the chunk.
    pub fn in_bounds(x: i32, y: i32, z: i32) -> bool {
        (0..CHUNK_WIDTH).contains(&x) && (0..CHUNK_HEIGHT).contains(&y) && (0..CHUNK_WIDTH).contains(&z)
    }

    /// Block at local coordinates, or `None` outside the chunk.
    pub fn get_local(&self, x: i32, y: i32, z: i32) -> Option<BlockType> {
        if !Self::in_bounds(x, y, z) {
            return None;
        }
        Some(self.blocks[Self::local_index(x, y, z)].block_type())
    }

    /// Block at a world position, or `None` if the position belongs to another chunk.
    pub fn get_block(&self, block: Point3<i32>) -> Option<BlockType> {
        let origin = self.id.origin();
        self.get_local(block.x - origin.x, block.y - origin.y, block.z - origin.z)
    }

    /// Sets the block at a world position and marks the chunk dirty.
    ///
    /// Returns `false`, changing nothing, if the position belongs to another chunk.
    pub fn set_block(&mut self, block: Point3<i32>, block_type: BlockType) -> bool {
        let origin = self.id.origin();
        let (x, y, z) = (block.x - origin.x, block.y - origin.y, block.z - origin.z);
        if !Self::in_bounds(x, y, z) {
            return false;
        }
        self.set_local(x, y, z, block_type);
        self.dirty = true;
        true
    }

    /// Writes a block without touching the dirty flag. Used while generating.
    pub(crate) fn set_local(&mut self, x: i32, y: i32, z: i32, block_type: BlockType) {
        let index = Self::local_index(x, y, z);
        self.blocks[index] = Block::new(block_type);
        self.solid_array.set(index, block_type.is_visible());
    }

    /// Whether the chunk holds no block at all.
    pub fn is_empty(&self) -> bool {
        self.solid_array.not_any()
    }

    /// Number of non-air blocks.
    pub fn visible_count(&self) -> usize {
        self.solid_array.count_ones()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
