//! # Chunk Iteration Module
//!
//! This module provides an iterator over the non-air blocks of a chunk.
//!
//! The `ChunkBlockIterator` walks the set bits of the chunk's `solid_array`, so runs
//! of air cost one word scan instead of one block decode each. Mesh building spends
//! most of its time here on mostly-empty chunks above the surface.

use bitvec::slice::IterOnes;
use bitvec::order::Lsb0;
use cgmath::Point3;

use crate::engine_state::voxels::block::block_type::BlockType;

use super::{Chunk, CHUNK_PLANE_SIZE, CHUNK_WIDTH};

/// An iterator over all non-air blocks in a chunk, yielding local positions.
pub struct ChunkBlockIterator<'a> {
    chunk_ref: &'a Chunk,
    ones: IterOnes<'a, usize, Lsb0>,
}

impl<'a> ChunkBlockIterator<'a> {
    /// Creates a new `ChunkBlockIterator` positioned before the first non-air block.
    pub fn new(chunk_ref: &'a Chunk) -> Self {
        ChunkBlockIterator {
            chunk_ref,
            ones: chunk_ref.solid_array.iter_ones(),
        }
    }
}

impl Iterator for ChunkBlockIterator<'_> {
    type Item = (Point3<i32>, BlockType);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.ones.next()?;
        let flat = index as i32;
        let position = Point3::new(
            flat % CHUNK_WIDTH,
            flat / CHUNK_PLANE_SIZE,
            (flat / CHUNK_WIDTH) % CHUNK_WIDTH,
        );
        Some((position, self.chunk_ref.blocks[index].block_type()))
    }
}

impl Chunk {
    /// Iterates over the non-air blocks of the chunk in flat-index order.
    pub fn iter_blocks(&self) -> ChunkBlockIterator<'_> {
        ChunkBlockIterator::new(self)
    }
}
