//! # Chunk Creation Module
//!
//! This module builds chunks from the terrain fields.
//!
//! Generation runs in two passes over the chunk:
//! 1. **Terrain**: a voxel under the column surface with positive density is solid.
//!    Its type depends on its depth below the surface: grass (or snow high up) on
//!    top, a few layers of dirt, stone below. Low-lying columns get sand instead.
//! 2. **Features**: air below sea level and above the column surface fills with
//!    water; remaining air takes trunk or leaf blocks from the tree footprint.
//!
//! The `ChunkCreationIterator` is the builder the terrain pass pushes blocks into,
//! in flat-index order.

use bitvec::vec::BitVec;

use crate::engine_state::noise::shape_maps::{ShapeMaps, SEA_LEVEL, SNOW_HEIGHT};
use crate::engine_state::voxels::block::{block_type::BlockType, Block};
use crate::engine_state::voxels::trees::TreeFootprint;

use super::{Chunk, ChunkId, CHUNK_HEIGHT, CHUNK_SIZE, CHUNK_WIDTH};

/// Depth of the dirt (or sand) layer, counting the surface block.
const TOPSOIL_DEPTH: i32 = 3;

/// A builder that fills a chunk one block at a time in flat-index order
/// (`x` fastest, then `z`, then `y`).
pub struct ChunkCreationIterator {
    id: ChunkId,
    solid_array: BitVec,
    blocks: Vec<Block>,
}

impl ChunkCreationIterator {
    /// Creates a new `ChunkCreationIterator` for building chunk `id`.
    pub fn new(id: ChunkId) -> Self {
        ChunkCreationIterator {
            id,
            solid_array: BitVec::with_capacity(CHUNK_SIZE),
            blocks: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    /// Appends the next block.
    pub fn push_block_type(&mut self, block_type: BlockType) {
        self.solid_array.push(block_type.is_visible());
        self.blocks.push(Block::new(block_type));
    }

    /// Finalizes the chunk. Positions that were never pushed are air.
    pub fn return_chunk(mut self) -> Chunk {
        if self.blocks.len() < CHUNK_SIZE {
            self.solid_array.resize(CHUNK_SIZE, false);
            self.blocks.resize(CHUNK_SIZE, Block::default());
        }
        Chunk {
            id: self.id,
            solid_array: self.solid_array,
            blocks: self.blocks,
            dirty: false,
        }
    }
}

/// Block the terrain pass places at `y` in a column with surface height `surface`.
pub fn terrain_block(shapes: &mut ShapeMaps, x: i32, y: i32, z: i32, surface: i32) -> BlockType {
    if y >= surface || !shapes.is_solid(x, y, z) {
        return BlockType::AIR;
    }

    let depth = surface - 1 - y;
    if surface <= SEA_LEVEL + 1 {
        return if depth < TOPSOIL_DEPTH {
            BlockType::SAND
        } else {
            BlockType::STONE
        };
    }

    match depth {
        0 if surface > SNOW_HEIGHT => BlockType::SNOW,
        0 => BlockType::GRASS,
        d if d < TOPSOIL_DEPTH => BlockType::DIRT,
        _ => BlockType::STONE,
    }
}

/// Block the features pass places in an air voxel.
pub fn feature_block(trees: &TreeFootprint, x: i32, y: i32, z: i32, surface: i32) -> BlockType {
    if y < SEA_LEVEL {
        return if y >= surface {
            BlockType::WATER
        } else {
            BlockType::AIR
        };
    }
    if trees.should_spawn_trunk(x, y, z, surface) {
        BlockType::WOOD
    } else if trees.should_spawn_leaf(x, y, z) {
        BlockType::LEAVES
    } else {
        BlockType::AIR
    }
}

impl Chunk {
    /// Generates chunk `id` from the terrain fields and the tree footprint of its column.
    pub fn generate(id: ChunkId, shapes: &mut ShapeMaps, trees: &TreeFootprint) -> Self {
        let origin = id.origin();

        let mut surfaces = [0i32; (CHUNK_WIDTH * CHUNK_WIDTH) as usize];
        for lz in 0..CHUNK_WIDTH {
            for lx in 0..CHUNK_WIDTH {
                surfaces[(lx + CHUNK_WIDTH * lz) as usize] =
                    shapes.surface_height(origin.x + lx, origin.z + lz);
            }
        }

        let mut cci = ChunkCreationIterator::new(id);
        for ly in 0..CHUNK_HEIGHT {
            for lz in 0..CHUNK_WIDTH {
                for lx in 0..CHUNK_WIDTH {
                    let surface = surfaces[(lx + CHUNK_WIDTH * lz) as usize];
                    cci.push_block_type(terrain_block(
                        shapes,
                        origin.x + lx,
                        origin.y + ly,
                        origin.z + lz,
                        surface,
                    ));
                }
            }
        }
        let mut chunk = cci.return_chunk();

        for ly in 0..CHUNK_HEIGHT {
            for lz in 0..CHUNK_WIDTH {
                for lx in 0..CHUNK_WIDTH {
                    if chunk.blocks[Chunk::local_index(lx, ly, lz)].block_type() != BlockType::AIR {
                        continue;
                    }
                    let surface = surfaces[(lx + CHUNK_WIDTH * lz) as usize];
                    let feature =
                        feature_block(trees, origin.x + lx, origin.y + ly, origin.z + lz, surface);
                    if feature != BlockType::AIR {
                        chunk.set_local(lx, ly, lz, feature);
                    }
                }
            }
        }

        chunk
    }
}
