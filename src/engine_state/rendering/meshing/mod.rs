//! Geometry generation for voxel chunks.
//!
//! This module turns a chunk's voxels into two renderer-agnostic buffer sets: one
//! for opaque blocks and one for transparent blocks (water, leaves), so they can be
//! drawn in separate passes.
//!
//! # Architecture
//! - [`ChunkGeometryBuilder`]: walks the chunk's non-air voxels and emits one quad per
//!   visible face
//! - [`Face`]: a single quad with atlas UVs and ambient-occluded vertex colours
//! - [`GeometryBuffers`] / [`ChunkGeometry`]: flat attribute arrays ready for upload
//! - [`VoxelAccess`]: read access to voxels outside the chunk being built
//!
//! # Culling
//! A face is emitted when the voxel it looks at is transparent or unknown. Unknown
//! voxels (neighbouring chunks that are not loaded, or chunks built on a worker)
//! fall back to the shape maps: faces well below the neighbouring column's surface
//! are dropped, which removes most hidden geometry along chunk borders.
//!
//! # Ambient Occlusion
//! Each vertex samples the two edge neighbours and the diagonal neighbour in front
//! of its face. The count selects one of four brightness levels, and the quad is
//! split along the diagonal that keeps the shading symmetric.

mod builder;
mod face;
mod geometry;

use cgmath::Point3;

pub use builder::ChunkGeometryBuilder;
pub use face::{ao_level, Face, AO_CURVE, ATLAS_TILES};
pub use geometry::{ChunkGeometry, GeometryBuffers};

use crate::engine_state::voxels::block::block_type::BlockType;

/// Read access to voxels by world block position.
///
/// `None` means no data is available for that position.
pub trait VoxelAccess {
    fn block_at(&self, block: Point3<i32>) -> Option<BlockType>;
}

impl<F> VoxelAccess for F
where
    F: Fn(Point3<i32>) -> Option<BlockType>,
{
    fn block_at(&self, block: Point3<i32>) -> Option<BlockType> {
        self(block)
    }
}

/// No neighbouring voxels are known, as on a generation worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Isolated;

impl VoxelAccess for Isolated {
    fn block_at(&self, _block: Point3<i32>) -> Option<BlockType> {
        None
    }
}
