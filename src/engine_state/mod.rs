//! # Engine State Module
//!
//! The terrain core: everything needed to turn a seed into streamed, editable chunk
//! geometry.
//!
//! ## Key Components
//!
//! * `noise` - Seeded noise fields and the region-cached shape maps built on them
//! * `voxels` - Blocks, chunks, tree placement, storage and the chunk manager
//! * `rendering` - Chunk geometry building and the renderer boundary
//! * `task_management` - The worker pool that generates chunks off-thread
//! * `terrain_loader` - Streams chunks around a moving centre
//!
//! ## Architecture
//!
//! One coordinating thread owns the `ChunkManager`, its caches and the renderer.
//! Generation is the only work that crosses to the worker pool; every task carries
//! what it needs and returns owned results, so no state is shared between threads.

pub mod noise;
pub mod rendering;
pub mod task_management;
pub mod terrain_loader;
pub mod voxels;
