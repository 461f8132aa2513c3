//! # Voxel World
//!
//! Voxel data and the lifecycle of the chunks that hold it.
//!
//! ## Architecture
//!
//! * **Block**: voxel types, their faces and colours
//! * **Chunk**: fixed-size 16x16x16 voxel volumes and the terrain pass that fills them
//! * **Trees**: exclusion-radius tree placement, classified per column
//! * **Tasks**: chunk generation work shipped to the worker pool
//! * **Storage**: the persistence boundary for edited chunks
//! * **Chunk Manager**: dispatch, integration, edits and eviction of chunks
//!
//! ## Data Flow
//!
//! 1. The chunk manager receives a request for a chunk
//! 2. Edited chunks are restored from storage; others are generated on a worker
//! 3. Finished chunks come back with their geometry and are handed to the renderer
//! 4. Edits re-mesh the touched chunks on the coordinating thread
//! 5. Evicted chunks are saved if they were edited, then dropped
//!
//! ## Thread Safety
//!
//! Chunks and caches are owned by the coordinating thread. Workers receive
//! everything a generation needs by value and return owned results.

pub mod block;
pub mod chunk;
pub mod chunk_manager;
pub mod storage;
pub mod tasks;
pub mod trees;
