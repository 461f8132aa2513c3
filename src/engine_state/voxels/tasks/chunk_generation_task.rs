//! # Chunk Generation Task
//!
//! This module defines the `ChunkGenerationTask`, which builds one chunk and its
//! geometry on a worker thread.
//!
//! The worker shares nothing with the coordinating thread. It rebuilds its own
//! `ShapeMaps` from the seed, and takes the chunk's tree footprint by value because
//! tree placement depends on neighbouring columns the worker never sees. Borders are
//! meshed without neighbouring voxels, using the shape maps as a stand-in.

use crate::engine_state::noise::shape_maps::{FieldOverrides, ShapeMaps};
use crate::engine_state::rendering::meshing::{ChunkGeometry, ChunkGeometryBuilder, Isolated};
use crate::engine_state::task_management::Task;
use crate::engine_state::voxels::chunk::{Chunk, ChunkId};
use crate::engine_state::voxels::trees::TreeFootprint;

/// Identifies one generation request.
///
/// The token distinguishes a request from an earlier, expired request for the same
/// chunk, so late results can be recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationTicket {
    pub id: ChunkId,
    pub token: u64,
}

/// A task that generates a chunk and its geometry.
#[derive(Debug, Clone)]
pub struct ChunkGenerationTask {
    ticket: GenerationTicket,
    seed: String,
    overrides: FieldOverrides,
    max_regions: usize,
    footprint: TreeFootprint,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `ticket` - The chunk to generate and the request it answers
    /// * `seed` - World seed
    /// * `overrides` - Shape field overrides in effect for the world
    /// * `max_regions` - Region cache bound for the worker's own shape maps
    /// * `footprint` - Tree classifications of the chunk's columns
    pub fn new(
        ticket: GenerationTicket,
        seed: &str,
        overrides: FieldOverrides,
        max_regions: usize,
        footprint: TreeFootprint,
    ) -> Self {
        ChunkGenerationTask {
            ticket,
            seed: seed.to_string(),
            overrides,
            max_regions,
            footprint,
        }
    }
}

/// A freshly generated chunk with the geometry built from it.
#[derive(Debug)]
pub struct GeneratedChunk {
    pub chunk: Chunk,
    pub geometry: ChunkGeometry,
}

impl Task for ChunkGenerationTask {
    type Key = GenerationTicket;
    type Output = GeneratedChunk;

    fn key(&self) -> GenerationTicket {
        self.ticket
    }

    fn process(self) -> GeneratedChunk {
        let mut shapes = ShapeMaps::with_overrides(&self.seed, self.overrides, self.max_regions);
        let chunk = Chunk::generate(self.ticket.id, &mut shapes, &self.footprint);
        let geometry = ChunkGeometryBuilder::build(&chunk, &Isolated, &mut shapes);
        GeneratedChunk { chunk, geometry }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::trees::TreeMap;

    #[test]
    fn worker_output_matches_coordinator_generation() {
        let id = ChunkId::new(1, 0, -1);
        let mut shapes = ShapeMaps::new("abc", 64);
        let mut trees = TreeMap::new("abc", 64);
        let footprint = trees.footprint(&mut shapes, id);

        let task = ChunkGenerationTask::new(
            GenerationTicket { id, token: 7 },
            "abc",
            FieldOverrides::default(),
            64,
            footprint.clone(),
        );
        assert_eq!(task.key().token, 7);
        let generated = task.process();

        let local = Chunk::generate(id, &mut shapes, &footprint);
        assert_eq!(generated.chunk.as_bytes(), local.as_bytes());
        let geometry = ChunkGeometryBuilder::build(&local, &Isolated, &mut shapes);
        assert_eq!(generated.geometry, geometry);
    }
}
