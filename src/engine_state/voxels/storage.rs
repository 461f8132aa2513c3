//! # Chunk Storage
//!
//! The persistence boundary for edited chunks. Clean chunks are never stored: they
//! are reproducible from the seed. Dirty chunks are written on eviction together
//! with their geometry, and restored instead of regenerated the next time they load.
//!
//! ## Record Format
//!
//! A stored chunk is one JSON record holding the format version, the chunk id, the
//! voxel bytes and, per role, the raw bytes of each geometry buffer. Records written
//! by a different `STORAGE_FORMAT_VERSION` are rejected: field formulas or block ids
//! may have changed since, and the chunk would no longer match its neighbours.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine_state::rendering::meshing::GeometryBuffers;
use crate::engine_state::voxels::chunk::{Chunk, ChunkId};
use crate::error::StorageError;

/// Version written into every stored record. Bump when terrain generation, block ids
/// or the record layout change.
pub const STORAGE_FORMAT_VERSION: u32 = 1;

/// Geometry restored from storage. A role is `None` when nothing was stored for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredGeometry {
    pub solid: Option<GeometryBuffers>,
    pub transparent: Option<GeometryBuffers>,
}

/// The storage collaborator, keyed by chunk id.
pub trait ChunkStorage {
    /// Loads the voxels of a stored chunk. `Ok(None)` if nothing is stored for `id`.
    fn get(&self, id: ChunkId) -> Result<Option<Chunk>, StorageError>;

    /// Loads the geometry stored alongside chunk `id`.
    fn get_geometry(&self, id: ChunkId) -> Result<Option<StoredGeometry>, StorageError>;

    /// Stores a chunk and, when present, its geometry, replacing any earlier record.
    fn put(
        &mut self,
        chunk: &Chunk,
        solid: Option<&GeometryBuffers>,
        transparent: Option<&GeometryBuffers>,
    ) -> Result<(), StorageError>;
}

/// Byte views of one geometry buffer set.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
struct StoredBuffers {
    positions: Vec<u8>,
    normals: Vec<u8>,
    uvs: Vec<u8>,
    colors: Vec<u8>,
    indices: Vec<u8>,
}

impl StoredBuffers {
    fn encode(buffers: &GeometryBuffers) -> Self {
        StoredBuffers {
            positions: bytemuck::cast_slice(&buffers.positions).to_vec(),
            normals: bytemuck::cast_slice(&buffers.normals).to_vec(),
            uvs: bytemuck::cast_slice(&buffers.uvs).to_vec(),
            colors: bytemuck::cast_slice(&buffers.colors).to_vec(),
            indices: bytemuck::cast_slice(&buffers.indices).to_vec(),
        }
    }

    fn decode(&self, id: ChunkId) -> Result<GeometryBuffers, StorageError> {
        Ok(GeometryBuffers {
            positions: read_pod(id, "positions", &self.positions)?,
            normals: read_pod(id, "normals", &self.normals)?,
            uvs: read_pod(id, "uvs", &self.uvs)?,
            colors: read_pod(id, "colors", &self.colors)?,
            indices: read_pod(id, "indices", &self.indices)?,
        })
    }
}

/// Reads 4-byte values from a byte buffer of arbitrary alignment.
fn read_pod<T: bytemuck::Pod>(id: ChunkId, field: &str, bytes: &[u8]) -> Result<Vec<T>, StorageError> {
    let size = std::mem::size_of::<T>();
    if bytes.len() % size != 0 {
        return Err(StorageError::Corrupt {
            id,
            reason: format!("{} has {} bytes, not a multiple of {}", field, bytes.len(), size),
        });
    }
    Ok(bytes
        .chunks_exact(size)
        .map(bytemuck::pod_read_unaligned::<T>)
        .collect())
}

/// One stored chunk.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredChunkRecord {
    version: u32,
    id: ChunkId,
    voxels: Vec<u8>,
    solid: Option<StoredBuffers>,
    transparent: Option<StoredBuffers>,
}

impl StoredChunkRecord {
    pub fn new(
        chunk: &Chunk,
        solid: Option<&GeometryBuffers>,
        transparent: Option<&GeometryBuffers>,
    ) -> Self {
        StoredChunkRecord {
            version: STORAGE_FORMAT_VERSION,
            id: chunk.id,
            voxels: chunk.as_bytes().to_vec(),
            solid: solid.map(StoredBuffers::encode),
            transparent: transparent.map(StoredBuffers::encode),
        }
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a record and checks its format version.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let record: StoredChunkRecord = serde_json::from_str(json)?;
        if record.version != STORAGE_FORMAT_VERSION {
            return Err(StorageError::VersionMismatch {
                id: record.id,
                found: record.version,
                expected: STORAGE_FORMAT_VERSION,
            });
        }
        Ok(record)
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The stored voxels as a clean chunk.
    pub fn chunk(&self) -> Result<Chunk, StorageError> {
        Chunk::from_bytes(self.id, &self.voxels)
    }

    pub fn geometry(&self) -> Result<StoredGeometry, StorageError> {
        Ok(StoredGeometry {
            solid: self.solid.as_ref().map(|b| b.decode(self.id)).transpose()?,
            transparent: self
                .transparent
                .as_ref()
                .map(|b| b.decode(self.id))
                .transpose()?,
        })
    }
}

/// A [`ChunkStorage`] holding serialized records in memory.
///
/// Writes can be made to fail on demand, which lets callers exercise their
/// error paths.
#[derive(Debug, Default)]
pub struct MemoryChunkStorage {
    records: HashMap<ChunkId, String>,
    fail_writes: bool,
}

impl MemoryChunkStorage {
    pub fn new() -> Self {
        MemoryChunkStorage::default()
    }

    /// Makes every following `put` fail (or succeed again).
    pub fn set_fail_writes(&mut self, fail_writes: bool) {
        self.fail_writes = fail_writes;
    }

    pub fn contains(&self, id: ChunkId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The serialized record of `id`.
    pub fn raw_record(&self, id: ChunkId) -> Option<&str> {
        self.records.get(&id).map(String::as_str)
    }

    /// Stores a serialized record as is, bypassing encoding.
    pub fn insert_raw_record(&mut self, id: ChunkId, json: String) {
        self.records.insert(id, json);
    }

    fn record(&self, id: ChunkId) -> Result<Option<StoredChunkRecord>, StorageError> {
        self.records
            .get(&id)
            .map(|json| StoredChunkRecord::from_json(json))
            .transpose()
    }
}

impl ChunkStorage for MemoryChunkStorage {
    fn get(&self, id: ChunkId) -> Result<Option<Chunk>, StorageError> {
        self.record(id)?.map(|record| record.chunk()).transpose()
    }

    fn get_geometry(&self, id: ChunkId) -> Result<Option<StoredGeometry>, StorageError> {
        self.record(id)?.map(|record| record.geometry()).transpose()
    }

    fn put(
        &mut self,
        chunk: &Chunk,
        solid: Option<&GeometryBuffers>,
        transparent: Option<&GeometryBuffers>,
    ) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Backend {
                id: chunk.id,
                reason: "writes are disabled".to_string(),
            });
        }
        let json = StoredChunkRecord::new(chunk, solid, transparent).to_json()?;
        debug!("Stored chunk {} ({} bytes)", chunk.id, json.len());
        self.records.insert(chunk.id, json);
        Ok(())
    }
}
