//! # Chunk Manager
//!
//! The `ChunkManager` owns every loaded chunk and drives its lifecycle:
//!
//! ```text
//! Unloaded ──request──▶ Processing ──result──▶ Loaded ──unload──▶ Unloaded
//!     │                     │                    ▲
//!     │                     └──timeout / error───┼──▶ Unloaded (retryable)
//!     └──stored record / synchronous load────────┘
//! ```
//!
//! ## Generation
//!
//! A request for an unloaded chunk first checks storage for an edited copy. If there
//! is none, a `ChunkGenerationTask` goes to the worker pool carrying the seed and the
//! chunk's tree footprint, which is computed here because tree placement reads the
//! neighbouring columns. At most one request per chunk is in flight; each carries a
//! token so results of expired or superseded requests are dropped as stale.
//!
//! ## Edits
//!
//! Block edits run synchronously on the coordinating thread. The edited chunk and
//! every loaded chunk within one voxel of the edit are re-meshed against their
//! loaded neighbours; a chunk left without geometry is unloaded.
//!
//! ## Eviction
//!
//! Unloading releases the chunk's region caches and returns its meshes to the pool.
//! Dirty chunks are written to storage first. If that write fails the chunk stays
//! loaded and dirty so the save can be retried.

use std::collections::{HashMap, HashSet};

use cgmath::{Point3, Vector3};
use log::{debug, info, warn};
use web_time::{Duration, Instant};

use crate::config::WorldConfig;
use crate::engine_state::noise::shape_maps::ShapeMaps;
use crate::engine_state::rendering::meshing::{ChunkGeometry, ChunkGeometryBuilder};
use crate::engine_state::rendering::{MeshPool, MeshRole, Renderer};
use crate::engine_state::task_management::{TaskManager, TaskOutcome};
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::chunk::{Chunk, ChunkId};
use crate::engine_state::voxels::storage::ChunkStorage;
use crate::engine_state::voxels::tasks::chunk_generation_task::{
    ChunkGenerationTask, GenerationTicket,
};
use crate::engine_state::voxels::trees::{TreeFootprint, TreeMap};
use crate::error::{StorageError, WorldError};

/// Called once a chunk is ready, with the roles of the meshes it put in the scene.
pub type ChunkCallback = Box<dyn FnOnce(ChunkId, &[MeshRole])>;

/// Where a chunk is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Unloaded,
    Processing,
    Loaded,
}

struct LoadedChunk<M> {
    chunk: Chunk,
    geometry: ChunkGeometry,
    solid_mesh: Option<M>,
    transparent_mesh: Option<M>,
}

impl<M> LoadedChunk<M> {
    fn new(chunk: Chunk, geometry: ChunkGeometry) -> Self {
        LoadedChunk {
            chunk,
            geometry,
            solid_mesh: None,
            transparent_mesh: None,
        }
    }

    fn mesh_slot(&mut self, role: MeshRole) -> &mut Option<M> {
        match role {
            MeshRole::Solid => &mut self.solid_mesh,
            MeshRole::Transparent => &mut self.transparent_mesh,
        }
    }
}

struct PendingRequest {
    token: u64,
    dispatched_at: Instant,
    on_complete: Option<ChunkCallback>,
}

/// Counters describing the manager's current state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkManagerStats {
    pub loaded: usize,
    pub processing: usize,
    pub queued_tasks: usize,
    pub height_regions: usize,
    pub density_regions: usize,
    pub tree_regions: usize,
}

/// Loads, generates, edits and evicts chunks.
pub struct ChunkManager<S: ChunkStorage, R: Renderer> {
    config: WorldConfig,
    shapes: ShapeMaps,
    trees: TreeMap,
    chunks: HashMap<ChunkId, LoadedChunk<R::Mesh>>,
    processing: HashMap<ChunkId, PendingRequest>,
    next_token: u64,
    task_manager: TaskManager<ChunkGenerationTask>,
    mesh_pool: MeshPool<R::Mesh>,
    storage: S,
    renderer: R,
}

impl<S: ChunkStorage, R: Renderer> ChunkManager<S, R> {
    /// Creates a manager and starts its worker pool.
    ///
    /// # Errors
    /// `WorldError::Config` if `config` does not validate.
    pub fn new(config: WorldConfig, storage: S, renderer: R) -> Result<Self, WorldError> {
        config.validate()?;
        info!(
            "Creating chunk manager for seed {:?} with {} workers",
            config.seed, config.worker_count
        );
        if config.field_overrides.is_active() {
            info!("Shape field overrides active: {:?}", config.field_overrides);
        }

        Ok(ChunkManager {
            shapes: ShapeMaps::with_overrides(
                &config.seed,
                config.field_overrides,
                config.max_cached_regions,
            ),
            trees: TreeMap::new(&config.seed, config.max_cached_regions),
            chunks: HashMap::new(),
            processing: HashMap::new(),
            next_token: 0,
            task_manager: TaskManager::new(config.worker_count, config.max_queued_tasks),
            mesh_pool: MeshPool::new(config.mesh_pool_capacity),
            storage,
            renderer,
            config,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn seed(&self) -> &str {
        &self.config.seed
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// The coordinating thread's terrain fields.
    pub fn shapes_mut(&mut self) -> &mut ShapeMaps {
        &mut self.shapes
    }

    pub fn chunk_state(&self, id: ChunkId) -> ChunkState {
        if self.chunks.contains_key(&id) {
            ChunkState::Loaded
        } else if self.processing.contains_key(&id) {
            ChunkState::Processing
        } else {
            ChunkState::Unloaded
        }
    }

    pub fn is_loaded(&self, id: ChunkId) -> bool {
        self.chunks.contains_key(&id)
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(&id).map(|loaded| &loaded.chunk)
    }

    pub fn geometry(&self, id: ChunkId) -> Option<&ChunkGeometry> {
        self.chunks.get(&id).map(|loaded| &loaded.geometry)
    }

    /// Ids of all loaded chunks, in no particular order.
    pub fn loaded_ids(&self) -> Vec<ChunkId> {
        self.chunks.keys().copied().collect()
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Ids of all chunks with a generation request in flight, in no particular order.
    pub fn processing_ids(&self) -> Vec<ChunkId> {
        self.processing.keys().copied().collect()
    }

    pub fn processing_count(&self) -> usize {
        self.processing.len()
    }

    pub fn stats(&self) -> ChunkManagerStats {
        let (height_regions, density_regions) = self.shapes.loaded_regions();
        ChunkManagerStats {
            loaded: self.chunks.len(),
            processing: self.processing.len(),
            queued_tasks: self.task_manager.queued_count(),
            height_regions,
            density_regions,
            tree_regions: self.trees.loaded_regions(),
        }
    }

    /// Ensures the chunk containing `position` is loaded or on its way.
    ///
    /// Does nothing if the chunk is already loaded or processing. Otherwise restores
    /// it from storage, or dispatches it to the worker pool. `on_complete` runs when
    /// the chunk is loaded with at least one mesh.
    ///
    /// # Returns
    /// The chunk's state after the call.
    ///
    /// # Errors
    /// - `WorldError::Task` if the worker pool rejected the task; the chunk stays
    ///   unloaded and may be requested again later
    /// - `WorldError::Storage` if reading a stored record failed
    pub fn generate_chunk_at(
        &mut self,
        position: Point3<f32>,
        on_complete: Option<ChunkCallback>,
    ) -> Result<ChunkState, WorldError> {
        self.request_chunk(ChunkId::from_world(position), on_complete)
    }

    /// [`generate_chunk_at`](Self::generate_chunk_at) by chunk id.
    pub fn request_chunk(
        &mut self,
        id: ChunkId,
        on_complete: Option<ChunkCallback>,
    ) -> Result<ChunkState, WorldError> {
        match self.chunk_state(id) {
            ChunkState::Unloaded => {}
            state => return Ok(state),
        }

        if let Some((chunk, geometry)) = self.restore_from_storage(id)? {
            self.register_chunk(chunk, geometry, on_complete);
            return Ok(ChunkState::Loaded);
        }

        let footprint = self.footprint(id);
        let ticket = GenerationTicket {
            id,
            token: self.next_token,
        };
        self.next_token += 1;

        let task = ChunkGenerationTask::new(
            ticket,
            &self.config.seed,
            self.config.field_overrides,
            self.config.max_cached_regions,
            footprint,
        );
        self.task_manager.publish_task(task)?;
        self.processing.insert(
            id,
            PendingRequest {
                token: ticket.token,
                dispatched_at: Instant::now(),
                on_complete,
            },
        );
        debug!("Dispatched generation of chunk {}", id);
        Ok(ChunkState::Processing)
    }

    fn footprint(&mut self, id: ChunkId) -> TreeFootprint {
        if TreeFootprint::can_hold_trees(id) {
            self.trees.footprint(&mut self.shapes, id)
        } else {
            let origin = id.origin();
            TreeFootprint::empty(&self.config.seed, origin.x, origin.z)
        }
    }

    /// Reads an edited chunk back from storage.
    ///
    /// Records from another format version are ignored so the chunk is regenerated.
    fn restore_from_storage(
        &mut self,
        id: ChunkId,
    ) -> Result<Option<(Chunk, ChunkGeometry)>, WorldError> {
        let chunk = match self.storage.get(id) {
            Ok(Some(chunk)) => chunk,
            Ok(None) => return Ok(None),
            Err(StorageError::VersionMismatch {
                found, expected, ..
            }) => {
                warn!(
                    "Ignoring stored chunk {} (format version {}, expected {}); regenerating",
                    id, found, expected
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let geometry = match self.storage.get_geometry(id)? {
            Some(stored) => ChunkGeometry {
                solid: stored.solid.unwrap_or_default(),
                transparent: stored.transparent.unwrap_or_default(),
            },
            None => self.build_geometry(&chunk),
        };
        debug!("Restored chunk {} from storage", id);
        Ok(Some((chunk, geometry)))
    }

    /// Builds the geometry of `chunk` against the loaded chunks around it.
    fn build_geometry(&mut self, chunk: &Chunk) -> ChunkGeometry {
        let chunks = &self.chunks;
        let neighbours = |block: Point3<i32>| -> Option<BlockType> {
            chunks
                .get(&ChunkId::from_block(block))
                .and_then(|loaded| loaded.chunk.get_block(block))
        };
        ChunkGeometryBuilder::build(chunk, &neighbours, &mut self.shapes)
    }

    fn register_chunk(
        &mut self,
        chunk: Chunk,
        geometry: ChunkGeometry,
        on_complete: Option<ChunkCallback>,
    ) {
        let id = chunk.id;
        self.chunks.insert(id, LoadedChunk::new(chunk, geometry));
        let roles = self.refresh_meshes(id);
        debug!("Loaded chunk {} with meshes {:?}", id, roles);
        if let Some(on_complete) = on_complete {
            if !roles.is_empty() {
                on_complete(id, &roles);
            }
        }
    }

    /// Brings the chunk's meshes in line with its geometry.
    ///
    /// Non-empty buffers are uploaded into the existing mesh, or into one taken from
    /// the pool and attached. Meshes whose buffers became empty are detached and
    /// returned to the pool.
    ///
    /// # Returns
    /// The roles that now have a mesh in the scene.
    fn refresh_meshes(&mut self, id: ChunkId) -> Vec<MeshRole> {
        let Some(loaded) = self.chunks.get_mut(&id) else {
            return Vec::new();
        };

        let mut attached = Vec::new();
        for role in MeshRole::all() {
            let buffers = loaded.geometry.buffers(role).clone();
            let slot = loaded.mesh_slot(role);

            if buffers.is_empty() {
                if let Some(mesh) = slot.take() {
                    self.renderer.detach(&mesh);
                    if let Some(overflow) = self.mesh_pool.release(role, mesh) {
                        self.renderer.destroy_mesh(overflow);
                    }
                }
                continue;
            }

            match slot {
                Some(mesh) => self.renderer.upload(mesh, &buffers),
                None => {
                    let mut mesh = self
                        .mesh_pool
                        .acquire(role)
                        .unwrap_or_else(|| self.renderer.create_mesh(role));
                    self.renderer.upload(&mut mesh, &buffers);
                    self.renderer.attach(&mesh);
                    *slot = Some(mesh);
                }
            }
            attached.push(role);
        }
        attached
    }

    /// Integrates finished generation tasks.
    ///
    /// Call once per update on the coordinating thread.
    ///
    /// # Returns
    /// How many chunks were loaded.
    pub fn process_completed_tasks(&mut self) -> usize {
        let completed = self.task_manager.process_completed_tasks();
        self.integrate(completed)
    }

    fn integrate(&mut self, completed: Vec<TaskOutcome<ChunkGenerationTask>>) -> usize {
        let mut loaded = 0;
        for outcome in completed {
            let ticket = outcome.key;
            let current = self
                .processing
                .get(&ticket.id)
                .is_some_and(|pending| pending.token == ticket.token);
            if !current {
                debug!("Discarding stale result for chunk {}", ticket.id);
                continue;
            }
            let Some(pending) = self.processing.remove(&ticket.id) else {
                continue;
            };

            match outcome.result {
                Ok(generated) => {
                    if self.chunks.contains_key(&ticket.id) {
                        continue;
                    }
                    self.register_chunk(generated.chunk, generated.geometry, pending.on_complete);
                    loaded += 1;
                }
                Err(e) => warn!("Generation of chunk {} failed: {}", ticket.id, e),
            }
        }
        loaded
    }

    /// Gives up on requests that have been processing longer than the configured
    /// timeout, so they can be requested again. Their results are discarded if they
    /// still arrive.
    ///
    /// # Returns
    /// The ids that were expired.
    pub fn expire_stuck_requests(&mut self) -> Vec<ChunkId> {
        let timeout = self.config.task_timeout();
        let now = Instant::now();
        let expired: Vec<ChunkId> = self
            .processing
            .iter()
            .filter(|(_, pending)| now.duration_since(pending.dispatched_at) >= timeout)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            warn!("Generation of chunk {} timed out; it may be requested again", id);
            self.processing.remove(id);
        }
        expired
    }

    /// Blocks until no generation is in flight or `timeout` elapses, integrating
    /// results as they arrive.
    ///
    /// # Returns
    /// The number of requests still processing.
    pub fn wait_for_pending(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        while !self.processing.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let completed = self.task_manager.wait_for_completed(deadline - now);
            if completed.is_empty() && self.task_manager.pending_count() == 0 {
                // nothing left that could answer the remaining requests
                break;
            }
            self.integrate(completed);
        }
        self.processing.len()
    }

    /// Loads chunk `id` on this thread if it is not loaded yet.
    ///
    /// Any request in flight for the chunk is superseded.
    pub fn load_chunk_sync(&mut self, id: ChunkId) -> Result<(), WorldError> {
        if self.chunks.contains_key(&id) {
            return Ok(());
        }

        let on_complete = self
            .processing
            .remove(&id)
            .and_then(|pending| pending.on_complete);

        let (chunk, geometry) = match self.restore_from_storage(id)? {
            Some(restored) => restored,
            None => {
                let footprint = self.footprint(id);
                let chunk = Chunk::generate(id, &mut self.shapes, &footprint);
                let geometry = self.build_geometry(&chunk);
                (chunk, geometry)
            }
        };
        self.register_chunk(chunk, geometry, on_complete);
        Ok(())
    }

    /// Block at world position `block`, or `None` if its chunk is not loaded.
    pub fn get_block(&self, block: Point3<i32>) -> Option<BlockType> {
        self.chunks
            .get(&ChunkId::from_block(block))
            .and_then(|loaded| loaded.chunk.get_block(block))
    }

    /// Block at world position `block`, loading its chunk synchronously if needed.
    pub fn get_or_load_block(&mut self, block: Point3<i32>) -> Result<BlockType, WorldError> {
        let id = ChunkId::from_block(block);
        self.load_chunk_sync(id)?;
        self.get_block(block).ok_or(WorldError::ChunkNotLoaded(id))
    }

    /// Sets the block at world position `block` and re-meshes every loaded chunk
    /// within one voxel of it.
    ///
    /// The chunk is loaded synchronously first if needed. Chunks whose geometry
    /// becomes empty are unloaded.
    ///
    /// # Errors
    /// Loading errors, or the first storage error hit while unloading an emptied
    /// chunk. The edit itself is applied either way once the chunk is loaded.
    pub fn set_block(&mut self, block: Point3<i32>, block_type: BlockType) -> Result<(), WorldError> {
        let id = ChunkId::from_block(block);
        self.load_chunk_sync(id)?;
        let loaded = self
            .chunks
            .get_mut(&id)
            .ok_or(WorldError::ChunkNotLoaded(id))?;
        loaded.chunk.set_block(block, block_type);

        let mut visited = HashSet::new();
        let mut first_error = None;
        for dy in -1..=1 {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    let neighbour = ChunkId::from_block(block + Vector3::new(dx, dy, dz));
                    if !visited.insert(neighbour) {
                        continue;
                    }
                    if let Err(e) = self.remesh_chunk(neighbour) {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Rebuilds the geometry of a loaded chunk, unloading it if nothing is left to draw.
    fn remesh_chunk(&mut self, id: ChunkId) -> Result<(), WorldError> {
        let Some(loaded) = self.chunks.get(&id) else {
            return Ok(());
        };

        let geometry = {
            let chunks = &self.chunks;
            let neighbours = |block: Point3<i32>| -> Option<BlockType> {
                chunks
                    .get(&ChunkId::from_block(block))
                    .and_then(|loaded| loaded.chunk.get_block(block))
            };
            ChunkGeometryBuilder::build(&loaded.chunk, &neighbours, &mut self.shapes)
        };

        let empty = geometry.is_empty();
        if let Some(loaded) = self.chunks.get_mut(&id) {
            loaded.geometry = geometry;
        }
        self.refresh_meshes(id);

        if empty {
            self.unload_chunk(id)?;
        }
        Ok(())
    }

    /// Unloads chunk `id`, saving it first if it is dirty. A request still in flight
    /// for the chunk is cancelled.
    ///
    /// # Returns
    /// `true` if a loaded chunk was removed.
    ///
    /// # Errors
    /// `WorldError::Storage` if saving a dirty chunk failed. The chunk then stays
    /// loaded and dirty.
    pub fn unload_chunk(&mut self, id: ChunkId) -> Result<bool, WorldError> {
        if self.processing.remove(&id).is_some() {
            debug!("Cancelled generation of chunk {}", id);
        }
        let Some(loaded) = self.chunks.get(&id) else {
            return Ok(false);
        };

        if loaded.chunk.is_dirty() {
            let solid = Some(&loaded.geometry.solid).filter(|b| !b.is_empty());
            let transparent = Some(&loaded.geometry.transparent).filter(|b| !b.is_empty());
            if let Err(e) = self.storage.put(&loaded.chunk, solid, transparent) {
                warn!("Failed to save chunk {}: {}; keeping it loaded", id, e);
                return Err(e.into());
            }
        }

        if let Some(mut loaded) = self.chunks.remove(&id) {
            for role in MeshRole::all() {
                if let Some(mesh) = loaded.mesh_slot(role).take() {
                    self.renderer.detach(&mesh);
                    if let Some(overflow) = self.mesh_pool.release(role, mesh) {
                        self.renderer.destroy_mesh(overflow);
                    }
                }
            }
        }
        self.shapes.unload_chunk(id);
        self.trees.unload_chunk(id);
        debug!("Unloaded chunk {}", id);
        Ok(true)
    }

    /// Saves every dirty chunk without unloading it.
    ///
    /// # Returns
    /// The number of chunks written.
    pub fn save_dirty_chunks(&mut self) -> Result<usize, WorldError> {
        let mut saved = 0;
        for loaded in self.chunks.values_mut() {
            if !loaded.chunk.is_dirty() {
                continue;
            }
            let solid = Some(&loaded.geometry.solid).filter(|b| !b.is_empty());
            let transparent = Some(&loaded.geometry.transparent).filter(|b| !b.is_empty());
            self.storage.put(&loaded.chunk, solid, transparent)?;
            loaded.chunk.mark_clean();
            saved += 1;
        }
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::engine_state::noise::shape_maps::FieldOverrides;
    use crate::engine_state::rendering::meshing::GeometryBuffers;
    use crate::engine_state::voxels::chunk::CHUNK_HEIGHT;
    use crate::engine_state::voxels::storage::{MemoryChunkStorage, StoredChunkRecord};

    /// Counts renderer calls; meshes are plain numbers.
    #[derive(Default)]
    struct CountingRenderer {
        created: usize,
        attached: HashSet<usize>,
        uploads: usize,
    }

    impl Renderer for CountingRenderer {
        type Mesh = usize;

        fn create_mesh(&mut self, _role: MeshRole) -> usize {
            self.created += 1;
            self.created
        }

        fn upload(&mut self, _mesh: &mut usize, _geometry: &GeometryBuffers) {
            self.uploads += 1;
        }

        fn attach(&mut self, mesh: &usize) {
            self.attached.insert(*mesh);
        }

        fn detach(&mut self, mesh: &usize) {
            self.attached.remove(mesh);
        }
    }

    /// Surface at 12 everywhere.
    fn flat_config() -> WorldConfig {
        WorldConfig {
            worker_count: 2,
            field_overrides: FieldOverrides {
                continentalness: Some(0.0),
                erosion: Some(-0.3),
                peaks_valleys: Some(0.0),
            },
            ..WorldConfig::with_seed("flat")
        }
    }

    fn manager(config: WorldConfig) -> ChunkManager<MemoryChunkStorage, CountingRenderer> {
        ChunkManager::new(config, MemoryChunkStorage::new(), CountingRenderer::default()).unwrap()
    }

    fn surface_chunk() -> ChunkId {
        ChunkId::new(0, 0, 0)
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = WorldConfig {
            worker_count: 0,
            ..WorldConfig::default()
        };
        let result =
            ChunkManager::new(config, MemoryChunkStorage::new(), CountingRenderer::default());
        assert!(matches!(result, Err(WorldError::Config(_))));
    }

    #[test]
    fn requests_are_deduplicated() {
        let mut manager = manager(flat_config());
        let position = Point3::new(3.5, 4.0, 9.0);

        assert_eq!(manager.generate_chunk_at(position, None).unwrap(), ChunkState::Processing);
        assert_eq!(manager.generate_chunk_at(position, None).unwrap(), ChunkState::Processing);
        assert_eq!(manager.processing_count(), 1);

        assert_eq!(manager.wait_for_pending(Duration::from_secs(30)), 0);
        assert_eq!(manager.chunk_state(surface_chunk()), ChunkState::Loaded);
        assert_eq!(manager.generate_chunk_at(position, None).unwrap(), ChunkState::Loaded);
        assert_eq!(manager.loaded_count(), 1);
    }

    #[test]
    fn completion_callback_reports_meshes() {
        let mut manager = manager(flat_config());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        manager
            .request_chunk(
                surface_chunk(),
                Some(Box::new(move |id, roles: &[MeshRole]| {
                    sink.borrow_mut().push((id, roles.to_vec()))
                })),
            )
            .unwrap();
        manager.wait_for_pending(Duration::from_secs(30));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, surface_chunk());
        assert!(seen[0].1.contains(&MeshRole::Solid));
        assert_eq!(manager.renderer().attached.len(), seen[0].1.len());
    }

    #[test]
    fn worker_and_synchronous_generation_agree() {
        let mut async_manager = manager(flat_config());
        async_manager.request_chunk(surface_chunk(), None).unwrap();
        async_manager.wait_for_pending(Duration::from_secs(30));

        let mut sync_manager = manager(flat_config());
        sync_manager.load_chunk_sync(surface_chunk()).unwrap();

        assert_eq!(
            async_manager.chunk(surface_chunk()).map(Chunk::as_bytes),
            sync_manager.chunk(surface_chunk()).map(Chunk::as_bytes)
        );
        assert_eq!(
            async_manager.geometry(surface_chunk()),
            sync_manager.geometry(surface_chunk())
        );
    }

    #[test]
    fn expired_requests_can_be_retried_and_late_results_are_dropped() {
        let config = WorldConfig {
            task_timeout_ms: 0,
            ..flat_config()
        };
        let mut manager = manager(config);
        manager.request_chunk(surface_chunk(), None).unwrap();

        assert_eq!(manager.expire_stuck_requests(), vec![surface_chunk()]);
        assert_eq!(manager.chunk_state(surface_chunk()), ChunkState::Unloaded);

        // the expired task still finishes; its result must not load the chunk
        let deadline = Instant::now() + Duration::from_secs(30);
        while manager.task_manager.pending_count() > 0 && Instant::now() < deadline {
            let completed = manager.task_manager.wait_for_completed(Duration::from_millis(50));
            assert_eq!(manager.integrate(completed), 0);
        }
        assert_eq!(manager.chunk_state(surface_chunk()), ChunkState::Unloaded);

        assert_eq!(manager.request_chunk(surface_chunk(), None).unwrap(), ChunkState::Processing);
    }

    #[test]
    fn synchronous_load_supersedes_a_pending_request() {
        let mut manager = manager(flat_config());
        manager.request_chunk(surface_chunk(), None).unwrap();
        manager.load_chunk_sync(surface_chunk()).unwrap();
        assert_eq!(manager.processing_count(), 0);

        let bytes = manager.chunk(surface_chunk()).map(|c| c.as_bytes().to_vec());
        manager.wait_for_pending(Duration::from_millis(200));
        let deadline = Instant::now() + Duration::from_secs(30);
        while manager.task_manager.pending_count() > 0 && Instant::now() < deadline {
            manager.process_completed_tasks();
        }
        assert_eq!(manager.chunk(surface_chunk()).map(|c| c.as_bytes().to_vec()), bytes);
        assert_eq!(manager.loaded_count(), 1);
    }

    #[test]
    fn clean_chunks_unload_without_io_and_release_regions() {
        let mut manager = manager(flat_config());
        manager.load_chunk_sync(surface_chunk()).unwrap();
        assert!(manager.stats().height_regions > 0);
        let attached = manager.renderer().attached.len();
        assert!(attached > 0);

        assert!(manager.unload_chunk(surface_chunk()).unwrap());
        assert!(manager.storage().is_empty());
        assert!(manager.renderer().attached.is_empty());
        assert_eq!(manager.mesh_pool.available(MeshRole::Solid), 1);
        assert!(!manager.unload_chunk(surface_chunk()).unwrap());

        // pooled meshes are reused
        let created = manager.renderer().created;
        manager.load_chunk_sync(surface_chunk()).unwrap();
        assert_eq!(manager.renderer().created, created);
        assert_eq!(manager.renderer().attached.len(), attached);
    }

    #[test]
    fn edits_persist_across_unload() {
        let mut manager = manager(flat_config());
        let target = Point3::new(4, 13, 4);
        manager.set_block(target, BlockType::SNOW).unwrap();
        assert_eq!(manager.get_block(target), Some(BlockType::SNOW));
        assert!(manager.chunk(surface_chunk()).unwrap().is_dirty());

        let geometry = manager.geometry(surface_chunk()).cloned();
        manager.unload_chunk(surface_chunk()).unwrap();
        assert!(manager.storage().contains(surface_chunk()));
        assert_eq!(manager.get_block(target), None);

        manager.request_chunk(surface_chunk(), None).unwrap();
        assert_eq!(manager.chunk_state(surface_chunk()), ChunkState::Loaded);
        assert_eq!(manager.get_block(target), Some(BlockType::SNOW));
        assert_eq!(manager.geometry(surface_chunk()).cloned(), geometry);
    }

    #[test]
    fn failed_saves_keep_the_chunk_dirty() {
        let mut manager = manager(flat_config());
        let target = Point3::new(1, 14, 1);
        manager.set_block(target, BlockType::WOOD).unwrap();
        manager.storage_mut().set_fail_writes(true);

        let result = manager.unload_chunk(surface_chunk());
        assert!(matches!(result, Err(WorldError::Storage(_))));
        assert!(manager.chunk(surface_chunk()).unwrap().is_dirty());
        assert_eq!(manager.get_block(target), Some(BlockType::WOOD));

        manager.storage_mut().set_fail_writes(false);
        assert!(manager.unload_chunk(surface_chunk()).unwrap());
        assert!(manager.storage().contains(surface_chunk()));
    }

    #[test]
    fn outdated_records_are_regenerated() {
        let mut manager = manager(flat_config());
        let mut edited = Chunk::empty(surface_chunk());
        edited.set_block(Point3::new(0, 15, 0), BlockType::LEAVES);
        let json = StoredChunkRecord::new(&edited, None, None).to_json().unwrap();
        let old = json.replacen("\"version\":1", "\"version\":0", 1);
        manager.storage_mut().insert_raw_record(surface_chunk(), old);

        assert_eq!(manager.request_chunk(surface_chunk(), None).unwrap(), ChunkState::Processing);
    }

    #[test]
    fn emptied_chunks_are_unloaded() {
        let mut manager = manager(flat_config());
        // a sky chunk holding a single block
        let target = Point3::new(2, 20 * CHUNK_HEIGHT + 3, 2);
        let id = ChunkId::from_block(target);
        manager.set_block(target, BlockType::STONE).unwrap();
        assert!(manager.is_loaded(id));
        assert_eq!(manager.geometry(id).unwrap().solid.face_count(), 6);

        manager.set_block(target, BlockType::AIR).unwrap();
        assert!(!manager.is_loaded(id));
        // it was dirty, so the now-empty chunk went to storage
        assert!(manager.storage().contains(id));
    }

    #[test]
    fn edits_reach_the_neighbour_across_the_border() {
        let mut manager = manager(flat_config());
        let sky = 20 * CHUNK_HEIGHT;
        let left = ChunkId::new(-1, 20, 0);
        let right = ChunkId::new(0, 20, 0);

        // a block at the right edge of the left chunk, air beside it
        manager.set_block(Point3::new(-1, sky + 5, 5), BlockType::STONE).unwrap();
        manager.load_chunk_sync(right).unwrap();
        assert_eq!(manager.geometry(left).unwrap().solid.face_count(), 6);

        manager.set_block(Point3::new(0, sky + 5, 5), BlockType::DIRT).unwrap();
        assert_eq!(manager.geometry(left).unwrap().solid.face_count(), 5);
        assert_eq!(manager.geometry(right).unwrap().solid.face_count(), 5);
    }
}
