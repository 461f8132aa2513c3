#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Terrain
//!
//! An infinite, editable voxel terrain core. Terrain is a pure function of a seed:
//! layered noise fields give every column a surface height, a 3D density field
//! carves caves below it, and an exclusion-radius pass scatters trees on top.
//! The world is split into 16x16x16 chunks that are generated on a worker pool,
//! meshed with per-vertex ambient occlusion and streamed around a moving centre.
//!
//! ## Key Modules
//!
//! * `config` - World configuration, loaded from JSON
//! * `engine_state` - Noise, voxels, meshing, task management and streaming
//! * `error` - Error types shared across the crate
//!
//! ## Usage
//!
//! ```no_run
//! use cgmath::Point3;
//! use voxel_terrain::{ChunkManager, MemoryChunkStorage, TerrainLoader, WorldConfig};
//! # use voxel_terrain::engine_state::rendering::{meshing::GeometryBuffers, MeshRole, Renderer};
//! # struct NullRenderer;
//! # impl Renderer for NullRenderer {
//! #     type Mesh = ();
//! #     fn create_mesh(&mut self, _role: MeshRole) {}
//! #     fn upload(&mut self, _mesh: &mut (), _geometry: &GeometryBuffers) {}
//! #     fn attach(&mut self, _mesh: &()) {}
//! #     fn detach(&mut self, _mesh: &()) {}
//! # }
//!
//! let config = WorldConfig::with_seed("abc");
//! let timeout = config.task_timeout();
//! let manager = ChunkManager::new(config, MemoryChunkStorage::new(), NullRenderer)?;
//! let mut loader = TerrainLoader::new(manager);
//! loader.init(Point3::new(0.0, 0.0, 0.0), timeout)?;
//! loader.update(Point3::new(20.0, 0.0, 0.0))?;
//! # Ok::<(), voxel_terrain::WorldError>(())
//! ```

use cgmath::Point3;
use log::{info, warn};

use engine_state::rendering::meshing::GeometryBuffers;
use engine_state::rendering::{MeshRole, Renderer};
use engine_state::voxels::block::block_type::BlockType;
use engine_state::voxels::chunk::block_at;

pub mod config;
pub mod engine_state;
pub mod error;

pub use config::WorldConfig;
pub use engine_state::noise::shape_maps::{FieldOverrides, ShapeMaps};
pub use engine_state::terrain_loader::TerrainLoader;
pub use engine_state::voxels::chunk::{Chunk, ChunkId};
pub use engine_state::voxels::chunk_manager::{ChunkCallback, ChunkManager, ChunkState};
pub use engine_state::voxels::storage::{ChunkStorage, MemoryChunkStorage};
pub use error::{ConfigError, StorageError, TaskError, WorldError};

/// Number of steps the demo walks the centre along +x.
pub const DEMO_STEPS: usize = 8;

/// Initialises `env_logger` on stdout, filtered by `RUST_LOG`.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
}

/// Mesh handle of the demo renderer.
#[derive(Debug)]
pub struct LoggedMesh {
    pub id: usize,
    pub role: MeshRole,
    pub vertices: usize,
}

/// A renderer with no GPU behind it that keeps counts and logs its meshes.
#[derive(Debug, Default)]
pub struct LoggingRenderer {
    created: usize,
    attached: usize,
    uploaded_vertices: usize,
}

impl LoggingRenderer {
    pub fn attached(&self) -> usize {
        self.attached
    }

    pub fn created(&self) -> usize {
        self.created
    }
}

impl Renderer for LoggingRenderer {
    type Mesh = LoggedMesh;

    fn create_mesh(&mut self, role: MeshRole) -> LoggedMesh {
        self.created += 1;
        LoggedMesh {
            id: self.created,
            role,
            vertices: 0,
        }
    }

    fn upload(&mut self, mesh: &mut LoggedMesh, geometry: &GeometryBuffers) {
        mesh.vertices = geometry.vertex_count();
        self.uploaded_vertices += mesh.vertices;
        log::trace!("Uploaded {} vertices to {:?} mesh {}", mesh.vertices, mesh.role, mesh.id);
    }

    fn attach(&mut self, _mesh: &LoggedMesh) {
        self.attached += 1;
    }

    fn detach(&mut self, _mesh: &LoggedMesh) {
        self.attached = self.attached.saturating_sub(1);
    }
}

/// Runs a headless streaming session.
///
/// Loads the render box around the origin, walks the centre along +x, digs a hole
/// at the surface and logs what the world holds after each step. The config is read
/// from the JSON file named by the first argument, if any.
pub fn run() -> Result<(), WorldError> {
    let config = match std::env::args().nth(1) {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    let timeout = config.task_timeout();
    info!("Starting terrain demo with seed {:?}", config.seed);

    let manager = ChunkManager::new(config, MemoryChunkStorage::new(), LoggingRenderer::default())?;
    let mut loader = TerrainLoader::new(manager);

    let mut center = Point3::new(0.5_f32, 0.0, 0.5);
    let surface = loader
        .manager_mut()
        .shapes_mut()
        .surface_height(0, 0);
    center.y = surface as f32;

    let remaining = loader.init(center, timeout)?;
    if remaining > 0 {
        warn!("{} chunks did not finish loading", remaining);
    }
    info!("Initial load: {:?}", loader.manager().stats());

    // dig a hole under the centre and fill it with water
    let hole = block_at(center) + cgmath::Vector3::new(0, -1, 0);
    let before = loader.manager_mut().get_or_load_block(hole)?;
    loader.manager_mut().set_block(hole, BlockType::WATER)?;
    info!("Replaced {:?} at {:?} with water", before, hole);

    for step in 0..DEMO_STEPS {
        center.x += 16.0;
        let update = loader.update(center)?;
        loader.manager_mut().wait_for_pending(timeout);
        info!("Step {}: {:?}, {:?}", step, update, loader.manager().stats());
    }

    let saved = loader.manager_mut().save_dirty_chunks()?;
    let manager = loader.into_manager();
    info!(
        "Done: {} chunks loaded, {} meshes attached, {} created, {} chunks in storage ({} saved at exit)",
        manager.loaded_count(),
        manager.renderer().attached(),
        manager.renderer().created(),
        manager.storage().len(),
        saved
    );
    Ok(())
}
