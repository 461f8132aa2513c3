use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use cgmath::Point3;
use voxel_terrain::engine_state::rendering::meshing::GeometryBuffers;
use voxel_terrain::engine_state::rendering::{MeshRole, Renderer};
use voxel_terrain::engine_state::voxels::block::block_type::BlockType;
use voxel_terrain::engine_state::voxels::chunk::CHUNK_HEIGHT;
use voxel_terrain::engine_state::voxels::storage::StoredChunkRecord;
use voxel_terrain::{
    ChunkId, ChunkManager, ChunkState, FieldOverrides, MemoryChunkStorage, TerrainLoader,
    WorldConfig, WorldError,
};
use web_time::Duration;

const WAIT: Duration = Duration::from_secs(60);

/// Keeps track of which meshes are in the scene.
#[derive(Default)]
struct RecordingRenderer {
    next_mesh: u32,
    attached: HashSet<u32>,
    uploads: Vec<(u32, usize)>,
}

impl Renderer for RecordingRenderer {
    type Mesh = u32;

    fn create_mesh(&mut self, _role: MeshRole) -> u32 {
        self.next_mesh += 1;
        self.next_mesh
    }

    fn upload(&mut self, mesh: &mut u32, geometry: &GeometryBuffers) {
        self.uploads.push((*mesh, geometry.face_count()));
    }

    fn attach(&mut self, mesh: &u32) {
        assert!(self.attached.insert(*mesh), "mesh {} attached twice", mesh);
    }

    fn detach(&mut self, mesh: &u32) {
        assert!(self.attached.remove(mesh), "mesh {} was not attached", mesh);
    }
}

type Manager = ChunkManager<MemoryChunkStorage, RecordingRenderer>;

fn manager(config: WorldConfig) -> Manager {
    ChunkManager::new(config, MemoryChunkStorage::new(), RecordingRenderer::default()).unwrap()
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

fn abc_config() -> WorldConfig {
    WorldConfig {
        worker_count: 2,
        ..WorldConfig::with_seed("abc")
    }
}

#[test]
fn surface_block_of_seed_abc_is_solid_ground() {
    let mut world = manager(abc_config());
    let surface = world.shapes_mut().surface_height(0, 0);
    let top = Point3::new(0, surface - 1, 0);
    let surface_chunk = ChunkId::from_block(top);
    // the origin of "abc" is sea floor, one chunk below the origin chunk
    assert_eq!(surface, -9);
    assert_eq!(surface_chunk, ChunkId::new(0, -1, 0));

    world.request_chunk(ChunkId::new(0, 0, 0), None).unwrap();
    world.request_chunk(surface_chunk, None).unwrap();
    assert_eq!(world.wait_for_pending(WAIT), 0);
    assert!(world.is_loaded(ChunkId::new(0, 0, 0)));
    assert!(world.is_loaded(surface_chunk));

    assert!(world.shapes_mut().is_solid(0, surface - 1, 0));
    let block = world.get_block(top).unwrap();
    assert!(block.is_visible());
    assert!(block.is_opaque());
    assert_eq!(world.get_block(Point3::new(0, surface, 0)), Some(BlockType::WATER));

    assert!(!world.geometry(surface_chunk).unwrap().solid.is_empty());
    // nothing but air above sea level
    assert!(world.geometry(ChunkId::new(0, 0, 0)).unwrap().solid.is_empty());
}

#[test]
fn generation_is_deterministic_across_worlds() {
    let ids = [
        ChunkId::new(0, 0, 0),
        ChunkId::new(-1, 0, 2),
        ChunkId::new(3, -1, -4),
    ];

    let mut first = manager(abc_config());
    for id in ids {
        first.request_chunk(id, None).unwrap();
    }
    assert_eq!(first.wait_for_pending(WAIT), 0);

    // a second world loads the same chunks in reverse on the calling thread
    let mut second = manager(abc_config());
    for id in ids.iter().rev() {
        second.load_chunk_sync(*id).unwrap();
    }

    for id in ids {
        assert_eq!(
            first.chunk(id).map(|c| c.as_bytes().to_vec()),
            second.chunk(id).map(|c| c.as_bytes().to_vec()),
            "voxels of {} differ",
            id
        );
        // none of the chunks touch, so borders are meshed the same way in both worlds
        assert_eq!(first.geometry(id), second.geometry(id), "geometry of {} differs", id);
    }
}

#[test]
fn sky_chunks_have_no_meshes() {
    let mut world = manager(abc_config());
    let calls = Rc::new(RefCell::new(0));
    let sink = calls.clone();
    let sky = ChunkId::new(2, 20, -3);

    world
        .request_chunk(
            sky,
            Some(Box::new(move |_: ChunkId, _: &[MeshRole]| {
                *sink.borrow_mut() += 1
            })),
        )
        .unwrap();
    world.wait_for_pending(WAIT);

    assert_eq!(world.chunk_state(sky), ChunkState::Loaded);
    let geometry = world.geometry(sky).unwrap();
    assert!(geometry.solid.is_empty());
    assert!(geometry.transparent.is_empty());
    assert!(world.renderer().attached.is_empty());
    assert_eq!(world.renderer().next_mesh, 0);
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn clearing_the_last_block_removes_the_mesh() {
    let mut world = manager(flat_config());
    let target = Point3::new(5, 30 * CHUNK_HEIGHT + 8, 5);
    let id = ChunkId::from_block(target);

    world.set_block(target, BlockType::LEAVES).unwrap();
    assert_eq!(world.renderer().attached.len(), 1);
    assert_eq!(world.geometry(id).unwrap().transparent.face_count(), 6);
    assert_eq!(world.renderer().uploads.last().map(|(_, faces)| *faces), Some(6));

    world.set_block(target, BlockType::AIR).unwrap();
    assert!(world.renderer().attached.is_empty());
    assert!(!world.is_loaded(id));
}

#[test]
fn border_edits_remesh_the_neighbour() {
    let mut world = manager(flat_config());
    let y = 20 * CHUNK_HEIGHT + 7;
    let chunk = ChunkId::new(0, 20, 0);
    let left = ChunkId::new(-1, 20, 0);
    world.load_chunk_sync(chunk).unwrap();
    world.load_chunk_sync(left).unwrap();

    // a block on the left chunk's +x border
    world.set_block(Point3::new(-1, y, 5), BlockType::STONE).unwrap();
    let before = world.geometry(left).unwrap().solid.face_count();
    assert_eq!(before, 6);

    // a block at local x = 0 of the right chunk covers its +x face
    world.set_block(Point3::new(0, y, 5), BlockType::STONE).unwrap();
    let after = world.geometry(left).unwrap().solid.face_count();

    assert_eq!(after, before - 1);
    assert_eq!(world.get_block(Point3::new(0, y, 5)), Some(BlockType::STONE));
}

#[test]
fn edited_chunks_survive_eviction() {
    let mut world = manager(flat_config());
    let chunk = ChunkId::new(1, 0, 1);
    let target = Point3::new(20, 12, 20);

    world.set_block(target, BlockType::SAND).unwrap();
    let voxels = world.chunk(chunk).unwrap().as_bytes().to_vec();
    let geometry = world.geometry(chunk).cloned().unwrap();

    // clean neighbours leave nothing behind
    world.load_chunk_sync(ChunkId::new(5, 0, 5)).unwrap();
    assert!(world.unload_chunk(ChunkId::new(5, 0, 5)).unwrap());
    assert!(world.unload_chunk(chunk).unwrap());
    assert_eq!(world.storage().len(), 1);

    assert_eq!(world.request_chunk(chunk, None).unwrap(), ChunkState::Loaded);
    let restored = world.chunk(chunk).unwrap();
    assert_eq!(restored.as_bytes(), &voxels[..]);
    assert!(!restored.is_dirty());
    assert_eq!(world.geometry(chunk), Some(&geometry));
    assert_eq!(world.get_block(target), Some(BlockType::SAND));
}

#[test]
fn failed_saves_block_eviction_until_storage_recovers() {
    let config = WorldConfig {
        render_distance: 1,
        vertical_render_distance: 0,
        ..flat_config()
    };
    let mut loader = TerrainLoader::new(manager(config));
    loader.init(Point3::new(8.0, 8.0, 8.0), WAIT).unwrap();

    let target = Point3::new(3, 12, 3);
    loader.manager_mut().set_block(target, BlockType::WOOD).unwrap();
    loader.manager_mut().storage_mut().set_fail_writes(true);

    let far = Point3::new(500.0, 8.0, 8.0);
    let result = loader.update(far);
    assert!(matches!(result, Err(WorldError::Storage(_))));
    let edited = ChunkId::new(0, 0, 0);
    assert!(loader.manager().is_loaded(edited));
    assert!(loader.manager().chunk(edited).unwrap().is_dirty());

    loader.manager_mut().storage_mut().set_fail_writes(false);
    loader.update(far).unwrap();
    assert!(!loader.manager().is_loaded(edited));
    assert!(loader.manager().storage().contains(edited));
}

#[test]
fn async_generation_reports_meshes_once() {
    let mut world = manager(flat_config());
    let seen = Rc::new(RefCell::new(Vec::new()));

    for _ in 0..3 {
        let sink = seen.clone();
        let state = world
            .generate_chunk_at(
                Point3::new(8.0, 11.5, 8.0),
                Some(Box::new(move |id, roles: &[MeshRole]| {
                    sink.borrow_mut().push((id, roles.to_vec()))
                })),
            )
            .unwrap();
        assert_eq!(state, ChunkState::Processing);
    }
    assert_eq!(world.processing_count(), 1);
    assert_eq!(world.wait_for_pending(WAIT), 0);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, ChunkId::new(0, 0, 0));
    assert!(seen[0].1.contains(&MeshRole::Solid));
}

#[test]
fn outdated_saves_are_regenerated() {
    let chunk = ChunkId::new(0, 0, 0);

    let mut reference = manager(flat_config());
    reference.load_chunk_sync(chunk).unwrap();
    let expected = reference.chunk(chunk).unwrap().as_bytes().to_vec();

    let mut world = manager(flat_config());
    let mut edited = reference.chunk(chunk).unwrap().clone();
    edited.set_block(Point3::new(1, 14, 1), BlockType::SNOW);
    let json = StoredChunkRecord::new(&edited, None, None).to_json().unwrap();
    let record = json.replacen("\"version\":1", "\"version\":99", 1);
    world.storage_mut().insert_raw_record(chunk, record);

    assert_eq!(world.request_chunk(chunk, None).unwrap(), ChunkState::Processing);
    assert_eq!(world.wait_for_pending(WAIT), 0);
    assert_eq!(world.chunk(chunk).unwrap().as_bytes(), &expected[..]);
}

#[test]
fn corrupt_saves_are_reported() {
    let mut world = manager(flat_config());
    let chunk = ChunkId::new(0, 0, 0);
    world
        .storage_mut()
        .insert_raw_record(chunk, "{not json".to_string());

    assert!(matches!(
        world.request_chunk(chunk, None),
        Err(WorldError::Storage(_))
    ));
    assert_eq!(world.chunk_state(chunk), ChunkState::Unloaded);
}
