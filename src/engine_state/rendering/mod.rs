//! Rendering boundary of the terrain core.
//!
//! This module produces chunk geometry and defines the narrow interface the
//! chunk manager uses to hand it to a renderer. The renderer itself (scene graph,
//! GPU buffers, shading) lives outside this crate: it only creates, fills, attaches
//! and detaches mesh handles on request.

pub mod mesh_pool;
pub mod meshing;

pub use mesh_pool::MeshPool;

use meshing::GeometryBuffers;

/// Which pass a mesh is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshRole {
    /// Opaque geometry, drawn with depth writes.
    Solid = 0,
    /// Water and leaves, drawn alpha-blended.
    Transparent = 1,
}

impl MeshRole {
    pub fn all() -> [MeshRole; 2] {
        [MeshRole::Solid, MeshRole::Transparent]
    }
}

/// The renderer collaborator.
///
/// Mesh handles are opaque to the chunk manager. It owns their lifecycle: it asks
/// for new ones, fills them, attaches them to the scene when a chunk appears and
/// detaches them when the chunk goes away.
pub trait Renderer {
    /// A renderer-side mesh handle.
    type Mesh;

    /// Creates an empty mesh for `role`.
    fn create_mesh(&mut self, role: MeshRole) -> Self::Mesh;

    /// Replaces the contents of `mesh` with `geometry`.
    fn upload(&mut self, mesh: &mut Self::Mesh, geometry: &GeometryBuffers);

    /// Adds `mesh` to the scene.
    fn attach(&mut self, mesh: &Self::Mesh);

    /// Removes `mesh` from the scene.
    fn detach(&mut self, mesh: &Self::Mesh);

    /// Releases a mesh the pool has no room for.
    fn destroy_mesh(&mut self, mesh: Self::Mesh) {
        drop(mesh);
    }
}
