//! Vertex buffer sets produced by the geometry builder.

use serde::{Deserialize, Serialize};

use super::face::Face;
use crate::engine_state::rendering::MeshRole;

/// One independent buffer set: flat `f32` attribute arrays plus `u32` indices.
///
/// Positions and normals carry three floats per vertex, UVs two and colours three.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryBuffers {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub colors: Vec<f32>,
    pub indices: Vec<u32>,
}

impl GeometryBuffers {
    /// Appends one quad, with its two triangles split along the face's chosen diagonal.
    pub fn push_face(&mut self, face: &Face) {
        let base = self.vertex_count() as u32;
        for i in 0..4 {
            let corner = face.corners[i];
            self.positions.extend_from_slice(&[corner.x, corner.y, corner.z]);
            self.normals
                .extend_from_slice(&[face.normal.x, face.normal.y, face.normal.z]);
            self.uvs.extend_from_slice(&face.uvs[i]);
            self.colors.extend_from_slice(&face.colors[i]);
        }
        self.indices
            .extend(face.indices().into_iter().map(|index| base + index));
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// A buffer set with no triangles draws nothing.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.uvs.clear();
        self.colors.clear();
        self.indices.clear();
    }
}

/// The two buffer sets of a chunk: opaque voxels and transparent ones (water, leaves).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkGeometry {
    pub solid: GeometryBuffers,
    pub transparent: GeometryBuffers,
}

impl ChunkGeometry {
    /// The buffer set drawn in the pass of `role`.
    pub fn buffers(&self, role: MeshRole) -> &GeometryBuffers {
        match role {
            MeshRole::Solid => &self.solid,
            MeshRole::Transparent => &self.transparent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.solid.is_empty() && self.transparent.is_empty()
    }
}
