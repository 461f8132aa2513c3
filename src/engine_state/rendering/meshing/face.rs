//! # Face
//!
//! A single textured quad of a voxel with per-corner ambient occlusion baked into its
//! vertex colours.

use cgmath::{EuclideanSpace, Point3, Vector3};

use crate::engine_state::voxels::block::{block_side::BlockSide, block_type::BlockType};

/// Number of tiles per row (and per column) of the square texture atlas.
pub const ATLAS_TILES: u32 = 8;

/// Brightness multiplier per ambient occlusion level, from open to fully enclosed.
pub const AO_CURVE: [f32; 4] = [1.0, 0.8, 0.65, 0.5];

/// Corner parameters `(du, dv)` of a face, counter-clockwise seen from outside.
pub const CORNERS: [(i32, i32); 4] = [(0, 0), (1, 0), (1, 1), (0, 1)];

/// Represents a single quad face of a voxel, ready to be appended to a buffer.
///
/// The four corners follow [`CORNERS`]; `flipped` selects which diagonal splits the
/// quad into triangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Corner positions in chunk-local coordinates
    pub corners: [Point3<f32>; 4],
    /// Outward normal, shared by all corners
    pub normal: Vector3<f32>,
    /// Atlas texture coordinates per corner
    pub uvs: [[f32; 2]; 4],
    /// Ambient-occluded colour per corner
    pub colors: [[f32; 3]; 4],
    /// Whether to split along the `1-3` diagonal instead of `0-2`
    pub flipped: bool,
}

impl Face {
    /// Creates the face `side` of the voxel at chunk-local position `local`.
    ///
    /// # Arguments
    /// * `local` - The voxel position in chunk space
    /// * `block_type` - The type of the block, used for texture and colour
    /// * `side` - Which side of the block this face represents
    /// * `ao` - Occlusion level `0..=3` of each corner, in [`CORNERS`] order
    pub fn new(local: Point3<i32>, block_type: BlockType, side: BlockSide, ao: [u8; 4]) -> Self {
        let normal = side.normal().cast::<f32>().unwrap_or(Vector3::new(0.0, 0.0, 0.0));
        let (u, v) = side.tangents();
        let u = u.cast::<f32>().unwrap_or(Vector3::new(0.0, 0.0, 0.0));
        let v = v.cast::<f32>().unwrap_or(Vector3::new(0.0, 0.0, 0.0));
        let center = Point3::new(
            local.x as f32 + 0.5,
            local.y as f32 + 0.5,
            local.z as f32 + 0.5,
        );

        let tile = block_type.texture_index(side);
        let tile_u = (tile % ATLAS_TILES) as f32;
        let tile_v = (tile / ATLAS_TILES) as f32;
        let tile_size = 1.0 / ATLAS_TILES as f32;

        let base = block_type.color();
        let mut corners = [Point3::origin(); 4];
        let mut uvs = [[0.0; 2]; 4];
        let mut colors = [[0.0; 3]; 4];

        for (i, (du, dv)) in CORNERS.into_iter().enumerate() {
            let (du, dv) = (du as f32, dv as f32);
            corners[i] = center + normal * 0.5 + u * (du - 0.5) + v * (dv - 0.5);
            // image rows grow downward
            uvs[i] = [(tile_u + du) * tile_size, (tile_v + 1.0 - dv) * tile_size];
            let shade = AO_CURVE[ao[i].min(3) as usize];
            colors[i] = [base[0] * shade, base[1] * shade, base[2] * shade];
        }

        let ao = ao.map(|level| level as i32);
        Face {
            corners,
            normal,
            uvs,
            colors,
            flipped: (ao[0] - ao[2]).abs() > (ao[1] - ao[3]).abs(),
        }
    }

    /// Triangle indices of the face, relative to its first vertex.
    pub fn indices(&self) -> [u32; 6] {
        if self.flipped {
            [1, 2, 3, 3, 0, 1]
        } else {
            [0, 1, 2, 2, 3, 0]
        }
    }
}

/// Occlusion level of one corner from its two edge neighbours and its diagonal.
///
/// Two occluding edges hide the diagonal completely.
pub fn ao_level(side1: bool, side2: bool, corner: bool) -> u8 {
    if side1 && side2 {
        3
    } else {
        side1 as u8 + side2 as u8 + corner as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_face_sits_on_the_upper_plane() {
        let face = Face::new(Point3::new(2, 3, 4), BlockType::STONE, BlockSide::TOP, [0; 4]);
        for corner in face.corners {
            assert_eq!(corner.y, 4.0);
            assert!((2.0..=3.0).contains(&corner.x));
            assert!((4.0..=5.0).contains(&corner.z));
        }
        assert_eq!(face.normal, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn ao_darkens_and_flips() {
        let face = Face::new(Point3::new(0, 0, 0), BlockType::SNOW, BlockSide::FRONT, [3, 0, 0, 0]);
        let base = BlockType::SNOW.color();
        assert_eq!(face.colors[0][0], base[0] * 0.5);
        assert_eq!(face.colors[1][0], base[0]);
        assert!(face.flipped);
        assert_eq!(face.indices(), [1, 2, 3, 3, 0, 1]);
    }

    #[test]
    fn ao_levels() {
        assert_eq!(ao_level(false, false, false), 0);
        assert_eq!(ao_level(false, false, true), 1);
        assert_eq!(ao_level(true, false, true), 2);
        assert_eq!(ao_level(true, true, false), 3);
    }

    #[test]
    fn uvs_stay_inside_the_tile() {
        let face = Face::new(Point3::new(0, 0, 0), BlockType::LEAVES, BlockSide::LEFT, [0; 4]);
        let tile = BlockType::LEAVES.texture_index(BlockSide::LEFT);
        let size = 1.0 / ATLAS_TILES as f32;
        let (u0, v0) = ((tile % ATLAS_TILES) as f32 * size, (tile / ATLAS_TILES) as f32 * size);
        for [u, v] in face.uvs {
            assert!(u >= u0 && u <= u0 + size);
            assert!(v >= v0 && v <= v0 + size);
        }
    }
}
