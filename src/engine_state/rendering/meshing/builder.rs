//! # Chunk Geometry Builder
//!
//! Walks a chunk's voxels and emits one quad per visible face, split into an opaque
//! and a transparent buffer set.
//!
//! Water only draws its top plane one voxel below sea level. Faces that look out of
//! the chunk into a voxel no loaded chunk knows about are decided by the shape maps.

use cgmath::{EuclideanSpace, Point3, Vector3};

use super::face::{ao_level, Face, CORNERS};
use super::geometry::ChunkGeometry;
use super::VoxelAccess;
use crate::engine_state::noise::shape_maps::{ShapeMaps, SEA_LEVEL};
use crate::engine_state::voxels::block::{block_side::BlockSide, block_type::BlockType};
use crate::engine_state::voxels::chunk::Chunk;

/// Builds the solid and transparent buffer sets of one chunk.
///
/// Voxels inside the chunk are read from the chunk itself, voxels past its faces from
/// `neighbours`. Where `neighbours` has no data the shape maps stand in for the
/// missing chunk.
pub struct ChunkGeometryBuilder<'a, A: VoxelAccess + ?Sized> {
    chunk: &'a Chunk,
    neighbours: &'a A,
    shapes: &'a mut ShapeMaps,
}

impl<'a, A: VoxelAccess + ?Sized> ChunkGeometryBuilder<'a, A> {
    /// Builds the geometry of `chunk`.
    ///
    /// # Arguments
    /// * `chunk` - The chunk to mesh
    /// * `neighbours` - Block source for voxels outside `chunk`
    /// * `shapes` - Terrain fields used when a neighbouring voxel is unknown
    ///
    /// # Returns
    /// Both buffer sets; either may be empty.
    pub fn build(chunk: &'a Chunk, neighbours: &'a A, shapes: &'a mut ShapeMaps) -> ChunkGeometry {
        ChunkGeometryBuilder {
            chunk,
            neighbours,
            shapes,
        }
        .run()
    }

    fn run(&mut self) -> ChunkGeometry {
        let mut geometry = ChunkGeometry::default();
        let origin = self.chunk.id.origin().to_vec();
        let all_sides = BlockSide::all();
        let water_sides = [BlockSide::TOP];

        for (local, block_type) in self.chunk.iter_blocks() {
            let world = local + origin;

            let sides: &[BlockSide] = if block_type == BlockType::WATER {
                // water is a flat plane one voxel below sea level
                if world.y != SEA_LEVEL - 1 {
                    continue;
                }
                &water_sides
            } else {
                &all_sides
            };

            for &side in sides {
                if !self.face_visible(world, block_type, side) {
                    continue;
                }
                let ao = self.corner_occlusion(world, side);
                let face = Face::new(local, block_type, side, ao);
                if block_type.is_transparent() {
                    geometry.transparent.push_face(&face);
                } else {
                    geometry.solid.push_face(&face);
                }
            }
        }

        geometry
    }

    fn block(&self, position: Point3<i32>) -> Option<BlockType> {
        if self.chunk.id.contains(position) {
            self.chunk.get_block(position)
        } else {
            self.neighbours.block_at(position)
        }
    }

    fn face_visible(&mut self, position: Point3<i32>, block_type: BlockType, side: BlockSide) -> bool {
        let neighbour = position + side.normal();
        match self.block(neighbour) {
            Some(other) if other.is_transparent() => {
                // touching water or leaves of the same kind would only draw interior planes
                !(block_type.is_transparent() && other == block_type)
            }
            Some(_) => false,
            None => !self.buried_against_unknown(position, neighbour, side),
        }
    }

    /// Whether a face looking into an unknown voxel lies well inside the terrain.
    ///
    /// The neighbour's column surface must be above the voxel and both voxels must
    /// agree on solidity, so cave walls at chunk borders still get faces.
    fn buried_against_unknown(
        &mut self,
        position: Point3<i32>,
        neighbour: Point3<i32>,
        side: BlockSide,
    ) -> bool {
        let mut surface = self.shapes.surface_height(neighbour.x, neighbour.z);
        if side == BlockSide::TOP {
            surface -= 1;
        }
        position.y < surface
            && self.shapes.is_solid(position.x, position.y, position.z)
                == self.shapes.is_solid(neighbour.x, neighbour.y, neighbour.z)
    }

    /// Whether the voxel at `sample` darkens a vertex of a face on a block at height
    /// `block_y`.
    ///
    /// Unknown samples above the block need their column surface strictly above the
    /// sample. Samples level with or below the block need the column surface level
    /// with the block, so a neighbouring column that rises above it leaves the lower
    /// corners unshaded.
    fn occludes(&mut self, sample: Point3<i32>, block_y: i32) -> bool {
        if let Some(block_type) = self.block(sample) {
            return block_type.is_opaque();
        }

        let surface = self.shapes.surface_height(sample.x, sample.z);
        let covered = if sample.y > block_y {
            surface > sample.y
        } else {
            surface == block_y + 1
        };
        covered && self.shapes.is_solid(sample.x, sample.y, sample.z)
    }

    /// Occlusion level of each corner of `side`, in [`CORNERS`] order.
    fn corner_occlusion(&mut self, position: Point3<i32>, side: BlockSide) -> [u8; 4] {
        let front = position + side.normal();
        let (u, v) = side.tangents();
        let mut ao = [0u8; 4];

        for (i, (du, dv)) in CORNERS.into_iter().enumerate() {
            let along_u: Vector3<i32> = u * (2 * du - 1);
            let along_v: Vector3<i32> = v * (2 * dv - 1);
            let side1 = self.occludes(front + along_u, position.y);
            let side2 = self.occludes(front + along_v, position.y);
            let corner = self.occludes(front + along_u + along_v, position.y);
            ao[i] = ao_level(side1, side2, corner);
        }

        ao
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::noise::shape_maps::FieldOverrides;
    use crate::engine_state::rendering::meshing::{GeometryBuffers, Isolated, AO_CURVE};
    use crate::engine_state::voxels::chunk::{ChunkId, CHUNK_HEIGHT, CHUNK_WIDTH};

    /// Terrain whose surface sits at 12 everywhere.
    fn flat_shapes() -> ShapeMaps {
        let overrides = FieldOverrides {
            continentalness: Some(0.0),
            erosion: Some(-0.3),
            peaks_valleys: Some(0.0),
        };
        ShapeMaps::with_overrides("flat", overrides, 64)
    }

    /// Lowest possible terrain: the surface sits at -64, so every voxel of the top
    /// layer and below is solid without consulting the cave noise.
    fn abyss_shapes() -> ShapeMaps {
        let overrides = FieldOverrides {
            continentalness: Some(-1.0),
            erosion: Some(-1.0),
            peaks_valleys: Some(-1.0),
        };
        ShapeMaps::with_overrides("abyss", overrides, 64)
    }

    /// Steep peaks where the cave noise is not squashed.
    fn cave_shapes() -> ShapeMaps {
        let overrides = FieldOverrides {
            continentalness: Some(0.0),
            erosion: Some(-0.9),
            peaks_valleys: Some(0.9),
        };
        ShapeMaps::with_overrides("caves", overrides, 1024)
    }

    /// Chunk-local position and colour of every vertex whose normal is `normal`.
    fn vertices_facing(buffers: &GeometryBuffers, normal: [f32; 3]) -> Vec<([f32; 3], [f32; 3])> {
        buffers
            .normals
            .chunks(3)
            .zip(buffers.positions.chunks(3))
            .zip(buffers.colors.chunks(3))
            .filter(|((n, _), _)| *n == &normal[..])
            .map(|((_, p), c)| ([p[0], p[1], p[2]], [c[0], c[1], c[2]]))
            .collect()
    }

    /// A chunk far above the terrain with a hand-placed layout.
    fn sky_chunk(blocks: &[(i32, i32, i32, BlockType)]) -> Chunk {
        let id = ChunkId::new(0, 20, 0);
        let mut chunk = Chunk::empty(id);
        let origin = id.origin();
        for &(x, y, z, block_type) in blocks {
            chunk.set_block(Point3::new(origin.x + x, origin.y + y, origin.z + z), block_type);
        }
        chunk
    }

    #[test]
    fn lone_block_has_six_unshaded_faces() {
        let chunk = sky_chunk(&[(5, 5, 5, BlockType::STONE)]);
        let geometry = ChunkGeometryBuilder::build(&chunk, &Isolated, &mut flat_shapes());

        assert_eq!(geometry.solid.face_count(), 6);
        assert!(geometry.transparent.is_empty());
        let base = BlockType::STONE.color();
        for rgb in geometry.solid.colors.chunks(3) {
            assert_eq!(rgb, &base[..]);
        }
    }

    #[test]
    fn shared_faces_are_culled() {
        let chunk = sky_chunk(&[(5, 5, 5, BlockType::STONE), (6, 5, 5, BlockType::DIRT)]);
        let geometry = ChunkGeometryBuilder::build(&chunk, &Isolated, &mut flat_shapes());
        assert_eq!(geometry.solid.face_count(), 10);
    }

    #[test]
    fn transparent_blocks_go_to_their_own_buffer() {
        let chunk = sky_chunk(&[(5, 5, 5, BlockType::LEAVES), (6, 5, 5, BlockType::LEAVES), (5, 6, 5, BlockType::STONE)]);
        let geometry = ChunkGeometryBuilder::build(&chunk, &Isolated, &mut flat_shapes());

        // the stone's bottom face still shows through the leaves below it
        assert_eq!(geometry.solid.face_count(), 6);
        // leaf-to-leaf and leaf-to-stone faces are skipped
        assert_eq!(geometry.transparent.face_count(), 9);
    }

    #[test]
    fn neighbouring_blocks_shade_corners() {
        let chunk = sky_chunk(&[(5, 5, 5, BlockType::STONE), (6, 6, 5, BlockType::STONE)]);
        let geometry = ChunkGeometryBuilder::build(&chunk, &Isolated, &mut flat_shapes());

        let darker = geometry
            .solid
            .colors
            .chunks(3)
            .filter(|rgb| rgb[0] < BlockType::STONE.color()[0])
            .count();
        // each block has two faces meeting the shared edge, two corners each
        assert_eq!(darker, 8);
    }

    #[test]
    fn empty_chunk_has_no_geometry() {
        let chunk = sky_chunk(&[]);
        let geometry = ChunkGeometryBuilder::build(&chunk, &Isolated, &mut flat_shapes());
        assert!(geometry.is_empty());
    }

    #[test]
    fn buried_border_faces_are_culled() {
        let mut shapes = flat_shapes();
        let id = ChunkId::new(0, -5, 0);
        let mut chunk = Chunk::empty(id);
        // deep below the surface of 12, where density is solid regardless of noise
        let (x, y, z) = (0, -70, 3);
        assert!(shapes.is_solid(x, y, z));
        assert!(shapes.is_solid(x - 1, y, z));
        chunk.set_block(Point3::new(x, y, z), BlockType::STONE);

        let geometry = ChunkGeometryBuilder::build(&chunk, &Isolated, &mut shapes);
        // the LEFT face looks into unknown, buried terrain
        let left = Vector3::new(-1.0, 0.0, 0.0);
        let has_left = geometry
            .solid
            .normals
            .chunks(3)
            .any(|n| n == &[left.x, left.y, left.z][..]);
        assert!(!has_left);
        assert_eq!(geometry.solid.face_count(), 5);
    }

    #[test]
    fn faces_against_unknown_caves_are_kept() {
        let mut shapes = cave_shapes();

        // a solid voxel at local x = 0 whose unknown -x neighbour is cave air under the surface
        let mut found = None;
        'search: for border in (-8..=8).map(|i| i * CHUNK_WIDTH) {
            for z in -64..64 {
                let surface = shapes.surface_height(border - 1, z);
                for y in -60..surface {
                    if shapes.is_solid(border, y, z) && !shapes.is_solid(border - 1, y, z) {
                        found = Some(Point3::new(border, y, z));
                        break 'search;
                    }
                }
            }
        }
        let block = found.expect("no cave wall along the searched chunk borders");

        let mut chunk = Chunk::empty(ChunkId::from_block(block));
        chunk.set_block(block, BlockType::STONE);
        let geometry = ChunkGeometryBuilder::build(&chunk, &Isolated, &mut shapes);

        // the surface is above it, but the two voxels disagree on solidity
        assert_eq!(vertices_facing(&geometry.solid, [-1.0, 0.0, 0.0]).len(), 4);
    }

    #[test]
    fn unknown_samples_above_need_a_higher_surface() {
        let mut shapes = abyss_shapes();
        assert_eq!(shapes.surface_height(-1, 3), -64);

        // ten voxels under the surface, against the chunk's -x border
        let mut chunk = Chunk::empty(ChunkId::new(0, -5, 0));
        chunk.set_block(Point3::new(0, -70, 3), BlockType::STONE);
        let geometry = ChunkGeometryBuilder::build(&chunk, &Isolated, &mut shapes);
        let base = BlockType::STONE.color();

        // samples above the block lie under the -x column's surface
        let top = vertices_facing(&geometry.solid, [0.0, 1.0, 0.0]);
        assert_eq!(top.len(), 4);
        for (position, color) in top {
            let shade = if position[0] == 0.0 { AO_CURVE[2] } else { AO_CURVE[0] };
            assert_eq!(color[0], base[0] * shade, "top corner at {:?}", position);
        }

        // samples below it are only counted when the column tops out at the block's level
        let bottom = vertices_facing(&geometry.solid, [0.0, -1.0, 0.0]);
        assert_eq!(bottom.len(), 4);
        for (position, color) in bottom {
            assert_eq!(color, base, "bottom corner at {:?}", position);
        }
    }

    #[test]
    fn unknown_samples_below_need_a_level_surface() {
        let mut shapes = abyss_shapes();

        // the top voxel of its column, against the chunk's -x border
        let mut chunk = Chunk::empty(ChunkId::new(0, -5, 0));
        chunk.set_block(Point3::new(0, -65, 3), BlockType::STONE);
        let geometry = ChunkGeometryBuilder::build(&chunk, &Isolated, &mut shapes);
        let base = BlockType::STONE.color();

        let bottom = vertices_facing(&geometry.solid, [0.0, -1.0, 0.0]);
        assert_eq!(bottom.len(), 4);
        for (position, color) in bottom {
            let shade = if position[0] == 0.0 { AO_CURVE[2] } else { AO_CURVE[0] };
            assert_eq!(color[0], base[0] * shade, "bottom corner at {:?}", position);
        }

        // above the surface nothing unknown occludes
        let top = vertices_facing(&geometry.solid, [0.0, 1.0, 0.0]);
        assert_eq!(top.len(), 4);
        for (_, color) in top {
            assert_eq!(color, base);
        }
    }

    #[test]
    fn known_neighbours_override_the_heuristic() {
        let mut shapes = flat_shapes();
        let mut chunk = Chunk::empty(ChunkId::new(0, -5, 0));
        chunk.set_block(Point3::new(0, -70, 3), BlockType::STONE);

        // a loaded neighbour with a carved-out pocket next to the block
        let neighbours = |p: Point3<i32>| -> Option<BlockType> {
            if p == Point3::new(-1, -70, 3) {
                Some(BlockType::AIR)
            } else if p.x < 0 {
                Some(BlockType::STONE)
            } else {
                None
            }
        };

        let geometry = ChunkGeometryBuilder::build(&chunk, &neighbours, &mut shapes);
        assert_eq!(geometry.solid.face_count(), 6);
    }

    #[test]
    fn water_renders_only_its_sea_level_plane() {
        let mut shapes = flat_shapes();
        let id = ChunkId::new(0, -1, 0);
        let mut chunk = Chunk::empty(id);
        chunk.set_block(Point3::new(1, SEA_LEVEL - 1, 1), BlockType::WATER);
        chunk.set_block(Point3::new(1, SEA_LEVEL - 2, 1), BlockType::WATER);
        chunk.set_block(Point3::new(3, SEA_LEVEL - 1, 3), BlockType::WATER);
        chunk.set_block(Point3::new(4, SEA_LEVEL - 1, 3), BlockType::WATER);

        let air_above = |p: Point3<i32>| -> Option<BlockType> {
            (p.y >= SEA_LEVEL).then_some(BlockType::AIR)
        };
        let geometry = ChunkGeometryBuilder::build(&chunk, &air_above, &mut shapes);

        assert!(geometry.solid.is_empty());
        assert_eq!(geometry.transparent.face_count(), 3);
        for normal in geometry.transparent.normals.chunks(3) {
            assert_eq!(normal, &[0.0, 1.0, 0.0][..]);
        }
        for position in geometry.transparent.positions.chunks(3) {
            assert_eq!(position[1], CHUNK_HEIGHT as f32);
        }
    }
}
