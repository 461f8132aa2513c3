//! # Tree Map
//!
//! Deterministic exclusion-radius placement of trees.
//!
//! ## Algorithm
//!
//! Columns are classified once, in row-major order (`z` outer, `x` inner) over the
//! query box grown by [`TREE_EXCLUSION_RADIUS`] on every side:
//!
//! 1. A column that already has a classification is skipped.
//! 2. Columns at or just above sea level, or whose top voxel is not solid, stay empty.
//! 3. A per-column RNG seeded from `"{seed}_{x}_{z}"` rolls against a target density
//!    taken from the erosion, peaks & valleys and continental bands.
//! 4. A passing column with a trunk anywhere within the radius stays empty. Otherwise
//!    it becomes a trunk and claims every column within the radius that is not already
//!    a trunk or a leaf, empty ones included, as a leaf column.
//!
//! Trunk and leaf classifications never change once written, so no two trunks are ever
//! within the radius of each other. Which columns end up as trunks does depend on the scan order:
//! a trunk forecloses the columns scanned after it. The row-major growing-box order is
//! therefore part of the world's definition.
//!
//! Regions are one chunk column wide and are dropped with the chunks that own them.
//! A column reclassified after its region was dropped can land on a different
//! outcome if its neighbours' regions survived.

use log::trace;

use super::footprint::TreeFootprint;
use super::tree_value::{TreeKind, TreeValue};
use crate::engine_state::noise::hash_seed;
use crate::engine_state::noise::region_cache::{Global2DMap, RegionKey2D};
use crate::engine_state::noise::shape_maps::bands::{
    continental_tree_multiplier, ErosionBand, PvBand,
};
use crate::engine_state::noise::shape_maps::{ShapeMaps, SEA_LEVEL};
use crate::engine_state::voxels::chunk::{ChunkId, CHUNK_WIDTH};

/// Chebyshev radius within which no two trunks may stand.
pub const TREE_EXCLUSION_RADIUS: i32 = 3;
/// Shortest trunk.
pub const MIN_TRUNK_HEIGHT: u8 = 4;
/// Tallest trunk.
pub const MAX_TRUNK_HEIGHT: u8 = 7;
/// Trunk probability of a column with every band multiplier at 1.
const BASE_TREE_PROBABILITY: f64 = 0.04;

/// Classifications of one chunk column.
struct TreeRegion {
    origin_x: i32,
    origin_z: i32,
    columns: Vec<Option<TreeValue>>,
}

impl TreeRegion {
    fn new(key: RegionKey2D) -> Self {
        TreeRegion {
            origin_x: key.0 * CHUNK_WIDTH,
            origin_z: key.1 * CHUNK_WIDTH,
            columns: vec![None; (CHUNK_WIDTH * CHUNK_WIDTH) as usize],
        }
    }

    fn index(&self, x: i32, z: i32) -> usize {
        ((x - self.origin_x) + CHUNK_WIDTH * (z - self.origin_z)) as usize
    }
}

/// Region-cached tree classification for one seed.
pub struct TreeMap {
    seed: String,
    regions: Global2DMap<TreeRegion>,
}

impl TreeMap {
    pub fn new(seed: &str, max_regions: usize) -> Self {
        TreeMap {
            seed: seed.to_string(),
            regions: Global2DMap::new(CHUNK_WIDTH, max_regions, TreeRegion::new),
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Classification of column `(x, z)`, or `None` if it has not been classified
    /// (or its region has been dropped).
    pub fn classification(&self, x: i32, z: i32) -> Option<TreeValue> {
        let region = self.regions.region(x, z)?;
        region.columns[region.index(x, z)]
    }

    fn classify(&mut self, x: i32, z: i32, value: TreeValue) {
        let region = self.regions.region_mut(x, z);
        let index = region.index(x, z);
        region.columns[index] = Some(value);
    }

    /// Classifies every column of the inclusive box `[min_x, max_x] × [min_z, max_z]`,
    /// plus a margin of [`TREE_EXCLUSION_RADIUS`] so trunks just outside the box are
    /// known too.
    pub fn load_columns_in_box(
        &mut self,
        shapes: &mut ShapeMaps,
        min_x: i32,
        min_z: i32,
        max_x: i32,
        max_z: i32,
    ) {
        let r = TREE_EXCLUSION_RADIUS;
        for z in (min_z - r)..=(max_z + r) {
            for x in (min_x - r)..=(max_x + r) {
                self.classify_column(shapes, x, z);
            }
        }
    }

    fn classify_column(&mut self, shapes: &mut ShapeMaps, x: i32, z: i32) {
        if self.classification(x, z).is_some() {
            return;
        }

        let Some(trunk) = self.roll_trunk(shapes, x, z) else {
            self.classify(x, z, TreeValue::EMPTY);
            return;
        };

        if self.trunk_within_radius(x, z) {
            self.classify(x, z, TreeValue::EMPTY);
            return;
        }

        trace!("Tree trunk at ({}, {}) height {}", x, z, trunk.trunk_height);
        self.classify(x, z, trunk);

        let r = TREE_EXCLUSION_RADIUS;
        for dz in -r..=r {
            for dx in -r..=r {
                // trunks and leaves keep their claim; empty columns are taken over
                let claimed = matches!(
                    self.classification(x + dx, z + dz),
                    Some(value) if value.kind != TreeKind::Empty
                );
                if (dx, dz) == (0, 0) || claimed {
                    continue;
                }
                self.classify(x + dx, z + dz, TreeValue::leaf_of(trunk, leaf_distance(dx, dz)));
            }
        }
    }

    /// The trunk column `(x, z)` would grow, if it passes the terrain checks and its roll.
    fn roll_trunk(&self, shapes: &mut ShapeMaps, x: i32, z: i32) -> Option<TreeValue> {
        let surface = shapes.surface_height(x, z);
        if surface <= SEA_LEVEL + 1 || !shapes.is_solid(x, surface - 1, z) {
            return None;
        }

        let probability = BASE_TREE_PROBABILITY
            * ErosionBand::classify(shapes.erosion(x, z)).tree_multiplier()
            * PvBand::classify(shapes.peaks_valleys(x, z)).tree_multiplier()
            * continental_tree_multiplier(shapes.continentalness(x, z));

        let mut rng = fastrand::Rng::with_seed(hash_seed(&format!("{}_{}_{}", self.seed, x, z)));
        if rng.f64() >= probability {
            return None;
        }
        TreeValue::trunk(rng.u8(MIN_TRUNK_HEIGHT..=MAX_TRUNK_HEIGHT), surface)
    }

    fn trunk_within_radius(&self, x: i32, z: i32) -> bool {
        let r = TREE_EXCLUSION_RADIUS;
        (-r..=r).any(|dz| {
            (-r..=r).any(|dx| {
                (dx, dz) != (0, 0)
                    && self
                        .classification(x + dx, z + dz)
                        .is_some_and(|value| value.kind == TreeKind::Trunk)
            })
        })
    }

    /// Classifies the columns of chunk `id` and packs them for a worker.
    ///
    /// Chunks whose vertical span cannot hold any tree voxel get an all-empty
    /// footprint without classifying anything.
    pub fn footprint(&mut self, shapes: &mut ShapeMaps, id: ChunkId) -> TreeFootprint {
        let origin = id.origin();
        if !TreeFootprint::can_hold_trees(id) {
            return TreeFootprint::empty(&self.seed, origin.x, origin.z);
        }

        self.load_columns_in_box(
            shapes,
            origin.x,
            origin.z,
            origin.x + CHUNK_WIDTH - 1,
            origin.z + CHUNK_WIDTH - 1,
        );

        let mut values = Vec::with_capacity((CHUNK_WIDTH * CHUNK_WIDTH) as usize);
        for lz in 0..CHUNK_WIDTH {
            for lx in 0..CHUNK_WIDTH {
                let value = self
                    .classification(origin.x + lx, origin.z + lz)
                    .unwrap_or(TreeValue::EMPTY);
                values.push(value.pack());
            }
        }
        TreeFootprint::from_packed(&self.seed, origin.x, origin.z, values)
    }

    /// Whether voxel `(x, y, z)` is trunk wood. `surface_y` is the column's surface height.
    pub fn should_spawn_trunk(&self, x: i32, y: i32, z: i32, surface_y: i32) -> bool {
        self.classification(x, z)
            .is_some_and(|value| value.is_trunk_at(y, surface_y))
    }

    /// Whether voxel `(x, y, z)` is a leaf.
    pub fn should_spawn_leaf(&self, x: i32, y: i32, z: i32) -> bool {
        self.classification(x, z)
            .is_some_and(|value| value.is_leaf_at(&self.seed, x, y, z))
    }

    /// Drops the classifications of the column under chunk `id`.
    pub fn unload_chunk(&mut self, id: ChunkId) {
        self.regions.unload_region((id.x, id.z));
    }

    /// Number of live regions.
    pub fn loaded_regions(&self) -> usize {
        self.regions.len()
    }
}

/// Leaf distance band for an offset from the trunk: rounded Euclidean, `1..=3`.
fn leaf_distance(dx: i32, dz: i32) -> u8 {
    (((dx * dx + dz * dz) as f64).sqrt().round() as u8).clamp(1, 3)
}
