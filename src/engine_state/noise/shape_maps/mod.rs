//! # Shape Maps
//!
//! The terrain-shape scalars the rest of the world is built from:
//!
//! * `continentalness(x, z)`: ocean versus inland, in `[-1, 1]`
//! * `erosion(x, z)`: flat versus steep, in `[-1, 1]`
//! * `peaks_valleys(x, z)`: local relief, in `[-1, 1]`
//! * `surface_height(x, z)`: integer terrain height
//! * `density(x, y, z)`: solid when positive
//!
//! ## Architecture
//!
//! [`ShapeMaps`] is an explicit context object. It owns one region cache of
//! [`HeightMap`]s (one per chunk column) and one of [`DensityMap`]s (one per chunk),
//! created lazily on first read and dropped when the owning chunk unloads. Workers
//! build their own `ShapeMaps` from the seed; nothing is shared across threads.
//!
//! ## Diagnostics
//!
//! [`FieldOverrides`] pin any of the three 2D fields to a constant. An overridden
//! field never samples noise and never caches.

use noise::Perlin;
use serde::{Deserialize, Serialize};

pub mod bands;
pub mod density_map;
pub mod height_map;

pub use density_map::DensityMap;
pub use height_map::HeightMap;

use super::region_cache::{Global2DMap, Global3DMap};
use super::Map3D;
use crate::engine_state::voxels::chunk::{ChunkId, CHUNK_HEIGHT, CHUNK_WIDTH};

/// Water fills air below this height.
pub const SEA_LEVEL: i32 = 0;
/// Highest possible surface height.
pub const MAX_SURFACE_HEIGHT: i32 = 96;
/// Surface grass turns to snow above this height.
pub const SNOW_HEIGHT: i32 = 64;

/// Fixed values for the 2D shape fields. `None` leaves a field procedural.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOverrides {
    pub continentalness: Option<f64>,
    pub erosion: Option<f64>,
    pub peaks_valleys: Option<f64>,
}

impl FieldOverrides {
    /// Whether any field is pinned.
    pub fn is_active(&self) -> bool {
        self.continentalness.is_some() || self.erosion.is_some() || self.peaks_valleys.is_some()
    }
}

/// Region-cached terrain fields for one seed.
pub struct ShapeMaps {
    seed: String,
    overrides: FieldOverrides,
    heights: Global2DMap<HeightMap<Perlin>>,
    densities: Global3DMap<DensityMap<Perlin>>,
}

impl ShapeMaps {
    /// Creates procedural shape maps for `seed` holding at most `max_regions` regions per cache.
    pub fn new(seed: &str, max_regions: usize) -> Self {
        Self::with_overrides(seed, FieldOverrides::default(), max_regions)
    }

    /// Creates shape maps with some fields pinned.
    pub fn with_overrides(seed: &str, overrides: FieldOverrides, max_regions: usize) -> Self {
        if overrides.is_active() {
            log::debug!("Shape field overrides active: {:?}", overrides);
        }

        let height_seed = seed.to_string();
        let density_seed = seed.to_string();

        ShapeMaps {
            seed: seed.to_string(),
            overrides,
            heights: Global2DMap::new(CHUNK_WIDTH, max_regions, move |_| {
                HeightMap::new(&height_seed, overrides)
            }),
            densities: Global3DMap::new(CHUNK_WIDTH, CHUNK_HEIGHT, max_regions, move |_| {
                DensityMap::new(&density_seed, overrides)
            }),
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn overrides(&self) -> FieldOverrides {
        self.overrides
    }

    pub fn continentalness(&mut self, x: i32, z: i32) -> f64 {
        self.heights.region_mut(x, z).continentalness(x, z)
    }

    pub fn erosion(&mut self, x: i32, z: i32) -> f64 {
        self.heights.region_mut(x, z).erosion(x, z)
    }

    pub fn peaks_valleys(&mut self, x: i32, z: i32) -> f64 {
        self.heights.region_mut(x, z).peaks_valleys(x, z)
    }

    /// Integer surface height of column `(x, z)`.
    pub fn surface_height(&mut self, x: i32, z: i32) -> i32 {
        self.heights.region_mut(x, z).surface_height(x, z)
    }

    /// Density at voxel `(x, y, z)`; positive is solid.
    pub fn density(&mut self, x: i32, y: i32, z: i32) -> f64 {
        self.densities.value_at(x, y, z)
    }

    pub fn is_solid(&mut self, x: i32, y: i32, z: i32) -> bool {
        self.density(x, y, z) > 0.0
    }

    /// Releases the cached regions covering chunk `id`.
    ///
    /// The column region is shared with the chunks stacked above and below; they
    /// rebuild it on their next read.
    pub fn unload_chunk(&mut self, id: ChunkId) {
        self.heights.unload_region((id.x, id.z));
        self.densities.unload_region((id.x, id.y, id.z));
    }

    /// Number of live `(column, chunk)` regions.
    pub fn loaded_regions(&self) -> (usize, usize) {
        (self.heights.len(), self.densities.len())
    }
}
