//! # Density Map
//!
//! Per-region 3D solid/air field. A positive density is solid.
//!
//! Below [`DENSITY_MIN_HEIGHT`] everything is solid and above [`DENSITY_MAX_HEIGHT`]
//! everything is air, without touching the noise. In between, a three-octave 3D
//! fractal is squashed by a factor chosen from the column's erosion and peaks &
//! valleys bands and offset toward solid, so caves mostly open up under steep,
//! high ground. Below [`LARGE_CAVES_HEIGHT`] the noise is sampled at twice the
//! length scale, which widens the caves.

use std::collections::HashMap;

use noise::{NoiseFn, Perlin};

use super::bands::{squash_factor, ErosionBand, PvBand};
use super::height_map::{ErosionMap, PeaksValleysMap};
use super::{FieldOverrides, MAX_SURFACE_HEIGHT};
use crate::engine_state::noise::noise_field::NoiseField3D;
use crate::engine_state::noise::{derive_seed, Map2D, Map3D};

/// Everything strictly below this height is solid.
pub const DENSITY_MIN_HEIGHT: i32 = -64;
/// Everything strictly above this height is air.
pub const DENSITY_MAX_HEIGHT: i32 = MAX_SURFACE_HEIGHT;
/// Below this height caves use the coarser length scale.
pub const LARGE_CAVES_HEIGHT: i32 = -24;

const DENSITY_SCALE: f64 = 48.0;
const LARGE_CAVES_SCALE: f64 = 96.0;
const DENSITY_OCTAVES: u32 = 3;
const DENSITY_PERSISTENCE: f64 = 0.5;
/// Constant bias toward solid.
const DENSITY_OFFSET: f64 = 0.35;

/// Density of one region.
pub struct DensityMap<N = Perlin> {
    field: NoiseField3D<N>,
    erosion: ErosionMap<N>,
    peaks_valleys: PeaksValleysMap<N>,
    cache: HashMap<(i32, i32, i32), f64>,
}

impl DensityMap<Perlin> {
    pub fn new(seed: &str, overrides: FieldOverrides) -> Self {
        DensityMap {
            field: NoiseField3D::new(&derive_seed(seed, "density"), DENSITY_SCALE),
            erosion: ErosionMap::new(seed, overrides.erosion),
            peaks_valleys: PeaksValleysMap::new(seed, overrides.peaks_valleys),
            cache: HashMap::new(),
        }
    }
}

impl<N: NoiseFn<f64, 2> + NoiseFn<f64, 3> + Clone> DensityMap<N> {
    pub fn with_sampler(sampler: N, seed: &str, overrides: FieldOverrides) -> Self {
        DensityMap {
            field: NoiseField3D::with_sampler(
                sampler.clone(),
                &derive_seed(seed, "density"),
                DENSITY_SCALE,
            ),
            erosion: ErosionMap::with_sampler(sampler.clone(), seed, overrides.erosion),
            peaks_valleys: PeaksValleysMap::with_sampler(sampler, seed, overrides.peaks_valleys),
            cache: HashMap::new(),
        }
    }
}

impl<N: NoiseFn<f64, 2> + NoiseFn<f64, 3>> DensityMap<N> {
    fn squash_at(&mut self, x: i32, z: i32) -> f64 {
        let erosion = self.erosion.value_at(x, z);
        let peaks_valleys = self.peaks_valleys.value_for(x, z, erosion);
        squash_factor(
            ErosionBand::classify(erosion),
            PvBand::classify(peaks_valleys),
        )
    }

    /// Number of memoized voxels.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl<N: NoiseFn<f64, 2> + NoiseFn<f64, 3>> Map3D for DensityMap<N> {
    fn value_at(&mut self, x: i32, y: i32, z: i32) -> f64 {
        if y < DENSITY_MIN_HEIGHT {
            return 1.0;
        }
        if y > DENSITY_MAX_HEIGHT {
            return -1.0;
        }
        if let Some(value) = self.cache.get(&(x, y, z)) {
            return *value;
        }

        let scale = if y < LARGE_CAVES_HEIGHT {
            LARGE_CAVES_SCALE
        } else {
            DENSITY_SCALE
        };
        let noise = self.field.fractal(
            x as f64,
            y as f64,
            z as f64,
            scale,
            DENSITY_OCTAVES,
            DENSITY_PERSISTENCE,
        );
        let value = noise * self.squash_at(x, z) + DENSITY_OFFSET;
        self.cache.insert((x, y, z), value);
        value
    }
}
