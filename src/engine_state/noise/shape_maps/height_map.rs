//! # Height Map
//!
//! Per-region composition of the three large-scale 2D fields into an integer
//! surface height.
//!
//! ```text
//! surface = floor(base_height(C) + pv_height(PV, erosion_factor(E)))
//! ```
//!
//! Each field memoizes its own values, and the height memoizes on top of them, so a
//! warm column costs a single hash lookup. A field with a fixed override never
//! samples noise and never caches.

use std::collections::HashMap;

use noise::{NoiseFn, Perlin};

use super::bands::{base_height, erosion_factor, pv_height, ErosionBand};
use super::FieldOverrides;
use crate::engine_state::noise::noise_field::NoiseField2D;
use crate::engine_state::noise::{derive_seed, Map2D};

/// Length scale of the continentalness field.
pub const CONTINENTALNESS_SCALE: f64 = 2500.0;
/// Length scale of the erosion field.
pub const EROSION_SCALE: f64 = 1024.0;
/// Base length scale of the peaks & valleys field.
pub const PEAKS_VALLEYS_SCALE: f64 = 256.0;
/// Peaks & valleys length scale where erosion is very low.
pub const PEAKS_VALLEYS_STEEP_SCALE: f64 = 128.0;
/// Number of fractal octaves for peaks & valleys.
pub const PEAKS_VALLEYS_OCTAVES: u32 = 4;
/// Amplitude falloff per peaks & valleys octave.
pub const PEAKS_VALLEYS_PERSISTENCE: f64 = 0.5;

/// Single-octave continentalness in `[-1, 1]`.
pub struct ContinentalnessMap<N = Perlin> {
    field: NoiseField2D<N>,
    fixed: Option<f64>,
}

impl ContinentalnessMap<Perlin> {
    pub fn new(seed: &str, fixed: Option<f64>) -> Self {
        ContinentalnessMap {
            field: NoiseField2D::new(&derive_seed(seed, "continentalness"), CONTINENTALNESS_SCALE),
            fixed,
        }
    }
}

impl<N: NoiseFn<f64, 2>> ContinentalnessMap<N> {
    pub fn with_sampler(sampler: N, seed: &str, fixed: Option<f64>) -> Self {
        ContinentalnessMap {
            field: NoiseField2D::with_sampler(
                sampler,
                &derive_seed(seed, "continentalness"),
                CONTINENTALNESS_SCALE,
            ),
            fixed,
        }
    }
}

impl<N: NoiseFn<f64, 2>> Map2D for ContinentalnessMap<N> {
    fn value_at(&mut self, x: i32, z: i32) -> f64 {
        match self.fixed {
            Some(value) => value,
            None => self.field.value_at(x, z),
        }
    }
}

/// Single-octave erosion in `[-1, 1]`.
pub struct ErosionMap<N = Perlin> {
    field: NoiseField2D<N>,
    fixed: Option<f64>,
}

impl ErosionMap<Perlin> {
    pub fn new(seed: &str, fixed: Option<f64>) -> Self {
        ErosionMap {
            field: NoiseField2D::new(&derive_seed(seed, "erosion"), EROSION_SCALE),
            fixed,
        }
    }
}

impl<N: NoiseFn<f64, 2>> ErosionMap<N> {
    pub fn with_sampler(sampler: N, seed: &str, fixed: Option<f64>) -> Self {
        ErosionMap {
            field: NoiseField2D::with_sampler(sampler, &derive_seed(seed, "erosion"), EROSION_SCALE),
            fixed,
        }
    }
}

impl<N: NoiseFn<f64, 2>> Map2D for ErosionMap<N> {
    fn value_at(&mut self, x: i32, z: i32) -> f64 {
        match self.fixed {
            Some(value) => value,
            None => self.field.value_at(x, z),
        }
    }
}

/// Four-octave peaks & valleys in `[-1, 1]`.
///
/// Its length scale depends on the erosion at the same column, so the value is
/// read through [`PeaksValleysMap::value_for`] rather than [`Map2D`].
pub struct PeaksValleysMap<N = Perlin> {
    field: NoiseField2D<N>,
    fixed: Option<f64>,
    cache: HashMap<(i32, i32), f64>,
}

impl PeaksValleysMap<Perlin> {
    pub fn new(seed: &str, fixed: Option<f64>) -> Self {
        PeaksValleysMap {
            field: NoiseField2D::new(&derive_seed(seed, "peaks_valleys"), PEAKS_VALLEYS_SCALE),
            fixed,
            cache: HashMap::new(),
        }
    }
}

impl<N: NoiseFn<f64, 2>> PeaksValleysMap<N> {
    pub fn with_sampler(sampler: N, seed: &str, fixed: Option<f64>) -> Self {
        PeaksValleysMap {
            field: NoiseField2D::with_sampler(
                sampler,
                &derive_seed(seed, "peaks_valleys"),
                PEAKS_VALLEYS_SCALE,
            ),
            fixed,
            cache: HashMap::new(),
        }
    }

    /// Peaks & valleys at `(x, z)`, given the erosion of that column.
    pub fn value_for(&mut self, x: i32, z: i32, erosion: f64) -> f64 {
        if let Some(value) = self.fixed {
            return value;
        }
        if let Some(value) = self.cache.get(&(x, z)) {
            return *value;
        }

        let scale = match ErosionBand::classify(erosion) {
            ErosionBand::VeryLow => PEAKS_VALLEYS_STEEP_SCALE,
            _ => PEAKS_VALLEYS_SCALE,
        };
        let value = self.field.fractal(
            x as f64,
            z as f64,
            scale,
            PEAKS_VALLEYS_OCTAVES,
            PEAKS_VALLEYS_PERSISTENCE,
        );
        self.cache.insert((x, z), value);
        value
    }
}

/// Surface height of one region.
pub struct HeightMap<N = Perlin> {
    continentalness: ContinentalnessMap<N>,
    erosion: ErosionMap<N>,
    peaks_valleys: PeaksValleysMap<N>,
    heights: HashMap<(i32, i32), i32>,
}

impl HeightMap<Perlin> {
    /// Creates the Perlin-backed height map for `seed`.
    pub fn new(seed: &str, overrides: FieldOverrides) -> Self {
        HeightMap {
            continentalness: ContinentalnessMap::new(seed, overrides.continentalness),
            erosion: ErosionMap::new(seed, overrides.erosion),
            peaks_valleys: PeaksValleysMap::new(seed, overrides.peaks_valleys),
            heights: HashMap::new(),
        }
    }
}

impl<N: NoiseFn<f64, 2> + Clone> HeightMap<N> {
    /// Creates a height map whose three fields clone one sampler.
    ///
    /// Each field still gets its own derived seed for the coordinate offset.
    pub fn with_sampler(sampler: N, seed: &str, overrides: FieldOverrides) -> Self {
        HeightMap {
            continentalness: ContinentalnessMap::with_sampler(
                sampler.clone(),
                seed,
                overrides.continentalness,
            ),
            erosion: ErosionMap::with_sampler(sampler.clone(), seed, overrides.erosion),
            peaks_valleys: PeaksValleysMap::with_sampler(sampler, seed, overrides.peaks_valleys),
            heights: HashMap::new(),
        }
    }
}

impl<N: NoiseFn<f64, 2>> HeightMap<N> {
    pub fn continentalness(&mut self, x: i32, z: i32) -> f64 {
        self.continentalness.value_at(x, z)
    }

    pub fn erosion(&mut self, x: i32, z: i32) -> f64 {
        self.erosion.value_at(x, z)
    }

    pub fn peaks_valleys(&mut self, x: i32, z: i32) -> f64 {
        let erosion = self.erosion.value_at(x, z);
        self.peaks_valleys.value_for(x, z, erosion)
    }

    /// Integer surface height at `(x, z)`. Voxels with `y < surface` lie under the terrain.
    pub fn surface_height(&mut self, x: i32, z: i32) -> i32 {
        if let Some(height) = self.heights.get(&(x, z)) {
            return *height;
        }

        let continentalness = self.continentalness(x, z);
        let erosion = self.erosion(x, z);
        let peaks_valleys = self.peaks_valleys.value_for(x, z, erosion);

        let height =
            (base_height(continentalness) + pv_height(peaks_valleys, erosion_factor(erosion)))
                .floor() as i32;
        self.heights.insert((x, z), height);
        height
    }
}

impl<N: NoiseFn<f64, 2>> Map2D for HeightMap<N> {
    fn value_at(&mut self, x: i32, z: i32) -> f64 {
        self.surface_height(x, z) as f64
    }
}
