//! # Noise Fields
//!
//! Seeded gradient noise addressed by integer world coordinates.
//!
//! A field owns its sampler (Perlin by default), a length scale and a seed-derived
//! coordinate offset. The offset keeps integer lattice points away from the origin
//! so that different seeds give different values at `(0, 0)`, where raw gradient
//! noise is always zero.
//!
//! `value_at` is memoized per integer key. `sample` and `fractal` are the raw,
//! uncached building blocks used by the shape maps that memoize at their own level.

use std::collections::HashMap;

use noise::{NoiseFn, Perlin};

use super::{hash_seed, Map2D, Map3D};

/// Spread of the seed-derived coordinate offset, in scaled noise units.
const OFFSET_RANGE: u64 = 100_000;

fn seed_offsets(seed: &str) -> [f64; 3] {
    let hash = hash_seed(seed);
    let component = |shift: u32| ((hash >> shift) % OFFSET_RANGE) as f64 + 0.5;
    [component(0), component(21), component(42)]
}

fn perlin_for(seed: &str) -> Perlin {
    Perlin::new(hash_seed(seed) as u32)
}

/// A seeded 2D noise field with values in `[-1, 1]`.
pub struct NoiseField2D<N = Perlin> {
    sampler: N,
    scale: f64,
    offset: [f64; 2],
    cache: HashMap<(i32, i32), f64>,
}

impl NoiseField2D<Perlin> {
    /// Creates a Perlin field for `seed` with the given length scale (world units per noise period).
    pub fn new(seed: &str, scale: f64) -> Self {
        Self::with_sampler(perlin_for(seed), seed, scale)
    }
}

impl<N: NoiseFn<f64, 2>> NoiseField2D<N> {
    /// Creates a field around an arbitrary sampler. The seed still drives the coordinate offset.
    pub fn with_sampler(sampler: N, seed: &str, scale: f64) -> Self {
        let [ox, _, oz] = seed_offsets(seed);
        NoiseField2D {
            sampler,
            scale,
            offset: [ox, oz],
            cache: HashMap::new(),
        }
    }

    /// Uncached sample at a world position using `scale` instead of the field's own.
    pub fn sample(&self, x: f64, z: f64, scale: f64) -> f64 {
        self.sampler
            .get([x / scale + self.offset[0], z / scale + self.offset[1]])
            .clamp(-1.0, 1.0)
    }

    /// Uncached fractal sum of `octaves` layers, normalized by the summed amplitude.
    ///
    /// Each octave doubles the frequency and multiplies the amplitude by `persistence`.
    pub fn fractal(&self, x: f64, z: f64, scale: f64, octaves: u32, persistence: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut amplitude_sum = 0.0;
        let mut octave_scale = scale;

        for _ in 0..octaves {
            total += self.sample(x, z, octave_scale) * amplitude;
            amplitude_sum += amplitude;
            amplitude *= persistence;
            octave_scale /= 2.0;
        }

        if amplitude_sum == 0.0 {
            0.0
        } else {
            total / amplitude_sum
        }
    }

    /// The field's own length scale.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Number of memoized points.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl<N: NoiseFn<f64, 2>> Map2D for NoiseField2D<N> {
    fn value_at(&mut self, x: i32, z: i32) -> f64 {
        if let Some(value) = self.cache.get(&(x, z)) {
            return *value;
        }
        let value = self.sample(x as f64, z as f64, self.scale);
        self.cache.insert((x, z), value);
        value
    }
}

/// A seeded 3D noise field.
pub struct NoiseField3D<N = Perlin> {
    sampler: N,
    scale: f64,
    offset: [f64; 3],
    cache: HashMap<(i32, i32, i32), f64>,
}

impl NoiseField3D<Perlin> {
    /// Creates a Perlin field for `seed` with the given length scale.
    pub fn new(seed: &str, scale: f64) -> Self {
        Self::with_sampler(perlin_for(seed), seed, scale)
    }
}

impl<N: NoiseFn<f64, 3>> NoiseField3D<N> {
    /// Creates a field around an arbitrary sampler.
    pub fn with_sampler(sampler: N, seed: &str, scale: f64) -> Self {
        NoiseField3D {
            sampler,
            scale,
            offset: seed_offsets(seed),
            cache: HashMap::new(),
        }
    }

    /// Uncached sample at a world position using `scale` instead of the field's own.
    pub fn sample(&self, x: f64, y: f64, z: f64, scale: f64) -> f64 {
        self.sampler.get([
            x / scale + self.offset[0],
            y / scale + self.offset[1],
            z / scale + self.offset[2],
        ])
    }

    /// Uncached fractal sum of `octaves` layers, normalized by the summed amplitude.
    pub fn fractal(
        &self,
        x: f64,
        y: f64,
        z: f64,
        scale: f64,
        octaves: u32,
        persistence: f64,
    ) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut amplitude_sum = 0.0;
        let mut octave_scale = scale;

        for _ in 0..octaves {
            total += self.sample(x, y, z, octave_scale) * amplitude;
            amplitude_sum += amplitude;
            amplitude *= persistence;
            octave_scale /= 2.0;
        }

        if amplitude_sum == 0.0 {
            0.0
        } else {
            total / amplitude_sum
        }
    }

    /// Number of memoized points.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl<N: NoiseFn<f64, 3>> Map3D for NoiseField3D<N> {
    fn value_at(&mut self, x: i32, y: i32, z: i32) -> f64 {
        if let Some(value) = self.cache.get(&(x, y, z)) {
            return *value;
        }
        let value = self.sample(x as f64, y as f64, z as f64, self.scale);
        self.cache.insert((x, y, z), value);
        value
    }
}
