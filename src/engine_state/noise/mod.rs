//! # Terrain Noise
//!
//! Seeded scalar fields and the maps composed from them.
//!
//! ## Layers
//!
//! * **NoiseField**: a seeded 2D/3D gradient noise sampler with per-point memoization
//! * **ShapeMaps**: continentalness, erosion, peaks & valleys, surface height and density
//! * **RegionCache**: lazily created, explicitly evicted per-region sub-maps
//!
//! Every map is addressed by integer voxel or column coordinates and is a pure
//! function of `(seed, coordinate)`. Caching never changes a returned value.

pub mod noise_field;
pub mod region_cache;
pub mod shape_maps;

/// A scalar field addressed by world column.
///
/// Memoizing implementations take `&mut self`; a read may populate a cache but
/// never changes what later reads return.
pub trait Map2D {
    /// Value of the field at column `(x, z)`.
    fn value_at(&mut self, x: i32, z: i32) -> f64;
}

/// A scalar field addressed by world voxel.
pub trait Map3D {
    /// Value of the field at voxel `(x, y, z)`.
    fn value_at(&mut self, x: i32, y: i32, z: i32) -> f64;
}

/// Stable 64-bit FNV-1a hash of a string.
///
/// Used to turn textual seeds into numeric ones. Unlike `DefaultHasher` this is
/// guaranteed identical across processes, platforms and compiler versions.
pub fn hash_seed(seed: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    seed.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(PRIME)
    })
}

/// Derives the seed of a named sub-field, e.g. `derive_seed("abc", "erosion")` for `"abc_erosion"`.
pub fn derive_seed(seed: &str, field: &str) -> String {
    format!("{seed}_{field}")
}

/// Linear interpolation between `a` and `b`, exact at `t = 0` and `t = 1`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Maps `value` from `[from_lo, from_hi]` onto `[to_lo, to_hi]`, clamping to the target range.
pub fn remap(value: f64, from_lo: f64, from_hi: f64, to_lo: f64, to_hi: f64) -> f64 {
    if from_hi == from_lo {
        return to_lo;
    }
    let t = ((value - from_lo) / (from_hi - from_lo)).clamp(0.0, 1.0);
    lerp(to_lo, to_hi, t)
}
