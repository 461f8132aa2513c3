//! # Region Cache
//!
//! Unbounded-world semantics with bounded memory. The world is tiled into
//! axis-aligned regions (one chunk column for 2D maps, one chunk for 3D maps);
//! each region owns one sub-map instance, created on first read and dropped on
//! explicit unload.
//!
//! A region is either absent or owns a fully constructed sub-map; there is no
//! partially built state. As a safety net the number of live regions is capped by
//! an LRU policy. Evicting a region only costs recomputation, since every sub-map
//! is a pure function of the seed.

use std::num::NonZeroUsize;

use log::debug;
use lru::LruCache;

use super::{Map2D, Map3D};

/// Key of a 2D region, in region units.
pub type RegionKey2D = (i32, i32);
/// Key of a 3D region, in region units.
pub type RegionKey3D = (i32, i32, i32);

type Factory<K, M> = Box<dyn Fn(K) -> M>;

fn capacity(max_regions: usize) -> NonZeroUsize {
    NonZeroUsize::new(max_regions).unwrap_or(NonZeroUsize::MIN)
}

/// Lazily populated grid of 2D sub-maps.
pub struct Global2DMap<M> {
    region_size: i32,
    regions: LruCache<RegionKey2D, M>,
    factory: Factory<RegionKey2D, M>,
}

impl<M> Global2DMap<M> {
    /// Creates an empty map whose regions are `region_size` columns wide.
    ///
    /// `factory` builds the sub-map for a region key on first access.
    pub fn new(
        region_size: i32,
        max_regions: usize,
        factory: impl Fn(RegionKey2D) -> M + 'static,
    ) -> Self {
        Global2DMap {
            region_size,
            regions: LruCache::new(capacity(max_regions)),
            factory: Box::new(factory),
        }
    }

    /// Region key owning column `(x, z)`.
    pub fn region_key(&self, x: i32, z: i32) -> RegionKey2D {
        (x.div_euclid(self.region_size), z.div_euclid(self.region_size))
    }

    /// Sub-map owning column `(x, z)`, created if absent.
    pub fn region_mut(&mut self, x: i32, z: i32) -> &mut M {
        let key = self.region_key(x, z);
        if !self.regions.contains(&key) && self.regions.len() == self.regions.cap().get() {
            if let Some((evicted, _)) = self.regions.pop_lru() {
                debug!("Region cache full, evicting 2D region {:?}", evicted);
            }
        }
        let factory = &self.factory;
        self.regions.get_or_insert_mut(key, || factory(key))
    }

    /// Sub-map owning column `(x, z)` if it is live. Does not touch the LRU order.
    pub fn region(&self, x: i32, z: i32) -> Option<&M> {
        self.regions.peek(&self.region_key(x, z))
    }

    /// Drops the sub-map of region `key`. Returns whether it was live.
    pub fn unload_region(&mut self, key: RegionKey2D) -> bool {
        self.regions.pop(&key).is_some()
    }

    /// Whether region `key` currently owns a sub-map.
    pub fn is_loaded(&self, key: RegionKey2D) -> bool {
        self.regions.contains(&key)
    }

    /// Number of live regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no region is live.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Side length of a region, in columns.
    pub fn region_size(&self) -> i32 {
        self.region_size
    }
}

impl<M: Map2D> Map2D for Global2DMap<M> {
    fn value_at(&mut self, x: i32, z: i32) -> f64 {
        self.region_mut(x, z).value_at(x, z)
    }
}

/// Lazily populated grid of 3D sub-maps.
pub struct Global3DMap<M> {
    region_width: i32,
    region_height: i32,
    regions: LruCache<RegionKey3D, M>,
    factory: Factory<RegionKey3D, M>,
}

impl<M> Global3DMap<M> {
    /// Creates an empty map of `region_width × region_height × region_width` regions.
    pub fn new(
        region_width: i32,
        region_height: i32,
        max_regions: usize,
        factory: impl Fn(RegionKey3D) -> M + 'static,
    ) -> Self {
        Global3DMap {
            region_width,
            region_height,
            regions: LruCache::new(capacity(max_regions)),
            factory: Box::new(factory),
        }
    }

    /// Region key owning voxel `(x, y, z)`.
    pub fn region_key(&self, x: i32, y: i32, z: i32) -> RegionKey3D {
        (
            x.div_euclid(self.region_width),
            y.div_euclid(self.region_height),
            z.div_euclid(self.region_width),
        )
    }

    /// Sub-map owning voxel `(x, y, z)`, created if absent.
    pub fn region_mut(&mut self, x: i32, y: i32, z: i32) -> &mut M {
        let key = self.region_key(x, y, z);
        if !self.regions.contains(&key) && self.regions.len() == self.regions.cap().get() {
            if let Some((evicted, _)) = self.regions.pop_lru() {
                debug!("Region cache full, evicting 3D region {:?}", evicted);
            }
        }
        let factory = &self.factory;
        self.regions.get_or_insert_mut(key, || factory(key))
    }

    /// Drops the sub-map of region `key`. Returns whether it was live.
    pub fn unload_region(&mut self, key: RegionKey3D) -> bool {
        self.regions.pop(&key).is_some()
    }

    /// Whether region `key` currently owns a sub-map.
    pub fn is_loaded(&self, key: RegionKey3D) -> bool {
        self.regions.contains(&key)
    }

    /// Number of live regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no region is live.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl<M: Map3D> Map3D for Global3DMap<M> {
    fn value_at(&mut self, x: i32, y: i32, z: i32) -> f64 {
        self.region_mut(x, y, z).value_at(x, y, z)
    }
}
