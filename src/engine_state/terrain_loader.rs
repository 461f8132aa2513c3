//! # Terrain Loader
//!
//! Streams chunks around a moving centre. Each update requests the chunks inside the
//! render box that are not loaded yet, nearest first, evicts loaded chunks that fell
//! outside it and cancels requests for them that are still in flight.
//!
//! The render box spans `render_distance` chunks horizontally and
//! `vertical_render_distance` chunks vertically on each side of the centre chunk.

use cgmath::{MetricSpace, Point3};
use log::{debug, info, warn};
use web_time::Duration;

use crate::engine_state::rendering::Renderer;
use crate::engine_state::voxels::chunk::ChunkId;
use crate::engine_state::voxels::chunk_manager::{ChunkManager, ChunkState};
use crate::engine_state::voxels::storage::ChunkStorage;
use crate::error::{TaskError, WorldError};

/// Request rounds `init` makes before giving up on chunks that keep failing.
const MAX_INIT_PASSES: usize = 16;

/// Summary of one loader update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderUpdate {
    /// Chunks newly requested (dispatched or restored).
    pub requested: usize,
    /// Chunks integrated from finished tasks.
    pub completed: usize,
    /// Chunks evicted for being outside the render box.
    pub evicted: usize,
    /// In-flight requests cancelled for being outside the render box.
    pub cancelled: usize,
    /// Requests given up on after the task timeout.
    pub expired: usize,
}

/// Keeps the chunks around a centre position loaded.
pub struct TerrainLoader<S: ChunkStorage, R: Renderer> {
    manager: ChunkManager<S, R>,
    render_distance: i32,
    vertical_render_distance: i32,
    center: Option<ChunkId>,
}

impl<S: ChunkStorage, R: Renderer> TerrainLoader<S, R> {
    /// Creates a loader around `manager`, taking the render distances from its config.
    pub fn new(manager: ChunkManager<S, R>) -> Self {
        let render_distance = manager.config().render_distance as i32;
        let vertical_render_distance = manager.config().vertical_render_distance as i32;
        TerrainLoader {
            manager,
            render_distance,
            vertical_render_distance,
            center: None,
        }
    }

    pub fn manager(&self) -> &ChunkManager<S, R> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ChunkManager<S, R> {
        &mut self.manager
    }

    pub fn into_manager(self) -> ChunkManager<S, R> {
        self.manager
    }

    /// The chunk the render box is currently centred on.
    pub fn center(&self) -> Option<ChunkId> {
        self.center
    }

    pub fn render_distance(&self) -> (i32, i32) {
        (self.render_distance, self.vertical_render_distance)
    }

    /// Loads the whole render box around `position` and waits for it.
    ///
    /// # Arguments
    /// * `position` - World position of the centre
    /// * `timeout` - How long to wait for generation to finish
    ///
    /// # Returns
    /// The number of chunks still processing when the wait ended.
    pub fn init(&mut self, position: Point3<f32>, timeout: Duration) -> Result<usize, WorldError> {
        let update = self.update(position)?;
        info!(
            "Initial load around {}: {} chunks requested",
            ChunkId::from_world(position),
            update.requested
        );

        let mut remaining = self.manager.wait_for_pending(timeout);
        // the first pass may have hit a full queue; keep topping up until everything is in
        let mut passes = 1;
        while remaining == 0 && passes < MAX_INIT_PASSES && self.missing_count() > 0 {
            if self.request_missing()? == 0 {
                break;
            }
            remaining = self.manager.wait_for_pending(timeout);
            passes += 1;
        }

        if remaining > 0 {
            warn!("Initial load finished with {} chunks still processing", remaining);
        }
        Ok(remaining)
    }

    /// Moves the centre to `position` and streams chunks accordingly.
    ///
    /// Call once per frame. Finished tasks are integrated and stuck requests expired.
    /// Chunks outside the box are evicted or have their requests cancelled, then
    /// missing ones are requested.
    ///
    /// # Errors
    /// Storage errors from eviction or restore. A full task queue is not an error;
    /// the remaining chunks are requested on later updates.
    pub fn update(&mut self, position: Point3<f32>) -> Result<LoaderUpdate, WorldError> {
        let center = ChunkId::from_world(position);
        if self.center != Some(center) {
            debug!("Render box moved to {}", center);
            self.center = Some(center);
        }

        let completed = self.manager.process_completed_tasks();
        let expired = self.manager.expire_stuck_requests().len();
        let cancelled = self.cancel_outside();
        let evicted = self.evict_outside()?;
        let requested = self.request_missing()?;

        Ok(LoaderUpdate {
            requested,
            completed,
            evicted,
            cancelled,
            expired,
        })
    }

    /// Changes the render distances. Takes effect on the next update.
    pub fn set_render_distance(&mut self, horizontal: u32, vertical: u32) {
        info!("Render distance set to {} horizontal, {} vertical", horizontal, vertical);
        self.render_distance = horizontal as i32;
        self.vertical_render_distance = vertical as i32;
    }

    /// Whether `id` lies inside the current render box.
    pub fn in_range(&self, id: ChunkId) -> bool {
        let Some(center) = self.center else {
            return false;
        };
        (id.x - center.x).abs() <= self.render_distance
            && (id.z - center.z).abs() <= self.render_distance
            && (id.y - center.y).abs() <= self.vertical_render_distance
    }

    /// Ids in the render box, nearest to the centre first.
    pub fn chunks_in_range(&self) -> Vec<ChunkId> {
        let Some(center) = self.center else {
            return Vec::new();
        };
        let (h, v) = (self.render_distance, self.vertical_render_distance);

        let mut ids = Vec::new();
        for y in -v..=v {
            for z in -h..=h {
                for x in -h..=h {
                    ids.push(center.offset(x, y, z));
                }
            }
        }

        let origin = Point3::new(center.x as f32, center.y as f32, center.z as f32);
        ids.sort_by(|a, b| {
            let da = origin.distance2(Point3::new(a.x as f32, a.y as f32, a.z as f32));
            let db = origin.distance2(Point3::new(b.x as f32, b.y as f32, b.z as f32));
            da.total_cmp(&db)
        });
        ids
    }

    fn missing_count(&self) -> usize {
        self.chunks_in_range()
            .into_iter()
            .filter(|id| self.manager.chunk_state(*id) == ChunkState::Unloaded)
            .count()
    }

    fn request_missing(&mut self) -> Result<usize, WorldError> {
        let mut requested = 0;
        for id in self.chunks_in_range() {
            if self.manager.chunk_state(id) != ChunkState::Unloaded {
                continue;
            }
            match self.manager.request_chunk(id, None) {
                Ok(_) => requested += 1,
                Err(WorldError::Task(TaskError::QueueFull { capacity })) => {
                    debug!("Task queue full ({}), deferring remaining chunks", capacity);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(requested)
    }

    fn cancel_outside(&mut self) -> usize {
        let mut cancelled = 0;
        for id in self.manager.processing_ids() {
            if self.in_range(id) {
                continue;
            }
            // nothing is loaded for a processing id, so there is nothing to save
            if let Ok(false) = self.manager.unload_chunk(id) {
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!("Cancelled {} requests outside the render box", cancelled);
        }
        cancelled
    }

    fn evict_outside(&mut self) -> Result<usize, WorldError> {
        let mut evicted = 0;
        let mut first_error = None;
        for id in self.manager.loaded_ids() {
            if self.in_range(id) {
                continue;
            }
            match self.manager.unload_chunk(id) {
                Ok(true) => evicted += 1,
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(evicted),
        }
    }
}
