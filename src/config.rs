//! # World Configuration
//!
//! Runtime knobs for a world session. Everything that changes the generated terrain
//! itself (chunk dimensions, height bounds, band curves) is a compile-time constant
//! owned by the module that uses it; this struct only carries the seed and the
//! scheduling / caching limits.
//!
//! ## Usage
//!
//! ```rust
//! use voxel_terrain::config::WorldConfig;
//!
//! let config = WorldConfig::from_json_str(r#"{ "seed": "abc", "render_distance": 3 }"#).unwrap();
//! assert_eq!(config.seed, "abc");
//! assert_eq!(config.worker_count, WorldConfig::default().worker_count);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine_state::noise::shape_maps::FieldOverrides;
use crate::error::ConfigError;

/// Seed used when none is configured.
pub const DEFAULT_SEED: &str = "voxel";

/// Configuration for a world session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Root of all determinism. Same seed, same world.
    pub seed: String,
    /// Horizontal streaming radius, in chunks.
    pub render_distance: u32,
    /// Vertical streaming radius, in chunks.
    pub vertical_render_distance: u32,
    /// Number of generation worker threads.
    pub worker_count: usize,
    /// Maximum number of generation tasks waiting for a free worker.
    pub max_queued_tasks: usize,
    /// A generation request older than this is considered stuck and may be retried.
    pub task_timeout_ms: u64,
    /// Free-list capacity per mesh role.
    pub mesh_pool_capacity: usize,
    /// Upper bound on live regions per region cache.
    pub max_cached_regions: usize,
    /// Diagnostic overrides for the terrain shape fields.
    pub field_overrides: FieldOverrides,
}

impl Default for WorldConfig {
    fn default() -> Self {
        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1);

        WorldConfig {
            seed: DEFAULT_SEED.to_string(),
            render_distance: 4,
            vertical_render_distance: 2,
            worker_count,
            max_queued_tasks: 1024,
            task_timeout_ms: 10_000,
            mesh_pool_capacity: 64,
            max_cached_regions: 4096,
            field_overrides: FieldOverrides::default(),
        }
    }
}

impl WorldConfig {
    /// Creates a default configuration with the given seed.
    pub fn with_seed(seed: impl Into<String>) -> Self {
        WorldConfig {
            seed: seed.into(),
            ..WorldConfig::default()
        }
    }

    /// Parses and validates a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks the limits the world cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid {
                field: "worker_count",
                reason: "at least one worker is required".to_string(),
            });
        }
        if self.max_queued_tasks == 0 {
            return Err(ConfigError::Invalid {
                field: "max_queued_tasks",
                reason: "the task queue must hold at least one task".to_string(),
            });
        }
        if self.max_cached_regions == 0 {
            return Err(ConfigError::Invalid {
                field: "max_cached_regions",
                reason: "region caches need room for at least one region".to_string(),
            });
        }
        Ok(())
    }

    /// The task timeout as a duration.
    pub fn task_timeout(&self) -> web_time::Duration {
        web_time::Duration::from_millis(self.task_timeout_ms)
    }
}
