//! # Error Types
//!
//! Error enums shared across the crate. Out-of-bounds voxel reads are not errors
//! (they return `None`); everything here is a condition the caller can act on.

use thiserror::Error;

use crate::engine_state::voxels::chunk::ChunkId;

/// Failure while loading or validating a [`WorldConfig`](crate::config::WorldConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration text is not valid JSON for `WorldConfig`.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the world cannot run with.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Human readable explanation.
        reason: String,
    },
}

/// Failure reported by a chunk storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend refused or failed the operation.
    #[error("storage backend failure for chunk {id:?}: {reason}")]
    Backend {
        /// Chunk the operation was about.
        id: ChunkId,
        /// Backend supplied reason.
        reason: String,
    },

    /// A record could not be encoded or decoded.
    #[error("storage serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored record was written by an incompatible format version.
    #[error("chunk {id:?} was stored with format version {found}, expected {expected}")]
    VersionMismatch {
        /// Chunk the record belongs to.
        id: ChunkId,
        /// Version found in the record.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// The stored record decoded but its payload is malformed.
    #[error("corrupt payload for chunk {id:?}: {reason}")]
    Corrupt {
        /// Chunk the record belongs to.
        id: ChunkId,
        /// What was wrong with it.
        reason: String,
    },
}

/// Failure crossing the worker pool boundary.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The bounded task queue is full; the caller should retry later.
    #[error("task queue is full ({capacity} queued tasks)")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// Every worker channel has hung up.
    #[error("all worker threads have disconnected")]
    Disconnected,

    /// The task panicked while it was being processed.
    #[error("worker panicked while processing task: {0}")]
    WorkerPanicked(String),
}

/// Top level error for world operations.
#[derive(Debug, Error)]
pub enum WorldError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// See [`StorageError`].
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// See [`TaskError`].
    #[error(transparent)]
    Task(#[from] TaskError),

    /// The operation needs a loaded chunk and the chunk is not loaded.
    #[error("chunk {0:?} is not loaded")]
    ChunkNotLoaded(ChunkId),
}
