//! # Task System Core Traits
//!
//! This module defines the unit of work the task system moves between threads.
//!
//! ## Task Lifecycle
//! 1. A `Task` is created on the coordinating thread and handed to
//!    `TaskManager::publish_task()`
//! 2. The task is moved to a worker thread, which calls `process()`
//! 3. The output travels back tagged with the task's key as a `CompletedTask`
//! 4. The coordinating thread drains completed tasks in
//!    `TaskManager::process_completed_tasks()`
//!
//! ## Thread Safety
//! - A `Task` owns everything it needs; nothing is shared with the coordinating thread
//! - Both the key and the output must be `Send` to travel back

use crate::error::TaskError;

/// A unit of work that runs on a worker thread.
///
/// Tasks are moved into the worker, so they should carry their inputs by value
/// (seeds, ids, precomputed data) rather than references to coordinator state.
pub trait Task: Send + 'static {
    /// Identifies the task's result on the coordinating thread.
    type Key: Send + 'static;
    /// What the worker produces.
    type Output: Send + 'static;

    /// Returns the key the result will be reported under.
    fn key(&self) -> Self::Key;

    /// Performs the work. Runs on a worker thread.
    fn process(self) -> Self::Output;
}

/// The outcome of one task, returned to the coordinating thread.
#[derive(Debug)]
pub struct CompletedTask<K, O> {
    /// Key of the task that produced this result
    pub key: K,
    /// The output, or the reason the worker could not produce one
    pub result: Result<O, TaskError>,
}
