//! # Task Management System
//!
//! This module provides a small worker pool for running CPU-heavy work off the
//! coordinating thread. Workers share no memory with the coordinator: tasks are
//! moved in by value and their outputs are moved back.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: owns the workers, a bounded queue of waiting tasks and the
//!   round-robin dispatch cursor
//! - `Task`: a unit of work with a key and an output
//! - `CompletedTask`: an output (or failure) tagged with the key of its task
//! - `TaskChannel`: the pair of channels connecting the coordinator to one worker
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()`
//! 2. The manager hands each task to an idle worker, or queues it when every worker
//!    is busy; a full queue rejects the task with `TaskError::QueueFull`
//! 3. Workers process tasks and send back `CompletedTask`s. A panicking task is
//!    caught on the worker and reported as `TaskError::WorkerPanicked`
//! 4. `process_completed_tasks()` drains the results on the coordinating thread and
//!    refills idle workers from the queue
//!
//! ## Performance Considerations
//! - Each worker holds at most `MAX_TASKS_IN_FLIGHT` tasks so the queue, not the
//!   channels, decides what runs next
//! - Tasks should own their data; a task that has to clone large coordinator state
//!   is better split up

pub mod task;

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use web_time::{Duration, Instant};

use crate::error::TaskError;
pub use task::{CompletedTask, Task};

/// Result type carried back from workers for task type `T`.
pub type TaskOutcome<T> = CompletedTask<<T as Task>::Key, <T as Task>::Output>;

/// A communication channel between the coordinating thread and one worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from the coordinator to the worker
/// - `result_receiver`: Receives completed tasks from the worker
/// - `num_tasks_in_flight`: Number of tasks sent and not yet returned
/// - `_worker`: Handle to the worker thread
#[derive(Debug)]
pub struct TaskChannel<T: Task> {
    task_sender: Sender<T>,
    result_receiver: Receiver<TaskOutcome<T>>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Fields
/// - `channels`: One channel per worker
/// - `queued_tasks`: Tasks waiting for an idle worker, oldest first
/// - `max_queued_tasks`: Capacity of `queued_tasks`
/// - `current_channel`: Index for round-robin scheduling
pub struct TaskManager<T: Task> {
    channels: Vec<TaskChannel<T>>,
    queued_tasks: VecDeque<T>,
    max_queued_tasks: usize,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

/// Polling interval while blocking on results.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(1);

impl<T: Task> TaskManager<T> {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to spawn
    /// * `max_queued_tasks` - How many tasks may wait for a worker before
    ///   `publish_task` starts rejecting them
    ///
    /// # Panics
    /// Panics if the operating system refuses to spawn a thread.
    pub fn new(num_workers: usize, max_queued_tasks: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        info!(
            "Starting {} task workers (available parallelism: {:?})",
            num_workers,
            thread::available_parallelism()
        );

        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<T>();
            let (result_tx, result_rx) = channel::<TaskOutcome<T>>();

            let worker = thread::spawn(move || {
                while let Ok(task) = task_rx.recv() {
                    let key = task.key();
                    let result = panic::catch_unwind(AssertUnwindSafe(|| task.process()))
                        .map_err(|payload| TaskError::WorkerPanicked(panic_message(payload)));
                    if result_tx.send(CompletedTask { key, result }).is_err() {
                        break;
                    }
                }
            });

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            max_queued_tasks,
            current_channel: 0,
        }
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// Returns the task back if the worker has hung up.
    fn try_send_task(&mut self, task: T, channel_idx: usize) -> Result<(), T> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => Err(task.0),
        }
    }

    /// Finds an available worker channel, round-robin from the last used one.
    ///
    /// # Returns
    /// - `Some(usize)` index of a channel below `MAX_TASKS_IN_FLIGHT`
    /// - `None` if all channels are busy or there are no channels
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }

        let start_channel = self.current_channel % self.channels.len();
        let mut current = start_channel;

        loop {
            if self.channels[current].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start_channel {
                return None;
            }
        }
    }

    /// Publishes a new task for execution.
    ///
    /// The task runs as soon as a worker is idle. If every worker is busy it waits
    /// in the queue.
    ///
    /// # Returns
    /// - `Ok(true)` if the task was sent to a worker immediately
    /// - `Ok(false)` if it was queued
    /// - `Err(TaskError::QueueFull)` if it was rejected because the queue is at
    ///   capacity; the task is dropped
    /// - `Err(TaskError::Disconnected)` if the pool has no live workers
    pub fn publish_task(&mut self, task: T) -> Result<bool, TaskError> {
        if self.channels.is_empty() {
            return Err(TaskError::Disconnected);
        }

        let task = match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    return Ok(true);
                }
                Err(task) => {
                    warn!("Worker {} hung up, queueing task", channel_idx);
                    task
                }
            },
            None => task,
        };

        if self.queued_tasks.len() >= self.max_queued_tasks {
            debug!("Task queue full ({} tasks)", self.queued_tasks.len());
            return Err(TaskError::QueueFull {
                capacity: self.max_queued_tasks,
            });
        }
        self.queued_tasks.push_back(task);
        Ok(false)
    }

    /// Sends queued tasks to idle workers, oldest first.
    ///
    /// Stops at the first task that can't be scheduled.
    pub fn process_queued_tasks(&mut self) {
        while !self.queued_tasks.is_empty() {
            let Some(channel_idx) = self.find_available_channel() else {
                break;
            };
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => {
                    // Channel is disconnected, put task back and stop processing
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Drains every completed task without blocking, then refills idle workers.
    ///
    /// Must be called from the coordinating thread, typically once per update.
    pub fn process_completed_tasks(&mut self) -> Vec<TaskOutcome<T>> {
        let mut completed = Vec::new();
        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
                completed.push(result);
            }
        }

        self.process_queued_tasks();
        completed
    }

    /// Blocks until at least one task completes or `timeout` elapses.
    ///
    /// Returns everything that completed in the meantime, possibly nothing.
    pub fn wait_for_completed(&mut self, timeout: Duration) -> Vec<TaskOutcome<T>> {
        let deadline = Instant::now() + timeout;
        loop {
            let completed = self.process_completed_tasks();
            if !completed.is_empty() || self.pending_count() == 0 || Instant::now() >= deadline {
                return completed;
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    /// Number of tasks that were published and have not been returned yet.
    pub fn pending_count(&self) -> usize {
        self.queued_tasks.len()
            + self
                .channels
                .iter()
                .map(|channel| channel.num_tasks_in_flight)
                .sum::<usize>()
    }

    /// Number of tasks waiting for a worker.
    pub fn queued_count(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Square(u32);

    impl Task for Square {
        type Key = u32;
        type Output = u32;

        fn key(&self) -> u32 {
            self.0
        }

        fn process(self) -> u32 {
            if self.0 == 13 {
                panic!("unlucky");
            }
            self.0 * self.0
        }
    }

    fn drain(manager: &mut TaskManager<Square>) -> Vec<TaskOutcome<Square>> {
        let mut completed = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while manager.pending_count() > 0 && Instant::now() < deadline {
            completed.extend(manager.wait_for_completed(Duration::from_millis(100)));
        }
        completed
    }

    #[test]
    fn results_come_back_keyed() {
        let mut manager = TaskManager::new(2, 16);
        for n in 0..8 {
            manager.publish_task(Square(n)).unwrap();
        }

        let mut results: Vec<(u32, u32)> = drain(&mut manager)
            .into_iter()
            .map(|done| (done.key, done.result.unwrap()))
            .collect();
        results.sort();

        assert_eq!(results.len(), 8);
        for (n, squared) in results {
            assert_eq!(squared, n * n);
        }
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn full_queue_rejects_tasks() {
        let mut manager = TaskManager::new(1, 2);
        // one in flight, two queued
        assert_eq!(manager.publish_task(Square(1)).unwrap(), true);
        assert_eq!(manager.publish_task(Square(2)).unwrap(), false);
        assert_eq!(manager.publish_task(Square(3)).unwrap(), false);
        assert!(matches!(
            manager.publish_task(Square(4)),
            Err(TaskError::QueueFull { capacity: 2 })
        ));

        assert_eq!(drain(&mut manager).len(), 3);
    }

    #[test]
    fn panics_are_reported_and_the_worker_survives() {
        let mut manager = TaskManager::new(1, 8);
        manager.publish_task(Square(13)).unwrap();
        manager.publish_task(Square(3)).unwrap();

        let completed = drain(&mut manager);
        assert_eq!(completed.len(), 2);
        for done in completed {
            match done.key {
                13 => assert!(matches!(done.result, Err(TaskError::WorkerPanicked(ref m)) if m == "unlucky")),
                _ => assert_eq!(done.result.unwrap(), 9),
            }
        }
    }

    #[test]
    fn no_workers_means_disconnected() {
        let mut manager: TaskManager<Square> = TaskManager::new(0, 8);
        assert!(matches!(
            manager.publish_task(Square(1)),
            Err(TaskError::Disconnected)
        ));
    }
}
