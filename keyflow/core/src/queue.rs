//! FIFO containers backing key streams, and the factory that builds them.
//!
//! The factory is the pluggable point: a group is configured with one
//! factory and uses it to manufacture an empty FIFO whenever a key is seen
//! for the first time. Two standard configurations exist:
//!
//! - [`LockingQueueFactory`] — a general-purpose `Mutex<VecDeque>` FIFO.
//! - [`MpscQueueFactory`] — a lock-free `SegQueue` FIFO, lower contention
//!   when many producers submit to the same key concurrently (only the
//!   single active drainer ever consumes).
//!
//! The choice affects throughput characteristics only. Ordering and
//! mutual-exclusion guarantees come from the stream's dispatch protocol,
//! never from the container.

use std::collections::VecDeque;

use crossbeam_queue::SegQueue;
use parking_lot::Mutex;

use crate::error::DispatchError;
use crate::task::BoxTask;

/// A FIFO container of pending tasks.
///
/// Contract: many threads may `push` concurrently; at most one thread pops
/// at a time (the stream's dispatch flag enforces this, the queue does not
/// have to).
pub trait TaskQueue: Send + Sync {
    /// Append a task to the tail.
    fn push(&self, task: BoxTask);

    /// Remove and return the head task, or `None` if the queue is empty.
    fn pop(&self) -> Option<BoxTask>;

    /// Whether the queue currently holds no tasks.
    fn is_empty(&self) -> bool;

    /// Number of tasks currently queued.
    fn len(&self) -> usize;
}

/// Capability that manufactures an empty FIFO for a newly created stream.
pub trait QueueFactory: Send + Sync {
    /// Build an empty queue.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::QueueCreation`] if the container cannot be
    /// constructed; the triggering key then remains unregistered.
    fn build(&self) -> Result<Box<dyn TaskQueue>, DispatchError>;
}

/// General-purpose FIFO: a `VecDeque` behind a `parking_lot` mutex.
#[derive(Default)]
pub struct LockingQueue {
    inner: Mutex<VecDeque<BoxTask>>,
}

impl LockingQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskQueue for LockingQueue {
    fn push(&self, task: BoxTask) {
        self.inner.lock().push_back(task);
    }

    fn pop(&self) -> Option<BoxTask> {
        self.inner.lock().pop_front()
    }

    fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Factory for [`LockingQueue`]. The default configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct LockingQueueFactory;

impl QueueFactory for LockingQueueFactory {
    fn build(&self) -> Result<Box<dyn TaskQueue>, DispatchError> {
        Ok(Box::new(LockingQueue::new()))
    }
}

/// Multiple-producer/single-consumer optimized FIFO backed by a lock-free
/// [`SegQueue`].
#[derive(Default)]
pub struct MpscQueue {
    inner: SegQueue<BoxTask>,
}

impl MpscQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskQueue for MpscQueue {
    fn push(&self, task: BoxTask) {
        self.inner.push(task);
    }

    fn pop(&self) -> Option<BoxTask> {
        self.inner.pop()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Factory for [`MpscQueue`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MpscQueueFactory;

impl QueueFactory for MpscQueueFactory {
    fn build(&self) -> Result<Box<dyn TaskQueue>, DispatchError> {
        Ok(Box::new(MpscQueue::new()))
    }
}
