//! The stream group: registry, counters, aliases, and the submission API.
//!
//! # Architecture
//!
//! ```text
//!  producers (any thread)
//!      │ submit(key, task)
//!      ▼
//!  ┌─────────────────────────────────────────────┐
//!  │ StreamGroup                                 │
//!  │   DashMap<String, Arc<KeyStream>>           │
//!  │   DashMap<String, String>      (aliases)    │
//!  │   AtomicU64                    (total)      │
//!  │   RwLock<Option<Arc<dyn DispatchListener>>> │
//!  │   Arc<dyn QueueFactory>                     │
//!  └──────────────┬──────────────────────────────┘
//!                 │ on_dispatch(key, Drain)   (only when the enqueue
//!                 ▼                            wins Idle→Dispatched)
//!          DispatchListener ──► some execution resource runs the drain
//! ```
//!
//! The group is purely a coordinator: it owns no threads and never executes
//! a task itself. Cloning handles is not needed — callers share the group
//! behind an `Arc` like any other registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::listener::DispatchListener;
use crate::queue::{LockingQueueFactory, MpscQueueFactory, QueueFactory};
use crate::stream::{Drain, KeyStream};
use crate::task::{BoxTask, Task};

/// Registry of keyed task streams with a single dispatch listener.
///
/// One [`KeyStream`] exists per key, created lazily on first submission and
/// kept for the lifetime of the group. Execution order is FIFO within a
/// key; nothing is guaranteed across keys.
pub struct StreamGroup {
    streams: DashMap<String, Arc<KeyStream>>,
    aliases: DashMap<String, String>,
    total_completed: Arc<AtomicU64>,
    listener: RwLock<Option<Arc<dyn DispatchListener>>>,
    factory: Arc<dyn QueueFactory>,
}

impl StreamGroup {
    /// Create a group using the general-purpose locking queue factory.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building a group with a non-default configuration.
    #[must_use]
    pub fn builder() -> StreamGroupBuilder {
        StreamGroupBuilder::new()
    }

    /// Submit one task for `key`.
    ///
    /// Routes to the key's stream (creating it if absent) and enqueues.
    /// Never blocks on task execution; if this enqueue flips the stream
    /// from Idle to Dispatched, the installed listener is invoked
    /// synchronously on this thread with the drain for the stream.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidKey`] for an empty key;
    /// [`DispatchError::QueueCreation`] if the key is new and the queue
    /// factory fails (the key stays unregistered).
    pub fn submit<T: Task>(&self, key: &str, task: T) -> Result<(), DispatchError> {
        let stream = self.stream(key)?;
        if stream.enqueue(Box::new(task)) {
            self.announce(key, &stream);
        }
        Ok(())
    }

    /// Submit a batch of tasks for `key`, preserving their order.
    ///
    /// Each enqueue attempts the Idle→Dispatched transition individually,
    /// so a drain that finishes midway through the batch is re-announced by
    /// the next enqueue. An empty batch is a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub fn submit_all<I>(&self, key: &str, tasks: I) -> Result<(), DispatchError>
    where
        I: IntoIterator<Item = BoxTask>,
    {
        let stream = self.stream(key)?;
        for task in tasks {
            if stream.enqueue(task) {
                self.announce(key, &stream);
            }
        }
        Ok(())
    }

    /// Get the stream for `key`, creating it if absent.
    ///
    /// Creation is an atomic get-or-insert on the registry: concurrent
    /// first submissions for the same key all land in the one stream that
    /// wins creation. The factory runs while the registry shard is held, so
    /// creation for keys on the same shard serializes; lookups do not.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidKey`] for an empty key;
    /// [`DispatchError::QueueCreation`] if the factory fails, in which case
    /// no stream is registered for the key.
    pub fn stream(&self, key: &str) -> Result<Arc<KeyStream>, DispatchError> {
        if key.is_empty() {
            return Err(DispatchError::InvalidKey);
        }
        if let Some(stream) = self.streams.get(key) {
            return Ok(Arc::clone(stream.value()));
        }
        match self.streams.entry(key.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let queue = self.factory.build()?;
                let stream = Arc::new(KeyStream::new(
                    key.to_string(),
                    queue,
                    Arc::clone(&self.total_completed),
                ));
                entry.insert(Arc::clone(&stream));
                tracing::debug!(key, "stream created");
                Ok(stream)
            }
        }
    }

    /// Get the stream for `key` without creating it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<KeyStream>> {
        self.streams.get(key).map(|s| Arc::clone(s.value()))
    }

    /// Associate a display alias with `key`. Purely descriptive metadata;
    /// last write wins.
    pub fn set_alias(&self, key: impl Into<String>, alias: impl Into<String>) {
        self.aliases.insert(key.into(), alias.into());
    }

    /// The display alias for `key`, if one was set.
    #[must_use]
    pub fn alias(&self, key: &str) -> Option<String> {
        self.aliases.get(key).map(|a| a.value().clone())
    }

    /// Install the listener used for all future dispatch announcements.
    ///
    /// Replacing the listener does not affect streams already in the
    /// Dispatched state. While no listener is installed, announcements are
    /// dropped: a stream that becomes Dispatched stays Dispatched and its
    /// tasks are not drained.
    pub fn set_dispatch_listener(&self, listener: Arc<dyn DispatchListener>) {
        *self.listener.write() = Some(listener);
    }

    /// Total number of tasks completed across all streams.
    #[must_use]
    pub fn total_completed_count(&self) -> u64 {
        self.total_completed.load(Ordering::Relaxed)
    }

    /// Number of tasks completed for `key`, or zero if the key has no
    /// stream yet (not an error).
    #[must_use]
    pub fn completed_count(&self, key: &str) -> u64 {
        self.streams
            .get(key)
            .map_or(0, |s| s.value().completed_count())
    }

    /// Lazy iteration over the currently known streams.
    ///
    /// The sequence observes the registry's live state: entries created or
    /// seen concurrently may or may not appear, and no snapshot atomicity
    /// is guaranteed. Callers needing a stable view must collect.
    pub fn streams(&self) -> impl Iterator<Item = Arc<KeyStream>> + '_ {
        self.streams.iter().map(|entry| Arc::clone(entry.value()))
    }

    /// Number of streams created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Whether no stream has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Snapshot of the group's aggregate state.
    #[must_use]
    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            stream_count: self.streams.len(),
            total_completed: self.total_completed_count(),
        }
    }

    fn announce(&self, key: &str, stream: &Arc<KeyStream>) {
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            tracing::trace!(key, "stream dispatched");
            listener.on_dispatch(key, Drain::new(Arc::clone(stream)));
        } else {
            tracing::warn!(key, "stream dispatched with no listener installed");
        }
    }
}

impl Default for StreamGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StreamGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamGroup")
            .field("stream_count", &self.streams.len())
            .field("total_completed", &self.total_completed_count())
            .field("has_listener", &self.listener.read().is_some())
            .finish()
    }
}

/// Aggregate counters for a [`StreamGroup`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Number of streams created so far.
    pub stream_count: usize,
    /// Total tasks completed across all streams.
    pub total_completed: u64,
}

/// Builder for [`StreamGroup`].
///
/// ```
/// use keyflow_core::StreamGroup;
///
/// let group = StreamGroup::builder().mpsc_queues().build();
/// assert!(group.is_empty());
/// ```
pub struct StreamGroupBuilder {
    factory: Arc<dyn QueueFactory>,
}

impl StreamGroupBuilder {
    /// Start from the default configuration (locking queues).
    #[must_use]
    pub fn new() -> Self {
        Self {
            factory: Arc::new(LockingQueueFactory),
        }
    }

    /// Use a custom queue factory for new streams.
    #[must_use]
    pub fn queue_factory(mut self, factory: Arc<dyn QueueFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Use the multiple-producer/single-consumer optimized queue factory.
    #[must_use]
    pub fn mpsc_queues(mut self) -> Self {
        self.factory = Arc::new(MpscQueueFactory);
        self
    }

    /// Build the group.
    #[must_use]
    pub fn build(self) -> StreamGroup {
        StreamGroup {
            streams: DashMap::new(),
            aliases: DashMap::new(),
            total_completed: Arc::new(AtomicU64::new(0)),
            listener: RwLock::new(None),
            factory: self.factory,
        }
    }
}

impl Default for StreamGroupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
