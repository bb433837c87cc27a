//! Keyflow Core - Keyed Sequential Task Dispatch
//!
//! This crate provides a keyed sequential task-dispatch primitive: a
//! registry of independent FIFO task streams, one per logical key, where
//! each stream guarantees at-most-one active drainer at any instant while
//! actual execution is delegated to a pluggable listener.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Producers                               │
//! │    any thread ──── submit(key, task) ──── never blocks on work   │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────────┐
//! │                        STREAM GROUP                              │
//! │  ┌───────────────────────────┴─────────────────────────────────┐ │
//! │  │  key → KeyStream        (created lazily, atomic upsert)     │ │
//! │  │  key → alias            (descriptive metadata only)         │ │
//! │  │  total completed        (atomic counter)                    │ │
//! │  │  dispatch listener      (swappable at runtime)              │ │
//! │  │  queue factory          (locking or MPSC-optimized FIFOs)   │ │
//! │  └───────────────────────────┬─────────────────────────────────┘ │
//! └──────────────────────────────┼───────────────────────────────────┘
//!                                │ on_dispatch(key, Drain)
//!                                │ (only on the Idle→Dispatched edge)
//! ┌──────────────────────────────┼───────────────────────────────────┐
//! │                      DISPATCH LISTENER                           │
//! │     inline / thread pool / event loop — runs the drain once:     │
//! │     pop→run until empty, count completions, release the flag     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - **FIFO per key**: tasks for one key run in submission order. No
//!   ordering across keys.
//! - **At most one drainer per key**: mutual exclusion via an atomic
//!   compare-and-set, not a lock — producers never block on the hot path.
//! - **Consistent counters**: per-stream and group-wide completed counts
//!   are monotonic and agree at quiescence.
//! - **No lost tasks**: a task failure aborts only its stream's current
//!   pass; everything still queued runs on the next dispatch.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use keyflow_core::{InlineListener, StreamGroup};
//!
//! let group = StreamGroup::new();
//! group.set_dispatch_listener(Arc::new(InlineListener));
//!
//! group.submit("user-42", || {
//!     // work for this key runs in submission order
//!     Ok(())
//! }).unwrap();
//!
//! assert_eq!(group.completed_count("user-42"), 1);
//! ```
//!
//! # Module Overview
//!
//! - [`task`]: the unit of work and its error type
//! - [`queue`]: FIFO containers and the pluggable queue factory
//! - [`stream`]: per-key streams and the dispatch protocol
//! - [`listener`]: where announced drains go to be executed
//! - [`group`]: the registry, counters, aliases, and submission API
//! - [`error`]: the failure taxonomy
//! - [`callback`]: independent timeout-aware callback capability

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod callback;
pub mod error;
pub mod group;
pub mod listener;
pub mod queue;
pub mod stream;
pub mod task;

// Re-exports for convenience
pub use callback::{Callback, CallbackOutcome, DEFAULT_TIMEOUT};
pub use error::DispatchError;
pub use group::{GroupSummary, StreamGroup, StreamGroupBuilder};
pub use listener::{DispatchListener, InlineListener, SpawnListener};
pub use queue::{
    LockingQueue, LockingQueueFactory, MpscQueue, MpscQueueFactory, QueueFactory, TaskQueue,
};
pub use stream::{Drain, KeyStream};
pub use task::{BoxTask, Task, TaskError};
