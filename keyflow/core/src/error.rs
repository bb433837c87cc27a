//! Error types for the dispatch core.
//!
//! All failures surface to the immediate caller or execution context; the
//! core performs no retries and never suppresses an error silently.

use thiserror::Error;

use crate::task::TaskError;

/// Errors produced by the dispatch core.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The submitted key was empty.
    ///
    /// Raised synchronously from submission and lookup APIs before any state
    /// is mutated; fully recoverable by the caller.
    #[error("stream key must be non-empty")]
    InvalidKey,

    /// The queue factory failed to produce a FIFO for a new stream.
    ///
    /// The key remains unregistered; a later submission retries creation.
    #[error("queue construction failed: {0}")]
    QueueCreation(String),

    /// A task failed while a drain pass was running.
    ///
    /// Stops the current pass for that key only. Tasks still queued behind
    /// the failure are kept and run on the next dispatch of the same key.
    #[error("task failed on stream {key:?}: {source}")]
    TaskFailed {
        /// Key of the stream whose pass was aborted.
        key: String,
        /// The error the task returned.
        source: TaskError,
    },
}
