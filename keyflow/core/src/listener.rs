//! Dispatch listeners: where drains go to be executed.
//!
//! The group owns no worker threads. When an enqueue flips a stream from
//! Idle to Dispatched, the group hands a [`Drain`] to the installed
//! listener, synchronously, on the producer's thread. The listener's job is
//! to arrange that the drain runs exactly once, eventually, on some
//! execution resource — inline, a thread pool, an event loop. This keeps
//! the coordination protocol fully decoupled from the scheduling policy.

use tokio::runtime::Handle;

use crate::stream::Drain;

/// Capability notified when a stream becomes Dispatched.
///
/// Contract: `on_dispatch` runs on the thread that performed the triggering
/// enqueue, so it must not block significantly; and it must guarantee the
/// drain is executed exactly once, eventually.
pub trait DispatchListener: Send + Sync {
    /// Arrange execution of `drain` for the stream identified by `key`.
    fn on_dispatch(&self, key: &str, drain: Drain);
}

/// Listener that runs each drain inline, on the announcing thread.
///
/// The simplest scheduling policy: the producer that wins the
/// Idle→Dispatched transition pays for the whole pass. Useful for tests and
/// for callers that want strictly synchronous semantics. A failed pass is
/// logged; the producer's `submit` call still returns `Ok`.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineListener;

impl DispatchListener for InlineListener {
    fn on_dispatch(&self, key: &str, drain: Drain) {
        if let Err(err) = drain.run() {
            tracing::error!(key, %err, "inline drain pass failed");
        }
    }
}

/// Listener that hands each drain to a tokio runtime's blocking pool.
///
/// Drains run synchronously to completion, so they go to
/// [`Handle::spawn_blocking`] rather than onto the async executor. A failed
/// pass is logged from the pool thread.
#[derive(Clone, Debug)]
pub struct SpawnListener {
    handle: Handle,
}

impl SpawnListener {
    /// Create a listener bound to the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime context, matching
    /// [`Handle::current`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            handle: Handle::current(),
        }
    }

    /// Create a listener bound to an explicit runtime handle.
    #[must_use]
    pub fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Default for SpawnListener {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchListener for SpawnListener {
    fn on_dispatch(&self, key: &str, drain: Drain) {
        let key = key.to_string();
        self.handle.spawn_blocking(move || {
            if let Err(err) = drain.run() {
                tracing::error!(key, %err, "spawned drain pass failed");
            }
        });
    }
}
