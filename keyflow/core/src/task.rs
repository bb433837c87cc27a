//! The unit of work submitted to a stream.
//!
//! A task is an opaque zero-input operation that performs a side effect and
//! may fail. The dispatch core never inspects a task's result beyond
//! success/failure: success bumps the completed counters, failure aborts the
//! current drain pass for that key.

/// Error type returned by a failing task.
///
/// Tasks are caller-supplied, so their failures are carried as boxed
/// standard errors rather than a crate-local enum.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// A submitted unit of work.
///
/// Implemented for free by any `FnOnce() -> Result<(), TaskError>` closure,
/// which is how virtually all call sites submit work:
///
/// ```
/// use keyflow_core::{InlineListener, StreamGroup};
/// use std::sync::Arc;
///
/// let group = StreamGroup::new();
/// group.set_dispatch_listener(Arc::new(InlineListener));
/// group.submit("sessions", || {
///     // side effect here
///     Ok(())
/// }).unwrap();
/// ```
pub trait Task: Send + 'static {
    /// Run the task, consuming it.
    fn run(self: Box<Self>) -> Result<(), TaskError>;
}

impl<F> Task for F
where
    F: FnOnce() -> Result<(), TaskError> + Send + 'static,
{
    fn run(self: Box<Self>) -> Result<(), TaskError> {
        (*self)()
    }
}

/// A boxed task, as stored in stream FIFOs.
pub type BoxTask = Box<dyn Task>;
