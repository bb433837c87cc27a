//! Generic timeout-aware callback capability.
//!
//! An independent utility in this library: the dispatch core neither calls
//! it nor is called by it. Callers hand a [`Callback`] to some asynchronous
//! operation; the operation later completes it exactly once, either with an
//! outcome (which may carry no result) or with a timeout notification.

use std::time::Duration;

/// Default deadline for operations that take a [`Callback`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How a pending operation concluded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome<R> {
    /// The operation finished before its deadline. A result is optional:
    /// some operations complete without producing one.
    Completed(Option<R>),
    /// The deadline elapsed first. No result is available.
    TimedOut,
}

impl<R> CallbackOutcome<R> {
    /// Whether the operation timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// The carried result, if the operation completed with one.
    pub fn into_result(self) -> Option<R> {
        match self {
            Self::Completed(result) => result,
            Self::TimedOut => None,
        }
    }
}

/// One-shot completion callback.
///
/// Implemented for free by any `FnOnce(CallbackOutcome<R>)` closure.
pub trait Callback<R>: Send {
    /// Deliver the outcome, consuming the callback.
    fn call(self: Box<Self>, outcome: CallbackOutcome<R>);
}

impl<R, F> Callback<R> for F
where
    F: FnOnce(CallbackOutcome<R>) + Send,
{
    fn call(self: Box<Self>, outcome: CallbackOutcome<R>) {
        (*self)(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let done: CallbackOutcome<u32> = CallbackOutcome::Completed(Some(7));
        assert!(!done.is_timeout());
        assert_eq!(done.into_result(), Some(7));

        let empty: CallbackOutcome<u32> = CallbackOutcome::Completed(None);
        assert_eq!(empty.into_result(), None);

        let late: CallbackOutcome<u32> = CallbackOutcome::TimedOut;
        assert!(late.is_timeout());
        assert_eq!(late.into_result(), None);
    }

    #[test]
    fn test_closure_callback() {
        let (tx, rx) = std::sync::mpsc::channel();
        let cb: Box<dyn Callback<&'static str>> = Box::new(move |outcome| {
            tx.send(outcome).unwrap();
        });
        cb.call(CallbackOutcome::Completed(Some("ready")));

        assert_eq!(
            rx.try_recv().unwrap(),
            CallbackOutcome::Completed(Some("ready"))
        );
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(10));
    }
}
