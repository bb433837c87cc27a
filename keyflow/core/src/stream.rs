//! Per-key task streams and the at-most-one-drainer protocol.
//!
//! A [`KeyStream`] owns one FIFO of pending tasks, an atomic dispatch flag,
//! and a completed-task counter. The flag has two states:
//!
//! ```text
//!            enqueue wins CAS
//!   ┌──────┐ ────────────────► ┌────────────┐
//!   │ Idle │                   │ Dispatched │
//!   └──────┘ ◄──────────────── └────────────┘
//!            drain resets flag
//! ```
//!
//! The enqueue that wins the Idle→Dispatched transition is responsible for
//! announcing a [`Drain`] to the group's listener; every other concurrent
//! enqueue simply appends and trusts the in-flight drain to observe its
//! task. Mutual exclusion is a compare-and-set, not a lock: producers never
//! block on the hot path.
//!
//! Memory ordering: the CAS acquires on success and the reset releases, so
//! everything a drain pass wrote is visible to whichever thread wins the
//! flag next. Task visibility itself is provided by the queue's own push/pop
//! synchronization.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::DispatchError;
use crate::queue::TaskQueue;
use crate::task::BoxTask;

/// One ordered stream of tasks for one key.
///
/// Created lazily by the group on a key's first submission and never
/// destroyed for the lifetime of the group.
pub struct KeyStream {
    key: String,
    queue: Box<dyn TaskQueue>,
    dispatched: AtomicBool,
    completed: AtomicU64,
    group_completed: Arc<AtomicU64>,
}

impl KeyStream {
    pub(crate) fn new(
        key: String,
        queue: Box<dyn TaskQueue>,
        group_completed: Arc<AtomicU64>,
    ) -> Self {
        Self {
            key,
            queue,
            dispatched: AtomicBool::new(false),
            completed: AtomicU64::new(0),
            group_completed,
        }
    }

    /// The key this stream serves.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of tasks this stream has run to completion.
    #[must_use]
    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Number of tasks currently waiting in the FIFO.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Whether a drain for this stream is queued or executing right now.
    #[must_use]
    pub fn is_dispatched(&self) -> bool {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Append a task and attempt the Idle→Dispatched transition.
    ///
    /// Returns `true` if this call won the transition, in which case the
    /// caller must announce a drain for this stream. Returns `false` when
    /// the stream is already Dispatched; the in-flight (or queued) drain
    /// will observe the task.
    pub(crate) fn enqueue(&self, task: BoxTask) -> bool {
        self.queue.push(task);
        self.dispatched
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// One full drain pass: pop and run tasks until the FIFO reports empty,
    /// then release the flag.
    ///
    /// After releasing, the queue is re-checked: a producer may have pushed
    /// while the flag was still Dispatched (its CAS failed, so nobody was
    /// announced). If the re-acquire CAS succeeds the loop continues in
    /// place, so such a task is never stranded waiting for an unrelated
    /// future submission.
    ///
    /// On a task failure the flag is released and the error returned
    /// without re-checking: remaining tasks stay queued until the next
    /// successful Idle→Dispatched transition.
    fn run(&self) -> Result<(), DispatchError> {
        let mut executed = 0_u64;
        loop {
            while let Some(task) = self.queue.pop() {
                match task.run() {
                    Ok(()) => {
                        executed += 1;
                        self.completed.fetch_add(1, Ordering::Relaxed);
                        self.group_completed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(source) => {
                        self.dispatched.store(false, Ordering::Release);
                        tracing::debug!(
                            key = %self.key,
                            executed,
                            pending = self.queue.len(),
                            "drain pass aborted by task failure"
                        );
                        return Err(DispatchError::TaskFailed {
                            key: self.key.clone(),
                            source,
                        });
                    }
                }
            }

            self.dispatched.store(false, Ordering::Release);

            if self.queue.is_empty()
                || self
                    .dispatched
                    .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                    .is_err()
            {
                tracing::trace!(key = %self.key, executed, "drain pass finished");
                return Ok(());
            }
        }
    }
}

impl std::fmt::Debug for KeyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStream")
            .field("key", &self.key)
            .field("dispatched", &self.is_dispatched())
            .field("pending", &self.pending_count())
            .field("completed", &self.completed_count())
            .finish()
    }
}

/// Single-use handle for one announced drain.
///
/// Handed to the [`DispatchListener`](crate::listener::DispatchListener)
/// when a stream becomes Dispatched. Whoever ends up holding it must run it
/// exactly once, on whatever execution resource it chooses.
#[derive(Debug)]
pub struct Drain {
    stream: Arc<KeyStream>,
}

impl Drain {
    pub(crate) fn new(stream: Arc<KeyStream>) -> Self {
        Self { stream }
    }

    /// Key of the stream this drain serves.
    #[must_use]
    pub fn key(&self) -> &str {
        self.stream.key()
    }

    /// Run the drain to completion on the calling thread.
    ///
    /// Not cancellable; returns when the stream's FIFO is observed empty.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::TaskFailed`] if a task fails, aborting the
    /// pass. Tasks queued behind the failure are kept for the next pass.
    pub fn run(self) -> Result<(), DispatchError> {
        self.stream.run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{LockingQueueFactory, QueueFactory};
    use std::sync::atomic::AtomicUsize;

    fn test_stream() -> (Arc<KeyStream>, Arc<AtomicU64>) {
        let total = Arc::new(AtomicU64::new(0));
        let stream = Arc::new(KeyStream::new(
            "test".to_string(),
            LockingQueueFactory.build().unwrap(),
            Arc::clone(&total),
        ));
        (stream, total)
    }

    #[test]
    fn test_first_enqueue_wins_transition() {
        let (stream, _) = test_stream();

        assert!(stream.enqueue(Box::new(|| Ok(()))));
        assert!(stream.is_dispatched());
        // Already dispatched: the second enqueue must not announce.
        assert!(!stream.enqueue(Box::new(|| Ok(()))));
        assert_eq!(stream.pending_count(), 2);
    }

    #[test]
    fn test_drain_runs_in_submission_order() {
        let (stream, total) = test_stream();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = Arc::clone(&order);
            stream.enqueue(Box::new(move || {
                order.lock().push(i);
                Ok(())
            }));
        }

        Drain::new(Arc::clone(&stream)).run().unwrap();

        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(stream.completed_count(), 5);
        assert_eq!(total.load(Ordering::Relaxed), 5);
        assert!(!stream.is_dispatched());
        assert_eq!(stream.pending_count(), 0);
    }

    #[test]
    fn test_failure_aborts_pass_and_keeps_survivors() {
        let (stream, total) = test_stream();
        let ran = Arc::new(AtomicUsize::new(0));

        stream.enqueue(Box::new(|| Err("first task broke".into())));
        let survivor = Arc::clone(&ran);
        stream.enqueue(Box::new(move || {
            survivor.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let err = Drain::new(Arc::clone(&stream)).run().unwrap_err();
        assert!(matches!(err, DispatchError::TaskFailed { ref key, .. } if key == "test"));

        // Pass aborted before the survivor; flag released; survivor kept.
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(!stream.is_dispatched());
        assert_eq!(stream.pending_count(), 1);
        assert_eq!(stream.completed_count(), 0);
        assert_eq!(total.load(Ordering::Relaxed), 0);

        // The next won transition drains the survivor.
        assert!(stream.enqueue(Box::new(|| Ok(()))));
        Drain::new(Arc::clone(&stream)).run().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(stream.completed_count(), 2);
    }

    #[test]
    fn test_counters_survive_partial_pass() {
        let (stream, total) = test_stream();

        stream.enqueue(Box::new(|| Ok(())));
        stream.enqueue(Box::new(|| Ok(())));
        stream.enqueue(Box::new(|| Err("third task broke".into())));
        stream.enqueue(Box::new(|| Ok(())));

        assert!(Drain::new(Arc::clone(&stream)).run().is_err());

        // The two successes before the failure are counted and stay counted.
        assert_eq!(stream.completed_count(), 2);
        assert_eq!(total.load(Ordering::Relaxed), 2);
        assert_eq!(stream.pending_count(), 1);
    }

    #[test]
    fn test_drain_picks_up_tasks_enqueued_mid_pass() {
        let (stream, _) = test_stream();
        let ran = Arc::new(AtomicUsize::new(0));

        // A task that enqueues a follow-up while the pass is running; the
        // follow-up's CAS fails, so the same pass must observe it.
        let inner_stream = Arc::clone(&stream);
        let inner_ran = Arc::clone(&ran);
        let outer_ran = Arc::clone(&ran);
        stream.enqueue(Box::new(move || {
            outer_ran.fetch_add(1, Ordering::SeqCst);
            let announced = inner_stream.enqueue(Box::new(move || {
                inner_ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
            assert!(!announced, "flag is held by the running pass");
            Ok(())
        }));

        Drain::new(Arc::clone(&stream)).run().unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 2);
        assert_eq!(stream.completed_count(), 2);
        assert_eq!(stream.pending_count(), 0);
    }
}
