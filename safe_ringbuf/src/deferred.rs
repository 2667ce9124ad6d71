//! Deferred action queue
//!
//! Producers that may run in interrupt context capture their work as an
//! action and enqueue it. The producer whose write made the queue non-empty
//! drains it, executing every queued action in order against the sink.
//! Producers that fire while a drain is running only enqueue; the running
//! drain picks their actions up, so the sink is never entered reentrantly.

use crate::loom::sync::atomic::{AtomicU64, Ordering};
use crate::SafeRingBuf;
use core::fmt;

/// Consumer of deferred actions
pub trait ActionSink<A> {
    /// Executes one action
    fn execute(&mut self, action: A);
}

/// Queue errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// No free slot; the action was dropped
    Full,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Full => write!(f, "Deferred action queue is full"),
        }
    }
}

/// Ring buffer of actions plus the sink that executes them
pub struct DeferredActionQueue<A, S, const N: usize> {
    ring: SafeRingBuf<A, N>,
    sink: spin::Mutex<S>,
    dropped: AtomicU64,
}

impl<A, S: ActionSink<A>, const N: usize> DeferredActionQueue<A, S, N> {
    /// Creates an empty queue feeding `sink`
    pub fn new(sink: S) -> Self {
        Self {
            ring: SafeRingBuf::new(),
            sink: spin::Mutex::new(sink),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueues `action`, draining the queue if it was empty
    ///
    /// A full queue drops the action. That is expected to be rare (bounded
    /// by producer nesting depth) and is not fatal.
    pub fn enqueue(&self, action: A) -> Result<(), QueueError> {
        match self.ring.write(action) {
            Ok(written) => {
                if written.was_empty {
                    self.drain();
                }
                Ok(())
            }
            Err(_) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!(
                    "deferred action dropped: queue full ({} slots, {} dropped so far)",
                    N,
                    dropped
                );
                Err(QueueError::Full)
            }
        }
    }

    /// Executes queued actions until the queue is empty
    ///
    /// Returns at once if another drain holds the sink; that drain will
    /// execute whatever is queued. A no-op on an empty queue.
    pub fn drain(&self) {
        loop {
            let Some(mut sink) = self.sink.try_lock() else {
                return;
            };

            // SAFETY: the held sink lock makes this the only consumer; every
            // read of the ring happens here.
            while let Some(action) = unsafe { self.ring.read() } {
                sink.execute(action);
            }

            drop(sink);

            // An action enqueued between the last read and the unlock found
            // the sink held and left its drain to us.
            if self.ring.is_empty() {
                return;
            }
        }
    }

    /// Runs `f` against the sink outside of a drain
    ///
    /// Returns `None` when a drain is running. Actions enqueued while `f`
    /// runs are executed right after it returns.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let result = {
            let mut sink = self.sink.try_lock()?;
            f(&mut sink)
        };

        if !self.ring.is_empty() {
            self.drain();
        }

        Some(result)
    }

    /// Number of actions waiting for a drain
    pub fn pending(&self) -> usize {
        self.ring.len()
    }

    /// Number of actions lost to a full queue
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<A, S, const N: usize> fmt::Debug for DeferredActionQueue<A, S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredActionQueue")
            .field("ring", &self.ring)
            .field("dropped", &self.dropped.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
