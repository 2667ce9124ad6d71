//! # Safe Ring Buffer
//!
//! Interrupt-safe plumbing for handing work from contexts that must never
//! block to a context that can run it without locks.
//!
//! - [`SafeRingBuf`]: fixed-capacity ring buffer whose read position, write
//!   position and full flag share one atomic word, updated by CAS retry.
//!   Tolerates producers that interrupt each other; one consumer at a time.
//! - [`DeferredActionQueue`]: actions queued on a `SafeRingBuf` and executed
//!   in order by whichever producer found the queue empty.
//!
//! Single logical CPU: reentrancy comes from nested interrupts, not from
//! parallel cores.

#![cfg_attr(not(test), no_std)]

mod loom;
mod ringbuf;
mod state;

pub mod deferred;

pub use deferred::{ActionSink, DeferredActionQueue, QueueError};
pub use ringbuf::{SafeRingBuf, Written};
pub use state::MAX_CAPACITY;
