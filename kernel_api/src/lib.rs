//! # Kernel API
//!
//! This crate defines the interface between callers and the kernel's
//! process machinery.
//!
//! ## Philosophy
//!
//! The kernel provides **mechanisms**, not policies:
//! - Task state transitions (runnable, sleeping, stopped, zombie)
//! - Waiting for children with POSIX `waitpid` semantics
//! - Explicit, typed errors with a stable errno mapping
//!
//! ## Design Goals
//!
//! 1. **Testability**: The entire API can be implemented by a simulator
//! 2. **Explicitness**: Wait conditions are tagged, never sign-encoded
//! 3. **Type safety**: Task, process and group ids cannot be mixed up
//!
//! ## Error Model
//!
//! Recoverable conditions are [`KernelError`] values. Broken invariants go
//! through [`protocol_violation`], which halts.

pub mod error;
pub mod kernel;
pub mod task;
pub mod wait;

pub use error::{errno, protocol_violation, KernelError};
pub use kernel::ProcessApi;
pub use task::{TaskState, WaitObject};
pub use wait::{
    wait_syscall_return, RUsage, WaitOptions, WaitPoll, WaitRequest, WaitSelector, WaitStatus,
};
