//! Kernel error types

use crate::task::TaskState;
use core_types::{MemoryError, Pid, Tid, UserAddr};
use thiserror::Error;

/// `errno` values used at the syscall boundary
pub mod errno {
    pub const ESRCH: i32 = 3;
    pub const ECHILD: i32 = 10;
    pub const EAGAIN: i32 = 11;
    pub const EFAULT: i32 = 14;
    pub const EINVAL: i32 = 22;
}

/// Recoverable errors returned to the caller of a kernel operation
///
/// Broken internal invariants are not represented here: they halt the
/// kernel through [`protocol_violation`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// No child of the caller matches the wait request
    #[error("No child matches the wait request")]
    NoSuchChild,

    /// A user-supplied output location is not accessible
    #[error("Bad user pointer: {0}")]
    BadUserPointer(UserAddr),

    /// Resource exhausted
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Task not found
    #[error("No such task: {0}")]
    NoSuchTask(Tid),

    /// Process not found
    #[error("No such process: {0}")]
    NoSuchProcess(Pid),

    /// The task cannot issue a system call in its current state
    #[error("Task {0} is not runnable")]
    TaskNotRunnable(Tid),

    /// Requested state change is not allowed from the current state
    #[error("Invalid transition for {tid}: {from:?} -> {to:?}")]
    InvalidTransition {
        tid: Tid,
        from: TaskState,
        to: TaskState,
    },

    /// A user memory region could not be mapped
    #[error("Invalid mapping: {0}")]
    InvalidMapping(MemoryError),
}

impl KernelError {
    /// Returns the positive `errno` value for this error
    pub fn errno(&self) -> i32 {
        match self {
            KernelError::NoSuchChild => errno::ECHILD,
            KernelError::BadUserPointer(_) => errno::EFAULT,
            KernelError::ResourceExhausted(_) => errno::EAGAIN,
            KernelError::NoSuchTask(_) | KernelError::NoSuchProcess(_) => errno::ESRCH,
            KernelError::TaskNotRunnable(_)
            | KernelError::InvalidTransition { .. }
            | KernelError::InvalidMapping(_) => errno::EINVAL,
        }
    }

    /// Returns the value a syscall hands back to user space (`-errno`)
    pub fn to_syscall_return(&self) -> i64 {
        -(self.errno() as i64)
    }
}

/// Halts on a broken low-level invariant.
///
/// Continuing after the queuing or task state machine invariants are
/// suspected broken would corrupt further state, so this never returns.
#[cold]
#[track_caller]
pub fn protocol_violation(what: &str) -> ! {
    log::error!("protocol violation: {}", what);
    panic!("protocol violation: {}", what);
}
