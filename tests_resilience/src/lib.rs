//! Resilience Test Utilities
//!
//! This crate provides shared utilities for cross-crate integration tests.
//!
//! ## Test Philosophy
//!
//! - **Wakes are hints**: A woken waiter must re-validate, so tests wake
//!   waiters spuriously on purpose and check nothing breaks
//! - **Exactly-once reaping**: Racing waiters never both collect a zombie
//! - **No reentrant consumers**: Actions queued from inside a drain run
//!   after the action that queued them, never nested inside it

use console_term::{RecordingVideo, Term, TermConfig, Terminal};
use core_types::{Pid, UserAddr};
use kernel_api::KernelError;
use sim_kernel::test_utils::{map_status_slot, spawn_family};
use sim_kernel::SimulatedKernel;

/// A parent process and its children, in a fresh kernel
pub struct Family {
    pub kernel: SimulatedKernel,
    pub parent: Pid,
    pub children: Vec<Pid>,
}

impl Family {
    /// Status word of the parent
    pub fn status(&self) -> Result<i32, KernelError> {
        self.kernel.read_user_i32(self.parent, Self::STATUS_SLOT)
    }

    pub const STATUS_SLOT: UserAddr = sim_kernel::test_utils::STATUS_SLOT;
}

/// Bootstrap helper for tests
///
/// Creates a kernel holding a parent with one child per entry of `groups`
/// (each moved to that process group) and a status word mapped in the
/// parent.
pub fn test_bootstrap(groups: &[i32]) -> Result<Family, KernelError> {
    let mut kernel = SimulatedKernel::new();
    let (parent, children) = spawn_family(&mut kernel, groups)?;
    map_status_slot(&mut kernel, parent)?;
    Ok(Family {
        kernel,
        parent,
        children,
    })
}

/// Creates a terminal whose output is recorded
///
/// The returned video handle shares its log with the terminal's.
pub fn recording_term(rows: usize, cols: usize) -> (Term, RecordingVideo) {
    let video = RecordingVideo::new();
    let config = TermConfig {
        rows,
        cols,
        ..TermConfig::default()
    };
    let term = Term::new(Terminal::new(config, Box::new(video.clone())));
    (term, video)
}
