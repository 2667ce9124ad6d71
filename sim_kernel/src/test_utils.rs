//! Test utilities for resilience testing
//!
//! This module provides helper functions for building process trees and
//! driving waits in integration tests.

use crate::{SimulatedKernel, WaitCompletion};
use core_types::{MemoryPerms, Pgid, Pid, Tid, UserAddr};
use kernel_api::{KernelError, ProcessApi, WaitStatus};

/// Address of the status word mapped by [`map_status_slot`]
pub const STATUS_SLOT: UserAddr = UserAddr::new(0x1000_0000);

/// Maps a writable word at [`STATUS_SLOT`] in the memory of `pid`
pub fn map_status_slot(kernel: &mut SimulatedKernel, pid: Pid) -> Result<(), KernelError> {
    kernel.map_user_memory(pid, STATUS_SLOT, 4, MemoryPerms::read_write())
}

/// Creates a parent with one child per entry of `groups`
///
/// Each child is moved to the group with that id.
///
/// # Example
///
/// ```
/// use sim_kernel::test_utils::spawn_family;
/// use sim_kernel::SimulatedKernel;
///
/// let mut kernel = SimulatedKernel::new();
/// let (parent, children) = spawn_family(&mut kernel, &[5, 7]).unwrap();
/// assert_eq!(kernel.process_table().children_of(parent), children.as_slice());
/// ```
pub fn spawn_family(
    kernel: &mut SimulatedKernel,
    groups: &[i32],
) -> Result<(Pid, Vec<Pid>), KernelError> {
    let parent = kernel.spawn_process(None)?;
    let mut children = Vec::with_capacity(groups.len());
    for &group in groups {
        let child = kernel.spawn_process(Some(parent))?;
        kernel.set_pgid(child, Pgid::new(group))?;
        children.push(child);
    }
    Ok((parent, children))
}

/// Exits `tid` with `code` and runs every waiter it woke
pub fn exit_and_settle(
    kernel: &mut SimulatedKernel,
    tid: Tid,
    code: i32,
) -> Result<Vec<WaitCompletion>, KernelError> {
    kernel.exit_task(tid, WaitStatus::exited(code))?;
    Ok(kernel.run_until_idle())
}
