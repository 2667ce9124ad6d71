//! Process management trait

use crate::{KernelError, TaskState, WaitPoll, WaitRequest, WaitStatus};
use core_types::{Pgid, Pid, Tid, UserAddr};

/// The process side of the kernel API
///
/// Creation and exit are the external collaborators of the wait
/// subsystem; `waitpid`/`wait4` are its entrypoints. Implementations:
/// - Simulated kernel (for testing)
/// - Real kernel (syscalls)
///
/// # Blocking
///
/// A wait that has to suspend returns [`WaitPoll::Blocked`] after putting
/// the caller to sleep. The request is resumed by the scheduler once the
/// caller is woken and it re-validates its condition from scratch.
///
/// # Example
///
/// ```
/// use kernel_api::{KernelError, ProcessApi, WaitPoll, WaitRequest, WaitStatus};
///
/// fn run_child<K: ProcessApi>(kernel: &mut K) -> Result<(), KernelError> {
///     let parent = kernel.spawn_process(None)?;
///     let child = kernel.spawn_process(Some(parent))?;
///     kernel.exit_task(child.main_task(), WaitStatus::exited(0))?;
///     let polled = kernel.waitpid(parent.main_task(), WaitRequest::new(-1))?;
///     assert_eq!(polled, WaitPoll::Reaped(child.main_task()));
///     Ok(())
/// }
/// ```
pub trait ProcessApi {
    /// Creates a process, optionally as the child of `parent`
    ///
    /// A child inherits its parent's process group; a root process leads
    /// its own group.
    fn spawn_process(&mut self, parent: Option<Pid>) -> Result<Pid, KernelError>;

    /// Adds a task to an existing process
    fn spawn_thread(&mut self, pid: Pid) -> Result<Tid, KernelError>;

    /// Moves a process to another group
    fn set_pgid(&mut self, pid: Pid, pgid: Pgid) -> Result<(), KernelError>;

    /// Exit path: turns the task into a zombie and wakes whoever waits on it
    fn exit_task(&mut self, tid: Tid, status: WaitStatus) -> Result<(), KernelError>;

    /// Waits for a child to change state, see [`WaitRequest`]
    fn waitpid(&mut self, caller: Tid, request: WaitRequest) -> Result<WaitPoll, KernelError>;

    /// `waitpid` that also reports resource usage at `rusage`
    fn wait4(
        &mut self,
        caller: Tid,
        request: WaitRequest,
        rusage: Option<UserAddr>,
    ) -> Result<WaitPoll, KernelError>;

    /// Current state of a task, `None` once it has been reaped
    fn task_state(&self, tid: Tid) -> Option<TaskState>;
}
