//! `waitpid` for SimulatedKernel
//!
//! One pass of the wait loop: scan the caller's children for a matching
//! zombie and reap it, or put the caller to sleep. A woken caller runs the
//! pass again from the top; nothing about the wake itself is trusted.
//!
//! The scan, the status copy and the reap happen in one critical section,
//! so two waiters can never both see the same zombie.

use crate::preempt::PreemptGuard;
use crate::SimulatedKernel;
use core_types::{Pid, Tid, UserAddr};
use kernel_api::{
    protocol_violation, KernelError, TaskState, WaitObject, WaitOptions, WaitPoll, WaitRequest,
    WaitSelector,
};

impl SimulatedKernel {
    /// Runs one pass of the wait loop for `caller`
    pub(crate) fn wait_pass(
        &mut self,
        caller: Tid,
        request: &WaitRequest,
    ) -> Result<WaitPoll, KernelError> {
        let caller_pid = self
            .table
            .task(caller)
            .ok_or(KernelError::NoSuchTask(caller))?
            .pid();
        let caller_pgid = self
            .table
            .process(caller_pid)
            .ok_or(KernelError::NoSuchProcess(caller_pid))?
            .pgid();
        let selector = request.selector();

        let cs = self.cpu.disable_preemption();

        if let WaitSelector::Child(pid) = selector {
            let is_child = self
                .table
                .process(pid)
                .is_some_and(|process| process.parent() == Some(caller_pid));
            if !is_child {
                return Err(KernelError::NoSuchChild);
            }
        }

        let mut child_count = 0;
        let mut zombie = None;
        for &child in self.table.children_of(caller_pid) {
            let Some(process) = self.table.process(child) else {
                continue;
            };
            if !selector.matches(child, process.pgid(), caller_pgid) {
                continue;
            }
            child_count += 1;

            let state = self.table.task(child.main_task()).map(|task| task.state());
            if state == Some(TaskState::Zombie) {
                zombie = Some(child);
                break;
            }
        }

        if let Some(child) = zombie {
            return self.collect_zombie(caller, caller_pid, child, request.wstatus, cs);
        }

        if child_count == 0 {
            return Err(KernelError::NoSuchChild);
        }
        if request.options.contains(WaitOptions::WNOHANG) {
            return Ok(WaitPoll::NoChange);
        }

        let wait_obj = match selector {
            WaitSelector::Child(pid) => WaitObject::Task(pid.main_task()),
            WaitSelector::Group(pgid) => WaitObject::ChildInGroup(pgid),
            WaitSelector::CallerGroup => WaitObject::ChildInGroup(caller_pgid),
            WaitSelector::AnyChild => WaitObject::AnyChild,
        };
        self.table.sleep_on(caller, wait_obj, &cs);
        self.scheduler.block_task(caller, wait_obj);
        drop(cs);

        log::debug!("{} sleeps on {:?}", caller, wait_obj);
        Ok(WaitPoll::Blocked)
    }

    /// Copies the status of zombie `child` out and reaps it
    ///
    /// The zombie is reaped even when the copy faults; the caller then sees
    /// the fault instead of the tid.
    fn collect_zombie(
        &mut self,
        caller: Tid,
        caller_pid: Pid,
        child: Pid,
        wstatus: Option<UserAddr>,
        cs: PreemptGuard,
    ) -> Result<WaitPoll, KernelError> {
        let child_tid = child.main_task();
        let status = self
            .table
            .task(child_tid)
            .and_then(|task| task.exit_status())
            .unwrap_or_else(|| protocol_violation("zombie without exit status"));

        let copied = match wstatus {
            Some(addr) => {
                self.address_spaces
                    .copy_to_user(caller_pid, addr, &status.raw().to_le_bytes())
            }
            None => Ok(()),
        };

        self.table.reap(child, &cs);
        self.address_spaces.destroy_address_space(child);
        self.scheduler.task_reaped(child_tid, caller);
        drop(cs);

        match copied {
            Ok(()) => {
                log::debug!("{} reaped {} ({:#x})", caller, child_tid, status.raw());
                Ok(WaitPoll::Reaped(child_tid))
            }
            Err(err) => {
                log::warn!("{} reaped {} but could not store its status", caller, child_tid);
                Err(err)
            }
        }
    }
}
