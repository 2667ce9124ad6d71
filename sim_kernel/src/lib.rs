//! # Simulated Kernel
//!
//! This crate provides a simulated implementation of the process API:
//! a process tree, task states, and POSIX `waitpid`/`wait4`.
//!
//! ## Purpose
//!
//! The simulated kernel allows testing the wait subsystem without hardware:
//! - Runs under `cargo test`
//! - Deterministic (one logical CPU, explicit scheduling)
//! - Inspectable (all state is accessible)
//!
//! ## Blocking
//!
//! A wait that has to suspend puts the caller to sleep and returns
//! [`WaitPoll::Blocked`]. Exits, stops and continues wake the tasks that
//! may care; [`SimulatedKernel::run_until_idle`] then plays the scheduler,
//! resuming each woken waiter with a fresh pass of the wait loop.

pub mod address_space;
pub mod preempt;
pub mod process_table;
pub mod scheduler;
pub mod test_utils;
mod wait;

use address_space::AddressSpaceManager;
use core_types::{MemoryPerms, Pgid, Pid, Tid, UserAddr};
use kernel_api::{
    wait_syscall_return, KernelError, ProcessApi, RUsage, TaskState, WaitOptions, WaitPoll,
    WaitRequest, WaitStatus,
};
use preempt::{Cpu, PreemptGuard};
use process_table::ProcessTable;
use scheduler::Scheduler;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Simulated kernel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Id of the first task created
    pub first_pid: i32,
    /// Maximum number of live tasks (zombies included)
    pub max_tasks: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            first_pid: 1,
            max_tasks: 1024,
        }
    }
}

/// Outcome of a resumed wait, keyed by the waiting task
pub type WaitCompletion = (Tid, Result<WaitPoll, KernelError>);

/// Simulated kernel state
///
/// This maintains all the state needed to simulate the process side of a
/// kernel. Unlike a real kernel, this state is directly accessible for
/// testing.
pub struct SimulatedKernel {
    config: KernelConfig,
    cpu: Cpu,
    table: ProcessTable,
    scheduler: Scheduler,
    address_spaces: AddressSpaceManager,
    /// Requests of tasks blocked in (or woken from) a wait
    pending_waits: HashMap<Tid, WaitRequest>,
}

impl SimulatedKernel {
    /// Creates a new simulated kernel
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    /// Creates a new simulated kernel with custom configuration
    pub fn with_config(config: KernelConfig) -> Self {
        Self {
            table: ProcessTable::new(config.first_pid, config.max_tasks),
            config,
            cpu: Cpu::new(),
            scheduler: Scheduler::new(),
            address_spaces: AddressSpaceManager::new(),
            pending_waits: HashMap::new(),
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn process_table(&self) -> &ProcessTable {
        &self.table
    }

    /// Returns the scheduler, whose audit log records every transition
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Drops the recorded scheduling events
    pub fn clear_audit_log(&mut self) {
        self.scheduler.clear_audit_log();
    }

    /// The unfinished wait of `tid`, if it is blocked or about to resume
    pub fn pending_wait(&self, tid: Tid) -> Option<&WaitRequest> {
        self.pending_waits.get(&tid)
    }

    /// True when no woken task is waiting to resume
    pub fn is_idle(&self) -> bool {
        !self.scheduler.has_runnable_tasks()
    }

    /// Maps user memory into the address space of `pid`
    pub fn map_user_memory(
        &mut self,
        pid: Pid,
        start: UserAddr,
        len: u64,
        perms: MemoryPerms,
    ) -> Result<(), KernelError> {
        self.address_spaces.map(pid, start, len, perms)
    }

    /// Reads a little-endian `i32` from the memory of `pid`
    pub fn read_user_i32(&self, pid: Pid, addr: UserAddr) -> Result<i32, KernelError> {
        let bytes = self.address_spaces.copy_from_user(pid, addr, 4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes);
        Ok(i32::from_le_bytes(raw))
    }

    /// Reads `len` bytes from the memory of `pid`
    pub fn read_user_bytes(
        &self,
        pid: Pid,
        addr: UserAddr,
        len: usize,
    ) -> Result<Vec<u8>, KernelError> {
        self.address_spaces.copy_from_user(pid, addr, len)
    }

    /// Stops a runnable task
    ///
    /// A stop is a state change waiters are told about; since only zombies
    /// satisfy a wait, they go back to sleep.
    pub fn stop_task(&mut self, tid: Tid) -> Result<(), KernelError> {
        self.transition(tid, TaskState::Runnable, TaskState::Stopped)?;
        let cs = self.cpu.disable_preemption();
        self.table.set_state(tid, TaskState::Stopped, &cs);
        self.scheduler.stop_task(tid);
        self.wake_up_tasks_waiting_on(tid, &cs);
        drop(cs);

        log::debug!("{} stopped", tid);
        Ok(())
    }

    /// Continues a stopped task
    pub fn continue_task(&mut self, tid: Tid) -> Result<(), KernelError> {
        self.transition(tid, TaskState::Stopped, TaskState::Runnable)?;
        let cs = self.cpu.disable_preemption();
        self.table.set_state(tid, TaskState::Runnable, &cs);
        self.scheduler.continue_task(tid);
        if self.pending_waits.contains_key(&tid) {
            self.scheduler.enqueue(tid);
        }
        self.wake_up_tasks_waiting_on(tid, &cs);
        drop(cs);

        log::debug!("{} continued", tid);
        Ok(())
    }

    /// Resumes woken tasks until none is left
    ///
    /// Each woken waiter re-runs its wait from the top. Returns the waits
    /// that finished, in the order they finished; waits that had to sleep
    /// again stay pending.
    pub fn run_until_idle(&mut self) -> Vec<WaitCompletion> {
        let mut completions = Vec::new();

        while let Some(tid) = self.scheduler.dequeue_next() {
            let runnable = self
                .table
                .task(tid)
                .is_some_and(|task| task.state() == TaskState::Runnable);
            // A stopped task keeps its request until it is continued.
            if !runnable {
                continue;
            }
            let Some(request) = self.pending_waits.remove(&tid) else {
                continue;
            };

            let result = self.wait_pass(tid, &request);
            match result {
                Ok(WaitPoll::Blocked) => {
                    self.pending_waits.insert(tid, request);
                }
                _ => completions.push((tid, result)),
            }
        }
        completions
    }

    /// `waitpid` with raw arguments and a raw return value
    ///
    /// Returns `None` while the caller is blocked.
    pub fn sys_waitpid(
        &mut self,
        caller: Tid,
        pid: i32,
        wstatus: Option<UserAddr>,
        options: u32,
    ) -> Option<i64> {
        let request = raw_request(pid, wstatus, options);
        wait_syscall_return(&self.waitpid(caller, request))
    }

    /// `wait4` with raw arguments and a raw return value
    pub fn sys_wait4(
        &mut self,
        caller: Tid,
        pid: i32,
        wstatus: Option<UserAddr>,
        options: u32,
        rusage: Option<UserAddr>,
    ) -> Option<i64> {
        let request = raw_request(pid, wstatus, options);
        wait_syscall_return(&self.wait4(caller, request, rusage))
    }

    /// Checks that `tid` exists and is in state `from`
    fn transition(&self, tid: Tid, from: TaskState, to: TaskState) -> Result<(), KernelError> {
        let state = self
            .table
            .task(tid)
            .ok_or(KernelError::NoSuchTask(tid))?
            .state();
        if state != from {
            return Err(KernelError::InvalidTransition {
                tid,
                from: state,
                to,
            });
        }
        Ok(())
    }

    /// Checks that `caller` may enter a wait
    fn check_caller(&self, caller: Tid) -> Result<(), KernelError> {
        let task = self
            .table
            .task(caller)
            .ok_or(KernelError::NoSuchTask(caller))?;
        if task.state() != TaskState::Runnable || self.pending_waits.contains_key(&caller) {
            return Err(KernelError::TaskNotRunnable(caller));
        }
        Ok(())
    }

    fn wake_up_tasks_waiting_on(&mut self, tid: Tid, cs: &PreemptGuard) {
        for woken in self.table.wake_up_tasks_waiting_on(tid, cs) {
            log::debug!("{} woken by {}", woken, tid);
            self.scheduler.unblock_task(woken);
        }
    }

    /// Frees a secondary thread of an exiting task's process
    fn retire_thread(&mut self, tid: Tid, status: WaitStatus, cs: &PreemptGuard) {
        self.table.reset_wait_obj(tid, cs);
        self.pending_waits.remove(&tid);
        self.wake_up_tasks_waiting_on(tid, cs);
        self.table.remove_thread(tid, cs);
        self.scheduler.exit_task(tid, status);
    }
}

impl Default for SimulatedKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn raw_request(pid: i32, wstatus: Option<UserAddr>, options: u32) -> WaitRequest {
    let request = WaitRequest::new(pid).with_options(WaitOptions::from_raw(options));
    match wstatus {
        Some(addr) => request.with_status(addr),
        None => request,
    }
}

impl ProcessApi for SimulatedKernel {
    fn spawn_process(&mut self, parent: Option<Pid>) -> Result<Pid, KernelError> {
        let pid = self.table.create_process(parent)?;
        self.address_spaces.create_address_space(pid);
        log::debug!("spawned {} (parent {:?})", pid, parent);
        Ok(pid)
    }

    fn spawn_thread(&mut self, pid: Pid) -> Result<Tid, KernelError> {
        let tid = self.table.create_thread(pid)?;
        log::debug!("spawned {} in {}", tid, pid);
        Ok(tid)
    }

    fn set_pgid(&mut self, pid: Pid, pgid: Pgid) -> Result<(), KernelError> {
        self.table.set_pgid(pid, pgid)
    }

    /// Exit path
    ///
    /// A main task takes its whole process down: the other threads are
    /// freed, and the main task becomes a zombie for its parent to reap.
    /// A secondary thread is freed right away. Waiters are woken before the
    /// zombie is published, inside the same critical section, so a resumed
    /// waiter always finds it.
    fn exit_task(&mut self, tid: Tid, status: WaitStatus) -> Result<(), KernelError> {
        let task = self.table.task(tid).ok_or(KernelError::NoSuchTask(tid))?;
        if task.state() == TaskState::Zombie {
            return Err(KernelError::InvalidTransition {
                tid,
                from: TaskState::Zombie,
                to: TaskState::Zombie,
            });
        }
        let pid = task.pid();
        let is_main = task.is_main_task();

        let cs = self.cpu.disable_preemption();
        if is_main {
            let others: Vec<Tid> = self
                .table
                .process(pid)
                .map(|process| process.threads().iter().copied().filter(|&t| t != tid).collect())
                .unwrap_or_default();
            for thread in others {
                self.retire_thread(thread, status, &cs);
            }
        }

        self.table.reset_wait_obj(tid, &cs);
        self.pending_waits.remove(&tid);
        self.wake_up_tasks_waiting_on(tid, &cs);
        if is_main {
            self.table.mark_zombie(tid, status, &cs);
        } else {
            self.table.remove_thread(tid, &cs);
        }
        self.scheduler.exit_task(tid, status);
        drop(cs);

        log::debug!("{} exited with {:#x}", tid, status.raw());
        Ok(())
    }

    fn waitpid(&mut self, caller: Tid, request: WaitRequest) -> Result<WaitPoll, KernelError> {
        self.check_caller(caller)?;
        let polled = self.wait_pass(caller, &request)?;
        if polled == WaitPoll::Blocked {
            self.pending_waits.insert(caller, request);
        }
        Ok(polled)
    }

    /// Resource usage is not tracked: a zeroed record is stored before the
    /// wait starts.
    fn wait4(
        &mut self,
        caller: Tid,
        request: WaitRequest,
        rusage: Option<UserAddr>,
    ) -> Result<WaitPoll, KernelError> {
        self.check_caller(caller)?;
        if let Some(addr) = rusage {
            let pid = self
                .table
                .task(caller)
                .ok_or(KernelError::NoSuchTask(caller))?
                .pid();
            self.address_spaces
                .copy_to_user(pid, addr, &RUsage::default().to_le_bytes())?;
        }
        self.waitpid(caller, request)
    }

    fn task_state(&self, tid: Tid) -> Option<TaskState> {
        self.table.task(tid).map(|task| task.state())
    }
}
