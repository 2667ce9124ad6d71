//! Process tree and task table
//!
//! A process is identified by the tid of its main task. Its children are
//! the processes it created; waiting, matching and reaping all operate on
//! a child's main task.
//!
//! Invariant: a task has a wait object iff it is [`TaskState::Sleeping`].
//! A sleeper waiting on one specific task is also linked on that task's
//! waiting list; group-wide sleepers are found through the parent relation.

use crate::preempt::PreemptGuard;
use core_types::{Pgid, Pid, Tid};
use kernel_api::{protocol_violation, KernelError, TaskState, WaitObject, WaitStatus};
use std::collections::HashMap;

/// A schedulable task
#[derive(Debug, Clone)]
pub struct Task {
    tid: Tid,
    pid: Pid,
    state: TaskState,
    exit_status: Option<WaitStatus>,
    wait_obj: Option<WaitObject>,
    /// Sleepers whose wait object is `WaitObject::Task(self.tid)`
    tasks_waiting: Vec<Tid>,
}

impl Task {
    fn new(tid: Tid, pid: Pid) -> Self {
        Self {
            tid,
            pid,
            state: TaskState::Runnable,
            exit_status: None,
            wait_obj: None,
            tasks_waiting: Vec::new(),
        }
    }

    pub fn tid(&self) -> Tid {
        self.tid
    }

    /// The process the task belongs to
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Status recorded at exit; set once the task is a zombie
    pub fn exit_status(&self) -> Option<WaitStatus> {
        self.exit_status
    }

    pub fn wait_obj(&self) -> Option<WaitObject> {
        self.wait_obj
    }

    /// Tasks sleeping until this one changes state
    pub fn tasks_waiting(&self) -> &[Tid] {
        &self.tasks_waiting
    }

    pub fn is_main_task(&self) -> bool {
        self.pid.main_task() == self.tid
    }
}

/// A process: a group of tasks sharing one address space
#[derive(Debug, Clone)]
pub struct Process {
    pid: Pid,
    parent: Option<Pid>,
    pgid: Pgid,
    children: Vec<Pid>,
    threads: Vec<Tid>,
}

impl Process {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// `None` for root processes and for orphans whose parent reaped them
    /// away
    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    pub fn pgid(&self) -> Pgid {
        self.pgid
    }

    /// Child processes, in creation order
    pub fn children(&self) -> &[Pid] {
        &self.children
    }

    /// Tasks of the process, main task first
    pub fn threads(&self) -> &[Tid] {
        &self.threads
    }
}

/// Arena of every live task and process
#[derive(Debug)]
pub struct ProcessTable {
    tasks: HashMap<Tid, Task>,
    processes: HashMap<Pid, Process>,
    next_id: i32,
    max_tasks: usize,
}

impl ProcessTable {
    /// Creates an empty table handing out ids from `first_id`
    pub fn new(first_id: i32, max_tasks: usize) -> Self {
        Self {
            tasks: HashMap::new(),
            processes: HashMap::new(),
            next_id: first_id,
            max_tasks,
        }
    }

    /// Creates a process with a single main task
    ///
    /// A child joins its parent's group and is appended to its children; a
    /// root process leads a new group.
    pub fn create_process(&mut self, parent: Option<Pid>) -> Result<Pid, KernelError> {
        let inherited = match parent {
            Some(parent) => Some(self.live_process(parent)?.pgid),
            None => None,
        };

        let pid = Pid::new(self.alloc_id()?);
        let pgid = inherited.unwrap_or(Pgid::led_by(pid));

        self.tasks.insert(pid.main_task(), Task::new(pid.main_task(), pid));
        self.processes.insert(
            pid,
            Process {
                pid,
                parent,
                pgid,
                children: Vec::new(),
                threads: vec![pid.main_task()],
            },
        );
        if let Some(parent) = parent.and_then(|parent| self.processes.get_mut(&parent)) {
            parent.children.push(pid);
        }
        Ok(pid)
    }

    /// Adds a task to a live process
    pub fn create_thread(&mut self, pid: Pid) -> Result<Tid, KernelError> {
        self.live_process(pid)?;
        let tid = Tid::new(self.alloc_id()?);
        self.tasks.insert(tid, Task::new(tid, pid));
        if let Some(process) = self.processes.get_mut(&pid) {
            process.threads.push(tid);
        }
        Ok(tid)
    }

    /// Moves a process to group `pgid`
    pub fn set_pgid(&mut self, pid: Pid, pgid: Pgid) -> Result<(), KernelError> {
        let process = self
            .processes
            .get_mut(&pid)
            .ok_or(KernelError::NoSuchProcess(pid))?;
        process.pgid = pgid;
        Ok(())
    }

    pub fn task(&self, tid: Tid) -> Option<&Task> {
        self.tasks.get(&tid)
    }

    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    /// Children of `pid`; empty for an unknown process
    pub fn children_of(&self, pid: Pid) -> &[Pid] {
        self.processes
            .get(&pid)
            .map(|process| process.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Puts `tid` to sleep on `wait_obj`
    pub fn sleep_on(&mut self, tid: Tid, wait_obj: WaitObject, _cs: &PreemptGuard) {
        let Some(task) = self.tasks.get_mut(&tid) else {
            protocol_violation("sleeping task is not in the table");
        };
        if task.state != TaskState::Runnable {
            protocol_violation("only a runnable task can go to sleep");
        }
        task.state = TaskState::Sleeping;
        task.wait_obj = Some(wait_obj);

        if let WaitObject::Task(target) = wait_obj {
            if let Some(target) = self.tasks.get_mut(&target) {
                target.tasks_waiting.push(tid);
            }
        }
    }

    /// Clears the wait object of `tid`, making a sleeper runnable
    ///
    /// Returns whether the task was sleeping.
    pub fn reset_wait_obj(&mut self, tid: Tid, _cs: &PreemptGuard) -> bool {
        let Some(task) = self.tasks.get_mut(&tid) else {
            return false;
        };
        let Some(wait_obj) = task.wait_obj.take() else {
            return false;
        };
        if task.state == TaskState::Sleeping {
            task.state = TaskState::Runnable;
        }

        if let WaitObject::Task(target) = wait_obj {
            if let Some(target) = self.tasks.get_mut(&target) {
                target.tasks_waiting.retain(|&waiter| waiter != tid);
            }
        }
        true
    }

    /// Wakes every task that may care about a state change of `tid`
    ///
    /// That is everything on its waiting list, plus every task of the
    /// parent process sleeping on a group-wide condition. The group is not
    /// checked: a woken waiter re-validates its own condition. Returns the
    /// woken tasks in wake order.
    pub fn wake_up_tasks_waiting_on(&mut self, tid: Tid, cs: &PreemptGuard) -> Vec<Tid> {
        let Some(task) = self.tasks.get_mut(&tid) else {
            return Vec::new();
        };
        let pid = task.pid;
        let waiters = std::mem::take(&mut task.tasks_waiting);

        let mut woken = Vec::new();
        for waiter in waiters {
            if self.reset_wait_obj(waiter, cs) {
                woken.push(waiter);
            }
        }

        let parent_threads = self
            .processes
            .get(&pid)
            .and_then(|process| process.parent)
            .and_then(|parent| self.processes.get(&parent))
            .map(|parent| parent.threads.clone())
            .unwrap_or_default();

        for thread in parent_threads {
            let group_wide = self.tasks.get(&thread).is_some_and(|task| {
                task.state == TaskState::Sleeping
                    && task.wait_obj.is_some_and(|obj| obj.is_group_wide())
            });
            if group_wide && self.reset_wait_obj(thread, cs) {
                woken.push(thread);
            }
        }
        woken
    }

    /// Sets a stop/continue state
    pub fn set_state(&mut self, tid: Tid, state: TaskState, _cs: &PreemptGuard) {
        if let Some(task) = self.tasks.get_mut(&tid) {
            task.state = state;
        }
    }

    /// Turns a main task into a zombie holding `status`
    pub fn mark_zombie(&mut self, tid: Tid, status: WaitStatus, _cs: &PreemptGuard) {
        let Some(task) = self.tasks.get_mut(&tid) else {
            protocol_violation("exiting task is not in the table");
        };
        if task.wait_obj.is_some() {
            protocol_violation("zombie still holds a wait object");
        }
        task.state = TaskState::Zombie;
        task.exit_status = Some(status);
    }

    /// Frees a secondary thread right away
    pub fn remove_thread(&mut self, tid: Tid, _cs: &PreemptGuard) {
        let Some(task) = self.tasks.remove(&tid) else {
            return;
        };
        if task.is_main_task() {
            protocol_violation("main task removed without being reaped");
        }
        if let Some(process) = self.processes.get_mut(&task.pid) {
            process.threads.retain(|&thread| thread != tid);
        }
    }

    /// Removes the zombie process `child` from the tree
    ///
    /// The child leaves its parent's children, and its own children lose
    /// their parent. Returns the status it exited with.
    pub fn reap(&mut self, child: Pid, _cs: &PreemptGuard) -> WaitStatus {
        let status = match self.tasks.get(&child.main_task()) {
            Some(task) if task.state == TaskState::Zombie => task.exit_status,
            _ => protocol_violation("reaping a task that is not a zombie"),
        };
        let Some(status) = status else {
            protocol_violation("zombie without exit status");
        };
        let Some(process) = self.processes.remove(&child) else {
            protocol_violation("zombie task without a process");
        };

        for thread in &process.threads {
            self.tasks.remove(thread);
        }
        if let Some(parent) = process.parent.and_then(|p| self.processes.get_mut(&p)) {
            parent.children.retain(|&pid| pid != child);
        }
        for orphan in &process.children {
            if let Some(orphan) = self.processes.get_mut(orphan) {
                orphan.parent = None;
            }
        }
        status
    }

    fn live_process(&self, pid: Pid) -> Result<&Process, KernelError> {
        let process = self
            .processes
            .get(&pid)
            .ok_or(KernelError::NoSuchProcess(pid))?;
        match self.tasks.get(&pid.main_task()) {
            Some(main) if main.state != TaskState::Zombie => Ok(process),
            _ => Err(KernelError::NoSuchProcess(pid)),
        }
    }

    fn alloc_id(&mut self) -> Result<i32, KernelError> {
        if self.tasks.len() >= self.max_tasks {
            return Err(KernelError::ResourceExhausted(format!(
                "task table full ({} tasks)",
                self.max_tasks
            )));
        }
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| KernelError::ResourceExhausted("task ids".to_string()))?;
        Ok(id)
    }
}
