//! Sleep/wake scheduler for SimulatedKernel
//!
//! ## Philosophy
//!
//! - **Mechanism, not policy**: The scheduler only decides *when* a woken
//!   task resumes, never whether its wait condition holds. A resumed
//!   waiter re-validates from scratch.
//! - **Determinism first**: Same sequence of wakes => same resume order.
//! - **No hidden yields**: A task leaves the run queue only through an
//!   explicit block, stop or exit.
//!
//! ## Design
//!
//! - **FIFO run queue**: Woken tasks resume in the order they were woken.
//! - **Audit trail**: Every transition is recorded with a sequence number,
//!   so tests can assert on the exact interleaving.

use core_types::Tid;
use kernel_api::{WaitObject, WaitStatus};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Scheduling event for audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEvent {
    /// Task was selected to resume
    TaskSelected { tid: Tid, seq: u64 },
    /// Task went to sleep on a wait object
    TaskBlocked {
        tid: Tid,
        wait_obj: WaitObject,
        seq: u64,
    },
    /// Task was woken and queued to resume
    TaskWoken { tid: Tid, seq: u64 },
    /// Task exited
    TaskExited {
        tid: Tid,
        status: WaitStatus,
        seq: u64,
    },
    /// Task was stopped
    TaskStopped { tid: Tid, seq: u64 },
    /// Task was continued after a stop
    TaskContinued { tid: Tid, seq: u64 },
    /// Zombie was reaped by a waiter
    TaskReaped { tid: Tid, by: Tid, seq: u64 },
}

impl ScheduleEvent {
    /// The task the event is about
    pub fn tid(&self) -> Tid {
        match self {
            ScheduleEvent::TaskSelected { tid, .. }
            | ScheduleEvent::TaskBlocked { tid, .. }
            | ScheduleEvent::TaskWoken { tid, .. }
            | ScheduleEvent::TaskExited { tid, .. }
            | ScheduleEvent::TaskStopped { tid, .. }
            | ScheduleEvent::TaskContinued { tid, .. }
            | ScheduleEvent::TaskReaped { tid, .. } => *tid,
        }
    }

    /// Position of the event in the audit trail
    pub fn seq(&self) -> u64 {
        match self {
            ScheduleEvent::TaskSelected { seq, .. }
            | ScheduleEvent::TaskBlocked { seq, .. }
            | ScheduleEvent::TaskWoken { seq, .. }
            | ScheduleEvent::TaskExited { seq, .. }
            | ScheduleEvent::TaskStopped { seq, .. }
            | ScheduleEvent::TaskContinued { seq, .. }
            | ScheduleEvent::TaskReaped { seq, .. } => *seq,
        }
    }
}

/// Run queue for tasks
///
/// This is a simple FIFO queue using VecDeque for deterministic ordering.
/// Tasks are enqueued at the back and dequeued from the front.
#[derive(Debug, Default)]
struct RunQueue {
    queue: VecDeque<Tid>,
}

impl RunQueue {
    fn enqueue(&mut self, tid: Tid) {
        self.queue.push_back(tid);
    }

    fn dequeue(&mut self) -> Option<Tid> {
        self.queue.pop_front()
    }

    fn contains(&self, tid: Tid) -> bool {
        self.queue.contains(&tid)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn remove(&mut self, tid: Tid) {
        self.queue.retain(|&id| id != tid);
    }
}

/// Scheduler of tasks that have something to resume
///
/// Tasks that were never put to sleep are not tracked here; only woken
/// waiters (and continued tasks with an unfinished wait) are queued.
#[derive(Debug, Default)]
pub struct Scheduler {
    run_queue: RunQueue,
    current_task: Option<Tid>,
    next_seq: u64,
    /// Audit log for scheduling events (test-only)
    audit_log: Vec<ScheduleEvent>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a task without recording a wake
    pub fn enqueue(&mut self, tid: Tid) {
        if !self.run_queue.contains(tid) {
            self.run_queue.enqueue(tid);
        }
    }

    /// Dequeues the next task to resume
    ///
    /// Returns None if no tasks are runnable.
    pub fn dequeue_next(&mut self) -> Option<Tid> {
        let next = self.run_queue.dequeue();
        self.current_task = next;
        if let Some(tid) = next {
            let seq = self.next_seq();
            self.audit_log.push(ScheduleEvent::TaskSelected { tid, seq });
        }
        next
    }

    /// Records a task going to sleep
    ///
    /// Sleeping tasks are not scheduled until they are woken.
    pub fn block_task(&mut self, tid: Tid, wait_obj: WaitObject) {
        self.dequeue_task(tid);
        let seq = self.next_seq();
        self.audit_log
            .push(ScheduleEvent::TaskBlocked { tid, wait_obj, seq });
    }

    /// Queues a woken task
    pub fn unblock_task(&mut self, tid: Tid) {
        self.enqueue(tid);
        let seq = self.next_seq();
        self.audit_log.push(ScheduleEvent::TaskWoken { tid, seq });
    }

    /// Removes an exiting task from scheduling
    pub fn exit_task(&mut self, tid: Tid, status: WaitStatus) {
        self.dequeue_task(tid);
        let seq = self.next_seq();
        self.audit_log
            .push(ScheduleEvent::TaskExited { tid, status, seq });
    }

    /// Removes a stopped task from scheduling
    pub fn stop_task(&mut self, tid: Tid) {
        self.dequeue_task(tid);
        let seq = self.next_seq();
        self.audit_log.push(ScheduleEvent::TaskStopped { tid, seq });
    }

    /// Records a stopped task continuing
    ///
    /// The caller queues it again if it has a wait to resume.
    pub fn continue_task(&mut self, tid: Tid) {
        let seq = self.next_seq();
        self.audit_log.push(ScheduleEvent::TaskContinued { tid, seq });
    }

    /// Records `tid` being reaped by `by`
    pub fn task_reaped(&mut self, tid: Tid, by: Tid) {
        self.dequeue_task(tid);
        let seq = self.next_seq();
        self.audit_log.push(ScheduleEvent::TaskReaped { tid, by, seq });
    }

    /// Returns the task selected last, if any
    pub fn current_task(&self) -> Option<Tid> {
        self.current_task
    }

    /// Returns the number of queued tasks
    pub fn runnable_count(&self) -> usize {
        self.run_queue.len()
    }

    pub fn has_runnable_tasks(&self) -> bool {
        self.runnable_count() > 0
    }

    #[cfg(test)]
    fn is_queued(&self, tid: Tid) -> bool {
        self.run_queue.contains(tid)
    }

    /// Returns the audit log
    pub fn audit_log(&self) -> &[ScheduleEvent] {
        &self.audit_log
    }

    /// Clears the audit log
    pub fn clear_audit_log(&mut self) {
        self.audit_log.clear();
    }

    fn dequeue_task(&mut self, tid: Tid) {
        self.run_queue.remove(tid);
        if self.current_task == Some(tid) {
            self.current_task = None;
        }
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
