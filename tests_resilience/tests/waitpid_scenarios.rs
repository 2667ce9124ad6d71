//! Waitpid Scenario Tests
//!
//! Validates the child selection rules of `waitpid`, its non-blocking
//! mode and its error results against a small process tree.

use core_types::{Pgid, UserAddr};
use kernel_api::{
    KernelError, ProcessApi, TaskState, WaitOptions, WaitPoll, WaitRequest, WaitStatus,
};
use sim_kernel::scheduler::ScheduleEvent;
use tests_resilience::{test_bootstrap, Family};

/// Test: pid -1 reaps the exited child and leaves its sibling alone
///
/// P1 has C1 (group 5) and C2 (group 7). C1 exits; waiting for any child
/// collects C1, after which C1 is no longer a child at all.
#[test]
fn test_any_child_reaps_only_the_zombie() {
    let mut family = test_bootstrap(&[5, 7]).expect("bootstrap");
    let (c1, c2) = (family.children[0], family.children[1]);
    let p1 = family.parent.main_task();

    family
        .kernel
        .exit_task(c1.main_task(), WaitStatus::exited(5))
        .unwrap();

    assert_eq!(family.kernel.process_table().process_count(), 3);
    let polled = family
        .kernel
        .waitpid(p1, WaitRequest::new(-1).with_status(Family::STATUS_SLOT));
    assert_eq!(polled, Ok(WaitPoll::Reaped(c1.main_task())));
    assert_eq!(family.status(), Ok(WaitStatus::exited(5).raw()));
    assert_eq!(family.kernel.process_table().process_count(), 2);
    assert_eq!(
        family.kernel.task_state(c2.main_task()),
        Some(TaskState::Runnable)
    );

    let again = family.kernel.waitpid(p1, WaitRequest::new(c1.as_raw()));
    assert_eq!(again, Err(KernelError::NoSuchChild));
}

/// Test: a group wait ignores zombies of other groups
///
/// Only C2 (group 7) is a zombie, so waiting on group 5 blocks, or
/// reports no change with WNOHANG.
#[test]
fn test_group_wait_ignores_other_groups() {
    let mut family = test_bootstrap(&[5, 7]).expect("bootstrap");
    let c2 = family.children[1];
    let p1 = family.parent.main_task();

    family
        .kernel
        .exit_task(c2.main_task(), WaitStatus::exited(0))
        .unwrap();

    let polled = family.kernel.waitpid(
        p1,
        WaitRequest::new(-5).with_options(WaitOptions::WNOHANG),
    );
    assert_eq!(polled, Ok(WaitPoll::NoChange));
    assert_eq!(
        family.kernel.task_state(c2.main_task()),
        Some(TaskState::Zombie)
    );

    let polled = family.kernel.waitpid(p1, WaitRequest::new(-5));
    assert_eq!(polled, Ok(WaitPoll::Blocked));
    assert_eq!(family.kernel.task_state(p1), Some(TaskState::Sleeping));
}

/// Test: a process without children gets ECHILD, blocking or not
#[test]
fn test_no_children_is_echild() {
    let mut family = test_bootstrap(&[]).expect("bootstrap");
    let p1 = family.parent.main_task();

    assert_eq!(family.kernel.sys_waitpid(p1, -1, None, 0), Some(-10));
    assert_eq!(family.kernel.sys_waitpid(p1, -1, None, 1), Some(-10));
}

/// Test: WNOHANG with a live child returns 0 and removes nothing
#[test]
fn test_wnohang_live_child_returns_zero() {
    let mut family = test_bootstrap(&[5]).expect("bootstrap");
    let c1 = family.children[0];
    let p1 = family.parent.main_task();

    assert_eq!(family.kernel.sys_waitpid(p1, c1.as_raw(), None, 1), Some(0));
    assert_eq!(
        family.kernel.process_table().children_of(family.parent),
        &[c1]
    );
}

/// Test: a waiter for group 5 is woken by a group 7 exit and sleeps again
///
/// Group-wide waiters are woken on any child exit; the wake is only a hint
/// and the re-run wait finds nothing to collect.
#[test]
fn test_spurious_wake_goes_back_to_sleep() {
    let mut family = test_bootstrap(&[5, 7]).expect("bootstrap");
    let (c1, c2) = (family.children[0], family.children[1]);
    let p1 = family.parent.main_task();

    family
        .kernel
        .waitpid(p1, WaitRequest::new(-5).with_status(Family::STATUS_SLOT))
        .unwrap();

    family
        .kernel
        .exit_task(c2.main_task(), WaitStatus::exited(7))
        .unwrap();
    assert!(family.kernel.run_until_idle().is_empty());
    assert_eq!(family.kernel.task_state(p1), Some(TaskState::Sleeping));
    assert_eq!(
        family.kernel.task_state(c2.main_task()),
        Some(TaskState::Zombie)
    );

    family
        .kernel
        .exit_task(c1.main_task(), WaitStatus::exited(5))
        .unwrap();
    assert_eq!(
        family.kernel.run_until_idle(),
        vec![(p1, Ok(WaitPoll::Reaped(c1.main_task())))]
    );
    assert_eq!(family.status(), Ok(WaitStatus::exited(5).raw()));

    let woken = family
        .kernel
        .scheduler()
        .audit_log()
        .iter()
        .filter(|event| matches!(event, ScheduleEvent::TaskWoken { tid, .. } if *tid == p1))
        .count();
    assert_eq!(woken, 2);
}

/// Test: an unwritable status location faults, but the child is gone
#[test]
fn test_bad_status_pointer_reaps_anyway() {
    let mut family = test_bootstrap(&[5]).expect("bootstrap");
    let c1 = family.children[0];
    let p1 = family.parent.main_task();

    family
        .kernel
        .exit_task(c1.main_task(), WaitStatus::signaled(9))
        .unwrap();

    let bad = UserAddr::new(0x4);
    assert_eq!(
        family.kernel.sys_waitpid(p1, -1, Some(bad), 0),
        Some(-14)
    );
    assert_eq!(family.kernel.task_state(c1.main_task()), None);
    assert_eq!(family.kernel.sys_waitpid(p1, -1, None, 0), Some(-10));
}

/// Test: pid 0 follows the caller's group at the time of the call
#[test]
fn test_pid_zero_uses_caller_group() {
    let mut family = test_bootstrap(&[5, 7]).expect("bootstrap");
    let (c1, c2) = (family.children[0], family.children[1]);
    let p1 = family.parent.main_task();

    family.kernel.set_pgid(family.parent, Pgid::new(7)).unwrap();
    family
        .kernel
        .exit_task(c1.main_task(), WaitStatus::exited(1))
        .unwrap();
    family
        .kernel
        .exit_task(c2.main_task(), WaitStatus::exited(2))
        .unwrap();

    assert_eq!(
        family.kernel.waitpid(p1, WaitRequest::new(0)),
        Ok(WaitPoll::Reaped(c2.main_task()))
    );
    assert_eq!(
        family.kernel.waitpid(p1, WaitRequest::new(0)),
        Err(KernelError::NoSuchChild)
    );
}

/// Test: the audit trail of a full wait cycle serializes
#[test]
fn test_audit_trail_round_trips_through_json() {
    let mut family = test_bootstrap(&[5]).expect("bootstrap");
    let c1 = family.children[0];
    let p1 = family.parent.main_task();

    family.kernel.waitpid(p1, WaitRequest::new(-1)).unwrap();
    family
        .kernel
        .exit_task(c1.main_task(), WaitStatus::exited(0))
        .unwrap();
    family.kernel.run_until_idle();

    let log = family.kernel.scheduler().audit_log();
    let json = serde_json::to_string(log).unwrap();
    let back: Vec<ScheduleEvent> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, log);

    let kinds: Vec<&str> = back
        .iter()
        .map(|event| match event {
            ScheduleEvent::TaskBlocked { .. } => "blocked",
            ScheduleEvent::TaskWoken { .. } => "woken",
            ScheduleEvent::TaskExited { .. } => "exited",
            ScheduleEvent::TaskSelected { .. } => "selected",
            ScheduleEvent::TaskReaped { .. } => "reaped",
            ScheduleEvent::TaskStopped { .. } => "stopped",
            ScheduleEvent::TaskContinued { .. } => "continued",
        })
        .collect();
    assert_eq!(kinds, vec!["blocked", "woken", "exited", "selected", "reaped"]);

    family.kernel.clear_audit_log();
    assert!(family.kernel.scheduler().audit_log().is_empty());
}
