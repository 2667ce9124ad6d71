//! Identifiers for tasks, processes and process groups
//!
//! All three share the kernel's integer id space: a process is identified by
//! the tid of its main task, so `Pid(n).main_task() == Tid(n)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a single schedulable task (thread)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tid(i32);

impl Tid {
    /// Creates a task ID from its raw value
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Identifier of a process
///
/// Equal to the tid of the process' main task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pid(i32);

impl Pid {
    /// Creates a process ID from its raw value
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Returns the tid of the process' main task
    pub const fn main_task(self) -> Tid {
        Tid(self.0)
    }
}

impl From<Tid> for Pid {
    fn from(tid: Tid) -> Self {
        Self(tid.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

/// Identifier of a process group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pgid(i32);

impl Pgid {
    /// Creates a process group ID from its raw value
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// The group led by `pid`
    pub const fn led_by(pid: Pid) -> Self {
        Self(pid.0)
    }
}

impl fmt::Display for Pgid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_task_shares_process_id() {
        let pid = Pid::new(7);
        assert_eq!(pid.main_task(), Tid::new(7));
        assert_eq!(Pid::from(Tid::new(7)), pid);
    }

    #[test]
    fn test_group_led_by_process() {
        assert_eq!(Pgid::led_by(Pid::new(12)).as_raw(), 12);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Tid::new(3)), "Task(3)");
        assert_eq!(format!("{}", Pid::new(3)), "Process(3)");
        assert_eq!(format!("{}", Pgid::new(5)), "Group(5)");
    }

    #[test]
    fn test_serde_is_transparent_enough() {
        let json = serde_json::to_string(&Tid::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: Pgid = serde_json::from_str("9").unwrap();
        assert_eq!(back, Pgid::new(9));
    }
}
