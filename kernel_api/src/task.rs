//! Task states and wait objects

use core_types::{Pgid, Tid};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Ready to run (or running)
    Runnable,
    /// Blocked on a wait object
    Sleeping,
    /// Suspended by a stop request
    Stopped,
    /// Exited, exit status not collected yet
    Zombie,
}

/// What a sleeping task is blocked on
///
/// A task holds a wait object iff it is [`TaskState::Sleeping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaitObject {
    /// A state change of one specific task; the sleeper is linked on that
    /// task's waiting list
    Task(Tid),
    /// A state change of any child of the sleeper's process
    AnyChild,
    /// A state change of any child in the given group
    ChildInGroup(Pgid),
}

impl WaitObject {
    /// True for conditions covering more than one child
    ///
    /// Such sleepers are found through the parent relation rather than a
    /// waiting list when a child changes state.
    pub fn is_group_wide(&self) -> bool {
        matches!(self, WaitObject::AnyChild | WaitObject::ChildInGroup(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_wide_wait_objects() {
        assert!(WaitObject::AnyChild.is_group_wide());
        assert!(WaitObject::ChildInGroup(Pgid::new(5)).is_group_wide());
        assert!(!WaitObject::Task(Tid::new(3)).is_group_wide());
    }
}
