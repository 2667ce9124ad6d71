//! Preemption control for the simulated CPU
//!
//! The simulated kernel runs on one logical CPU. Scanning the task tree and
//! reaping a zombie must not be interleaved with another task's wait or
//! exit, so both run with preemption disabled. A [`PreemptGuard`] is the
//! proof that the holder is inside such a section; process table operations
//! that need one take it by reference.

use kernel_api::protocol_violation;
use std::cell::Cell;
use std::rc::Rc;

/// The logical CPU's preemption state
///
/// Disabling nests: preemption is enabled again only once every guard has
/// been dropped.
#[derive(Debug, Default)]
pub struct Cpu {
    disable_depth: Rc<Cell<u32>>,
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables preemption until the returned guard is dropped
    pub fn disable_preemption(&self) -> PreemptGuard {
        let depth = self.disable_depth.get();
        self.disable_depth.set(depth + 1);
        PreemptGuard {
            disable_depth: Rc::clone(&self.disable_depth),
        }
    }

    pub fn is_preemption_enabled(&self) -> bool {
        self.disable_depth.get() == 0
    }

    /// Number of live guards
    pub fn disable_depth(&self) -> u32 {
        self.disable_depth.get()
    }
}

/// RAII critical section on the simulated CPU
///
/// Not `Send`: a critical section belongs to the CPU that opened it.
#[must_use = "dropping a PreemptGuard immediately re-enables preemption"]
#[derive(Debug)]
pub struct PreemptGuard {
    disable_depth: Rc<Cell<u32>>,
}

impl Drop for PreemptGuard {
    fn drop(&mut self) {
        let depth = self.disable_depth.get();
        if depth == 0 {
            protocol_violation("preemption enabled more often than disabled");
        }
        self.disable_depth.set(depth - 1);
    }
}
