//! `waitpid` request and result types
//!
//! These are the user-facing pieces of the wait interface: how the `pid`
//! argument selects children, the option bits, the encoded exit status and
//! the shape of a wait result before it is flattened to a syscall return.

use crate::KernelError;
use core_types::{Pgid, Pid, Tid, UserAddr};
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Option bits accepted by `waitpid`/`wait4`
    ///
    /// Unknown bits are ignored.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WaitOptions: u32 {
        /// Return immediately if no child has changed state
        const WNOHANG = 1;
    }
}

impl WaitOptions {
    /// Decodes raw option bits, dropping the ones without meaning
    pub fn from_raw(raw: u32) -> Self {
        Self::from_bits_truncate(raw)
    }
}

/// Which children a wait request applies to, decoded from its `pid`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitSelector {
    /// `pid > 0`: exactly that child
    Child(Pid),
    /// `pid < -1`: any child in group `-pid`
    Group(Pgid),
    /// `pid == 0`: any child in the caller's group
    CallerGroup,
    /// `pid == -1`: any child
    AnyChild,
}

impl WaitSelector {
    /// Decodes the `pid` argument of `waitpid`
    pub fn from_raw(pid: i32) -> Self {
        match pid {
            -1 => WaitSelector::AnyChild,
            0 => WaitSelector::CallerGroup,
            p if p > 0 => WaitSelector::Child(Pid::new(p)),
            // i32::MIN has no positive counterpart; it wraps to a negative
            // group id that no child can carry.
            p => WaitSelector::Group(Pgid::new(p.wrapping_neg())),
        }
    }

    /// Whether the child `child` (in group `child_pgid`) is selected for a
    /// caller in group `caller_pgid`
    pub fn matches(&self, child: Pid, child_pgid: Pgid, caller_pgid: Pgid) -> bool {
        match self {
            WaitSelector::Child(pid) => *pid == child,
            WaitSelector::Group(pgid) => *pgid == child_pgid,
            WaitSelector::CallerGroup => caller_pgid == child_pgid,
            WaitSelector::AnyChild => true,
        }
    }
}

/// Encoded exit status, as stored in a zombie and copied to `wstatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WaitStatus(i32);

impl WaitStatus {
    /// Normal exit with `code` (only the low 8 bits are kept)
    pub const fn exited(code: i32) -> Self {
        Self((code & 0xff) << 8)
    }

    /// Termination by signal `signum`
    pub const fn signaled(signum: i32) -> Self {
        Self(signum & 0x7f)
    }

    /// Wraps an already encoded status word
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the encoded status word
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// True if the task exited normally
    pub const fn is_exited(self) -> bool {
        self.0 & 0x7f == 0
    }

    /// The exit code of a normal exit
    pub const fn exit_code(self) -> Option<i32> {
        if self.is_exited() {
            Some((self.0 >> 8) & 0xff)
        } else {
            None
        }
    }

    /// The signal that terminated the task
    pub const fn term_signal(self) -> Option<i32> {
        if self.is_exited() {
            None
        } else {
            Some(self.0 & 0x7f)
        }
    }
}

/// Resource usage record written by `wait4`
///
/// Accounting is not tracked, so the kernel always reports zeroes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RUsage {
    pub utime_usec: i64,
    pub stime_usec: i64,
    pub maxrss_kb: i64,
    pub minflt: i64,
    pub majflt: i64,
    pub nvcsw: i64,
    pub nivcsw: i64,
}

impl RUsage {
    /// Size of the user-visible record in bytes
    pub const SIZE: usize = 7 * 8;

    /// Little-endian user-visible layout
    pub fn to_le_bytes(&self) -> [u8; Self::SIZE] {
        let fields = [
            self.utime_usec,
            self.stime_usec,
            self.maxrss_kb,
            self.minflt,
            self.majflt,
            self.nvcsw,
            self.nivcsw,
        ];
        let mut out = [0u8; Self::SIZE];
        for (chunk, field) in out.chunks_exact_mut(8).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        out
    }
}

/// A `waitpid` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitRequest {
    /// Raw `pid` argument, see [`WaitSelector::from_raw`]
    pub pid: i32,
    /// Where to store the child's exit status, if anywhere
    pub wstatus: Option<UserAddr>,
    pub options: WaitOptions,
}

impl WaitRequest {
    /// Creates a blocking request without status output
    pub fn new(pid: i32) -> Self {
        Self {
            pid,
            wstatus: None,
            options: WaitOptions::empty(),
        }
    }

    /// Stores the exit status at `addr`
    pub fn with_status(mut self, addr: UserAddr) -> Self {
        self.wstatus = Some(addr);
        self
    }

    /// Sets the option bits
    pub fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Decoded child selector
    pub fn selector(&self) -> WaitSelector {
        WaitSelector::from_raw(self.pid)
    }
}

/// Outcome of one pass of the wait loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPoll {
    /// A zombie child was reaped
    Reaped(Tid),
    /// `WNOHANG` and no child has changed state
    NoChange,
    /// The caller was put to sleep; the request resumes once it is woken
    Blocked,
}

/// Flattens a wait result to a syscall return value
///
/// Returns `None` while the caller is blocked.
pub fn wait_syscall_return(result: &Result<WaitPoll, KernelError>) -> Option<i64> {
    match result {
        Ok(WaitPoll::Reaped(tid)) => Some(tid.as_raw() as i64),
        Ok(WaitPoll::NoChange) => Some(0),
        Ok(WaitPoll::Blocked) => None,
        Err(err) => Some(err.to_syscall_return()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_decoding() {
        assert_eq!(WaitSelector::from_raw(-1), WaitSelector::AnyChild);
        assert_eq!(WaitSelector::from_raw(0), WaitSelector::CallerGroup);
        assert_eq!(WaitSelector::from_raw(42), WaitSelector::Child(Pid::new(42)));
        assert_eq!(WaitSelector::from_raw(-5), WaitSelector::Group(Pgid::new(5)));
    }

    #[test]
    fn test_selector_min_value_matches_nothing_positive() {
        let selector = WaitSelector::from_raw(i32::MIN);
        assert!(!selector.matches(Pid::new(3), Pgid::new(3), Pgid::new(1)));
    }

    #[test]
    fn test_selector_matching() {
        let caller_group = Pgid::new(1);
        let child = Pid::new(10);
        let group5 = Pgid::new(5);

        assert!(WaitSelector::AnyChild.matches(child, group5, caller_group));
        assert!(WaitSelector::Group(group5).matches(child, group5, caller_group));
        assert!(!WaitSelector::Group(Pgid::new(7)).matches(child, group5, caller_group));
        assert!(!WaitSelector::CallerGroup.matches(child, group5, caller_group));
        assert!(WaitSelector::CallerGroup.matches(child, caller_group, caller_group));
        assert!(WaitSelector::Child(child).matches(child, group5, caller_group));
        assert!(!WaitSelector::Child(Pid::new(11)).matches(child, group5, caller_group));
    }

    #[test]
    fn test_unknown_option_bits_ignored() {
        let opts = WaitOptions::from_raw(0x1 | 0x8000);
        assert_eq!(opts, WaitOptions::WNOHANG);
    }

    #[test]
    fn test_wait_status_encoding() {
        let status = WaitStatus::exited(3);
        assert_eq!(status.raw(), 0x300);
        assert!(status.is_exited());
        assert_eq!(status.exit_code(), Some(3));
        assert_eq!(status.term_signal(), None);

        let killed = WaitStatus::signaled(9);
        assert!(!killed.is_exited());
        assert_eq!(killed.term_signal(), Some(9));
        assert_eq!(killed.exit_code(), None);
    }

    #[test]
    fn test_exit_code_truncated_to_byte() {
        assert_eq!(WaitStatus::exited(257).exit_code(), Some(1));
    }

    #[test]
    fn test_rusage_layout_is_zeroed() {
        let bytes = RUsage::default().to_le_bytes();
        assert_eq!(bytes.len(), RUsage::SIZE);
        assert!(bytes.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_wait_syscall_return() {
        assert_eq!(wait_syscall_return(&Ok(WaitPoll::Reaped(Tid::new(9)))), Some(9));
        assert_eq!(wait_syscall_return(&Ok(WaitPoll::NoChange)), Some(0));
        assert_eq!(wait_syscall_return(&Ok(WaitPoll::Blocked)), None);
        assert_eq!(wait_syscall_return(&Err(KernelError::NoSuchChild)), Some(-10));
    }

    #[test]
    fn test_request_builder() {
        let req = WaitRequest::new(-1)
            .with_status(UserAddr::new(0x1000))
            .with_options(WaitOptions::WNOHANG);
        assert_eq!(req.selector(), WaitSelector::AnyChild);
        assert_eq!(req.wstatus, Some(UserAddr::new(0x1000)));
        assert!(req.options.contains(WaitOptions::WNOHANG));
    }
}
