//! # User Memory Types
//!
//! Addresses handed to the kernel by user code, and the permissions of the
//! regions they may point into. A user address is never trusted: every copy
//! goes through the owning address space, which rejects unmapped or
//! read-only destinations.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An address in a user address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserAddr(u64);

impl UserAddr {
    /// Creates a user address from its raw value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the address `offset` bytes further, if it does not overflow
    pub fn checked_add(self, offset: u64) -> Option<Self> {
        self.0.checked_add(offset).map(Self)
    }
}

impl fmt::Display for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Memory permissions for a user region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryPerms {
    pub read: bool,
    pub write: bool,
}

impl MemoryPerms {
    /// Read-only permission
    pub fn read_only() -> Self {
        Self {
            read: true,
            write: false,
        }
    }

    /// Read and write permissions
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
        }
    }
}

impl fmt::Display for MemoryPerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            if self.read { "r" } else { "-" },
            if self.write { "w" } else { "-" }
        )
    }
}

/// Errors raised by user memory accesses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("Address {0} is not mapped")]
    Unmapped(UserAddr),

    #[error("Address {addr} is mapped {perms}, access denied")]
    PermissionDenied { addr: UserAddr, perms: MemoryPerms },

    #[error("Invalid region size: {0} bytes (must be > 0)")]
    InvalidRegionSize(u64),

    #[error("Region overlap detected")]
    RegionOverlap,
}

impl MemoryError {
    /// The faulting address, when the error is tied to one
    pub fn fault_addr(&self) -> Option<UserAddr> {
        match self {
            MemoryError::Unmapped(addr) => Some(*addr),
            MemoryError::PermissionDenied { addr, .. } => Some(*addr),
            MemoryError::InvalidRegionSize(_) | MemoryError::RegionOverlap => None,
        }
    }
}
