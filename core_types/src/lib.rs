//! # Core Types
//!
//! This crate defines the fundamental types shared by every kernel crate.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: task, process and group ids are distinct
//!   types even though they live in one integer space.
//! - **Untrusted by construction**: user addresses are a newtype, not a
//!   raw integer, so they cannot be dereferenced by accident.
//!
//! ## Key Types
//!
//! - [`Tid`]: Identifier of a task
//! - [`Pid`]: Identifier of a process (tid of its main task)
//! - [`Pgid`]: Identifier of a process group
//! - [`UserAddr`]: Address inside a user address space

pub mod ids;
pub mod memory;

pub use ids::{Pgid, Pid, Tid};
pub use memory::{MemoryError, MemoryPerms, UserAddr};
