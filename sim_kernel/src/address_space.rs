//! Address space management for SimulatedKernel
//!
//! This module implements per-process user memory, providing the
//! validation a real kernel's `copy_to_user` performs without an MMU.
//! Every process owns one address space; its threads share it.

use core_types::{MemoryError, MemoryPerms, Pid, UserAddr};
use kernel_api::KernelError;
use std::collections::HashMap;

/// A contiguous mapped range of user memory
#[derive(Debug, Clone)]
struct Region {
    start: u64,
    perms: MemoryPerms,
    bytes: Vec<u8>,
}

impl Region {
    fn end(&self) -> u64 {
        self.start + self.bytes.len() as u64
    }

    /// Offset of `[addr, addr + len)` inside this region
    fn offset_of(&self, addr: u64, len: usize) -> Option<usize> {
        let end = addr.checked_add(len as u64)?;
        if addr >= self.start && end <= self.end() {
            Some((addr - self.start) as usize)
        } else {
            None
        }
    }
}

/// The user memory of one process
#[derive(Debug, Clone, Default)]
pub struct UserAddressSpace {
    regions: Vec<Region>,
}

impl UserAddressSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `len` zeroed bytes at `start`
    pub fn map(&mut self, start: UserAddr, len: u64, perms: MemoryPerms) -> Result<(), MemoryError> {
        let start = start.as_u64();
        let end = match start.checked_add(len) {
            Some(end) if len > 0 => end,
            _ => return Err(MemoryError::InvalidRegionSize(len)),
        };

        if self
            .regions
            .iter()
            .any(|region| start < region.end() && region.start < end)
        {
            return Err(MemoryError::RegionOverlap);
        }

        self.regions.push(Region {
            start,
            perms,
            bytes: vec![0; len as usize],
        });
        Ok(())
    }

    /// Copies `data` to `addr`; the whole range must lie in one writable
    /// region
    pub fn write(&mut self, addr: UserAddr, data: &[u8]) -> Result<(), MemoryError> {
        let (region, offset) = self.region_mut(addr, data.len())?;
        if !region.perms.write {
            return Err(MemoryError::PermissionDenied {
                addr,
                perms: region.perms,
            });
        }
        region.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Reads `len` bytes at `addr`
    pub fn read(&self, addr: UserAddr, len: usize) -> Result<Vec<u8>, MemoryError> {
        let region = self
            .regions
            .iter()
            .find(|region| region.offset_of(addr.as_u64(), len).is_some())
            .ok_or(MemoryError::Unmapped(addr))?;
        if !region.perms.read {
            return Err(MemoryError::PermissionDenied {
                addr,
                perms: region.perms,
            });
        }
        let offset = (addr.as_u64() - region.start) as usize;
        Ok(region.bytes[offset..offset + len].to_vec())
    }

    fn region_mut(&mut self, addr: UserAddr, len: usize) -> Result<(&mut Region, usize), MemoryError> {
        self.regions
            .iter_mut()
            .find_map(|region| {
                let offset = region.offset_of(addr.as_u64(), len)?;
                Some((region, offset))
            })
            .ok_or(MemoryError::Unmapped(addr))
    }
}

/// Address space manager for SimulatedKernel
///
/// Maps each live process to its user memory. Failed accesses surface as
/// [`KernelError::BadUserPointer`], the way a faulting `copy_to_user` does.
#[derive(Debug, Default)]
pub struct AddressSpaceManager {
    spaces: HashMap<Pid, UserAddressSpace>,
}

impl AddressSpaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty address space for a new process
    pub fn create_address_space(&mut self, pid: Pid) {
        self.spaces.insert(pid, UserAddressSpace::new());
    }

    /// Drops the address space of a reaped process
    pub fn destroy_address_space(&mut self, pid: Pid) {
        self.spaces.remove(&pid);
    }

    /// Maps a region into the address space of `pid`
    pub fn map(
        &mut self,
        pid: Pid,
        start: UserAddr,
        len: u64,
        perms: MemoryPerms,
    ) -> Result<(), KernelError> {
        self.spaces
            .get_mut(&pid)
            .ok_or(KernelError::NoSuchProcess(pid))?
            .map(start, len, perms)
            .map_err(KernelError::InvalidMapping)
    }

    /// Copies `data` into the memory of `pid`
    pub fn copy_to_user(&mut self, pid: Pid, addr: UserAddr, data: &[u8]) -> Result<(), KernelError> {
        let space = self
            .spaces
            .get_mut(&pid)
            .ok_or(KernelError::BadUserPointer(addr))?;
        space.write(addr, data).map_err(|err| {
            log::debug!("copy_to_user for {} failed: {}", pid, err);
            KernelError::BadUserPointer(addr)
        })
    }

    /// Copies `len` bytes out of the memory of `pid`
    pub fn copy_from_user(&self, pid: Pid, addr: UserAddr, len: usize) -> Result<Vec<u8>, KernelError> {
        self.spaces
            .get(&pid)
            .ok_or(KernelError::BadUserPointer(addr))?
            .read(addr, len)
            .map_err(|_| KernelError::BadUserPointer(addr))
    }
}
