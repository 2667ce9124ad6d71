//! Lock-free ring buffer safe against reentrant producers.
//!
//! ## Protocol
//!
//! The whole state (`read_pos`, `write_pos`, `full`) is one atomic word.
//! A producer loads it, computes the state after claiming the slot at
//! `write_pos`, and publishes that with a compare-and-swap, retrying when a
//! nested producer got there first. Only after its CAS succeeds does it move
//! the element into the claimed slot: no other producer can claim the same
//! index, so the late copy is race-free.
//!
//! Each slot also carries a published flag, set once the element is in
//! place. The consumer takes the element at `read_pos` only when its slot is
//! published, then advances `read_pos` (clearing `full`) with the same CAS
//! loop, racing only against producers.
//!
//! ## Limits
//!
//! - One consumer at a time, which is why [`SafeRingBuf::read`] is unsafe.
//!   [`SafeRingBuf::pop`] is the safe form for an owner with `&mut`.
//!   Producers may nest (interrupt handlers) on one
//!   logical CPU; this is not a general multi-core MPMC queue.
//! - A write into a full buffer fails without blocking and hands the element
//!   back. Callers bound the number of concurrent producers (e.g. by the
//!   interrupt nesting depth) so this stays rare.
//! - Debug builds halt if a read runs while a write on the same buffer is
//!   still in flight, which can only happen if a read interrupted a write.

use crate::loom::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use crate::state::{RingState, MAX_CAPACITY};
use core::cell::UnsafeCell;
use core::fmt;
use core::mem::MaybeUninit;

/// Result of a successful write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Written {
    /// The buffer was empty right before this write
    ///
    /// Exactly one write per empty-to-non-empty transition sees `true`, so
    /// exactly one caller takes responsibility for draining.
    pub was_empty: bool,
}

/// Fixed-capacity ring buffer with a packed atomic state word
///
/// The capacity `N` must be in `1..=32768`.
pub struct SafeRingBuf<T, const N: usize> {
    state: AtomicU32,
    slots: [UnsafeCell<MaybeUninit<T>>; N],
    published: [AtomicBool; N],
    #[cfg(debug_assertions)]
    nested_writes: AtomicU32,
}

// SAFETY: a slot is written only by the producer whose CAS claimed it and
// read only after its published flag is set. `read` is unsafe and requires
// a single consumer; every other shared method only touches atomics.
unsafe impl<T: Send, const N: usize> Sync for SafeRingBuf<T, N> {}

impl<T, const N: usize> SafeRingBuf<T, N> {
    const CAPACITY_OK: () = assert!(
        N > 0 && N <= MAX_CAPACITY,
        "ring buffer capacity must be in 1..=32768"
    );

    /// Creates an empty buffer
    #[cfg(not(loom))]
    pub const fn new() -> Self {
        let () = Self::CAPACITY_OK;
        Self {
            state: AtomicU32::new(RingState::EMPTY.raw()),
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            published: [const { AtomicBool::new(false) }; N],
            #[cfg(debug_assertions)]
            nested_writes: AtomicU32::new(0),
        }
    }

    /// Creates an empty buffer
    #[cfg(loom)]
    pub fn new() -> Self {
        let () = Self::CAPACITY_OK;
        Self {
            state: AtomicU32::new(RingState::EMPTY.raw()),
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            published: core::array::from_fn(|_| AtomicBool::new(false)),
            #[cfg(debug_assertions)]
            nested_writes: AtomicU32::new(0),
        }
    }

    /// Number of slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of queued elements
    pub fn len(&self) -> usize {
        self.load_state().len(N)
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.load_state().is_empty()
    }

    /// True when every slot is taken
    pub fn is_full(&self) -> bool {
        self.load_state().is_full()
    }

    /// Appends `elem`, or hands it back if the buffer is full
    ///
    /// Safe to call from a context that interrupted another `write`.
    pub fn write(&self, elem: T) -> Result<Written, T> {
        let _in_flight = self.begin_write();
        let mut current = self.load_state();

        loop {
            if current.is_full() {
                return Err(elem);
            }

            let next = current.after_write(N);

            match self.state.compare_exchange_weak(
                current.raw(),
                next.raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = RingState::from_raw(actual),
            }
        }

        let slot = current.write_pos();
        // SAFETY: the CAS moved write_pos past this index, so no other
        // producer can claim it, and the consumer leaves it alone until the
        // published flag below is set.
        unsafe {
            (*self.slots[slot].get()).write(elem);
        }
        self.published[slot].store(true, Ordering::Release);

        Ok(Written {
            was_empty: current.is_empty(),
        })
    }

    /// Removes the oldest element
    ///
    /// Returns `None` when the buffer is empty, or when the oldest slot was
    /// claimed by a write that has not stored its element yet.
    ///
    /// # Safety
    ///
    /// Single consumer: no other `read` on this buffer may run at the same
    /// time, whether on another thread or in a context this call
    /// interrupted. Writes may run concurrently.
    ///
    /// ```
    /// use safe_ringbuf::SafeRingBuf;
    ///
    /// let ring = SafeRingBuf::<u32, 4>::new();
    /// ring.write(7).unwrap();
    /// // SAFETY: this thread is the only consumer.
    /// assert_eq!(unsafe { ring.read() }, Some(7));
    /// ```
    ///
    /// Shared access alone is not enough to consume:
    ///
    /// ```compile_fail
    /// let ring = safe_ringbuf::SafeRingBuf::<u32, 4>::new();
    /// ring.read();
    /// ```
    pub unsafe fn read(&self) -> Option<T> {
        self.check_no_write_in_flight();

        let mut current = self.load_state();
        if current.is_empty() {
            return None;
        }

        let slot = current.read_pos();
        if !self.published[slot].load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: the slot is published, so its producer has finished
        // writing it, and the caller guarantees no other consumer takes it.
        let elem = unsafe { (*self.slots[slot].get()).assume_init_read() };
        self.published[slot].store(false, Ordering::Relaxed);

        loop {
            let next = current.after_read(N);

            match self.state.compare_exchange_weak(
                current.raw(),
                next.raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(elem),
                Err(actual) => current = RingState::from_raw(actual),
            }
        }
    }

    /// Removes the oldest element through exclusive access
    pub fn pop(&mut self) -> Option<T> {
        // SAFETY: `&mut self` rules out any other reader.
        unsafe { self.read() }
    }

    /// Drops every queued element and returns the buffer to its initial state
    pub fn reset(&mut self) {
        while self.pop().is_some() {}
        self.state.store(RingState::EMPTY.raw(), Ordering::Release);
    }

    fn load_state(&self) -> RingState {
        RingState::from_raw(self.state.load(Ordering::Acquire))
    }

    fn begin_write(&self) -> WriteInFlight<'_, T, N> {
        #[cfg(debug_assertions)]
        self.nested_writes.fetch_add(1, Ordering::Relaxed);
        WriteInFlight { ring: self }
    }

    fn check_no_write_in_flight(&self) {
        #[cfg(debug_assertions)]
        if self.nested_writes.load(Ordering::Relaxed) != 0 {
            log::error!("safe ring buffer: read interrupted an in-flight write");
            panic!("read from safe ring buffer interrupted an in-flight write");
        }
    }
}

#[cfg(not(loom))]
impl<T, const N: usize> Default for SafeRingBuf<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Drop for SafeRingBuf<T, N> {
    fn drop(&mut self) {
        if core::mem::needs_drop::<T>() {
            while self.pop().is_some() {}
        }
    }
}

impl<T, const N: usize> fmt::Debug for SafeRingBuf<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.load_state();
        f.debug_struct("SafeRingBuf")
            .field("capacity", &N)
            .field("len", &state.len(N))
            .field("read_pos", &state.read_pos())
            .field("write_pos", &state.write_pos())
            .field("full", &state.is_full())
            .finish()
    }
}

/// Marks a write as in flight for the debug reentrancy check
struct WriteInFlight<'a, T, const N: usize> {
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    ring: &'a SafeRingBuf<T, N>,
}

impl<T, const N: usize> Drop for WriteInFlight<'_, T, N> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.ring.nested_writes.fetch_sub(1, Ordering::Relaxed);
    }
}
