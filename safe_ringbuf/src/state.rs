//! Packed ring buffer state word
//!
//! `read_pos`, `write_pos` and `full` live in one `u32` so that a single
//! compare-and-swap publishes all three together:
//!
//! ```text
//!  31  30   29 ........ 15   14 ......... 0
//! [ 0 |full| write_pos (15) | read_pos (15) ]
//! ```

/// Largest supported capacity; positions must fit in 15 bits.
pub const MAX_CAPACITY: usize = 1 << POS_BITS;

const POS_BITS: u32 = 15;
const POS_MASK: u32 = (1 << POS_BITS) - 1;
const WRITE_SHIFT: u32 = POS_BITS;
const FULL_BIT: u32 = 1 << (2 * POS_BITS);

/// Snapshot of the packed state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct RingState(u32);

impl RingState {
    pub(crate) const EMPTY: RingState = RingState(0);

    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub(crate) const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) const fn read_pos(self) -> usize {
        (self.0 & POS_MASK) as usize
    }

    pub(crate) const fn write_pos(self) -> usize {
        ((self.0 >> WRITE_SHIFT) & POS_MASK) as usize
    }

    pub(crate) const fn is_full(self) -> bool {
        self.0 & FULL_BIT != 0
    }

    pub(crate) const fn is_empty(self) -> bool {
        self.read_pos() == self.write_pos() && !self.is_full()
    }

    /// Number of queued elements for a buffer of `capacity` slots
    pub(crate) const fn len(self, capacity: usize) -> usize {
        if self.is_full() {
            capacity
        } else if self.write_pos() >= self.read_pos() {
            self.write_pos() - self.read_pos()
        } else {
            capacity - self.read_pos() + self.write_pos()
        }
    }

    /// State after claiming the slot at `write_pos`
    pub(crate) const fn after_write(self, capacity: usize) -> Self {
        let write_pos = (self.write_pos() + 1) % capacity;
        let mut raw = (self.0 & !(POS_MASK << WRITE_SHIFT)) | ((write_pos as u32) << WRITE_SHIFT);
        if write_pos == self.read_pos() {
            raw |= FULL_BIT;
        }
        Self(raw)
    }

    /// State after consuming the slot at `read_pos`
    pub(crate) const fn after_read(self, capacity: usize) -> Self {
        let read_pos = (self.read_pos() + 1) % capacity;
        Self((self.0 & !POS_MASK & !FULL_BIT) | read_pos as u32)
    }
}
