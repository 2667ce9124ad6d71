//! Terminal producer API
//!
//! One entrypoint per action kind. Each builds a [`TermAction`] and hands it
//! to the deferred-action queue; safe to call from interrupt context.

use crate::actions::TermAction;
use crate::terminal::{TermFilter, Terminal};
use alloc::boxed::Box;
use safe_ringbuf::DeferredActionQueue;

/// Action slots of the default terminal queue
pub const DEFAULT_ACTION_SLOTS: usize = 32;

/// The terminal behind its deferred-action queue
///
/// Constructed once during kernel initialization and shared by reference
/// (typically from a static) with every producer.
pub struct Term<const N: usize = DEFAULT_ACTION_SLOTS> {
    queue: DeferredActionQueue<TermAction, Terminal, N>,
}

impl Term {
    /// Wraps `terminal` with the default queue size
    pub fn new(terminal: Terminal) -> Self {
        Self::with_queue_slots(terminal)
    }
}

impl<const N: usize> Term<N> {
    /// Wraps `terminal` with an `N`-slot queue
    pub fn with_queue_slots(terminal: Terminal) -> Self {
        Self {
            queue: DeferredActionQueue::new(terminal),
        }
    }

    pub fn write(&self, text: &[u8], color: u8) {
        self.submit(TermAction::write(text, color));
    }

    pub fn scroll_up(&self, lines: u32) {
        self.submit(TermAction::ScrollUp(lines));
    }

    pub fn scroll_down(&self, lines: u32) {
        self.submit(TermAction::ScrollDown(lines));
    }

    pub fn set_col_offset(&self, off: u32) {
        self.submit(TermAction::SetColOffset(off));
    }

    pub fn move_ch_and_cur(&self, row: u32, col: u32) {
        self.submit(TermAction::MoveChAndCur { row, col });
    }

    pub fn move_ch_and_cur_rel(&self, drow: i8, dcol: i8) {
        self.submit(TermAction::MoveChAndCurRel { drow, dcol });
    }

    pub fn reset(&self) {
        self.submit(TermAction::Reset);
    }

    pub fn erase_in_display(&self, mode: u8) {
        self.submit(TermAction::EraseInDisplay(mode));
    }

    pub fn erase_in_line(&self, mode: u8) {
        self.submit(TermAction::EraseInLine(mode));
    }

    pub fn non_buf_scroll_up(&self, n: u32) {
        self.submit(TermAction::NonBufScrollUp(n));
    }

    pub fn non_buf_scroll_down(&self, n: u32) {
        self.submit(TermAction::NonBufScrollDown(n));
    }

    pub fn pause_video_output(&self) {
        self.submit(TermAction::PauseVideoOutput);
    }

    pub fn restart_video_output(&self) {
        self.submit(TermAction::RestartVideoOutput);
    }

    /// Installs or removes the character filter
    ///
    /// Returns `false` if a drain is running; the filter is then unchanged.
    pub fn set_filter(&self, filter: Option<Box<dyn TermFilter>>) -> bool {
        self.queue
            .with_sink(move |terminal| terminal.set_filter(filter))
            .is_some()
    }

    /// Inspects the terminal outside of a drain
    pub fn with_terminal<R>(&self, f: impl FnOnce(&mut Terminal) -> R) -> Option<R> {
        self.queue.with_sink(f)
    }

    /// Actions lost to a full queue
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }

    fn submit(&self, action: TermAction) {
        // A full queue already logged and counted the drop.
        let _ = self.queue.enqueue(action);
    }
}
