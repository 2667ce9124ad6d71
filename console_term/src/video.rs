//! Video output seam
//!
//! The terminal keeps the authoritative cell buffer and mirrors every change
//! to a [`VideoOutput`]. Optional capabilities default to no-ops.

use alloc::sync::Arc;
use alloc::vec::Vec;

/// Rendering backend of the terminal
pub trait VideoOutput: Send {
    /// Draws one cell
    fn set_char_at(&mut self, row: usize, col: usize, entry: u16);

    /// Draws a full row of cells
    fn set_row(&mut self, row: usize, entries: &[u16], flush: bool);

    /// Blanks a row with `attr`
    fn clear_row(&mut self, row: usize, attr: u8);

    /// Places the hardware cursor
    fn move_cursor(&mut self, row: usize, col: usize, attr: u8);

    fn enable_cursor(&mut self);

    fn disable_cursor(&mut self);

    /// Shifts the screen up one row in hardware
    ///
    /// Returns `false` when unsupported; the terminal then redraws instead.
    fn scroll_one_line_up(&mut self) -> bool {
        false
    }

    fn flush_buffers(&mut self) {}

    fn redraw_static_elements(&mut self) {}

    fn disable_static_elems_refresh(&mut self) {}

    fn enable_static_elems_refresh(&mut self) {}
}

/// Output that discards everything; swapped in while video is paused
#[derive(Debug, Clone, Copy, Default)]
pub struct NullVideo;

impl VideoOutput for NullVideo {
    fn set_char_at(&mut self, _row: usize, _col: usize, _entry: u16) {}
    fn set_row(&mut self, _row: usize, _entries: &[u16], _flush: bool) {}
    fn clear_row(&mut self, _row: usize, _attr: u8) {}
    fn move_cursor(&mut self, _row: usize, _col: usize, _attr: u8) {}
    fn enable_cursor(&mut self) {}
    fn disable_cursor(&mut self) {}
}

/// A call received by a [`RecordingVideo`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoOp {
    SetChar { row: usize, col: usize, entry: u16 },
    SetRow { row: usize },
    ClearRow { row: usize, attr: u8 },
    MoveCursor { row: usize, col: usize },
    EnableCursor,
    DisableCursor,
    ScrollOneLineUp,
    Flush,
    RedrawStaticElements,
    DisableStaticRefresh,
    EnableStaticRefresh,
}

/// Output that records every call
///
/// Clones share one log, so a test keeps a clone and hands another to the
/// terminal.
#[derive(Debug, Clone, Default)]
pub struct RecordingVideo {
    ops: Arc<spin::Mutex<Vec<VideoOp>>>,
    hw_scroll: bool,
}

impl RecordingVideo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports hardware scrolling as supported
    pub fn with_hw_scroll(mut self) -> Self {
        self.hw_scroll = true;
        self
    }

    /// Calls recorded so far
    pub fn ops(&self) -> Vec<VideoOp> {
        self.ops.lock().clone()
    }

    /// Returns and forgets the recorded calls
    pub fn take_ops(&self) -> Vec<VideoOp> {
        core::mem::take(&mut *self.ops.lock())
    }

    fn record(&self, op: VideoOp) {
        self.ops.lock().push(op);
    }
}

impl VideoOutput for RecordingVideo {
    fn set_char_at(&mut self, row: usize, col: usize, entry: u16) {
        self.record(VideoOp::SetChar { row, col, entry });
    }

    fn set_row(&mut self, row: usize, _entries: &[u16], _flush: bool) {
        self.record(VideoOp::SetRow { row });
    }

    fn clear_row(&mut self, row: usize, attr: u8) {
        self.record(VideoOp::ClearRow { row, attr });
    }

    fn move_cursor(&mut self, row: usize, col: usize, _attr: u8) {
        self.record(VideoOp::MoveCursor { row, col });
    }

    fn enable_cursor(&mut self) {
        self.record(VideoOp::EnableCursor);
    }

    fn disable_cursor(&mut self) {
        self.record(VideoOp::DisableCursor);
    }

    fn scroll_one_line_up(&mut self) -> bool {
        if self.hw_scroll {
            self.record(VideoOp::ScrollOneLineUp);
        }
        self.hw_scroll
    }

    fn flush_buffers(&mut self) {
        self.record(VideoOp::Flush);
    }

    fn redraw_static_elements(&mut self) {
        self.record(VideoOp::RedrawStaticElements);
    }

    fn disable_static_elems_refresh(&mut self) {
        self.record(VideoOp::DisableStaticRefresh);
    }

    fn enable_static_elems_refresh(&mut self) {
        self.record(VideoOp::EnableStaticRefresh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_clones_share_log() {
        let video = RecordingVideo::new();
        let mut handle = video.clone();
        handle.enable_cursor();
        handle.set_char_at(1, 2, 0x0741);

        assert_eq!(
            video.take_ops(),
            vec![
                VideoOp::EnableCursor,
                VideoOp::SetChar {
                    row: 1,
                    col: 2,
                    entry: 0x0741
                }
            ]
        );
        assert!(video.ops().is_empty());
    }

    #[test]
    fn test_hw_scroll_capability() {
        let mut plain = RecordingVideo::new();
        assert!(!plain.scroll_one_line_up());
        assert!(plain.ops().is_empty());

        let mut hw = RecordingVideo::new().with_hw_scroll();
        assert!(hw.scroll_one_line_up());
        assert_eq!(hw.ops(), vec![VideoOp::ScrollOneLineUp]);
    }
}
