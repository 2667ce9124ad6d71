//! Terminal actions
//!
//! One variant per terminal operation. The variant's fields are its
//! arguments, so dispatch is an exhaustive match with nothing to look up.

use alloc::boxed::Box;

/// Longest text a single write action carries
pub const MAX_WRITE_LEN: usize = (1 << 20) - 1;

/// A deferred terminal operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermAction {
    /// Write text in the given color
    Write { text: Box<[u8]>, color: u8 },
    /// Scroll the view toward older rows
    ScrollUp(u32),
    /// Scroll the view toward newer rows
    ScrollDown(u32),
    /// Column that backspace cannot cross on the current row
    SetColOffset(u32),
    /// Move the cursor to an absolute position (clamped)
    MoveChAndCur { row: u32, col: u32 },
    /// Move the cursor relative to its position (clamped)
    MoveChAndCurRel { drow: i8, dcol: i8 },
    /// Clear screen, scrollback, tab stops; cursor home
    Reset,
    /// ED: 0 = to end, 1 = to cursor, 2 = screen, 3 = screen and scrollback
    EraseInDisplay(u8),
    /// EL: 0 = to end of line, 1 = to cursor, 2 = whole line
    EraseInLine(u8),
    /// Move visible rows up without touching the scrollback
    NonBufScrollUp(u32),
    /// Move visible rows down without touching the scrollback
    NonBufScrollDown(u32),
    /// Stop rendering until [`TermAction::RestartVideoOutput`]
    PauseVideoOutput,
    /// Resume rendering and redraw
    RestartVideoOutput,
}

impl TermAction {
    /// Builds a write action, clamping `text` to [`MAX_WRITE_LEN`] bytes
    pub fn write(text: &[u8], color: u8) -> Self {
        if text.len() > MAX_WRITE_LEN {
            log::warn!(
                "terminal write of {} bytes clamped to {}",
                text.len(),
                MAX_WRITE_LEN
            );
        }

        let len = text.len().min(MAX_WRITE_LEN);
        TermAction::Write {
            text: Box::from(&text[..len]),
            color,
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            TermAction::Write { .. } => "write",
            TermAction::ScrollUp(_) => "scroll_up",
            TermAction::ScrollDown(_) => "scroll_down",
            TermAction::SetColOffset(_) => "set_col_offset",
            TermAction::MoveChAndCur { .. } => "move_ch_and_cur",
            TermAction::MoveChAndCurRel { .. } => "move_ch_and_cur_rel",
            TermAction::Reset => "reset",
            TermAction::EraseInDisplay(_) => "erase_in_display",
            TermAction::EraseInLine(_) => "erase_in_line",
            TermAction::NonBufScrollUp(_) => "non_buf_scroll_up",
            TermAction::NonBufScrollDown(_) => "non_buf_scroll_down",
            TermAction::PauseVideoOutput => "pause_video_output",
            TermAction::RestartVideoOutput => "restart_video_output",
        }
    }
}
