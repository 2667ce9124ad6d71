//! Terminal state and action handlers
//!
//! The [`Terminal`] is the consumer side of the deferred-action queue: it is
//! only ever touched by the drain that owns the queue's sink.
//!
//! ## Buffer layout
//!
//! Cells live in a ring of `rows + extra_rows` rows. Screen row `r` maps to
//! buffer row `(r + scroll) % total_rows`. `max_scroll` grows by one each
//! time output scrolls the screen; the view can be scrolled back up to
//! `extra_rows` rows behind it.

use crate::actions::TermAction;
use crate::video::{NullVideo, VideoOutput};
use crate::{entry_attr, entry_char, make_entry, TermConfig, DEFAULT_ATTR};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use safe_ringbuf::ActionSink;

const ESC: u8 = 0x1b;
const BELL: u8 = 0x07;
const VTAB: u8 = 0x0b;
const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;
const WERASE: u8 = 0x17;
const KILL: u8 = 0x15;

/// What a [`TermFilter`] decided for one character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Write the character
    pub emit: bool,
    /// Action executed right after the character, within the current drain
    pub action: Option<TermAction>,
}

impl FilterOutcome {
    /// Write the character unchanged
    pub fn emit() -> Self {
        Self {
            emit: true,
            action: None,
        }
    }

    /// Swallow the character
    pub fn suppress() -> Self {
        Self {
            emit: false,
            action: None,
        }
    }

    /// Also execute `action`
    pub fn then(mut self, action: TermAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// Per-character hook consulted by the write handler
///
/// The filter may change `color`; the change sticks for the rest of the
/// write.
pub trait TermFilter: Send {
    fn filter(&mut self, ch: u8, color: &mut u8) -> FilterOutcome;
}

/// Screen state of the text terminal
pub struct Terminal {
    config: TermConfig,
    rows: usize,
    cols: usize,
    extra_rows: usize,
    total_rows: usize,
    row: usize,
    col: usize,
    col_offset: usize,
    scroll: usize,
    max_scroll: usize,
    buffer: Vec<u16>,
    /// Width of the tab ending at each screen cell, 0 if none
    tabs: Vec<usize>,
    video: Box<dyn VideoOutput>,
    saved_video: Option<Box<dyn VideoOutput>>,
    filter: Option<Box<dyn TermFilter>>,
}

impl Terminal {
    /// Creates a cleared terminal rendering to `video`
    pub fn new(config: TermConfig, video: Box<dyn VideoOutput>) -> Self {
        let config = config.sanitized();
        let rows = config.rows;
        let cols = config.cols;
        let extra_rows = config.extra_rows();
        let total_rows = rows + extra_rows;

        let mut term = Self {
            config,
            rows,
            cols,
            extra_rows,
            total_rows,
            row: 0,
            col: 0,
            col_offset: 0,
            scroll: 0,
            max_scroll: 0,
            buffer: vec![make_entry(b' ', DEFAULT_ATTR); total_rows * cols],
            tabs: vec![0; rows * cols],
            video,
            saved_video: None,
            filter: None,
        };

        term.video.enable_cursor();
        term.move_ch_and_cur(0, 0);
        for row in 0..rows {
            term.clear_row(row, DEFAULT_ATTR);
        }

        log::debug!(
            "terminal initialized: {}x{}, {} scrollback rows",
            cols,
            rows,
            extra_rows
        );
        term
    }

    pub fn config(&self) -> &TermConfig {
        &self.config
    }

    /// Cursor position as `(row, col)`
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn col_offset(&self) -> usize {
        self.col_offset
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn max_scroll(&self) -> usize {
        self.max_scroll
    }

    /// True when the view shows the newest rows
    pub fn is_at_bottom(&self) -> bool {
        self.scroll == self.max_scroll
    }

    pub fn is_video_paused(&self) -> bool {
        self.saved_video.is_some()
    }

    /// Cell at a screen position, as currently scrolled
    pub fn entry_at(&self, row: usize, col: usize) -> u16 {
        self.buffer[self.index(row, col)]
    }

    /// Characters of a screen row with trailing blanks removed
    pub fn row_text(&self, row: usize) -> String {
        let start = self.index(row, 0);
        let text: String = self.buffer[start..start + self.cols]
            .iter()
            .map(|e| entry_char(*e) as char)
            .collect();
        String::from(text.trim_end())
    }

    /// Installs or removes the per-character filter
    pub fn set_filter(&mut self, filter: Option<Box<dyn TermFilter>>) {
        self.filter = filter;
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    fn index(&self, row: usize, col: usize) -> usize {
        (row + self.scroll) % self.total_rows * self.cols + col
    }

    fn set_entry(&mut self, row: usize, col: usize, entry: u16) {
        let idx = self.index(row, col);
        self.buffer[idx] = entry;
    }

    fn put_entry(&mut self, row: usize, col: usize, entry: u16) {
        self.set_entry(row, col, entry);
        self.video.set_char_at(row, col, entry);
    }

    fn cursor_attr(&self) -> u8 {
        entry_attr(self.entry_at(self.row, self.col))
    }

    fn sync_cursor(&mut self) {
        let attr = self.cursor_attr();
        self.video.move_cursor(self.row, self.col, attr);
        self.video.flush_buffers();
    }

    fn redraw(&mut self) {
        for row in 0..self.rows {
            let start = self.index(row, 0);
            self.video
                .set_row(row, &self.buffer[start..start + self.cols], true);
        }
    }

    fn set_scroll(&mut self, requested: usize) {
        let min_scroll = self.max_scroll.saturating_sub(self.extra_rows);
        let requested = requested.clamp(min_scroll, self.max_scroll);

        if requested == self.scroll {
            return;
        }

        self.scroll = requested;
        self.redraw();
    }

    fn scroll_to_bottom(&mut self) {
        if self.scroll != self.max_scroll {
            self.set_scroll(self.max_scroll);
        }
    }

    fn buf_clear_row(&mut self, row: usize, attr: u8) {
        let start = self.index(row, 0);
        let cols = self.cols;
        self.buffer[start..start + cols].fill(make_entry(b' ', attr));
    }

    fn clear_row(&mut self, row: usize, attr: u8) {
        self.buf_clear_row(row, attr);
        self.video.clear_row(row, attr);
    }

    fn scroll_up(&mut self, lines: usize) {
        self.set_scroll(self.scroll.saturating_sub(lines));

        if self.is_at_bottom() {
            self.video.enable_cursor();
            let attr = self.cursor_attr();
            self.video.move_cursor(self.row, self.col, attr);
        } else {
            self.video.disable_cursor();
        }

        self.video.flush_buffers();
    }

    fn scroll_down(&mut self, lines: usize) {
        self.set_scroll(self.scroll.saturating_add(lines));

        if self.is_at_bottom() {
            self.video.enable_cursor();
            let attr = self.cursor_attr();
            self.video.move_cursor(self.row, self.col, attr);
        }

        self.video.flush_buffers();
    }

    fn incr_row(&mut self, attr: u8) {
        self.col_offset = 0;

        if self.row < self.rows - 1 {
            self.row += 1;
            return;
        }

        self.max_scroll += 1;

        if self.video.scroll_one_line_up() {
            self.scroll += 1;
        } else {
            self.set_scroll(self.max_scroll);
        }

        // Tab stops belong to screen rows; shift them with the text.
        let cols = self.cols;
        self.tabs.copy_within(cols.., 0);
        let last = (self.rows - 1) * cols;
        self.tabs[last..].fill(0);

        self.clear_row(self.rows - 1, attr);
    }

    fn write_printable(&mut self, ch: u8, attr: u8) {
        self.put_entry(self.row, self.col, make_entry(ch, attr));
        self.col += 1;
    }

    fn write_tab(&mut self) {
        let tab_size = self.config.tab_size;
        let next = (self.col / tab_size + 1) * tab_size;
        let stop = next.min(self.cols - 1);

        if stop <= self.col {
            return;
        }

        self.tabs[self.row * self.cols + stop - 1] = stop - self.col;
        self.col = stop;
    }

    fn write_backspace(&mut self, attr: u8) {
        if self.col == 0 || self.col <= self.col_offset {
            return;
        }

        self.col -= 1;
        let tab_idx = self.row * self.cols + self.col;
        let width = self.tabs[tab_idx];

        if width == 0 {
            self.put_entry(self.row, self.col, make_entry(b' ', attr));
            return;
        }

        // Backspace over the end of a tab removes the whole tab.
        self.tabs[tab_idx] = 0;
        self.col = (self.col + 1 - width).max(self.col_offset);
    }

    fn write_char(&mut self, ch: u8, attr: u8) {
        match ch {
            ESC | BELL | VTAB | WERASE | KILL => {}
            b'\n' => self.incr_row(attr),
            b'\r' => self.col = 0,
            b'\t' => self.write_tab(),
            BACKSPACE | DELETE => self.write_backspace(attr),
            _ => {
                self.write_printable(ch, attr);

                if self.col == self.cols {
                    self.col = 0;
                    self.incr_row(attr);
                }
            }
        }
    }

    fn write(&mut self, text: &[u8], mut color: u8) {
        self.scroll_to_bottom();
        self.video.enable_cursor();

        for &ch in text {
            match self.filter.as_mut() {
                Some(filter) => {
                    let outcome = filter.filter(ch, &mut color);

                    if outcome.emit {
                        self.write_char(ch, color);
                    }

                    if let Some(action) = outcome.action {
                        self.execute(action);
                    }
                }
                None => self.write_char(ch, color),
            }
        }

        self.sync_cursor();
    }

    fn move_ch_and_cur(&mut self, row: u32, col: u32) {
        self.row = (row as usize).min(self.rows - 1);
        self.col = (col as usize).min(self.cols - 1);
        self.sync_cursor();
    }

    fn move_ch_and_cur_rel(&mut self, drow: i8, dcol: i8) {
        let row = self.row as isize + drow as isize;
        let col = self.col as isize + dcol as isize;
        self.row = row.clamp(0, self.rows as isize - 1) as usize;
        self.col = col.clamp(0, self.cols as isize - 1) as usize;
        self.sync_cursor();
    }

    fn reset(&mut self) {
        self.video.enable_cursor();
        self.scroll = 0;
        self.max_scroll = 0;
        self.move_ch_and_cur(0, 0);

        for row in 0..self.rows {
            self.clear_row(row, DEFAULT_ATTR);
        }

        self.tabs.fill(0);
    }

    fn erase_in_display(&mut self, mode: u8) {
        let blank = make_entry(b' ', DEFAULT_ATTR);

        match mode {
            0 => {
                for col in self.col..self.cols {
                    self.put_entry(self.row, col, blank);
                }
                for row in self.row + 1..self.rows {
                    self.clear_row(row, DEFAULT_ATTR);
                }
            }
            1 => {
                for row in 0..self.row {
                    self.clear_row(row, DEFAULT_ATTR);
                }
                for col in 0..self.col {
                    self.put_entry(self.row, col, blank);
                }
            }
            2 => {
                for row in 0..self.rows {
                    self.clear_row(row, DEFAULT_ATTR);
                }
            }
            3 => {
                let (row, col) = (self.row, self.col);
                self.reset();
                self.move_ch_and_cur(row as u32, col as u32);
            }
            _ => return,
        }

        self.video.flush_buffers();
    }

    fn erase_in_line(&mut self, mode: u8) {
        let blank = make_entry(b' ', DEFAULT_ATTR);

        match mode {
            0 => {
                for col in self.col..self.cols {
                    self.put_entry(self.row, col, blank);
                }
            }
            1 => {
                for col in 0..self.col {
                    self.put_entry(self.row, col, blank);
                }
            }
            2 => self.clear_row(self.row, DEFAULT_ATTR),
            _ => return,
        }

        self.video.flush_buffers();
    }

    fn non_buf_scroll_up(&mut self, n: usize) {
        if n == 0 {
            return;
        }

        let n = n.min(self.rows);
        let cols = self.cols;

        for row in 0..self.rows - n {
            let src = self.index(row + n, 0);
            let dst = self.index(row, 0);
            self.buffer.copy_within(src..src + cols, dst);
        }

        for row in self.rows - n..self.rows {
            self.buf_clear_row(row, DEFAULT_ATTR);
        }

        self.redraw();
    }

    fn non_buf_scroll_down(&mut self, n: usize) {
        if n == 0 {
            return;
        }

        let n = n.min(self.rows);
        let cols = self.cols;

        for row in (0..self.rows - n).rev() {
            let src = self.index(row, 0);
            let dst = self.index(row + n, 0);
            self.buffer.copy_within(src..src + cols, dst);
        }

        for row in 0..n {
            self.buf_clear_row(row, DEFAULT_ATTR);
        }

        self.redraw();
    }

    fn pause_video_output(&mut self) {
        if self.saved_video.is_some() {
            log::debug!("terminal video already paused");
            return;
        }

        self.video.disable_static_elems_refresh();
        self.video.disable_cursor();
        let video = core::mem::replace(&mut self.video, Box::new(NullVideo));
        self.saved_video = Some(video);
    }

    fn restart_video_output(&mut self) {
        let Some(video) = self.saved_video.take() else {
            log::debug!("terminal video not paused");
            return;
        };

        self.video = video;
        self.redraw();
        self.video.enable_cursor();
        self.video.redraw_static_elements();
        self.video.enable_static_elems_refresh();
    }
}

impl ActionSink<TermAction> for Terminal {
    fn execute(&mut self, action: TermAction) {
        log::trace!("terminal action: {}", action.kind());

        match action {
            TermAction::Write { text, color } => self.write(&text, color),
            TermAction::ScrollUp(lines) => self.scroll_up(lines as usize),
            TermAction::ScrollDown(lines) => self.scroll_down(lines as usize),
            TermAction::SetColOffset(off) => self.col_offset = off as usize,
            TermAction::MoveChAndCur { row, col } => self.move_ch_and_cur(row, col),
            TermAction::MoveChAndCurRel { drow, dcol } => self.move_ch_and_cur_rel(drow, dcol),
            TermAction::Reset => self.reset(),
            TermAction::EraseInDisplay(mode) => self.erase_in_display(mode),
            TermAction::EraseInLine(mode) => self.erase_in_line(mode),
            TermAction::NonBufScrollUp(n) => self.non_buf_scroll_up(n as usize),
            TermAction::NonBufScrollDown(n) => self.non_buf_scroll_down(n as usize),
            TermAction::PauseVideoOutput => self.pause_video_output(),
            TermAction::RestartVideoOutput => self.restart_video_output(),
        }
    }
}

impl core::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Terminal")
            .field("config", &self.config)
            .field("cursor", &(self.row, self.col))
            .field("scroll", &self.scroll)
            .field("max_scroll", &self.max_scroll)
            .field("paused", &self.is_video_paused())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{RecordingVideo, VideoOp};

    fn small_config() -> TermConfig {
        TermConfig {
            rows: 3,
            cols: 10,
            tab_size: 4,
            scrollback_pages: 1,
        }
    }

    fn terminal() -> (Terminal, RecordingVideo) {
        let video = RecordingVideo::new();
        let term = Terminal::new(small_config(), Box::new(video.clone()));
        video.take_ops();
        (term, video)
    }

    fn write(term: &mut Terminal, text: &str) {
        term.execute(TermAction::write(text.as_bytes(), DEFAULT_ATTR));
    }

    /// Writes with `\n` expanded to `\r\n`, as the tty layer does
    fn print(term: &mut Terminal, text: &str) {
        write(term, &text.replace('\n', "\r\n"));
    }

    #[test]
    fn test_new_terminal_is_blank() {
        let video = RecordingVideo::new();
        let term = Terminal::new(small_config(), Box::new(video.clone()));
        assert_eq!(term.cursor(), (0, 0));
        assert_eq!(term.row_text(0), "");
        assert_eq!(term.entry_at(2, 9), make_entry(b' ', DEFAULT_ATTR));

        let clears = video
            .ops()
            .iter()
            .filter(|op| matches!(op, VideoOp::ClearRow { .. }))
            .count();
        assert_eq!(clears, 3);
    }

    #[test]
    fn test_write_text_and_cursor() {
        let (mut term, video) = terminal();
        write(&mut term, "hi");
        assert_eq!(term.row_text(0), "hi");
        assert_eq!(term.cursor(), (0, 2));

        let ops = video.ops();
        assert!(ops.contains(&VideoOp::SetChar {
            row: 0,
            col: 0,
            entry: make_entry(b'h', DEFAULT_ATTR)
        }));
        assert_eq!(ops.last(), Some(&VideoOp::Flush));
        assert!(ops.contains(&VideoOp::MoveCursor { row: 0, col: 2 }));
    }

    #[test]
    fn test_write_uses_color() {
        let (mut term, _video) = terminal();
        term.execute(TermAction::write(b"x", 0x1e));
        assert_eq!(term.entry_at(0, 0), make_entry(b'x', 0x1e));
    }

    #[test]
    fn test_newline_and_carriage_return() {
        let (mut term, _video) = terminal();
        write(&mut term, "ab\r\ncd\rX");
        assert_eq!(term.row_text(0), "ab");
        assert_eq!(term.row_text(1), "Xd");
        assert_eq!(term.cursor(), (1, 1));
    }

    #[test]
    fn test_bare_newline_keeps_column() {
        let (mut term, _video) = terminal();
        write(&mut term, "ab\ncd");
        assert_eq!(term.row_text(1), "  cd");
        assert_eq!(term.cursor(), (1, 4));
    }

    #[test]
    fn test_control_chars_ignored() {
        let (mut term, _video) = terminal();
        write(&mut term, "a\x1b\x07\x0bb");
        assert_eq!(term.row_text(0), "ab");
    }

    #[test]
    fn test_wrap_at_end_of_row() {
        let (mut term, _video) = terminal();
        write(&mut term, "0123456789ab");
        assert_eq!(term.row_text(0), "0123456789");
        assert_eq!(term.row_text(1), "ab");
        assert_eq!(term.cursor(), (1, 2));
    }

    #[test]
    fn test_scrolls_when_writing_past_last_row() {
        let (mut term, video) = terminal();
        print(&mut term, "one\ntwo\nthree\nfour");
        assert_eq!(term.max_scroll(), 1);
        assert!(term.is_at_bottom());
        assert_eq!(term.row_text(0), "two");
        assert_eq!(term.row_text(2), "four");
        // no hardware scroll: the screen was redrawn
        assert!(video.ops().contains(&VideoOp::SetRow { row: 0 }));
    }

    #[test]
    fn test_hardware_scroll_used_when_available() {
        let video = RecordingVideo::new().with_hw_scroll();
        let mut term = Terminal::new(small_config(), Box::new(video.clone()));
        video.take_ops();

        print(&mut term, "a\nb\nc\nd");
        let ops = video.ops();
        assert!(ops.contains(&VideoOp::ScrollOneLineUp));
        assert!(!ops.contains(&VideoOp::SetRow { row: 0 }));
        assert_eq!(term.row_text(0), "b");
        assert_eq!(term.row_text(2), "d");
    }

    #[test]
    fn test_scrollback_is_bounded() {
        let (mut term, _video) = terminal();
        print(&mut term, "1\n2\n3\n4\n5\n6\n7\n8");
        assert_eq!(term.max_scroll(), 5);

        // only extra_rows (3) rows of history are kept
        term.execute(TermAction::ScrollUp(100));
        assert_eq!(term.scroll(), 2);
        assert_eq!(term.row_text(0), "3");

        term.execute(TermAction::ScrollDown(1));
        assert_eq!(term.scroll(), 3);
        term.execute(TermAction::ScrollDown(100));
        assert!(term.is_at_bottom());
    }

    #[test]
    fn test_scroll_up_hides_cursor_and_write_snaps_back() {
        let (mut term, video) = terminal();
        print(&mut term, "1\n2\n3\n4");
        video.take_ops();

        term.execute(TermAction::ScrollUp(1));
        assert!(!term.is_at_bottom());
        assert!(video.take_ops().contains(&VideoOp::DisableCursor));

        write(&mut term, "5");
        assert!(term.is_at_bottom());
        assert_eq!(term.row_text(2), "45");
    }

    #[test]
    fn test_tab_stops() {
        let (mut term, _video) = terminal();
        write(&mut term, "a\tb");
        assert_eq!(term.cursor(), (0, 5));
        assert_eq!(term.entry_at(0, 4), make_entry(b'b', DEFAULT_ATTR));

        // a tab never reaches the last column
        write(&mut term, "\t\t");
        assert_eq!(term.cursor(), (0, 9));
        write(&mut term, "\t");
        assert_eq!(term.cursor(), (0, 9));
    }

    #[test]
    fn test_backspace_removes_whole_tab() {
        let (mut term, _video) = terminal();
        write(&mut term, "a\t");
        assert_eq!(term.cursor(), (0, 4));
        write(&mut term, "\x7f");
        assert_eq!(term.cursor(), (0, 1));
        write(&mut term, "\x08");
        assert_eq!(term.cursor(), (0, 0));
        assert_eq!(term.row_text(0), "");
    }

    #[test]
    fn test_backspace_stops_at_col_offset() {
        let (mut term, _video) = terminal();
        write(&mut term, "> ");
        term.execute(TermAction::SetColOffset(2));
        write(&mut term, "ab\x7f\x7f\x7f\x7f");
        assert_eq!(term.cursor(), (0, 2));
        assert_eq!(term.row_text(0), ">");
        assert_eq!(term.col_offset(), 2);

        // a new line clears the offset
        write(&mut term, "\n");
        assert_eq!(term.col_offset(), 0);
    }

    #[test]
    fn test_move_cursor_is_clamped() {
        let (mut term, video) = terminal();
        term.execute(TermAction::MoveChAndCur { row: 7, col: 99 });
        assert_eq!(term.cursor(), (2, 9));
        assert!(video.ops().contains(&VideoOp::MoveCursor { row: 2, col: 9 }));

        term.execute(TermAction::MoveChAndCurRel { drow: -1, dcol: -4 });
        assert_eq!(term.cursor(), (1, 5));
        term.execute(TermAction::MoveChAndCurRel {
            drow: -100,
            dcol: 100,
        });
        assert_eq!(term.cursor(), (0, 9));
    }

    #[test]
    fn test_erase_in_line_modes() {
        let (mut term, _video) = terminal();
        write(&mut term, "abcdef");
        term.execute(TermAction::MoveChAndCur { row: 0, col: 2 });

        term.execute(TermAction::EraseInLine(0));
        assert_eq!(term.row_text(0), "ab");

        write(&mut term, "cdef");
        term.execute(TermAction::MoveChAndCur { row: 0, col: 2 });
        term.execute(TermAction::EraseInLine(1));
        assert_eq!(term.row_text(0), "  cdef");

        term.execute(TermAction::EraseInLine(2));
        assert_eq!(term.row_text(0), "");

        // unknown mode is ignored
        write(&mut term, "z");
        term.execute(TermAction::EraseInLine(9));
        assert_eq!(term.row_text(0), "  z");
    }

    #[test]
    fn test_erase_in_display_modes() {
        let (mut term, _video) = terminal();
        print(&mut term, "aaa\nbbb\nccc");
        term.execute(TermAction::MoveChAndCur { row: 1, col: 1 });

        term.execute(TermAction::EraseInDisplay(0));
        assert_eq!(term.row_text(0), "aaa");
        assert_eq!(term.row_text(1), "b");
        assert_eq!(term.row_text(2), "");

        print(&mut term, "xx\nccc");
        term.execute(TermAction::MoveChAndCur { row: 1, col: 1 });
        term.execute(TermAction::EraseInDisplay(1));
        assert_eq!(term.row_text(0), "");
        assert_eq!(term.row_text(1), " xx");
        assert_eq!(term.row_text(2), "ccc");

        term.execute(TermAction::EraseInDisplay(2));
        for row in 0..3 {
            assert_eq!(term.row_text(row), "");
        }
        assert_eq!(term.cursor(), (1, 1));
    }

    #[test]
    fn test_erase_display_and_scrollback() {
        let (mut term, _video) = terminal();
        print(&mut term, "1\n2\n3\n4\n5");
        term.execute(TermAction::MoveChAndCur { row: 1, col: 3 });
        term.execute(TermAction::EraseInDisplay(3));

        assert_eq!(term.max_scroll(), 0);
        assert_eq!(term.scroll(), 0);
        assert_eq!(term.cursor(), (1, 3));
        assert_eq!(term.row_text(0), "");
    }

    #[test]
    fn test_reset() {
        let (mut term, _video) = terminal();
        print(&mut term, "a\tb\n1\n2\n3");
        term.execute(TermAction::Reset);

        assert_eq!(term.cursor(), (0, 0));
        assert_eq!(term.max_scroll(), 0);
        for row in 0..3 {
            assert_eq!(term.row_text(row), "");
        }

        // tab markers are gone too: backspace erases a plain cell
        write(&mut term, "abcd\x7f");
        assert_eq!(term.cursor(), (0, 3));
    }

    #[test]
    fn test_non_buffered_scroll() {
        let (mut term, video) = terminal();
        print(&mut term, "a\nb\nc");
        video.take_ops();

        term.execute(TermAction::NonBufScrollUp(1));
        assert_eq!(term.row_text(0), "b");
        assert_eq!(term.row_text(1), "c");
        assert_eq!(term.row_text(2), "");
        assert_eq!(term.max_scroll(), 0);
        assert_eq!(
            video
                .take_ops()
                .iter()
                .filter(|op| matches!(op, VideoOp::SetRow { .. }))
                .count(),
            3
        );

        term.execute(TermAction::NonBufScrollDown(2));
        assert_eq!(term.row_text(0), "");
        assert_eq!(term.row_text(1), "");
        assert_eq!(term.row_text(2), "b");

        term.execute(TermAction::NonBufScrollUp(50));
        for row in 0..3 {
            assert_eq!(term.row_text(row), "");
        }
    }

    #[test]
    fn test_pause_and_restart_video() {
        let (mut term, video) = terminal();
        term.execute(TermAction::PauseVideoOutput);
        assert!(term.is_video_paused());
        assert_eq!(
            video.take_ops(),
            vec![VideoOp::DisableStaticRefresh, VideoOp::DisableCursor]
        );

        // state still changes, nothing is rendered
        write(&mut term, "hidden");
        assert!(video.ops().is_empty());
        assert_eq!(term.row_text(0), "hidden");

        term.execute(TermAction::RestartVideoOutput);
        assert!(!term.is_video_paused());
        let ops = video.take_ops();
        let redrawn = ops
            .iter()
            .filter(|op| matches!(op, VideoOp::SetRow { .. }))
            .count();
        assert_eq!(redrawn, 3);
        assert!(ops.contains(&VideoOp::EnableCursor));
        assert!(ops.contains(&VideoOp::RedrawStaticElements));
        assert_eq!(ops.last(), Some(&VideoOp::EnableStaticRefresh));
    }

    #[test]
    fn test_pause_twice_keeps_real_output() {
        let (mut term, video) = terminal();
        term.execute(TermAction::PauseVideoOutput);
        term.execute(TermAction::PauseVideoOutput);
        term.execute(TermAction::RestartVideoOutput);
        video.take_ops();

        write(&mut term, "x");
        assert!(!video.ops().is_empty());

        // restart without pause is a no-op
        term.execute(TermAction::RestartVideoOutput);
        assert!(!term.is_video_paused());
    }

    struct Shout;

    impl TermFilter for Shout {
        fn filter(&mut self, ch: u8, color: &mut u8) -> FilterOutcome {
            match ch {
                b'#' => FilterOutcome::suppress(),
                b'!' => {
                    *color = 0x0c;
                    FilterOutcome::emit()
                }
                b'^' => FilterOutcome::suppress()
                    .then(TermAction::MoveChAndCurRel { drow: 1, dcol: 0 }),
                _ => FilterOutcome::emit(),
            }
        }
    }

    #[test]
    fn test_filter_hook() {
        let (mut term, _video) = terminal();
        term.set_filter(Some(Box::new(Shout)));
        assert!(term.has_filter());

        write(&mut term, "a#b!c^d");
        assert_eq!(term.row_text(0), "ab!c");
        // color change sticks for the rest of the write
        assert_eq!(term.entry_at(0, 2), make_entry(b'!', 0x0c));
        assert_eq!(term.entry_at(0, 3), make_entry(b'c', 0x0c));
        // the filter's action ran before 'd' was written
        assert_eq!(term.entry_at(1, 4), make_entry(b'd', 0x0c));

        term.set_filter(None);
        write(&mut term, "#");
        assert_eq!(term.entry_at(1, 5), make_entry(b'#', DEFAULT_ATTR));
    }
}
