//! # Text Terminal
//!
//! This crate provides the kernel's text terminal: a character grid with a
//! scrollback ring, driven exclusively through deferred actions.
//!
//! ## Philosophy
//!
//! Terminal entrypoints may be called from interrupt context. None of them
//! touches screen state directly: each one enqueues a [`TermAction`] and the
//! caller that found the queue empty executes everything queued, in order.
//! A call that interrupts a running drain is picked up by that drain, never
//! executed reentrantly.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: same action sequence, same cells
//! 2. **Testable**: rendering goes through the [`VideoOutput`] seam
//! 3. **Exhaustive dispatch**: the action's shape fixes its arguments

#![cfg_attr(not(test), no_std)]

extern crate alloc;

use serde::{Deserialize, Serialize};

pub mod actions;
pub mod term;
pub mod terminal;
pub mod video;

pub use actions::{TermAction, MAX_WRITE_LEN};
pub use term::{Term, DEFAULT_ACTION_SLOTS};
pub use terminal::{FilterOutcome, TermFilter, Terminal};
pub use video::{NullVideo, RecordingVideo, VideoOp, VideoOutput};

/// VGA color codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum VgaColor {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

impl VgaColor {
    /// Make a VGA attribute byte from foreground and background colors
    pub const fn make_attr(fg: VgaColor, bg: VgaColor) -> u8 {
        (bg as u8) << 4 | (fg as u8)
    }
}

/// Attribute used for cleared cells
pub const DEFAULT_ATTR: u8 = VgaColor::make_attr(VgaColor::LightGray, VgaColor::Black);

/// Packs a character and its attribute into one cell
pub const fn make_entry(ch: u8, attr: u8) -> u16 {
    ((attr as u16) << 8) | ch as u16
}

/// Character byte of a cell
pub const fn entry_char(entry: u16) -> u8 {
    (entry & 0xff) as u8
}

/// Attribute byte of a cell
pub const fn entry_attr(entry: u16) -> u8 {
    (entry >> 8) as u8
}

/// Terminal geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermConfig {
    /// Visible rows
    pub rows: usize,
    /// Visible columns
    pub cols: usize,
    /// Tab stop interval
    pub tab_size: usize,
    /// Scrollback depth, in screens
    pub scrollback_pages: usize,
}

impl Default for TermConfig {
    fn default() -> Self {
        Self {
            rows: 25,
            cols: 80,
            tab_size: 8,
            scrollback_pages: 9,
        }
    }
}

impl TermConfig {
    /// Rows kept above the screen for scrollback
    pub fn extra_rows(&self) -> usize {
        self.scrollback_pages * self.rows
    }

    /// Smallest usable geometry: at least one row, two columns and a
    /// tab stop of one
    pub fn sanitized(self) -> Self {
        let cols = self.cols.max(2);
        Self {
            rows: self.rows.max(1),
            cols,
            tab_size: self.tab_size.clamp(1, cols - 1),
            scrollback_pages: self.scrollback_pages,
        }
    }
}
