//! Deferred Terminal Tests
//!
//! Validates that terminal calls made while a drain is running (as an
//! interrupt handler would) are queued behind the running action instead
//! of being executed inside it.

use console_term::{
    FilterOutcome, RecordingVideo, Term, TermAction, TermConfig, TermFilter, Terminal, VideoOp,
    DEFAULT_ATTR,
};
use std::sync::OnceLock;
use tests_resilience::recording_term;

/// Filter that queues a nested write through the shared terminal
///
/// Models an interrupt firing in the middle of a write and printing.
struct InterruptOnBang {
    term: &'static OnceLock<Term>,
    text: &'static [u8],
}

impl TermFilter for InterruptOnBang {
    fn filter(&mut self, ch: u8, _color: &mut u8) -> FilterOutcome {
        if ch == b'!' {
            if let Some(term) = self.term.get() {
                term.write(self.text, DEFAULT_ATTR);
            }
        }
        FilterOutcome::emit()
    }
}

fn shared_term(cell: &'static OnceLock<Term>, video: &RecordingVideo) -> &'static Term {
    cell.get_or_init(|| {
        let config = TermConfig {
            rows: 4,
            cols: 40,
            ..TermConfig::default()
        };
        Term::new(Terminal::new(config, Box::new(video.clone())))
    })
}

/// Test: a write queued during a write runs after it, not inside it
#[test]
fn test_nested_write_runs_after_outer_write() {
    static TERM: OnceLock<Term> = OnceLock::new();
    let video = RecordingVideo::new();
    let term = shared_term(&TERM, &video);

    assert!(term.set_filter(Some(Box::new(InterruptOnBang {
        term: &TERM,
        text: b"<irq>",
    }))));

    term.write(b"one!two", DEFAULT_ATTR);

    let row = term.with_terminal(|t| t.row_text(0)).unwrap();
    assert_eq!(row, "one!two<irq>");
    assert_eq!(term.dropped(), 0);
}

/// Test: nested writes from several actions keep their order
#[test]
fn test_nested_writes_interleave_in_queue_order() {
    static TERM: OnceLock<Term> = OnceLock::new();
    let video = RecordingVideo::new();
    let term = shared_term(&TERM, &video);

    assert!(term.set_filter(Some(Box::new(InterruptOnBang {
        term: &TERM,
        text: b"*",
    }))));

    term.write(b"a!b!", DEFAULT_ATTR);
    term.write(b"c", DEFAULT_ATTR);

    let row = term.with_terminal(|t| t.row_text(0)).unwrap();
    assert_eq!(row, "a!b!**c");
}

/// Test: terminal state cannot be borrowed from inside a drain
#[test]
fn test_inspection_is_refused_during_drain() {
    static TERM: OnceLock<Term> = OnceLock::new();
    static SEEN: OnceLock<bool> = OnceLock::new();

    struct Peek;

    impl TermFilter for Peek {
        fn filter(&mut self, _ch: u8, _color: &mut u8) -> FilterOutcome {
            if let Some(term) = TERM.get() {
                let _ = SEEN.set(term.with_terminal(|_| ()).is_some());
            }
            FilterOutcome::emit()
        }
    }

    let video = RecordingVideo::new();
    let term = shared_term(&TERM, &video);
    assert!(term.set_filter(Some(Box::new(Peek))));
    term.write(b"x", DEFAULT_ATTR);

    assert_eq!(SEEN.get(), Some(&false));
}

/// Test: a filter action runs inside the current write
///
/// Unlike a nested call, the action returned by the filter is executed
/// immediately, before the rest of the text.
#[test]
fn test_filter_action_runs_immediately() {
    struct NewlineOnSemicolon;

    impl TermFilter for NewlineOnSemicolon {
        fn filter(&mut self, ch: u8, _color: &mut u8) -> FilterOutcome {
            if ch == b';' {
                FilterOutcome::suppress().then(TermAction::write(b"\r\n", DEFAULT_ATTR))
            } else {
                FilterOutcome::emit()
            }
        }
    }

    let (term, _video) = recording_term(4, 20);
    assert!(term.set_filter(Some(Box::new(NewlineOnSemicolon))));
    term.write(b"ab;cd", DEFAULT_ATTR);

    let rows = term
        .with_terminal(|t| (t.row_text(0), t.row_text(1), t.cursor()))
        .unwrap();
    assert_eq!(rows, ("ab".to_string(), "cd".to_string(), (1, 2)));
}

/// Test: a flood of nested writes from one drain overflows the queue
///
/// Writes beyond the queue's capacity are dropped and counted; the drain
/// still finishes everything that fit.
#[test]
fn test_overflowing_nested_writes_are_counted() {
    static TERM: OnceLock<Term<4>> = OnceLock::new();

    struct Flood;

    impl TermFilter for Flood {
        fn filter(&mut self, ch: u8, _color: &mut u8) -> FilterOutcome {
            if ch == b'!' {
                if let Some(term) = TERM.get() {
                    for _ in 0..6 {
                        term.write(b".", DEFAULT_ATTR);
                    }
                }
            }
            FilterOutcome::emit()
        }
    }

    let term = TERM.get_or_init(|| {
        let config = TermConfig {
            rows: 4,
            cols: 40,
            ..TermConfig::default()
        };
        Term::with_queue_slots(Terminal::new(config, Box::new(RecordingVideo::new())))
    });
    assert!(term.set_filter(Some(Box::new(Flood))));
    term.write(b"!", DEFAULT_ATTR);

    assert_eq!(term.dropped(), 2);
    let row = term.with_terminal(|t| t.row_text(0)).unwrap();
    assert_eq!(row, "!....");
}

/// Test: pausing video keeps the buffer current and restart redraws it
#[test]
fn test_pause_and_restart_video() {
    let (term, video) = recording_term(3, 10);
    video.take_ops();

    term.pause_video_output();
    assert_eq!(
        video.take_ops(),
        vec![VideoOp::DisableStaticRefresh, VideoOp::DisableCursor]
    );
    term.write(b"hidden", DEFAULT_ATTR);
    assert!(video.take_ops().is_empty());

    term.restart_video_output();
    let ops = video.take_ops();
    assert!(ops.contains(&VideoOp::SetRow { row: 0 }));
    assert_eq!(term.with_terminal(|t| t.row_text(0)), Some("hidden".into()));
}
