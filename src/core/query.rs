//! Query/response engine
//!
//! One round-trip per call: write a request, read raw bytes until the
//! reply's terminator, parse. Queries never panic and never retry; a
//! failed round-trip is reported as a [`QueryError`] and callers decide
//! whether to re-issue it.
//!
//! Only one query may be in flight per terminal. Replies are not tagged,
//! so two interleaved queries would read each other's bytes; `&mut self`
//! on every query keeps a single owner in charge, and callers sharing a
//! [`Terminal`] across threads wrap it in a `Mutex`.

use std::io::{self, Write};
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::channel::{ReadOutcome, StdioInput, TermInput};
use super::emitter::Emitter;
use super::term::{
    parse_cursor_position, parse_screen_size, CursorPosition, EscapeSequence, ScreenDimensions,
};
use crate::config::Config;

/// Rows assumed when the terminal does not report its size
pub const DEFAULT_ROWS: u16 = 24;
/// Columns assumed when the terminal does not report its size
pub const DEFAULT_COLS: u16 = 80;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    /// Input closed, not a terminal, timed out or over the byte limit before the terminator
    #[error("Terminal did not reply")]
    NoReply,

    /// Terminator seen but the reply did not have the expected shape
    #[error("Malformed terminal reply")]
    MalformedReply,
}

pub type Result<T> = std::result::Result<T, QueryError>;

/// Bounds on a single reply read.
///
/// Neither bound is part of the basic protocol, which reads until the
/// terminator or end of input. They keep a terminal that ignores a request
/// from blocking the caller; breaching either one yields [`QueryError::NoReply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub timeout: Option<Duration>,
    pub max_reply_bytes: Option<usize>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_millis(500)),
            max_reply_bytes: Some(64),
        }
    }
}

impl QueryOptions {
    /// No timeout and no byte limit
    pub fn unbounded() -> Self {
        Self {
            timeout: None,
            max_reply_bytes: None,
        }
    }
}

/// Terminal size that is always usable: components the terminal did not
/// report fall back to 24 rows / 80 columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub rows: u16,
    pub cols: u16,
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
        }
    }
}

impl TerminalSize {
    /// Replace each non-positive component of a `(rows, cols)` pair with its default
    pub fn from_pair((rows, cols): (i32, i32)) -> Self {
        Self {
            rows: positive_u16(rows).unwrap_or(DEFAULT_ROWS),
            cols: positive_u16(cols).unwrap_or(DEFAULT_COLS),
        }
    }
}

fn positive_u16(value: i32) -> Option<u16> {
    u16::try_from(value).ok().filter(|v| *v > 0)
}

/// An output channel plus the input channel that carries the terminal's replies
pub struct Terminal<W: Write, R: TermInput> {
    emitter: Emitter<W>,
    input: R,
    options: QueryOptions,
}

impl Terminal<io::Stdout, StdioInput> {
    /// Stdout/stdin terminal configured from `config`
    pub fn stdio(config: &Config) -> Self {
        Self::new(
            Emitter::stdout(config.cursor.resolve_ansi_mode()),
            StdioInput::new(),
            config.query.options(),
        )
    }
}

impl<W: Write, R: TermInput> Terminal<W, R> {
    pub fn new(emitter: Emitter<W>, input: R, options: QueryOptions) -> Self {
        Self {
            emitter,
            input,
            options,
        }
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    pub fn input(&self) -> &R {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut R {
        &mut self.input
    }

    pub fn into_parts(self) -> (Emitter<W>, R) {
        (self.emitter, self.input)
    }

    /// Send `request` and collect the reply up to and including `terminator`.
    ///
    /// Input already pending when the request goes out cannot belong to the
    /// reply and is discarded first.
    ///
    /// Returns an empty buffer when the input is not a terminal (nothing is
    /// written in that case), when the request cannot be written, or when
    /// the input ends, errors, times out or exceeds the byte limit first.
    pub fn query(&mut self, request: &EscapeSequence, terminator: u8) -> Vec<u8> {
        if !self.input.is_terminal() {
            tracing::debug!("Input is not a terminal, skipping query {:?}", request);
            return Vec::new();
        }

        let stale = self.input.discard_pending();
        if stale > 0 {
            tracing::debug!("Discarded {} stale input bytes before query", stale);
        }

        if let Err(e) = self.emitter.write_bytes(request.as_bytes()) {
            tracing::debug!("Failed to send query {:?}: {}", request, e);
            return Vec::new();
        }

        let deadline = self.options.timeout.map(|t| Instant::now() + t);
        let mut reply = Vec::with_capacity(16);

        loop {
            if let Some(max) = self.options.max_reply_bytes {
                if reply.len() >= max {
                    tracing::debug!("Reply exceeded {} bytes without terminator", max);
                    return Vec::new();
                }
            }

            match self.input.read_byte(deadline) {
                Ok(ReadOutcome::Byte(byte)) => {
                    reply.push(byte);
                    if byte == terminator {
                        return reply;
                    }
                }
                Ok(ReadOutcome::Eof) => {
                    tracing::debug!("Input closed after {} reply bytes", reply.len());
                    return Vec::new();
                }
                Ok(ReadOutcome::TimedOut) => {
                    tracing::debug!("Query {:?} timed out after {} reply bytes", request, reply.len());
                    return Vec::new();
                }
                Err(e) => {
                    tracing::debug!("Failed to read reply: {}", e);
                    return Vec::new();
                }
            }
        }
    }

    /// Ask the terminal where the cursor is (DSR 6)
    pub fn read_cursor_position(&mut self) -> Result<CursorPosition> {
        let reply = self.query(&EscapeSequence::request_cursor_position(), b'R');
        parse_cursor_position(&reply)
    }

    /// Ask the terminal for its text area size (XTWINOPS 18).
    ///
    /// Many emulators ignore this request, and a parsed answer is best-effort.
    /// Prefer the host's window-size source (e.g. `TIOCGWINSZ`) when one exists.
    pub fn read_screen_size(&mut self) -> Result<ScreenDimensions> {
        let reply = self.query(&EscapeSequence::request_screen_size(), b't');
        parse_screen_size(&reply)
    }

    /// Screen size with 24x80 defaults; never fails
    pub fn terminal_size(&mut self) -> TerminalSize {
        let result = self.read_screen_size();
        if let Err(e) = &result {
            tracing::debug!("Using default terminal size: {}", e);
        }
        TerminalSize::from_pair(ScreenDimensions::sentinel_pair(&result))
    }
}

impl<W: Write, R: TermInput> Deref for Terminal<W, R> {
    type Target = Emitter<W>;

    fn deref(&self) -> &Self::Target {
        &self.emitter
    }
}

impl<W: Write, R: TermInput> DerefMut for Terminal<W, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.emitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::channel::ScriptedInput;
    use crate::core::term::Reply;
    use pretty_assertions::assert_eq;

    fn terminal(input: ScriptedInput) -> Terminal<Vec<u8>, ScriptedInput> {
        Terminal::new(Emitter::new(Vec::new(), true), input, QueryOptions::default())
    }

    fn written(term: Terminal<Vec<u8>, ScriptedInput>) -> Vec<u8> {
        term.into_parts().0.into_inner()
    }

    #[test]
    fn test_read_cursor_position() {
        let mut term = terminal(ScriptedInput::terminal(b"\x1b[12;4R"));
        assert_eq!(term.read_cursor_position(), Ok(CursorPosition { row: 12, col: 4 }));
        assert_eq!(written(term), b"\x1b[6n");
    }

    #[test]
    fn test_read_screen_size() {
        let mut term = terminal(ScriptedInput::terminal(b"\x1b[8;50;120t"));
        assert_eq!(term.read_screen_size(), Ok(ScreenDimensions { rows: 50, cols: 120 }));
        assert_eq!(written(term), b"\x1b[18t");
    }

    #[test]
    fn test_reported_values_round_trip() {
        for (row, col) in [(1, 1), (24, 80), (300, 1000)] {
            let mut term = terminal(ScriptedInput::terminal(Reply::CursorPosition(row, col).to_bytes()));
            assert_eq!(term.read_cursor_position(), Ok(CursorPosition { row, col }));

            let mut term = terminal(ScriptedInput::terminal(Reply::ScreenSize(row, col).to_bytes()));
            assert_eq!(term.read_screen_size(), Ok(ScreenDimensions { rows: row, cols: col }));
        }
    }

    #[test]
    fn test_query_stops_at_terminator() {
        let mut term = terminal(ScriptedInput::terminal(b"\x1b[3;9Rtrailing"));
        let reply = term.query(&EscapeSequence::request_cursor_position(), b'R');
        assert_eq!(reply, b"\x1b[3;9R");
        assert_eq!(term.input().remaining(), "trailing".len());
    }

    #[test]
    fn test_no_reply_on_eof() {
        let mut term = terminal(ScriptedInput::terminal(b"\x1b[3;"));
        assert_eq!(term.read_cursor_position(), Err(QueryError::NoReply));

        let mut term = terminal(ScriptedInput::terminal(b""));
        let result = term.read_screen_size();
        assert_eq!(result, Err(QueryError::NoReply));
        assert_eq!(ScreenDimensions::sentinel_pair(&result), (-1, -1));
    }

    #[test]
    fn test_not_a_terminal_fails_fast_without_writing() {
        let mut term = terminal(ScriptedInput::redirected(b"\x1b[12;4R"));
        let result = term.read_cursor_position();
        assert_eq!(CursorPosition::sentinel_pair(&result), (-1, -1));
        assert_eq!(term.read_screen_size(), Err(QueryError::NoReply));
        assert_eq!(term.input().remaining(), 7);
        assert_eq!(written(term), b"");
    }

    #[test]
    fn test_timeout_is_no_reply() {
        let mut term = terminal(ScriptedInput::terminal(b"\x1b[8;").stalling());
        assert_eq!(term.read_screen_size(), Err(QueryError::NoReply));
    }

    #[test]
    fn test_byte_limit_is_no_reply() {
        let options = QueryOptions {
            timeout: None,
            max_reply_bytes: Some(4),
        };
        let input = ScriptedInput::terminal(b"\x1b[12;4R");
        let mut term = Terminal::new(Emitter::new(Vec::new(), true), input, options);
        assert_eq!(term.read_cursor_position(), Err(QueryError::NoReply));

        let input = ScriptedInput::terminal(b"\x1b[12;4R");
        let mut term = Terminal::new(Emitter::new(Vec::new(), true), input, QueryOptions::unbounded());
        assert_eq!(term.read_cursor_position(), Ok(CursorPosition { row: 12, col: 4 }));
    }

    #[test]
    fn test_malformed_reply_is_distinct() {
        let mut term = terminal(ScriptedInput::terminal(b"\x1b[1x;4R"));
        let result = term.read_cursor_position();
        assert_eq!(result, Err(QueryError::MalformedReply));
        assert_eq!(CursorPosition::sentinel_pair(&result), (-1, -1));
    }

    #[test]
    fn test_terminal_size_defaults() {
        let mut term = terminal(ScriptedInput::terminal(b""));
        assert_eq!(term.terminal_size(), TerminalSize { rows: 24, cols: 80 });

        let mut term = terminal(ScriptedInput::terminal(b"\x1b[8;abc;t"));
        assert_eq!(term.terminal_size(), TerminalSize { rows: 24, cols: 80 });

        let mut term = terminal(ScriptedInput::terminal(b"\x1b[8;50;120t"));
        assert_eq!(term.terminal_size(), TerminalSize { rows: 50, cols: 120 });
    }

    #[test]
    fn test_terminal_size_defaults_each_component() {
        assert_eq!(TerminalSize::from_pair((-1, 132)), TerminalSize { rows: 24, cols: 132 });
        assert_eq!(TerminalSize::from_pair((40, 0)), TerminalSize { rows: 40, cols: 80 });
        assert_eq!(TerminalSize::from_pair((-1, -1)), TerminalSize::default());
        assert_eq!(TerminalSize::from_pair((i32::MAX, 100)), TerminalSize { rows: 24, cols: 100 });
    }

    #[test]
    fn test_sequential_queries_share_input() {
        let mut input = ScriptedInput::terminal(b"\x1b[2;3R");
        input.push(b"\x1b[8;30;100t");
        let mut term = terminal(input);
        assert_eq!(term.read_cursor_position(), Ok(CursorPosition { row: 2, col: 3 }));
        assert_eq!(term.terminal_size(), TerminalSize { rows: 30, cols: 100 });
        assert_eq!(written(term), b"\x1b[6n\x1b[18t");
    }

    /// Input holding bytes that arrived before the request
    struct StaleInput {
        stale: Vec<u8>,
        reply: ScriptedInput,
    }

    impl TermInput for StaleInput {
        fn is_terminal(&self) -> bool {
            true
        }

        fn read_byte(&mut self, deadline: Option<Instant>) -> io::Result<ReadOutcome> {
            if self.stale.is_empty() {
                self.reply.read_byte(deadline)
            } else {
                Ok(ReadOutcome::Byte(self.stale.remove(0)))
            }
        }

        fn discard_pending(&mut self) -> usize {
            std::mem::take(&mut self.stale).len()
        }
    }

    #[test]
    fn test_pending_input_is_discarded_before_request() {
        let input = StaleInput {
            stale: b"\x1b[9;9Rq".to_vec(),
            reply: ScriptedInput::terminal(b"\x1b[12;4R"),
        };
        let mut term = Terminal::new(Emitter::new(Vec::new(), true), input, QueryOptions::default());
        assert_eq!(term.read_cursor_position(), Ok(CursorPosition { row: 12, col: 4 }));
        assert!(term.input().stale.is_empty());
    }

    #[test]
    fn test_report_ahead_of_reply_is_skipped() {
        let mut term = terminal(ScriptedInput::terminal(b"\x1b[A\x1b[12;4R"));
        assert_eq!(term.read_cursor_position(), Ok(CursorPosition { row: 12, col: 4 }));

        let mut term = terminal(ScriptedInput::terminal(b"\x1b[12;4R\x1b[8;50;120t"));
        assert_eq!(term.read_screen_size(), Ok(ScreenDimensions { rows: 50, cols: 120 }));
    }

    #[test]
    fn test_emitter_reachable_through_terminal() {
        let mut term = terminal(ScriptedInput::terminal(b""));
        term.cursor_off();
        term.move_to(1, 1);
        assert!(!term.modes().is_cursor_visible());
        assert_eq!(written(term), b"\x1b[?25l\x1b[1;1H");
    }
}
