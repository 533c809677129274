//! Terminal reply parser
//!
//! Parses the CSI reports a terminal sends back in answer to a request
//! (`ESC [ row ; col R`, `ESC [ 8 ; rows ; cols t`) into typed values.

use std::fmt;

use crate::core::query::QueryError;

/// Value used in place of a row, column or dimension that could not be determined
pub const UNKNOWN: i32 = -1;

/// Cursor position, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub row: u16,
    pub col: u16,
}

impl CursorPosition {
    /// Collapse a query result into the `(row, col)` pair form, `(-1, -1)` on failure
    pub fn sentinel_pair(result: &Result<Self, QueryError>) -> (i32, i32) {
        match result {
            Ok(pos) => (i32::from(pos.row), i32::from(pos.col)),
            Err(_) => (UNKNOWN, UNKNOWN),
        }
    }
}

impl fmt::Display for CursorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.row, self.col)
    }
}

/// Text area size in character cells, as reported by the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenDimensions {
    pub rows: u16,
    pub cols: u16,
}

impl ScreenDimensions {
    /// Collapse a query result into the `(rows, cols)` pair form, `(-1, -1)` on failure
    pub fn sentinel_pair(result: &Result<Self, QueryError>) -> (i32, i32) {
        match result {
            Ok(dims) => (i32::from(dims.rows), i32::from(dims.cols)),
            Err(_) => (UNKNOWN, UNKNOWN),
        }
    }
}

impl fmt::Display for ScreenDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Report a terminal sends back; used to build replies in tests and replays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Cursor position report: ESC [ row ; col R
    CursorPosition(u16, u16),
    /// Text area size report: ESC [ 8 ; rows ; cols t
    ScreenSize(u16, u16),
}

impl Reply {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Reply::CursorPosition(row, col) => format!("\x1b[{};{}R", row, col).into_bytes(),
            Reply::ScreenSize(rows, cols) => format!("\x1b[8;{};{}t", rows, cols).into_bytes(),
        }
    }
}

/// A complete CSI report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsiReport {
    pub params: Vec<u16>,
    pub final_byte: u8,
}

#[derive(Clone, Copy, Default, PartialEq, Debug)]
enum ParserState {
    #[default]
    Ground,
    Escape,
    CsiEntry,
    CsiParam,
}

/// Byte-at-a-time parser for CSI reports.
///
/// Bytes ahead of the first `ESC [` are skipped, so keystrokes typed while a
/// query is in flight do not spoil the reply.
#[derive(Debug, Default)]
pub struct ReplyParser {
    state: ParserState,
    params: Vec<u16>,
    current_param: Option<u16>,
}

impl ReplyParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Ground,
            params: Vec::with_capacity(4),
            current_param: None,
        }
    }

    /// Feed one byte. Returns `Some` once a report is complete.
    pub fn feed(&mut self, byte: u8) -> Option<Result<CsiReport, QueryError>> {
        match self.state {
            ParserState::Ground => {
                if byte == 0x1B {
                    self.state = ParserState::Escape;
                }
                None
            }
            ParserState::Escape => {
                match byte {
                    b'[' => {
                        self.state = ParserState::CsiEntry;
                        self.params.clear();
                        self.current_param = None;
                    }
                    0x1B => {}
                    _ => self.state = ParserState::Ground,
                }
                None
            }
            ParserState::CsiEntry | ParserState::CsiParam => self.csi_param(byte),
        }
    }

    fn csi_param(&mut self, byte: u8) -> Option<Result<CsiReport, QueryError>> {
        match byte {
            b'0'..=b'9' => {
                let digit = u16::from(byte - b'0');
                let value = self
                    .current_param
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit));
                match value {
                    Some(v) => {
                        self.current_param = Some(v);
                        self.state = ParserState::CsiParam;
                        None
                    }
                    None => self.fail("parameter overflow"),
                }
            }
            b';' => match self.current_param.take() {
                Some(p) => {
                    self.params.push(p);
                    self.state = ParserState::CsiParam;
                    None
                }
                None => self.fail("empty parameter"),
            },
            0x40..=0x7E => {
                match self.current_param.take() {
                    Some(p) => self.params.push(p),
                    None if self.state == ParserState::CsiParam => {
                        return self.fail("empty trailing parameter");
                    }
                    None => {}
                }
                self.state = ParserState::Ground;
                Some(Ok(CsiReport {
                    params: std::mem::take(&mut self.params),
                    final_byte: byte,
                }))
            }
            0x1B => {
                // A new sequence starts before this one finished
                tracing::debug!("Truncated report dropped");
                self.state = ParserState::Escape;
                self.params.clear();
                self.current_param = None;
                None
            }
            _ => self.fail("unexpected byte in parameters"),
        }
    }

    fn fail(&mut self, reason: &str) -> Option<Result<CsiReport, QueryError>> {
        tracing::debug!("Malformed reply: {}", reason);
        self.state = ParserState::Ground;
        self.params.clear();
        self.current_param = None;
        Some(Err(QueryError::MalformedReply))
    }

    /// Parse the report in `bytes` that ends with `final_byte`.
    ///
    /// Earlier reports with other final bytes (arrow keys typed ahead, the
    /// tail of a reply that timed out) and earlier malformed fragments are
    /// skipped.
    pub fn parse(bytes: &[u8], final_byte: u8) -> Result<CsiReport, QueryError> {
        let mut parser = Self::new();
        for &byte in bytes {
            match parser.feed(byte) {
                Some(Ok(report)) if report.final_byte == final_byte => return Ok(report),
                Some(Ok(report)) => tracing::debug!("Skipping unrelated report: {:?}", report),
                Some(Err(_)) | None => {}
            }
        }
        Err(QueryError::MalformedReply)
    }
}

/// Parse `ESC [ row ; col R`
pub fn parse_cursor_position(reply: &[u8]) -> Result<CursorPosition, QueryError> {
    if reply.is_empty() {
        return Err(QueryError::NoReply);
    }
    let report = ReplyParser::parse(reply, b'R')?;
    match (report.final_byte, report.params.as_slice()) {
        (b'R', &[row, col]) if row > 0 && col > 0 => Ok(CursorPosition { row, col }),
        _ => {
            tracing::debug!("Unexpected cursor report: {:?}", report);
            Err(QueryError::MalformedReply)
        }
    }
}

/// Parse `ESC [ 8 ; rows ; cols t`
pub fn parse_screen_size(reply: &[u8]) -> Result<ScreenDimensions, QueryError> {
    if reply.is_empty() {
        return Err(QueryError::NoReply);
    }
    let report = ReplyParser::parse(reply, b't')?;
    if report.params.len() < 3 {
        tracing::debug!("Unexpected size report: {:?}", report);
        return Err(QueryError::MalformedReply);
    }
    if report.params[0] != 8 {
        // Some terminals answer with a different leading code; the fields still hold
        tracing::debug!("Size report with leading code {}", report.params[0]);
    }
    let (rows, cols) = (report.params[1], report.params[2]);
    if rows == 0 || cols == 0 {
        return Err(QueryError::MalformedReply);
    }
    Ok(ScreenDimensions { rows, cols })
}
