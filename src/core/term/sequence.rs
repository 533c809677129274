//! Escape sequence construction
//!
//! Builds the fixed-format ESC / CSI byte strings the emitter writes.
//! Reference: https://invisible-island.net/xterm/ctlseqs/ctlseqs.html

use std::fmt;

/// Escape byte
pub const ESC: u8 = 0x1B;

/// Control Sequence Introducer (`ESC [`)
pub const CSI: &[u8] = b"\x1b[";

/// An immutable, fully formatted escape sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EscapeSequence {
    bytes: Vec<u8>,
}

impl EscapeSequence {
    /// `ESC <body>`
    pub fn esc(body: &str) -> Self {
        let mut bytes = Vec::with_capacity(1 + body.len());
        bytes.push(ESC);
        bytes.extend_from_slice(body.as_bytes());
        Self { bytes }
    }

    /// `CSI <body>`
    pub fn csi(body: &str) -> Self {
        let mut bytes = Vec::with_capacity(CSI.len() + body.len());
        bytes.extend_from_slice(CSI);
        bytes.extend_from_slice(body.as_bytes());
        Self { bytes }
    }

    /// Concatenate two sequences that are always sent together
    pub fn then(mut self, next: EscapeSequence) -> Self {
        self.bytes.extend_from_slice(&next.bytes);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    // Cursor movement

    pub fn cursor_up(n: u16) -> Self {
        Self::csi(&format!("{}A", n))
    }

    pub fn cursor_down(n: u16) -> Self {
        Self::csi(&format!("{}B", n))
    }

    pub fn cursor_forward(n: u16) -> Self {
        Self::csi(&format!("{}C", n))
    }

    pub fn cursor_backward(n: u16) -> Self {
        Self::csi(&format!("{}D", n))
    }

    /// CNL - Cursor Next Line
    pub fn cursor_next_line(n: u16) -> Self {
        Self::csi(&format!("{}E", n))
    }

    /// CPL - Cursor Previous Line
    pub fn cursor_previous_line(n: u16) -> Self {
        Self::csi(&format!("{}F", n))
    }

    /// CHA - Cursor Character Absolute
    pub fn cursor_column(col: u16) -> Self {
        Self::csi(&format!("{}G", col))
    }

    /// CUP - Cursor Position (1-based)
    pub fn cursor_position(row: u16, col: u16) -> Self {
        Self::csi(&format!("{};{}H", row, col))
    }

    pub fn cursor_home() -> Self {
        Self::csi("H")
    }

    // Line and character editing

    pub fn insert_lines(n: u16) -> Self {
        Self::csi(&format!("{}L", n))
    }

    pub fn delete_lines(n: u16) -> Self {
        Self::csi(&format!("{}M", n))
    }

    pub fn delete_chars(n: u16) -> Self {
        Self::csi(&format!("{}P", n))
    }

    // Erase

    /// ED - Erase in Display (0 below, 1 above, 2 all)
    pub fn erase_in_display(mode: u8) -> Self {
        Self::csi(&format!("{}J", mode))
    }

    /// EL - Erase in Line (0 to end, 1 to start, 2 whole line)
    pub fn erase_in_line(mode: u8) -> Self {
        Self::csi(&format!("{}K", mode))
    }

    // Modes

    /// IRM off. Note the inverted letters: `4l` leaves insert mode.
    pub fn replace_mode() -> Self {
        Self::csi("4l")
    }

    pub fn insert_mode() -> Self {
        Self::csi("4h")
    }

    /// DECTCEM
    pub fn cursor_visible(visible: bool) -> Self {
        Self::csi(if visible { "?25h" } else { "?25l" })
    }

    /// DECSCUSR
    pub fn cursor_style(style: CursorStyle, blinking: bool) -> Self {
        Self::csi(&format!("{} q", style.code(blinking)))
    }

    // Save / restore

    /// SCOSC (`CSI s`) when `ansi`, DECSC (`ESC 7`) otherwise
    pub fn save_cursor(ansi: bool) -> Self {
        if ansi {
            Self::csi("s")
        } else {
            Self::esc("7")
        }
    }

    /// SCORC (`CSI u`) when `ansi`, DECRC (`ESC 8`) otherwise
    pub fn restore_cursor(ansi: bool) -> Self {
        if ansi {
            Self::csi("u")
        } else {
            Self::esc("8")
        }
    }

    // Scrolling

    /// DECSTBM
    pub fn scroll_region(top: u16, bottom: u16) -> Self {
        Self::csi(&format!("{};{}r", top, bottom))
    }

    pub fn scroll_up(n: u16) -> Self {
        Self::csi(&format!("{}S", n))
    }

    pub fn scroll_down(n: u16) -> Self {
        Self::csi(&format!("{}T", n))
    }

    // Screen buffers

    pub fn enter_alternate_screen() -> Self {
        Self::csi("?1049h").then(Self::cursor_home())
    }

    pub fn exit_alternate_screen() -> Self {
        Self::csi("?1049l")
    }

    // Requests

    /// DSR 6 - report cursor position as `ESC [ row ; col R`
    pub fn request_cursor_position() -> Self {
        Self::csi("6n")
    }

    /// XTWINOPS 18 - report text area size as `ESC [ 8 ; rows ; cols t`
    pub fn request_screen_size() -> Self {
        Self::csi("18t")
    }
}

impl AsRef<[u8]> for EscapeSequence {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for EscapeSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sequences are built from ASCII only
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

/// Cursor shape selectable through DECSCUSR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Block,
    Line,
    Bar,
}

impl CursorStyle {
    /// Blinking DECSCUSR code; the steady variant is one higher
    pub fn base_code(self) -> u8 {
        match self {
            CursorStyle::Block => 1,
            CursorStyle::Line => 3,
            CursorStyle::Bar => 5,
        }
    }

    pub fn code(self, blinking: bool) -> u8 {
        if blinking {
            self.base_code()
        } else {
            self.base_code() + 1
        }
    }
}
