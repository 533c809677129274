//! Escape sequence building, reply parsing and display-mode tracking

pub mod modes;
pub mod reply;
pub mod sequence;

pub use modes::{DisplayModes, ModeFlags};
pub use reply::{
    parse_cursor_position, parse_screen_size, CsiReport, CursorPosition, Reply, ReplyParser,
    ScreenDimensions, UNKNOWN,
};
pub use sequence::{CursorStyle, EscapeSequence, CSI, ESC};
