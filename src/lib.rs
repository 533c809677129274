//! ansiscreen - ANSI/VT cursor and screen control
//!
//! Emits the fixed escape sequences interactive console programs need
//! (cursor movement, clearing, scroll regions, screen buffers, cursor
//! style) and reads back what only the terminal knows: the cursor position
//! and the screen size.
//!
//! # Quick Start
//!
//! ```no_run
//! use ansiscreen::{Config, Terminal};
//!
//! // The terminal must already be in raw mode for replies to arrive
//! let mut term = Terminal::stdio(&Config::load());
//! term.clear_screen();
//! term.move_to(5, 10);
//! match term.read_cursor_position() {
//!     Ok(pos) => println!("cursor at {}", pos),
//!     Err(e) => println!("no cursor report: {}", e),
//! }
//! let size = term.terminal_size(); // 24x80 when the terminal stays silent
//! # let _ = size;
//! ```
//!
//! # Queries
//!
//! | Call | Request | Reply |
//! |------|---------|-------|
//! | `read_cursor_position` | `CSI 6n` | `ESC [ row ; col R` |
//! | `read_screen_size` | `CSI 18t` | `ESC [ 8 ; rows ; cols t` |
//!
//! A query on input that is not a terminal returns
//! [`QueryError::NoReply`] at once without writing the request.

pub mod config;
pub mod core;

pub use crate::config::{Config, ConfigError};
pub use crate::core::term::{CursorPosition, CursorStyle, EscapeSequence, ScreenDimensions};
pub use crate::core::{
    Emitter, QueryError, QueryOptions, ONE_STEP, ScriptedInput, StdioInput, TermInput, Terminal,
    TerminalSize,
};
