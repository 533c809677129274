//! Core terminal control components.
//!
//! - **term**: escape sequence formats, reply parser, display-mode flags
//! - **emitter**: writes sequences to the output channel
//! - **channel**: input sources the engine reads replies from
//! - **query**: request/reply round-trips built on the emitter and a channel
//!
//! # Architecture
//!
//! ```text
//! Terminal
//! ├── Emitter (output channel + DisplayModes)
//! └── TermInput (StdioInput | ScriptedInput)
//!     └── ReplyParser (CSI reports)
//! ```

pub mod channel;
pub mod emitter;
pub mod query;
pub mod term;

pub use channel::{ReadOutcome, ScriptedInput, StdioInput, TermInput};
pub use emitter::{Emitter, ONE_STEP};
pub use query::{QueryError, QueryOptions, Terminal, TerminalSize, DEFAULT_COLS, DEFAULT_ROWS};
