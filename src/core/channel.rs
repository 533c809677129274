//! Terminal input channels
//!
//! The query engine reads replies through [`TermInput`]. The host is
//! responsible for putting the terminal in raw, unechoed mode first;
//! canonical mode holds reply bytes back until a newline that never comes.

use std::collections::VecDeque;
use std::io::{self, IsTerminal, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::Instant;

/// Result of a single byte read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Byte(u8),
    /// The input is closed
    Eof,
    /// The deadline passed before a byte arrived
    TimedOut,
}

/// Byte source carrying what the terminal sends back
pub trait TermInput {
    /// Whether the source is an interactive terminal able to answer queries
    fn is_terminal(&self) -> bool;

    /// Read one byte, waiting no later than `deadline` when one is given
    fn read_byte(&mut self, deadline: Option<Instant>) -> io::Result<ReadOutcome>;

    /// Drop input that arrived before a request was sent. Returns the number of bytes dropped.
    fn discard_pending(&mut self) -> usize {
        0
    }
}

impl<T: TermInput + ?Sized> TermInput for &mut T {
    fn is_terminal(&self) -> bool {
        (**self).is_terminal()
    }

    fn read_byte(&mut self, deadline: Option<Instant>) -> io::Result<ReadOutcome> {
        (**self).read_byte(deadline)
    }

    fn discard_pending(&mut self) -> usize {
        (**self).discard_pending()
    }
}

/// Standard input as a terminal reply source.
///
/// Stdin has no portable read timeout, so a background thread reads it
/// byte by byte and hands bytes over a channel. There is one such thread
/// and one receiver per process, shared by every `StdioInput`, started on
/// first use and running until stdin closes. Bytes it reads stay queued
/// until some `StdioInput` takes or discards them; they are never handed
/// to another stdin reader such as crossterm's event loop.
pub struct StdioInput {
    is_tty: bool,
    rx: Option<&'static SharedReceiver>,
}

/// Receiving end of a process-wide reader thread
pub type SharedReceiver = Mutex<Receiver<io::Result<u8>>>;

static STDIN_READER: OnceLock<SharedReceiver> = OnceLock::new();

impl Default for StdioInput {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioInput {
    pub fn new() -> Self {
        Self {
            is_tty: io::stdin().is_terminal(),
            rx: None,
        }
    }

    /// Input over an already running shared reader
    pub fn with_receiver(is_tty: bool, rx: &'static SharedReceiver) -> Self {
        Self {
            is_tty,
            rx: Some(rx),
        }
    }

    fn receiver(&mut self) -> &'static SharedReceiver {
        *self
            .rx
            .get_or_insert_with(|| shared_receiver(&STDIN_READER, spawn_stdin_reader))
    }
}

/// Get the receiver stored in `cell`, starting its reader with `spawn` the first time
pub fn shared_receiver(
    cell: &'static OnceLock<SharedReceiver>,
    spawn: impl FnOnce(Sender<io::Result<u8>>),
) -> &'static SharedReceiver {
    cell.get_or_init(|| {
        let (tx, rx) = mpsc::channel::<io::Result<u8>>();
        spawn(tx);
        Mutex::new(rx)
    })
}

/// Detached reader; exits when stdin closes
fn spawn_stdin_reader(tx: Sender<io::Result<u8>>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut byte = [0u8; 1];
        loop {
            let sent = match stdin.lock().read(&mut byte) {
                Ok(0) => break,
                Ok(_) => tx.send(Ok(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            };
            // The receiver lives in a static, so this only happens at process exit
            if sent.is_err() {
                break;
            }
        }
    });
}

impl TermInput for StdioInput {
    fn is_terminal(&self) -> bool {
        self.is_tty
    }

    fn read_byte(&mut self, deadline: Option<Instant>) -> io::Result<ReadOutcome> {
        let rx = self.receiver().lock().unwrap_or_else(PoisonError::into_inner);
        let received = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                rx.recv_timeout(remaining)
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Ok(byte)) => Ok(ReadOutcome::Byte(byte)),
            Ok(Err(e)) => Err(e),
            Err(RecvTimeoutError::Timeout) => Ok(ReadOutcome::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Ok(ReadOutcome::Eof),
        }
    }

    fn discard_pending(&mut self) -> usize {
        let rx = self.receiver().lock().unwrap_or_else(PoisonError::into_inner);
        let mut discarded = 0;
        while let Ok(Ok(_)) = rx.try_recv() {
            discarded += 1;
        }
        discarded
    }
}

/// In-memory reply source for tests and for replaying captured replies
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    bytes: VecDeque<u8>,
    is_tty: bool,
    stall_when_empty: bool,
}

impl ScriptedInput {
    /// An interactive source that yields `bytes` and then reports end of input
    pub fn terminal(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            bytes: bytes.as_ref().iter().copied().collect(),
            is_tty: true,
            stall_when_empty: false,
        }
    }

    /// A redirected, non-interactive source
    pub fn redirected(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            is_tty: false,
            ..Self::terminal(bytes)
        }
    }

    /// Once drained, report a timeout instead of end of input, like a
    /// terminal that ignores a request
    pub fn stalling(mut self) -> Self {
        self.stall_when_empty = true;
        self
    }

    /// Queue more bytes, e.g. the reply to the next request
    pub fn push(&mut self, bytes: impl AsRef<[u8]>) {
        self.bytes.extend(bytes.as_ref().iter().copied());
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }
}

impl TermInput for ScriptedInput {
    fn is_terminal(&self) -> bool {
        self.is_tty
    }

    fn read_byte(&mut self, _deadline: Option<Instant>) -> io::Result<ReadOutcome> {
        Ok(match self.bytes.pop_front() {
            Some(byte) => ReadOutcome::Byte(byte),
            None if self.stall_when_empty => ReadOutcome::TimedOut,
            None => ReadOutcome::Eof,
        })
    }
}
