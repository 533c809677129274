//! Last-commanded display modes
//!
//! These flags mirror what was last *sent* to the terminal. A terminal is free
//! to ignore IRM or DECTCEM, so the values can diverge from what is actually
//! on screen; nothing here reads the state back.

use std::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeFlags: u8 {
        const REPLACING      = 0b0000_0001;
        const CURSOR_VISIBLE = 0b0000_0010;
    }
}

impl Default for ModeFlags {
    fn default() -> Self {
        // Terminals start in replace-off (as far as we track it) with the cursor shown
        ModeFlags::CURSOR_VISIBLE
    }
}

/// Display mode flags owned by an [`Emitter`](crate::core::Emitter).
///
/// Only the owning emitter writes; any thread holding a shared reference may read.
#[derive(Debug)]
pub struct DisplayModes {
    bits: AtomicU8,
}

impl Default for DisplayModes {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayModes {
    pub fn new() -> Self {
        Self {
            bits: AtomicU8::new(ModeFlags::default().bits()),
        }
    }

    pub fn snapshot(&self) -> ModeFlags {
        ModeFlags::from_bits_truncate(self.bits.load(Ordering::Acquire))
    }

    pub fn is_replacing_mode(&self) -> bool {
        self.snapshot().contains(ModeFlags::REPLACING)
    }

    pub fn is_cursor_visible(&self) -> bool {
        self.snapshot().contains(ModeFlags::CURSOR_VISIBLE)
    }

    pub(crate) fn set(&self, flag: ModeFlags, value: bool) {
        if value {
            self.bits.fetch_or(flag.bits(), Ordering::AcqRel);
        } else {
            self.bits.fetch_and(!flag.bits(), Ordering::AcqRel);
        }
    }
}
