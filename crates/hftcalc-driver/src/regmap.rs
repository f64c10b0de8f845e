//! Register map validation and decoded register words
//!
//! Pure lookups over [`hftcalc_chip::regs`]. Nothing here touches hardware.

use crate::error::{CalcError, Result};
use hftcalc_chip::regs::{self, buffer_ctrl, control, status, Register};
use hftcalc_chip::Operation;

/// Static knowledge of the calculator register window.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterMap;

impl RegisterMap {
    /// Check that `offset` addresses a word inside the register window.
    ///
    /// # Errors
    ///
    /// Returns `OffsetOutOfRange` for offsets past `VERSION` or not word
    /// aligned. The caller must not attempt the access.
    pub fn validate(offset: usize) -> Result<()> {
        if regs::is_valid_offset(offset) {
            Ok(())
        } else {
            Err(CalcError::OffsetOutOfRange {
                offset,
                max: regs::MAX_OFFSET,
            })
        }
    }

    /// Documented register at `offset`, if any.
    pub fn register(offset: usize) -> Option<&'static Register> {
        regs::lookup(offset)
    }

    /// A write to `offset` is expected to read back unchanged.
    pub fn stable_readback(offset: usize) -> bool {
        Self::register(offset).is_some_and(Register::stable_readback)
    }

    /// Bits of a write to `offset` that must read back unchanged.
    ///
    /// The `BUFFER_CTRL` reset strobe may self-clear, so only the window
    /// field is compared there.
    pub const fn readback_mask(offset: usize) -> u32 {
        match offset {
            regs::BUFFER_CTRL => buffer_ctrl::WINDOW_MASK,
            _ => u32::MAX,
        }
    }

    /// Read-back `readback` is consistent with having written `written`.
    pub const fn readback_matches(offset: usize, written: u32, readback: u32) -> bool {
        let mask = Self::readback_mask(offset);
        written & mask == readback & mask
    }

    /// Register whose contents the buffer mirror tracks; only the buffer
    /// manager may write it.
    pub const fn is_buffer_managed(offset: usize) -> bool {
        matches!(offset, regs::BUFFER_CTRL | regs::BUFFER_WRITE)
    }

    /// Offsets of every word in the window, in order.
    pub fn offsets() -> impl Iterator<Item = usize> {
        (0..regs::WORD_COUNT).map(|i| i * regs::WORD_BYTES)
    }
}

/// Command word written to `CONTROL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlWord {
    /// Start strobe
    pub start: bool,
    /// Operation to run
    pub operation: Operation,
}

impl ControlWord {
    /// Control word that launches `operation`.
    pub const fn start(operation: Operation) -> Self {
        Self {
            start: true,
            operation,
        }
    }

    /// Register encoding.
    pub const fn bits(self) -> u32 {
        control::encode(self.start, self.operation.code())
    }
}

/// Decoded snapshot of `STATUS`. Valid only for the read that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusWord {
    /// Command in progress
    pub busy: bool,
    /// Last command failed
    pub error: bool,
    /// Last command completed
    pub done: bool,
    /// Price buffer at capacity
    pub buffer_full: bool,
}

impl StatusWord {
    /// Decode a raw `STATUS` word.
    pub const fn from_bits(word: u32) -> Self {
        Self {
            busy: word & status::BUSY != 0,
            error: word & status::ERROR != 0,
            done: word & status::DONE != 0,
            buffer_full: word & status::BUF_FULL != 0,
        }
    }

    /// Raw encoding.
    pub const fn bits(self) -> u32 {
        let mut w = 0;
        if self.busy {
            w |= status::BUSY;
        }
        if self.error {
            w |= status::ERROR;
        }
        if self.done {
            w |= status::DONE;
        }
        if self.buffer_full {
            w |= status::BUF_FULL;
        }
        w
    }

    /// The command has finished, successfully or not.
    pub const fn is_complete(self) -> bool {
        self.done || !self.busy
    }
}
