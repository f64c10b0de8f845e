//! Validated register I/O
//!
//! Wraps a [`RegisterTransport`] so every access is checked against the
//! register map and traced. Out-of-range accesses are logged and dropped
//! (reads yield 0): they indicate a bug in the layer above, not a condition
//! callers branch on.

use crate::regmap::{RegisterMap, StatusWord};
use crate::transport::RegisterTransport;
use hftcalc_chip::regs;
use std::fmt;

/// Register I/O handler
///
/// Owns the transport for the lifetime of an initialized driver.
#[derive(Debug)]
pub struct RegisterIo<T> {
    transport: T,
    verify_writes: bool,
}

impl<T: RegisterTransport> RegisterIo<T> {
    /// Create a handler over `transport`.
    ///
    /// With `verify_writes`, every write to a register that hardware does not
    /// mutate is read back and a mismatch is logged.
    pub const fn new(transport: T, verify_writes: bool) -> Self {
        Self {
            transport,
            verify_writes,
        }
    }

    /// Read a register.
    pub fn read(&self, offset: usize) -> u32 {
        if let Err(e) = RegisterMap::validate(offset) {
            tracing::warn!("Dropped register read: {e}");
            return 0;
        }
        let value = self.transport.read32(offset);
        tracing::trace!("REG READ  {:<12} @ {offset:#04x} = {value:#010x}", regs::name(offset));
        value
    }

    /// Write a register.
    pub fn write(&mut self, offset: usize, value: u32) {
        if let Err(e) = RegisterMap::validate(offset) {
            tracing::warn!("Dropped register write of {value:#010x}: {e}");
            return;
        }
        tracing::trace!("REG WRITE {:<12} @ {offset:#04x} = {value:#010x}", regs::name(offset));
        self.transport.write32(offset, value);

        if self.verify_writes && RegisterMap::stable_readback(offset) {
            let readback = self.transport.read32(offset);
            if !RegisterMap::readback_matches(offset, value, readback) {
                tracing::error!(
                    "Register write verification failed at {} ({offset:#04x}): wrote {value:#010x}, read {readback:#010x}",
                    regs::name(offset)
                );
            }
        }
    }

    /// Read an IEEE-754 single from a register.
    pub fn read_f32(&self, offset: usize) -> f32 {
        f32::from_bits(self.read(offset))
    }

    /// Write an IEEE-754 single to a register, bit for bit.
    pub fn write_f32(&mut self, offset: usize, value: f32) {
        self.write(offset, value.to_bits());
    }

    /// Read and decode `STATUS`.
    pub fn status(&self) -> StatusWord {
        StatusWord::from_bits(self.read(regs::STATUS))
    }

    /// Read every word of the register window.
    pub fn snapshot(&self) -> RegisterSnapshot {
        let mut words = [0u32; regs::WORD_COUNT];
        for (slot, offset) in words.iter_mut().zip(RegisterMap::offsets()) {
            *slot = self.transport.read32(offset);
        }
        RegisterSnapshot { words }
    }

    /// Borrow the transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Borrow the transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give back the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

/// All sixteen register words captured at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSnapshot {
    words: [u32; regs::WORD_COUNT],
}

impl RegisterSnapshot {
    /// Word at byte `offset`, if inside the window.
    pub fn get(&self, offset: usize) -> Option<u32> {
        RegisterMap::validate(offset).ok()?;
        self.words.get(offset / regs::WORD_BYTES).copied()
    }

    /// Raw words in offset order.
    pub const fn words(&self) -> &[u32; regs::WORD_COUNT] {
        &self.words
    }

    /// Emit the snapshot under `label` at error level.
    pub fn log_error(&self, label: &str) {
        tracing::error!("{label}:\n{self}");
    }

    /// Emit the snapshot under `label` at trace level.
    pub fn log_trace(&self, label: &str) {
        tracing::trace!("{label}:\n{self}");
    }
}

impl fmt::Display for RegisterSnapshot {
    /// One line per word: offset, name, hex, decimal, and the word read as f32.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (offset, &value) in RegisterMap::offsets().zip(self.words.iter()) {
            let as_float = f32::from_bits(value);
            writeln!(
                f,
                "  [{offset:02X}] {:<12} 0x{value:08X}  {value:>10}  {as_float:+.6e}",
                regs::name(offset)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{RegisterFile, SimulatedCalculator};
    use hftcalc_chip::regs::buffer_ctrl;

    #[test]
    fn out_of_range_access_is_a_noop() {
        let mut io = RegisterIo::new(RegisterFile::new(), true);
        io.write(0x40, 0xDEAD_BEEF);
        assert_eq!(io.read(0x40), 0);
        assert!(io.snapshot().words().iter().all(|&w| w == 0));
    }

    #[test]
    fn float_bits_are_exact() {
        let mut io = RegisterIo::new(RegisterFile::new(), true);
        for v in [0.0f32, -0.0, 1.5, -3.25e-12, f32::MAX, f32::MIN_POSITIVE] {
            io.write_f32(regs::OPERAND_A, v);
            assert_eq!(io.read(regs::OPERAND_A), v.to_bits());
            assert_eq!(io.read_f32(regs::OPERAND_A).to_bits(), v.to_bits());
        }
    }

    #[test]
    fn buffer_ctrl_full_word_round_trip() {
        let mut io = RegisterIo::new(RegisterFile::new(), true);
        for word in [0x0000_00C8, 0x0001_0005, 0x0000_FFFF, 0] {
            io.write(regs::BUFFER_CTRL, word);
            assert_eq!(io.read(regs::BUFFER_CTRL), word);
        }
    }

    #[test]
    fn self_clearing_strobe_keeps_window() {
        let mut io = RegisterIo::new(SimulatedCalculator::new(), true);
        io.write(regs::BUFFER_CTRL, buffer_ctrl::encode(7, true));
        assert_eq!(io.read(regs::BUFFER_CTRL), buffer_ctrl::encode(7, false));
        io.write(regs::BUFFER_CTRL, buffer_ctrl::encode(200, false));
        assert_eq!(io.read(regs::BUFFER_CTRL), 200);
    }

    #[test]
    fn snapshot_layout() {
        let mut io = RegisterIo::new(RegisterFile::new(), false);
        io.write(regs::VERSION, 0x0001_0002);
        io.write(regs::EMA_ALPHA, 0.5f32.to_bits());
        let snap = io.snapshot();
        assert_eq!(snap.get(regs::VERSION), Some(0x0001_0002));
        assert_eq!(snap.get(0x44), None);
        let text = snap.to_string();
        assert_eq!(text.lines().count(), 16);
        assert!(text.contains("EMA_ALPHA    0x3F000000"));
    }
}
