//! Plain in-memory register file

use crate::transport::{RegisterTransport, TransportKind};
use hftcalc_chip::regs;

/// Sixteen words of storage that read back whatever was last written.
///
/// Nothing reacts to writes: `STATUS` stays idle, `BUFFER_COUNT` never moves
/// and `VERSION` reads zero unless a test pokes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    words: [u32; regs::WORD_COUNT],
}

impl RegisterFile {
    /// All-zero register file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value at `offset` (0 outside the window).
    pub fn peek(&self, offset: usize) -> u32 {
        Self::index(offset).map_or(0, |i| self.words[i])
    }

    /// Set the value at `offset`, bypassing the register map.
    pub fn poke(&mut self, offset: usize, value: u32) {
        if let Some(i) = Self::index(offset) {
            self.words[i] = value;
        }
    }

    fn index(offset: usize) -> Option<usize> {
        regs::is_valid_offset(offset).then_some(offset / regs::WORD_BYTES)
    }
}

impl RegisterTransport for RegisterFile {
    fn read32(&self, offset: usize) -> u32 {
        self.peek(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        self.poke(offset, value);
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_words() {
        let mut rf = RegisterFile::new();
        rf.write32(regs::OPERAND_A, 0xDEAD_BEEF);
        assert_eq!(rf.read32(regs::OPERAND_A), 0xDEAD_BEEF);
        assert_eq!(rf.read32(regs::STATUS), 0);
    }

    #[test]
    fn out_of_window_ignored() {
        let mut rf = RegisterFile::new();
        rf.poke(0x40, 1);
        rf.poke(0x06, 1);
        assert_eq!(rf, RegisterFile::new());
        assert_eq!(rf.peek(0x40), 0);
    }
}
