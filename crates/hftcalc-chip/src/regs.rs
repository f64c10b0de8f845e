//! Register map of the HFT calculator IP.
//!
//! Sixteen 32-bit words starting at the IP base. Offsets are in bytes.
//!
//! ```text
//! 0x00  CONTROL       R/W  [31]=start, [3:0]=opcode
//! 0x04  OPERAND_A     R/W  f32 bits
//! 0x08  OPERAND_B     R/W  f32 bits (or window size)
//! 0x0C  RESULT        R    f32 bits
//! 0x10  STATUS        R    [0]=busy [1]=error [2]=done [3]=buf_full
//! 0x14  INT_ENABLE    R/W  [0]=interrupt enable
//! 0x18  BUFFER_CTRL   R/W  [15:0]=window_size, [16]=reset_buffer
//! 0x1C  BUFFER_WRITE  W    push price into the circular buffer
//! 0x20  BUFFER_COUNT  R    current fill count
//! 0x24  EMA_ALPHA     R/W  f32 bits
//! 0x28  CONFIG_FLAGS  R/W  configuration bits
//! 0x2C  ERROR_CODE    R    detailed error cause
//! 0x3C  VERSION       R    IP version marker
//! ```
//!
//! 0x30–0x38 are unassigned but decode inside the register window; reads
//! return whatever the fabric drives (zero on the reference bitstream).

// ── Command ──────────────────────────────────────────────────────────────────

/// Control register: start bit and opcode.
pub const CONTROL: usize = 0x00;
/// Operand A (IEEE-754 single bit pattern).
pub const OPERAND_A: usize = 0x04;
/// Operand B (IEEE-754 single bit pattern, window size for statistics).
pub const OPERAND_B: usize = 0x08;
/// Result (IEEE-754 single bit pattern).
pub const RESULT: usize = 0x0C;

// ── Status and interrupts ────────────────────────────────────────────────────

/// Status register.
pub const STATUS: usize = 0x10;
/// Interrupt enable.
pub const INT_ENABLE: usize = 0x14;

// ── Price buffer ─────────────────────────────────────────────────────────────

/// Buffer control: window size and reset strobe.
pub const BUFFER_CTRL: usize = 0x18;
/// Price push port.
pub const BUFFER_WRITE: usize = 0x1C;
/// Number of prices currently held.
pub const BUFFER_COUNT: usize = 0x20;
/// EMA smoothing factor.
pub const EMA_ALPHA: usize = 0x24;

// ── Misc ─────────────────────────────────────────────────────────────────────

/// Configuration flags. No bits are defined by the current IP revision.
pub const CONFIG_FLAGS: usize = 0x28;
/// Detailed error cause, valid while `status::ERROR` is set.
pub const ERROR_CODE: usize = 0x2C;
/// IP version marker.
pub const VERSION: usize = 0x3C;

/// Highest valid register offset.
pub const MAX_OFFSET: usize = VERSION;
/// Register width in bytes.
pub const WORD_BYTES: usize = 4;
/// Number of 32-bit words in the register window.
pub const WORD_COUNT: usize = MAX_OFFSET / WORD_BYTES + 1;
/// Size of the register window in bytes.
pub const WINDOW_BYTES: usize = WORD_COUNT * WORD_BYTES;

/// Host access permitted on a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Host may only read.
    ReadOnly,
    /// Host may only write; reads return undefined data.
    WriteOnly,
    /// Host may read and write.
    ReadWrite,
}

impl Access {
    /// Host reads return meaningful data.
    pub const fn readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    /// Host writes reach the hardware.
    pub const fn writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// Static description of one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    /// Byte offset from the IP base.
    pub offset: usize,
    /// Mnemonic as used in the IP documentation.
    pub name: &'static str,
    /// Host access mode.
    pub access: Access,
    /// Hardware may change the value behind the host's back (self-clearing
    /// bits, computed outputs). A write to such a register need not read back.
    pub hw_mutated: bool,
}

impl Register {
    const fn new(offset: usize, name: &'static str, access: Access, hw_mutated: bool) -> Self {
        Self {
            offset,
            name,
            access,
            hw_mutated,
        }
    }

    /// A write is expected to read back unchanged.
    pub const fn stable_readback(&self) -> bool {
        self.access.readable() && self.access.writable() && !self.hw_mutated
    }
}

/// Every documented register, in offset order.
pub const REGISTERS: [Register; 13] = [
    Register::new(CONTROL, "CONTROL", Access::ReadWrite, true),
    Register::new(OPERAND_A, "OPERAND_A", Access::ReadWrite, false),
    Register::new(OPERAND_B, "OPERAND_B", Access::ReadWrite, false),
    Register::new(RESULT, "RESULT", Access::ReadOnly, true),
    Register::new(STATUS, "STATUS", Access::ReadOnly, true),
    Register::new(INT_ENABLE, "INT_ENABLE", Access::ReadWrite, false),
    Register::new(BUFFER_CTRL, "BUFFER_CTRL", Access::ReadWrite, false),
    Register::new(BUFFER_WRITE, "BUFFER_WRITE", Access::WriteOnly, false),
    Register::new(BUFFER_COUNT, "BUFFER_COUNT", Access::ReadOnly, true),
    Register::new(EMA_ALPHA, "EMA_ALPHA", Access::ReadWrite, false),
    Register::new(CONFIG_FLAGS, "CONFIG_FLAGS", Access::ReadWrite, false),
    Register::new(ERROR_CODE, "ERROR_CODE", Access::ReadOnly, true),
    Register::new(VERSION, "VERSION", Access::ReadOnly, false),
];

/// Offset lies inside the register window and is word aligned.
pub const fn is_valid_offset(offset: usize) -> bool {
    offset <= MAX_OFFSET && offset % WORD_BYTES == 0
}

/// Look up the documented register at `offset`.
pub fn lookup(offset: usize) -> Option<&'static Register> {
    REGISTERS.iter().find(|r| r.offset == offset)
}

/// Register mnemonic, or `"RESERVED"` for an undocumented word.
pub fn name(offset: usize) -> &'static str {
    lookup(offset).map_or("RESERVED", |r| r.name)
}

// ── Control register bit definitions ─────────────────────────────────────────

pub mod control {
    /// Bit position of the start strobe.
    pub const START_BIT: u32 = 31;
    /// Start strobe. Hardware clears it after latching the command.
    pub const START: u32 = 1 << START_BIT;
    /// Opcode field.
    pub const OP_MASK: u32 = 0xF;

    /// Compose a control word.
    pub const fn encode(start: bool, opcode: u8) -> u32 {
        let op = opcode as u32 & OP_MASK;
        if start {
            START | op
        } else {
            op
        }
    }

    /// Opcode field of a control word.
    pub const fn opcode(word: u32) -> u8 {
        (word & OP_MASK) as u8
    }

    /// Start strobe of a control word.
    pub const fn is_start(word: u32) -> bool {
        word & START != 0
    }
}

// ── Status register bit definitions ──────────────────────────────────────────

pub mod status {
    /// Command in progress.
    pub const BUSY: u32 = 1 << 0;
    /// Last command failed; see `ERROR_CODE`.
    pub const ERROR: u32 = 1 << 1;
    /// Last command completed.
    pub const DONE: u32 = 1 << 2;
    /// Price buffer holds `buffer::CAPACITY` entries.
    pub const BUF_FULL: u32 = 1 << 3;
}

// ── Interrupt enable bit definitions ─────────────────────────────────────────

pub mod int_enable {
    /// Raise the IRQ line on completion.
    pub const ENABLE: u32 = 1 << 0;
}

// ── Buffer control bit definitions ───────────────────────────────────────────

pub mod buffer_ctrl {
    /// Window size field.
    pub const WINDOW_MASK: u32 = 0xFFFF;
    /// Reset strobe: clears the circular buffer and its fill count.
    pub const RESET: u32 = 1 << 16;

    /// Compose a buffer control word.
    pub const fn encode(window_size: u16, reset: bool) -> u32 {
        let w = window_size as u32 & WINDOW_MASK;
        if reset {
            w | RESET
        } else {
            w
        }
    }

    /// Window size field of a buffer control word.
    pub const fn window_size(word: u32) -> u16 {
        (word & WINDOW_MASK) as u16
    }

    /// Reset strobe of a buffer control word.
    pub const fn is_reset(word: u32) -> bool {
        word & RESET != 0
    }
}
