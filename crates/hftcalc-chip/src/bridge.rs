//! Physical placement of the calculator IP on the DE10-Nano (Cyclone V SoC).
//!
//! The IP hangs off the HPS-to-FPGA lightweight bridge. The reference Qsys
//! design places it 512 KB into the bridge window.
//!
//! ```text
//! Region                 Physical     Span
//! ────────────────────── ──────────── ────────
//! LW HPS-to-FPGA bridge  0xFF200000   2 MB
//! calculator_0           0xFF280000   64 B  (16 × 32-bit registers)
//! ```
//!
//! A regenerated Qsys system may move `calculator_0`; the driver takes the
//! offset as configuration and only uses these values as defaults.

use crate::regs;

/// Lightweight HPS-to-FPGA bridge.
pub mod lw_bridge {
    /// Physical base address.
    pub const BASE: u64 = 0xFF20_0000;
    /// Size of the bridge window in bytes.
    pub const SPAN: usize = 0x0020_0000;
    /// Mask that reduces a bridge-relative address into the window.
    pub const MASK: usize = SPAN - 1;
}

/// Default bridge-relative offset of `calculator_0`.
pub const CALCULATOR_OFFSET: usize = 0x0008_0000;

/// Default physical address of the calculator register window.
pub const CALCULATOR_BASE: u64 = lw_bridge::BASE + CALCULATOR_OFFSET as u64;

/// Bytes of register space the IP decodes.
pub const CALCULATOR_SPAN: usize = regs::WINDOW_BYTES;

/// Offset `offset` from the start of a mapping of the full bridge.
pub const fn in_bridge(offset: usize) -> usize {
    offset & lw_bridge::MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculator_sits_inside_bridge() {
        assert_eq!(CALCULATOR_BASE, 0xFF28_0000);
        assert!(in_bridge(CALCULATOR_OFFSET) + CALCULATOR_SPAN <= lw_bridge::SPAN);
    }
}
