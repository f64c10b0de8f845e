//! Register transport abstraction
//!
//! The only way the driver touches the accelerator. A transport moves 32-bit
//! words to and from byte offsets inside the IP's register window and owns
//! whatever mapping makes that possible.
//!
//! Offsets reaching a transport have already been validated by
//! [`RegisterMap`](crate::RegisterMap); backends still bounds-check and treat
//! stray accesses as no-ops.

use std::fmt::{self, Debug};

/// Raw 32-bit register access over a bounded address range.
pub trait RegisterTransport: Debug + Send {
    /// Read the word at `offset` (bytes from the IP base).
    fn read32(&self, offset: usize) -> u32;

    /// Write `value` to the word at `offset`.
    fn write32(&mut self, offset: usize, value: u32);

    /// Backend type, for logs.
    fn kind(&self) -> TransportKind;
}

/// Transport backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Physical registers mapped from `/dev/mem` or a UIO node
    Mmap,

    /// Plain in-memory register file, no behaviour
    Memory,

    /// Software model of the calculator IP
    Simulated,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mmap => write!(f, "MMIO"),
            Self::Memory => write!(f, "Memory"),
            Self::Simulated => write!(f, "Simulated"),
        }
    }
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for Box<T> {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }

    fn kind(&self) -> TransportKind {
        (**self).kind()
    }
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for &mut T {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }

    fn kind(&self) -> TransportKind {
        (**self).kind()
    }
}
