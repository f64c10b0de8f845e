//! Register transport backends
//!
//! - **Mmap**: physical registers through `/dev/mem` or a UIO node
//! - **Memory**: plain register file, no behaviour (unit tests)
//! - **Simulated**: software model of the calculator IP (development, CI)

pub mod memory;
pub mod mmap;
pub mod simulated;

pub use memory::RegisterFile;
pub use mmap::MmapTransport;
pub use simulated::SimulatedCalculator;
