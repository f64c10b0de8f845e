//! Pure Rust host driver for the HFT calculator accelerator.
//!
//! The calculator is a memory-mapped FPGA IP on the lightweight HPS-to-FPGA
//! bridge. It does single-precision arithmetic and windowed market
//! statistics over a 256-entry price buffer it keeps in fabric.
//!
//! # Layers
//!
//! ```text
//! Calculator          lifecycle, validation, desync tracking     (device)
//!   ├─ BufferManager  fill count / window / alpha mirror         (buffer)
//!   └─ CommandDispatcher
//!        └─ CompletionWaiter  bounded STATUS polling             (waiter)
//! RegisterIo          offset validation, tracing, write verify   (io)
//! RegisterTransport   MmapTransport | SimulatedCalculator | RegisterFile
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use hftcalc_driver::{Calculator, DriverConfig, MapConfig, Operation};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut calc = Calculator::open(&MapConfig::de10_nano(), DriverConfig::default())?;
//!
//! let sum = calc.perform_operation(Operation::Add, 1.0, 2.0)?;
//! println!("1 + 2 = {sum}");
//!
//! calc.write_prices(&[100.0, 101.5, 99.8, 102.3, 101.1])?;
//! println!("SMA(5) = {}", calc.sma(5)?);
//! # Ok(())
//! # }
//! ```
//!
//! Without hardware, swap the transport:
//!
//! ```
//! use hftcalc_driver::{Calculator, DriverConfig, SimulatedCalculator};
//!
//! let mut calc = Calculator::init(SimulatedCalculator::new(), DriverConfig::simulated()).unwrap();
//! calc.write_prices(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! assert!((calc.sma(5).unwrap() - 3.0).abs() < 1e-6);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod backends;
mod buffer;
mod config;
mod device;
mod dispatch;
mod error;
mod io;
mod regmap;
mod transport;
pub mod waiter;

pub use backends::{MmapTransport, RegisterFile, SimulatedCalculator};
pub use buffer::{BufferManager, BufferState};
pub use config::{DriverConfig, MapConfig, DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL};
pub use device::Calculator;
pub use dispatch::CommandDispatcher;
pub use error::{CalcError, Result};
pub use io::{RegisterIo, RegisterSnapshot};
pub use regmap::{ControlWord, RegisterMap, StatusWord};
pub use transport::{RegisterTransport, TransportKind};
pub use waiter::CompletionWaiter;

/// Register layout and opcode definitions (re-exported from hftcalc-chip).
pub use hftcalc_chip::{regs, IpVersion, Operation, UnknownMnemonic, UnknownOpcode};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        CalcError, Calculator, DriverConfig, MapConfig, Operation, RegisterTransport, Result,
        SimulatedCalculator, StatusWord,
    };
}
