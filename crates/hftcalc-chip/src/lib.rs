//! Silicon model for the HFT calculator FPGA IP.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the IP: register offsets and bit fields, operation codes,
//! price-buffer limits, and where the IP sits behind the HPS bridge.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Register map, access modes, bit-field encoders |
//! | [`opcode`] | [`Operation`] enumeration (arithmetic + statistics) |
//! | [`buffer`] | Circular price buffer capacity, window and alpha limits |
//! | [`bridge`] | DE10-Nano lightweight bridge addresses |
//! | [`version`] | `VERSION` register decoding and presence check |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod bridge;
pub mod buffer;
pub mod opcode;
pub mod regs;
pub mod version;

pub use opcode::{Operation, UnknownMnemonic, UnknownOpcode};
pub use version::IpVersion;
