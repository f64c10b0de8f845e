//! Driver and mapping configuration
//!
//! Defaults reproduce the DE10-Nano reference design: calculator IP 512 KB
//! into the lightweight bridge, a one-million poll budget with a 1 µs pause.

use hftcalc_chip::{bridge, buffer};
use std::path::PathBuf;
use std::time::Duration;

/// Polling budget used when none is configured.
pub const DEFAULT_MAX_POLLS: u32 = 1_000_000;

/// Pause between status polls used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(1);

/// Protocol-level configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Status reads before a command is declared timed out
    pub max_polls: u32,

    /// Pause between status reads (zero spins)
    pub poll_interval: Duration,

    /// Reject the device unless `VERSION` reads exactly this
    pub expected_version: Option<u32>,

    /// Read back registers after writing and log mismatches
    pub verify_writes: bool,

    /// Price buffer capacity of the synthesized IP
    pub buffer_capacity: u16,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_polls: DEFAULT_MAX_POLLS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            expected_version: None,
            verify_writes: true,
            buffer_capacity: buffer::CAPACITY,
        }
    }
}

impl DriverConfig {
    /// Set the polling budget.
    #[must_use]
    pub const fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Set the pause between polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Require an exact `VERSION` word at init.
    #[must_use]
    pub const fn with_expected_version(mut self, version: u32) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Enable or disable write read-back verification.
    #[must_use]
    pub const fn with_verify_writes(mut self, verify: bool) -> Self {
        self.verify_writes = verify;
        self
    }

    /// Override the price buffer capacity (clamped to the register field).
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: u16) -> Self {
        self.buffer_capacity = capacity.clamp(buffer::MIN_WINDOW, buffer::MAX_WINDOW);
        self
    }

    /// Fast settings for tests and the simulator: small budget, no sleeping.
    pub fn simulated() -> Self {
        Self::default()
            .with_max_polls(10_000)
            .with_poll_interval(Duration::ZERO)
    }
}

/// Where the register window lives in physical memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapConfig {
    /// Device node to map (`/dev/mem` or `/dev/uioN`)
    pub device: PathBuf,

    /// Offset into the device node of the mapped region
    pub map_offset: u64,

    /// Length of the mapped region
    pub map_span: usize,

    /// Offset of the calculator registers inside the mapped region
    pub register_offset: usize,

    /// Open with `O_SYNC` (uncached access through `/dev/mem`)
    pub sync: bool,
}

impl MapConfig {
    /// Whole lightweight bridge through `/dev/mem`, calculator at `offset`.
    pub fn dev_mem(bridge_offset: usize) -> Self {
        Self {
            device: PathBuf::from("/dev/mem"),
            map_offset: bridge::lw_bridge::BASE,
            map_span: bridge::lw_bridge::SPAN,
            register_offset: bridge::in_bridge(bridge_offset),
            sync: true,
        }
    }

    /// DE10-Nano reference placement.
    pub fn de10_nano() -> Self {
        Self::dev_mem(bridge::CALCULATOR_OFFSET)
    }

    /// UIO node exporting only the calculator register window.
    pub fn uio(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            map_offset: 0,
            map_span: bridge::CALCULATOR_SPAN,
            register_offset: 0,
            sync: false,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::de10_nano()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_design() {
        let cfg = DriverConfig::default();
        assert_eq!(cfg.max_polls, 1_000_000);
        assert_eq!(cfg.buffer_capacity, 256);
        let map = MapConfig::default();
        assert_eq!(map.map_offset, 0xFF20_0000);
        assert_eq!(map.register_offset, 0x8_0000);
        assert!(map.sync);
    }

    #[test]
    fn builders() {
        let cfg = DriverConfig::default()
            .with_max_polls(5)
            .with_expected_version(0x0001_0000)
            .with_buffer_capacity(0);
        assert_eq!(cfg.max_polls, 5);
        assert_eq!(cfg.expected_version, Some(0x0001_0000));
        assert_eq!(cfg.buffer_capacity, 1);
        assert_eq!(DriverConfig::default().with_buffer_capacity(1000).buffer_capacity, 256);
    }

    #[test]
    fn uio_maps_register_window_only() {
        let map = MapConfig::uio("/dev/uio0");
        assert_eq!(map.map_span, 0x40);
        assert_eq!(map.register_offset, 0);
    }
}
