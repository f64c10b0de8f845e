//! Calculator handle and operations
//!
//! [`Calculator`] is the owned driver handle: `init` hands it out, every
//! operation goes through it, `cleanup` (or drop) releases the transport.
//! After cleanup every hardware operation fails with `NotInitialized` and no
//! memory is touched.
//!
//! # Concurrency
//!
//! The accelerator runs one command at a time and the handle has no internal
//! locking. Hardware operations take `&mut self`; to share a calculator
//! between threads put it behind a `Mutex` and hold the lock for the whole
//! operation.

use crate::backends::MmapTransport;
use crate::buffer::{BufferManager, BufferState};
use crate::config::{DriverConfig, MapConfig};
use crate::dispatch::CommandDispatcher;
use crate::error::{CalcError, Result};
use crate::io::{RegisterIo, RegisterSnapshot};
use crate::regmap::{RegisterMap, StatusWord};
use crate::transport::RegisterTransport;
use crate::waiter::CompletionWaiter;
use hftcalc_chip::regs::{self, int_enable};
use hftcalc_chip::{version, IpVersion, Operation};

/// Driver handle for one calculator IP instance.
#[derive(Debug)]
pub struct Calculator<T: RegisterTransport> {
    io: Option<RegisterIo<T>>,
    dispatcher: CommandDispatcher,
    buffer: BufferManager,
    config: DriverConfig,
    version: u32,
    desynchronized: bool,
}

impl Calculator<MmapTransport> {
    /// Map the registers described by `map` and initialize.
    ///
    /// # Errors
    ///
    /// Returns error if the device node cannot be mapped or no calculator
    /// answers at the configured address.
    pub fn open(map: &MapConfig, config: DriverConfig) -> Result<Self> {
        let transport = MmapTransport::open(map)?;
        Self::init(transport, config)
    }
}

impl<T: RegisterTransport> Calculator<T> {
    /// Take ownership of `transport` and bring the IP to a known state.
    ///
    /// Checks the `VERSION` marker, disables interrupts, and resets the price
    /// buffer so the host mirror starts empty.
    ///
    /// # Errors
    ///
    /// - `DeviceNotPresent` when `VERSION` reads all-zeros or all-ones.
    /// - `VersionMismatch` when `config.expected_version` is set and differs.
    pub fn init(transport: T, config: DriverConfig) -> Result<Self> {
        tracing::info!("Initializing calculator driver ({} transport)...", transport.kind());

        let mut io = RegisterIo::new(transport, config.verify_writes);

        let raw_version = io.read(regs::VERSION);
        if !version::is_present(raw_version) {
            tracing::error!("No calculator at configured address (VERSION={raw_version:#010x})");
            return Err(CalcError::DeviceNotPresent {
                version: raw_version,
            });
        }
        if let Some(expected) = config.expected_version {
            if raw_version != expected {
                return Err(CalcError::VersionMismatch {
                    found: raw_version,
                    expected,
                });
            }
        }

        io.snapshot().log_trace("Initial register state");

        let dispatcher =
            CommandDispatcher::new(CompletionWaiter::new(config.max_polls, config.poll_interval));
        let mut buffer = BufferManager::new(config.buffer_capacity);

        io.write(regs::INT_ENABLE, 0);
        buffer.reset(&mut io);

        if let Some(v) = IpVersion::from_register(raw_version) {
            tracing::info!("Calculator driver initialized: IP {v} ({raw_version:#010x})");
        }
        tracing::debug!(
            "Polling budget {} × {:?}, buffer capacity {}",
            config.max_polls,
            config.poll_interval,
            config.buffer_capacity
        );

        Ok(Self {
            io: Some(io),
            dispatcher,
            buffer,
            config,
            version: raw_version,
            desynchronized: false,
        })
    }

    /// Release the transport. Later hardware operations fail with
    /// `NotInitialized`. Calling it twice is harmless.
    pub fn cleanup(&mut self) -> Option<T> {
        let io = self.io.take();
        if io.is_some() {
            tracing::info!("Calculator driver cleanup complete");
        } else {
            tracing::debug!("Calculator already cleaned up");
        }
        io.map(RegisterIo::into_inner)
    }

    /// The transport is held.
    pub const fn is_initialized(&self) -> bool {
        self.io.is_some()
    }

    /// A timeout left the hardware in an unknown state.
    pub const fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    /// Configuration in effect.
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Host mirror of the price buffer.
    pub const fn buffer_state(&self) -> &BufferState {
        self.buffer.state()
    }

    /// Borrow the transport (e.g. to inspect a simulator).
    pub fn transport(&self) -> Option<&T> {
        self.io.as_ref().map(RegisterIo::transport)
    }

    /// Borrow the transport mutably (e.g. to inject simulator faults).
    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.io.as_mut().map(RegisterIo::transport_mut)
    }

    // ── Basic API ────────────────────────────────────────────────────────────

    /// Run one arithmetic operation.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for statistics opcodes, lifecycle errors, and
    /// anything [`CommandDispatcher::execute`] returns.
    pub fn perform_operation(&mut self, op: Operation, a: f32, b: f32) -> Result<f32> {
        if !op.is_arithmetic() {
            tracing::error!("Invalid operation code: {op} (max: {})", Operation::Div);
            return Err(CalcError::invalid_operation(
                op,
                "basic API accepts ADD, SUB, MUL and DIV only",
            ));
        }
        let dispatcher = self.dispatcher;
        self.track(|io| dispatcher.execute(io, op, a, b))
    }

    /// Run an arithmetic operation given its raw opcode.
    ///
    /// # Errors
    ///
    /// `UnknownOpcode` for codes outside the enumeration, otherwise as
    /// [`perform_operation`](Self::perform_operation).
    pub fn perform_raw(&mut self, code: u32, a: f32, b: f32) -> Result<f32> {
        let op = Operation::try_from(code)?;
        self.perform_operation(op, a, b)
    }

    // ── Buffer ───────────────────────────────────────────────────────────────

    /// Push one price into the hardware buffer.
    ///
    /// # Errors
    ///
    /// `BufferFull` once `capacity` prices are buffered, or a lifecycle error.
    pub fn write_price(&mut self, price: f32) -> Result<()> {
        let io = Self::ready_io(&mut self.io, self.desynchronized)?;
        self.buffer.write_price(io, price)
    }

    /// Push several prices, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// As [`write_price`](Self::write_price); prices before the failing one
    /// stay buffered.
    pub fn write_prices(&mut self, prices: &[f32]) -> Result<()> {
        prices.iter().try_for_each(|&p| self.write_price(p))
    }

    /// Clear the price buffer.
    ///
    /// # Errors
    ///
    /// Lifecycle errors only.
    pub fn reset_buffer(&mut self) -> Result<()> {
        let io = Self::ready_io(&mut self.io, self.desynchronized)?;
        self.buffer.reset(io);
        Ok(())
    }

    /// Set how many recent prices a statistic considers.
    ///
    /// # Errors
    ///
    /// `InvalidWindow` for 0 or more than capacity.
    pub fn set_window_size(&mut self, size: u32) -> Result<()> {
        let io = Self::ready_io(&mut self.io, self.desynchronized)?;
        self.buffer.set_window_size(io, size)
    }

    /// Set the EMA smoothing factor.
    ///
    /// # Errors
    ///
    /// `InvalidAlpha` outside `0.0..=1.0`.
    pub fn set_alpha(&mut self, alpha: f32) -> Result<()> {
        if !hftcalc_chip::buffer::is_valid_alpha(alpha) {
            return Err(CalcError::InvalidAlpha { alpha });
        }
        let io = Self::ready_io(&mut self.io, self.desynchronized)?;
        self.buffer.set_alpha(io, alpha)
    }

    /// Fill count reported by hardware.
    ///
    /// # Errors
    ///
    /// `NotInitialized` after cleanup.
    pub fn buffer_count(&self) -> Result<u32> {
        Ok(self.live_io()?.read(regs::BUFFER_COUNT))
    }

    /// Check the host mirror against `BUFFER_COUNT`.
    ///
    /// # Errors
    ///
    /// `BufferDesync` on disagreement.
    pub fn verify_buffer(&self) -> Result<()> {
        self.buffer.verify(self.live_io()?)
    }

    // ── Statistics ───────────────────────────────────────────────────────────

    /// Evaluate any windowed statistic with the current window and alpha.
    ///
    /// # Errors
    ///
    /// `InsufficientData` when fewer prices than the window are buffered,
    /// `InvalidOperation` for arithmetic opcodes, plus dispatch errors.
    pub fn compute(&mut self, op: Operation) -> Result<f32> {
        let dispatcher = self.dispatcher;
        let buffer = self.buffer.clone();
        self.track(|io| buffer.compute(io, &dispatcher, op))
    }

    /// Simple moving average over the last `window` prices.
    ///
    /// # Errors
    ///
    /// See [`compute`](Self::compute) and [`set_window_size`](Self::set_window_size).
    pub fn sma(&mut self, window: u32) -> Result<f32> {
        self.windowed(Operation::Sma, window)
    }

    /// Exponential moving average over the current window with `alpha`.
    ///
    /// # Errors
    ///
    /// See [`compute`](Self::compute) and [`set_alpha`](Self::set_alpha).
    pub fn ema(&mut self, alpha: f32) -> Result<f32> {
        self.set_alpha(alpha)?;
        self.compute(Operation::Ema)
    }

    /// Standard deviation over the last `window` prices.
    ///
    /// # Errors
    ///
    /// See [`compute`](Self::compute).
    pub fn std_dev(&mut self, window: u32) -> Result<f32> {
        self.windowed(Operation::StdDev, window)
    }

    /// Minimum over the last `window` prices.
    ///
    /// # Errors
    ///
    /// See [`compute`](Self::compute).
    pub fn min(&mut self, window: u32) -> Result<f32> {
        self.windowed(Operation::Min, window)
    }

    /// Maximum over the last `window` prices.
    ///
    /// # Errors
    ///
    /// See [`compute`](Self::compute).
    pub fn max(&mut self, window: u32) -> Result<f32> {
        self.windowed(Operation::Max, window)
    }

    fn windowed(&mut self, op: Operation, window: u32) -> Result<f32> {
        self.set_window_size(window)?;
        self.compute(op)
    }

    // ── Diagnostics ──────────────────────────────────────────────────────────

    /// Decoded `STATUS`.
    ///
    /// # Errors
    ///
    /// `NotInitialized` after cleanup.
    pub fn status(&self) -> Result<StatusWord> {
        Ok(self.live_io()?.status())
    }

    /// Raw `VERSION` word read at init.
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Decoded IP version.
    pub const fn ip_version(&self) -> Option<IpVersion> {
        IpVersion::from_register(self.version)
    }

    /// Enable or disable the completion interrupt.
    ///
    /// # Errors
    ///
    /// `NotInitialized` after cleanup.
    pub fn set_interrupt_enable(&mut self, enable: bool) -> Result<()> {
        tracing::debug!("Setting interrupt enable: {enable}");
        let value = if enable { int_enable::ENABLE } else { 0 };
        self.live_io_mut()?.write(regs::INT_ENABLE, value);
        Ok(())
    }

    /// Read any register inside the window.
    ///
    /// # Errors
    ///
    /// `OffsetOutOfRange` or `NotInitialized`.
    pub fn read_register(&self, offset: usize) -> Result<u32> {
        RegisterMap::validate(offset)?;
        Ok(self.live_io()?.read(offset))
    }

    /// Write any register inside the window except the buffer registers,
    /// which only change through the buffer API.
    ///
    /// # Errors
    ///
    /// `OffsetOutOfRange`, `BufferManaged` for `BUFFER_CTRL` and
    /// `BUFFER_WRITE`, or `NotInitialized`.
    pub fn write_register(&mut self, offset: usize, value: u32) -> Result<()> {
        RegisterMap::validate(offset)?;
        if RegisterMap::is_buffer_managed(offset) {
            tracing::warn!("Refusing raw write of {value:#010x} to {}", regs::name(offset));
            return Err(CalcError::BufferManaged {
                register: regs::name(offset),
            });
        }
        self.live_io_mut()?.write(offset, value);
        Ok(())
    }

    /// Capture all registers and log them under `label` at trace level.
    ///
    /// # Errors
    ///
    /// `NotInitialized` after cleanup.
    pub fn dump_registers(&self, label: &str) -> Result<RegisterSnapshot> {
        let snapshot = self.live_io()?.snapshot();
        snapshot.log_trace(label);
        Ok(snapshot)
    }

    /// Recover after a timeout.
    ///
    /// Waits (one polling budget) for the IP to go idle, then adopts the
    /// hardware fill count into the buffer mirror and clears the
    /// desynchronized flag.
    ///
    /// # Errors
    ///
    /// `Timeout` if the IP is still busy; the handle stays desynchronized.
    /// An error flag left by the abandoned command is logged, not returned.
    pub fn resync(&mut self) -> Result<()> {
        let dispatcher = self.dispatcher;
        let io = self.io.as_mut().ok_or(CalcError::NotInitialized)?;

        tracing::info!("Resynchronizing with calculator...");
        match dispatcher.waiter().wait(io) {
            Ok(_) => {}
            Err(CalcError::Hardware { code }) => {
                tracing::warn!("Abandoned command finished with error code {code:#010x}");
            }
            Err(e) => return Err(e),
        }

        let adopted = self.buffer.adopt_hardware_count(io);
        self.desynchronized = false;
        tracing::info!("Resynchronized (buffer holds {adopted} prices)");
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn live_io(&self) -> Result<&RegisterIo<T>> {
        self.io.as_ref().ok_or_else(|| {
            tracing::error!("Calculator not initialized");
            CalcError::NotInitialized
        })
    }

    fn live_io_mut(&mut self) -> Result<&mut RegisterIo<T>> {
        self.io.as_mut().ok_or_else(|| {
            tracing::error!("Calculator not initialized");
            CalcError::NotInitialized
        })
    }

    /// Register I/O for an operation that needs a synchronized IP.
    /// Borrows only the `io` field; the buffer manager stays available.
    fn ready_io(io: &mut Option<RegisterIo<T>>, desynchronized: bool) -> Result<&mut RegisterIo<T>> {
        let io = io.as_mut().ok_or_else(|| {
            tracing::error!("Calculator not initialized");
            CalcError::NotInitialized
        })?;
        if desynchronized {
            return Err(CalcError::Desynchronized);
        }
        Ok(io)
    }

    /// Run a command, marking the handle desynchronized if it times out.
    fn track<R>(&mut self, f: impl FnOnce(&mut RegisterIo<T>) -> Result<R>) -> Result<R> {
        let io = Self::ready_io(&mut self.io, self.desynchronized)?;
        let result = f(io);
        if matches!(result, Err(CalcError::Timeout { .. })) {
            tracing::warn!("Hardware state unknown after timeout; resync() required");
            self.desynchronized = true;
        }
        result
    }
}

impl<T: RegisterTransport> Drop for Calculator<T> {
    fn drop(&mut self) {
        if self.io.is_some() {
            tracing::info!("Closing calculator");
        }
    }
}
