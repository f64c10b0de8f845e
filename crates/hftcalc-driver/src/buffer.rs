//! Price buffer management
//!
//! The IP keeps the prices; the driver keeps a mirror of what it has told the
//! IP (fill count, window size, alpha) and refuses anything the IP would
//! silently mishandle. Every mutation of the hardware buffer goes through
//! [`BufferManager`], which is what keeps the mirror honest.

use crate::dispatch::CommandDispatcher;
use crate::error::{CalcError, Result};
use crate::io::RegisterIo;
use crate::transport::RegisterTransport;
use hftcalc_chip::regs::{self, buffer_ctrl};
use hftcalc_chip::{buffer, Operation};

/// Host-side mirror of the hardware buffer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferState {
    /// Maximum number of prices
    pub capacity: u16,
    /// Prices pushed since the last reset
    pub fill_count: u16,
    /// Prices a windowed statistic considers
    pub window_size: u16,
    /// EMA smoothing factor
    pub alpha: f32,
}

impl BufferState {
    /// Empty buffer of `capacity`, window 1, alpha 0.
    pub const fn new(capacity: u16) -> Self {
        Self {
            capacity,
            fill_count: 0,
            window_size: buffer::MIN_WINDOW,
            alpha: 0.0,
        }
    }

    /// No more prices can be pushed.
    pub const fn is_full(&self) -> bool {
        self.fill_count >= self.capacity
    }

    /// Enough prices are buffered for the configured window.
    pub const fn window_ready(&self) -> bool {
        self.window_size <= self.fill_count
    }
}

impl Default for BufferState {
    fn default() -> Self {
        Self::new(buffer::CAPACITY)
    }
}

/// Enforces buffer invariants before touching hardware.
#[derive(Debug, Clone, Default)]
pub struct BufferManager {
    state: BufferState,
}

impl BufferManager {
    /// Manager for an empty buffer of `capacity`.
    pub const fn new(capacity: u16) -> Self {
        Self {
            state: BufferState::new(capacity),
        }
    }

    /// Current mirror.
    pub const fn state(&self) -> &BufferState {
        &self.state
    }

    /// Push one price.
    ///
    /// # Errors
    ///
    /// Returns `BufferFull` once `capacity` prices have been pushed; nothing
    /// is written in that case.
    pub fn write_price<T: RegisterTransport>(&mut self, io: &mut RegisterIo<T>, price: f32) -> Result<()> {
        if self.state.is_full() {
            tracing::warn!("Price buffer full ({} entries), rejecting {price}", self.state.capacity);
            return Err(CalcError::BufferFull {
                capacity: self.state.capacity,
            });
        }

        io.write_f32(regs::BUFFER_WRITE, price);
        self.state.fill_count += 1;
        tracing::debug!("Buffered price {price:.6} ({}/{})", self.state.fill_count, self.state.capacity);
        Ok(())
    }

    /// Clear the buffer.
    ///
    /// Pulses the reset strobe; the window size is kept.
    pub fn reset<T: RegisterTransport>(&mut self, io: &mut RegisterIo<T>) {
        let window = self.state.window_size;
        io.write(regs::BUFFER_CTRL, buffer_ctrl::encode(window, true));
        io.write(regs::BUFFER_CTRL, buffer_ctrl::encode(window, false));
        self.state.fill_count = 0;
        tracing::debug!("Price buffer reset (window {window})");
    }

    /// Configure the window size.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWindow` for 0 or anything above capacity.
    pub fn set_window_size<T: RegisterTransport>(&mut self, io: &mut RegisterIo<T>, size: u32) -> Result<()> {
        let capacity = self.state.capacity;
        let size16 = u16::try_from(size)
            .ok()
            .filter(|&s| buffer::is_valid_window(s, capacity))
            .ok_or(CalcError::InvalidWindow { size, capacity })?;

        io.write(regs::BUFFER_CTRL, buffer_ctrl::encode(size16, false));
        self.state.window_size = size16;
        tracing::debug!("Window size set to {size16}");
        Ok(())
    }

    /// Configure the EMA smoothing factor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAlpha` for NaN or values outside `0.0..=1.0`, without
    /// touching hardware.
    pub fn set_alpha<T: RegisterTransport>(&mut self, io: &mut RegisterIo<T>, alpha: f32) -> Result<()> {
        if !buffer::is_valid_alpha(alpha) {
            return Err(CalcError::InvalidAlpha { alpha });
        }
        io.write_f32(regs::EMA_ALPHA, alpha);
        self.state.alpha = alpha;
        tracing::debug!("EMA alpha set to {alpha:.6}");
        Ok(())
    }

    /// Evaluate a windowed statistic over the buffered prices.
    ///
    /// Operand B carries the window size (as f32), or alpha for EMA.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` for arithmetic opcodes.
    /// - `InsufficientData` when `window_size > fill_count`.
    /// - Anything [`CommandDispatcher::execute`] returns.
    pub fn compute<T: RegisterTransport>(
        &self,
        io: &mut RegisterIo<T>,
        dispatcher: &CommandDispatcher,
        op: Operation,
    ) -> Result<f32> {
        if !op.is_windowed() {
            return Err(CalcError::invalid_operation(op, "not a windowed statistic"));
        }
        if !self.state.window_ready() {
            return Err(CalcError::InsufficientData {
                window: self.state.window_size,
                fill_count: self.state.fill_count,
            });
        }

        let operand_b = if op.uses_alpha() {
            self.state.alpha
        } else {
            f32::from(self.state.window_size)
        };
        dispatcher.execute(io, op, 0.0, operand_b)
    }

    /// Compare the mirror with `BUFFER_COUNT`.
    ///
    /// # Errors
    ///
    /// Returns `BufferDesync` when they differ.
    pub fn verify<T: RegisterTransport>(&self, io: &RegisterIo<T>) -> Result<()> {
        let hardware = io.read(regs::BUFFER_COUNT);
        if hardware == u32::from(self.state.fill_count) {
            Ok(())
        } else {
            Err(CalcError::BufferDesync {
                mirror: self.state.fill_count,
                hardware,
            })
        }
    }

    /// Adopt the hardware fill count into the mirror.
    ///
    /// Returns the adopted count. Values above capacity are clamped.
    pub fn adopt_hardware_count<T: RegisterTransport>(&mut self, io: &RegisterIo<T>) -> u16 {
        let hardware = io.read(regs::BUFFER_COUNT);
        let adopted = u16::try_from(hardware)
            .unwrap_or(u16::MAX)
            .min(self.state.capacity);
        if u32::from(self.state.fill_count) != hardware {
            tracing::warn!(
                "Buffer mirror drifted: driver={}, hardware={hardware}; adopting {adopted}",
                self.state.fill_count
            );
        }
        self.state.fill_count = adopted;
        adopted
    }
}
