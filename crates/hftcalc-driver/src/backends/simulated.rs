// SPDX-License-Identifier: AGPL-3.0-only

//! Software model of the calculator IP
//!
//! Behaves like the fabric from the driver's point of view: a start write
//! latches the command, `STATUS` reads busy for a configurable number of
//! polls, then the result (or an error code) is published. The price buffer,
//! window and alpha live in the model's registers, so every windowed
//! statistic is evaluated exactly as the host configured it.
//!
//! Statistics are computed in f64 and rounded once to f32. Results are
//! therefore at least as precise as the fabric's single-precision pipeline,
//! which makes the model a usable ground truth for hardware validation.
//!
//! Fault injection (`stick_busy`, `fail_next`, `inject_late_error`) exercises
//! the driver's liveness and error paths without hardware.

use crate::transport::{RegisterTransport, TransportKind};
use hftcalc_chip::regs::{self, buffer_ctrl, control, status};
use hftcalc_chip::{buffer, Operation};
use std::cell::Cell;

/// `ERROR_CODE` values raised by the model.
pub mod error_code {
    /// Division by zero
    pub const DIV_BY_ZERO: u32 = 0x01;
    /// Finite operands produced an infinite result
    pub const OVERFLOW: u32 = 0x02;
    /// NaN operand or result
    pub const NAN: u32 = 0x04;
    /// Window empty or larger than the buffered prices
    pub const WINDOW: u32 = 0x10;
    /// Opcode not implemented by the IP
    pub const UNSUPPORTED: u32 = 0x20;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Value(f32),
    Error(u32),
}

/// Calculator IP model implementing [`RegisterTransport`].
#[derive(Debug)]
pub struct SimulatedCalculator {
    words: [Cell<u32>; regs::WORD_COUNT],
    prices: Vec<f32>,
    capacity: usize,
    version: u32,

    busy_polls: u32,
    busy_remaining: Cell<u32>,
    pending: Cell<Option<Outcome>>,
    flags: Cell<u32>,
    stuck: bool,

    next_error: Option<u32>,
    late_error: Cell<Option<u32>>,
    late_armed: Cell<Option<u32>>,

    commands_started: u32,
    last_command: Option<u32>,
    status_reads: Cell<u64>,
}

impl SimulatedCalculator {
    /// `VERSION` reported unless overridden (v1.0000).
    pub const DEFAULT_VERSION: u32 = 0x0001_0000;

    /// Idle model: empty buffer, commands complete on the first poll.
    pub fn new() -> Self {
        Self {
            words: std::array::from_fn(|_| Cell::new(0)),
            prices: Vec::with_capacity(usize::from(buffer::CAPACITY)),
            capacity: usize::from(buffer::CAPACITY),
            version: Self::DEFAULT_VERSION,
            busy_polls: 0,
            busy_remaining: Cell::new(0),
            pending: Cell::new(None),
            flags: Cell::new(0),
            stuck: false,
            next_error: None,
            late_error: Cell::new(None),
            late_armed: Cell::new(None),
            commands_started: 0,
            last_command: None,
            status_reads: Cell::new(0),
        }
    }

    /// Report busy for `polls` status reads after each start.
    #[must_use]
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    /// Report `version` in the `VERSION` register.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Synthesize a smaller (or larger) price buffer.
    #[must_use]
    pub fn with_capacity(mut self, capacity: u16) -> Self {
        self.capacity = usize::from(capacity);
        self
    }

    /// Hold `STATUS.busy` until [`release`](Self::release).
    pub fn stick_busy(&mut self) {
        tracing::debug!("sim: busy flag stuck");
        self.stuck = true;
    }

    /// Undo [`stick_busy`](Self::stick_busy).
    pub fn release(&mut self) {
        tracing::debug!("sim: busy flag released");
        self.stuck = false;
    }

    /// Fail the next command with `code` instead of computing it.
    pub fn fail_next(&mut self, code: u32) {
        self.next_error = Some(code);
    }

    /// Raise `code` one status read after the next command reports done.
    pub fn inject_late_error(&mut self, code: u32) {
        self.late_error.set(Some(code));
    }

    /// Push prices directly, behind the driver's back.
    pub fn preload(&mut self, prices: &[f32]) {
        for &p in prices {
            self.push_price(p);
        }
    }

    /// Buffered prices, oldest first.
    pub fn prices(&self) -> &[f32] {
        &self.prices
    }

    /// Commands latched since creation.
    pub const fn commands_started(&self) -> u32 {
        self.commands_started
    }

    /// Raw `CONTROL` word of the most recent start.
    pub const fn last_command(&self) -> Option<u32> {
        self.last_command
    }

    /// `STATUS` reads since creation.
    pub fn status_reads(&self) -> u64 {
        self.status_reads.get()
    }

    fn word(&self, offset: usize) -> &Cell<u32> {
        &self.words[offset / regs::WORD_BYTES]
    }

    fn push_price(&mut self, price: f32) {
        if self.prices.len() < self.capacity {
            self.prices.push(price);
        } else {
            tracing::trace!("sim: buffer full, dropped {price}");
        }
    }

    fn buffer_full(&self) -> bool {
        self.prices.len() >= self.capacity
    }

    fn start(&mut self, word: u32) {
        self.commands_started += 1;
        self.last_command = Some(word);
        self.word(regs::CONTROL).set(word & !control::START);

        let code = control::opcode(word);
        let outcome = match self.next_error.take() {
            Some(injected) => Outcome::Error(injected),
            None => Operation::from_code(u32::from(code))
                .map_or(Outcome::Error(error_code::UNSUPPORTED), |op| self.evaluate(op)),
        };
        tracing::debug!("sim: command {code:#x} latched, outcome {outcome:?}");

        self.flags.set(status::BUSY);
        self.busy_remaining.set(self.busy_polls);
        self.pending.set(Some(outcome));
    }

    fn read_status(&self) -> u32 {
        self.status_reads.set(self.status_reads.get() + 1);
        let full = if self.buffer_full() { status::BUF_FULL } else { 0 };

        if self.stuck {
            return status::BUSY | full;
        }

        let remaining = self.busy_remaining.get();
        if remaining > 0 {
            self.busy_remaining.set(remaining - 1);
            return status::BUSY | full;
        }

        if let Some(outcome) = self.pending.take() {
            match outcome {
                Outcome::Value(v) => {
                    self.word(regs::RESULT).set(v.to_bits());
                    self.flags.set(status::DONE);
                    self.late_armed.set(self.late_error.take());
                }
                Outcome::Error(code) => {
                    self.word(regs::ERROR_CODE).set(code);
                    self.flags.set(status::ERROR);
                }
            }
        } else if let Some(code) = self.late_armed.take() {
            self.word(regs::ERROR_CODE).set(code);
            self.flags.set(self.flags.get() | status::ERROR);
        }

        self.flags.get() | full
    }

    fn evaluate(&self, op: Operation) -> Outcome {
        let a = f32::from_bits(self.word(regs::OPERAND_A).get());
        let b = f32::from_bits(self.word(regs::OPERAND_B).get());

        if op.is_arithmetic() {
            return arithmetic(op, a, b);
        }

        let window = usize::from(buffer_ctrl::window_size(self.word(regs::BUFFER_CTRL).get()));
        if window == 0 || window > self.prices.len() {
            return Outcome::Error(error_code::WINDOW);
        }
        let recent = &self.prices[self.prices.len() - window..];
        let alpha = f64::from(f32::from_bits(self.word(regs::EMA_ALPHA).get()));
        finish(statistic(op, recent, alpha))
    }
}

impl Default for SimulatedCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterTransport for SimulatedCalculator {
    fn read32(&self, offset: usize) -> u32 {
        if !regs::is_valid_offset(offset) {
            return 0;
        }
        match offset {
            regs::STATUS => self.read_status(),
            #[allow(clippy::cast_possible_truncation)]
            regs::BUFFER_COUNT => self.prices.len() as u32,
            regs::VERSION => self.version,
            regs::BUFFER_WRITE => 0,
            _ => self.word(offset).get(),
        }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        if !regs::is_valid_offset(offset) {
            return;
        }
        match offset {
            regs::CONTROL if control::is_start(value) => self.start(value),
            regs::BUFFER_WRITE => self.push_price(f32::from_bits(value)),
            regs::BUFFER_CTRL => {
                if buffer_ctrl::is_reset(value) {
                    self.prices.clear();
                }
                // Reset strobe self-clears.
                self.word(offset).set(value & !buffer_ctrl::RESET);
            }
            regs::RESULT | regs::STATUS | regs::BUFFER_COUNT | regs::ERROR_CODE | regs::VERSION => {
                tracing::trace!("sim: write to read-only {} ignored", regs::name(offset));
            }
            _ => self.word(offset).set(value),
        }
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Simulated
    }
}

fn arithmetic(op: Operation, a: f32, b: f32) -> Outcome {
    if a.is_nan() || b.is_nan() {
        return Outcome::Error(error_code::NAN);
    }
    let value = match op {
        Operation::Add => a + b,
        Operation::Sub => a - b,
        Operation::Mul => a * b,
        Operation::Div => {
            if b == 0.0 {
                return Outcome::Error(error_code::DIV_BY_ZERO);
            }
            a / b
        }
        _ => return Outcome::Error(error_code::UNSUPPORTED),
    };
    if value.is_infinite() && a.is_finite() && b.is_finite() {
        return Outcome::Error(error_code::OVERFLOW);
    }
    if value.is_nan() {
        return Outcome::Error(error_code::NAN);
    }
    Outcome::Value(value)
}

fn finish(value: f64) -> Outcome {
    if value.is_nan() {
        return Outcome::Error(error_code::NAN);
    }
    #[allow(clippy::cast_possible_truncation)]
    let single = value as f32;
    if single.is_infinite() {
        Outcome::Error(error_code::OVERFLOW)
    } else {
        Outcome::Value(single)
    }
}

/// Evaluate a windowed statistic over `prices` (oldest first, non-empty).
#[allow(clippy::cast_precision_loss)]
fn statistic(op: Operation, prices: &[f32], alpha: f64) -> f64 {
    let values = prices.iter().map(|&p| f64::from(p));
    let n = prices.len() as f64;
    let mean = values.clone().sum::<f64>() / n;

    match op {
        // VWAP without a volume channel weights every price equally.
        Operation::Sma | Operation::Vwap => mean,
        Operation::Ema => values
            .clone()
            .skip(1)
            .fold(f64::from(prices[0]), |ema, p| alpha.mul_add(p, (1.0 - alpha) * ema)),
        Operation::Wma => {
            let weighted: f64 = values.clone().zip(1u32..).map(|(p, w)| p * f64::from(w)).sum();
            weighted / (n * (n + 1.0) / 2.0)
        }
        Operation::StdDev => sample_std_dev(prices, mean),
        Operation::Rsi => rsi(prices),
        Operation::BollingerUpper => 2.0f64.mul_add(sample_std_dev(prices, mean), mean),
        Operation::BollingerLower => (-2.0f64).mul_add(sample_std_dev(prices, mean), mean),
        Operation::Min => values.clone().fold(f64::INFINITY, f64::min),
        Operation::Max => values.clone().fold(f64::NEG_INFINITY, f64::max),
        Operation::Range => {
            let lo = values.clone().fold(f64::INFINITY, f64::min);
            let hi = values.fold(f64::NEG_INFINITY, f64::max);
            hi - lo
        }
        Operation::Add | Operation::Sub | Operation::Mul | Operation::Div => f64::NAN,
    }
}

#[allow(clippy::cast_precision_loss)]
fn sample_std_dev(prices: &[f32], mean: f64) -> f64 {
    if prices.len() < 2 {
        return 0.0;
    }
    let ss: f64 = prices.iter().map(|&p| (f64::from(p) - mean).powi(2)).sum();
    (ss / (prices.len() - 1) as f64).sqrt()
}

fn rsi(prices: &[f32]) -> f64 {
    let (gains, losses) = prices.windows(2).fold((0.0f64, 0.0f64), |(g, l), w| {
        let delta = f64::from(w[1]) - f64::from(w[0]);
        if delta > 0.0 {
            (g + delta, l)
        } else {
            (g, l - delta)
        }
    });
    if losses == 0.0 {
        return if gains == 0.0 { 50.0 } else { 100.0 };
    }
    100.0 - 100.0 / (1.0 + gains / losses)
}
