//! Command dispatch
//!
//! One command = two operand writes, one control write, a bounded wait, and
//! a result read. Operands and results cross the register boundary as raw
//! IEEE-754 bit patterns; nothing is rounded or truncated on the way.

use crate::error::{CalcError, Result};
use crate::io::RegisterIo;
use crate::regmap::ControlWord;
use crate::transport::RegisterTransport;
use crate::waiter::CompletionWaiter;
use hftcalc_chip::{regs, Operation};

/// Encodes commands into register writes and decodes their outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandDispatcher {
    waiter: CompletionWaiter,
}

impl CommandDispatcher {
    /// Dispatcher that waits with `waiter`.
    pub const fn new(waiter: CompletionWaiter) -> Self {
        Self { waiter }
    }

    /// The waiter used for every command.
    pub const fn waiter(&self) -> &CompletionWaiter {
        &self.waiter
    }

    /// Run `op` on the accelerator with operands `a` and `b`.
    ///
    /// If a previous command is still running, it is awaited first so at most
    /// one command is ever in flight.
    ///
    /// # Errors
    ///
    /// - `Timeout` if the previous or the new command does not complete.
    /// - `Hardware { code }` if the error flag is raised during the wait or is
    ///   still set once the command reports done.
    pub fn execute<T: RegisterTransport>(
        &self,
        io: &mut RegisterIo<T>,
        op: Operation,
        a: f32,
        b: f32,
    ) -> Result<f32> {
        tracing::info!("OP START: operation={op} ({:#x}), operand_a={a:.6}, operand_b={b:.6}", op.code());

        if io.status().busy {
            tracing::warn!("Calculator is busy, waiting for previous operation to complete...");
            self.waiter.wait(io).inspect_err(|e| {
                tracing::error!("Previous operation did not complete: {e}");
            })?;
            tracing::debug!("Previous operation completed, proceeding");
        }

        tracing::debug!(
            "Writing operands: A={:#010x} ({a:.6}), B={:#010x} ({b:.6})",
            a.to_bits(),
            b.to_bits()
        );
        io.write_f32(regs::OPERAND_A, a);
        io.write_f32(regs::OPERAND_B, b);

        let control = ControlWord::start(op);
        tracing::debug!("Starting operation: control={:#010x}", control.bits());
        io.write(regs::CONTROL, control.bits());

        self.waiter.wait(io).inspect_err(|e| {
            tracing::error!("OP ERROR: operation={op}: {e}");
        })?;

        // Done and error can arrive in separate cycles; a late error still
        // fails the command.
        if io.status().error {
            let code = io.read(regs::ERROR_CODE);
            tracing::error!("OP ERROR: operation={op}, error_code={code:#010x}");
            return Err(CalcError::Hardware { code });
        }

        let result = io.read_f32(regs::RESULT);
        tracing::info!("OP COMPLETE: operation={op}, result={result:.6}");
        tracing::debug!("Result: {:#010x} ({result:.6})", result.to_bits());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SimulatedCalculator;
    use std::time::Duration;

    fn setup(busy_polls: u32) -> (CommandDispatcher, RegisterIo<SimulatedCalculator>) {
        let sim = SimulatedCalculator::new().with_busy_polls(busy_polls);
        let dispatcher = CommandDispatcher::new(CompletionWaiter::new(100, Duration::ZERO));
        (dispatcher, RegisterIo::new(sim, true))
    }

    #[test]
    fn add_round_trip() {
        let (d, mut io) = setup(3);
        let r = d.execute(&mut io, Operation::Add, 1.0, 2.0).unwrap();
        assert!((r - 3.0).abs() < 0.001);
    }

    #[test]
    fn operands_transferred_bit_exact() {
        let (d, mut io) = setup(0);
        let a = f32::from_bits(0x3DCC_CCCD); // 0.1
        let b = -7.0e-30f32;
        d.execute(&mut io, Operation::Mul, a, b).unwrap();
        assert_eq!(io.read(regs::OPERAND_A), a.to_bits());
        assert_eq!(io.read(regs::OPERAND_B), b.to_bits());
    }

    #[test]
    fn control_word_latched_with_opcode() {
        let (d, mut io) = setup(0);
        d.execute(&mut io, Operation::Div, 9.0, 3.0).unwrap();
        assert_eq!(io.transport().last_command(), Some(0x8000_0003));
    }

    #[test]
    fn stuck_previous_command_blocks_new_writes() {
        let (d, mut io) = setup(0);
        io.transport_mut().stick_busy();
        let err = d.execute(&mut io, Operation::Add, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, CalcError::Timeout { polls: 100 }));
        assert_eq!(io.transport().commands_started(), 0);
    }

    #[test]
    fn error_after_done_fails_the_command() {
        let (d, mut io) = setup(2);
        io.transport_mut().inject_late_error(0x42);
        let err = d.execute(&mut io, Operation::Add, 1.0, 1.0).unwrap_err();
        assert_eq!(err.hardware_code(), Some(0x42));
    }
}
