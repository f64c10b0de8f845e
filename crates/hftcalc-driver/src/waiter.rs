//! Completion polling
//!
//! Every command funnels through [`CompletionWaiter::wait`]: the single
//! synchronization point between host and IP. The loop is bounded, never
//! misses an error flag, and stops reading as soon as a terminal state shows.

use crate::error::{CalcError, Result};
use crate::io::{RegisterIo, RegisterSnapshot};
use crate::regmap::StatusWord;
use crate::transport::RegisterTransport;
use hftcalc_chip::regs;
use std::time::Duration;

/// Progress is logged every this many polls.
const PROGRESS_INTERVAL: u32 = 10_000;

/// Where the waiter gets its status from.
///
/// Implemented by [`RegisterIo`]; tests substitute scripted sources.
pub trait StatusSource {
    /// Read `STATUS` once.
    fn read_status(&mut self) -> StatusWord;

    /// Read `ERROR_CODE`.
    fn read_error_code(&mut self) -> u32;

    /// Capture every register for a timeout report.
    fn snapshot(&mut self) -> Option<RegisterSnapshot> {
        None
    }
}

impl<T: RegisterTransport> StatusSource for RegisterIo<T> {
    fn read_status(&mut self) -> StatusWord {
        self.status()
    }

    fn read_error_code(&mut self) -> u32 {
        self.read(regs::ERROR_CODE)
    }

    fn snapshot(&mut self) -> Option<RegisterSnapshot> {
        Some(RegisterIo::snapshot(self))
    }
}

/// Bounded status poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionWaiter {
    max_polls: u32,
    poll_interval: Duration,
}

impl CompletionWaiter {
    /// Waiter that gives up after `max_polls` status reads, pausing
    /// `poll_interval` between reads. A zero interval spins.
    pub const fn new(max_polls: u32, poll_interval: Duration) -> Self {
        Self {
            max_polls,
            poll_interval,
        }
    }

    /// Polling budget.
    pub const fn max_polls(&self) -> u32 {
        self.max_polls
    }

    /// Pause between polls.
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Poll until the IP reports a terminal state.
    ///
    /// Returns the number of status reads it took.
    ///
    /// # Errors
    ///
    /// - `Hardware { code }` as soon as a status read shows the error flag;
    ///   `ERROR_CODE` is read once and polling stops.
    /// - `Timeout { polls }` after exactly `max_polls` reads without `done`
    ///   or a cleared `busy`. The register window is logged at error level.
    pub fn wait<S: StatusSource + ?Sized>(&self, source: &mut S) -> Result<u32> {
        tracing::debug!("Waiting for completion (timeout: {} polls)", self.max_polls);

        let mut last = StatusWord::default();
        for poll in 1..=self.max_polls {
            last = source.read_status();

            if last.error {
                let code = source.read_error_code();
                tracing::error!("Calculator error detected after {poll} polls, code {code:#010x}");
                return Err(CalcError::Hardware { code });
            }

            if last.is_complete() {
                tracing::debug!(done = last.done, "Calculation completed after {poll} polls");
                return Ok(poll);
            }

            if poll % PROGRESS_INTERVAL == 0 {
                tracing::debug!(
                    "Still waiting... (poll {poll}, remaining {})",
                    self.max_polls - poll
                );
            }

            if poll < self.max_polls {
                self.pause();
            }
        }

        tracing::error!(
            "Calculator timeout after {} polls (busy={}, error={}, done={})",
            self.max_polls,
            last.busy,
            last.error,
            last.done
        );
        if let Some(snapshot) = source.snapshot() {
            snapshot.log_error("Register state at timeout");
        }
        Err(CalcError::Timeout {
            polls: self.max_polls,
        })
    }

    fn pause(&self) {
        if self.poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(self.poll_interval);
        }
    }
}

impl Default for CompletionWaiter {
    fn default() -> Self {
        let config = crate::DriverConfig::default();
        Self::new(config.max_polls, config.poll_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hftcalc_chip::regs::status;

    /// Replays a fixed list of status words, then repeats the last one.
    struct Script {
        words: Vec<u32>,
        reads: usize,
        error_code: u32,
        error_code_reads: usize,
        reads_after_error_code: usize,
    }

    impl Script {
        fn new(words: &[u32]) -> Self {
            Self {
                words: words.to_vec(),
                reads: 0,
                error_code: 0xE0,
                error_code_reads: 0,
                reads_after_error_code: 0,
            }
        }
    }

    impl StatusSource for Script {
        fn read_status(&mut self) -> StatusWord {
            let idx = self.reads.min(self.words.len() - 1);
            self.reads += 1;
            if self.error_code_reads > 0 {
                self.reads_after_error_code += 1;
            }
            StatusWord::from_bits(self.words[idx])
        }

        fn read_error_code(&mut self) -> u32 {
            self.error_code_reads += 1;
            self.error_code
        }
    }

    fn waiter(max_polls: u32) -> CompletionWaiter {
        CompletionWaiter::new(max_polls, Duration::ZERO)
    }

    #[test]
    fn done_on_first_poll() {
        let mut s = Script::new(&[status::DONE]);
        assert_eq!(waiter(10).wait(&mut s).unwrap(), 1);
        assert_eq!(s.reads, 1);
    }

    #[test]
    fn idle_counts_as_complete() {
        let mut s = Script::new(&[status::BUSY, status::BUSY, 0]);
        assert_eq!(waiter(10).wait(&mut s).unwrap(), 3);
    }

    #[test]
    fn timeout_after_exactly_max_polls() {
        for max in [1u32, 2, 7, 100] {
            let mut s = Script::new(&[status::BUSY]);
            let err = waiter(max).wait(&mut s).unwrap_err();
            assert!(matches!(err, CalcError::Timeout { polls } if polls == max));
            assert_eq!(s.reads, max as usize);
        }
    }

    #[test]
    fn zero_budget_times_out_without_reading() {
        let mut s = Script::new(&[status::DONE]);
        assert!(matches!(waiter(0).wait(&mut s), Err(CalcError::Timeout { polls: 0 })));
        assert_eq!(s.reads, 0);
    }

    #[test]
    fn error_on_first_poll_stops_polling() {
        let mut s = Script::new(&[status::BUSY | status::ERROR]);
        let err = waiter(1000).wait(&mut s).unwrap_err();
        assert_eq!(err.hardware_code(), Some(0xE0));
        assert_eq!(s.reads, 1);
        assert_eq!(s.error_code_reads, 1);
        assert_eq!(s.reads_after_error_code, 0);
    }

    #[test]
    fn error_wins_over_done_in_same_word() {
        let mut s = Script::new(&[status::DONE | status::ERROR]);
        assert!(matches!(waiter(5).wait(&mut s), Err(CalcError::Hardware { code: 0xE0 })));
    }

    #[test]
    fn error_after_busy_polls() {
        let mut s = Script::new(&[status::BUSY, status::BUSY, status::BUSY | status::ERROR]);
        assert!(waiter(10).wait(&mut s).is_err());
        assert_eq!(s.reads, 3);
    }
}
