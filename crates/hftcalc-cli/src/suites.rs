//! Fixed self-test tables and their runner.
//!
//! A case passes when `|actual - expected| < tolerance`. Expected values for
//! the windowed statistics assume the window covers the most recent prices,
//! EMA is seeded with the oldest price in the window, and standard deviation
//! is the sample (n - 1) form.

use hftcalc_driver::{Calculator, Operation, RegisterTransport, Result};

/// Which tables to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Suite {
    /// Arithmetic cases only.
    Basic,
    /// Windowed statistic cases only.
    Hft,
    /// Everything.
    All,
}

/// One arithmetic case.
#[derive(Debug, Clone, Copy)]
pub struct ArithmeticCase {
    pub name: &'static str,
    pub op: Operation,
    pub a: f32,
    pub b: f32,
    pub expected: f32,
    pub tolerance: f32,
}

/// One windowed-statistic case: reset, push `prices`, evaluate `op`.
#[derive(Debug, Clone, Copy)]
pub struct WindowCase {
    pub name: &'static str,
    pub op: Operation,
    pub prices: &'static [f32],
    pub window: u32,
    pub alpha: f32,
    pub expected: f32,
    pub tolerance: f32,
}

const fn arith(name: &'static str, op: Operation, a: f32, b: f32, expected: f32) -> ArithmeticCase {
    ArithmeticCase { name, op, a, b, expected, tolerance: 1e-3 }
}

const fn window(
    name: &'static str,
    op: Operation,
    prices: &'static [f32],
    window: u32,
    alpha: f32,
    expected: f32,
    tolerance: f32,
) -> WindowCase {
    WindowCase { name, op, prices, window, alpha, expected, tolerance }
}

use Operation::{
    Add, BollingerLower, BollingerUpper, Div, Ema, Max, Min, Mul, Range, Rsi, Sma, StdDev, Sub,
    Vwap, Wma,
};

pub const ARITHMETIC: &[ArithmeticCase] = &[
    arith("Basic addition", Add, 1.0, 2.0, 3.0),
    arith("Negative + positive", Add, -5.5, 3.2, -2.3),
    arith("Zero addition", Add, 0.0, 0.0, 0.0),
    arith("Decimal addition", Add, 100.25, 200.75, 301.0),
    arith("Negative addition", Add, -10.5, -20.5, -31.0),
    arith("Basic subtraction", Sub, 5.0, 3.0, 2.0),
    arith("Negative subtraction", Sub, -10.0, -5.0, -5.0),
    arith("Zero minus positive", Sub, 0.0, 7.5, -7.5),
    arith("Equal operands", Sub, 100.0, 100.0, 0.0),
    arith("Pi subtraction", Sub, 3.14159, 3.0, 0.14159),
    arith("Basic multiplication", Mul, 2.0, 3.0, 6.0),
    arith("Negative multiplication", Mul, -4.0, 5.0, -20.0),
    arith("Fractional multiplication", Mul, 0.5, 8.0, 4.0),
    arith("Zero multiplication", Mul, 0.0, 100.0, 0.0),
    arith("Negative * negative", Mul, -3.0, -4.0, 12.0),
    arith("Decimal multiplication", Mul, 1.5, 2.5, 3.75),
    arith("Basic division", Div, 10.0, 2.0, 5.0),
    arith("Negative division", Div, -20.0, 4.0, -5.0),
    arith("Fractional division", Div, 1.0, 4.0, 0.25),
    arith("Repeating decimal", Div, 100.0, 3.0, 33.333_332),
    arith("Large + small", Add, 1.0e10, 1.0e-10, 1.0e10),
    arith("Very large * very small", Mul, 1.0e20, 1.0e-20, 1.0),
    arith("Decimal precision", Mul, 10.0, 0.1, 1.0),
    arith("One third", Div, 1.0, 3.0, 0.333_333),
    arith("Temperature", Add, 273.15, 100.0, 373.15),
];

const ONE_TO_FIVE: &[f32] = &[1.0, 2.0, 3.0, 4.0, 5.0];
const TEN_PERIOD: &[f32] = &[100.0, 102.0, 101.5, 103.0, 102.5, 104.0, 103.5, 105.0, 104.5, 106.0];
const SPY: &[f32] = &[435.50, 435.75, 435.60, 435.80, 436.00, 436.20, 436.10, 435.90, 436.15, 436.30];
const NEGATIVE: &[f32] = &[-10.0, -5.0, -15.0, -8.0, -12.0];
const VOLATILE: &[f32] = &[50.0, 75.0, 25.0, 100.0, 10.0];
const TREND_UP: &[f32] = &[100.0, 102.0, 104.0, 106.0, 108.0, 110.0];
const TREND_DOWN: &[f32] = &[110.0, 108.0, 106.0, 104.0, 102.0, 100.0];
const SEVEN: &[f32] = &[22.0, 23.0, 24.0, 23.0, 22.0, 21.0, 20.0];
const RAPID: &[f32] = &[50.0, 75.0, 40.0, 90.0, 30.0, 100.0];
const DISPERSED: &[f32] = &[10.0, 12.0, 23.0, 23.0, 16.0, 23.0, 21.0, 16.0];
const CONSTANT: &[f32] = &[5.0, 5.0, 5.0, 5.0, 5.0];
const SPREAD: &[f32] = &[10.0, 25.0, 15.0, 30.0, 5.0, 20.0];
const MIXED: &[f32] = &[-5.0, 10.0, -15.0, 20.0, -10.0];
const VWAP_PRICES: &[f32] = &[100.0, 101.0, 99.5, 100.5, 101.5];
const BANDS: &[f32] = &[100.0, 102.0, 101.0, 103.0, 102.0, 104.0, 103.0, 105.0, 104.0, 106.0];
const RISING: &[f32] = &[44.0, 45.0, 46.0, 47.0, 48.0, 49.0, 50.0, 51.0, 52.0, 53.0];
const MOMENTUM: &[f32] = &[100.0, 102.0, 105.0, 109.0, 114.0, 120.0];

pub const HFT: &[WindowCase] = &[
    window("SMA: 5-period [1..5]", Sma, ONE_TO_FIVE, 5, 0.0, 3.0, 1e-3),
    window("SMA: 10-period prices", Sma, TEN_PERIOD, 10, 0.0, 103.2, 1e-3),
    window("SMA: SPY 5-min bars", Sma, SPY, 10, 0.0, 435.93, 1e-2),
    window("SMA: negative prices", Sma, NEGATIVE, 5, 0.0, -10.0, 1e-3),
    window("SMA: high volatility", Sma, VOLATILE, 5, 0.0, 52.0, 1e-3),
    window("SMA: single value", Sma, &[42.0], 1, 0.0, 42.0, 1e-3),
    window("SMA: momentum, last 3 of 6", Sma, MOMENTUM, 3, 0.0, 114.333_33, 1e-3),
    window("WMA: 5-period [1..5]", Wma, ONE_TO_FIVE, 5, 0.0, 3.666_667, 1e-3),
    window("EMA: first value", Ema, &[100.0], 1, 0.5, 100.0, 1e-3),
    window("EMA: upward trend (a=0.1)", Ema, TREND_UP, 6, 0.1, 102.628_82, 1e-2),
    window("EMA: downward trend (a=0.1)", Ema, TREND_DOWN, 6, 0.1, 107.371_18, 1e-2),
    window("EMA: a=0.333 over 7", Ema, SEVEN, 7, 0.333, 21.386_48, 1e-2),
    window("EMA: rapid changes (a=0.5)", Ema, RAPID, 6, 0.5, 75.156_25, 1e-2),
    window("STD_DEV: basic set", StdDev, DISPERSED, 8, 0.0, 5.237_229, 1e-2),
    window("STD_DEV: constant values", StdDev, CONSTANT, 5, 0.0, 0.0, 1e-3),
    window("MIN: spread", Min, SPREAD, 6, 0.0, 5.0, 1e-3),
    window("MAX: spread", Max, SPREAD, 6, 0.0, 30.0, 1e-3),
    window("RANGE: max - min", Range, SPREAD, 6, 0.0, 25.0, 1e-3),
    window("MIN: mixed signs", Min, MIXED, 5, 0.0, -15.0, 1e-3),
    window("VWAP: equal volume", Vwap, VWAP_PRICES, 5, 0.0, 100.5, 1e-3),
    window("Bollinger upper: mean + 2s", BollingerUpper, BANDS, 10, 0.0, 106.651_48, 1e-2),
    window("Bollinger lower: mean - 2s", BollingerLower, BANDS, 10, 0.0, 99.348_52, 1e-2),
    window("RSI: pure uptrend", Rsi, RISING, 10, 0.0, 100.0, 1e-2),
];

/// Pass/fail counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
}

impl Tally {
    fn record(&mut self, name: &str, outcome: Result<f32>, expected: f32, tolerance: f32) {
        match outcome {
            Ok(actual) if (actual - expected).abs() < tolerance => {
                self.passed += 1;
                println!("  PASS  {name:<32} {actual:>14.6}");
            }
            Ok(actual) => {
                self.failed += 1;
                println!("  FAIL  {name:<32} {actual:>14.6}  expected {expected:.6} ± {tolerance}");
            }
            Err(e) => {
                self.failed += 1;
                println!("  FAIL  {name:<32} error: {e}");
            }
        }
    }

    pub const fn total(&self) -> usize {
        self.passed + self.failed
    }

    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            passed: self.passed + other.passed,
            failed: self.failed + other.failed,
        }
    }
}

/// Run the arithmetic table.
pub fn run_basic<T: RegisterTransport>(calc: &mut Calculator<T>) -> Tally {
    println!("Basic arithmetic ({} cases)", ARITHMETIC.len());
    let mut tally = Tally::default();
    for case in ARITHMETIC {
        let outcome = calc.perform_operation(case.op, case.a, case.b);
        tally.record(case.name, outcome, case.expected, case.tolerance);
    }
    tally
}

/// Run the windowed-statistic table.
pub fn run_hft<T: RegisterTransport>(calc: &mut Calculator<T>) -> Tally {
    println!("HFT statistics ({} cases)", HFT.len());
    let mut tally = Tally::default();
    for case in HFT {
        let outcome = run_window_case(calc, case);
        tally.record(case.name, outcome, case.expected, case.tolerance);
    }
    tally
}

fn run_window_case<T: RegisterTransport>(calc: &mut Calculator<T>, case: &WindowCase) -> Result<f32> {
    calc.reset_buffer()?;
    calc.write_prices(case.prices)?;
    calc.set_window_size(case.window)?;
    if case.op.uses_alpha() {
        calc.set_alpha(case.alpha)?;
    }
    calc.compute(case.op)
}

/// Run `suite`.
pub fn run<T: RegisterTransport>(calc: &mut Calculator<T>, suite: Suite) -> Tally {
    match suite {
        Suite::Basic => run_basic(calc),
        Suite::Hft => run_hft(calc),
        Suite::All => {
            let basic = run_basic(calc);
            println!();
            basic.merge(run_hft(calc))
        }
    }
}
