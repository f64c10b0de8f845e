//! Driver behaviour against the simulated calculator
//!
//! Everything here runs without hardware.

use hftcalc_driver::backends::simulated::error_code;
use hftcalc_driver::{
    regs, CalcError, Calculator, DriverConfig, Operation, SimulatedCalculator,
};

fn calc() -> Calculator<SimulatedCalculator> {
    calc_with(SimulatedCalculator::new().with_busy_polls(4))
}

fn calc_with(sim: SimulatedCalculator) -> Calculator<SimulatedCalculator> {
    Calculator::init(sim, DriverConfig::simulated()).expect("simulated init")
}

#[test]
fn add_one_and_two() {
    let mut c = calc();
    let r = c.perform_operation(Operation::Add, 1.0, 2.0).unwrap();
    assert!((r - 3.0).abs() < 0.001);
}

#[test]
fn arithmetic_within_tolerance() {
    let mut c = calc();
    let cases: [(Operation, f32, f32, f32); 5] = [
        (Operation::Add, 123.456, 654.321, 777.777),
        (Operation::Sub, 1000.0, 0.001, 999.999),
        (Operation::Mul, -2.5, 4.0, -10.0),
        (Operation::Div, 22.0, 7.0, 3.142_857),
        (Operation::Mul, 1.0e-3, 1.0e-3, 1.0e-6),
    ];
    for (op, a, b, expected) in cases {
        let r = c.perform_operation(op, a, b).unwrap();
        let tol = 1e-5f32.max(expected.abs() * 1e-6);
        assert!((r - expected).abs() <= tol, "{op}({a}, {b}) = {r}, expected {expected}");
    }
}

#[test]
fn hardware_errors_surface_with_code() {
    let mut c = calc();
    let err = c.perform_operation(Operation::Div, 1.0, 0.0).unwrap_err();
    assert_eq!(err.hardware_code(), Some(error_code::DIV_BY_ZERO));

    // The driver stays usable after a hardware error.
    let r = c.perform_operation(Operation::Sub, 5.0, 3.0).unwrap();
    assert!((r - 2.0).abs() < 0.001);
}

#[test]
fn error_on_first_poll_is_not_repolled() {
    let mut c = calc_with(SimulatedCalculator::new());
    c.transport_mut().unwrap().fail_next(0x55);
    let before = c.transport().unwrap().status_reads();
    let err = c.perform_operation(Operation::Add, 1.0, 1.0).unwrap_err();
    assert!(matches!(err, CalcError::Hardware { code: 0x55 }));
    // One idle check before the command, one poll that sees the error.
    assert_eq!(c.transport().unwrap().status_reads() - before, 2);
}

#[test]
fn timeout_after_exactly_max_polls() {
    let sim = SimulatedCalculator::new().with_busy_polls(1000);
    let mut c = Calculator::init(sim, DriverConfig::simulated().with_max_polls(25)).unwrap();
    let before = c.transport().unwrap().status_reads();
    let err = c.perform_operation(Operation::Add, 1.0, 1.0).unwrap_err();
    assert!(matches!(err, CalcError::Timeout { polls: 25 }));
    assert!(err.is_liveness());
    // Idle check, 25 polls, then one STATUS read for the register dump.
    assert_eq!(c.transport().unwrap().status_reads() - before, 1 + 25 + 1);
    assert!(c.is_desynchronized());
}

#[test]
fn buffer_full_on_257th_price() {
    let mut c = calc();
    for i in 0..256u16 {
        c.write_price(f32::from(i)).unwrap();
    }
    let err = c.write_price(0.0).unwrap_err();
    assert!(matches!(err, CalcError::BufferFull { capacity: 256 }));
    assert_eq!(c.buffer_count().unwrap(), 256);
    assert!(c.verify_buffer().is_ok());
    assert!(c.status().unwrap().buffer_full);
}

#[test]
fn window_size_bounds() {
    let mut c = calc();
    assert!(c.set_window_size(1).is_ok());
    assert!(c.set_window_size(256).is_ok());
    assert!(matches!(c.set_window_size(0), Err(CalcError::InvalidWindow { size: 0, .. })));
    assert!(matches!(c.set_window_size(257), Err(CalcError::InvalidWindow { size: 257, .. })));
    assert_eq!(c.buffer_state().window_size, 256);
}

#[test]
fn statistics_need_a_full_window() {
    let mut c = calc();
    c.write_prices(&[1.0, 2.0, 3.0]).unwrap();
    let started = c.transport().unwrap().commands_started();
    let err = c.sma(4).unwrap_err();
    assert!(matches!(err, CalcError::InsufficientData { window: 4, fill_count: 3 }));
    assert_eq!(c.transport().unwrap().commands_started(), started);
    assert!(c.sma(3).is_ok());
}

#[test]
fn sma_of_one_to_five() {
    let mut c = calc();
    c.write_prices(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    let sma = c.sma(5).unwrap();
    assert!((sma - 3.0).abs() < 1e-5);
}

#[test]
fn window_selects_most_recent_prices() {
    let mut c = calc();
    c.write_prices(&[100.0, 1.0, 2.0, 3.0]).unwrap();
    assert!((c.sma(3).unwrap() - 2.0).abs() < 1e-5);
    assert!((c.min(4).unwrap() - 1.0).abs() < 1e-5);
    assert!((c.max(4).unwrap() - 100.0).abs() < 1e-5);
}

#[test]
fn ema_and_std_dev() {
    let mut c = calc();
    c.write_prices(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
    let sd = c.std_dev(8).unwrap();
    assert!((sd - 2.138_09).abs() < 1e-4);

    c.set_window_size(2).unwrap();
    let ema = c.ema(0.5).unwrap();
    assert!((ema - 8.0).abs() < 1e-5);
    assert!(matches!(c.ema(1.5), Err(CalcError::InvalidAlpha { .. })));
}

#[test]
fn every_statistic_dispatches() {
    let mut c = calc();
    c.write_prices(&[10.0, 11.0, 10.5, 12.0, 11.5]).unwrap();
    c.set_window_size(5).unwrap();
    c.set_alpha(0.3).unwrap();
    for op in Operation::ALL.into_iter().filter(|op| op.is_windowed()) {
        let r = c.compute(op).unwrap();
        assert!(r.is_finite(), "{op} returned {r}");
    }
    let upper = c.compute(Operation::BollingerUpper).unwrap();
    let lower = c.compute(Operation::BollingerLower).unwrap();
    let mean = c.compute(Operation::Sma).unwrap();
    assert!(lower < mean && mean < upper);
}

#[test]
fn statistics_rejected_by_basic_api() {
    let mut c = calc();
    c.write_prices(&[1.0]).unwrap();
    assert!(matches!(
        c.perform_operation(Operation::Rsi, 0.0, 1.0),
        Err(CalcError::InvalidOperation { op: Operation::Rsi, .. })
    ));
    assert!(matches!(c.compute(Operation::Mul), Err(CalcError::InvalidOperation { .. })));
}

#[test]
fn reset_empties_buffer() {
    let mut c = calc();
    c.write_prices(&[1.0, 2.0]).unwrap();
    c.reset_buffer().unwrap();
    assert_eq!(c.buffer_count().unwrap(), 0);
    assert_eq!(c.buffer_state().fill_count, 0);
    assert!(c.transport().unwrap().prices().is_empty());
}

#[test]
fn register_round_trips() {
    let mut c = calc();
    for (offset, value) in [
        (regs::OPERAND_A, 0x4049_0FDB),
        (regs::OPERAND_B, 0xC2F6_E979),
        (regs::INT_ENABLE, 1),
        (regs::EMA_ALPHA, 0.125f32.to_bits()),
        (regs::CONFIG_FLAGS, 0xA5A5_5A5A),
    ] {
        c.write_register(offset, value).unwrap();
        assert_eq!(c.read_register(offset).unwrap(), value, "{}", regs::name(offset));
    }
    assert!(matches!(c.read_register(0x40), Err(CalcError::OffsetOutOfRange { offset: 0x40, .. })));
}

#[test]
fn buffer_ctrl_round_trips_through_window_api() {
    let mut c = calc();
    c.set_window_size(200).unwrap();
    assert_eq!(c.read_register(regs::BUFFER_CTRL).unwrap(), 0x0000_00C8);
    c.reset_buffer().unwrap();
    // Reset keeps the window and leaves the strobe clear.
    assert_eq!(c.read_register(regs::BUFFER_CTRL).unwrap(), 0x0000_00C8);
}

#[test]
fn raw_writes_cannot_bypass_buffer_mirror() {
    let mut c = calc();
    c.write_prices(&[1.0, 2.0, 3.0]).unwrap();

    let err = c.write_register(regs::BUFFER_CTRL, regs::buffer_ctrl::encode(1, true)).unwrap_err();
    assert!(matches!(err, CalcError::BufferManaged { register: "BUFFER_CTRL" }));
    assert!(err.is_precondition());
    assert_eq!(c.buffer_count().unwrap(), 3);
    assert!((c.sma(3).unwrap() - 2.0).abs() < 0.001);

    for _ in 0..256 {
        assert!(matches!(
            c.write_register(regs::BUFFER_WRITE, 1.0f32.to_bits()),
            Err(CalcError::BufferManaged { register: "BUFFER_WRITE" })
        ));
    }
    assert_eq!(c.transport().unwrap().prices(), &[1.0f32, 2.0, 3.0]);
    c.verify_buffer().unwrap();
}

#[test]
fn full_buffer_rejected_after_raw_write_attempts() {
    let mut c = calc();
    for i in 0..256u16 {
        assert!(c.write_register(regs::BUFFER_WRITE, f32::from(i).to_bits()).is_err());
        c.write_price(f32::from(i)).unwrap();
    }
    assert!(matches!(c.write_price(1.0), Err(CalcError::BufferFull { capacity: 256 })));
    assert_eq!(c.buffer_count().unwrap(), 256);
}

#[test]
fn cleanup_then_not_initialized() {
    let mut c = calc();
    c.cleanup();
    assert!(matches!(c.perform_operation(Operation::Add, 1.0, 2.0), Err(CalcError::NotInitialized)));
    assert!(matches!(c.write_price(1.0), Err(CalcError::NotInitialized)));
    assert!(matches!(c.buffer_count(), Err(CalcError::NotInitialized)));
    assert!(matches!(c.dump_registers("gone"), Err(CalcError::NotInitialized)));
    assert!(matches!(c.resync(), Err(CalcError::NotInitialized)));
}

#[test]
fn resync_after_timeout() {
    let mut c = Calculator::init(
        SimulatedCalculator::new().with_busy_polls(50),
        DriverConfig::simulated().with_max_polls(10),
    )
    .unwrap();
    assert!(matches!(c.perform_operation(Operation::Add, 1.0, 1.0), Err(CalcError::Timeout { .. })));
    assert!(matches!(c.sma(1), Err(CalcError::Desynchronized)));

    // The abandoned command still finishes inside the simulator.
    while c.resync().is_err() {}
    assert!(!c.is_desynchronized());
}

#[test]
fn interrupt_enable_disabled_at_init() {
    let c = calc();
    assert_eq!(c.read_register(regs::INT_ENABLE).unwrap(), 0);
}

#[test]
fn shared_across_threads_behind_mutex() {
    use std::sync::{Arc, Mutex};

    let c = Arc::new(Mutex::new(calc()));
    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let c = Arc::clone(&c);
            std::thread::spawn(move || {
                let x = f32::from(i);
                let r = c.lock().unwrap().perform_operation(Operation::Mul, x, 2.0).unwrap();
                assert!((r - 2.0 * x).abs() < 1e-6);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(c.lock().unwrap().transport().unwrap().commands_started(), 4);
}
