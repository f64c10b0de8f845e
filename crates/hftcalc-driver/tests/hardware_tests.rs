//! Hardware validation on a DE10-Nano with the calculator bitstream loaded
//!
//! Run as root: `cargo test -p hftcalc-driver --test hardware_tests -- --ignored`

use hftcalc_driver::{Calculator, DriverConfig, MapConfig, MmapTransport, Operation};

fn open() -> Calculator<MmapTransport> {
    Calculator::open(&MapConfig::de10_nano(), DriverConfig::default()).expect("open /dev/mem")
}

#[test]
#[ignore] // Requires hardware
fn test_version_present() {
    let c = open();
    println!("Calculator IP: {:?} ({:#010x})", c.ip_version(), c.version());
    assert!(c.ip_version().is_some());
}

#[test]
#[ignore] // Requires hardware
fn test_basic_arithmetic() {
    let mut c = open();
    for (op, a, b, expected) in [
        (Operation::Add, 1.0f32, 2.0f32, 3.0f32),
        (Operation::Sub, 5.0, 3.0, 2.0),
        (Operation::Mul, 4.0, 2.5, 10.0),
        (Operation::Div, 10.0, 4.0, 2.5),
    ] {
        let r = c.perform_operation(op, a, b).expect("operation");
        assert!((r - expected).abs() < 0.001, "{op}: {r} != {expected}");
    }
}

#[test]
#[ignore] // Requires hardware
fn test_buffer_and_sma() {
    let mut c = open();
    c.reset_buffer().unwrap();
    c.write_prices(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    c.verify_buffer().expect("hardware fill count matches driver");
    let sma = c.sma(5).unwrap();
    assert!((sma - 3.0).abs() < 0.01, "SMA = {sma}");
}

#[test]
#[ignore] // Requires hardware
fn test_register_dump() {
    let c = open();
    let snap = c.dump_registers("hardware test").unwrap();
    println!("{snap}");
    assert_eq!(snap.get(hftcalc_driver::regs::VERSION), Some(c.version()));
}
