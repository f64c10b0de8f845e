//! Full driver session against the software model
//!
//! Runs arithmetic and every windowed statistic without hardware.

use hftcalc_driver::{Calculator, DriverConfig, Operation, Result, SimulatedCalculator};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("hftcalc_driver=info")
        .init();

    println!("HFT calculator (simulated)\n");

    let sim = SimulatedCalculator::new().with_busy_polls(8);
    let mut calc = Calculator::init(sim, DriverConfig::simulated())?;

    for (op, a, b) in [
        (Operation::Add, 1.5f32, 2.25f32),
        (Operation::Sub, 100.0, 0.01),
        (Operation::Mul, 3.0, -4.5),
        (Operation::Div, 1.0, 3.0),
    ] {
        let r = calc.perform_operation(op, a, b)?;
        println!("{op:>4}({a}, {b}) = {r}");
    }

    let prices = [100.0, 100.5, 101.2, 100.8, 101.9, 102.4, 101.7, 102.9];
    calc.write_prices(&prices)?;
    calc.set_window_size(8)?;
    calc.set_alpha(hftcalc_chip::buffer::alpha_for_period(8))?;

    println!("\nWindow of {} prices:", prices.len());
    for op in Operation::ALL.into_iter().filter(|op| op.is_windowed()) {
        println!("  {:<13} {:>10.4}", op.mnemonic(), calc.compute(op)?);
    }

    calc.cleanup();
    Ok(())
}
