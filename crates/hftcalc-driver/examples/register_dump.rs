//! Map the calculator on a DE10-Nano and print its registers
//!
//! Requires root (for `/dev/mem`).

use hftcalc_driver::{Calculator, DriverConfig, MapConfig, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("hftcalc_driver=debug")
        .init();

    let map = MapConfig::de10_nano();
    println!("Mapping {} at {:#x} + {:#x}", map.device.display(), map.map_offset, map.register_offset);

    let calc = Calculator::open(&map, DriverConfig::default())?;
    match calc.ip_version() {
        Some(v) => println!("Calculator IP {v}"),
        None => println!("Calculator IP version unknown"),
    }
    println!("Status: {:?}", calc.status()?);
    println!("Buffer count: {}\n", calc.buffer_count()?);
    print!("{}", calc.dump_registers("register dump")?);
    Ok(())
}
