//! `hftcalc`: command-line interface for the HFT calculator accelerator.
//!
//! ```text
//! USAGE:
//!   hftcalc info                              Version, status, register dump
//!   hftcalc calc <op> <a> <b>                 One arithmetic operation
//!   hftcalc stat <op> --window N <prices...>  Windowed statistic over prices
//!   hftcalc selftest [--suite basic|hft|all]  Run the built-in test tables
//!
//! GLOBAL:
//!   --simulated            Use the software model instead of hardware
//!   --device/--base/--offset, --uio PATH      Where the registers live
//!   -v, -vv, -vvv          info / debug / trace logging (RUST_LOG wins)
//! ```

mod suites;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use hftcalc_chip::bridge;
use hftcalc_driver::{
    Calculator, DriverConfig, MapConfig, MmapTransport, Operation, RegisterTransport,
    SimulatedCalculator,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hftcalc", about = "HFT calculator accelerator CLI", version)]
struct Cli {
    #[command(flatten)]
    target: Target,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args)]
struct Target {
    /// Drive the software model instead of hardware.
    #[arg(long, global = true)]
    simulated: bool,

    /// Physical memory device to map.
    #[arg(long, global = true, default_value = "/dev/mem")]
    device: PathBuf,

    /// Physical base address of the lightweight bridge.
    #[arg(long, global = true, value_parser = parse_addr, default_value = "0xFF200000")]
    base: u64,

    /// Calculator offset inside the bridge.
    #[arg(long, global = true, value_parser = parse_addr, default_value = "0x80000")]
    offset: u64,

    /// Map a UIO node exporting only the calculator (overrides --device/--base/--offset).
    #[arg(long, global = true, conflicts_with = "simulated")]
    uio: Option<PathBuf>,

    /// Status polls before a command times out.
    #[arg(long, global = true)]
    max_polls: Option<u32>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print IP version, status, buffer count and all registers.
    Info,
    /// Run one arithmetic operation.
    Calc {
        /// ADD, SUB, MUL or DIV.
        op: Operation,
        /// Operand A.
        #[arg(allow_negative_numbers = true)]
        a: f32,
        /// Operand B.
        #[arg(allow_negative_numbers = true)]
        b: f32,
    },
    /// Reset the buffer, push prices and evaluate a windowed statistic.
    Stat {
        /// SMA, EMA, WMA, VWAP, STD_DEV, RSI, BOLLINGER_UP, BOLLINGER_DN, MIN, MAX, RANGE.
        op: Operation,
        /// Window size (defaults to the number of prices).
        #[arg(short, long)]
        window: Option<u32>,
        /// EMA smoothing factor (defaults to 2 / (window + 1)).
        #[arg(short, long)]
        alpha: Option<f32>,
        /// Prices, oldest first.
        #[arg(required = true, allow_negative_numbers = true)]
        prices: Vec<f32>,
    },
    /// Run the built-in test tables; exits non-zero on any failure.
    Selftest {
        /// Which tables to run.
        #[arg(long, value_enum, default_value_t = suites::Suite::All)]
        suite: suites::Suite,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .init();

    let mut calc = open(&cli.target)?;

    match cli.command {
        Cmd::Info => cmd_info(&calc)?,
        Cmd::Calc { op, a, b } => cmd_calc(&mut calc, op, a, b)?,
        Cmd::Stat {
            op,
            window,
            alpha,
            prices,
        } => cmd_stat(&mut calc, op, window, alpha, &prices)?,
        Cmd::Selftest { suite } => cmd_selftest(&mut calc, suite)?,
    }

    calc.cleanup();
    Ok(())
}

fn parse_addr(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid address '{s}': {e}"))
}

fn open(target: &Target) -> Result<Calculator<Box<dyn RegisterTransport>>> {
    let mut config = if target.simulated {
        DriverConfig::simulated()
    } else {
        DriverConfig::default()
    };
    if let Some(n) = target.max_polls {
        config = config.with_max_polls(n);
    }

    let transport: Box<dyn RegisterTransport> = if target.simulated {
        Box::new(SimulatedCalculator::new().with_busy_polls(16))
    } else {
        let map = map_config(target)?;
        let mmap = MmapTransport::open(&map)
            .with_context(|| format!("mapping calculator through {}", map.device.display()))?;
        Box::new(mmap)
    };

    Calculator::init(transport, config).context("initializing calculator")
}

fn map_config(target: &Target) -> Result<MapConfig> {
    if let Some(uio) = &target.uio {
        return Ok(MapConfig::uio(uio));
    }
    let offset = usize::try_from(target.offset).context("offset does not fit in usize")?;
    if offset >= bridge::lw_bridge::SPAN {
        bail!(
            "offset {offset:#x} lies outside the {:#x}-byte bridge window",
            bridge::lw_bridge::SPAN
        );
    }
    Ok(MapConfig {
        device: target.device.clone(),
        map_offset: target.base,
        ..MapConfig::dev_mem(offset)
    })
}

fn cmd_info<T: RegisterTransport>(calc: &Calculator<T>) -> Result<()> {
    let kind = calc.transport().map(RegisterTransport::kind);
    let status = calc.status()?;

    println!("Transport    : {}", kind.map_or_else(|| "-".into(), |k| k.to_string()));
    match calc.ip_version() {
        Some(v) => println!("IP version   : {v} ({:#010x})", calc.version()),
        None => println!("IP version   : unknown ({:#010x})", calc.version()),
    }
    println!(
        "Status       : busy={} error={} done={} buffer_full={}",
        status.busy, status.error, status.done, status.buffer_full
    );
    println!("Buffer count : {}", calc.buffer_count()?);
    println!();
    print!("{}", calc.dump_registers("info")?);
    Ok(())
}

fn cmd_calc<T: RegisterTransport>(calc: &mut Calculator<T>, op: Operation, a: f32, b: f32) -> Result<()> {
    if !op.is_arithmetic() {
        bail!("{op} is a windowed statistic; use `hftcalc stat {op} ...`");
    }
    let result = calc.perform_operation(op, a, b)?;
    println!("{op}({a}, {b}) = {result}");
    Ok(())
}

fn cmd_stat<T: RegisterTransport>(
    calc: &mut Calculator<T>,
    op: Operation,
    window: Option<u32>,
    alpha: Option<f32>,
    prices: &[f32],
) -> Result<()> {
    if !op.is_windowed() {
        bail!("{op} is arithmetic; use `hftcalc calc {op} A B`");
    }
    let window = match window {
        Some(w) => w,
        None => u32::try_from(prices.len()).context("too many prices")?,
    };

    calc.reset_buffer()?;
    calc.write_prices(prices).context("pushing prices")?;
    calc.set_window_size(window)?;
    if op.uses_alpha() {
        let alpha = match alpha {
            Some(a) => a,
            None => hftcalc_chip::buffer::alpha_for_period(
                u16::try_from(window).context("window too large")?,
            ),
        };
        calc.set_alpha(alpha)?;
    }

    let result = calc.compute(op)?;
    println!("{op}[{window}] = {result}");
    Ok(())
}

fn cmd_selftest<T: RegisterTransport>(calc: &mut Calculator<T>, suite: suites::Suite) -> Result<()> {
    let tally = suites::run(calc, suite);
    println!();
    println!("{} / {} passed", tally.passed, tally.total());
    if tally.failed > 0 {
        bail!("{} self-test case(s) failed", tally.failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn addresses_accept_hex_and_decimal() {
        assert_eq!(parse_addr("0xFF200000"), Ok(0xFF20_0000));
        assert_eq!(parse_addr("0x8_0000"), Ok(0x8_0000));
        assert_eq!(parse_addr("524288"), Ok(0x8_0000));
        assert!(parse_addr("0xZZ").is_err());
    }

    #[test]
    fn stat_parses_negative_prices() {
        let cli = Cli::try_parse_from(["hftcalc", "--simulated", "stat", "min", "-w", "2", "-1.5", "3"]).unwrap();
        match cli.command {
            Cmd::Stat { op, window, prices, .. } => {
                assert_eq!(op, Operation::Min);
                assert_eq!(window, Some(2));
                assert_eq!(prices, vec![-1.5, 3.0]);
            }
            _ => panic!("expected stat"),
        }
        assert!(cli.target.simulated);
    }

    #[test]
    fn default_map_is_de10_nano() {
        let cli = Cli::try_parse_from(["hftcalc", "info"]).unwrap();
        assert_eq!(map_config(&cli.target).unwrap(), MapConfig::de10_nano());
    }

    #[test]
    fn simulated_session() {
        let cli = Cli::try_parse_from(["hftcalc", "--simulated", "info"]).unwrap();
        let mut calc = open(&cli.target).unwrap();
        cmd_calc(&mut calc, Operation::Add, 1.0, 2.0).unwrap();
        cmd_stat(&mut calc, Operation::Ema, None, None, &[1.0, 2.0, 3.0]).unwrap();
        assert!(cmd_calc(&mut calc, Operation::Sma, 1.0, 2.0).is_err());
        cmd_selftest(&mut calc, suites::Suite::Basic).unwrap();
        cmd_info(&calc).unwrap();
    }
}
