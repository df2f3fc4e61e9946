// SPDX-License-Identifier: AGPL-3.0-only

//! `fp4mac`: command-line interface for the FP4 MAC accelerator.
//!
//! ```text
//! USAGE:
//!   fp4mac info                      Backend, base address and register map
//!   fp4mac table                     FP4 encode/decode precision table
//!   fp4mac mac <a> <b>               One quantized multiply
//!   fp4mac dot --a .. --b ..         Dot product, quantized once
//!   fp4mac stats                     Time representative operations
//!   fp4mac bench [--ops N]           Driver vs native f32 throughput
//!   fp4mac xor                       XOR network on the MAC unit
//! ```

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use fp4_chip::{regs, Codeword};
use fp4_driver::network::Network;
use fp4_driver::{stats, AcceleratorDriver, DriverConfig, PollPolicy, SimulatedBackend};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fp4mac", about = "FP4 E2M1 MAC accelerator CLI", version)]
struct Cli {
    #[command(flatten)]
    driver: DriverArgs,

    #[command(subcommand)]
    command: Cmd,
}

/// Overrides applied on top of `FP4MAC_*` environment configuration.
#[derive(Args)]
struct DriverArgs {
    /// Skip the hardware probe and use the simulated MAC.
    #[arg(long, global = true)]
    simulate: bool,

    /// Physical-memory device (default /dev/mem).
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Register window base address, hex (0x43C00000) or decimal.
    #[arg(long, global = true, value_parser = parse_address)]
    base_addr: Option<u64>,

    /// Give up on STATUS.DONE after this many microseconds.
    #[arg(long, global = true)]
    poll_timeout_us: Option<u64>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Show the active backend and register map.
    Info,
    /// Print the FP4 precision table for a set of probe values.
    Table,
    /// Multiply two values on the MAC unit.
    Mac {
        /// First operand (encoded exact-match; anything else becomes 0).
        #[arg(allow_negative_numbers = true)]
        a: f32,
        /// Second operand.
        #[arg(allow_negative_numbers = true)]
        b: f32,
    },
    /// Dot product of two vectors, quantized once at the end.
    Dot {
        /// First vector (comma separated).
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        a: Vec<f32>,
        /// Second vector (comma separated).
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        b: Vec<f32>,
    },
    /// Time each representative operand class once.
    Stats,
    /// Compare driver MAC throughput against native f32.
    Bench {
        /// Number of operations per side.
        #[arg(long, default_value_t = 1000)]
        ops: usize,
    },
    /// Evaluate the hand-set XOR network on all four inputs.
    Xor,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let config = cli.driver.into_config();

    match cli.command {
        Cmd::Info => cmd_info(&config),
        Cmd::Table => {
            cmd_table();
            Ok(())
        }
        Cmd::Mac { a, b } => cmd_mac(&config, a, b),
        Cmd::Dot { a, b } => cmd_dot(&config, &a, &b),
        Cmd::Stats => cmd_stats(&config),
        Cmd::Bench { ops } => cmd_bench(&config, ops),
        Cmd::Xor => cmd_xor(&config),
    }
}

impl DriverArgs {
    fn into_config(self) -> DriverConfig {
        let mut config = DriverConfig::from_env();
        if self.simulate {
            config = config.simulated();
        }
        if let Some(device) = self.device {
            config = config.with_device_path(device);
        }
        if let Some(base) = self.base_addr {
            config = config.with_base_address(base);
        }
        if let Some(us) = self.poll_timeout_us {
            config = config.with_poll_policy(PollPolicy::Bounded(Duration::from_micros(us)));
        }
        config
    }
}

fn parse_address(raw: &str) -> std::result::Result<u64, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => raw.parse(),
    };
    parsed.map_err(|e| format!("invalid address {raw:?}: {e}"))
}

fn open_driver(config: &DriverConfig) -> AcceleratorDriver {
    let mac = AcceleratorDriver::open(config);
    info!(
        "MAC backend: {} (base {:#x}, device {})",
        mac.mode(),
        mac.base_address(),
        config.device_path.display()
    );
    mac
}

fn cmd_info(config: &DriverConfig) -> Result<()> {
    let mac = open_driver(config);

    println!("Backend      : {}", mac.mode());
    println!("Device       : {}", config.device_path.display());
    println!("Base address : {:#010x}", mac.base_address());
    println!("Window size  : {:#x}", config.window_size);
    match config.poll_policy {
        PollPolicy::Unbounded => println!("Poll policy  : unbounded"),
        PollPolicy::Bounded(d) => println!("Poll policy  : bounded ({d:?})"),
    }
    if !mac.mode().is_hardware() {
        println!("Sim latency  : {:?}", config.simulated_latency);
    }
    println!();
    println!("Registers:");
    for (offset, name) in regs::REGISTER_TABLE {
        println!("  {:#04x}  {name}", offset);
    }

    Ok(())
}

fn cmd_table() {
    let probes = [0.0, 0.5, 1.0, 1.5, 2.0, 3.0, 4.0, 6.0, -0.5, -1.0, -2.0, -6.0, 2.7, 5.1];

    println!("{:>8}  {:>4}  {:>8}  {:>8}", "value", "code", "decoded", "error");
    println!("{}", "-".repeat(34));
    for row in fp4_chip::precision_report(&probes) {
        println!(
            "{:>8.2}  {:#05x}  {:>8.2}  {:>8.3}",
            row.value,
            row.codeword.bits(),
            row.reconstructed,
            row.error
        );
    }
}

fn cmd_mac(config: &DriverConfig, a: f32, b: f32) -> Result<()> {
    let mut mac = open_driver(config);
    let (ca, cb) = (Codeword::encode(a), Codeword::encode(b));
    let r = mac.multiply_accumulate(ca, cb)?;

    println!("[{}] {ca} × {cb} = {r}", mac.mode());
    if r.is_zero() && a * b != 0.0 {
        println!("note: {} is not representable in FP4", a * b);
    }

    Ok(())
}

fn cmd_dot(config: &DriverConfig, a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        bail!("vectors differ in length: {} vs {}", a.len(), b.len());
    }

    let mut mac = open_driver(config);
    let ca: Vec<Codeword> = a.iter().copied().map(Codeword::encode).collect();
    let cb: Vec<Codeword> = b.iter().copied().map(Codeword::encode).collect();
    let r = mac.dot_product(&ca, &cb)?;

    let exact = SimulatedBackend::accumulate(&ca, &cb);
    println!("[{}] dot (len {}) = {r}", mac.mode(), a.len());
    println!("unquantized sum of decoded products: {exact}");

    Ok(())
}

fn cmd_stats(config: &DriverConfig) -> Result<()> {
    let mut mac = open_driver(config);
    let samples = stats::mac_statistics(&mut mac, &stats::representative_ops())?;

    println!("MAC statistics ({} backend)", mac.mode());
    println!();
    println!("{:<24} {:>6} {:>6} {:>12} {:>10}", "operation", "a", "b", "result", "time");
    for s in &samples {
        println!(
            "{:<24} {:>6.1} {:>6.1} {:>12} {:>10.1?}",
            s.label,
            s.a.decode(),
            s.b.decode(),
            s.result.to_string(),
            s.elapsed
        );
    }

    Ok(())
}

fn cmd_bench(config: &DriverConfig, ops: usize) -> Result<()> {
    let mut mac = open_driver(config);

    println!("Benchmarking {ops} operations on the {} backend...", mac.mode());
    let report = stats::benchmark(&mut mac, ops)?;

    println!();
    println!(
        "  driver : {:>10.1?}  ({:.1} ns/op, {:.3} Mops/s)",
        report.driver,
        report.driver_ns_per_op(),
        report.driver_mops()
    );
    println!(
        "  native : {:>10.1?}  ({:.1} ns/op)",
        report.native,
        report.native_ns_per_op()
    );
    println!("  speedup: {:.4}×", report.speedup());

    Ok(())
}

/// An XOR output scores as correct within this distance of the target
const XOR_TOLERANCE: f32 = 1.0;

fn xor_correct(output: f32, expected: f32) -> bool {
    (output - expected).abs() < XOR_TOLERANCE
}

fn cmd_xor(config: &DriverConfig) -> Result<()> {
    let mut mac = open_driver(config);
    let net = Network::xor();

    println!("XOR network ({} backend)", mac.mode());
    let mut correct = 0;
    for (x, expected) in [([0.0, 0.0], 0.0), ([0.0, 1.0], 1.0), ([1.0, 0.0], 1.0), ([1.0, 1.0], 0.0)] {
        let out = net.forward(&mut mac, &x)?;
        let y = out.first().copied().unwrap_or(0.0);
        let ok = xor_correct(y, expected);
        correct += usize::from(ok);
        println!(
            "  XOR({}, {}) = {y:.1}  (expected {expected:.0}) {}",
            x[0],
            x[1],
            if ok { "✓" } else { "✗" }
        );
    }
    println!("{correct}/4 correct");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn address_parsing() {
        assert_eq!(parse_address("0x43C0_0000"), Ok(0x43C0_0000));
        assert_eq!(parse_address("4096"), Ok(4096));
        assert!(parse_address("0xZZ").is_err());
    }

    #[test]
    fn global_flags_reach_config() {
        let cli = Cli::try_parse_from([
            "fp4mac",
            "mac",
            "--simulate",
            "--base-addr",
            "0x40000000",
            "--poll-timeout-us",
            "250",
            "1.5",
            "-2",
        ])
        .unwrap();
        let config = cli.driver.into_config();
        assert!(config.force_simulation);
        assert_eq!(config.base_address, 0x4000_0000);
        assert_eq!(
            config.poll_policy,
            PollPolicy::Bounded(Duration::from_micros(250))
        );
    }

    #[test]
    fn xor_scoring_tolerance() {
        assert!(xor_correct(1.0, 1.0));
        assert!(xor_correct(0.5, 1.0));
        assert!(xor_correct(-0.0, 0.0));
        assert!(!xor_correct(1.0, 0.0));
        assert!(!xor_correct(-1.5, 0.0));
    }

    #[test]
    fn simulate_flag_selects_simulated_backend() {
        let cli = Cli::try_parse_from(["fp4mac", "--simulate", "info"]).unwrap();
        let mac = open_driver(&cli.driver.into_config());
        assert_eq!(mac.mode(), fp4_driver::BackendMode::Simulated);
    }

    #[test]
    fn dot_accepts_negative_lists() {
        let cli = Cli::try_parse_from(["fp4mac", "dot", "--a", "1.5,-2", "--b", "-0.5,3"]).unwrap();
        match cli.command {
            Cmd::Dot { a, b } => {
                assert_eq!(a, vec![1.5, -2.0]);
                assert_eq!(b, vec![-0.5, 3.0]);
            }
            _ => panic!("expected dot"),
        }
    }
}
