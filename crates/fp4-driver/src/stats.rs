// SPDX-License-Identifier: AGPL-3.0-only

//! Timing helpers: per-operation statistics and the MAC throughput benchmark.

use crate::driver::AcceleratorDriver;
use crate::error::Result;
use fp4_chip::Codeword;
use std::hint::black_box;
use std::time::{Duration, Instant};

/// One timed MAC
#[derive(Debug, Clone, PartialEq)]
pub struct OpSample {
    /// Label for the operand class
    pub label: &'static str,
    /// Operand A
    pub a: Codeword,
    /// Operand B
    pub b: Codeword,
    /// Driver result
    pub result: Codeword,
    /// Wall-clock time of the call
    pub elapsed: Duration,
}

/// Representative operand classes: zero, subnormal, normal, overflow,
/// mixed sign, exact product
#[must_use]
pub fn representative_ops() -> Vec<(&'static str, Codeword, Codeword)> {
    let e = Codeword::encode;
    vec![
        ("Zero × Nonzero", e(0.0), e(1.0)),
        ("Subnormal × Subnormal", e(0.5), e(0.5)),
        ("Normal × Normal", e(1.0), e(1.0)),
        ("Max × Max (overflow)", e(6.0), e(6.0)),
        ("Negative × Positive", e(-2.0), e(3.0)),
        ("Mixed precision", e(1.5), e(2.0)),
    ]
}

/// Time each operation once on the driver
///
/// # Errors
///
/// Returns error if any MAC fails (hardware poll timeout).
pub fn mac_statistics(
    mac: &mut AcceleratorDriver,
    ops: &[(&'static str, Codeword, Codeword)],
) -> Result<Vec<OpSample>> {
    ops.iter()
        .map(|&(label, a, b)| {
            let t0 = Instant::now();
            let result = mac.multiply_accumulate(a, b)?;
            Ok(OpSample {
                label,
                a,
                b,
                result,
                elapsed: t0.elapsed(),
            })
        })
        .collect()
}

/// Driver throughput versus native f32 multiply-add
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchReport {
    /// Operations per side
    pub ops: usize,
    /// Total time for `ops` driver MACs
    pub driver: Duration,
    /// Total time for `ops` native f32 MACs
    pub native: Duration,
}

#[allow(clippy::cast_precision_loss)]
impl BenchReport {
    /// Nanoseconds per driver MAC
    #[must_use]
    pub fn driver_ns_per_op(&self) -> f64 {
        self.driver.as_nanos() as f64 / self.ops.max(1) as f64
    }

    /// Nanoseconds per native MAC
    #[must_use]
    pub fn native_ns_per_op(&self) -> f64 {
        self.native.as_nanos() as f64 / self.ops.max(1) as f64
    }

    /// `native / driver`; above 1.0 means the driver is faster
    #[must_use]
    pub fn speedup(&self) -> f64 {
        let driver = self.driver.as_nanos().max(1) as f64;
        self.native.as_nanos() as f64 / driver
    }

    /// Driver throughput in millions of operations per second
    #[must_use]
    pub fn driver_mops(&self) -> f64 {
        let ns = self.driver_ns_per_op();
        if ns > 0.0 {
            1_000.0 / ns
        } else {
            0.0
        }
    }
}

/// Run `ops` MACs of 1.5 × 2.0 on the driver and the same number of native
/// f32 multiply-adds
///
/// # Errors
///
/// Returns error if any driver MAC fails.
pub fn benchmark(mac: &mut AcceleratorDriver, ops: usize) -> Result<BenchReport> {
    let a = Codeword::encode(1.5);
    let b = Codeword::encode(2.0);

    let t0 = Instant::now();
    for _ in 0..ops {
        black_box(mac.multiply_accumulate(black_box(a), black_box(b))?);
    }
    let driver = t0.elapsed();

    let t0 = Instant::now();
    let mut acc = 0.0f32;
    for _ in 0..ops {
        acc += black_box(1.5f32) * black_box(2.0f32);
    }
    black_box(acc);
    let native = t0.elapsed();

    tracing::debug!("benchmark: {ops} ops, driver {driver:?}, native {native:?}");
    Ok(BenchReport { ops, driver, native })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DriverConfig;

    fn sim(latency: Duration) -> AcceleratorDriver {
        AcceleratorDriver::simulated(&DriverConfig::default().with_simulated_latency(latency))
    }

    #[test]
    fn statistics_cover_every_op() {
        let mut mac = sim(Duration::ZERO);
        let ops = representative_ops();
        let samples = mac_statistics(&mut mac, &ops).unwrap();
        assert_eq!(samples.len(), ops.len());
        let exact = samples.iter().find(|s| s.label == "Mixed precision").unwrap();
        assert_eq!(exact.result, Codeword::encode(3.0));
        let overflow = samples.iter().find(|s| s.label.starts_with("Max")).unwrap();
        assert_eq!(overflow.result, Codeword::ZERO);
    }

    #[test]
    fn benchmark_reflects_simulated_latency() {
        let mut mac = sim(Duration::from_micros(200));
        let report = benchmark(&mut mac, 10).unwrap();
        assert_eq!(report.ops, 10);
        assert!(report.driver >= Duration::from_millis(2));
        assert!(report.driver_ns_per_op() >= 200_000.0);
        assert!(report.speedup() < 1.0);
    }

    #[test]
    fn zero_op_benchmark_is_well_defined() {
        let mut mac = sim(Duration::ZERO);
        let report = benchmark(&mut mac, 0).unwrap();
        assert!(report.driver_ns_per_op().is_finite());
        assert!(report.driver_mops().is_finite());
    }
}
