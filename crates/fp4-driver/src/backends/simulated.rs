// SPDX-License-Identifier: AGPL-3.0-only

//! Simulated MAC backend
//!
//! Implements `MacBackend` with the FP4 codec and plain f32 arithmetic. Used
//! whenever the register window cannot be mapped, and as the reference the
//! hardware path is compared against.
//!
//! ## Numeric policy
//!
//! ```text
//! multiply_accumulate:  encode(decode(a) · decode(b))           one quantization per op
//! dot_product:          encode(Σ decode(a[i]) · decode(b[i]))   one quantization per sum
//! ```
//!
//! Every product of two codewords is a multiple of 0.25 no larger than 36,
//! so the f32 running sum is exact and the only rounding is the final
//! encode. Quantizing per product instead gives different answers for
//! vectors of length ≥ 2 (`[1.5, -2]·[1.5, -2]` is `0x0` here, `4.0` that way).

use crate::backend::{check_lengths, BackendMode, MacBackend};
use crate::error::Result;
use fp4_chip::Codeword;
use std::time::Duration;
use tracing::trace;

/// Software stand-in for the MAC unit
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    /// Sleep applied to every `multiply_accumulate`
    latency: Duration,
}

impl SimulatedBackend {
    /// Create a simulated backend with the given per-MAC latency
    #[must_use]
    pub const fn new(latency: Duration) -> Self {
        Self { latency }
    }

    /// Per-MAC artificial latency
    #[must_use]
    pub const fn latency(&self) -> Duration {
        self.latency
    }

    /// Quantized product of two codewords, without the artificial latency
    #[must_use]
    pub fn product(a: Codeword, b: Codeword) -> Codeword {
        Codeword::encode(a.decode() * b.decode())
    }

    /// Unquantized dot product of two equal-length codeword slices
    ///
    /// The running sum starts at +0.0, like the unit's accumulator after
    /// RESET, so an empty or all-zero dot product is `+0` rather than `-0`.
    #[must_use]
    pub fn accumulate(a: &[Codeword], b: &[Codeword]) -> f32 {
        a.iter()
            .zip(b)
            .fold(0.0_f32, |acc, (x, y)| acc + x.decode() * y.decode())
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(Duration::from_micros(100))
    }
}

impl MacBackend for SimulatedBackend {
    fn multiply_accumulate(&mut self, a: Codeword, b: Codeword) -> Result<Codeword> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        let result = Self::product(a, b);
        trace!("sim mac {a} × {b} = {result}");
        Ok(result)
    }

    fn dot_product(&mut self, a: &[Codeword], b: &[Codeword]) -> Result<Codeword> {
        check_lengths(a, b)?;
        let sum = Self::accumulate(a, b);
        let result = Codeword::encode(sum);
        trace!("sim dot len={} sum={sum} → {result}", a.len());
        Ok(result)
    }

    fn mode(&self) -> BackendMode {
        BackendMode::Simulated
    }
}
