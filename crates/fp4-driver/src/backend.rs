// SPDX-License-Identifier: AGPL-3.0-only

//! Backend abstraction for the MAC driver
//!
//! Two interchangeable execution strategies sit behind [`MacBackend`]:
//! the register-level [`HardwareBackend`](crate::backends::HardwareBackend)
//! and the codec-level [`SimulatedBackend`](crate::backends::SimulatedBackend).
//! One is chosen when the driver is opened and never changes afterwards.

use crate::error::Result;
use fp4_chip::Codeword;
use std::fmt::Debug;

/// MAC backend trait - unified interface for hardware and simulation
///
/// The two operations have different numeric policies:
/// `multiply_accumulate` quantizes its single product, `dot_product`
/// quantizes only the final sum. Do not express one in terms of the other.
pub trait MacBackend: Debug + Send {
    /// Multiply two codewords and return the quantized product
    ///
    /// # Errors
    ///
    /// Hardware only: returns error if the poll bound is exceeded or a
    /// register access fails.
    fn multiply_accumulate(&mut self, a: Codeword, b: Codeword) -> Result<Codeword>;

    /// Sum the pairwise products of `a` and `b`, quantized once
    ///
    /// # Errors
    ///
    /// Returns error if `a` and `b` differ in length, or (hardware only) if
    /// the poll bound is exceeded.
    fn dot_product(&mut self, a: &[Codeword], b: &[Codeword]) -> Result<Codeword>;

    /// Which backend this is
    fn mode(&self) -> BackendMode;
}

/// Active backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendMode {
    /// Register protocol against the mapped MAC unit
    Hardware,

    /// Codec arithmetic on the CPU with an artificial latency
    Simulated,
}

impl BackendMode {
    /// Whether operations reach real hardware
    #[must_use]
    pub const fn is_hardware(self) -> bool {
        matches!(self, Self::Hardware)
    }
}

impl std::fmt::Display for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hardware => write!(f, "Hardware"),
            Self::Simulated => write!(f, "Simulated"),
        }
    }
}

/// Reject dot-product operands of different lengths
pub(crate) fn check_lengths(a: &[Codeword], b: &[Codeword]) -> Result<()> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(crate::MacError::LengthMismatch {
            a: a.len(),
            b: b.len(),
        })
    }
}
