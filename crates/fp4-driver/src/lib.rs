// SPDX-License-Identifier: AGPL-3.0-only

//! Driver for the FP4 E2M1 multiply-accumulate accelerator.
//!
//! The MAC unit is a small AXI-Lite peripheral on a Zynq-7010 fabric: two
//! 4-bit operand registers, an accumulator and a start/reset/done handshake.
//! This crate talks to it through `/dev/mem` and falls back to a software
//! model of the same arithmetic when the register window is unreachable.
//!
//! # Backend hierarchy
//!
//! ```text
//! HardwareBackend   register protocol over the mapped window (preferred)
//! SimulatedBackend  FP4 codec arithmetic on the CPU (automatic fallback)
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use fp4_driver::{AcceleratorDriver, DriverConfig};
//! use fp4_chip::encode;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut mac = AcceleratorDriver::open(&DriverConfig::from_env());
//! println!("MAC backend: {}", mac.mode());
//!
//! let p = mac.multiply_accumulate(encode(1.5), encode(2.0))?;
//! assert_eq!(p, encode(3.0));
//!
//! let v = [encode(1.5), encode(-2.0)];
//! let d = mac.dot_product(&v, &v)?;
//! assert_eq!(d, encode(0.0)); // 6.25 is not representable
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod backend;
pub mod backends;
mod config;
mod driver;
mod error;
pub mod mmio;
pub mod network;
pub mod stats;

pub use backend::{BackendMode, MacBackend};
pub use backends::{HardwareBackend, SimulatedBackend, Timing};
pub use config::{DriverConfig, PollPolicy};
pub use driver::AcceleratorDriver;
pub use error::{MacError, Result};
pub use mmio::{RegisterBus, RegisterWindow};

/// Register map and codec (re-exported from fp4-chip).
pub mod chip {
    pub use fp4_chip::{codec, regs, window};
    pub use fp4_chip::{decode, encode, Codeword};
}

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        AcceleratorDriver, BackendMode, DriverConfig, MacBackend, MacError, PollPolicy, Result,
    };
    pub use fp4_chip::{decode, encode, Codeword};
}
