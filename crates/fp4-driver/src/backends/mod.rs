// SPDX-License-Identifier: AGPL-3.0-only

//! MAC backend implementations
//!
//! - **Hardware**: register protocol over the mapped AXI-Lite window
//! - **Simulated**: FP4 codec arithmetic on the CPU

pub mod hardware;
pub mod simulated;

pub use hardware::{HardwareBackend, Timing};
pub use simulated::SimulatedBackend;
