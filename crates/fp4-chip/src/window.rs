// SPDX-License-Identifier: AGPL-3.0-only

//! Physical placement of the MAC register window.
//!
//! The MAC IP sits on the Zynq-7010 general-purpose AXI port. The default
//! base is the first slot Vivado assigns to a custom AXI-Lite peripheral.

/// Physical base address of the MAC register block.
pub const BASE_ADDR: u64 = 0x43C0_0000;

/// Size of the mapped window (one 64 KB AXI address slot).
pub const WINDOW_SIZE: usize = 0x1_0000;

/// Default physical-memory device used to reach the window.
pub const DEVICE_PATH: &str = "/dev/mem";
