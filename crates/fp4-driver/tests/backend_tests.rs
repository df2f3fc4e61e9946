// SPDX-License-Identifier: AGPL-3.0-only

//! On-board validation
//!
//! Run on the Zynq target as root: `cargo test -- --ignored`

use fp4_chip::{encode, Codeword};
use fp4_driver::{
    AcceleratorDriver, BackendMode, DriverConfig, MacBackend, PollPolicy, SimulatedBackend,
};
use std::time::Duration;

fn board() -> AcceleratorDriver {
    let config = DriverConfig::from_env()
        .with_poll_policy(PollPolicy::Bounded(Duration::from_millis(100)));
    let mac = AcceleratorDriver::open(&config);
    assert_eq!(mac.mode(), BackendMode::Hardware, "MAC unit not reachable");
    mac
}

#[test]
#[ignore] // Requires the MAC bitstream loaded and /dev/mem access
fn test_hardware_backend_selected() {
    let mac = board();
    println!("MAC unit at {:#x}", mac.base_address());
}

#[test]
#[ignore] // Requires hardware
fn test_hardware_mac_matches_simulation() {
    let mut mac = board();
    let mut sim = SimulatedBackend::new(Duration::ZERO);

    let mut mismatches = 0;
    for a in Codeword::all() {
        for b in Codeword::all() {
            let h = mac.multiply_accumulate(a, b).expect("hardware MAC");
            let s = sim.multiply_accumulate(a, b).expect("simulated MAC");
            if h.decode() != s.decode() {
                println!("  {a} × {b}: hw {h}, sim {s}");
                mismatches += 1;
            }
        }
    }
    assert_eq!(mismatches, 0, "hardware and simulation disagree");
}

#[test]
#[ignore] // Requires hardware
fn test_hardware_dot_product() {
    let mut mac = board();
    let ones = [encode(1.0); 3];
    // Partial sums 1, 2, 3 are all representable, so per-step and final
    // quantization agree
    assert_eq!(mac.dot_product(&ones, &ones).expect("dot"), encode(3.0));
}
