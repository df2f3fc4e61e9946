// SPDX-License-Identifier: AGPL-3.0-only

//! Register window backed by an ordinary file
//!
//! `RegisterWindow::map` only needs a file it can open read/write and mmap
//! shared at a page-aligned offset, so a sparse temp file stands in for
//! `/dev/mem`. The "device" never sets DONE by itself; each test seeds
//! STATUS and RESULT before opening.

use fp4_chip::regs::{self, control, status};
use fp4_chip::{encode, Codeword};
use fp4_driver::mmio::{is_claimed, MIN_WINDOW_SIZE};
use fp4_driver::{AcceleratorDriver, BackendMode, DriverConfig, MacError, RegisterBus, RegisterWindow};
use std::fs::{self, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::PathBuf;
use std::time::Duration;

const PAGE: usize = 0x1000;

/// Sparse file that is removed on drop
struct FakeMem {
    path: PathBuf,
}

impl FakeMem {
    fn new(name: &str, base: u64) -> Self {
        let path = std::env::temp_dir().join(format!("fp4mac-{}-{name}", std::process::id()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        file.set_len(base + PAGE as u64).unwrap();
        Self { path }
    }

    fn poke(&self, base: u64, offset: usize, value: u32) {
        let file = OpenOptions::new().write(true).open(&self.path).unwrap();
        file.write_all_at(&value.to_ne_bytes(), base + offset as u64).unwrap();
    }

    fn peek(&self, base: u64, offset: usize) -> u32 {
        let file = OpenOptions::new().read(true).open(&self.path).unwrap();
        let mut buf = [0u8; 4];
        file.read_exact_at(&mut buf, base + offset as u64).unwrap();
        u32::from_ne_bytes(buf)
    }

    fn config(&self, base: u64) -> DriverConfig {
        let mut config = DriverConfig::default()
            .with_device_path(&self.path)
            .with_base_address(base)
            .with_reset_pulse(Duration::ZERO)
            .with_poll_interval(Duration::ZERO)
            .with_simulated_latency(Duration::ZERO);
        config.window_size = PAGE;
        config
    }
}

impl Drop for FakeMem {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[test]
fn driver_runs_register_protocol_over_mapped_file() {
    let base = 0x1_0000;
    let mem = FakeMem::new("protocol", base);
    mem.poke(base, regs::STATUS, status::DONE);
    mem.poke(base, regs::RESULT, u32::from(encode(3.0).bits()));

    let mut mac = AcceleratorDriver::open(&mem.config(base));
    assert_eq!(mac.mode(), BackendMode::Hardware);

    let r = mac.multiply_accumulate(encode(1.5), encode(2.0)).unwrap();
    assert_eq!(r, encode(3.0));

    // Operands and the START strobe landed in the shared mapping
    assert_eq!(mem.peek(base, regs::INPUT_A), u32::from(encode(1.5).bits()));
    assert_eq!(mem.peek(base, regs::INPUT_B), u32::from(encode(2.0).bits()));
    assert_eq!(mem.peek(base, regs::CONTROL), control::START);
}

#[test]
fn second_driver_on_same_window_is_simulated() {
    let base = 0x2_0000;
    let mem = FakeMem::new("claim", base);
    mem.poke(base, regs::STATUS, status::DONE);

    let first = AcceleratorDriver::open(&mem.config(base));
    assert_eq!(first.mode(), BackendMode::Hardware);
    assert!(is_claimed(base));

    let second = AcceleratorDriver::open(&mem.config(base));
    assert_eq!(second.mode(), BackendMode::Simulated);

    drop(first);
    assert!(!is_claimed(base));

    let third = AcceleratorDriver::open(&mem.config(base));
    assert_eq!(third.mode(), BackendMode::Hardware);
}

#[test]
fn window_rejects_out_of_range_access() {
    let base = 0x3_0000;
    let mem = FakeMem::new("bounds", base);
    let mut window = RegisterWindow::map(&mem.path, base, PAGE).unwrap();
    assert_eq!(window.base(), base);
    assert_eq!(window.size(), PAGE);

    window.write_u32(regs::INPUT_A, 0x7).unwrap();
    assert_eq!(window.read_u32(regs::INPUT_A).unwrap(), 0x7);

    for offset in [PAGE, PAGE - 2, 0x3, usize::MAX - 3] {
        let err = window.read_u32(offset).unwrap_err();
        assert!(matches!(err, MacError::OutOfBounds { .. }), "{offset:#x}: {err}");
    }
    assert!(window.write_u32(PAGE, 0).is_err());
}

#[test]
fn dot_product_reads_back_unit_result() {
    let base = 0x4_0000;
    let mem = FakeMem::new("dot", base);
    mem.poke(base, regs::STATUS, status::DONE);
    mem.poke(base, regs::RESULT, 0xFFFF_FFF0 | u32::from(Codeword::MIN.bits()));

    let mut mac = AcceleratorDriver::open(&mem.config(base));
    let v = [encode(1.0), encode(-1.0), encode(0.5)];
    let r = mac.dot_product(&v, &v).unwrap();

    // Whatever the unit leaves in RESULT, masked to four bits
    assert_eq!(r, Codeword::MIN);
    assert_eq!(mem.peek(base, regs::CONTROL), control::IDLE);
}

#[test]
fn window_too_small_for_register_map_falls_back() {
    let base = 0x5_0000;
    let mem = FakeMem::new("small", base);
    mem.poke(base, regs::STATUS, status::DONE);

    let mut config = mem.config(base);
    config.window_size = regs::STATUS;
    let mut mac = AcceleratorDriver::open(&config);
    assert_eq!(mac.mode(), BackendMode::Simulated);
    assert!(!is_claimed(base));
    assert_eq!(mac.multiply_accumulate(encode(1.5), encode(2.0)).unwrap(), encode(3.0));

    config.window_size = MIN_WINDOW_SIZE;
    let mut mac = AcceleratorDriver::open(&config);
    assert_eq!(mac.mode(), BackendMode::Hardware);
    assert!(mac.multiply_accumulate(encode(1.0), encode(1.0)).is_ok());
}
