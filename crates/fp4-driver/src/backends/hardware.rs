// SPDX-License-Identifier: AGPL-3.0-only

//! Hardware MAC backend
//!
//! Drives the MAC unit through its register window. No interrupts: every
//! step is a CONTROL strobe followed by polling STATUS.DONE.
//!
//! ```text
//! Idle → Reset → (LoadOperands → Start → Polling → Done)* → ReadResult → Idle
//! ```
//!
//! The accumulator inside the unit persists across START strobes until the
//! next RESET, which is what makes `dot_product` a single reset followed by
//! one START per element.

use crate::backend::{check_lengths, BackendMode, MacBackend};
use crate::config::PollPolicy;
use crate::error::{MacError, Result};
use crate::mmio::{RegisterBus, RegisterWindow};
use fp4_chip::regs::{self, control, status};
use fp4_chip::Codeword;
use std::time::{Duration, Instant};

/// Protocol timing for the hardware backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Time the reset bit is held high
    pub reset_pulse: Duration,
    /// Sleep between STATUS reads
    pub poll_interval: Duration,
    /// Completion wait policy
    pub poll_policy: PollPolicy,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            reset_pulse: Duration::from_micros(1),
            poll_interval: Duration::from_micros(1),
            poll_policy: PollPolicy::Unbounded,
        }
    }
}

/// Register-level MAC backend
///
/// Generic over the register bus so the protocol can run against a device
/// model; in production `B` is the mapped [`RegisterWindow`].
#[derive(Debug)]
pub struct HardwareBackend<B: RegisterBus = RegisterWindow> {
    bus: B,
    timing: Timing,
}

impl<B: RegisterBus> HardwareBackend<B> {
    /// Wrap a register bus
    pub fn new(bus: B, timing: Timing) -> Self {
        Self { bus, timing }
    }

    /// Borrow the underlying register bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Protocol timing in use
    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Clear the accumulator: RESET high, hold, back to idle
    fn reset(&mut self) -> Result<()> {
        self.bus.write_u32(regs::CONTROL, control::RESET)?;
        sleep_for(self.timing.reset_pulse);
        self.bus.write_u32(regs::CONTROL, control::IDLE)
    }

    /// Load both operands and strobe START
    fn start(&mut self, a: Codeword, b: Codeword) -> Result<()> {
        self.bus.write_u32(regs::INPUT_A, a.to_register())?;
        self.bus.write_u32(regs::INPUT_B, b.to_register())?;
        self.bus.write_u32(regs::CONTROL, control::START)
    }

    /// Poll STATUS until DONE is set
    fn wait_done(&self) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.bus.read_u32(regs::STATUS)? & status::DONE != 0 {
                return Ok(());
            }

            if let Some(limit) = self.timing.poll_policy.limit() {
                let waited = started.elapsed();
                if waited > limit {
                    tracing::warn!("MAC poll exceeded {limit:?}; device may be wedged");
                    return Err(MacError::timeout(waited));
                }
            }

            sleep_for(self.timing.poll_interval);
        }
    }

    fn read_result(&self) -> Result<Codeword> {
        let raw = self.bus.read_u32(regs::RESULT)?;
        Ok(Codeword::from_register(raw & regs::CODEWORD_MASK))
    }
}

impl<B: RegisterBus> MacBackend for HardwareBackend<B> {
    fn multiply_accumulate(&mut self, a: Codeword, b: Codeword) -> Result<Codeword> {
        self.reset()?;
        self.start(a, b)?;
        self.wait_done()?;
        let result = self.read_result()?;
        tracing::trace!("hw mac {a} × {b} = {result}");
        Ok(result)
    }

    fn dot_product(&mut self, a: &[Codeword], b: &[Codeword]) -> Result<Codeword> {
        check_lengths(a, b)?;
        self.reset()?;
        for (&x, &y) in a.iter().zip(b) {
            self.start(x, y)?;
            self.wait_done()?;
            self.bus.write_u32(regs::CONTROL, control::IDLE)?;
        }
        let result = self.read_result()?;
        tracing::trace!("hw dot len={} → {result}", a.len());
        Ok(result)
    }

    fn mode(&self) -> BackendMode {
        BackendMode::Hardware
    }
}

fn sleep_for(d: Duration) {
    if !d.is_zero() {
        std::thread::sleep(d);
    }
}
