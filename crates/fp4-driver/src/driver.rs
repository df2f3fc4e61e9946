// SPDX-License-Identifier: AGPL-3.0-only

//! Accelerator driver
//!
//! `AcceleratorDriver` owns exactly one backend, chosen once by probing the
//! register window. Opening never fails: if the physical-memory device is
//! missing, the mapping is refused, or another driver already owns the
//! window, the driver comes up on the simulated backend instead. Callers
//! branch on [`AcceleratorDriver::mode`], never on the result of `open`.

use crate::backend::{BackendMode, MacBackend};
use crate::backends::{HardwareBackend, SimulatedBackend, Timing};
use crate::config::DriverConfig;
use crate::error::Result;
use crate::mmio::RegisterWindow;
use fp4_chip::Codeword;

/// Handle to the FP4 MAC unit, real or simulated
#[derive(Debug)]
pub struct AcceleratorDriver {
    backend: Box<dyn MacBackend>,
    base_address: u64,
}

impl AcceleratorDriver {
    /// Probe the MAC unit and select a backend
    ///
    /// Always succeeds. Probe failures are logged at `warn` and the driver
    /// falls back to [`BackendMode::Simulated`].
    pub fn open(config: &DriverConfig) -> Self {
        let simulated = || -> Box<dyn MacBackend> {
            Box::new(SimulatedBackend::new(config.simulated_latency))
        };

        if config.force_simulation {
            tracing::info!("Hardware probe skipped; using simulated MAC");
            return Self::from_backend(simulated(), config.base_address);
        }

        match RegisterWindow::map(&config.device_path, config.base_address, config.window_size) {
            Ok(window) => {
                tracing::info!(
                    "MAC hardware detected at {:#x}; using register backend",
                    config.base_address
                );
                let timing = Timing {
                    reset_pulse: config.reset_pulse,
                    poll_interval: config.poll_interval,
                    poll_policy: config.poll_policy,
                };
                Self::from_backend(
                    Box::new(HardwareBackend::new(window, timing)),
                    config.base_address,
                )
            }
            Err(e) => {
                tracing::warn!("{e}; running in simulation mode");
                Self::from_backend(simulated(), config.base_address)
            }
        }
    }

    /// Probe using defaults overlaid with `FP4MAC_*` environment variables
    pub fn open_default() -> Self {
        Self::open(&DriverConfig::from_env())
    }

    /// Simulated driver, no probe
    #[must_use]
    pub fn simulated(config: &DriverConfig) -> Self {
        Self::from_backend(
            Box::new(SimulatedBackend::new(config.simulated_latency)),
            config.base_address,
        )
    }

    /// Wrap an already-constructed backend
    #[must_use]
    pub fn from_backend(backend: Box<dyn MacBackend>, base_address: u64) -> Self {
        tracing::debug!("Accelerator backend: {}", backend.mode());
        Self {
            backend,
            base_address,
        }
    }

    /// Which backend ended up active
    #[must_use]
    pub fn mode(&self) -> BackendMode {
        self.backend.mode()
    }

    /// Physical base address the driver was opened against
    #[must_use]
    pub const fn base_address(&self) -> u64 {
        self.base_address
    }

    /// Quantized product of two codewords (one quantization per call)
    ///
    /// # Errors
    ///
    /// Only on the hardware backend with a bounded poll policy, if the unit
    /// does not complete in time.
    pub fn multiply_accumulate(&mut self, a: Codeword, b: Codeword) -> Result<Codeword> {
        self.backend.multiply_accumulate(a, b)
    }

    /// Dot product of two codeword vectors, quantized once at the end
    ///
    /// # Errors
    ///
    /// Returns error if `a` and `b` differ in length, or on a hardware poll
    /// timeout (bounded policy only).
    pub fn dot_product(&mut self, a: &[Codeword], b: &[Codeword]) -> Result<Codeword> {
        self.backend.dot_product(a, b)
    }
}
