// SPDX-License-Identifier: AGPL-3.0-only

//! Driver configuration
//!
//! Defaults reproduce the MAC firmware's timing constants. Every field can be
//! overridden with a `with_*` builder or from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `FP4MAC_DEVICE` | `device_path` |
//! | `FP4MAC_BASE_ADDR` | `base_address` (hex with `0x`, or decimal) |
//! | `FP4MAC_SIMULATE` | `force_simulation` (`1`, `true`, `yes`) |
//! | `FP4MAC_POLL_TIMEOUT_US` | `poll_policy` (bounded) |
//! | `FP4MAC_SIM_LATENCY_US` | `simulated_latency` |

use fp4_chip::window;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// How long the hardware backend waits for STATUS.DONE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPolicy {
    /// Poll forever. A wedged device blocks the caller indefinitely.
    #[default]
    Unbounded,

    /// Give up with [`MacError::Timeout`](crate::MacError::Timeout) once
    /// this much time has passed.
    Bounded(Duration),
}

impl PollPolicy {
    /// Deadline for one poll, if any
    #[must_use]
    pub const fn limit(self) -> Option<Duration> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(d) => Some(d),
        }
    }
}

/// Accelerator driver configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Physical-memory device used to reach the register window
    pub device_path: PathBuf,

    /// Physical base address of the register window
    pub base_address: u64,

    /// Bytes to map starting at `base_address`
    pub window_size: usize,

    /// Artificial latency of one simulated MAC
    pub simulated_latency: Duration,

    /// Time the reset bit is held high
    pub reset_pulse: Duration,

    /// Sleep between STATUS reads
    pub poll_interval: Duration,

    /// Completion wait policy
    pub poll_policy: PollPolicy,

    /// Skip the hardware probe entirely
    pub force_simulation: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(window::DEVICE_PATH),
            base_address: window::BASE_ADDR,
            window_size: window::WINDOW_SIZE,
            simulated_latency: Duration::from_micros(100),
            reset_pulse: Duration::from_micros(1),
            poll_interval: Duration::from_micros(1),
            poll_policy: PollPolicy::Unbounded,
            force_simulation: false,
        }
    }
}

impl DriverConfig {
    /// Defaults overlaid with any `FP4MAC_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("FP4MAC_DEVICE") {
            config.device_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("FP4MAC_BASE_ADDR") {
            match parse_address(&raw) {
                Some(addr) => config.base_address = addr,
                None => warn!("Ignoring FP4MAC_BASE_ADDR={raw:?}: not an address"),
            }
        }
        if let Some(raw) = lookup("FP4MAC_SIMULATE") {
            config.force_simulation =
                matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(raw) = lookup("FP4MAC_POLL_TIMEOUT_US") {
            match raw.trim().parse::<u64>() {
                Ok(us) => config.poll_policy = PollPolicy::Bounded(Duration::from_micros(us)),
                Err(e) => warn!("Ignoring FP4MAC_POLL_TIMEOUT_US={raw:?}: {e}"),
            }
        }
        if let Some(raw) = lookup("FP4MAC_SIM_LATENCY_US") {
            match raw.trim().parse::<u64>() {
                Ok(us) => config.simulated_latency = Duration::from_micros(us),
                Err(e) => warn!("Ignoring FP4MAC_SIM_LATENCY_US={raw:?}: {e}"),
            }
        }

        config
    }

    /// Use a different physical-memory device
    #[must_use]
    pub fn with_device_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.device_path = path.into();
        self
    }

    /// Use a different base address
    #[must_use]
    pub const fn with_base_address(mut self, base: u64) -> Self {
        self.base_address = base;
        self
    }

    /// Set the simulated per-MAC latency
    #[must_use]
    pub const fn with_simulated_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = latency;
        self
    }

    /// Set the completion wait policy
    #[must_use]
    pub const fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Set the STATUS poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the reset pulse width
    #[must_use]
    pub const fn with_reset_pulse(mut self, pulse: Duration) -> Self {
        self.reset_pulse = pulse;
        self
    }

    /// Skip the hardware probe
    #[must_use]
    pub const fn simulated(mut self) -> Self {
        self.force_simulation = true;
        self
    }
}

fn parse_address(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16).ok(),
        None => raw.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_firmware_constants() {
        let c = DriverConfig::default();
        assert_eq!(c.base_address, 0x43C0_0000);
        assert_eq!(c.window_size, 0x1_0000);
        assert_eq!(c.device_path, PathBuf::from("/dev/mem"));
        assert_eq!(c.simulated_latency, Duration::from_micros(100));
        assert_eq!(c.poll_policy, PollPolicy::Unbounded);
        assert!(!c.force_simulation);
    }

    #[test]
    fn env_overrides_apply() {
        let c = DriverConfig::from_lookup(lookup(&[
            ("FP4MAC_DEVICE", "/tmp/fake-mem"),
            ("FP4MAC_BASE_ADDR", "0x4000_0000"),
            ("FP4MAC_SIMULATE", "yes"),
            ("FP4MAC_POLL_TIMEOUT_US", "500"),
            ("FP4MAC_SIM_LATENCY_US", "0"),
        ]));
        assert_eq!(c.device_path, PathBuf::from("/tmp/fake-mem"));
        assert_eq!(c.base_address, 0x4000_0000);
        assert!(c.force_simulation);
        assert_eq!(c.poll_policy.limit(), Some(Duration::from_micros(500)));
        assert_eq!(c.simulated_latency, Duration::ZERO);
    }

    #[test]
    fn bad_env_values_are_ignored() {
        let c = DriverConfig::from_lookup(lookup(&[
            ("FP4MAC_BASE_ADDR", "nowhere"),
            ("FP4MAC_POLL_TIMEOUT_US", "-1"),
        ]));
        assert_eq!(c, DriverConfig::default());
    }

    #[test]
    fn decimal_address_parses() {
        assert_eq!(parse_address("1136656384"), Some(0x43C0_0000));
        assert_eq!(parse_address("0X43C00000"), Some(0x43C0_0000));
    }
}
