// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for MAC driver operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for MAC driver operations
pub type Result<T> = std::result::Result<T, MacError>;

/// Errors that can occur while probing or driving the MAC unit
///
/// Probe-time variants never reach callers of
/// [`AcceleratorDriver::open`](crate::AcceleratorDriver::open); they are
/// absorbed into a fallback to the simulated backend. Only `Timeout` (with a
/// bounded poll policy) and `LengthMismatch` can surface from arithmetic.
#[derive(Debug, Error)]
pub enum MacError {
    /// Physical-memory device could not be opened
    #[error("Cannot open {path}: {source}")]
    DeviceUnavailable {
        /// Device path that was tried
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// mmap of the register window failed
    #[error("Failed to map {size:#x} bytes at {base:#x}: {reason}")]
    MapFailed {
        /// Physical base address
        base: u64,
        /// Requested window size
        size: usize,
        /// Reason for failure
        reason: String,
    },

    /// Another live driver already owns this register window
    #[error("Register window at {base:#x} is already owned by a live driver")]
    AddressInUse {
        /// Physical base address
        base: u64,
    },

    /// Register access outside the mapped window
    #[error("Register access out of bounds: offset={offset:#x}, limit={limit:#x}")]
    OutOfBounds {
        /// Byte offset of the access
        offset: usize,
        /// Size of the mapped window
        limit: usize,
    },

    /// STATUS never reported completion within the configured poll bound
    #[error("MAC did not signal done after {waited_us}µs")]
    Timeout {
        /// Time spent polling, in microseconds
        waited_us: u64,
    },

    /// Dot-product operands of different lengths
    #[error("Operand length mismatch: a has {a} elements, b has {b}")]
    LengthMismatch {
        /// Length of operand A
        a: usize,
        /// Length of operand B
        b: usize,
    },
}

impl MacError {
    /// Create a device unavailable error
    pub fn device_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DeviceUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Create a map failed error
    pub fn map_failed(base: u64, size: usize, reason: impl Into<String>) -> Self {
        Self::MapFailed {
            base,
            size,
            reason: reason.into(),
        }
    }

    /// Create a timeout error from the elapsed poll time
    #[allow(clippy::cast_possible_truncation)]
    pub fn timeout(waited: std::time::Duration) -> Self {
        Self::Timeout {
            waited_us: waited.as_micros() as u64,
        }
    }

    /// Whether this error came from probing the device (and so is absorbed
    /// into a simulated fallback by `open`)
    #[must_use]
    pub const fn is_probe_failure(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable { .. }
                | Self::MapFailed { .. }
                | Self::AddressInUse { .. }
        )
    }
}
