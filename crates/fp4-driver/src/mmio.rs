// SPDX-License-Identifier: AGPL-3.0-only

//! Memory-mapped register access for the MAC unit
//!
//! [`RegisterWindow`] maps the MAC's AXI-Lite slot out of `/dev/mem` and
//! offers bounds-checked volatile 32-bit access. [`RegisterBus`] is the seam
//! the hardware backend programs against, so the register protocol can be
//! exercised against an in-memory device model.
//!
//! At most one `RegisterWindow` per physical base address is alive in the
//! process at a time. The MAC protocol (reset, start, poll) is stateful and
//! two owners interleaving strobes would corrupt each other's results.

// MMIO registers are naturally aligned by hardware, so pointer casts are safe
#![allow(clippy::cast_ptr_alignment)]

use crate::error::{MacError, Result};
use fp4_chip::regs;
use rustix::fs::OFlags;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::{Mutex, PoisonError};

/// 32-bit register access used by the hardware backend
pub trait RegisterBus: Debug + Send {
    /// Read a 32-bit register
    ///
    /// # Errors
    ///
    /// Returns error if the offset is outside the register window.
    fn read_u32(&self, offset: usize) -> Result<u32>;

    /// Write a 32-bit register
    ///
    /// # Errors
    ///
    /// Returns error if the offset is outside the register window.
    fn write_u32(&mut self, offset: usize, value: u32) -> Result<()>;
}

/// Smallest window that reaches every MAC register
pub const MIN_WINDOW_SIZE: usize = regs::STATUS + 4;

/// Base addresses currently owned by a live `RegisterWindow`
static CLAIMED: Mutex<BTreeSet<u64>> = Mutex::new(BTreeSet::new());

/// Exclusive ownership of one physical base address
#[derive(Debug)]
struct WindowClaim {
    base: u64,
}

impl WindowClaim {
    fn acquire(base: u64) -> Result<Self> {
        let mut claimed = CLAIMED.lock().unwrap_or_else(PoisonError::into_inner);
        if !claimed.insert(base) {
            return Err(MacError::AddressInUse { base });
        }
        Ok(Self { base })
    }
}

impl Drop for WindowClaim {
    fn drop(&mut self) {
        CLAIMED
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.base);
    }
}

/// Whether a live driver currently owns the window at `base`
pub fn is_claimed(base: u64) -> bool {
    CLAIMED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&base)
}

/// MAC register window mapped from physical memory
#[derive(Debug)]
pub struct RegisterWindow {
    ptr: NonNull<u8>,
    size: usize,
    base: u64,
    _file: File,
    _claim: WindowClaim,
}

impl RegisterWindow {
    /// Map `size` bytes of physical memory at `base` through `device`
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `size` does not cover the register map ([`MIN_WINDOW_SIZE`])
    /// - Another live window already owns `base`
    /// - The device cannot be opened read/write
    /// - mmap fails (no such physical range, insufficient privilege)
    pub fn map(device: &Path, base: u64, size: usize) -> Result<Self> {
        if size < MIN_WINDOW_SIZE {
            return Err(MacError::map_failed(
                base,
                size,
                format!("window must cover the register map ({MIN_WINDOW_SIZE:#x} bytes)"),
            ));
        }

        let claim = WindowClaim::acquire(base)?;

        tracing::debug!("Mapping {size:#x} bytes at {base:#x} via {}", device.display());

        // Flag bits are small positive values
        #[allow(clippy::cast_possible_wrap)]
        let sync_flag = OFlags::SYNC.bits() as i32;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(sync_flag)
            .open(device)
            .map_err(|e| MacError::device_unavailable(device, e))?;

        // SAFETY: mmap necessary for MMIO - maps the MAC's AXI slot into the process.
        // Invariants: (1) file is open read/write for the lifetime of the mapping (kept
        // in _file); (2) size is non-zero; (3) MAP_SHARED so writes reach the device;
        // (4) the claim guarantees no other window in this process aliases `base`.
        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                base,
            )
        }
        .map_err(|e| MacError::map_failed(base, size, e.to_string()))?;

        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| MacError::map_failed(base, size, "mmap returned null"))?;

        tracing::info!("Mapped MAC registers at {base:#x} ({size:#x} bytes at {ptr:p})");

        Ok(Self {
            ptr,
            size,
            base,
            _file: file,
            _claim: claim,
        })
    }

    /// Physical base address
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Mapped size in bytes
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    fn check(&self, offset: usize) -> Result<()> {
        if offset % 4 != 0 || offset.checked_add(4).map_or(true, |end| end > self.size) {
            return Err(MacError::OutOfBounds {
                offset,
                limit: self.size,
            });
        }
        Ok(())
    }
}

impl RegisterBus for RegisterWindow {
    fn read_u32(&self, offset: usize) -> Result<u32> {
        self.check(offset)?;
        // SAFETY: read_volatile necessary for MMIO - hardware changes STATUS/RESULT.
        // Invariants: (1) ptr from mmap in map(), valid for self.size; (2) offset+4 <= size
        // and offset is word aligned (checked above).
        let value = unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile() };
        tracing::trace!("Read u32 @ {offset:#x} = {value:#x}");
        Ok(value)
    }

    fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.check(offset)?;
        tracing::trace!("Write u32 @ {offset:#x} = {value:#x}");
        // SAFETY: write_volatile necessary for MMIO - CONTROL writes strobe the MAC.
        // Invariants: (1) ptr from mmap; (2) offset+4 <= size, word aligned.
        unsafe {
            self.ptr.as_ptr().add(offset).cast::<u32>().write_volatile(value);
        }
        Ok(())
    }
}

impl Drop for RegisterWindow {
    fn drop(&mut self) {
        // SAFETY: ptr/size are exactly what mmap returned in map(); Drop runs once.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.size) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
        tracing::debug!("Unmapped MAC registers at {:#x}", self.base);
    }
}

// SAFETY: Send - RegisterWindow owns its mapping exclusively (enforced by the claim
// table). Moving it between threads doesn't invalidate the mapping.
unsafe impl Send for RegisterWindow {}
