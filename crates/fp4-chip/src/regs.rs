// SPDX-License-Identifier: AGPL-3.0-only

//! Register map of the FP4 MAC unit.
//!
//! All registers are 32 bits wide and word aligned. Codewords travel in the
//! low four bits of the operand and result registers.
//!
//! ```text
//! 0x00  CONTROL   bit0 = start, bit1 = reset
//! 0x04  INPUT_A   operand A codeword
//! 0x08  INPUT_B   operand B codeword
//! 0x0C  RESULT    accumulator, codeword in bits 3..0
//! 0x10  STATUS    bit1 = operation done
//! ```
//!
//! One MAC: `CONTROL=RESET`, `CONTROL=0`, write A and B, `CONTROL=START`,
//! poll `STATUS` for `DONE`, read `RESULT & CODEWORD_MASK`.

// ── Registers ────────────────────────────────────────────────────────────────

/// Control register (start / reset strobes).
pub const CONTROL: usize = 0x00;

/// Operand A input register.
pub const INPUT_A: usize = 0x04;

/// Operand B input register.
pub const INPUT_B: usize = 0x08;

/// Accumulator result register.
pub const RESULT: usize = 0x0C;

/// Status register.
pub const STATUS: usize = 0x10;

/// Mask applied to `RESULT` (and to operands) to obtain a codeword.
pub const CODEWORD_MASK: u32 = 0xF;

// ── Control register bit definitions ─────────────────────────────────────────

/// CONTROL register bits.
pub mod control {
    /// Start one multiply-accumulate step.
    pub const START: u32 = 1 << 0;
    /// Clear the accumulator.
    pub const RESET: u32 = 1 << 1;
    /// Idle value written between strobes.
    pub const IDLE: u32 = 0;
}

// ── Status register bit definitions ──────────────────────────────────────────

/// STATUS register bits.
pub mod status {
    /// The last started operation has completed.
    pub const DONE: u32 = 1 << 1;
}

/// Human-readable register table, in address order.
pub const REGISTER_TABLE: [(usize, &str); 5] = [
    (CONTROL, "CONTROL"),
    (INPUT_A, "INPUT_A"),
    (INPUT_B, "INPUT_B"),
    (RESULT, "RESULT"),
    (STATUS, "STATUS"),
];
