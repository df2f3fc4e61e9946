// SPDX-License-Identifier: AGPL-3.0-only

//! FP4 E2M1 codec.
//!
//! A [`Codeword`] is four bits laid out as `s ee m`: one sign bit, a 2-bit
//! exponent and a 1-bit mantissa. The sixteen states decode to
//!
//! ```text
//! 0x0  0.0    0x8 -0.0
//! 0x1  0.5    0x9 -0.5
//! 0x2  1.0    0xA -1.0
//! 0x3  1.5    0xB -1.5
//! 0x4  2.0    0xC -2.0
//! 0x5  3.0    0xD -3.0
//! 0x6  4.0    0xE -4.0
//! 0x7  6.0    0xF -6.0
//! ```
//!
//! ## Quantization policy
//!
//! [`encode`] recognises only these sixteen exact values. Anything else,
//! including values a hair away from a legal one (2.7, 5.1) and NaN, comes
//! back as the zero codeword. There is no round-to-nearest. This matches the
//! MAC firmware's behaviour bit for bit and is a known limitation; use
//! [`Codeword::exact`] when an unrepresentable input has to be detected.

use std::fmt;

/// Magnitudes of the eight non-negative codewords, indexed by the low 3 bits.
const MAGNITUDES: [f32; 8] = [0.0, 0.5, 1.0, 1.5, 2.0, 3.0, 4.0, 6.0];

const SIGN_BIT: u8 = 0x8;
const MAGNITUDE_MASK: u8 = 0x7;

/// A 4-bit E2M1 minifloat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Codeword(u8);

impl Codeword {
    /// Positive zero (`0x0`), also the result of every unrepresentable encode.
    pub const ZERO: Self = Self(0x0);

    /// Negative zero (`0x8`).
    pub const NEG_ZERO: Self = Self(0x8);

    /// Largest magnitude, `6.0` (`0x7`).
    pub const MAX: Self = Self(0x7);

    /// Most negative value, `-6.0` (`0xF`).
    pub const MIN: Self = Self(0xF);

    /// Build a codeword from raw bits. Only the low four bits are kept,
    /// exactly as the driver masks the RESULT register.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0xF)
    }

    /// Build a codeword from a 32-bit register value (low four bits).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_register(value: u32) -> Self {
        Self((value & 0xF) as u8)
    }

    /// Raw 4-bit pattern.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Value to place in an operand register.
    #[must_use]
    pub const fn to_register(self) -> u32 {
        self.0 as u32
    }

    /// Sign bit (bit 3).
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 & SIGN_BIT != 0
    }

    /// 2-bit exponent field (bits 2..1).
    #[must_use]
    pub const fn exponent(self) -> u8 {
        (self.0 >> 1) & 0x3
    }

    /// 1-bit mantissa field (bit 0).
    #[must_use]
    pub const fn mantissa(self) -> u8 {
        self.0 & 0x1
    }

    /// True for both `+0` and `-0`.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 & MAGNITUDE_MASK == 0
    }

    /// Real value of this codeword. Total over all sixteen states.
    #[must_use]
    pub fn decode(self) -> f32 {
        let magnitude = MAGNITUDES[usize::from(self.0 & MAGNITUDE_MASK)];
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Codeword for `value` if it is one of the sixteen legal values.
    ///
    /// `-0.0` maps to [`Codeword::NEG_ZERO`] so that every codeword
    /// round-trips through [`decode`](Self::decode).
    #[must_use]
    pub fn exact(value: f32) -> Option<Self> {
        let magnitude = value.abs();
        #[allow(clippy::float_cmp)]
        let index = MAGNITUDES.iter().position(|&m| m == magnitude)?;
        #[allow(clippy::cast_possible_truncation)]
        let bits = index as u8;
        Some(if value.is_sign_negative() {
            Self(bits | SIGN_BIT)
        } else {
            Self(bits)
        })
    }

    /// Codeword for `value`, collapsing every unrepresentable input to
    /// [`Codeword::ZERO`]. No rounding is performed.
    #[must_use]
    pub fn encode(value: f32) -> Self {
        Self::exact(value).unwrap_or(Self::ZERO)
    }

    /// All sixteen codewords in bit order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0u8..16).map(Self)
    }
}

impl From<Codeword> for f32 {
    fn from(c: Codeword) -> Self {
        c.decode()
    }
}

impl fmt::Display for Codeword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#03x} ({:.1})", self.0, self.decode())
    }
}

/// Encode a real value. See [`Codeword::encode`].
#[must_use]
pub fn encode(value: f32) -> Codeword {
    Codeword::encode(value)
}

/// Decode a codeword. See [`Codeword::decode`].
#[must_use]
pub fn decode(codeword: Codeword) -> f32 {
    codeword.decode()
}

/// One line of a precision report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionRow {
    /// Input value.
    pub value: f32,
    /// Codeword it encoded to.
    pub codeword: Codeword,
    /// Value recovered by decoding the codeword.
    pub reconstructed: f32,
    /// `value - reconstructed`.
    pub error: f32,
}

/// Encode and decode each value, recording the reconstruction error.
#[must_use]
pub fn precision_report(values: &[f32]) -> Vec<PrecisionRow> {
    values
        .iter()
        .map(|&value| {
            let codeword = encode(value);
            let reconstructed = codeword.decode();
            PrecisionRow {
                value,
                codeword,
                reconstructed,
                error: value - reconstructed,
            }
        })
        .collect()
}
