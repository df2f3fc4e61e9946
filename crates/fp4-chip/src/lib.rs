// SPDX-License-Identifier: AGPL-3.0-only

//! Silicon and format model for the FP4 E2M1 multiply-accumulate unit.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the accelerator: the 4-bit number format the MAC unit
//! computes in, the AXI-Lite register map, and the physical window the
//! registers live in.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`codec`] | `Codeword` (E2M1 minifloat), `encode` / `decode`, precision report |
//! | [`regs`] | Register offsets and CONTROL / STATUS bit definitions |
//! | [`window`] | Physical base address and mapped window size |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod regs;
pub mod window;

pub use codec::{decode, encode, precision_report, Codeword, PrecisionRow};
