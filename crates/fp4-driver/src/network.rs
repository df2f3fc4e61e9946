// SPDX-License-Identifier: AGPL-3.0-only

//! Dense FP4 networks evaluated on the MAC unit.
//!
//! Each neuron is one `dot_product` call, so every activation is quantized
//! exactly once, after the full weighted sum. Whatever backend the driver is
//! on (hardware or simulated) is the backend the network runs on.
//!
//! ```no_run
//! use fp4_driver::{AcceleratorDriver, DriverConfig, network::Network};
//!
//! let mut mac = AcceleratorDriver::open(&DriverConfig::default());
//! let net = Network::xor();
//! let out = net.forward(&mut mac, &[1.0, 0.0])?;
//! println!("XOR(1, 0) ≈ {}", out[0]);
//! # Ok::<(), fp4_driver::MacError>(())
//! ```

use crate::driver::AcceleratorDriver;
use crate::error::{MacError, Result};
use fp4_chip::Codeword;

/// Fully connected layer: one row of codeword weights per output neuron
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseLayer {
    rows: Vec<Vec<Codeword>>,
}

impl DenseLayer {
    /// Build a layer from real-valued weight rows
    ///
    /// Weights go through the codec's exact-match encode, so any value that
    /// is not one of the sixteen FP4 values becomes zero.
    ///
    /// # Errors
    ///
    /// Returns error if the rows have different lengths.
    pub fn from_f32(rows: &[&[f32]]) -> Result<Self> {
        let rows: Vec<Vec<Codeword>> = rows
            .iter()
            .map(|r| r.iter().copied().map(Codeword::encode).collect())
            .collect();
        Self::new(rows)
    }

    /// Build a layer from codeword rows
    ///
    /// # Errors
    ///
    /// Returns error if the rows have different lengths.
    pub fn new(rows: Vec<Vec<Codeword>>) -> Result<Self> {
        if let Some(first) = rows.first() {
            if let Some(bad) = rows.iter().find(|r| r.len() != first.len()) {
                return Err(MacError::LengthMismatch {
                    a: first.len(),
                    b: bad.len(),
                });
            }
        }
        Ok(Self { rows })
    }

    /// Number of inputs each neuron expects
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Number of neurons
    #[must_use]
    pub fn output_dim(&self) -> usize {
        self.rows.len()
    }

    /// Weighted sums of `inputs`, one dot product per neuron
    ///
    /// # Errors
    ///
    /// Returns error if `inputs` does not match `input_dim`, or if the driver
    /// reports a poll timeout.
    pub fn forward(
        &self,
        mac: &mut AcceleratorDriver,
        inputs: &[Codeword],
    ) -> Result<Vec<Codeword>> {
        self.rows.iter().map(|row| mac.dot_product(inputs, row)).collect()
    }
}

/// Sequence of dense layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    layers: Vec<DenseLayer>,
}

impl Network {
    /// Chain layers
    ///
    /// # Errors
    ///
    /// Returns error if a layer's input width differs from the previous
    /// layer's output width.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self> {
        for pair in layers.windows(2) {
            if pair[0].output_dim() != pair[1].input_dim() {
                return Err(MacError::LengthMismatch {
                    a: pair[0].output_dim(),
                    b: pair[1].input_dim(),
                });
            }
        }
        Ok(Self { layers })
    }

    /// Hand-set 2→2→1 XOR network
    ///
    /// Hidden: `h0 = 4·(a+b)`, `h1 = -6·(a+b)`. Output: `h0 + 0.5·h1`.
    ///
    /// The nonlinearity is the codec itself: for `a = b = 1` the hidden sums
    /// are 8 and -12, neither representable, so both collapse to zero. For a
    /// single active input they land on 4 and -6 and the output is exactly 1.
    #[must_use]
    pub fn xor() -> Self {
        let hidden = DenseLayer {
            rows: vec![
                vec![Codeword::encode(4.0), Codeword::encode(4.0)],
                vec![Codeword::encode(-6.0), Codeword::encode(-6.0)],
            ],
        };
        let output = DenseLayer {
            rows: vec![vec![Codeword::encode(1.0), Codeword::encode(0.5)]],
        };
        Self {
            layers: vec![hidden, output],
        }
    }

    /// Layers in evaluation order
    #[must_use]
    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Run codeword inputs through every layer
    ///
    /// # Errors
    ///
    /// Returns error on an input width mismatch or a driver timeout.
    pub fn forward_codewords(
        &self,
        mac: &mut AcceleratorDriver,
        inputs: &[Codeword],
    ) -> Result<Vec<Codeword>> {
        let mut activations = inputs.to_vec();
        for layer in &self.layers {
            activations = layer.forward(mac, &activations)?;
        }
        Ok(activations)
    }

    /// Encode real inputs, run the network, decode the outputs
    ///
    /// # Errors
    ///
    /// Returns error on an input width mismatch or a driver timeout.
    pub fn forward(&self, mac: &mut AcceleratorDriver, inputs: &[f32]) -> Result<Vec<f32>> {
        let inputs: Vec<Codeword> = inputs.iter().copied().map(Codeword::encode).collect();
        let out = self.forward_codewords(mac, &inputs)?;
        Ok(out.into_iter().map(Codeword::decode).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DriverConfig;
    use std::time::Duration;

    fn sim() -> AcceleratorDriver {
        let config = DriverConfig::default().with_simulated_latency(Duration::ZERO);
        AcceleratorDriver::simulated(&config)
    }

    #[test]
    fn ragged_rows_rejected() {
        assert!(DenseLayer::from_f32(&[&[1.0, 2.0], &[1.0]]).is_err());
    }

    #[test]
    fn mismatched_layers_rejected() {
        let a = DenseLayer::from_f32(&[&[1.0, 1.0], &[1.0, 1.0], &[1.0, 1.0]]).unwrap();
        let b = DenseLayer::from_f32(&[&[1.0, 1.0]]).unwrap();
        assert!(Network::new(vec![a, b]).is_err());
    }

    #[test]
    fn layer_forward_is_one_dot_per_neuron() {
        let mut mac = sim();
        let layer = DenseLayer::from_f32(&[&[1.0, 2.0], &[0.5, 0.5]]).unwrap();
        let x = [Codeword::encode(1.0), Codeword::encode(2.0)];
        let y = layer.forward(&mut mac, &x).unwrap();
        // 1 + 4 = 5 (unrepresentable → 0); 0.5 + 1 = 1.5
        assert_eq!(y, vec![Codeword::ZERO, Codeword::encode(1.5)]);
    }

    #[test]
    fn wrong_input_width_rejected() {
        let mut mac = sim();
        let net = Network::xor();
        assert!(net.forward(&mut mac, &[1.0]).is_err());
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn xor_truth_table_on_simulator() {
        let mut mac = sim();
        let net = Network::xor();
        let table = [
            ([0.0, 0.0], 0.0),
            ([0.0, 1.0], 1.0),
            ([1.0, 0.0], 1.0),
            ([1.0, 1.0], 0.0),
        ];
        for (input, expected) in table {
            let out = net.forward(&mut mac, &input).unwrap();
            assert_eq!(out, vec![expected], "XOR{input:?}");
        }
    }

    #[test]
    fn xor_hidden_layer_saturates_to_zero() {
        let mut mac = sim();
        let net = Network::xor();
        let one = Codeword::encode(1.0);
        let hidden = net.layers()[0].forward(&mut mac, &[one, one]).unwrap();
        assert!(hidden.iter().all(|h| h.is_zero()));
    }
}
