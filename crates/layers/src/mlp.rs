//! Position-wise feed-forward blocks built on top of projections and activations.
//!
//! The MLP consumes hidden states shaped `(batch, seq * hidden)`, expands each
//! token to `intermediate_size` features, applies the activation and contracts
//! back to `hidden`. Both intermediate tensors are returned so a backward pass
//! can reuse them.

use std::sync::Arc;

use candle_core::{Error, Result, Tensor};

use crate::{
    activations::{self, Activation, ActivationKind},
    linear::{Linear, LinearLayer},
};

/// Configuration shared by transformer feed-forward networks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedForwardConfig {
    /// Model hidden size.
    pub hidden_size: usize,
    /// Width of the activation space.
    pub intermediate_size: usize,
    /// Activation applied between projections.
    pub activation: ActivationKind,
}

impl FeedForwardConfig {
    pub fn new(hidden_size: usize, intermediate_size: usize, activation: ActivationKind) -> Self {
        Self {
            hidden_size,
            intermediate_size,
            activation,
        }
    }
}

/// Every tensor produced by one feed-forward pass.
#[derive(Debug, Clone)]
pub struct FeedForwardOutput {
    /// After the expanding projection, `(batch, seq * intermediate)`.
    pub intermediate: Tensor,
    /// After the activation, `(batch, seq * intermediate)`.
    pub activated: Tensor,
    /// After the contracting projection, `(batch, seq * hidden)`.
    pub output: Tensor,
}

/// Shared interface for feed-forward stacks.
pub trait FeedForwardLayer: Send + Sync {
    /// Configuration metadata used during block assembly.
    fn config(&self) -> &FeedForwardConfig;

    /// Runs the MLP over every token of `hidden`.
    fn forward_tokens(&self, hidden: &Tensor, seq_len: usize) -> Result<FeedForwardOutput>;
}

/// Two-projection MLP: `Linear -> activation -> Linear`.
#[derive(Clone)]
pub struct FeedForward {
    config: FeedForwardConfig,
    up: Linear,
    down: Linear,
    activation: Arc<dyn Activation>,
}

impl std::fmt::Debug for FeedForward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedForward")
            .field("config", &self.config)
            .finish()
    }
}

impl FeedForward {
    /// Assembles the MLP from its expanding (`up`) and contracting (`down`) projections.
    pub fn new(config: FeedForwardConfig, up: Linear, down: Linear) -> Result<Self> {
        let up_cfg = up.config();
        let down_cfg = down.config();
        if up_cfg.input_dim != config.hidden_size || up_cfg.output_dim != config.intermediate_size {
            return Err(Error::Msg(format!(
                "mlp.up expects ({}, {}) weight, got ({}, {})",
                config.hidden_size, config.intermediate_size, up_cfg.input_dim, up_cfg.output_dim
            )));
        }
        if down_cfg.input_dim != config.intermediate_size || down_cfg.output_dim != config.hidden_size
        {
            return Err(Error::Msg(format!(
                "mlp.down expects ({}, {}) weight, got ({}, {})",
                config.intermediate_size, config.hidden_size, down_cfg.input_dim, down_cfg.output_dim
            )));
        }
        let activation = activations::builtin(config.activation);
        Ok(Self {
            config,
            up,
            down,
            activation,
        })
    }

    pub fn up(&self) -> &Linear {
        &self.up
    }

    pub fn down(&self) -> &Linear {
        &self.down
    }
}

impl FeedForwardLayer for FeedForward {
    fn config(&self) -> &FeedForwardConfig {
        &self.config
    }

    fn forward_tokens(&self, hidden: &Tensor, seq_len: usize) -> Result<FeedForwardOutput> {
        let intermediate = self.up.forward_tokens(hidden, seq_len)?;
        let activated = self.activation.forward(&intermediate)?;
        let output = self.down.forward_tokens(&activated, seq_len)?;
        Ok(FeedForwardOutput {
            intermediate,
            activated,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn filled(rows: usize, cols: usize, value: f64) -> Result<Tensor> {
        Tensor::full(value, (rows, cols), &Device::Cpu)
    }

    #[test]
    fn intermediates_have_expected_layout() -> Result<()> {
        let (hidden, inner, seq) = (4, 8, 3);
        let up = Linear::new(filled(hidden, inner, 0.1)?, Some(filled(1, inner, 0.0)?))?;
        let down = Linear::new(filled(inner, hidden, 0.5)?, Some(filled(1, hidden, 1.0)?))?;
        let config = FeedForwardConfig::new(hidden, inner, ActivationKind::Tanh);
        let mlp = FeedForward::new(config, up, down)?;
        assert_eq!(mlp.up().weight().dims(), &[hidden, inner]);
        assert_eq!(mlp.down().weight().dims(), &[inner, hidden]);

        let input = filled(2, seq * hidden, 1.0)?;
        let out = mlp.forward_tokens(&input, seq)?;
        assert_eq!(out.intermediate.dims(), &[2, seq * inner]);
        assert_eq!(out.activated.dims(), &[2, seq * inner]);
        assert_eq!(out.output.dims(), &[2, seq * hidden]);

        // every intermediate value is 4 * 0.1, so every output is 8 * 0.5 * tanh(0.4) + 1
        let expected = 8.0 * 0.5 * 0.4f64.tanh() + 1.0;
        for value in out.output.flatten_all()?.to_vec1::<f64>()? {
            assert!((value - expected).abs() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn mismatched_projections_are_rejected() -> Result<()> {
        let up = Linear::new(filled(4, 8, 0.0)?, None)?;
        let down = Linear::new(filled(6, 4, 0.0)?, None)?;
        let config = FeedForwardConfig::new(4, 8, ActivationKind::Gelu);
        assert!(FeedForward::new(config, up, down).is_err());
        Ok(())
    }
}
