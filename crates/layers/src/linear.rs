//! Linear and affine projection helpers.
//!
//! Hidden states are stored as `(batch, seq * in_dim)`. [`Linear::forward_tokens`]
//! views them as `(batch * seq, in_dim)`, applies `x · W + b` through
//! [`affine_forward`] and restores the `(batch, seq * out_dim)` layout. Rows of
//! the token view enumerate `(batch, seq)` pairs in row-major order, so each
//! batch keeps its `seq` rows contiguous and no data is reordered. Weights are
//! stored `(in_dim, out_dim)` and biases as `(1, out_dim)` rows broadcast over
//! every token.

use candle_core::{Error, Result, Tensor};

use crate::checks;

/// Configuration shared by dense projection layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConfig {
    /// Incoming feature dimension.
    pub input_dim: usize,
    /// Output feature dimension.
    pub output_dim: usize,
    /// Whether a bias row is applied.
    pub bias: bool,
}

impl LinearConfig {
    /// Creates a configuration for a projection with bias.
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        Self {
            input_dim,
            output_dim,
            bias: true,
        }
    }
}

/// Shared interface for affine projections over token matrices.
pub trait LinearLayer: Send + Sync {
    /// Returns the static configuration used to validate inputs.
    fn config(&self) -> &LinearConfig;

    /// Projects every token of a `(batch, seq * in_dim)` tensor independently.
    fn forward_tokens(&self, hidden: &Tensor, seq_len: usize) -> Result<Tensor>;
}

/// Plain 2D affine map `input · weight + bias`.
///
/// `input` is `(rows, in_dim)`, `weight` is `(in_dim, out_dim)` and `bias`, when
/// present, is a `(1, out_dim)` row added to every output row.
pub fn affine_forward(input: &Tensor, weight: &Tensor, bias: Option<&Tensor>) -> Result<Tensor> {
    let (_, in_dim) = input.dims2()?;
    let (weight_in, out_dim) = weight.dims2()?;
    if in_dim != weight_in {
        return Err(Error::Msg(format!(
            "affine input has {in_dim} features but weight expects {weight_in}"
        )));
    }
    let output = input.matmul(weight)?;
    match bias {
        Some(bias) => {
            checks::expect_row_vector("affine.bias", bias, out_dim)?;
            output.broadcast_add(bias)
        }
        None => Ok(output),
    }
}

/// Dense affine projection holding caller-owned parameters.
#[derive(Debug, Clone)]
pub struct Linear {
    config: LinearConfig,
    weight: Tensor,
    bias: Option<Tensor>,
}

impl Linear {
    /// Wraps `weight` `(in_dim, out_dim)` and an optional `(1, out_dim)` bias.
    pub fn new(weight: Tensor, bias: Option<Tensor>) -> Result<Self> {
        checks::expect_rank("linear.weight", &weight, 2)?;
        let (input_dim, output_dim) = weight.dims2()?;
        let config = LinearConfig {
            input_dim,
            output_dim,
            bias: bias.is_some(),
        };
        Self::validate_bias(&config, &weight, bias.as_ref())?;
        Ok(Self {
            config,
            weight,
            bias,
        })
    }

    /// Returns the weight matrix.
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// Returns the bias row if present.
    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    fn validate_bias(config: &LinearConfig, weight: &Tensor, bias: Option<&Tensor>) -> Result<()> {
        match bias {
            Some(bias) => {
                checks::expect_row_vector("linear.bias", bias, config.output_dim)?;
                checks::expect_same_dtype("linear.bias", bias, "linear.weight", weight)
            }
            None => Ok(()),
        }
    }
}

impl LinearLayer for Linear {
    fn config(&self) -> &LinearConfig {
        &self.config
    }

    fn forward_tokens(&self, hidden: &Tensor, seq_len: usize) -> Result<Tensor> {
        let batch = checks::expect_tokens("linear.input", hidden, seq_len, self.config.input_dim)?;
        checks::expect_same_dtype("linear.input", hidden, "linear.weight", &self.weight)?;

        let flat = hidden.reshape((batch * seq_len, self.config.input_dim))?;
        let projected = affine_forward(&flat, &self.weight, self.bias.as_ref())?;
        projected.reshape((batch, seq_len * self.config.output_dim))
    }
}
