//! Caller-owned parameters of one encoder layer.
//!
//! The outer model owns parameter storage; these records only group the
//! tensors handed to [`EncoderLayer::new`](crate::EncoderLayer::new). Weights
//! are `(in_features, out_features)` and every bias, scale and shift is a
//! `(1, width)` row vector.

use candle_core::Tensor;

use crate::error::{EncoderError, Result};

/// Weight matrix and its bias row.
#[derive(Debug, Clone)]
pub struct AffineParams {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl AffineParams {
    pub fn new(weight: Tensor, bias: Tensor) -> Self {
        Self { weight, bias }
    }

    pub(crate) fn expect_dims(&self, name: &str, input: usize, output: usize) -> Result<()> {
        expect_dims(&format!("{name}.weight"), &self.weight, &[input, output])?;
        expect_dims(&format!("{name}.bias"), &self.bias, &[1, output])
    }
}

/// LayerNorm scale (`gamma`) and shift (`beta`) rows.
#[derive(Debug, Clone)]
pub struct NormParams {
    pub gamma: Tensor,
    pub beta: Tensor,
}

impl NormParams {
    pub fn new(gamma: Tensor, beta: Tensor) -> Self {
        Self { gamma, beta }
    }

    pub(crate) fn expect_width(&self, name: &str, width: usize) -> Result<()> {
        expect_dims(&format!("{name}.gamma"), &self.gamma, &[1, width])?;
        expect_dims(&format!("{name}.beta"), &self.beta, &[1, width])
    }
}

/// The six affine projections of the layer.
#[derive(Debug, Clone)]
pub struct ProjectionParams {
    /// `(D, D)` query projection.
    pub query: AffineParams,
    /// `(D, D)` key projection.
    pub key: AffineParams,
    /// `(D, D)` value projection.
    pub value: AffineParams,
    /// `(D, D)` projection of the attention context back to model width.
    pub attention_output: AffineParams,
    /// `(D, I)` feed-forward expansion.
    pub intermediate: AffineParams,
    /// `(I, D)` feed-forward contraction.
    pub output: AffineParams,
}

/// One LayerNorm per sublayer.
#[derive(Debug, Clone)]
pub struct LayerNormParams {
    /// Applied after the attention residual.
    pub attention: NormParams,
    /// Applied after the feed-forward residual.
    pub ffn: NormParams,
}

/// Every parameter consumed by [`EncoderLayer`](crate::EncoderLayer).
#[derive(Debug, Clone)]
pub struct EncoderLayerParams {
    pub projections: ProjectionParams,
    pub layer_norms: LayerNormParams,
}

impl EncoderLayerParams {
    /// Checks every parameter against `hidden` (D) and `intermediate` (I).
    pub fn validate(&self, hidden: usize, intermediate: usize) -> Result<()> {
        let p = &self.projections;
        p.query.expect_dims("query", hidden, hidden)?;
        p.key.expect_dims("key", hidden, hidden)?;
        p.value.expect_dims("value", hidden, hidden)?;
        p.attention_output.expect_dims("attention_output", hidden, hidden)?;
        p.intermediate.expect_dims("intermediate", hidden, intermediate)?;
        p.output.expect_dims("output", intermediate, hidden)?;
        self.layer_norms.attention.expect_width("attention_norm", hidden)?;
        self.layer_norms.ffn.expect_width("ffn_norm", hidden)
    }
}

fn expect_dims(name: &str, tensor: &Tensor, expected: &[usize]) -> Result<()> {
    if tensor.dims() == expected {
        Ok(())
    } else {
        Err(EncoderError::DimensionMismatch(format!(
            "{name}: expected {expected:?}, got {:?}",
            tensor.dims()
        )))
    }
}
