//! Residual connections for post-norm encoder sublayers.
//!
//! A sublayer's output is passed through dropout and added back to the
//! sublayer's input; normalisation happens afterwards, outside this module.
//! Both operands share the `(batch, seq * hidden)` layout.

use candle_core::{Result, Tensor};
use rand::RngCore;

use crate::{
    checks,
    dropout::{Dropout, DropoutMask},
};

/// Residual add helper with an output dropout site.
#[derive(Debug, Clone)]
pub struct Residual {
    dropout: Dropout,
}

impl Residual {
    /// Creates a residual connection whose branch is dropped with `dropout_p`.
    pub fn new(dropout_p: f64) -> Result<Self> {
        Ok(Self {
            dropout: Dropout::new(dropout_p)?,
        })
    }

    pub fn dropout(&self) -> &Dropout {
        &self.dropout
    }

    /// Adds `branch` to `residual` element-wise.
    pub fn add(&self, branch: &Tensor, residual: &Tensor) -> Result<Tensor> {
        checks::expect_shape("residual.branch", branch, residual.dims())?;
        checks::expect_same_dtype("residual.branch", branch, "residual.input", residual)?;
        branch.add(residual)
    }

    /// Post-norm step (branch -> dropout -> add); returns the sum and the mask.
    pub fn postnorm_step(
        &self,
        branch: &Tensor,
        residual: &Tensor,
        rng: &mut dyn RngCore,
    ) -> Result<(Tensor, DropoutMask)> {
        let (dropped, mask) = self.dropout.forward(branch, rng)?;
        Ok((self.add(&dropped, residual)?, mask))
    }
}
