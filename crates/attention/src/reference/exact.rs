//! Reference CPU-friendly attention kernel.
//!
//! The exact path prioritises numerical fidelity and mirrors the semantics
//! described by the [`Attention`](crate::core::Attention) trait.

use std::sync::OnceLock;

use candle_core::{Tensor, D};
use candle_nn::ops::softmax;
use layers::Dropout;
use rand::RngCore;

use crate::core::{Attention, AttentionError, AttentionOutput, Config, HeadGeometry};

/// Numerically stable, portable multi-head attention kernel.
#[derive(Debug, Default)]
pub struct ExactAttention {
    first_call: OnceLock<()>,
}

impl ExactAttention {
    pub fn new() -> Self {
        Self::default()
    }
}

fn validate_geometry(geometry: &HeadGeometry) -> Result<(), AttentionError> {
    if geometry.num_heads == 0 || geometry.seq_len == 0 || geometry.head_dim == 0 {
        return Err(AttentionError::InvalidShape {
            context: format!("head geometry must be non-zero, got {geometry:?}"),
        });
    }
    if geometry.checked_widths().is_none() {
        return Err(AttentionError::InvalidShape {
            context: format!("head geometry widths overflow usize, got {geometry:?}"),
        });
    }
    Ok(())
}

fn validate_input(name: &str, tensor: &Tensor, geometry: &HeadGeometry) -> Result<usize, AttentionError> {
    match tensor.dims() {
        [batch, width] if *width == geometry.token_width() => Ok(*batch),
        dims => Err(AttentionError::InvalidShape {
            context: format!(
                "{name} must be (batch, {} * {} * {}) = (batch, {}), got {dims:?}",
                geometry.seq_len,
                geometry.num_heads,
                geometry.head_dim,
                geometry.token_width()
            ),
        }),
    }
}

/// `(batch, seq * H * d)` -> `(batch * H, seq, d)`.
fn split_heads(tensor: &Tensor, batch: usize, geometry: &HeadGeometry) -> Result<Tensor, AttentionError> {
    let HeadGeometry {
        num_heads,
        seq_len,
        head_dim,
    } = *geometry;
    Ok(tensor
        .reshape((batch, seq_len, num_heads, head_dim))?
        .permute((0, 2, 1, 3))?
        .contiguous()?
        .reshape((batch * num_heads, seq_len, head_dim))?)
}

/// `(batch * H, seq, d)` -> `(batch, seq * H * d)`.
fn merge_heads(tensor: &Tensor, batch: usize, geometry: &HeadGeometry) -> Result<Tensor, AttentionError> {
    let HeadGeometry {
        num_heads,
        seq_len,
        head_dim,
    } = *geometry;
    Ok(tensor
        .reshape((batch, num_heads, seq_len, head_dim))?
        .permute((0, 2, 1, 3))?
        .contiguous()?
        .reshape((batch, geometry.token_width()))?)
}

fn apply_mask(
    scores: &Tensor,
    mask: &Tensor,
    batch: usize,
    geometry: &HeadGeometry,
) -> Result<Tensor, AttentionError> {
    let (heads, seq) = (geometry.num_heads, geometry.seq_len);
    let (mb, mh, mq, mk) = mask.dims4().map_err(|_| AttentionError::InvalidShape {
        context: format!("mask must have shape [batch, heads|1, seq, seq], got {:?}", mask.dims()),
    })?;
    if mb != batch || mq != seq || mk != seq || (mh != 1 && mh != heads) {
        return Err(AttentionError::InvalidShape {
            context: format!(
                "mask shape mismatch: expected [{batch}, 1|{heads}, {seq}, {seq}] got [{mb}, {mh}, {mq}, {mk}]"
            ),
        });
    }
    let mask = mask
        .to_dtype(scores.dtype())?
        .broadcast_as((batch, heads, seq, seq))?
        .contiguous()?
        .reshape((batch * heads, seq, seq))?;
    Ok(scores.add(&mask)?)
}

impl Attention for ExactAttention {
    fn attend(
        &self,
        q: &Tensor,
        k: &Tensor,
        v: &Tensor,
        geometry: &HeadGeometry,
        mask: Option<&Tensor>,
        config: &Config,
        rng: &mut dyn RngCore,
    ) -> Result<AttentionOutput, AttentionError> {
        validate_geometry(geometry)?;
        let dropout_p = config.dropout_p.unwrap_or(0.0);
        let dropout =
            Dropout::new(dropout_p).map_err(|_| AttentionError::InvalidProbability { value: dropout_p })?;

        if self.first_call.set(()).is_ok() {
            log::info!(
                "attention::reference init heads={} seq_len={} head_dim={} dropout_p={}",
                geometry.num_heads,
                geometry.seq_len,
                geometry.head_dim,
                dropout_p
            );
        }

        let batch = validate_input("q", q, geometry)?;
        for (name, tensor) in [("k", k), ("v", v)] {
            if validate_input(name, tensor, geometry)? != batch {
                return Err(AttentionError::InvalidShape {
                    context: format!("{name} batch differs from q batch {batch}"),
                });
            }
        }
        if q.dtype() != k.dtype() || q.dtype() != v.dtype() {
            return Err(AttentionError::InvalidShape {
                context: "q, k, v must share the same dtype".to_string(),
            });
        }

        let q_heads = split_heads(q, batch, geometry)?;
        let k_heads = split_heads(k, batch, geometry)?;
        let v_heads = split_heads(v, batch, geometry)?;

        let scale = 1.0 / (geometry.head_dim as f64).sqrt();
        let k_t = k_heads.transpose(1, 2)?.contiguous()?;
        let mut scores = q_heads.matmul(&k_t)?.affine(scale, 0.0)?;
        if let Some(mask) = mask {
            scores = apply_mask(&scores, mask, batch, geometry)?;
        }
        let probs = softmax(&scores, D::Minus1)?;

        let attention = probs.reshape((batch, geometry.attention_width()))?;
        let (dropped, dropout_mask) = dropout.forward(&attention, rng)?;
        let dropped = dropped.reshape((batch * geometry.num_heads, geometry.seq_len, geometry.seq_len))?;

        let context = dropped.matmul(&v_heads)?;
        let context = merge_heads(&context, batch, geometry)?;

        Ok(AttentionOutput {
            context,
            attention,
            dropout_mask,
        })
    }
}
