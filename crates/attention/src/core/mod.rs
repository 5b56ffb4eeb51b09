//! Core traits and types shared across attention implementations.
//!
//! Queries, keys and values arrive flattened as `(batch, seq * hidden)` with
//! `hidden = num_heads * head_dim`; the context returned mirrors that layout.
//! Attention weights are returned flattened as `(batch, heads * seq * seq)`
//! with the key axis innermost.

pub mod config;
pub mod errors;

use candle_core::Tensor;
use layers::DropoutMask;
use rand::RngCore;

pub use config::{Config, HeadGeometry};
pub use errors::AttentionError;

/// Everything produced by one attention call.
#[derive(Debug, Clone)]
pub struct AttentionOutput {
    /// Recombined heads, `(batch, seq * hidden)`.
    pub context: Tensor,
    /// Softmax probabilities before dropout, `(batch, heads * seq * seq)`.
    pub attention: Tensor,
    /// Dropout mask applied to the probabilities, laid out like `attention`.
    pub dropout_mask: DropoutMask,
}

/// Unified interface for attention kernels.
///
/// * `q`, `k`, and `v` share the layout `(batch, seq * num_heads * head_dim)`.
/// * Masks, when present, are additive and shaped `[batch, 1 or n_heads, seq, seq]`.
/// * Dropout is controlled via [`Config::dropout_p`]; masks are drawn from `rng`.
pub trait Attention: Send + Sync {
    /// Compute bidirectional self-attention with an optional additive mask.
    fn attend(
        &self,
        q: &Tensor,
        k: &Tensor,
        v: &Tensor,
        geometry: &HeadGeometry,
        mask: Option<&Tensor>,
        config: &Config,
        rng: &mut dyn RngCore,
    ) -> Result<AttentionOutput, AttentionError>;
}
