//! Records returned by [`EncoderLayer::forward`](crate::EncoderLayer::forward).
//!
//! Nothing here is retained by the layer; ownership moves to the caller, which
//! typically hands the intermediates, masks and caches to a backward pass.

use candle_core::{DType, Device, Result, Tensor};
use layers::{DropoutMask, NormCache};

/// Tensors saved for backward-pass reconstruction, in forward order.
#[derive(Debug, Clone)]
pub struct IntermediateOutputs {
    /// `(B, T·D)` query projection.
    pub query: Tensor,
    /// `(B, T·D)` key projection.
    pub key: Tensor,
    /// `(B, T·D)` value projection.
    pub value: Tensor,
    /// `(B, T·D)` recombined attention heads.
    pub context: Tensor,
    /// `(B, H·T·T)` attention probabilities.
    pub attention: Tensor,
    /// `(B, T·D)` attention output plus input states, before the first norm.
    pub post_residual_1: Tensor,
    /// `(B, T·D)` output of the first norm; base of the second residual.
    pub post_norm_1: Tensor,
    /// `(B, T·I)` feed-forward expansion.
    pub post_intermediate: Tensor,
    /// `(B, T·I)` activated expansion.
    pub post_activation: Tensor,
    /// `(B, T·D)` feed-forward output plus `post_norm_1`, before the second norm.
    pub post_residual_2: Tensor,
}

impl IntermediateOutputs {
    /// The ten tensors in their fixed positional order.
    pub fn as_ordered(&self) -> [&Tensor; 10] {
        [
            &self.query,
            &self.key,
            &self.value,
            &self.context,
            &self.attention,
            &self.post_residual_1,
            &self.post_norm_1,
            &self.post_intermediate,
            &self.post_activation,
            &self.post_residual_2,
        ]
    }
}

/// Masks of the three dropout sites.
#[derive(Debug, Clone)]
pub struct DropoutMasks {
    /// Applied to the attention probabilities, laid out `(B, H·T·T)`.
    pub attention: DropoutMask,
    /// Applied to the projected attention output.
    pub attention_output: DropoutMask,
    /// Applied to the feed-forward output.
    pub ffn_output: DropoutMask,
}

impl DropoutMasks {
    /// Materialises all three masks, `1 x 1` placeholders for disabled sites.
    pub fn to_tensors(&self, dtype: DType, device: &Device) -> Result<[Tensor; 3]> {
        Ok([
            self.attention.to_tensor(dtype, device)?,
            self.attention_output.to_tensor(dtype, device)?,
            self.ffn_output.to_tensor(dtype, device)?,
        ])
    }
}

/// LayerNorm caches of both normalisation sites.
#[derive(Debug, Clone)]
pub struct NormCaches {
    pub attention: NormCache,
    pub ffn: NormCache,
}

/// Everything produced by one encoder layer forward pass.
#[derive(Debug, Clone)]
pub struct EncoderLayerOutput {
    /// `(B, T·D)` final hidden states.
    pub hidden_states: Tensor,
    /// `(B, H·T·T)` attention probabilities.
    pub attention: Tensor,
    pub intermediates: IntermediateOutputs,
    pub masks: DropoutMasks,
    pub norm_caches: NormCaches,
}
