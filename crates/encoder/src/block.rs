use std::{fmt, sync::OnceLock};

use attention::{
    core::{Config as AttentionConfig, HeadGeometry},
    Attention, ExactAttention,
};
use candle_core::Tensor;
use layers::{
    linear::{Linear, LinearLayer},
    mlp::{FeedForward, FeedForwardConfig, FeedForwardLayer},
    norm::{LayerNorm, NormConfig, NormalizationLayer},
    residual::Residual,
};
use rand::RngCore;

use crate::{
    config::EncoderConfig,
    error::{EncoderError, Result},
    output::{DropoutMasks, EncoderLayerOutput, IntermediateOutputs, NormCaches},
    params::{AffineParams, EncoderLayerParams, NormParams},
};

fn build_linear(params: &AffineParams) -> Result<Linear> {
    Ok(Linear::new(params.weight.clone(), Some(params.bias.clone()))?)
}

fn build_norm(params: &NormParams, hidden: usize, epsilon: f64) -> Result<LayerNorm> {
    let mut config = NormConfig::new(hidden);
    config.epsilon = epsilon;
    Ok(LayerNorm::new(params.gamma.clone(), params.beta.clone(), config)?)
}

/// Encoder layer implementing the BERT post-norm residual layout.
///
/// `attention -> dropout -> add -> norm -> mlp -> dropout -> add -> norm`
pub struct EncoderLayer {
    config: EncoderConfig,
    geometry: HeadGeometry,
    query: Linear,
    key: Linear,
    value: Linear,
    attention_output: Linear,
    attention: ExactAttention,
    attention_config: AttentionConfig,
    residual_attn: Residual,
    norm_attn: LayerNorm,
    mlp: FeedForward,
    residual_mlp: Residual,
    norm_mlp: LayerNorm,
    first_call: OnceLock<()>,
}

impl fmt::Debug for EncoderLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderLayer")
            .field("hidden_size", &self.config.hidden_size)
            .field("heads", &self.geometry.num_heads)
            .field("head_dim", &self.geometry.head_dim)
            .field("seq_len", &self.geometry.seq_len)
            .field("activation", &self.config.activation)
            .finish()
    }
}

impl EncoderLayer {
    /// Validates `config` and wraps the caller's parameters.
    pub fn new(config: EncoderConfig, params: &EncoderLayerParams) -> Result<Self> {
        config.validate()?;
        let activation = config.activation_kind()?;
        let hidden = config.hidden_size;
        params.validate(hidden, config.intermediate_size)?;

        let projections = &params.projections;
        let ff_config = FeedForwardConfig::new(hidden, config.intermediate_size, activation);
        let mlp = FeedForward::new(
            ff_config,
            build_linear(&projections.intermediate)?,
            build_linear(&projections.output)?,
        )?;

        let attention_config = AttentionConfig {
            dropout_p: Some(config.attention_dropout),
        };

        Ok(Self {
            geometry: config.geometry(),
            query: build_linear(&projections.query)?,
            key: build_linear(&projections.key)?,
            value: build_linear(&projections.value)?,
            attention_output: build_linear(&projections.attention_output)?,
            attention: ExactAttention::new(),
            attention_config,
            residual_attn: Residual::new(config.hidden_dropout)?,
            norm_attn: build_norm(&params.layer_norms.attention, hidden, config.layer_norm_eps)?,
            mlp,
            residual_mlp: Residual::new(config.ffn_dropout())?,
            norm_mlp: build_norm(&params.layer_norms.ffn, hidden, config.layer_norm_eps)?,
            first_call: OnceLock::new(),
            config,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn expect_hidden(&self, hidden: &Tensor) -> Result<usize> {
        match hidden.dims() {
            [batch, width] if *width == self.config.token_width() => Ok(*batch),
            dims => Err(EncoderError::DimensionMismatch(format!(
                "hidden states must be (batch, {} * {}) = (batch, {}), got {dims:?}",
                self.config.seq_len,
                self.config.hidden_size,
                self.config.token_width()
            ))),
        }
    }

    /// Forward pass through the encoder layer.
    ///
    /// `hidden` is `(batch, seq_len * hidden_size)`. `mask` is an optional
    /// additive attention mask (see [`attention::masks`]). Dropout masks are
    /// drawn from `rng`; with every probability at zero the pass is
    /// deterministic and `rng` is left untouched.
    pub fn forward(
        &self,
        hidden: &Tensor,
        mask: Option<&Tensor>,
        rng: &mut dyn RngCore,
    ) -> Result<EncoderLayerOutput> {
        let batch = self.expect_hidden(hidden)?;
        let seq = self.geometry.seq_len;

        if self.first_call.set(()).is_ok() {
            log::info!(
                "encoder layer init hidden={} heads={} head_dim={} intermediate={} activation={} dropout(attn={}, hidden={}, ffn={}) eps={}",
                self.config.hidden_size,
                self.geometry.num_heads,
                self.geometry.head_dim,
                self.config.intermediate_size,
                self.config.activation,
                self.config.attention_dropout,
                self.config.hidden_dropout,
                self.config.ffn_dropout(),
                self.config.layer_norm_eps
            );
        }
        log::debug!("encoder forward batch={batch} seq={seq} masked={}", mask.is_some());

        let query = self.query.forward_tokens(hidden, seq)?;
        let key = self.key.forward_tokens(hidden, seq)?;
        let value = self.value.forward_tokens(hidden, seq)?;

        let attn = self.attention.attend(
            &query,
            &key,
            &value,
            &self.geometry,
            mask,
            &self.attention_config,
            rng,
        )?;

        let projected = self.attention_output.forward_tokens(&attn.context, seq)?;
        let (post_residual_1, attention_output_mask) =
            self.residual_attn.postnorm_step(&projected, hidden, rng)?;
        let norm_1 = self.norm_attn.forward_tokens(&post_residual_1, seq)?;

        let mlp = self.mlp.forward_tokens(&norm_1.output, seq)?;
        let (post_residual_2, ffn_output_mask) =
            self.residual_mlp.postnorm_step(&mlp.output, &norm_1.output, rng)?;
        let norm_2 = self.norm_mlp.forward_tokens(&post_residual_2, seq)?;

        Ok(EncoderLayerOutput {
            hidden_states: norm_2.output,
            attention: attn.attention.clone(),
            intermediates: IntermediateOutputs {
                query,
                key,
                value,
                context: attn.context,
                attention: attn.attention,
                post_residual_1,
                post_norm_1: norm_1.output,
                post_intermediate: mlp.intermediate,
                post_activation: mlp.activated,
                post_residual_2,
            },
            masks: DropoutMasks {
                attention: attn.dropout_mask,
                attention_output: attention_output_mask,
                ffn_output: ffn_output_mask,
            },
            norm_caches: NormCaches {
                attention: norm_1.cache,
                ffn: norm_2.cache,
            },
        })
    }
}
