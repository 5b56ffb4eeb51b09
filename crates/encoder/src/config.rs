use std::{fs, path::Path};

use attention::HeadGeometry;
use layers::ActivationKind;
use serde::{Deserialize, Serialize};

use crate::error::{EncoderError, Result};

fn default_activation() -> String {
    ActivationKind::Gelu.as_str().to_string()
}

fn default_layer_norm_eps() -> f64 {
    1e-5
}

/// Geometry and hyperparameters of one encoder layer.
///
/// Hidden states are `(batch, seq_len * hidden_size)` with
/// `hidden_size = num_heads * head_dim`; the feed-forward sublayer expands each
/// token to `intermediate_size` features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub hidden_size: usize,
    pub num_heads: usize,
    pub head_dim: usize,
    pub seq_len: usize,
    pub intermediate_size: usize,
    /// Feed-forward activation selector, `"tanh"` or `"gelu"`.
    #[serde(default = "default_activation")]
    pub activation: String,
    /// Dropout on the attention probabilities.
    #[serde(default)]
    pub attention_dropout: f64,
    /// Dropout on the attention sublayer output before the first residual.
    #[serde(default)]
    pub hidden_dropout: f64,
    /// Dropout on the feed-forward output; falls back to `hidden_dropout`.
    #[serde(default)]
    pub hidden_dropout_ffn: Option<f64>,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
}

impl EncoderConfig {
    /// Builds a dropout-free configuration with `hidden_size = num_heads * head_dim`.
    pub fn new(
        num_heads: usize,
        head_dim: usize,
        seq_len: usize,
        intermediate_size: usize,
        activation: ActivationKind,
    ) -> Self {
        Self {
            hidden_size: num_heads * head_dim,
            num_heads,
            head_dim,
            seq_len,
            intermediate_size,
            activation: activation.as_str().to_string(),
            attention_dropout: 0.0,
            hidden_dropout: 0.0,
            hidden_dropout_ffn: None,
            layer_norm_eps: default_layer_norm_eps(),
        }
    }

    /// Loads a `.toml` or `.json` configuration and validates it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: EncoderConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            Some("toml") | None => toml::from_str(&contents)?,
            Some(other) => {
                return Err(EncoderError::ConfigFormat(format!(
                    "unsupported configuration extension '{other}'"
                )));
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants before any tensor is touched.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("hidden_size", self.hidden_size),
            ("num_heads", self.num_heads),
            ("head_dim", self.head_dim),
            ("seq_len", self.seq_len),
            ("intermediate_size", self.intermediate_size),
        ] {
            if value == 0 {
                return Err(EncoderError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        if self.num_heads.checked_mul(self.head_dim) != Some(self.hidden_size) {
            return Err(EncoderError::DimensionMismatch(format!(
                "hidden_size ({}) must equal num_heads ({}) * head_dim ({})",
                self.hidden_size, self.num_heads, self.head_dim
            )));
        }
        if self.geometry().checked_widths().is_none()
            || self.seq_len.checked_mul(self.intermediate_size).is_none()
        {
            return Err(EncoderError::InvalidConfig(format!(
                "seq_len ({}) is too large for hidden_size ({}), num_heads ({}) and intermediate_size ({})",
                self.seq_len, self.hidden_size, self.num_heads, self.intermediate_size
            )));
        }
        for (name, value) in [
            ("attention_dropout", self.attention_dropout),
            ("hidden_dropout", self.hidden_dropout),
            ("hidden_dropout_ffn", self.ffn_dropout()),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(EncoderError::InvalidProbability { name, value });
            }
        }
        if !self.layer_norm_eps.is_finite() || self.layer_norm_eps <= 0.0 {
            return Err(EncoderError::InvalidConfig(format!(
                "layer_norm_eps must be finite and positive, got {}",
                self.layer_norm_eps
            )));
        }
        self.activation_kind()?;
        Ok(())
    }

    /// Resolves the activation selector.
    pub fn activation_kind(&self) -> Result<ActivationKind> {
        self.activation
            .parse()
            .map_err(|_| EncoderError::UnsupportedActivation(self.activation.clone()))
    }

    /// Dropout probability of the feed-forward output site.
    pub fn ffn_dropout(&self) -> f64 {
        self.hidden_dropout_ffn.unwrap_or(self.hidden_dropout)
    }

    pub fn geometry(&self) -> HeadGeometry {
        HeadGeometry::new(self.num_heads, self.seq_len, self.head_dim)
    }

    /// Columns of a hidden-state tensor, `seq_len * hidden_size`.
    ///
    /// Only overflow-free on a configuration that passed [`Self::validate`].
    pub fn token_width(&self) -> usize {
        self.seq_len * self.hidden_size
    }
}
