use attention::AttentionError;
use thiserror::Error;

/// Errors raised while configuring or running an encoder layer.
///
/// Every variant is fatal for the call that produced it; no partial outputs
/// are returned.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("{name} must be in [0, 1), got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("unsupported activation '{0}', expected one of: tanh, gelu")]
    UnsupportedActivation(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported configuration format: {0}")]
    ConfigFormat(String),
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
    #[error("attention error: {0}")]
    Attention(AttentionError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AttentionError> for EncoderError {
    fn from(err: AttentionError) -> Self {
        match err {
            AttentionError::InvalidShape { context } => EncoderError::DimensionMismatch(context),
            AttentionError::InvalidProbability { value } => EncoderError::InvalidProbability {
                name: "attention_dropout",
                value,
            },
            other => EncoderError::Attention(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EncoderError>;
