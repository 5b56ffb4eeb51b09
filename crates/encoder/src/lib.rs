//! Forward pass of one BERT-style transformer encoder layer.
//!
//! Hidden states are 2D token matrices `(batch, seq_len * hidden_size)`. One
//! call to [`EncoderLayer::forward`] runs multi-head self-attention and the
//! position-wise feed-forward sublayer, each followed by dropout, a residual
//! add and a layer norm, and returns every intermediate, dropout mask and
//! normalisation cache a backward pass needs. Stacking layers is left to the
//! caller.

pub mod block;
pub mod config;
pub mod error;
pub mod output;
pub mod params;

pub use block::EncoderLayer;
pub use config::EncoderConfig;
pub use error::{EncoderError, Result};
pub use output::{DropoutMasks, EncoderLayerOutput, IntermediateOutputs, NormCaches};
pub use params::{AffineParams, EncoderLayerParams, LayerNormParams, NormParams, ProjectionParams};
