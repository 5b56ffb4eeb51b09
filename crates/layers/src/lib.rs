//! Building blocks for the encoder layer.
//!
//! Every component here works on hidden states stored as 2D token matrices
//! `(batch, seq * features)`: affine projections, per-token layer norm,
//! element-wise activations, dropout with explicit randomness, residual adds
//! and the position-wise feed-forward sublayer.

pub mod activations;
pub mod checks;
pub mod dropout;
pub mod linear;
pub mod mlp;
pub mod norm;
pub mod residual;

pub use activations::ActivationKind;
pub use dropout::{Dropout, DropoutMask};
pub use linear::{affine_forward, Linear, LinearLayer};
pub use mlp::{FeedForward, FeedForwardConfig, FeedForwardLayer, FeedForwardOutput};
pub use norm::{LayerNorm, NormCache, NormConfig, NormOutput, NormalizationLayer};
pub use residual::Residual;
