//! Mask utilities shared by attention implementations.
//!
//! All masks produced here are additive tensors with dtype [`MASK_DTYPE`],
//! shaped `[batch, num_heads, q_len, k_len]`. Values are either `0.0` (keep) or
//! `f64::NEG_INFINITY` (discard) so they can be added to the scores right
//! before the softmax.

pub mod padding;

use candle_core::DType;

/// Dtype shared by all additive masks.
pub const MASK_DTYPE: DType = DType::F64;

pub use padding::{padding_mask_from_booleans, padding_mask_from_lengths};
