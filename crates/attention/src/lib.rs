//! Multi-head self-attention for the encoder layer.
//!
//! The crate defines a portable API for scaled dot-product attention over
//! queries, keys and values stored as flattened token matrices
//! `(batch, seq * hidden)`. Each input is split into `num_heads` heads of width
//! `head_dim`; scores are scaled by `1 / sqrt(head_dim)` and normalised with a
//! softmax over the key axis. Attention is bidirectional: every token may
//! attend to every other token unless an additive padding mask says otherwise.
//!
//! Dropout on the attention weights is optional and draws its mask from a
//! caller-supplied random generator, so deterministic runs only need a fixed
//! seed or a zero probability.

pub mod core;
pub mod masks;
pub mod reference;

pub use core::{Attention, AttentionError, AttentionOutput, Config, HeadGeometry};
pub use reference::ExactAttention;
