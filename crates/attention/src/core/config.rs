//! Configuration options shared by all attention implementations.
//!
//! [`HeadGeometry`] fixes how the flattened `(batch, seq * hidden)` inputs are
//! split into heads; [`Config`] captures run-time knobs such as dropout that
//! callers can tune without swapping implementations.

/// Head layout of a multi-head attention call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadGeometry {
    /// Number of parallel heads `H`.
    pub num_heads: usize,
    /// Sequence length `T` shared by queries and keys.
    pub seq_len: usize,
    /// Per-head width `d`.
    pub head_dim: usize,
}

impl HeadGeometry {
    pub fn new(num_heads: usize, seq_len: usize, head_dim: usize) -> Self {
        Self {
            num_heads,
            seq_len,
            head_dim,
        }
    }

    /// Model width `D = H * d`.
    pub fn hidden_size(&self) -> usize {
        self.num_heads * self.head_dim
    }

    /// Columns of the flattened `(batch, seq * D)` inputs.
    pub fn token_width(&self) -> usize {
        self.seq_len * self.hidden_size()
    }

    /// Columns of the flattened `(batch, H * T * T)` attention weights.
    pub fn attention_width(&self) -> usize {
        self.num_heads * self.seq_len * self.seq_len
    }

    /// `(token_width, attention_width)`, or `None` when either overflows.
    ///
    /// The unchecked accessors above are only safe once this returns `Some`.
    pub fn checked_widths(&self) -> Option<(usize, usize)> {
        let token_width = self
            .num_heads
            .checked_mul(self.head_dim)?
            .checked_mul(self.seq_len)?;
        let attention_width = self
            .num_heads
            .checked_mul(self.seq_len)?
            .checked_mul(self.seq_len)?;
        Some((token_width, attention_width))
    }
}

/// Configuration driving attention behaviour.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    /// Probability for dropout applied to attention weights.
    ///
    /// When `None` (or `Some(0.0)`) dropout is disabled and the computation is
    /// deterministic.
    pub dropout_p: Option<f64>,
}

impl Config {
    pub fn with_dropout(dropout_p: f64) -> Self {
        Self {
            dropout_p: Some(dropout_p),
        }
    }
}
