//! Lightweight validation helpers shared across layer components.
//!
//! Hidden states travel as 2D matrices shaped `(batch, seq * features)`. These
//! routines assert that layout, and the shapes of the parameters consumed next
//! to it, returning `candle_core::Result<()>` so call sites can propagate
//! errors without panicking.

use candle_core::{Error, Result, Tensor};

/// Ensures a tensor matches the expected dimensions exactly.
pub fn expect_shape(name: &str, tensor: &Tensor, expected: &[usize]) -> Result<()> {
    let actual = tensor.dims();
    if actual == expected {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{name}: expected shape {expected:?}, got {actual:?}"
        )))
    }
}

/// Ensures a tensor has exactly `rank` dimensions.
pub fn expect_rank(name: &str, tensor: &Tensor, rank: usize) -> Result<()> {
    let actual = tensor.rank();
    if actual == rank {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{name}: expected rank {rank}, got {actual} ({:?})",
            tensor.dims()
        )))
    }
}

/// Validates a `(1, width)` row vector such as a bias or a norm scale.
pub fn expect_row_vector(name: &str, tensor: &Tensor, width: usize) -> Result<()> {
    expect_shape(name, tensor, &[1, width])
}

/// Validates the flattened `(batch, seq * features)` token layout.
///
/// Returns the batch size so callers can build the `(batch * seq, features)`
/// view without re-reading the dims.
pub fn expect_tokens(name: &str, tensor: &Tensor, seq_len: usize, features: usize) -> Result<usize> {
    if seq_len == 0 || features == 0 {
        return Err(Error::Msg(format!(
            "{name}: seq_len ({seq_len}) and features ({features}) must be non-zero"
        )));
    }
    match tensor.dims() {
        [batch, width] if *width == seq_len * features => Ok(*batch),
        dims => Err(Error::Msg(format!(
            "{name}: expected (batch, {seq_len} * {features}) layout, got {dims:?}"
        ))),
    }
}

/// Checks both tensors share a dtype.
pub fn expect_same_dtype(name: &str, tensor: &Tensor, other_name: &str, other: &Tensor) -> Result<()> {
    if tensor.dtype() == other.dtype() {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{name} has dtype {:?} but {other_name} has dtype {:?}",
            tensor.dtype(),
            other.dtype()
        )))
    }
}

/// Dropout probabilities must lie in `[0, 1)`.
pub fn expect_probability(name: &str, probability: f64) -> Result<()> {
    if (0.0..1.0).contains(&probability) {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{name}: probability must be in [0, 1), got {probability}"
        )))
    }
}
