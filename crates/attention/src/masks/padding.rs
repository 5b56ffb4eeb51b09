//! Builders for padding masks used to drop padded keys.
//!
//! All padding masks share the dtype and layout described in
//! [`super::MASK_DTYPE`](super::MASK_DTYPE). Queries at padded positions still
//! attend to the valid keys; only the key axis is masked.

use candle_core::{Device, Error, Result, Tensor};

fn row_start(b: usize, h: usize, q: usize, num_heads: usize, q_len: usize, k_len: usize) -> usize {
    (((b * num_heads) + h) * q_len + q) * k_len
}

/// Construct padding masks from per-batch valid key lengths.
pub fn padding_mask_from_lengths(
    device: &Device,
    key_lengths: &[usize],
    num_heads: usize,
    q_len: usize,
    k_len: usize,
) -> Result<Tensor> {
    let batch = key_lengths.len();
    let mut data = vec![0f64; batch * num_heads * q_len * k_len];

    for (b, &valid) in key_lengths.iter().enumerate() {
        if valid == 0 {
            return Err(Error::Msg(format!(
                "batch {b} has no valid keys; a fully masked row has no softmax"
            )));
        }
        let valid = valid.min(k_len);
        for h in 0..num_heads {
            for q in 0..q_len {
                let start = row_start(b, h, q, num_heads, q_len, k_len);
                data[start + valid..start + k_len].fill(f64::NEG_INFINITY);
            }
        }
    }

    Tensor::from_vec(data, (batch, num_heads, q_len, k_len), device)
}

/// Construct padding masks from boolean padding indicators.
///
/// Each inner slice corresponds to a batch element and must share the same
/// length. `true` indicates a padded (masked) key position.
pub fn padding_mask_from_booleans(
    device: &Device,
    padding: &[Vec<bool>],
    num_heads: usize,
    q_len: usize,
) -> Result<Tensor> {
    let k_len = padding.first().map(Vec::len).unwrap_or(0);
    if let Some(b) = padding.iter().position(|mask| mask.len() != k_len) {
        return Err(Error::Msg(format!(
            "padding mask for batch {b} has {} keys, expected {k_len}",
            padding[b].len()
        )));
    }
    if let Some(b) = padding.iter().position(|mask| mask.iter().all(|p| *p)) {
        return Err(Error::Msg(format!(
            "batch {b} has no valid keys; a fully masked row has no softmax"
        )));
    }

    let batch = padding.len();
    let mut data = vec![0f64; batch * num_heads * q_len * k_len];

    for (b, mask) in padding.iter().enumerate() {
        for h in 0..num_heads {
            for q in 0..q_len {
                let start = row_start(b, h, q, num_heads, q_len, k_len);
                for (k, &is_padding) in mask.iter().enumerate() {
                    if is_padding {
                        data[start + k] = f64::NEG_INFINITY;
                    }
                }
            }
        }
    }

    Tensor::from_vec(data, (batch, num_heads, q_len, k_len), device)
}
